//! Flow and step state published by the session

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bold_core::{Link, TxHash};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Future returned by a step's effect: the hash of the submitted transaction
pub type StepFuture = BoxFuture<'static, bold_core::Result<TxHash>>;

/// Future returned by a skip predicate
pub type SkipFuture = BoxFuture<'static, bold_core::Result<bool>>;

type ExecuteFn = Arc<dyn Fn() -> StepFuture + Send + Sync>;
type SkipFn = Arc<dyn Fn() -> SkipFuture + Send + Sync>;

/// One step as produced by a flow definition.
///
/// `execute` can be invoked again when the flow is resumed.
#[derive(Clone)]
pub struct StepDefinition {
    pub id: String,
    pub label: String,
    execute: ExecuteFn,
    should_skip: Option<SkipFn>,
}

impl StepDefinition {
    pub fn new<F, Fut>(id: impl Into<String>, label: impl Into<String>, execute: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bold_core::Result<TxHash>> + Send + 'static,
    {
        Self {
            id: id.into(),
            label: label.into(),
            execute: Arc::new(move || -> StepFuture { Box::pin(execute()) }),
            should_skip: None,
        }
    }

    /// Attach a predicate evaluated once when the flow starts
    pub fn skip_when<F, Fut>(mut self, predicate: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bold_core::Result<bool>> + Send + 'static,
    {
        self.should_skip = Some(Arc::new(move || -> SkipFuture { Box::pin(predicate()) }));
        self
    }

    pub fn execute(&self) -> StepFuture {
        (self.execute)()
    }

    /// `Ok(false)` when no predicate is attached
    pub async fn should_skip(&self) -> bold_core::Result<bool> {
        match &self.should_skip {
            Some(predicate) => predicate().await,
            None => Ok(false),
        }
    }
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("should_skip", &self.should_skip.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Idle,
    Pending,
    Confirming,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Idle,
    Pending,
    Success,
    Error,
}

impl FlowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error recorded on a failed step or flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    /// Stable error code (`submission_rejected`, `reverted`, ...)
    pub name: String,
    pub message: String,
}

impl From<&bold_core::Error> for StepError {
    fn from(e: &bold_core::Error) -> Self {
        Self {
            name: e.error_code().to_string(),
            message: e.to_string(),
        }
    }
}

/// Runtime state of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub label: String,
    pub status: StepStatus,
    pub tx_hash: Option<TxHash>,
    pub error: Option<StepError>,
}

impl Step {
    pub fn idle(def: &StepDefinition) -> Self {
        Self {
            id: def.id.clone(),
            label: def.label.clone(),
            status: StepStatus::Idle,
            tx_hash: None,
            error: None,
        }
    }

    /// Back to `Idle`, forgetting any hash and error
    pub(crate) fn reset(&mut self) {
        self.status = StepStatus::Idle;
        self.tx_hash = None;
        self.error = None;
    }
}

/// Runtime state of a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    pub id: String,
    /// Identifies one start (or resume) of the flow
    pub run_id: Uuid,
    pub title: String,
    pub steps: Vec<Step>,
    pub current_step_index: usize,
    pub status: FlowStatus,
    pub error: Option<StepError>,
    pub success_message: Option<String>,
    pub back_link: Option<Link>,
    pub success_link: Option<Link>,
}

impl FlowState {
    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.current_step_index)
    }

    pub fn is_complete(&self) -> bool {
        self.status == FlowStatus::Success
    }

    pub fn has_error(&self) -> bool {
        self.status == FlowStatus::Error
    }

    /// `(current_step_index + 1) / steps`; a flow without steps reports 1.0 once successful
    pub fn progress(&self) -> f64 {
        if self.steps.is_empty() {
            return if self.is_complete() { 1.0 } else { 0.0 };
        }
        (self.current_step_index + 1) as f64 / self.steps.len() as f64
    }
}

/// Everything an observer sees
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub flow: Option<FlowState>,
    pub is_open: bool,
}

impl SessionSnapshot {
    pub fn current_step(&self) -> Option<&Step> {
        self.flow.as_ref().and_then(FlowState::current_step)
    }

    pub fn is_complete(&self) -> bool {
        self.flow.as_ref().is_some_and(FlowState::is_complete)
    }

    pub fn has_error(&self) -> bool {
        self.flow.as_ref().is_some_and(FlowState::has_error)
    }

    /// 0.0 without a flow
    pub fn progress(&self) -> f64 {
        self.flow.as_ref().map(FlowState::progress).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow_with(steps: usize, index: usize, status: FlowStatus) -> FlowState {
        let def = StepDefinition::new("s", "Step", || async { Ok::<_, bold_core::Error>(TxHash::ZERO) });
        FlowState {
            id: "test".into(),
            run_id: Uuid::new_v4(),
            title: "Test".into(),
            steps: (0..steps).map(|_| Step::idle(&def)).collect(),
            current_step_index: index,
            status,
            error: None,
            success_message: None,
            back_link: None,
            success_link: None,
        }
    }

    #[test]
    fn test_progress() {
        assert_eq!(SessionSnapshot::default().progress(), 0.0);
        assert_eq!(flow_with(4, 0, FlowStatus::Idle).progress(), 0.25);
        assert_eq!(flow_with(4, 3, FlowStatus::Success).progress(), 1.0);
        assert_eq!(flow_with(0, 0, FlowStatus::Error).progress(), 0.0);
        assert_eq!(flow_with(0, 0, FlowStatus::Success).progress(), 1.0);
    }

    #[test]
    fn test_snapshot_accessors() {
        let snapshot = SessionSnapshot {
            flow: Some(flow_with(2, 1, FlowStatus::Error)),
            is_open: true,
        };
        assert!(snapshot.has_error());
        assert!(!snapshot.is_complete());
        assert_eq!(snapshot.current_step().map(|s| s.status), Some(StepStatus::Idle));

        assert!(SessionSnapshot::default().current_step().is_none());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&StepStatus::Confirming).unwrap(),
            "\"confirming\""
        );
        assert_eq!(FlowStatus::Error.to_string(), "error");
    }

    #[tokio::test]
    async fn test_step_definition_is_reinvocable() {
        let def = StepDefinition::new("s", "Step", || async {
            Ok::<_, bold_core::Error>(TxHash::with_last_byte(3))
        })
        .skip_when(|| async { Ok::<_, bold_core::Error>(true) });

        assert_eq!(def.execute().await.unwrap(), TxHash::with_last_byte(3));
        assert_eq!(def.execute().await.unwrap(), TxHash::with_last_byte(3));
        assert!(def.should_skip().await.unwrap());
    }
}
