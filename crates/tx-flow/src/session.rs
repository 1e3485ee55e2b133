//! Flow execution session
//!
//! Runs the steps of one flow strictly in order: submit through the wallet,
//! wait for the receipt, move on. Every state change is published on a
//! `watch` channel. Starting a new flow (or resuming, or dismissing)
//! supersedes the previous run; a superseded run keeps waiting on the chain
//! but never publishes again.

use std::sync::{Arc, Mutex, MutexGuard};

use bold_core::{ChainError, TxHash};
use evm_client::ChainClient;
use tokio::sync::{watch, Notify};
use uuid::Uuid;

use crate::{
    FlowDefinition, FlowError, FlowState, FlowStatus, SessionSnapshot, Step, StepDefinition,
    StepError, StepStatus,
};

// ─── Session ─────────────────────────────────────────────────────────────────

/// Observable flow runner; clones share the same session
#[derive(Clone)]
pub struct TxSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    client: ChainClient,
    state: watch::Sender<SessionSnapshot>,
    /// Step definitions of the active run
    steps: Mutex<ActiveSteps>,
    cancel: Notify,
}

#[derive(Default)]
struct ActiveSteps {
    run_id: Option<Uuid>,
    steps: Vec<StepDefinition>,
}

impl TxSession {
    pub fn new(client: ChainClient) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(SessionInner {
                client,
                state,
                steps: Mutex::new(ActiveSteps::default()),
                cancel: Notify::new(),
            }),
        }
    }

    pub fn client(&self) -> &ChainClient {
        &self.inner.client
    }

    // ─── Observation ─────────────────────────────────────────────────────────

    /// Receiver that sees every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn flow(&self) -> Option<FlowState> {
        self.inner.state.borrow().flow.clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.borrow().is_open
    }

    pub fn current_step(&self) -> Option<Step> {
        self.inner.state.borrow().current_step().cloned()
    }

    pub fn is_complete(&self) -> bool {
        self.inner.state.borrow().is_complete()
    }

    pub fn has_error(&self) -> bool {
        self.inner.state.borrow().has_error()
    }

    pub fn progress(&self) -> f64 {
        self.inner.state.borrow().progress()
    }

    // ─── Control ─────────────────────────────────────────────────────────────

    /// Build the steps of `definition` and run them.
    ///
    /// Resolves when the run finishes. A failure while building the steps
    /// (including a failing skip predicate) publishes an `Error` flow without
    /// steps. A run superseded before finishing returns `Idle`.
    pub async fn start_flow(&self, definition: &dyn FlowDefinition) -> FlowStatus {
        let run_id = Uuid::new_v4();
        let flow_id = definition.flow_id();
        tracing::info!(flow = flow_id, run = %run_id, "Starting flow");

        let mut flow = FlowState {
            id: flow_id.to_string(),
            run_id,
            title: definition.title(),
            steps: Vec::new(),
            current_step_index: 0,
            status: FlowStatus::Idle,
            error: None,
            success_message: definition.success_message(),
            back_link: definition.back_link(),
            success_link: definition.success_link(),
        };

        let steps = match build_steps(definition).await {
            Ok(steps) => steps,
            Err(e) => {
                tracing::warn!(flow = flow_id, error = %e, "Failed to build flow steps");
                flow.status = FlowStatus::Error;
                flow.error = Some(StepError::from(&e));
                self.install(flow, Vec::new());
                return FlowStatus::Error;
            }
        };

        flow.steps = steps.iter().map(Step::idle).collect();
        self.install(flow, steps);
        self.run(run_id, 0).await
    }

    /// Reset a failed flow to `Idle` so it can be resumed.
    ///
    /// The failed step goes back to `Idle` and loses its error; its hash is kept.
    pub fn clear_error(&self) -> Result<(), FlowError> {
        let mut outcome = Err(FlowError::NoActiveFlow);
        self.inner.state.send_if_modified(|snapshot| {
            let Some(flow) = snapshot.flow.as_mut() else {
                return false;
            };
            if flow.status != FlowStatus::Error {
                outcome = Err(FlowError::InvalidStatus {
                    expected: "error",
                    found: flow.status,
                });
                return false;
            }

            flow.status = FlowStatus::Idle;
            flow.error = None;
            if let Some(step) = flow.steps.get_mut(flow.current_step_index) {
                step.status = StepStatus::Idle;
                step.error = None;
            }
            outcome = Ok(());
            true
        });
        outcome
    }

    /// Run the active flow again starting at `from_index`.
    ///
    /// Legal while the flow is `Idle` or `Error`, with every earlier step
    /// already `Success`. Steps from `from_index` on are reset and executed
    /// again through their definitions.
    pub async fn resume(&self, from_index: usize) -> Result<FlowStatus, FlowError> {
        let run_id = Uuid::new_v4();
        let mut outcome = Err(FlowError::NoActiveFlow);

        self.inner.state.send_if_modified(|snapshot| {
            let Some(flow) = snapshot.flow.as_mut() else {
                return false;
            };
            if !matches!(flow.status, FlowStatus::Idle | FlowStatus::Error) {
                outcome = Err(FlowError::InvalidStatus {
                    expected: "idle or error",
                    found: flow.status,
                });
                return false;
            }
            if from_index >= flow.steps.len() {
                outcome = Err(FlowError::StepOutOfRange {
                    index: from_index,
                    len: flow.steps.len(),
                });
                return false;
            }
            if let Some(index) = flow.steps[..from_index]
                .iter()
                .position(|s| s.status != StepStatus::Success)
            {
                outcome = Err(FlowError::PrecedingStepIncomplete { index });
                return false;
            }

            flow.run_id = run_id;
            flow.error = None;
            flow.current_step_index = from_index;
            for step in &mut flow.steps[from_index..] {
                step.reset();
            }
            snapshot.is_open = true;
            self.lock_steps().run_id = Some(run_id);
            outcome = Ok(());
            true
        });
        outcome?;

        tracing::info!(run = %run_id, from = from_index, "Resuming flow");
        Ok(self.run(run_id, from_index).await)
    }

    /// Hide the flow; it keeps running and stays available
    pub fn close(&self) {
        self.inner.state.send_if_modified(|snapshot| {
            let was_open = snapshot.is_open;
            snapshot.is_open = false;
            was_open
        });
    }

    /// Hide and discard the flow. A run still in progress stops publishing.
    pub fn dismiss(&self) {
        self.inner.state.send_modify(|snapshot| {
            snapshot.flow = None;
            snapshot.is_open = false;
            *self.lock_steps() = ActiveSteps::default();
        });
    }

    /// Stop waiting for the receipt of the step being confirmed.
    ///
    /// The step fails with `confirmation_cancelled` and keeps its hash; the
    /// transaction itself is already broadcast and is not revoked. Returns
    /// `false` when no step is confirming.
    pub fn cancel_confirmation_wait(&self) -> bool {
        let confirming = self
            .inner
            .state
            .borrow()
            .current_step()
            .is_some_and(|s| s.status == StepStatus::Confirming);
        if confirming {
            self.inner.cancel.notify_waiters();
        }
        confirming
    }

    // ─── Execution ───────────────────────────────────────────────────────────

    fn install(&self, flow: FlowState, steps: Vec<StepDefinition>) {
        let run_id = flow.run_id;
        self.inner.state.send_modify(|snapshot| {
            snapshot.flow = Some(flow);
            snapshot.is_open = true;
            *self.lock_steps() = ActiveSteps {
                run_id: Some(run_id),
                steps,
            };
        });
    }

    async fn run(&self, run_id: Uuid, from: usize) -> FlowStatus {
        if !self.update(run_id, |flow| flow.status = FlowStatus::Pending) {
            return superseded(run_id);
        }

        let total = self.step_count(run_id);
        for index in from..total {
            let Some(step) = self.step_definition(run_id, index) else {
                return superseded(run_id);
            };

            let started = self.update(run_id, |flow| {
                flow.current_step_index = index;
                let s = &mut flow.steps[index];
                s.reset();
                s.status = StepStatus::Pending;
            });
            if !started {
                return superseded(run_id);
            }

            match self.run_step(run_id, index, &step).await {
                Ok(tx_hash) => {
                    tracing::debug!(step = %step.id, tx_hash = %tx_hash, "Step confirmed");
                    if !self.update(run_id, |flow| flow.steps[index].status = StepStatus::Success) {
                        return superseded(run_id);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        run = %run_id,
                        step = %step.id,
                        code = e.error_code(),
                        error = %e,
                        "Step failed"
                    );
                    let error = StepError::from(&e);
                    let failed_hash = e.tx_hash();
                    let published = self.update(run_id, |flow| {
                        let s = &mut flow.steps[index];
                        if s.tx_hash.is_none() {
                            s.tx_hash = failed_hash;
                        }
                        s.status = StepStatus::Error;
                        s.error = Some(error.clone());
                        flow.status = FlowStatus::Error;
                        flow.error = Some(error);
                    });
                    if !published {
                        return superseded(run_id);
                    }
                    return FlowStatus::Error;
                }
            }
        }

        if !self.update(run_id, |flow| flow.status = FlowStatus::Success) {
            return superseded(run_id);
        }
        tracing::info!(run = %run_id, steps = total, "Flow completed");
        FlowStatus::Success
    }

    async fn run_step(
        &self,
        run_id: Uuid,
        index: usize,
        step: &StepDefinition,
    ) -> bold_core::Result<TxHash> {
        let tx_hash = step.execute().await?;
        tracing::debug!(step = %step.id, tx_hash = %tx_hash, "Step submitted");

        // Registered before Confirming is published so a cancel issued by an
        // observer of that state is never missed
        let cancelled = self.inner.cancel.notified();
        self.update(run_id, |flow| {
            let s = &mut flow.steps[index];
            s.status = StepStatus::Confirming;
            s.tx_hash = Some(tx_hash);
        });

        tokio::select! {
            result = self.inner.client.await_confirmation(tx_hash) => {
                result?;
            }
            _ = cancelled => {
                return Err(ChainError::ConfirmationCancelled { tx_hash }.into());
            }
        }
        Ok(tx_hash)
    }

    /// Apply `apply` to the flow if `run_id` is still the active run
    fn update(&self, run_id: Uuid, apply: impl FnOnce(&mut FlowState)) -> bool {
        self.inner
            .state
            .send_if_modified(|snapshot| match snapshot.flow.as_mut() {
                Some(flow) if flow.run_id == run_id => {
                    apply(flow);
                    true
                }
                _ => false,
            })
    }

    fn lock_steps(&self) -> MutexGuard<'_, ActiveSteps> {
        self.inner
            .steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn step_count(&self, run_id: Uuid) -> usize {
        let active = self.lock_steps();
        if active.run_id == Some(run_id) {
            active.steps.len()
        } else {
            0
        }
    }

    fn step_definition(&self, run_id: Uuid, index: usize) -> Option<StepDefinition> {
        let active = self.lock_steps();
        if active.run_id != Some(run_id) {
            return None;
        }
        active.steps.get(index).cloned()
    }
}

async fn build_steps(definition: &dyn FlowDefinition) -> bold_core::Result<Vec<StepDefinition>> {
    let all = definition.steps().await?;
    let mut kept = Vec::with_capacity(all.len());
    for step in all {
        if step.should_skip().await? {
            tracing::debug!(flow = definition.flow_id(), step = %step.id, "Skipping step");
            continue;
        }
        kept.push(step);
    }
    Ok(kept)
}

fn superseded(run_id: Uuid) -> FlowStatus {
    tracing::warn!(run = %run_id, "Flow run superseded, no longer publishing");
    FlowStatus::Idle
}
