//! Flow definition trait

use async_trait::async_trait;
use bold_core::Link;

use crate::StepDefinition;

/// Turns one user intent into an ordered list of steps.
///
/// `steps` may read the chain (allowances, trove state, batch constraints);
/// an error there fails the flow before any transaction is sent.
#[async_trait]
pub trait FlowDefinition: Send + Sync {
    fn flow_id(&self) -> &'static str;

    fn title(&self) -> String;

    async fn steps(&self) -> bold_core::Result<Vec<StepDefinition>>;

    fn success_message(&self) -> Option<String> {
        None
    }

    fn back_link(&self) -> Option<Link> {
        None
    }

    fn success_link(&self) -> Option<Link> {
        None
    }
}
