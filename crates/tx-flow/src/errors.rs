//! Session misuse errors

use thiserror::Error;

use crate::FlowStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("No active flow")]
    NoActiveFlow,

    #[error("Flow is {found}, expected {expected}")]
    InvalidStatus {
        expected: &'static str,
        found: FlowStatus,
    },

    #[error("Step {index} out of range ({len} steps)")]
    StepOutOfRange { index: usize, len: usize },

    #[error("Step {index} has not completed")]
    PrecedingStepIncomplete { index: usize },
}
