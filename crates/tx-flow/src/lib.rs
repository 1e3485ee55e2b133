//! tx-flow: Sequential multi-transaction flows
//!
//! A [`FlowDefinition`] describes the steps of one user intent. A
//! [`TxSession`] runs them in order (submit, then wait for confirmation)
//! and publishes every state change to its subscribers.

pub mod definition;
pub mod errors;
pub mod session;
pub mod types;

pub use definition::FlowDefinition;
pub use errors::FlowError;
pub use session::TxSession;
pub use types::*;
