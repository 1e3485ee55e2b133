//! Error types for the BOLD flows

use thiserror::Error;

use crate::{TxHash, U256};

/// Core errors that can occur while building or executing a flow
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Stable snake_case name, recorded on failed steps
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Chain(e) => e.error_code(),
            Self::Protocol(e) => e.error_code(),
            Self::Config(_) => "config_error",
            Self::Serialization(_) => "serialization_error",
        }
    }

    /// Hash of the transaction a chain error refers to
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::Chain(e) => e.tx_hash(),
            _ => None,
        }
    }
}

/// Errors reported by the chain capabilities
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("Read {function} failed: {message}")]
    ReadFailed {
        function: &'static str,
        message: String,
    },

    #[error("Transaction rejected: {message}")]
    SubmissionRejected { message: String },

    #[error("Transaction {tx_hash} reverted: {message}")]
    Reverted { tx_hash: TxHash, message: String },

    #[error("Waiting for {tx_hash} failed: {message}")]
    ConfirmationFailed { tx_hash: TxHash, message: String },

    #[error("Transaction {tx_hash} not confirmed after {secs}s")]
    ConfirmationTimeout { tx_hash: TxHash, secs: u64 },

    #[error("Stopped waiting for {tx_hash}")]
    ConfirmationCancelled { tx_hash: TxHash },

    #[error("Unexpected response from {function}: {message}")]
    UnexpectedResponse {
        function: &'static str,
        message: String,
    },
}

impl ChainError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ReadFailed { .. } => "read_failed",
            Self::SubmissionRejected { .. } => "submission_rejected",
            Self::Reverted { .. } => "reverted",
            Self::ConfirmationFailed { .. } => "confirmation_failed",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::ConfirmationCancelled { .. } => "confirmation_cancelled",
            Self::UnexpectedResponse { .. } => "unexpected_response",
        }
    }

    /// Hash of the transaction this error refers to, when one was obtained
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::Reverted { tx_hash, .. }
            | Self::ConfirmationFailed { tx_hash, .. }
            | Self::ConfirmationTimeout { tx_hash, .. }
            | Self::ConfirmationCancelled { tx_hash } => Some(*tx_hash),
            _ => None,
        }
    }
}

/// Protocol-level validation errors
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    #[error("Unknown branch {id}")]
    UnknownBranch { id: u8 },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Action not allowed: {reason}")]
    ActionNotAllowed { reason: String },

    #[error("Interest rate {rate} outside batch range [{min}, {max}]")]
    RateOutsideBatchRange { rate: U256, min: U256, max: U256 },

    #[error("Batch manager not registered: {manager}")]
    BatchManagerNotFound { manager: String },
}

impl ProtocolError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownBranch { .. } => "unknown_branch",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::ActionNotAllowed { .. } => "action_not_allowed",
            Self::RateOutsideBatchRange { .. } => "rate_outside_batch_range",
            Self::BatchManagerNotFound { .. } => "batch_manager_not_found",
        }
    }
}

/// Configuration and registry validation errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Expected {expected} branches, found {found}")]
    BranchCount { expected: usize, found: usize },

    #[error("Branch {index} must be {expected}, found {found}")]
    BranchSymbol {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Contract {contract} missing for branch {branch}")]
    MissingBranchContract {
        branch: usize,
        contract: &'static str,
    },

    #[error("Protocol contract {contract} missing")]
    MissingProtocolContract { contract: &'static str },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Failed to read configuration: {0}")]
    Io(String),
}

/// Result type alias for flow operations
pub type Result<T> = std::result::Result<T, Error>;
