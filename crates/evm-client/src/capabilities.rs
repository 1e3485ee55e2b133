//! Chain capabilities
//!
//! The transport (wallet connector, RPC provider) is injected through these
//! three traits. Each is narrow so tests can script exactly one concern.

use std::fmt;

use async_trait::async_trait;
use bold_core::{Address, Bytes, ChainError, TxHash};
use serde::{Deserialize, Serialize};

use crate::{CallValue, ContractCall};

/// Receipt of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// `false` when the transaction reverted
    pub success: bool,
    pub gas_used: u64,
}

/// Contract reads and bytecode probes
#[async_trait]
pub trait ReadCapability: Send + Sync + fmt::Debug {
    /// Execute a view call and decode its return value
    async fn read(&self, call: &ContractCall) -> Result<CallValue, ChainError>;

    /// Deployed bytecode at an address (empty when none)
    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError>;
}

/// Transaction submission through the connected wallet
#[async_trait]
pub trait ExecutionCapability: Send + Sync + fmt::Debug {
    /// Sign and broadcast; returns once the wallet hands back the hash
    async fn submit(&self, call: ContractCall) -> Result<TxHash, ChainError>;
}

/// Receipt polling
#[async_trait]
pub trait ConfirmationCapability: Send + Sync + fmt::Debug {
    /// Resolve once the transaction has at least `min_confirmations`
    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        min_confirmations: u64,
    ) -> Result<Receipt, ChainError>;
}
