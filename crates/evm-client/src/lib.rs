//! evm-client: Capability-based access to the chain
//!
//! [`ChainClient`] bundles the read, execution and confirmation capabilities
//! with the contract registry and protocol settings. Reads are bounded by a
//! timeout; confirmation waits use the configured timeout.

pub mod call;
pub mod capabilities;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
pub mod queries;

use std::sync::Arc;

use bold_core::{Address, Bytes, ChainError, ContractRegistry, ProtocolSettings, TxHash};
use futures::future::join_all;

pub use call::{CallValue, ContractCall};
pub use capabilities::{ConfirmationCapability, ExecutionCapability, ReadCapability, Receipt};

/// Default timeout for contract reads (30 seconds).
/// Long enough for slow providers, short enough to avoid perpetual spinners.
const READ_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Result type for chain client operations
pub type Result<T> = std::result::Result<T, ChainError>;

/// Chain access shared by the flows
#[derive(Debug, Clone)]
pub struct ChainClient {
    reader: Arc<dyn ReadCapability>,
    executor: Arc<dyn ExecutionCapability>,
    confirmer: Arc<dyn ConfirmationCapability>,
    registry: Arc<ContractRegistry>,
    settings: ProtocolSettings,
}

impl ChainClient {
    pub fn new(
        reader: Arc<dyn ReadCapability>,
        executor: Arc<dyn ExecutionCapability>,
        confirmer: Arc<dyn ConfirmationCapability>,
        registry: Arc<ContractRegistry>,
        settings: ProtocolSettings,
    ) -> Self {
        Self {
            reader,
            executor,
            confirmer,
            registry,
            settings,
        }
    }

    /// Build from a single backend that provides all three capabilities
    pub fn from_backend<B>(
        backend: Arc<B>,
        registry: Arc<ContractRegistry>,
        settings: ProtocolSettings,
    ) -> Self
    where
        B: ReadCapability + ExecutionCapability + ConfirmationCapability + 'static,
    {
        Self::new(
            backend.clone(),
            backend.clone(),
            backend,
            registry,
            settings,
        )
    }

    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ProtocolSettings {
        &self.settings
    }

    /// Execute a view call
    pub async fn read(&self, call: &ContractCall) -> Result<CallValue> {
        tracing::debug!(
            contract = %call.address(),
            function = call.function,
            "Reading contract"
        );
        timed_read(call.function, self.reader.read(call)).await
    }

    /// Execute independent view calls concurrently.
    ///
    /// A failed read yields `None` at its position and never affects the others.
    pub async fn read_many(&self, calls: &[ContractCall]) -> Vec<Option<CallValue>> {
        let futures = calls.iter().map(|call| async move {
            match self.read(call).await {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(
                        contract = %call.address(),
                        function = call.function,
                        error = %e,
                        "Batched read failed"
                    );
                    None
                }
            }
        });
        join_all(futures).await
    }

    /// Bytecode at `address`
    pub async fn code_at(&self, address: Address) -> Result<Bytes> {
        timed_read("code_at", self.reader.code_at(address)).await
    }

    /// Submit a transaction through the wallet
    pub async fn submit(&self, call: ContractCall) -> Result<TxHash> {
        let function = call.function;
        let contract = call.address();
        let tx_hash = self.executor.submit(call).await?;
        tracing::debug!(
            contract = %contract,
            function,
            tx_hash = %tx_hash,
            "Transaction submitted"
        );
        Ok(tx_hash)
    }

    /// Wait for the configured number of confirmations.
    ///
    /// A reverted receipt becomes [`ChainError::Reverted`]; exceeding the
    /// configured timeout becomes [`ChainError::ConfirmationTimeout`].
    pub async fn await_confirmation(&self, tx_hash: TxHash) -> Result<Receipt> {
        let wait = self
            .confirmer
            .wait_for_receipt(tx_hash, self.settings.confirmations);

        let receipt = match self.settings.confirmation_timeout() {
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                ChainError::ConfirmationTimeout {
                    tx_hash,
                    secs: limit.as_secs(),
                }
            })??,
            None => wait.await?,
        };

        if !receipt.success {
            return Err(ChainError::Reverted {
                tx_hash,
                message: format!("reverted in block {}", receipt.block_number),
            });
        }

        tracing::debug!(
            tx_hash = %tx_hash,
            block = receipt.block_number,
            "Transaction confirmed"
        );
        Ok(receipt)
    }

    /// Submit and wait for confirmation
    pub async fn submit_and_confirm(&self, call: ContractCall) -> Result<TxHash> {
        let tx_hash = self.submit(call).await?;
        self.await_confirmation(tx_hash).await?;
        Ok(tx_hash)
    }
}

/// Apply [`READ_TIMEOUT`] to a read
async fn timed_read<T>(
    function: &'static str,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(READ_TIMEOUT, fut)
        .await
        .map_err(|_| ChainError::ReadFailed {
            function,
            message: format!("read timed out after {}s", READ_TIMEOUT.as_secs()),
        })?
}
