//! Scripted chain for tests without a transport.
//!
//! Reads are scripted per `(address, function)`: queued responses are consumed
//! in order and the last one stays in place for every later read.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bold_core::{
    Address, AppConfig, BranchConfig, BranchContract, Bytes, ChainError, CollateralSymbol,
    ContractRegistry, ProtocolContract, ProtocolSettings, TxHash, B256, U256,
};
use tokio::sync::watch;

use crate::{
    CallValue, ChainClient, ConfirmationCapability, ContractCall, ExecutionCapability,
    ReadCapability, Receipt,
};

#[derive(Debug, Default)]
struct MockState {
    reads: HashMap<(Address, &'static str), VecDeque<Result<CallValue, ChainError>>>,
    code: HashMap<Address, Bytes>,
    read_log: Vec<ContractCall>,
    submissions: Vec<(TxHash, ContractCall)>,
    submit_failures: HashMap<&'static str, String>,
    reverting: Vec<&'static str>,
    confirmation_failures: HashMap<&'static str, String>,
    confirmed: Vec<TxHash>,
    next_tx: u64,
}

/// In-memory chain implementing every capability
#[derive(Debug, Clone)]
pub struct MockChain {
    state: Arc<Mutex<MockState>>,
    /// `true` while confirmations are allowed to resolve
    gate: Arc<watch::Sender<bool>>,
}

impl MockChain {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            gate: Arc::new(gate),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Client over this mock with the sample registry and default settings
    pub fn client(&self) -> ChainClient {
        self.client_with(ProtocolSettings::default())
    }

    pub fn client_with(&self, settings: ProtocolSettings) -> ChainClient {
        let registry = ContractRegistry::from_config(&sample_config())
            .unwrap_or_else(|e| panic!("sample config must be valid: {}", e));
        ChainClient::from_backend(Arc::new(self.clone()), Arc::new(registry), settings)
    }

    // Scripting

    /// Replace every scripted response for `(address, function)`
    pub fn set_read(&self, address: Address, function: &'static str, value: impl Into<CallValue>) {
        let mut queue = VecDeque::new();
        queue.push_back(Ok(value.into()));
        self.state().reads.insert((address, function), queue);
    }

    /// Queue a response after the ones already scripted
    pub fn push_read(&self, address: Address, function: &'static str, value: impl Into<CallValue>) {
        self.state()
            .reads
            .entry((address, function))
            .or_default()
            .push_back(Ok(value.into()));
    }

    pub fn fail_read(&self, address: Address, function: &'static str, message: &str) {
        let mut queue = VecDeque::new();
        queue.push_back(Err(ChainError::ReadFailed {
            function,
            message: message.to_string(),
        }));
        self.state().reads.insert((address, function), queue);
    }

    pub fn set_code(&self, address: Address, code: Bytes) {
        self.state().code.insert(address, code);
    }

    /// Reject every submission of `function` (wallet rejection)
    pub fn fail_submission(&self, function: &'static str, message: &str) {
        self.state()
            .submit_failures
            .insert(function, message.to_string());
    }

    pub fn clear_submission_failure(&self, function: &'static str) {
        self.state().submit_failures.remove(function);
    }

    /// Mine `function` with a failed receipt
    pub fn revert_on(&self, function: &'static str) {
        self.state().reverting.push(function);
    }

    /// Make the receipt wait for `function` fail
    pub fn fail_confirmation(&self, function: &'static str, message: &str) {
        self.state()
            .confirmation_failures
            .insert(function, message.to_string());
    }

    /// Keep every receipt wait pending until [`release_confirmations`](Self::release_confirmations)
    pub fn hold_confirmations(&self) {
        self.gate.send_replace(false);
    }

    pub fn release_confirmations(&self) {
        self.gate.send_replace(true);
    }

    // Inspection

    pub fn reads(&self) -> Vec<ContractCall> {
        self.state().read_log.clone()
    }

    pub fn read_functions(&self) -> Vec<&'static str> {
        self.state().read_log.iter().map(|c| c.function).collect()
    }

    pub fn submissions(&self) -> Vec<ContractCall> {
        self.state()
            .submissions
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn submitted_functions(&self) -> Vec<&'static str> {
        self.state()
            .submissions
            .iter()
            .map(|(_, call)| call.function)
            .collect()
    }

    pub fn confirmed(&self) -> Vec<TxHash> {
        self.state().confirmed.clone()
    }

    fn function_of(&self, tx_hash: TxHash) -> Option<&'static str> {
        self.state()
            .submissions
            .iter()
            .find(|(hash, _)| *hash == tx_hash)
            .map(|(_, call)| call.function)
    }
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadCapability for MockChain {
    async fn read(&self, call: &ContractCall) -> Result<CallValue, ChainError> {
        let mut state = self.state();
        state.read_log.push(call.clone());

        let queue = state
            .reads
            .get_mut(&(call.address(), call.function))
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ChainError::ReadFailed {
                function: call.function,
                message: format!("no scripted response at {}", call.address()),
            })?;

        if queue.len() > 1 {
            if let Some(next) = queue.pop_front() {
                return next;
            }
        }
        queue[0].clone()
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        Ok(self.state().code.get(&address).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ExecutionCapability for MockChain {
    async fn submit(&self, call: ContractCall) -> Result<TxHash, ChainError> {
        let mut state = self.state();
        if let Some(message) = state.submit_failures.get(call.function) {
            return Err(ChainError::SubmissionRejected {
                message: message.clone(),
            });
        }

        state.next_tx += 1;
        let tx_hash = B256::from(U256::from(state.next_tx).to_be_bytes::<32>());
        state.submissions.push((tx_hash, call));
        Ok(tx_hash)
    }
}

#[async_trait]
impl ConfirmationCapability for MockChain {
    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        _min_confirmations: u64,
    ) -> Result<Receipt, ChainError> {
        let mut gate = self.gate.subscribe();
        // The sender lives as long as `self`, so this only fails if the mock is gone
        let _ = gate.wait_for(|open| *open).await;

        let function = self.function_of(tx_hash);
        let mut state = self.state();

        if let Some(message) = function.and_then(|f| state.confirmation_failures.get(f)) {
            return Err(ChainError::ConfirmationFailed {
                tx_hash,
                message: message.clone(),
            });
        }

        let success = !function.is_some_and(|f| state.reverting.contains(&f));
        state.confirmed.push(tx_hash);
        let block_number = 100 + state.confirmed.len() as u64;

        Ok(Receipt {
            tx_hash,
            block_number,
            success,
            gas_used: 21_000,
        })
    }
}

/// Complete configuration with deterministic addresses.
///
/// Branch `i` contract `j` (in [`BranchContract::ALL`] order) lives at
/// `0x…{0x10 * (i + 1) + j}`; protocol contract `j` at `0x…{0xa0 + j}`.
pub fn sample_config() -> AppConfig {
    let branches = [
        (CollateralSymbol::Eth, "Ether"),
        (CollateralSymbol::WstEth, "Wrapped stETH"),
        (CollateralSymbol::REth, "Rocket Pool ETH"),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (symbol, name))| BranchConfig {
        symbol,
        name: name.to_string(),
        contracts: BranchContract::ALL
            .iter()
            .enumerate()
            .map(|(j, c)| (*c, Address::with_last_byte((0x10 * (i + 1) + j) as u8)))
            .collect(),
    })
    .collect();

    AppConfig {
        chain: Default::default(),
        branches,
        protocol_contracts: ProtocolContract::ALL
            .iter()
            .enumerate()
            .map(|(j, c)| (*c, Address::with_last_byte(0xa0 + j as u8)))
            .collect(),
        settings: ProtocolSettings::default(),
    }
}
