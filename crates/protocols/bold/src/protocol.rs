//! Shared handle passed to every flow

use bold_core::{
    Branch, BranchId, CollateralSymbol, ContractRegistry, ProtocolSettings, Result, TxHash, U256,
};
use evm_client::{ChainClient, ContractCall};
use leverage::QuoteService;

use crate::hints::{self, InsertionHints};

/// Chain client plus protocol-level defaults. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Protocol {
    client: ChainClient,
    hint_seed: u64,
}

impl Protocol {
    /// Hint seed taken from the client's settings
    pub fn new(client: ChainClient) -> Self {
        let hint_seed = client.settings().hint_seed;
        Self { client, hint_seed }
    }

    pub fn with_hint_seed(mut self, seed: u64) -> Self {
        self.hint_seed = seed;
        self
    }

    pub fn client(&self) -> &ChainClient {
        &self.client
    }

    pub fn registry(&self) -> &ContractRegistry {
        self.client.registry()
    }

    pub fn settings(&self) -> &ProtocolSettings {
        self.client.settings()
    }

    pub fn hint_seed(&self) -> u64 {
        self.hint_seed
    }

    pub fn branch(&self, id: BranchId) -> &Branch {
        self.registry().branch(id)
    }

    pub fn symbol(&self, id: BranchId) -> CollateralSymbol {
        self.branch(id).symbol
    }

    pub fn quotes(&self) -> QuoteService {
        QuoteService::new(self.client.clone())
    }

    /// Insertion hints for `interest_rate` using this handle's seed
    pub async fn insertion_hints(&self, branch: BranchId, interest_rate: U256) -> Result<InsertionHints> {
        hints::get_insertion_hints(&self.client, branch, interest_rate, self.hint_seed).await
    }

    /// Submit a flow's effect transaction; confirmation is left to the session
    pub async fn submit(&self, call: ContractCall) -> Result<TxHash> {
        Ok(self.client.submit(call).await?)
    }
}
