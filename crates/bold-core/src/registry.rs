//! Contract registry
//!
//! Resolves every contract address the flows need once, from [`AppConfig`].
//! After construction every lookup is infallible.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Address, AppConfig, BranchId, CollateralSymbol, ConfigError, BRANCH_COUNT};

/// Per-branch contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BranchContract {
    CollToken,
    BorrowerOperations,
    TroveManager,
    SortedTroves,
    StabilityPool,
    LeverageZapper,
}

impl BranchContract {
    pub const ALL: [BranchContract; 6] = [
        Self::CollToken,
        Self::BorrowerOperations,
        Self::TroveManager,
        Self::SortedTroves,
        Self::StabilityPool,
        Self::LeverageZapper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollToken => "COLL_TOKEN",
            Self::BorrowerOperations => "BORROWER_OPERATIONS",
            Self::TroveManager => "TROVE_MANAGER",
            Self::SortedTroves => "SORTED_TROVES",
            Self::StabilityPool => "STABILITY_POOL",
            Self::LeverageZapper => "LEVERAGE_ZAPPER",
        }
    }
}

/// Protocol-wide contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolContract {
    BoldToken,
    LqtyToken,
    CollateralRegistry,
    HintHelpers,
    ExchangeHelpers,
    Governance,
}

impl ProtocolContract {
    pub const ALL: [ProtocolContract; 6] = [
        Self::BoldToken,
        Self::LqtyToken,
        Self::CollateralRegistry,
        Self::HintHelpers,
        Self::ExchangeHelpers,
        Self::Governance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BoldToken => "BOLD_TOKEN",
            Self::LqtyToken => "LQTY_TOKEN",
            Self::CollateralRegistry => "COLLATERAL_REGISTRY",
            Self::HintHelpers => "HINT_HELPERS",
            Self::ExchangeHelpers => "EXCHANGE_HELPERS",
            Self::Governance => "GOVERNANCE",
        }
    }
}

/// ABI family a contract address speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractInterface {
    Erc20,
    BorrowerOperations,
    TroveManager,
    SortedTroves,
    StabilityPool,
    LeverageWethZapper,
    LeverageLstZapper,
    CollateralRegistry,
    HintHelpers,
    ExchangeHelpers,
    Governance,
}

impl fmt::Display for ContractInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Address plus the interface used to talk to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractRef {
    pub address: Address,
    pub interface: ContractInterface,
}

impl ContractRef {
    pub fn new(address: Address, interface: ContractInterface) -> Self {
        Self { address, interface }
    }

    pub fn erc20(address: Address) -> Self {
        Self::new(address, ContractInterface::Erc20)
    }
}

/// Resolved contracts of one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchContracts {
    pub coll_token: Address,
    pub borrower_operations: Address,
    pub trove_manager: Address,
    pub sorted_troves: Address,
    pub stability_pool: Address,
    pub leverage_zapper: Address,
}

/// A collateral branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub id: BranchId,
    pub symbol: CollateralSymbol,
    pub name: String,
    pub contracts: BranchContracts,
}

impl Branch {
    /// Zapper interface is fixed by the collateral: WETH zapper for the native branch
    pub fn zapper_interface(&self) -> ContractInterface {
        if self.symbol.is_native() {
            ContractInterface::LeverageWethZapper
        } else {
            ContractInterface::LeverageLstZapper
        }
    }
}

/// Validated, immutable set of branches and protocol contracts
#[derive(Debug, Clone)]
pub struct ContractRegistry {
    branches: Vec<Branch>,
    protocol: HashMap<ProtocolContract, Address>,
}

impl ContractRegistry {
    /// Validate the config and resolve every contract.
    ///
    /// Requires exactly three branches with the native `ETH` branch first and
    /// every branch and protocol contract present.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        if config.branches.len() != BRANCH_COUNT {
            return Err(ConfigError::BranchCount {
                expected: BRANCH_COUNT,
                found: config.branches.len(),
            });
        }

        let mut branches = Vec::with_capacity(BRANCH_COUNT);
        for (index, (raw, id)) in config.branches.iter().zip(BranchId::all()).enumerate() {
            if id.is_native() != raw.symbol.is_native() {
                return Err(ConfigError::BranchSymbol {
                    index,
                    expected: if id.is_native() { "ETH" } else { "a liquid staking token" },
                    found: raw.symbol.as_str(),
                });
            }

            let get = |contract: BranchContract| {
                raw.contracts.get(&contract).copied().ok_or(
                    ConfigError::MissingBranchContract {
                        branch: index,
                        contract: contract.as_str(),
                    },
                )
            };

            branches.push(Branch {
                id,
                symbol: raw.symbol,
                name: raw.name.clone(),
                contracts: BranchContracts {
                    coll_token: get(BranchContract::CollToken)?,
                    borrower_operations: get(BranchContract::BorrowerOperations)?,
                    trove_manager: get(BranchContract::TroveManager)?,
                    sorted_troves: get(BranchContract::SortedTroves)?,
                    stability_pool: get(BranchContract::StabilityPool)?,
                    leverage_zapper: get(BranchContract::LeverageZapper)?,
                },
            });
        }

        let mut protocol = HashMap::with_capacity(ProtocolContract::ALL.len());
        for contract in ProtocolContract::ALL {
            let address = config.protocol_contracts.get(&contract).copied().ok_or(
                ConfigError::MissingProtocolContract {
                    contract: contract.as_str(),
                },
            )?;
            protocol.insert(contract, address);
        }

        Ok(Self { branches, protocol })
    }

    pub fn branch(&self, id: BranchId) -> &Branch {
        &self.branches[id.index()]
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn branch_contract(&self, id: BranchId, contract: BranchContract) -> ContractRef {
        let branch = self.branch(id);
        let c = &branch.contracts;
        match contract {
            BranchContract::CollToken => ContractRef::erc20(c.coll_token),
            BranchContract::BorrowerOperations => {
                ContractRef::new(c.borrower_operations, ContractInterface::BorrowerOperations)
            }
            BranchContract::TroveManager => {
                ContractRef::new(c.trove_manager, ContractInterface::TroveManager)
            }
            BranchContract::SortedTroves => {
                ContractRef::new(c.sorted_troves, ContractInterface::SortedTroves)
            }
            BranchContract::StabilityPool => {
                ContractRef::new(c.stability_pool, ContractInterface::StabilityPool)
            }
            BranchContract::LeverageZapper => {
                ContractRef::new(c.leverage_zapper, branch.zapper_interface())
            }
        }
    }

    pub fn protocol_contract(&self, contract: ProtocolContract) -> ContractRef {
        let address = self.protocol[&contract];
        let interface = match contract {
            ProtocolContract::BoldToken | ProtocolContract::LqtyToken => ContractInterface::Erc20,
            ProtocolContract::CollateralRegistry => ContractInterface::CollateralRegistry,
            ProtocolContract::HintHelpers => ContractInterface::HintHelpers,
            ProtocolContract::ExchangeHelpers => ContractInterface::ExchangeHelpers,
            ProtocolContract::Governance => ContractInterface::Governance,
        };
        ContractRef::new(address, interface)
    }

    /// Leverage zapper of a branch, typed by the branch's collateral
    pub fn leverage_zapper(&self, id: BranchId) -> ContractRef {
        self.branch_contract(id, BranchContract::LeverageZapper)
    }

    pub fn coll_token(&self, id: BranchId) -> ContractRef {
        self.branch_contract(id, BranchContract::CollToken)
    }
}
