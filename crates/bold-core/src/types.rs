//! Core type definitions shared by every crate in the workspace

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ProtocolError;

pub use alloy_primitives::{Address, Bytes, B256, I256, U256};

/// Transaction hash (32 bytes)
pub type TxHash = B256;

/// Opaque on-chain trove identifier
pub type TroveId = U256;

/// Number of collateral branches deployed by the protocol
pub const BRANCH_COUNT: usize = 3;

/// Collateral branch index (0, 1 or 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BranchId(u8);

impl BranchId {
    /// The native-asset branch
    pub const NATIVE: BranchId = BranchId(0);

    pub fn new(id: u8) -> Result<Self, ProtocolError> {
        if (id as usize) < BRANCH_COUNT {
            Ok(Self(id))
        } else {
            Err(ProtocolError::UnknownBranch { id })
        }
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Branch 0 accepts the native asset directly through its zapper
    pub fn is_native(&self) -> bool {
        self.0 == 0
    }

    /// All branch ids in ascending order
    pub fn all() -> [BranchId; BRANCH_COUNT] {
        [BranchId(0), BranchId(1), BranchId(2)]
    }
}

impl TryFrom<u8> for BranchId {
    type Error = ProtocolError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<BranchId> for u8 {
    fn from(id: BranchId) -> Self {
        id.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collateral symbol of a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollateralSymbol {
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "WSTETH")]
    WstEth,
    #[serde(rename = "RETH")]
    REth,
}

impl CollateralSymbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eth => "ETH",
            Self::WstEth => "WSTETH",
            Self::REth => "RETH",
        }
    }

    /// Lowercase form used in route paths
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Eth => "eth",
            Self::WstEth => "wsteth",
            Self::REth => "reth",
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Eth)
    }
}

impl fmt::Display for CollateralSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Navigation link attached to a flow (back / success)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub path: String,
    pub label: String,
}

impl Link {
    pub fn new(path: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
        }
    }
}

/// Constants
pub mod constants {
    use super::U256;

    /// 1.0 in 18-decimal fixed point
    pub const DECIMAL_PRECISION: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

    /// Gas compensation sent with every trove opening (0.0375 ETH)
    pub const ETH_GAS_COMPENSATION_WEI: u64 = 37_500_000_000_000_000;

    /// Infinite approval amount
    pub const MAX_APPROVAL: U256 = U256::MAX;
}
