//! BOLD protocol constants

pub use bold_core::constants::{DECIMAL_PRECISION, MAX_APPROVAL};

/// Sorted-list hint search
pub mod hints {
    /// `numTrials = TRIALS_PER_ROOT * ceil(sqrt(list size))`
    pub const TRIALS_PER_ROOT: u64 = 10;
}

/// Redemption parameters
pub mod redemption {
    use bold_core::U256;

    /// Max fee percentage accepted by `redeemCollateral` (100%)
    pub const MAX_FEE_PERCENTAGE: U256 = super::DECIMAL_PRECISION;
}

/// Owner index for plain (non-leveraged) trove openings
pub const DEFAULT_OWNER_INDEX: u64 = 0;

/// Stability pool `doClaim` flag on deposits
pub const CLAIM_ON_DEPOSIT: bool = false;
