//! Typed user intents
//!
//! One request per flow. Amounts are 18-decimal fixed point; interest rates
//! are 18-decimal annual ratios (`5 * 10^16` = 5%).

use bold_core::{Address, BranchId, TroveId, I256, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBorrowRequest {
    pub account: Address,
    pub branch: BranchId,
    pub collateral_amount: U256,
    pub borrow_amount: U256,
    pub interest_rate: U256,
    pub max_upfront_fee: U256,
}

/// Signed deltas: positive adds, negative removes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustTroveRequest {
    pub account: Address,
    pub branch: BranchId,
    pub trove_id: TroveId,
    pub collateral_change: I256,
    pub debt_change: I256,
    pub max_upfront_fee: U256,
}

impl AdjustTroveRequest {
    pub fn is_adding_collateral(&self) -> bool {
        self.collateral_change.is_positive()
    }

    pub fn is_withdrawing_collateral(&self) -> bool {
        self.collateral_change.is_negative()
    }

    pub fn is_borrowing(&self) -> bool {
        self.debt_change.is_positive()
    }

    pub fn is_repaying(&self) -> bool {
        self.debt_change.is_negative()
    }

    pub fn collateral_delta(&self) -> U256 {
        self.collateral_change.unsigned_abs()
    }

    pub fn debt_delta(&self) -> U256 {
        self.debt_change.unsigned_abs()
    }

    /// Step label for the combination of collateral and debt changes
    pub fn action_label(&self) -> &'static str {
        let deposit = self.is_adding_collateral();
        let withdraw = self.is_withdrawing_collateral();
        let borrow = self.is_borrowing();
        let repay = self.is_repaying();

        match (deposit, withdraw, borrow, repay) {
            (true, _, true, _) => "Deposit & Borrow",
            (true, _, _, true) => "Deposit & Repay",
            (_, true, true, _) => "Withdraw & Borrow",
            (_, true, _, true) => "Withdraw & Repay",
            (true, _, _, _) => "Deposit Collateral",
            (_, true, _, _) => "Withdraw Collateral",
            (_, _, true, _) => "Borrow More",
            (_, _, _, true) => "Repay Debt",
            _ => "Adjust Position",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseTroveRequest {
    pub account: Address,
    pub branch: BranchId,
    pub trove_id: TroveId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnDepositRequest {
    pub account: Address,
    pub branch: BranchId,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnWithdrawRequest {
    pub account: Address,
    pub branch: BranchId,
    pub amount: U256,
    pub claim_rewards: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnClaimRequest {
    pub account: Address,
    pub branch: BranchId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRequest {
    pub account: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnstakeRequest {
    pub account: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimStakingRewardsRequest {
    pub account: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemRequest {
    pub account: Address,
    pub amount: U256,
    /// `None` (or 0) uses the configured default
    #[serde(default)]
    pub max_iterations_per_collateral: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustInterestRateRequest {
    pub account: Address,
    pub branch: BranchId,
    pub trove_id: TroveId,
    pub new_interest_rate: U256,
    pub max_upfront_fee: U256,
}

/// Join a batch manager; `interest_rate` is the batch's current rate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBatchManagerRequest {
    pub account: Address,
    pub branch: BranchId,
    pub trove_id: TroveId,
    pub batch_manager: Address,
    pub interest_rate: U256,
    pub max_upfront_fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveFromBatchRequest {
    pub account: Address,
    pub branch: BranchId,
    pub trove_id: TroveId,
    pub new_interest_rate: U256,
    pub max_upfront_fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLeverageRequest {
    pub account: Address,
    pub branch: BranchId,
    pub owner_index: U256,
    pub collateral_amount: U256,
    pub flash_loan_amount: U256,
    pub bold_amount: U256,
    pub interest_rate: U256,
    #[serde(default)]
    pub batch_manager: Option<Address>,
    pub max_upfront_fee: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeverageDirection {
    Up,
    Down,
}

/// `bold_amount` and `max_upfront_fee` apply to lever-up, `min_bold_amount` to lever-down
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLeverageRequest {
    pub account: Address,
    pub branch: BranchId,
    pub trove_id: TroveId,
    pub direction: LeverageDirection,
    pub flash_loan_amount: U256,
    #[serde(default)]
    pub bold_amount: U256,
    #[serde(default)]
    pub min_bold_amount: U256,
    #[serde(default)]
    pub max_upfront_fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseLeverageRequest {
    pub account: Address,
    pub branch: BranchId,
    pub trove_id: TroveId,
    pub flash_loan_amount: U256,
    pub min_collateral_amount: U256,
}

/// Any user intent, tagged by flow id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "flow_id")]
pub enum TxRequest {
    #[serde(rename = "openBorrow")]
    OpenBorrow(OpenBorrowRequest),
    #[serde(rename = "adjustTrove")]
    AdjustTrove(AdjustTroveRequest),
    #[serde(rename = "closeTrove")]
    CloseTrove(CloseTroveRequest),
    #[serde(rename = "earnDeposit")]
    EarnDeposit(EarnDepositRequest),
    #[serde(rename = "earnWithdraw")]
    EarnWithdraw(EarnWithdrawRequest),
    #[serde(rename = "earnClaim")]
    EarnClaim(EarnClaimRequest),
    #[serde(rename = "stakeLqty")]
    Stake(StakeRequest),
    #[serde(rename = "unstakeLqty")]
    Unstake(UnstakeRequest),
    #[serde(rename = "claimStakingRewards")]
    ClaimStakingRewards(ClaimStakingRewardsRequest),
    #[serde(rename = "redeemBold")]
    Redeem(RedeemRequest),
    #[serde(rename = "adjustInterestRate")]
    AdjustInterestRate(AdjustInterestRateRequest),
    #[serde(rename = "setBatchManager")]
    SetBatchManager(SetBatchManagerRequest),
    #[serde(rename = "removeFromBatch")]
    RemoveFromBatch(RemoveFromBatchRequest),
    #[serde(rename = "openLeverage")]
    OpenLeverage(OpenLeverageRequest),
    #[serde(rename = "updateLeverage")]
    UpdateLeverage(UpdateLeverageRequest),
    #[serde(rename = "closeLeverage")]
    CloseLeverage(CloseLeverageRequest),
}

impl TxRequest {
    pub fn flow_id(&self) -> &'static str {
        match self {
            Self::OpenBorrow(_) => "openBorrow",
            Self::AdjustTrove(_) => "adjustTrove",
            Self::CloseTrove(_) => "closeTrove",
            Self::EarnDeposit(_) => "earnDeposit",
            Self::EarnWithdraw(_) => "earnWithdraw",
            Self::EarnClaim(_) => "earnClaim",
            Self::Stake(_) => "stakeLqty",
            Self::Unstake(_) => "unstakeLqty",
            Self::ClaimStakingRewards(_) => "claimStakingRewards",
            Self::Redeem(_) => "redeemBold",
            Self::AdjustInterestRate(_) => "adjustInterestRate",
            Self::SetBatchManager(_) => "setBatchManager",
            Self::RemoveFromBatch(_) => "removeFromBatch",
            Self::OpenLeverage(_) => "openLeverage",
            Self::UpdateLeverage(_) => "updateLeverage",
            Self::CloseLeverage(_) => "closeLeverage",
        }
    }

    pub fn account(&self) -> Address {
        match self {
            Self::OpenBorrow(r) => r.account,
            Self::AdjustTrove(r) => r.account,
            Self::CloseTrove(r) => r.account,
            Self::EarnDeposit(r) => r.account,
            Self::EarnWithdraw(r) => r.account,
            Self::EarnClaim(r) => r.account,
            Self::Stake(r) => r.account,
            Self::Unstake(r) => r.account,
            Self::ClaimStakingRewards(r) => r.account,
            Self::Redeem(r) => r.account,
            Self::AdjustInterestRate(r) => r.account,
            Self::SetBatchManager(r) => r.account,
            Self::RemoveFromBatch(r) => r.account,
            Self::OpenLeverage(r) => r.account,
            Self::UpdateLeverage(r) => r.account,
            Self::CloseLeverage(r) => r.account,
        }
    }

    /// `None` for protocol-wide intents (staking, redemption)
    pub fn branch(&self) -> Option<BranchId> {
        match self {
            Self::OpenBorrow(r) => Some(r.branch),
            Self::AdjustTrove(r) => Some(r.branch),
            Self::CloseTrove(r) => Some(r.branch),
            Self::EarnDeposit(r) => Some(r.branch),
            Self::EarnWithdraw(r) => Some(r.branch),
            Self::EarnClaim(r) => Some(r.branch),
            Self::AdjustInterestRate(r) => Some(r.branch),
            Self::SetBatchManager(r) => Some(r.branch),
            Self::RemoveFromBatch(r) => Some(r.branch),
            Self::OpenLeverage(r) => Some(r.branch),
            Self::UpdateLeverage(r) => Some(r.branch),
            Self::CloseLeverage(r) => Some(r.branch),
            Self::Stake(_) | Self::Unstake(_) | Self::ClaimStakingRewards(_) | Self::Redeem(_) => {
                None
            }
        }
    }
}
