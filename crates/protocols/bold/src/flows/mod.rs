//! Flow definitions, one per user intent
//!
//! Each flow reads whatever it needs (allowances, trove state, batch
//! constraints) while building its steps, adds approval or setup steps only
//! when required, and ends with exactly one effect step. Effect steps resolve
//! their hints when they run, so a resumed flow uses fresh list positions.

use std::future::Future;

use bold_core::{Address, ContractRef, Link, Result, TxHash, U256};
use tx_flow::{FlowDefinition, StepDefinition};

use crate::approvals;
use crate::protocol::Protocol;
use crate::requests::TxRequest;

pub mod borrow;
pub mod earn;
pub mod multiply;
pub mod rate;
pub mod redeem;
pub mod stake;

pub use borrow::{AdjustTroveFlow, CloseTroveFlow, OpenBorrowFlow};
pub use earn::{EarnClaimFlow, EarnDepositFlow, EarnWithdrawFlow};
pub use multiply::{CloseLeverageFlow, OpenLeverageFlow, UpdateLeverageFlow};
pub use rate::{AdjustInterestRateFlow, RemoveFromBatchFlow, SetBatchManagerFlow};
pub use redeem::RedeemFlow;
pub use stake::{ClaimStakingRewardsFlow, StakeFlow, UnstakeFlow};

/// Flow definition for a request
pub fn definition_for(protocol: &Protocol, request: TxRequest) -> Box<dyn FlowDefinition> {
    let protocol = protocol.clone();
    match request {
        TxRequest::OpenBorrow(r) => Box::new(OpenBorrowFlow::new(protocol, r)),
        TxRequest::AdjustTrove(r) => Box::new(AdjustTroveFlow::new(protocol, r)),
        TxRequest::CloseTrove(r) => Box::new(CloseTroveFlow::new(protocol, r)),
        TxRequest::EarnDeposit(r) => Box::new(EarnDepositFlow::new(protocol, r)),
        TxRequest::EarnWithdraw(r) => Box::new(EarnWithdrawFlow::new(protocol, r)),
        TxRequest::EarnClaim(r) => Box::new(EarnClaimFlow::new(protocol, r)),
        TxRequest::Stake(r) => Box::new(StakeFlow::new(protocol, r)),
        TxRequest::Unstake(r) => Box::new(UnstakeFlow::new(protocol, r)),
        TxRequest::ClaimStakingRewards(r) => Box::new(ClaimStakingRewardsFlow::new(protocol, r)),
        TxRequest::Redeem(r) => Box::new(RedeemFlow::new(protocol, r)),
        TxRequest::AdjustInterestRate(r) => Box::new(AdjustInterestRateFlow::new(protocol, r)),
        TxRequest::SetBatchManager(r) => Box::new(SetBatchManagerFlow::new(protocol, r)),
        TxRequest::RemoveFromBatch(r) => Box::new(RemoveFromBatchFlow::new(protocol, r)),
        TxRequest::OpenLeverage(r) => Box::new(OpenLeverageFlow::new(protocol, r)),
        TxRequest::UpdateLeverage(r) => Box::new(UpdateLeverageFlow::new(protocol, r)),
        TxRequest::CloseLeverage(r) => Box::new(CloseLeverageFlow::new(protocol, r)),
    }
}

// ─── Step builders ──────────────────────────────────────────────────────────

/// Approve `spender` for exactly `amount` of `token`
///
/// Only submits: the session waits for the receipt before the next step runs.
pub(crate) fn approval_step(
    id: &'static str,
    label: impl Into<String>,
    protocol: &Protocol,
    token: ContractRef,
    spender: Address,
    amount: U256,
) -> StepDefinition {
    let protocol = protocol.clone();
    StepDefinition::new(id, label, move || {
        let protocol = protocol.clone();
        async move {
            protocol
                .submit(approvals::approval_call(token, spender, amount))
                .await
        }
    })
}

/// Step running `effect(protocol, request)` on every invocation
pub(crate) fn effect_step<R, F, Fut>(
    id: &'static str,
    label: impl Into<String>,
    protocol: &Protocol,
    request: &R,
    effect: F,
) -> StepDefinition
where
    R: Clone + Send + Sync + 'static,
    F: Fn(Protocol, R) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TxHash>> + Send + 'static,
{
    let protocol = protocol.clone();
    let request = request.clone();
    StepDefinition::new(id, label, move || effect(protocol.clone(), request.clone()))
}

// ─── Links ──────────────────────────────────────────────────────────────────

pub(crate) fn dashboard_link() -> Link {
    Link::new("/", "View Dashboard")
}

pub(crate) fn loan_link(label: &str) -> Link {
    Link::new("/loan", label)
}
