//! Interest rate changes and batch delegation
//!
//! All three effects move the trove within the sorted list, so each resolves
//! hints for the target rate right before submitting.

use async_trait::async_trait;
use bold_core::{BranchContract, BranchId, Link, Result, TxHash, U256};
use evm_client::ContractCall;
use tx_flow::{FlowDefinition, StepDefinition};

use super::{dashboard_link, effect_step, loan_link};
use crate::delegates;
use crate::protocol::Protocol;
use crate::requests::{AdjustInterestRateRequest, RemoveFromBatchRequest, SetBatchManagerRequest};

fn borrower_operations_call(protocol: &Protocol, branch: BranchId, function: &'static str) -> ContractCall {
    ContractCall::new(
        protocol
            .registry()
            .branch_contract(branch, BranchContract::BorrowerOperations),
        function,
    )
}

// ─── Adjust rate ────────────────────────────────────────────────────────────

pub struct AdjustInterestRateFlow {
    protocol: Protocol,
    request: AdjustInterestRateRequest,
}

impl AdjustInterestRateFlow {
    pub fn new(protocol: Protocol, request: AdjustInterestRateRequest) -> Self {
        Self { protocol, request }
    }
}

#[async_trait]
impl FlowDefinition for AdjustInterestRateFlow {
    fn flow_id(&self) -> &'static str {
        "adjustInterestRate"
    }

    fn title(&self) -> String {
        "Update Interest Rate".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        Ok(vec![effect_step(
            "adjustRate",
            "Update Interest Rate",
            &self.protocol,
            &self.request,
            adjust_rate,
        )])
    }

    fn success_message(&self) -> Option<String> {
        Some(format!(
            "Successfully updated interest rate on your {} position",
            self.protocol.symbol(self.request.branch)
        ))
    }

    fn back_link(&self) -> Option<Link> {
        Some(Link::new("/loan/rate", "Back to Rate"))
    }

    fn success_link(&self) -> Option<Link> {
        Some(dashboard_link())
    }
}

async fn adjust_rate(protocol: Protocol, request: AdjustInterestRateRequest) -> Result<TxHash> {
    let hints = protocol
        .insertion_hints(request.branch, request.new_interest_rate)
        .await?;
    let call = borrower_operations_call(&protocol, request.branch, "adjustTroveInterestRate")
        .arg(request.trove_id)
        .arg(request.new_interest_rate)
        .arg(hints.upper_hint)
        .arg(hints.lower_hint)
        .arg(request.max_upfront_fee);
    protocol.submit(call).await
}

// ─── Set batch manager ──────────────────────────────────────────────────────

pub struct SetBatchManagerFlow {
    protocol: Protocol,
    request: SetBatchManagerRequest,
}

impl SetBatchManagerFlow {
    pub fn new(protocol: Protocol, request: SetBatchManagerRequest) -> Self {
        Self { protocol, request }
    }
}

#[async_trait]
impl FlowDefinition for SetBatchManagerFlow {
    fn flow_id(&self) -> &'static str {
        "setBatchManager"
    }

    fn title(&self) -> String {
        "Set Interest Rate Delegate".to_string()
    }

    /// Fails unless the manager is registered and the batch rate lies in its range
    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        let request = &self.request;
        let constraints =
            delegates::fetch_constraints(self.protocol.client(), request.branch, request.batch_manager)
                .await?;
        constraints.check_rate(request.interest_rate)?;

        Ok(vec![effect_step(
            "setBatchManager",
            "Set Interest Rate Delegate",
            &self.protocol,
            request,
            set_batch_manager,
        )])
    }

    fn success_message(&self) -> Option<String> {
        Some(format!(
            "Successfully delegated interest rate management for {} position",
            self.protocol.symbol(self.request.branch)
        ))
    }

    fn back_link(&self) -> Option<Link> {
        Some(loan_link("Back to Position"))
    }

    fn success_link(&self) -> Option<Link> {
        Some(loan_link("View Position"))
    }
}

async fn set_batch_manager(protocol: Protocol, request: SetBatchManagerRequest) -> Result<TxHash> {
    let hints = protocol
        .insertion_hints(request.branch, request.interest_rate)
        .await?;
    let call = borrower_operations_call(&protocol, request.branch, "setInterestBatchManager")
        .arg(request.trove_id)
        .arg(request.batch_manager)
        .arg(hints.upper_hint)
        .arg(hints.lower_hint)
        .arg(request.max_upfront_fee);
    protocol.submit(call).await
}

// ─── Remove from batch ──────────────────────────────────────────────────────

pub struct RemoveFromBatchFlow {
    protocol: Protocol,
    request: RemoveFromBatchRequest,
}

impl RemoveFromBatchFlow {
    pub fn new(protocol: Protocol, request: RemoveFromBatchRequest) -> Self {
        Self { protocol, request }
    }
}

#[async_trait]
impl FlowDefinition for RemoveFromBatchFlow {
    fn flow_id(&self) -> &'static str {
        "removeFromBatch"
    }

    fn title(&self) -> String {
        "Remove Interest Rate Delegate".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        Ok(vec![effect_step(
            "removeFromBatch",
            "Remove Interest Rate Delegate",
            &self.protocol,
            &self.request,
            remove_from_batch,
        )])
    }

    fn success_message(&self) -> Option<String> {
        Some(format!(
            "Successfully removed delegate for {} position",
            self.protocol.symbol(self.request.branch)
        ))
    }

    fn back_link(&self) -> Option<Link> {
        Some(loan_link("Back to Position"))
    }

    fn success_link(&self) -> Option<Link> {
        Some(loan_link("View Position"))
    }
}

async fn remove_from_batch(protocol: Protocol, request: RemoveFromBatchRequest) -> Result<TxHash> {
    let hints = protocol
        .insertion_hints(request.branch, request.new_interest_rate)
        .await?;
    let call = borrower_operations_call(&protocol, request.branch, "removeFromBatch")
        .arg(request.trove_id)
        .arg(request.new_interest_rate)
        .arg(hints.upper_hint)
        .arg(hints.lower_hint)
        .arg(request.max_upfront_fee);
    protocol.submit(call).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegates::tests::constraints_value;
    use crate::flows::test_support::*;
    use bold_core::Address;
    use evm_client::CallValue;

    /// 1% in 18-decimal fixed point
    const ONE_PERCENT: U256 = U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]);

    fn manager() -> Address {
        Address::with_last_byte(0x42)
    }

    fn set_request(rate: U256) -> SetBatchManagerRequest {
        SetBatchManagerRequest {
            account: account(),
            branch: BranchId::new(1).unwrap(),
            trove_id: U256::from(8u64),
            batch_manager: manager(),
            interest_rate: rate,
            max_upfront_fee: e18(1),
        }
    }

    fn script_constraints(mock: &evm_client::mock::MockChain, protocol: &Protocol, min: u64, max: u64) {
        let borrower_ops = protocol
            .registry()
            .branch_contract(BranchId::new(1).unwrap(), BranchContract::BorrowerOperations)
            .address;
        mock.set_read(borrower_ops, "getInterestBatchManager", constraints_value(min, max, 3600));
    }

    #[tokio::test]
    async fn test_adjust_rate_resolves_hints_for_new_rate() {
        let (mock, protocol) = setup();
        let branch = BranchId::new(2).unwrap();
        script_hints(&mock, &protocol, branch);
        let new_rate = ONE_PERCENT * U256::from(7u64);

        let flow = AdjustInterestRateFlow::new(
            protocol,
            AdjustInterestRateRequest {
                account: account(),
                branch,
                trove_id: U256::from(3u64),
                new_interest_rate: new_rate,
                max_upfront_fee: e18(2),
            },
        );
        let steps = flow.steps().await.unwrap();
        // Nothing read until the step runs
        assert!(mock.reads().is_empty());

        steps[0].execute().await.unwrap();
        assert_eq!(
            mock.read_functions(),
            vec!["getSize", "getApproxHint", "findInsertPosition"]
        );
        assert_eq!(mock.reads()[1].args[1], CallValue::Uint(new_rate));
        assert_eq!(
            mock.submissions()[0].args,
            vec![
                CallValue::Uint(U256::from(3u64)),
                CallValue::Uint(new_rate),
                CallValue::Uint(U256::from(54u64)),
                CallValue::Uint(U256::from(56u64)),
                CallValue::Uint(e18(2)),
            ]
        );
    }

    #[tokio::test]
    async fn test_set_batch_manager_within_range() {
        let (mock, protocol) = setup();
        let min = 10_000_000_000_000_000u64;
        let max = 100_000_000_000_000_000u64;
        script_constraints(&mock, &protocol, min, max);
        script_hints(&mock, &protocol, BranchId::new(1).unwrap());

        let flow = SetBatchManagerFlow::new(protocol, set_request(U256::from(min)));
        let steps = flow.steps().await.unwrap();
        steps[0].execute().await.unwrap();

        let call = &mock.submissions()[0];
        assert_eq!(call.function, "setInterestBatchManager");
        assert_eq!(call.args[1], CallValue::Address(manager()));
        assert_eq!(call.args.len(), 5);
    }

    #[tokio::test]
    async fn test_set_batch_manager_rate_outside_range() {
        let (mock, protocol) = setup();
        script_constraints(&mock, &protocol, 10, 100);

        let flow = SetBatchManagerFlow::new(protocol, set_request(U256::from(101u64)));
        let err = flow.steps().await.unwrap_err();
        assert_eq!(err.error_code(), "rate_outside_batch_range");
    }

    #[tokio::test]
    async fn test_set_batch_manager_unknown_manager() {
        let (mock, protocol) = setup();
        script_constraints(&mock, &protocol, 0, 0);

        let flow = SetBatchManagerFlow::new(protocol, set_request(U256::from(1u64)));
        let err = flow.steps().await.unwrap_err();
        assert_eq!(err.error_code(), "batch_manager_not_found");
    }

    #[tokio::test]
    async fn test_remove_from_batch() {
        let (mock, protocol) = setup();
        script_hints(&mock, &protocol, BranchId::NATIVE);

        let flow = RemoveFromBatchFlow::new(
            protocol,
            RemoveFromBatchRequest {
                account: account(),
                branch: BranchId::NATIVE,
                trove_id: U256::from(4u64),
                new_interest_rate: ONE_PERCENT,
                max_upfront_fee: U256::ZERO,
            },
        );
        flow.steps().await.unwrap()[0].execute().await.unwrap();

        let call = &mock.submissions()[0];
        assert_eq!(call.function, "removeFromBatch");
        assert_eq!(call.args[1], CallValue::Uint(ONE_PERCENT));
        assert_eq!(flow.back_link().unwrap().label, "Back to Position");
        assert_eq!(
            flow.success_message().unwrap(),
            "Successfully removed delegate for ETH position"
        );
    }
}
