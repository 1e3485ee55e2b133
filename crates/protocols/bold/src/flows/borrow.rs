//! Open, adjust and close a trove
//!
//! The native (ETH) branch moves collateral as raw ETH through the branch
//! zapper; LST branches approve the collateral token and go through
//! `BorrowerOperations`.

use async_trait::async_trait;
use bold_core::{
    Address, BranchContract, ContractInterface, ContractRef, Link, ProtocolContract, Result,
    TxHash, U256,
};
use evm_client::{CallValue, ContractCall};
use tx_flow::{FlowDefinition, StepDefinition};

use super::{approval_step, dashboard_link, effect_step, loan_link};
use crate::approvals;
use crate::constants::DEFAULT_OWNER_INDEX;
use crate::protocol::Protocol;
use crate::requests::{AdjustTroveRequest, CloseTroveRequest, OpenBorrowRequest};
use crate::troves;

// ─── Open ───────────────────────────────────────────────────────────────────

pub struct OpenBorrowFlow {
    protocol: Protocol,
    request: OpenBorrowRequest,
}

impl OpenBorrowFlow {
    pub fn new(protocol: Protocol, request: OpenBorrowRequest) -> Self {
        Self { protocol, request }
    }
}

#[async_trait]
impl FlowDefinition for OpenBorrowFlow {
    fn flow_id(&self) -> &'static str {
        "openBorrow"
    }

    fn title(&self) -> String {
        "Open Borrow Position".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        let request = &self.request;
        let symbol = self.protocol.symbol(request.branch);
        let mut steps = Vec::new();

        if !symbol.is_native()
            && approvals::needs_collateral_approval(
                self.protocol.client(),
                request.branch,
                request.account,
                request.collateral_amount,
            )
            .await?
        {
            let registry = self.protocol.registry();
            steps.push(approval_step(
                "approve",
                format!("Approve {}", symbol),
                &self.protocol,
                registry.coll_token(request.branch),
                registry
                    .branch_contract(request.branch, BranchContract::BorrowerOperations)
                    .address,
                request.collateral_amount,
            ));
        }

        steps.push(effect_step(
            "openTrove",
            "Open Position",
            &self.protocol,
            request,
            open_trove,
        ));
        Ok(steps)
    }

    fn success_message(&self) -> Option<String> {
        Some(format!(
            "Successfully opened a {} borrow position",
            self.protocol.symbol(self.request.branch)
        ))
    }

    fn back_link(&self) -> Option<Link> {
        let symbol = self.protocol.symbol(self.request.branch);
        Some(Link::new(format!("/borrow/{}", symbol.slug()), "Back to Borrow"))
    }

    fn success_link(&self) -> Option<Link> {
        Some(dashboard_link())
    }
}

async fn open_trove(protocol: Protocol, request: OpenBorrowRequest) -> Result<TxHash> {
    let hints = protocol
        .insertion_hints(request.branch, request.interest_rate)
        .await?;
    let registry = protocol.registry();
    let gas_compensation = protocol.settings().gas_compensation();

    let call = if protocol.symbol(request.branch).is_native() {
        // Collateral travels as value, not as a token amount
        let params = CallValue::record([
            ("owner", request.account.into()),
            ("ownerIndex", DEFAULT_OWNER_INDEX.into()),
            ("collAmount", U256::ZERO.into()),
            ("boldAmount", request.borrow_amount.into()),
            ("upperHint", hints.upper_hint.into()),
            ("lowerHint", hints.lower_hint.into()),
            ("annualInterestRate", request.interest_rate.into()),
            ("batchManager", Address::ZERO.into()),
            ("maxUpfrontFee", request.max_upfront_fee.into()),
            ("addManager", Address::ZERO.into()),
            ("removeManager", Address::ZERO.into()),
            ("receiver", Address::ZERO.into()),
        ]);
        ContractCall::new(registry.leverage_zapper(request.branch), "openTroveWithRawETH")
            .arg(params)
            .with_value(request.collateral_amount + gas_compensation)
    } else {
        ContractCall::new(
            registry.branch_contract(request.branch, BranchContract::BorrowerOperations),
            "openTrove",
        )
        .arg(request.account)
        .arg(DEFAULT_OWNER_INDEX)
        .arg(request.collateral_amount)
        .arg(request.borrow_amount)
        .arg(hints.upper_hint)
        .arg(hints.lower_hint)
        .arg(request.interest_rate)
        .arg(request.max_upfront_fee)
        .args([Address::ZERO; 3])
        .with_value(gas_compensation)
    };

    protocol.submit(call).await
}

// ─── Adjust ─────────────────────────────────────────────────────────────────

pub struct AdjustTroveFlow {
    protocol: Protocol,
    request: AdjustTroveRequest,
}

impl AdjustTroveFlow {
    pub fn new(protocol: Protocol, request: AdjustTroveRequest) -> Self {
        Self { protocol, request }
    }
}

/// Contract the adjustment is sent to: the zapper when adding raw ETH
fn adjust_router(protocol: &Protocol, request: &AdjustTroveRequest) -> ContractRef {
    let registry = protocol.registry();
    if protocol.symbol(request.branch).is_native() && request.is_adding_collateral() {
        registry.leverage_zapper(request.branch)
    } else {
        registry.branch_contract(request.branch, BranchContract::BorrowerOperations)
    }
}

#[async_trait]
impl FlowDefinition for AdjustTroveFlow {
    fn flow_id(&self) -> &'static str {
        "adjustTrove"
    }

    fn title(&self) -> String {
        "Adjust Position".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        let request = &self.request;
        let client = self.protocol.client();
        let registry = self.protocol.registry();
        let symbol = self.protocol.symbol(request.branch);
        let mut steps = Vec::new();

        if !symbol.is_native()
            && request.is_adding_collateral()
            && approvals::needs_collateral_approval(
                client,
                request.branch,
                request.account,
                request.collateral_delta(),
            )
            .await?
        {
            steps.push(approval_step(
                "approveCollateral",
                format!("Approve {}", symbol),
                &self.protocol,
                registry.coll_token(request.branch),
                registry
                    .branch_contract(request.branch, BranchContract::BorrowerOperations)
                    .address,
                request.collateral_delta(),
            ));
        }

        if request.is_repaying() {
            let bold = registry.protocol_contract(ProtocolContract::BoldToken);
            let spender = adjust_router(&self.protocol, request).address;
            let repay = request.debt_delta();
            if approvals::needs_approval(client, bold, request.account, spender, repay).await? {
                steps.push(approval_step(
                    "approveBold",
                    "Approve BOLD",
                    &self.protocol,
                    bold,
                    spender,
                    repay,
                ));
            }
        }

        steps.push(effect_step(
            "adjustTrove",
            request.action_label(),
            &self.protocol,
            request,
            adjust_trove,
        ));
        Ok(steps)
    }

    fn success_message(&self) -> Option<String> {
        Some(format!(
            "Successfully adjusted your {} position",
            self.protocol.symbol(self.request.branch)
        ))
    }

    fn back_link(&self) -> Option<Link> {
        Some(loan_link("Back to Loan"))
    }

    fn success_link(&self) -> Option<Link> {
        Some(dashboard_link())
    }
}

async fn adjust_trove(protocol: Protocol, request: AdjustTroveRequest) -> Result<TxHash> {
    // The trove keeps its rate, hints locate it at that rate
    let trove = troves::fetch_trove(protocol.client(), request.branch, request.trove_id).await?;
    let hints = protocol
        .insertion_hints(request.branch, trove.annual_interest_rate)
        .await?;

    let router = adjust_router(&protocol, &request);
    let via_zapper = router.interface != ContractInterface::BorrowerOperations;
    let function = if via_zapper {
        "adjustTroveWithRawETH"
    } else {
        "adjustTrove"
    };

    let mut call = ContractCall::new(router, function)
        .arg(request.trove_id)
        .arg(request.collateral_delta())
        .arg(request.is_adding_collateral())
        .arg(request.debt_delta())
        .arg(request.is_borrowing())
        .arg(hints.upper_hint)
        .arg(hints.lower_hint)
        .arg(request.max_upfront_fee);
    if via_zapper {
        call = call.with_value(request.collateral_delta());
    }

    protocol.submit(call).await
}

// ─── Close ──────────────────────────────────────────────────────────────────

pub struct CloseTroveFlow {
    protocol: Protocol,
    request: CloseTroveRequest,
}

impl CloseTroveFlow {
    pub fn new(protocol: Protocol, request: CloseTroveRequest) -> Self {
        Self { protocol, request }
    }

    /// Zapper on the native branch (unwraps to ETH), `BorrowerOperations` otherwise
    fn router(&self) -> ContractRef {
        let registry = self.protocol.registry();
        if self.protocol.symbol(self.request.branch).is_native() {
            registry.leverage_zapper(self.request.branch)
        } else {
            registry.branch_contract(self.request.branch, BranchContract::BorrowerOperations)
        }
    }
}

#[async_trait]
impl FlowDefinition for CloseTroveFlow {
    fn flow_id(&self) -> &'static str {
        "closeTrove"
    }

    fn title(&self) -> String {
        "Close Position".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        let request = &self.request;
        let client = self.protocol.client();
        let trove = troves::fetch_trove(client, request.branch, request.trove_id).await?;

        let mut steps = Vec::new();
        let bold = self
            .protocol
            .registry()
            .protocol_contract(ProtocolContract::BoldToken);
        let spender = self.router().address;
        if approvals::needs_approval(client, bold, request.account, spender, trove.debt).await? {
            steps.push(approval_step(
                "approveBold",
                "Approve BOLD",
                &self.protocol,
                bold,
                spender,
                trove.debt,
            ));
        }

        let router = self.router();
        let function = if router.interface == ContractInterface::BorrowerOperations {
            "closeTrove"
        } else {
            "closeTroveToRawETH"
        };
        let protocol = self.protocol.clone();
        let trove_id = request.trove_id;
        steps.push(StepDefinition::new("closeTrove", "Close Position", move || {
            let protocol = protocol.clone();
            async move {
                protocol
                    .submit(ContractCall::new(router, function).arg(trove_id))
                    .await
            }
        }));
        Ok(steps)
    }

    fn success_message(&self) -> Option<String> {
        Some(format!(
            "Successfully closed your {} position",
            self.protocol.symbol(self.request.branch)
        ))
    }

    fn back_link(&self) -> Option<Link> {
        Some(loan_link("Back to Loan"))
    }

    fn success_link(&self) -> Option<Link> {
        Some(dashboard_link())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::test_support::*;
    use crate::troves::tests::troves_tuple;
    use bold_core::{BranchId, I256};

    fn open_request(branch: BranchId) -> OpenBorrowRequest {
        OpenBorrowRequest {
            account: account(),
            branch,
            collateral_amount: e18(2),
            borrow_amount: e18(2000),
            interest_rate: U256::from(50_000_000_000_000_000u64),
            max_upfront_fee: e18(5),
        }
    }

    #[tokio::test]
    async fn test_open_native_skips_approval_and_sends_value() {
        let (mock, protocol) = setup();
        script_hints(&mock, &protocol, BranchId::NATIVE);
        let flow = OpenBorrowFlow::new(protocol.clone(), open_request(BranchId::NATIVE));

        let steps = flow.steps().await.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].id, "openTrove");
        // No allowance read on the native branch
        assert!(mock.reads().is_empty());

        steps[0].execute().await.unwrap();
        let call = &mock.submissions()[0];
        assert_eq!(call.function, "openTroveWithRawETH");
        assert_eq!(call.address(), protocol.registry().leverage_zapper(BranchId::NATIVE).address);
        assert_eq!(call.value, e18(2) + protocol.settings().gas_compensation());
        assert_eq!(call.args[0].field("collAmount"), Some(&CallValue::Uint(U256::ZERO)));
        assert_eq!(call.args[0].field("upperHint"), Some(&CallValue::Uint(U256::from(54u64))));
    }

    #[tokio::test]
    async fn test_open_lst_needs_approval() {
        let (mock, protocol) = setup();
        let branch = BranchId::new(1).unwrap();
        script_allowance(&mock, protocol.registry().coll_token(branch).address, U256::ZERO);
        script_hints(&mock, &protocol, branch);

        let flow = OpenBorrowFlow::new(protocol.clone(), open_request(branch));
        let steps = flow.steps().await.unwrap();
        assert_eq!(steps.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(), vec!["approve", "openTrove"]);
        assert_eq!(steps[0].label, "Approve WSTETH");

        steps[1].execute().await.unwrap();
        let call = &mock.submissions()[0];
        assert_eq!(call.function, "openTrove");
        assert_eq!(call.value, protocol.settings().gas_compensation());
        assert_eq!(call.args.len(), 11);
        assert_eq!(call.args[2], CallValue::Uint(e18(2)));
    }

    #[tokio::test]
    async fn test_open_lst_with_allowance_skips_approval() {
        let (mock, protocol) = setup();
        let branch = BranchId::new(2).unwrap();
        script_allowance(&mock, protocol.registry().coll_token(branch).address, e18(2));

        let flow = OpenBorrowFlow::new(protocol, open_request(branch));
        assert_eq!(step_ids(&flow).await, vec!["openTrove"]);
        assert_eq!(flow.back_link().unwrap().path, "/borrow/reth");
        assert_eq!(
            flow.success_message().unwrap(),
            "Successfully opened a RETH borrow position"
        );
    }

    fn adjust_request(branch: BranchId, coll: i64, debt: i64) -> AdjustTroveRequest {
        AdjustTroveRequest {
            account: account(),
            branch,
            trove_id: U256::from(77u64),
            collateral_change: I256::try_from(coll).unwrap() * I256::try_from(1_000_000_000_000_000_000i64).unwrap(),
            debt_change: I256::try_from(debt).unwrap() * I256::try_from(1_000_000_000_000_000_000i64).unwrap(),
            max_upfront_fee: e18(1),
        }
    }

    fn script_trove(mock: &evm_client::mock::MockChain, protocol: &Protocol, branch: BranchId, debt: U256) {
        let trove_manager = protocol
            .registry()
            .branch_contract(branch, BranchContract::TroveManager)
            .address;
        mock.set_read(trove_manager, "Troves", troves_tuple(debt, e18(3), U256::from(70u64)));
    }

    #[tokio::test]
    async fn test_adjust_lst_deposit_and_repay() {
        let (mock, protocol) = setup();
        let branch = BranchId::new(1).unwrap();
        let registry = protocol.registry();
        script_allowance(&mock, registry.coll_token(branch).address, U256::ZERO);
        script_allowance(
            &mock,
            registry.protocol_contract(ProtocolContract::BoldToken).address,
            U256::ZERO,
        );

        let flow = AdjustTroveFlow::new(protocol.clone(), adjust_request(branch, 1, -100));
        let steps = flow.steps().await.unwrap();
        assert_eq!(
            steps.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec!["approveCollateral", "approveBold", "adjustTrove"]
        );
        assert_eq!(steps[2].label, "Deposit & Repay");
    }

    #[tokio::test]
    async fn test_adjust_native_deposit_uses_zapper_with_value() {
        let (mock, protocol) = setup();
        script_trove(&mock, &protocol, BranchId::NATIVE, e18(1000));
        script_hints(&mock, &protocol, BranchId::NATIVE);

        let flow = AdjustTroveFlow::new(protocol.clone(), adjust_request(BranchId::NATIVE, 1, 0));
        let steps = flow.steps().await.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].label, "Deposit Collateral");

        steps[0].execute().await.unwrap();
        let call = &mock.submissions()[0];
        assert_eq!(call.function, "adjustTroveWithRawETH");
        assert_eq!(call.value, e18(1));

        // Hints are resolved at the trove's stored rate
        let find = mock
            .reads()
            .into_iter()
            .find(|c| c.function == "findInsertPosition")
            .unwrap();
        assert_eq!(find.args[0], CallValue::Uint(U256::from(70u64)));
    }

    #[tokio::test]
    async fn test_adjust_native_withdraw_uses_borrower_operations() {
        let (mock, protocol) = setup();
        script_trove(&mock, &protocol, BranchId::NATIVE, e18(1000));
        script_hints(&mock, &protocol, BranchId::NATIVE);

        let flow = AdjustTroveFlow::new(protocol.clone(), adjust_request(BranchId::NATIVE, -1, 0));
        let steps = flow.steps().await.unwrap();
        steps[0].execute().await.unwrap();

        let call = &mock.submissions()[0];
        assert_eq!(call.function, "adjustTrove");
        assert_eq!(call.value, U256::ZERO);
        assert_eq!(call.args[1], CallValue::Uint(e18(1)));
        assert_eq!(call.args[2], CallValue::Bool(false));
    }

    #[tokio::test]
    async fn test_close_native_approves_debt_to_zapper() {
        let (mock, protocol) = setup();
        let bold = protocol
            .registry()
            .protocol_contract(ProtocolContract::BoldToken)
            .address;
        script_trove(&mock, &protocol, BranchId::NATIVE, e18(1500));
        script_allowance(&mock, bold, e18(1499));

        let flow = CloseTroveFlow::new(
            protocol.clone(),
            CloseTroveRequest {
                account: account(),
                branch: BranchId::NATIVE,
                trove_id: U256::from(5u64),
            },
        );
        let steps = flow.steps().await.unwrap();
        assert_eq!(steps.len(), 2);

        steps[0].execute().await.unwrap();
        steps[1].execute().await.unwrap();
        let submissions = mock.submissions();
        let zapper = protocol.registry().leverage_zapper(BranchId::NATIVE).address;
        assert_eq!(
            submissions[0].args,
            vec![CallValue::Address(zapper), CallValue::Uint(e18(1500))]
        );
        assert_eq!(submissions[1].function, "closeTroveToRawETH");
        assert_eq!(submissions[1].address(), zapper);
    }

    #[tokio::test]
    async fn test_close_lst_goes_through_borrower_operations() {
        let (mock, protocol) = setup();
        let branch = BranchId::new(2).unwrap();
        let bold = protocol
            .registry()
            .protocol_contract(ProtocolContract::BoldToken)
            .address;
        script_trove(&mock, &protocol, branch, e18(10));
        script_allowance(&mock, bold, e18(10));

        let flow = CloseTroveFlow::new(
            protocol.clone(),
            CloseTroveRequest {
                account: account(),
                branch,
                trove_id: U256::from(5u64),
            },
        );
        let steps = flow.steps().await.unwrap();
        assert_eq!(steps.len(), 1);

        steps[0].execute().await.unwrap();
        assert_eq!(mock.submitted_functions(), vec!["closeTrove"]);
    }

    #[tokio::test]
    async fn test_close_trove_read_failure_fails_build() {
        let (mock, protocol) = setup();
        let trove_manager = protocol
            .registry()
            .branch_contract(BranchId::NATIVE, BranchContract::TroveManager)
            .address;
        mock.fail_read(trove_manager, "Troves", "rpc down");

        let flow = CloseTroveFlow::new(
            protocol,
            CloseTroveRequest {
                account: account(),
                branch: BranchId::NATIVE,
                trove_id: U256::from(5u64),
            },
        );
        assert!(flow.steps().await.is_err());
    }
}
