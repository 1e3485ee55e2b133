//! Leveraged positions through the branch leverage zapper
//!
//! Flash-loan and swap amounts are sized up front from exchange quotes
//! ([`size_open_leverage`], [`size_lever_down`]) and carried in the request,
//! so the effect steps only resolve hints and submit.

use async_trait::async_trait;
use bold_core::{Address, BranchId, Link, Result, TxHash, U256};
use evm_client::{CallValue, ContractCall};
use tx_flow::{FlowDefinition, StepDefinition};

use super::{approval_step, dashboard_link, effect_step, loan_link};
use crate::approvals;
use crate::protocol::Protocol;
use crate::requests::{
    CloseLeverageRequest, LeverageDirection, OpenLeverageRequest, UpdateLeverageRequest,
};

// ─── Sizing ─────────────────────────────────────────────────────────────────

/// Terms chosen by the user for a leveraged open
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenLeverageTerms {
    pub initial_deposit: U256,
    pub leverage_factor: f64,
    pub interest_rate: U256,
    pub max_upfront_fee: U256,
    pub owner_index: U256,
    pub batch_manager: Option<Address>,
}

/// Quote the flash loan and BOLD amounts for opening at `terms.leverage_factor`
pub async fn size_open_leverage(
    protocol: &Protocol,
    account: Address,
    branch: BranchId,
    terms: OpenLeverageTerms,
) -> Result<OpenLeverageRequest> {
    let params = protocol
        .quotes()
        .leverage_params(terms.initial_deposit, terms.leverage_factor, branch)
        .await?;
    tracing::info!(
        branch = %branch,
        flash_loan = %params.flash_loan_amount,
        bold = %params.bold_amount,
        price_impact = params.price_impact,
        "Sized leveraged open"
    );

    Ok(OpenLeverageRequest {
        account,
        branch,
        owner_index: terms.owner_index,
        collateral_amount: terms.initial_deposit,
        flash_loan_amount: params.flash_loan_amount,
        bold_amount: params.bold_amount,
        interest_rate: terms.interest_rate,
        batch_manager: terms.batch_manager,
        max_upfront_fee: terms.max_upfront_fee,
    })
}

/// Quote the minimum BOLD for selling `coll_to_sell` out of a trove
pub async fn size_lever_down(
    protocol: &Protocol,
    account: Address,
    branch: BranchId,
    trove_id: U256,
    coll_to_sell: U256,
) -> Result<UpdateLeverageRequest> {
    let params = protocol.quotes().deleverage_params(coll_to_sell, branch).await?;
    tracing::info!(
        branch = %branch,
        flash_loan = %params.flash_loan_amount,
        min_bold = %params.min_bold_amount,
        price_impact = params.price_impact,
        "Sized lever down"
    );

    Ok(UpdateLeverageRequest {
        account,
        branch,
        trove_id,
        direction: LeverageDirection::Down,
        flash_loan_amount: params.flash_loan_amount,
        bold_amount: U256::ZERO,
        min_bold_amount: params.min_bold_amount,
        max_upfront_fee: U256::ZERO,
    })
}

fn multiply_link(protocol: &Protocol, branch: BranchId) -> Link {
    Link::new(
        format!("/multiply/{}", protocol.symbol(branch).slug()),
        "Back to Multiply",
    )
}

// ─── Open ───────────────────────────────────────────────────────────────────

pub struct OpenLeverageFlow {
    protocol: Protocol,
    request: OpenLeverageRequest,
}

impl OpenLeverageFlow {
    pub fn new(protocol: Protocol, request: OpenLeverageRequest) -> Self {
        Self { protocol, request }
    }
}

#[async_trait]
impl FlowDefinition for OpenLeverageFlow {
    fn flow_id(&self) -> &'static str {
        "openLeverage"
    }

    fn title(&self) -> String {
        "Open Leveraged Position".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        let request = &self.request;
        let registry = self.protocol.registry();
        let symbol = self.protocol.symbol(request.branch);
        let zapper = registry.leverage_zapper(request.branch).address;
        let coll_token = registry.coll_token(request.branch);
        let mut steps = Vec::new();

        if !symbol.is_native()
            && approvals::needs_approval(
                self.protocol.client(),
                coll_token,
                request.account,
                zapper,
                request.collateral_amount,
            )
            .await?
        {
            steps.push(approval_step(
                "approveColl",
                format!("Approve {}", symbol),
                &self.protocol,
                coll_token,
                zapper,
                request.collateral_amount,
            ));
        }

        steps.push(effect_step(
            "openLeveragedTrove",
            "Open Leveraged Position",
            &self.protocol,
            request,
            open_leveraged_trove,
        ));
        Ok(steps)
    }

    fn success_message(&self) -> Option<String> {
        Some(format!(
            "Successfully opened leveraged {} position",
            self.protocol.symbol(self.request.branch)
        ))
    }

    fn back_link(&self) -> Option<Link> {
        Some(multiply_link(&self.protocol, self.request.branch))
    }

    fn success_link(&self) -> Option<Link> {
        Some(dashboard_link())
    }
}

async fn open_leveraged_trove(protocol: Protocol, request: OpenLeverageRequest) -> Result<TxHash> {
    let hints = protocol
        .insertion_hints(request.branch, request.interest_rate)
        .await?;
    let zapper = protocol.registry().leverage_zapper(request.branch);
    let gas_compensation = protocol.settings().gas_compensation();
    let value = if protocol.symbol(request.branch).is_native() {
        request.collateral_amount + gas_compensation
    } else {
        gas_compensation
    };

    // The zapper manages the trove and receives leftovers
    let params = CallValue::record([
        ("owner", request.account.into()),
        ("ownerIndex", request.owner_index.into()),
        ("collAmount", request.collateral_amount.into()),
        ("flashLoanAmount", request.flash_loan_amount.into()),
        ("boldAmount", request.bold_amount.into()),
        ("upperHint", hints.upper_hint.into()),
        ("lowerHint", hints.lower_hint.into()),
        ("annualInterestRate", request.interest_rate.into()),
        (
            "batchManager",
            request.batch_manager.unwrap_or(Address::ZERO).into(),
        ),
        ("maxUpfrontFee", request.max_upfront_fee.into()),
        ("addManager", zapper.address.into()),
        ("removeManager", zapper.address.into()),
        ("receiver", zapper.address.into()),
    ]);
    let call = ContractCall::new(zapper, "openLeveragedTroveWithRawETH")
        .arg(params)
        .with_value(value);
    protocol.submit(call).await
}

// ─── Update ─────────────────────────────────────────────────────────────────

pub struct UpdateLeverageFlow {
    protocol: Protocol,
    request: UpdateLeverageRequest,
}

impl UpdateLeverageFlow {
    pub fn new(protocol: Protocol, request: UpdateLeverageRequest) -> Self {
        Self { protocol, request }
    }

    fn is_up(&self) -> bool {
        self.request.direction == LeverageDirection::Up
    }
}

#[async_trait]
impl FlowDefinition for UpdateLeverageFlow {
    fn flow_id(&self) -> &'static str {
        "updateLeverage"
    }

    fn title(&self) -> String {
        if self.is_up() {
            "Increase Leverage".to_string()
        } else {
            "Decrease Leverage".to_string()
        }
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        let (id, label) = match self.request.direction {
            LeverageDirection::Up => ("leverUpTrove", "Increase Leverage"),
            LeverageDirection::Down => ("leverDownTrove", "Decrease Leverage"),
        };
        Ok(vec![effect_step(
            id,
            label,
            &self.protocol,
            &self.request,
            update_leverage,
        )])
    }

    fn success_message(&self) -> Option<String> {
        let verb = if self.is_up() { "increased" } else { "decreased" };
        Some(format!(
            "Successfully {} leverage on {} position",
            verb,
            self.protocol.symbol(self.request.branch)
        ))
    }

    fn back_link(&self) -> Option<Link> {
        Some(loan_link("Back to Position"))
    }

    fn success_link(&self) -> Option<Link> {
        Some(dashboard_link())
    }
}

async fn update_leverage(protocol: Protocol, request: UpdateLeverageRequest) -> Result<TxHash> {
    let zapper = protocol.registry().leverage_zapper(request.branch);
    let call = match request.direction {
        LeverageDirection::Up => ContractCall::new(zapper, "leverUpTrove").arg(CallValue::record([
            ("troveId", request.trove_id.into()),
            ("flashLoanAmount", request.flash_loan_amount.into()),
            ("boldAmount", request.bold_amount.into()),
            ("maxUpfrontFee", request.max_upfront_fee.into()),
        ])),
        LeverageDirection::Down => {
            ContractCall::new(zapper, "leverDownTrove").arg(CallValue::record([
                ("troveId", request.trove_id.into()),
                ("flashLoanAmount", request.flash_loan_amount.into()),
                ("minBoldAmount", request.min_bold_amount.into()),
            ]))
        }
    };
    protocol.submit(call).await
}

// ─── Close ──────────────────────────────────────────────────────────────────

pub struct CloseLeverageFlow {
    protocol: Protocol,
    request: CloseLeverageRequest,
}

impl CloseLeverageFlow {
    pub fn new(protocol: Protocol, request: CloseLeverageRequest) -> Self {
        Self { protocol, request }
    }
}

#[async_trait]
impl FlowDefinition for CloseLeverageFlow {
    fn flow_id(&self) -> &'static str {
        "closeLeverage"
    }

    fn title(&self) -> String {
        "Close Leveraged Position".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        Ok(vec![effect_step(
            "closeLeveragedTrove",
            "Close Leveraged Position",
            &self.protocol,
            &self.request,
            |protocol: Protocol, request: CloseLeverageRequest| async move {
                let zapper = protocol.registry().leverage_zapper(request.branch);
                let call = ContractCall::new(zapper, "closeTroveFromCollateral")
                    .arg(request.trove_id)
                    .arg(request.flash_loan_amount)
                    .arg(request.min_collateral_amount);
                protocol.submit(call).await
            },
        )])
    }

    fn success_message(&self) -> Option<String> {
        Some(format!(
            "Successfully closed leveraged {} position",
            self.protocol.symbol(self.request.branch)
        ))
    }

    fn back_link(&self) -> Option<Link> {
        Some(loan_link("Back to Position"))
    }

    fn success_link(&self) -> Option<Link> {
        Some(dashboard_link())
    }
}
