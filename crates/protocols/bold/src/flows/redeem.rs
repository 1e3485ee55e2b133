//! Redeem BOLD for collateral across all branches

use async_trait::async_trait;
use bold_core::{Link, ProtocolContract, Result, TxHash};
use evm_client::ContractCall;
use tx_flow::{FlowDefinition, StepDefinition};

use super::{approval_step, dashboard_link, effect_step};
use crate::approvals;
use crate::constants::redemption::MAX_FEE_PERCENTAGE;
use crate::protocol::Protocol;
use crate::requests::RedeemRequest;

pub struct RedeemFlow {
    protocol: Protocol,
    request: RedeemRequest,
}

impl RedeemFlow {
    pub fn new(protocol: Protocol, request: RedeemRequest) -> Self {
        Self { protocol, request }
    }
}

#[async_trait]
impl FlowDefinition for RedeemFlow {
    fn flow_id(&self) -> &'static str {
        "redeemBold"
    }

    fn title(&self) -> String {
        "Redeem BOLD".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        let request = &self.request;
        let registry = self.protocol.registry();
        let bold = registry.protocol_contract(ProtocolContract::BoldToken);
        let collateral_registry = registry
            .protocol_contract(ProtocolContract::CollateralRegistry)
            .address;
        let mut steps = Vec::new();

        if approvals::needs_approval(
            self.protocol.client(),
            bold,
            request.account,
            collateral_registry,
            request.amount,
        )
        .await?
        {
            steps.push(approval_step(
                "approve",
                "Approve BOLD",
                &self.protocol,
                bold,
                collateral_registry,
                request.amount,
            ));
        }

        steps.push(effect_step(
            "redeem",
            "Redeem BOLD",
            &self.protocol,
            request,
            redeem_collateral,
        ));
        Ok(steps)
    }

    fn success_message(&self) -> Option<String> {
        Some("Successfully redeemed BOLD for collateral".to_string())
    }

    fn back_link(&self) -> Option<Link> {
        Some(Link::new("/redeem", "Back to Redeem"))
    }

    fn success_link(&self) -> Option<Link> {
        Some(dashboard_link())
    }
}

async fn redeem_collateral(protocol: Protocol, request: RedeemRequest) -> Result<TxHash> {
    let max_iterations = request
        .max_iterations_per_collateral
        .filter(|n| *n > 0)
        .unwrap_or(protocol.settings().redemption_max_iterations);

    let call = ContractCall::new(
        protocol
            .registry()
            .protocol_contract(ProtocolContract::CollateralRegistry),
        "redeemCollateral",
    )
    .arg(request.amount)
    .arg(max_iterations)
    .arg(MAX_FEE_PERCENTAGE);

    protocol.submit(call).await
}
