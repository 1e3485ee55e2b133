//! LQTY staking through the governance user proxy

use async_trait::async_trait;
use bold_core::{Address, ContractRef, Link, ProtocolContract, Result, TxHash};
use evm_client::{queries, ContractCall};
use tx_flow::{FlowDefinition, StepDefinition};

use super::{approval_step, effect_step};
use crate::approvals;
use crate::protocol::Protocol;
use crate::requests::{ClaimStakingRewardsRequest, StakeRequest, UnstakeRequest};

fn stake_link(label: &str) -> Link {
    Link::new("/stake", label)
}

/// Deterministic proxy address `Governance` uses for `account`
pub async fn user_proxy_address(protocol: &Protocol, account: Address) -> Result<Address> {
    let governance = protocol
        .registry()
        .protocol_contract(ProtocolContract::Governance);
    let value = protocol
        .client()
        .read(&ContractCall::new(governance, "deriveUserProxyAddress").arg(account))
        .await?;
    Ok(value.expect_address("deriveUserProxyAddress")?)
}

async fn governance_call(protocol: &Protocol, call: impl FnOnce(ContractRef) -> ContractCall) -> Result<TxHash> {
    let governance = protocol
        .registry()
        .protocol_contract(ProtocolContract::Governance);
    protocol.submit(call(governance)).await
}

// ─── Stake ──────────────────────────────────────────────────────────────────

pub struct StakeFlow {
    protocol: Protocol,
    request: StakeRequest,
}

impl StakeFlow {
    pub fn new(protocol: Protocol, request: StakeRequest) -> Self {
        Self { protocol, request }
    }
}

#[async_trait]
impl FlowDefinition for StakeFlow {
    fn flow_id(&self) -> &'static str {
        "stakeLqty"
    }

    fn title(&self) -> String {
        "Stake LQTY".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        let request = &self.request;
        let client = self.protocol.client();
        let mut steps = Vec::new();

        let proxy = user_proxy_address(&self.protocol, request.account).await?;
        if !queries::has_code(client, proxy).await? {
            steps.push(effect_step(
                "deployProxy",
                "Initialize Staking",
                &self.protocol,
                request,
                |protocol: Protocol, _request: StakeRequest| async move {
                    governance_call(&protocol, |g| ContractCall::new(g, "deployUserProxy")).await
                },
            ));
        }

        let lqty = self
            .protocol
            .registry()
            .protocol_contract(ProtocolContract::LqtyToken);
        if approvals::needs_approval(client, lqty, request.account, proxy, request.amount).await? {
            steps.push(approval_step(
                "approve",
                "Approve LQTY",
                &self.protocol,
                lqty,
                proxy,
                request.amount,
            ));
        }

        steps.push(effect_step(
            "stake",
            "Stake LQTY",
            &self.protocol,
            request,
            |protocol: Protocol, request: StakeRequest| async move {
                governance_call(&protocol, |g| {
                    ContractCall::new(g, "depositLQTY").arg(request.amount)
                })
                .await
            },
        ));
        Ok(steps)
    }

    fn success_message(&self) -> Option<String> {
        Some("Successfully staked LQTY".to_string())
    }

    fn back_link(&self) -> Option<Link> {
        Some(stake_link("Back to Stake"))
    }

    fn success_link(&self) -> Option<Link> {
        Some(stake_link("View Stake"))
    }
}

// ─── Unstake ────────────────────────────────────────────────────────────────

pub struct UnstakeFlow {
    protocol: Protocol,
    request: UnstakeRequest,
}

impl UnstakeFlow {
    pub fn new(protocol: Protocol, request: UnstakeRequest) -> Self {
        Self { protocol, request }
    }
}

#[async_trait]
impl FlowDefinition for UnstakeFlow {
    fn flow_id(&self) -> &'static str {
        "unstakeLqty"
    }

    fn title(&self) -> String {
        "Unstake LQTY".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        Ok(vec![effect_step(
            "unstake",
            "Unstake LQTY",
            &self.protocol,
            &self.request,
            |protocol: Protocol, request: UnstakeRequest| async move {
                governance_call(&protocol, |g| {
                    ContractCall::new(g, "withdrawLQTY").arg(request.amount)
                })
                .await
            },
        )])
    }

    fn success_message(&self) -> Option<String> {
        Some("Successfully unstaked LQTY".to_string())
    }

    fn back_link(&self) -> Option<Link> {
        Some(stake_link("Back to Stake"))
    }

    fn success_link(&self) -> Option<Link> {
        Some(stake_link("View Stake"))
    }
}

// ─── Claim rewards ──────────────────────────────────────────────────────────

pub struct ClaimStakingRewardsFlow {
    protocol: Protocol,
    request: ClaimStakingRewardsRequest,
}

impl ClaimStakingRewardsFlow {
    pub fn new(protocol: Protocol, request: ClaimStakingRewardsRequest) -> Self {
        Self { protocol, request }
    }
}

#[async_trait]
impl FlowDefinition for ClaimStakingRewardsFlow {
    fn flow_id(&self) -> &'static str {
        "claimStakingRewards"
    }

    fn title(&self) -> String {
        "Claim Staking Rewards".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        Ok(vec![effect_step(
            "claim",
            "Claim Rewards",
            &self.protocol,
            &self.request,
            |protocol: Protocol, request: ClaimStakingRewardsRequest| async move {
                governance_call(&protocol, |g| {
                    ContractCall::new(g, "claimFromStakingV1").arg(request.account)
                })
                .await
            },
        )])
    }

    fn success_message(&self) -> Option<String> {
        Some("Successfully claimed staking rewards".to_string())
    }

    fn back_link(&self) -> Option<Link> {
        Some(stake_link("Back to Stake"))
    }

    fn success_link(&self) -> Option<Link> {
        Some(stake_link("View Stake"))
    }
}
