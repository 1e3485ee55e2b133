//! Stability pool deposit, withdrawal and reward claims

use async_trait::async_trait;
use bold_core::{BranchContract, BranchId, Link, ProtocolContract, Result, TxHash, U256};
use evm_client::ContractCall;
use tx_flow::{FlowDefinition, StepDefinition};

use super::{approval_step, dashboard_link, effect_step};
use crate::approvals;
use crate::constants::CLAIM_ON_DEPOSIT;
use crate::protocol::Protocol;
use crate::requests::{EarnClaimRequest, EarnDepositRequest, EarnWithdrawRequest};

fn earn_link(protocol: &Protocol, branch: BranchId) -> Link {
    Link::new(format!("/earn/{}", protocol.symbol(branch).slug()), "Back to Earn")
}

async fn withdraw_from_pool(
    protocol: &Protocol,
    branch: BranchId,
    amount: U256,
    claim: bool,
) -> Result<TxHash> {
    let pool = protocol
        .registry()
        .branch_contract(branch, BranchContract::StabilityPool);
    protocol
        .submit(ContractCall::new(pool, "withdrawFromSP").arg(amount).arg(claim))
        .await
}

// ─── Deposit ────────────────────────────────────────────────────────────────

pub struct EarnDepositFlow {
    protocol: Protocol,
    request: EarnDepositRequest,
}

impl EarnDepositFlow {
    pub fn new(protocol: Protocol, request: EarnDepositRequest) -> Self {
        Self { protocol, request }
    }
}

#[async_trait]
impl FlowDefinition for EarnDepositFlow {
    fn flow_id(&self) -> &'static str {
        "earnDeposit"
    }

    fn title(&self) -> String {
        "Deposit to Stability Pool".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        let request = &self.request;
        let mut steps = Vec::new();

        if approvals::needs_bold_approval_for_stability_pool(
            self.protocol.client(),
            request.branch,
            request.account,
            request.amount,
        )
        .await?
        {
            let registry = self.protocol.registry();
            steps.push(approval_step(
                "approve",
                "Approve BOLD",
                &self.protocol,
                registry.protocol_contract(ProtocolContract::BoldToken),
                registry
                    .branch_contract(request.branch, BranchContract::StabilityPool)
                    .address,
                request.amount,
            ));
        }

        steps.push(effect_step(
            "deposit",
            "Deposit to Stability Pool",
            &self.protocol,
            request,
            provide_to_pool,
        ));
        Ok(steps)
    }

    fn success_message(&self) -> Option<String> {
        Some(format!(
            "Successfully deposited BOLD to {} Stability Pool",
            self.protocol.symbol(self.request.branch)
        ))
    }

    fn back_link(&self) -> Option<Link> {
        Some(earn_link(&self.protocol, self.request.branch))
    }

    fn success_link(&self) -> Option<Link> {
        Some(dashboard_link())
    }
}

async fn provide_to_pool(protocol: Protocol, request: EarnDepositRequest) -> Result<TxHash> {
    let pool = protocol
        .registry()
        .branch_contract(request.branch, BranchContract::StabilityPool);
    protocol
        .submit(
            ContractCall::new(pool, "provideToSP")
                .arg(request.amount)
                .arg(CLAIM_ON_DEPOSIT),
        )
        .await
}

// ─── Withdraw ───────────────────────────────────────────────────────────────

pub struct EarnWithdrawFlow {
    protocol: Protocol,
    request: EarnWithdrawRequest,
}

impl EarnWithdrawFlow {
    pub fn new(protocol: Protocol, request: EarnWithdrawRequest) -> Self {
        Self { protocol, request }
    }
}

#[async_trait]
impl FlowDefinition for EarnWithdrawFlow {
    fn flow_id(&self) -> &'static str {
        "earnWithdraw"
    }

    fn title(&self) -> String {
        "Withdraw from Stability Pool".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        let label = if self.request.claim_rewards {
            "Withdraw & Claim Rewards"
        } else {
            "Withdraw from Stability Pool"
        };
        Ok(vec![effect_step(
            "withdraw",
            label,
            &self.protocol,
            &self.request,
            |protocol: Protocol, request: EarnWithdrawRequest| async move {
                withdraw_from_pool(&protocol, request.branch, request.amount, request.claim_rewards)
                    .await
            },
        )])
    }

    fn success_message(&self) -> Option<String> {
        let symbol = self.protocol.symbol(self.request.branch);
        Some(if self.request.claim_rewards {
            format!("Successfully withdrew BOLD and claimed {} rewards", symbol)
        } else {
            format!("Successfully withdrew BOLD from {} Stability Pool", symbol)
        })
    }

    fn back_link(&self) -> Option<Link> {
        Some(earn_link(&self.protocol, self.request.branch))
    }

    fn success_link(&self) -> Option<Link> {
        Some(dashboard_link())
    }
}

// ─── Claim ──────────────────────────────────────────────────────────────────

pub struct EarnClaimFlow {
    protocol: Protocol,
    request: EarnClaimRequest,
}

impl EarnClaimFlow {
    pub fn new(protocol: Protocol, request: EarnClaimRequest) -> Self {
        Self { protocol, request }
    }
}

#[async_trait]
impl FlowDefinition for EarnClaimFlow {
    fn flow_id(&self) -> &'static str {
        "earnClaim"
    }

    fn title(&self) -> String {
        "Claim Stability Pool Rewards".to_string()
    }

    async fn steps(&self) -> Result<Vec<StepDefinition>> {
        // Withdrawing zero with claim set only collects rewards
        Ok(vec![effect_step(
            "claim",
            "Claim Rewards",
            &self.protocol,
            &self.request,
            |protocol: Protocol, request: EarnClaimRequest| async move {
                withdraw_from_pool(&protocol, request.branch, U256::ZERO, true).await
            },
        )])
    }

    fn success_message(&self) -> Option<String> {
        Some(format!(
            "Successfully claimed {} rewards",
            self.protocol.symbol(self.request.branch)
        ))
    }

    fn back_link(&self) -> Option<Link> {
        Some(earn_link(&self.protocol, self.request.branch))
    }

    fn success_link(&self) -> Option<Link> {
        Some(dashboard_link())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::test_support::*;
    use evm_client::CallValue;

    #[tokio::test]
    async fn test_deposit_approval_boundary() {
        let (mock, protocol) = setup();
        let bold = protocol
            .registry()
            .protocol_contract(ProtocolContract::BoldToken)
            .address;
        let request = EarnDepositRequest {
            account: account(),
            branch: BranchId::new(1).unwrap(),
            amount: e18(100),
        };

        script_allowance(&mock, bold, e18(100));
        let flow = EarnDepositFlow::new(protocol.clone(), request.clone());
        assert_eq!(step_ids(&flow).await, vec!["deposit"]);

        script_allowance(&mock, bold, e18(100) - U256::from(1u64));
        assert_eq!(step_ids(&flow).await, vec!["approve", "deposit"]);
    }

    #[tokio::test]
    async fn test_deposit_effect() {
        let (mock, protocol) = setup();
        let bold = protocol
            .registry()
            .protocol_contract(ProtocolContract::BoldToken)
            .address;
        script_allowance(&mock, bold, U256::MAX);
        let flow = EarnDepositFlow::new(
            protocol,
            EarnDepositRequest {
                account: account(),
                branch: BranchId::NATIVE,
                amount: e18(100),
            },
        );

        let steps = flow.steps().await.unwrap();
        steps[0].execute().await.unwrap();
        let call = &mock.submissions()[0];
        assert_eq!(call.function, "provideToSP");
        assert_eq!(call.address(), bold_core::Address::with_last_byte(0x14));
        assert_eq!(call.args, vec![CallValue::Uint(e18(100)), CallValue::Bool(false)]);
        assert_eq!(flow.back_link().unwrap().path, "/earn/eth");
    }

    #[tokio::test]
    async fn test_withdraw_label_and_message_follow_claim() {
        let (mock, protocol) = setup();
        let mut request = EarnWithdrawRequest {
            account: account(),
            branch: BranchId::new(2).unwrap(),
            amount: e18(5),
            claim_rewards: true,
        };

        let flow = EarnWithdrawFlow::new(protocol.clone(), request.clone());
        let steps = flow.steps().await.unwrap();
        assert_eq!(steps[0].label, "Withdraw & Claim Rewards");
        assert_eq!(
            flow.success_message().unwrap(),
            "Successfully withdrew BOLD and claimed RETH rewards"
        );
        steps[0].execute().await.unwrap();
        assert_eq!(
            mock.submissions()[0].args,
            vec![CallValue::Uint(e18(5)), CallValue::Bool(true)]
        );

        request.claim_rewards = false;
        let flow = EarnWithdrawFlow::new(protocol, request);
        assert_eq!(flow.steps().await.unwrap()[0].label, "Withdraw from Stability Pool");
    }

    #[tokio::test]
    async fn test_claim_withdraws_zero() {
        let (mock, protocol) = setup();
        let flow = EarnClaimFlow::new(
            protocol,
            EarnClaimRequest {
                account: account(),
                branch: BranchId::NATIVE,
            },
        );
        let steps = flow.steps().await.unwrap();
        assert_eq!(steps.len(), 1);
        steps[0].execute().await.unwrap();

        let call = &mock.submissions()[0];
        assert_eq!(call.function, "withdrawFromSP");
        assert_eq!(call.args, vec![CallValue::Uint(U256::ZERO), CallValue::Bool(true)]);
    }
}
