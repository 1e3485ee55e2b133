//! ERC-20 approval checks and submissions
//!
//! `approve*` functions wait for the approval to confirm before returning:
//! the caller spends the allowance immediately. Flow steps submit
//! [`approval_call`] instead and leave the wait to the session.

use bold_core::{
    Address, BranchContract, BranchId, ContractRef, ProtocolContract, Result, TxHash, U256,
};
use evm_client::{queries, ChainClient, ContractCall};

use crate::constants::MAX_APPROVAL;

/// Current allowance of `spender` over `owner`'s `token`
pub async fn allowance(
    client: &ChainClient,
    token: ContractRef,
    owner: Address,
    spender: Address,
) -> Result<U256> {
    queries::erc20_allowance(client, token, owner, spender).await
}

/// `true` when the allowance is strictly below `amount`
pub async fn needs_approval(
    client: &ChainClient,
    token: ContractRef,
    owner: Address,
    spender: Address,
    amount: U256,
) -> Result<bool> {
    let current = allowance(client, token, owner, spender).await?;
    let needed = current < amount;
    tracing::debug!(
        token = %token.address,
        spender = %spender,
        allowance = %current,
        amount = %amount,
        needed,
        "Checked allowance"
    );
    Ok(needed)
}

/// ERC-20 `approve(spender, amount)`
pub fn approval_call(token: ContractRef, spender: Address, amount: U256) -> ContractCall {
    ContractCall::new(token, "approve").arg(spender).arg(amount)
}

/// Approve `spender` for `amount` (infinite when `None`) and wait for confirmation
pub async fn approve(
    client: &ChainClient,
    token: ContractRef,
    spender: Address,
    amount: Option<U256>,
) -> Result<TxHash> {
    let call = approval_call(token, spender, amount.unwrap_or(MAX_APPROVAL));
    Ok(client.submit_and_confirm(call).await?)
}

pub async fn approve_bold(
    client: &ChainClient,
    spender: Address,
    amount: Option<U256>,
) -> Result<TxHash> {
    let bold = client.registry().protocol_contract(ProtocolContract::BoldToken);
    approve(client, bold, spender, amount).await
}

/// Collateral token → the branch's `BorrowerOperations`
pub async fn approve_collateral_for_borrowing(
    client: &ChainClient,
    branch: BranchId,
    amount: Option<U256>,
) -> Result<TxHash> {
    let registry = client.registry();
    let spender = registry
        .branch_contract(branch, BranchContract::BorrowerOperations)
        .address;
    approve(client, registry.coll_token(branch), spender, amount).await
}

/// BOLD → the branch's stability pool
pub async fn approve_bold_for_stability_pool(
    client: &ChainClient,
    branch: BranchId,
    amount: Option<U256>,
) -> Result<TxHash> {
    let spender = client
        .registry()
        .branch_contract(branch, BranchContract::StabilityPool)
        .address;
    approve_bold(client, spender, amount).await
}

pub async fn needs_collateral_approval(
    client: &ChainClient,
    branch: BranchId,
    owner: Address,
    amount: U256,
) -> Result<bool> {
    let registry = client.registry();
    let spender = registry
        .branch_contract(branch, BranchContract::BorrowerOperations)
        .address;
    needs_approval(client, registry.coll_token(branch), owner, spender, amount).await
}

pub async fn needs_bold_approval_for_stability_pool(
    client: &ChainClient,
    branch: BranchId,
    owner: Address,
    amount: U256,
) -> Result<bool> {
    let registry = client.registry();
    let spender = registry
        .branch_contract(branch, BranchContract::StabilityPool)
        .address;
    needs_approval(
        client,
        registry.protocol_contract(ProtocolContract::BoldToken),
        owner,
        spender,
        amount,
    )
    .await
}
