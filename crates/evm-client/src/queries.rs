//! Common read helpers shared by the protocol crates

use bold_core::{Address, ContractRef, Result, U256};

use crate::{ChainClient, ContractCall};

/// ERC-20 `allowance(owner, spender)`
pub async fn erc20_allowance(
    client: &ChainClient,
    token: ContractRef,
    owner: Address,
    spender: Address,
) -> Result<U256> {
    let value = client
        .read(&ContractCall::new(token, "allowance").arg(owner).arg(spender))
        .await?;
    Ok(value.expect_uint("allowance")?)
}

/// Whether any bytecode is deployed at `address`
pub async fn has_code(client: &ChainClient, address: Address) -> Result<bool> {
    let code = client.code_at(address).await?;
    Ok(!code.is_empty())
}
