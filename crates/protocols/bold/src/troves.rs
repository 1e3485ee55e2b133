//! Trove reads

use bold_core::{BranchContract, BranchId, Result, TroveId, U256};
use evm_client::{ChainClient, ContractCall};
use serde::{Deserialize, Serialize};

/// Positions of the fields used from `TroveManager.Troves(id)`
mod layout {
    pub const DEBT: usize = 0;
    pub const COLL: usize = 1;
    pub const ANNUAL_INTEREST_RATE: usize = 5;
}

/// Stored trove record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroveData {
    /// Recorded debt; excludes interest accrued since the trove's last update
    pub debt: U256,
    pub coll: U256,
    pub annual_interest_rate: U256,
}

/// Read `TroveManager.Troves(trove_id)` on `branch`
pub async fn fetch_trove(client: &ChainClient, branch: BranchId, trove_id: TroveId) -> Result<TroveData> {
    const FUNCTION: &str = "Troves";

    let trove_manager = client
        .registry()
        .branch_contract(branch, BranchContract::TroveManager);
    let value = client
        .read(&ContractCall::new(trove_manager, FUNCTION).arg(trove_id))
        .await?;

    let trove = TroveData {
        debt: value.expect_uint_at(FUNCTION, layout::DEBT)?,
        coll: value.expect_uint_at(FUNCTION, layout::COLL)?,
        annual_interest_rate: value.expect_uint_at(FUNCTION, layout::ANNUAL_INTEREST_RATE)?,
    };

    tracing::debug!(
        branch = %branch,
        trove_id = %trove_id,
        debt = %trove.debt,
        rate = %trove.annual_interest_rate,
        "Fetched trove"
    );
    Ok(trove)
}
