//! Interest-rate delegates (batch managers)
//!
//! Batch reads are isolated per manager: a failing read drops that manager
//! from the result instead of failing the whole batch.

use std::collections::HashMap;

use bold_core::{
    Address, BranchContract, BranchId, ChainError, ProtocolError, Result, U256,
};
use evm_client::{CallValue, ChainClient, ContractCall};
use serde::{Deserialize, Serialize};

const CONSTRAINTS_FN: &str = "getInterestBatchManager";
const BATCH_DATA_FN: &str = "getLatestBatchData";

/// Operating range a batch manager registered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConstraints {
    pub min_interest_rate: U256,
    pub max_interest_rate: U256,
    /// Seconds
    pub min_interest_rate_change_period: U256,
}

impl BatchConstraints {
    /// Unregistered managers read back as all zeros
    pub fn is_registered(&self) -> bool {
        !self.max_interest_rate.is_zero()
    }

    /// Inclusive range check
    pub fn contains(&self, rate: U256) -> bool {
        rate >= self.min_interest_rate && rate <= self.max_interest_rate
    }

    /// Fail unless `rate` lies within the registered range
    pub fn check_rate(&self, rate: U256) -> std::result::Result<(), ProtocolError> {
        if self.contains(rate) {
            Ok(())
        } else {
            Err(ProtocolError::RateOutsideBatchRange {
                rate,
                min: self.min_interest_rate,
                max: self.max_interest_rate,
            })
        }
    }

    fn from_value(value: &CallValue) -> std::result::Result<Self, ChainError> {
        Ok(Self {
            min_interest_rate: struct_uint(value, CONSTRAINTS_FN, "minInterestRate")?,
            max_interest_rate: struct_uint(value, CONSTRAINTS_FN, "maxInterestRate")?,
            min_interest_rate_change_period: struct_uint(
                value,
                CONSTRAINTS_FN,
                "minInterestRateChangePeriod",
            )?,
        })
    }
}

/// Aggregate state of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchData {
    pub batch_manager: Address,
    pub debt: U256,
    pub coll: U256,
    pub interest_rate: U256,
    pub management_fee: U256,
}

impl BatchData {
    fn from_value(batch_manager: Address, value: &CallValue) -> std::result::Result<Self, ChainError> {
        Ok(Self {
            batch_manager,
            debt: struct_uint(value, BATCH_DATA_FN, "recordedDebt")?,
            coll: struct_uint(value, BATCH_DATA_FN, "entireCollWithoutRedistribution")?,
            interest_rate: struct_uint(value, BATCH_DATA_FN, "annualInterestRate")?,
            management_fee: struct_uint(value, BATCH_DATA_FN, "annualManagementFee")?,
        })
    }
}

/// A batch manager with both its batch state and its constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegate {
    pub batch: BatchData,
    pub constraints: BatchConstraints,
}

fn struct_uint(
    value: &CallValue,
    function: &'static str,
    field: &str,
) -> std::result::Result<U256, ChainError> {
    value
        .field(field)
        .and_then(CallValue::as_uint)
        .ok_or_else(|| ChainError::UnexpectedResponse {
            function,
            message: format!("missing uint field `{}`", field),
        })
}

fn constraints_call(client: &ChainClient, branch: BranchId, manager: Address) -> ContractCall {
    ContractCall::new(
        client
            .registry()
            .branch_contract(branch, BranchContract::BorrowerOperations),
        CONSTRAINTS_FN,
    )
    .arg(manager)
}

/// Constraints of one manager; errors if the read fails or the manager is not registered
pub async fn fetch_constraints(
    client: &ChainClient,
    branch: BranchId,
    manager: Address,
) -> Result<BatchConstraints> {
    let value = client.read(&constraints_call(client, branch, manager)).await?;
    let constraints = BatchConstraints::from_value(&value)?;
    if !constraints.is_registered() {
        return Err(ProtocolError::BatchManagerNotFound {
            manager: manager.to_string(),
        }
        .into());
    }
    Ok(constraints)
}

/// Constraints for every manager whose read succeeds
pub async fn fetch_batch_constraints(
    client: &ChainClient,
    branch: BranchId,
    managers: &[Address],
) -> HashMap<Address, BatchConstraints> {
    let calls: Vec<ContractCall> = managers
        .iter()
        .map(|manager| constraints_call(client, branch, *manager))
        .collect();
    let results = client.read_many(&calls).await;

    managers
        .iter()
        .zip(results)
        .filter_map(|(manager, result)| {
            let parsed = result.map(|value| BatchConstraints::from_value(&value));
            match parsed {
                Some(Ok(constraints)) => Some((*manager, constraints)),
                Some(Err(e)) => {
                    tracing::warn!(branch = %branch, manager = %manager, error = %e, "Bad batch constraints");
                    None
                }
                None => None,
            }
        })
        .collect()
}

/// Latest batch data for every manager whose read succeeds, in input order
pub async fn fetch_batch_data(
    client: &ChainClient,
    branch: BranchId,
    managers: &[Address],
) -> Vec<BatchData> {
    let trove_manager = client
        .registry()
        .branch_contract(branch, BranchContract::TroveManager);
    let calls: Vec<ContractCall> = managers
        .iter()
        .map(|manager| ContractCall::new(trove_manager, BATCH_DATA_FN).arg(*manager))
        .collect();
    let results = client.read_many(&calls).await;

    managers
        .iter()
        .zip(results)
        .filter_map(|(manager, result)| match result.map(|v| BatchData::from_value(*manager, &v)) {
            Some(Ok(batch)) => Some(batch),
            Some(Err(e)) => {
                tracing::warn!(branch = %branch, manager = %manager, error = %e, "Bad batch data");
                None
            }
            None => None,
        })
        .collect()
}

/// Batch data joined with constraints; managers missing either are left out
pub async fn fetch_delegates(
    client: &ChainClient,
    branch: BranchId,
    managers: &[Address],
) -> Vec<Delegate> {
    if managers.is_empty() {
        return Vec::new();
    }

    let (batches, constraints) = tokio::join!(
        fetch_batch_data(client, branch, managers),
        fetch_batch_constraints(client, branch, managers),
    );

    batches
        .into_iter()
        .filter_map(|batch| {
            constraints
                .get(&batch.batch_manager)
                .map(|constraints| Delegate {
                    batch,
                    constraints: *constraints,
                })
        })
        .collect()
}
