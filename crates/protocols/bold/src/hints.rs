//! Sorted-list hints
//!
//! Troves are kept in an on-chain list sorted by interest rate. Any operation
//! that inserts or moves a trove passes two neighbouring trove ids so the
//! contract only searches locally. Resolution is two-phase: an approximate
//! hint sampled by `HintHelpers`, refined by `SortedTroves.findInsertPosition`.

use bold_core::{
    Address, BranchContract, BranchId, ProtocolContract, Result, TroveId, U256,
};
use evm_client::{ChainClient, ContractCall};
use serde::{Deserialize, Serialize};

use crate::constants::hints::TRIALS_PER_ROOT;

/// Neighbours for an insertion at a given rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionHints {
    pub upper_hint: TroveId,
    pub lower_hint: TroveId,
}

/// Hints for a redemption across the collateral-sorted list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionHints {
    pub first_redemption_hint: Address,
    pub partial_upper_hint: U256,
    pub partial_lower_hint: U256,
    /// Amount redeemable within `max_iterations`; may be below the request
    pub truncated_bold_amount: U256,
}

/// `10 * ceil(sqrt(size))`
pub fn num_trials(size: U256) -> U256 {
    U256::from(TRIALS_PER_ROOT) * ceil_sqrt(size)
}

fn ceil_sqrt(n: U256) -> U256 {
    if n.is_zero() {
        return U256::ZERO;
    }
    // Newton's method on the floor root, then round up
    let mut x = n;
    let mut y = (x >> 1) + (x & U256::from(1u64));
    while y < x {
        x = y;
        y = (x + n / x) >> 1;
    }
    if x * x < n {
        x + U256::from(1u64)
    } else {
        x
    }
}

/// Resolve insertion hints for `interest_rate` on `branch`.
///
/// Issues exactly three reads in order: list size, approximate hint, exact position.
pub async fn get_insertion_hints(
    client: &ChainClient,
    branch: BranchId,
    interest_rate: U256,
    seed: u64,
) -> Result<InsertionHints> {
    let registry = client.registry();
    let sorted_troves = registry.branch_contract(branch, BranchContract::SortedTroves);

    let size = client
        .read(&ContractCall::new(sorted_troves, "getSize"))
        .await?
        .expect_uint("getSize")?;
    let trials = num_trials(size);

    let approx = client
        .read(
            &ContractCall::new(
                registry.protocol_contract(ProtocolContract::HintHelpers),
                "getApproxHint",
            )
            .arg(U256::from(branch.as_u8()))
            .arg(interest_rate)
            .arg(trials)
            .arg(seed),
        )
        .await?;
    let approx_hint = approx.expect_uint_at("getApproxHint", 0)?;

    let position = client
        .read(
            &ContractCall::new(sorted_troves, "findInsertPosition")
                .arg(interest_rate)
                .arg(approx_hint)
                .arg(approx_hint),
        )
        .await?;

    let hints = InsertionHints {
        upper_hint: position.expect_uint_at("findInsertPosition", 0)?,
        lower_hint: position.expect_uint_at("findInsertPosition", 1)?,
    };

    tracing::debug!(
        branch = %branch,
        size = %size,
        trials = %trials,
        upper = %hints.upper_hint,
        lower = %hints.lower_hint,
        "Resolved insertion hints"
    );
    Ok(hints)
}

/// Resolve redemption hints for `bold_amount` at `price`
pub async fn get_redemption_hints(
    client: &ChainClient,
    bold_amount: U256,
    price: U256,
    max_iterations: u64,
) -> Result<RedemptionHints> {
    const FUNCTION: &str = "getRedemptionHints";

    let result = client
        .read(
            &ContractCall::new(
                client.registry().protocol_contract(ProtocolContract::HintHelpers),
                FUNCTION,
            )
            .arg(bold_amount)
            .arg(price)
            .arg(max_iterations),
        )
        .await?;

    let hints = RedemptionHints {
        first_redemption_hint: result.expect_item(FUNCTION, 0)?.expect_address(FUNCTION)?,
        partial_upper_hint: result.expect_uint_at(FUNCTION, 1)?,
        partial_lower_hint: result.expect_uint_at(FUNCTION, 2)?,
        truncated_bold_amount: result.expect_uint_at(FUNCTION, 3)?,
    };

    tracing::debug!(
        bold_amount = %bold_amount,
        truncated = %hints.truncated_bold_amount,
        "Resolved redemption hints"
    );
    Ok(hints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evm_client::mock::MockChain;
    use evm_client::CallValue;

    #[test]
    fn test_num_trials() {
        assert_eq!(num_trials(U256::from(100u64)), U256::from(100u64));
        assert_eq!(num_trials(U256::from(101u64)), U256::from(110u64));
        assert_eq!(num_trials(U256::from(1u64)), U256::from(10u64));
        assert_eq!(num_trials(U256::from(2u64)), U256::from(20u64));
        assert_eq!(num_trials(U256::ZERO), U256::ZERO);
    }

    #[test]
    fn test_ceil_sqrt_large() {
        let root = U256::from(1u64) << 100;
        assert_eq!(ceil_sqrt(root * root), root);
        assert_eq!(ceil_sqrt(root * root + U256::from(1u64)), root + U256::from(1u64));
    }

    fn script(mock: &MockChain, client: &ChainClient, branch: BranchId, size: u64) {
        let registry = client.registry();
        let sorted = registry.branch_contract(branch, BranchContract::SortedTroves).address;
        let helpers = registry.protocol_contract(ProtocolContract::HintHelpers).address;

        mock.set_read(sorted, "getSize", U256::from(size));
        mock.set_read(
            helpers,
            "getApproxHint",
            CallValue::Tuple(vec![
                U256::from(55u64).into(),
                U256::from(3u64).into(),
                U256::from(9u64).into(),
            ]),
        );
        mock.set_read(
            sorted,
            "findInsertPosition",
            CallValue::Tuple(vec![U256::from(54u64).into(), U256::from(56u64).into()]),
        );
    }

    #[tokio::test]
    async fn test_insertion_hints_read_order() {
        let mock = MockChain::new();
        let client = mock.client();
        let branch = BranchId::new(1).unwrap();
        script(&mock, &client, branch, 100);

        let rate = U256::from(50_000_000_000_000_000u64);
        let hints = get_insertion_hints(&client, branch, rate, 42).await.unwrap();
        assert_eq!(hints.upper_hint, U256::from(54u64));
        assert_eq!(hints.lower_hint, U256::from(56u64));

        assert_eq!(
            mock.read_functions(),
            vec!["getSize", "getApproxHint", "findInsertPosition"]
        );

        let reads = mock.reads();
        assert_eq!(
            reads[1].args,
            vec![
                CallValue::Uint(U256::from(1u64)),
                CallValue::Uint(rate),
                CallValue::Uint(U256::from(100u64)),
                CallValue::Uint(U256::from(42u64)),
            ]
        );
        assert_eq!(
            reads[2].args,
            vec![
                CallValue::Uint(rate),
                CallValue::Uint(U256::from(55u64)),
                CallValue::Uint(U256::from(55u64)),
            ]
        );
    }

    #[tokio::test]
    async fn test_seed_is_passed_through() {
        let mock = MockChain::new();
        let client = mock.client();
        script(&mock, &client, BranchId::NATIVE, 4);

        get_insertion_hints(&client, BranchId::NATIVE, U256::from(1u64), 7)
            .await
            .unwrap();
        let reads = mock.reads();
        assert_eq!(reads[1].args[2], CallValue::Uint(U256::from(20u64)));
        assert_eq!(reads[1].args[3], CallValue::Uint(U256::from(7u64)));
    }

    #[tokio::test]
    async fn test_insertion_hints_read_failure() {
        let mock = MockChain::new();
        let client = mock.client();
        let sorted = client
            .registry()
            .branch_contract(BranchId::NATIVE, BranchContract::SortedTroves)
            .address;
        mock.fail_read(sorted, "getSize", "rpc down");

        let err = get_insertion_hints(&client, BranchId::NATIVE, U256::from(1u64), 42)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "read_failed");
        assert_eq!(mock.read_functions(), vec!["getSize"]);
    }

    #[tokio::test]
    async fn test_redemption_hints() {
        let mock = MockChain::new();
        let client = mock.client();
        let helpers = client
            .registry()
            .protocol_contract(ProtocolContract::HintHelpers)
            .address;
        mock.set_read(
            helpers,
            "getRedemptionHints",
            CallValue::Tuple(vec![
                Address::with_last_byte(0x77).into(),
                U256::from(11u64).into(),
                U256::from(12u64).into(),
                U256::from(900u64).into(),
            ]),
        );

        let hints = get_redemption_hints(&client, U256::from(1000u64), U256::from(2500u64), 10)
            .await
            .unwrap();
        assert_eq!(hints.first_redemption_hint, Address::with_last_byte(0x77));
        assert_eq!(hints.partial_upper_hint, U256::from(11u64));
        assert_eq!(hints.partial_lower_hint, U256::from(12u64));
        assert_eq!(hints.truncated_bold_amount, U256::from(900u64));
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock = MockChain::new();
        let client = mock.client();
        let helpers = client
            .registry()
            .protocol_contract(ProtocolContract::HintHelpers)
            .address;
        mock.set_read(helpers, "getRedemptionHints", U256::from(1u64));

        let err = get_redemption_hints(&client, U256::from(1u64), U256::from(1u64), 0)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "unexpected_response");
    }
}
