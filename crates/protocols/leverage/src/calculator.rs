//! Leverage / Multiply Calculator
//!
//! Pure math for leveraged positions. No I/O, no async.
//!
//! # Units
//!
//! - Ratios and prices: `f64` (UI previews only)
//! - Amounts passed to transactions: `U256`, 18-decimal fixed point
//!
//! Invalid inputs return sentinels (`None`, `f64::INFINITY`) instead of
//! panicking; callers branch on them before using a result.

use bold_core::U256;
use serde::{Deserialize, Serialize};

use crate::constants::{ltv_risk, params, DECIMAL_PRECISION};

/// Liquidation risk tier of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Liquidatable,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Liquidatable => "liquidatable",
        }
    }
}

/// Sizing of a leveraged position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeverageAmounts {
    /// Collateral after leverage
    pub total_deposit: f64,
    /// Extra collateral bought with the flash loan
    pub flash_loan_amount: f64,
    /// BOLD debt taken to repay the flash loan
    pub debt_amount: f64,
    pub ltv: f64,
}

/// LTV = (factor - 1) / factor
pub fn ltv_from_leverage(factor: f64) -> Option<f64> {
    if factor <= 0.0 {
        return None;
    }
    Some((factor - 1.0) / factor)
}

/// factor = 1 / (1 - LTV)
pub fn leverage_from_ltv(ltv: f64) -> f64 {
    if ltv >= 1.0 {
        return f64::INFINITY;
    }
    1.0 / (1.0 - ltv)
}

/// Round to the nearest leverage step (0.1)
pub fn round_leverage(factor: f64) -> f64 {
    (factor / params::LEVERAGE_FACTOR_PRECISION).round() * params::LEVERAGE_FACTOR_PRECISION
}

/// Leverage factor that puts the liquidation price at `liquidation_price`
pub fn leverage_from_liquidation_price(
    liquidation_price: f64,
    coll_price: f64,
    min_coll_ratio: f64,
) -> Option<f64> {
    let coll_price_ratio = coll_price * min_coll_ratio;
    if liquidation_price >= coll_price_ratio {
        return None;
    }
    Some(coll_price_ratio / (coll_price_ratio - liquidation_price))
}

/// Liquidation price of a position opened at `factor`
pub fn liquidation_price_from_leverage(
    factor: f64,
    coll_price: f64,
    min_coll_ratio: f64,
) -> Option<f64> {
    if factor <= 0.0 {
        return None;
    }
    Some((factor - 1.0) * min_coll_ratio * coll_price / factor)
}

/// Liquidation price = debt * MCR / deposit
pub fn liquidation_price(deposit: f64, debt: f64, min_coll_ratio: f64) -> Option<f64> {
    if deposit <= 0.0 || debt <= 0.0 {
        return None;
    }
    // An MCR at or below 100% is not a valid configuration
    if min_coll_ratio <= 1.0 {
        return None;
    }
    Some(debt * min_coll_ratio / deposit)
}

/// LTV = debt / (deposit * price)
pub fn ltv(deposit: f64, debt: f64, coll_price_usd: f64) -> Option<f64> {
    let deposit_usd = deposit * coll_price_usd;
    if deposit_usd > 0.0 {
        Some(debt / deposit_usd)
    } else {
        None
    }
}

/// Risk tier of `ltv` relative to `max_ltv`. Thresholds are exclusive.
pub fn liquidation_risk(ltv: f64, max_ltv: f64) -> RiskLevel {
    if ltv <= 0.0 {
        RiskLevel::Low
    } else if ltv > max_ltv {
        RiskLevel::Liquidatable
    } else if ltv > max_ltv * ltv_risk::HIGH {
        RiskLevel::High
    } else if ltv > max_ltv * ltv_risk::MEDIUM {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Maximum leverage when opening, keeping LTV at ~91.67% of 1 / MCR
pub fn max_leverage(min_coll_ratio: f64) -> f64 {
    let max_ltv = 1.0 / min_coll_ratio;
    leverage_from_ltv(max_ltv * params::MAX_LTV_ALLOWED_RATIO)
}

/// Flash loan and debt needed to reach `factor` from `initial_deposit`
pub fn leverage_amounts(initial_deposit: f64, factor: f64, coll_price: f64) -> LeverageAmounts {
    let total_deposit = initial_deposit * factor;
    let flash_loan_amount = total_deposit - initial_deposit;
    let debt_amount = flash_loan_amount * coll_price;

    let total_value = total_deposit * coll_price;
    let ltv = if total_value > 0.0 {
        debt_amount / total_value
    } else {
        0.0
    };

    LeverageAmounts {
        total_deposit,
        flash_loan_amount,
        debt_amount,
        ltv,
    }
}

/// Leverage of an existing position; infinite once debt reaches the deposit value
pub fn leverage_from_position(deposit: f64, debt: f64, coll_price: f64) -> f64 {
    let deposit_value = deposit * coll_price;
    if deposit_value <= debt {
        return f64::INFINITY;
    }
    deposit_value / (deposit_value - debt)
}

/// Collateral ratio matching a leverage factor: CR = factor / (factor - 1)
pub fn leverage_to_collateral_ratio(factor: f64) -> f64 {
    factor / (factor - 1.0)
}

/// `amount * (1 ± tolerance)` in 18-decimal fixed point.
///
/// `increasing` gives a worst-case upper bound (amount to pay), otherwise a
/// worst-case lower bound (amount to receive).
pub fn apply_slippage(amount: U256, tolerance: f64, increasing: bool) -> U256 {
    let factor = if increasing {
        1.0 + tolerance
    } else {
        1.0 - tolerance
    };
    let factor = to_fixed(factor);

    // amount * factor / 1e18 without overflowing the intermediate product
    let whole = (amount / DECIMAL_PRECISION).saturating_mul(factor);
    let fraction = (amount % DECIMAL_PRECISION) * factor / DECIMAL_PRECISION;
    whole.saturating_add(fraction)
}

/// round(value * 1e18); negative and NaN inputs map to zero
pub fn to_fixed(value: f64) -> U256 {
    if value.is_nan() || value <= 0.0 {
        return U256::ZERO;
    }
    U256::from((value * 1e18).round() as u128)
}

/// value / 1e18 as a float
pub fn from_fixed(value: U256) -> f64 {
    u256_to_f64(value) / 1e18
}

/// Lossy conversion of a full-width integer
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, &limb| acc * 18_446_744_073_709_551_616.0 + limb as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wei(s: &str) -> U256 {
        s.parse().unwrap()
    }

    #[test]
    fn test_ltv_leverage_roundtrip() {
        for factor in [1.1, 1.5, 2.0, 3.7, 11.0] {
            let ltv = ltv_from_leverage(factor).unwrap();
            assert!((leverage_from_ltv(ltv) - factor).abs() < 1e-9, "factor {}", factor);
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(ltv_from_leverage(2.0), Some(0.5));
        assert_eq!(leverage_from_ltv(0.5), 2.0);
        assert_eq!(leverage_from_ltv(1.0), f64::INFINITY);
        assert_eq!(leverage_from_ltv(1.5), f64::INFINITY);
        assert_eq!(ltv_from_leverage(0.0), None);
        assert_eq!(ltv_from_leverage(-1.0), None);
    }

    #[test]
    fn test_liquidation_risk_tiers() {
        assert_eq!(liquidation_risk(0.3, 0.9091), RiskLevel::Low);
        assert_eq!(liquidation_risk(0.55, 0.9091), RiskLevel::Medium);
        assert_eq!(liquidation_risk(0.75, 0.9091), RiskLevel::High);
        assert_eq!(liquidation_risk(0.95, 0.9091), RiskLevel::Liquidatable);
        assert_eq!(liquidation_risk(0.0, 0.9091), RiskLevel::Low);
        assert_eq!(liquidation_risk(-0.2, 0.9091), RiskLevel::Low);
    }

    #[test]
    fn test_liquidation_risk_thresholds_are_exclusive() {
        // Exactly at max LTV is high, not liquidatable
        assert_eq!(liquidation_risk(0.8, 0.8), RiskLevel::High);
        assert_eq!(liquidation_risk(0.5, 1.0), RiskLevel::Low);
        assert_eq!(liquidation_risk(0.5 + 1e-9, 1.0), RiskLevel::Low);
        assert_eq!(liquidation_risk(0.55, 1.0), RiskLevel::Medium);
    }

    #[test]
    fn test_apply_slippage() {
        let one = wei("1000000000000000000");
        assert_eq!(apply_slippage(one, 0.05, true), wei("1050000000000000000"));
        assert_eq!(apply_slippage(one, 0.05, false), wei("950000000000000000"));
        assert_eq!(apply_slippage(U256::ZERO, 0.05, true), U256::ZERO);
        // Fractional part is scaled too
        assert_eq!(apply_slippage(U256::from(1000u64), 0.05, true), U256::from(1050u64));
    }

    #[test]
    fn test_leverage_amounts() {
        let amounts = leverage_amounts(1.0, 2.0, 2500.0);
        assert_eq!(amounts.total_deposit, 2.0);
        assert_eq!(amounts.flash_loan_amount, 1.0);
        assert_eq!(amounts.debt_amount, 2500.0);
        assert!((amounts.ltv - 0.5).abs() < 1e-12);

        assert_eq!(leverage_amounts(0.0, 2.0, 2500.0).ltv, 0.0);
    }

    #[test]
    fn test_liquidation_price() {
        // 2 ETH backing 3000 BOLD at 110% MCR
        let price = liquidation_price(2.0, 3000.0, 1.1).unwrap();
        assert!((price - 1650.0).abs() < 1e-9);

        assert_eq!(liquidation_price(0.0, 3000.0, 1.1), None);
        assert_eq!(liquidation_price(2.0, 0.0, 1.1), None);
        assert_eq!(liquidation_price(2.0, 3000.0, 1.0), None);
    }

    #[test]
    fn test_ltv() {
        assert_eq!(ltv(2.0, 2500.0, 2500.0), Some(0.5));
        assert_eq!(ltv(0.0, 2500.0, 2500.0), None);
        assert_eq!(ltv(2.0, 2500.0, 0.0), None);
    }

    #[test]
    fn test_max_leverage() {
        // MCR 110%: max LTV 0.909, allowed 0.8333, leverage 6x
        assert!((max_leverage(1.1) - 6.0).abs() < 1e-6);
        assert!(max_leverage(1.2) < max_leverage(1.1));
    }

    #[test]
    fn test_round_leverage() {
        assert!((round_leverage(2.34) - 2.3).abs() < 1e-9);
        assert!((round_leverage(2.36) - 2.4).abs() < 1e-9);
    }

    #[test]
    fn test_liquidation_price_leverage_inverse() {
        let liq = liquidation_price_from_leverage(3.0, 2500.0, 1.1).unwrap();
        let factor = leverage_from_liquidation_price(liq, 2500.0, 1.1).unwrap();
        assert!((factor - 3.0).abs() < 1e-9);

        assert_eq!(leverage_from_liquidation_price(3000.0, 2500.0, 1.1), None);
        assert_eq!(liquidation_price_from_leverage(0.0, 2500.0, 1.1), None);
    }

    #[test]
    fn test_leverage_from_position() {
        assert!((leverage_from_position(2.0, 2500.0, 2500.0) - 2.0).abs() < 1e-12);
        assert_eq!(leverage_from_position(1.0, 2500.0, 2500.0), f64::INFINITY);
        assert!((leverage_to_collateral_ratio(2.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_fixed_point_conversion() {
        assert_eq!(to_fixed(2.5), wei("2500000000000000000"));
        assert_eq!(to_fixed(-1.0), U256::ZERO);
        assert_eq!(to_fixed(f64::NAN), U256::ZERO);
        assert_eq!(from_fixed(wei("1500000000000000000")), 1.5);
        assert_eq!(
            u256_to_f64(U256::from_limbs([0, 1, 0, 0])),
            18_446_744_073_709_551_616.0
        );
    }
}
