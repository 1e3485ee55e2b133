//! Leverage Constants
//!
//! UI bounds for the leverage slider, risk thresholds and the swap slippage
//! buffer. Fixed-point values use 18 decimals.

/// Leverage slider parameters
pub mod params {
    /// Smallest leverage factor offered
    pub const LEVERAGE_FACTOR_MIN: f64 = 1.1;

    /// Largest leverage factor offered
    pub const LEVERAGE_FACTOR_MAX: f64 = 11.0;

    /// Leverage factors are rounded to this step
    pub const LEVERAGE_FACTOR_PRECISION: f64 = 0.1;

    /// Share of the maximum LTV allowed when opening (~91.67%)
    pub const MAX_LTV_ALLOWED_RATIO: f64 = 0.916666667;

    /// Default slippage tolerance for leverage swaps (5%)
    pub const SLIPPAGE_TOLERANCE: f64 = 0.05;

    /// Divisor for the marginal amount used in price impact
    pub const MARGINAL_AMOUNT_DIVISOR: u64 = 1000;
}

/// Liquidation risk thresholds, as a share of the maximum LTV
pub mod ltv_risk {
    /// Above 54% of max LTV: medium risk
    pub const MEDIUM: f64 = 0.54;

    /// Above 73% of max LTV: high risk
    pub const HIGH: f64 = 0.73;
}

pub use bold_core::constants::DECIMAL_PRECISION;
