//! Leverage / Multiply support for BOLD positions
//!
//! - [`calculator`]: pure leverage, LTV and liquidation-risk math
//! - [`quotes`]: swap quotes sizing flash loans for leverage flows

pub mod calculator;
pub mod constants;
pub mod quotes;

pub use calculator::{LeverageAmounts, RiskLevel};
pub use quotes::{DeleverageParams, LeverageParams, QuoteService, SwapDirection};
