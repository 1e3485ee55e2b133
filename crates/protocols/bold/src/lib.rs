//! BOLD protocol transaction flows
//!
//! Turns a user intent ([`TxRequest`]) into an ordered list of steps that a
//! `tx_flow::TxSession` executes one transaction at a time.
//!
//! - [`flows`]: one flow definition per intent (borrow, earn, stake, redeem,
//!   interest rate delegation, multiply)
//! - [`hints`]: sorted-list insertion and redemption hints
//! - [`approvals`]: ERC-20 allowance checks and approvals
//! - [`troves`], [`delegates`]: on-chain reads the flows depend on

pub mod approvals;
pub mod constants;
pub mod delegates;
pub mod flows;
pub mod hints;
pub mod protocol;
pub mod requests;
pub mod troves;

pub use delegates::{BatchConstraints, BatchData, Delegate};
pub use flows::definition_for;
pub use flows::multiply::{size_lever_down, size_open_leverage, OpenLeverageTerms};
pub use hints::{InsertionHints, RedemptionHints};
pub use protocol::Protocol;
pub use requests::*;
pub use troves::TroveData;
