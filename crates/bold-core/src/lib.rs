//! bold-core: Shared types, errors, configuration and the contract registry
//!
//! This crate provides the foundational types used across the workspace.

pub mod config;
pub mod errors;
pub mod registry;
pub mod types;

pub use config::*;
pub use errors::*;
pub use registry::*;
pub use types::*;
