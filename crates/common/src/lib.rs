//! Shared building blocks for the nostrcoin faucet crates: fixed-point amounts,
//! key and event identifiers, error types, logging and configuration loading.

pub mod error;
pub mod types;
pub mod utils;

pub use error::{CommonError, Result};
pub use types::{Amount, EventId, PublicKey};
