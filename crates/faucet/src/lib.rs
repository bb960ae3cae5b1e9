//! Nostrcoin faucet service
//!
//! Pays a fixed amount to a Nostr identity at most once per cooldown period and
//! announces each payout as a signed event on a set of independent relays:
//! - Identity decoding (`npub`) and cooldown enforcement against a persisted ledger
//! - Payout signing with the faucet key
//! - Concurrent, failure-tolerant relay broadcast
//! - HTTP API, status and Prometheus metrics

pub mod api;
pub mod config;
pub mod error;
pub mod issuer;
pub mod ledger;
pub mod metrics;
pub mod relay;
pub mod service;

pub use config::FaucetConfig;
pub use error::{FaucetError, FaucetResult};
pub use issuer::PayoutIssuer;
pub use ledger::{ClaimLedger, Reservation};
pub use metrics::FaucetMetrics;
pub use relay::{RelayBroadcaster, RelayTarget, RelayTransport, WebSocketTransport};
pub use service::{ClaimService, Clock, FaucetStatus, PayoutReceipt, SystemClock};
