//! Faucet service core logic
//!
//! A claim walks `decode identity -> reserve -> issue -> broadcast -> commit`. Any
//! rejection before issuing leaves the ledger untouched and sends nothing to relays.
//! Once a payout is signed it is always broadcast, and the claim is committed after
//! every relay attempt has settled, whatever their outcome.

use crate::error::{FaucetError, FaucetResult};
use crate::issuer::PayoutIssuer;
use crate::ledger::ClaimLedger;
use crate::metrics::FaucetMetrics;
use crate::relay::RelayBroadcaster;
use nostrcoin_common::types::{Amount, EventId};
use nostrcoin_crypto::nip19;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Source of the current time, in milliseconds since the unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Faucet service
pub struct ClaimService {
    ledger: Arc<ClaimLedger>,
    issuer: PayoutIssuer,
    broadcaster: RelayBroadcaster,
    cooldown: Duration,
    clock: Arc<dyn Clock>,
    metrics: Arc<FaucetMetrics>,
}

impl ClaimService {
    pub fn new(
        ledger: Arc<ClaimLedger>,
        issuer: PayoutIssuer,
        broadcaster: RelayBroadcaster,
        cooldown: Duration,
        clock: Arc<dyn Clock>,
        metrics: Arc<FaucetMetrics>,
    ) -> Self {
        Self {
            ledger,
            issuer,
            broadcaster,
            cooldown,
            clock,
            metrics,
        }
    }

    /// Issue a payout to the identity behind `token` if its cooldown has elapsed.
    pub async fn request_payout(&self, token: &str) -> FaucetResult<PayoutReceipt> {
        let result = self.process_claim(token).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(FaucetError::InvalidIdentity(_)) => "invalid_identity",
            Err(FaucetError::CooldownActive { .. }) => "cooldown",
            Err(FaucetError::StorageFailure(_)) => "storage_error",
            Err(_) => "internal_error",
        };
        self.metrics.record_claim(outcome);

        result
    }

    async fn process_claim(&self, token: &str) -> FaucetResult<PayoutReceipt> {
        let token = token.trim();
        if token.is_empty() {
            return Err(FaucetError::InvalidIdentity("Missing npub".to_string()));
        }

        let recipient = nip19::decode_npub(token).map_err(|e| {
            debug!("Rejected identity token: {}", e);
            FaucetError::InvalidIdentity("Invalid npub".to_string())
        })?;

        let now = self.clock.now_millis();
        let reservation = match self.ledger.try_reserve(recipient, now, self.cooldown).await {
            Ok(reservation) => reservation,
            Err(e @ FaucetError::CooldownActive { .. }) => {
                warn!(recipient = %recipient, "Claim rejected: {}", e);
                return Err(e);
            }
            Err(e) => {
                error!(recipient = %recipient, "Ledger lookup failed: {:?}", e);
                return Err(e);
            }
        };

        let issued_at = (now / 1000).max(0) as u64;
        // The key was validated at startup; a failure here is reported for this claim only
        // and nothing reaches the relays or the ledger.
        let payout = self.issuer.issue(recipient, issued_at).map_err(|e| {
            error!("Failed to sign payout: {:?}", e);
            e
        })?;
        debug!(event_id = %payout.id(), recipient = %recipient, "Payout signed");

        let summary = self.broadcaster.broadcast(&payout).await;
        if summary.delivered() == 0 {
            warn!(event_id = %payout.id(), "No relay accepted the payout");
        }

        // payout is already public; a failed write does not fail the claim
        if let Err(e) = self.ledger.commit(reservation, now).await {
            error!(recipient = %recipient, event_id = %payout.id(), "Failed to record claim: {:?}", e);
        }

        info!(
            recipient = %recipient,
            event_id = %payout.id(),
            amount = %self.issuer.amount(),
            "Payout issued"
        );

        Ok(PayoutReceipt {
            event_id: payout.id(),
            amount: self.issuer.amount(),
            relays_attempted: summary.attempted(),
            relays_delivered: summary.delivered(),
        })
    }

    /// Get faucet status
    pub fn status(&self) -> FaucetResult<FaucetStatus> {
        Ok(FaucetStatus {
            npub: nip19::encode_npub(&self.issuer.issuer())?,
            amount: self.issuer.amount(),
            cooldown_days: self.cooldown.as_secs() / 86_400,
            relays: self
                .broadcaster
                .relays()
                .iter()
                .map(|relay| relay.url().to_string())
                .collect(),
            claimed_identities: self.ledger.claimed_identities(),
        })
    }

    pub fn metrics(&self) -> &FaucetMetrics {
        &self.metrics
    }
}

/// Result of a successful claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutReceipt {
    pub event_id: EventId,
    pub amount: Amount,
    pub relays_attempted: usize,
    pub relays_delivered: usize,
}

/// Faucet status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetStatus {
    pub npub: String,
    pub amount: Amount,
    pub cooldown_days: u64,
    pub relays: Vec<String>,
    pub claimed_identities: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{RelayError, RelayTarget, RelayTransport};
    use async_trait::async_trait;
    use nostrcoin_crypto::FaucetKeys;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            self.0
        }
    }

    #[derive(Default)]
    struct CountingTransport {
        frames: AtomicUsize,
    }

    #[async_trait]
    impl RelayTransport for CountingTransport {
        async fn publish(&self, _relay: &RelayTarget, _frame: &str) -> Result<(), RelayError> {
            self.frames.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service() -> (TempDir, ClaimService, Arc<ClaimLedger>, Arc<CountingTransport>) {
        let dir = TempDir::new().unwrap();
        let ledger = Arc::new(ClaimLedger::open(dir.path().join("ledger")).unwrap());
        let transport = Arc::new(CountingTransport::default());
        let metrics = Arc::new(FaucetMetrics::new().unwrap());
        let keys = Arc::new(FaucetKeys::from_bytes(&[0x11; 32]).unwrap());

        let service = ClaimService::new(
            ledger.clone(),
            PayoutIssuer::new(keys, Amount::from_base_units(500_000_000)),
            RelayBroadcaster::new(
                transport.clone(),
                vec![RelayTarget::new("wss://one.example"), RelayTarget::new("wss://two.example")],
                Duration::from_millis(200),
                metrics.clone(),
            ),
            Duration::from_secs(30 * 86_400),
            Arc::new(FixedClock(1_700_000_000_000)),
            metrics,
        );
        (dir, service, ledger, transport)
    }

    fn npub(seed: u8) -> (nostrcoin_common::types::PublicKey, String) {
        let key = FaucetKeys::from_bytes(&[seed; 32]).unwrap().public_key();
        (key, nip19::encode_npub(&key).unwrap())
    }

    #[tokio::test]
    async fn test_unreadable_record_stops_before_issuing() {
        let (_dir, service, ledger, transport) = service();
        let (key, token) = npub(9);
        ledger.put_raw(&key, b"garbage").unwrap();

        let result = service.request_payout(&token).await;
        assert!(matches!(result, Err(FaucetError::StorageFailure(_))));
        assert_eq!(transport.frames.load(Ordering::SeqCst), 0);
        assert_eq!(ledger.claimed_identities(), 1);
        assert_eq!(
            service.metrics().claims_total.with_label_values(&["storage_error"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_commit_after_broadcast_still_pays_out() {
        let (_dir, service, ledger, transport) = service();
        let (key, token) = npub(11);
        ledger.fail_commits(true);

        let receipt = service.request_payout(&token).await.unwrap();
        assert_eq!(receipt.relays_delivered, 2);
        assert_eq!(transport.frames.load(Ordering::SeqCst), 2);

        // nothing was recorded, so the identity stays eligible
        assert_eq!(ledger.last_claim(&key).await.unwrap(), None);
        assert_eq!(ledger.claimed_identities(), 0);
        assert_eq!(service.metrics().claims_total.with_label_values(&["success"]).get(), 1);

        ledger.fail_commits(false);
        assert!(service.request_payout(&token).await.is_ok());
        assert_eq!(ledger.last_claim(&key).await.unwrap(), Some(1_700_000_000_000));
    }

    #[tokio::test]
    async fn test_token_is_trimmed_before_decoding() {
        let (_dir, service, ledger, transport) = service();
        let (key, token) = npub(10);

        let receipt = service.request_payout(&format!("  {}\n", token)).await.unwrap();
        assert_eq!(receipt.relays_delivered, 2);
        assert_eq!(transport.frames.load(Ordering::SeqCst), 2);
        assert_eq!(ledger.last_claim(&key).await.unwrap(), Some(1_700_000_000_000));
    }

    #[tokio::test]
    async fn test_status_cooldown_in_days() {
        let (_dir, service, _ledger, _transport) = service();
        let status = service.status().unwrap();
        assert_eq!(status.cooldown_days, 30);
        assert_eq!(status.relays, vec!["wss://one.example", "wss://two.example"]);
        assert_eq!(status.claimed_identities, 0);
    }
}
