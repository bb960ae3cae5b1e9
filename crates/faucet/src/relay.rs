//! Redundant, fire-and-forget announcement of signed payouts to relays.
//!
//! Every configured relay gets its own delivery attempt, run concurrently and bounded by
//! a per-relay timeout. Attempts never fail the broadcast: connect, send and timeout
//! errors are logged and counted, then dropped. The broadcast returns once every attempt
//! has settled.

use crate::metrics::FaucetMetrics;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use nostrcoin_crypto::SignedPayout;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// A relay endpoint, e.g. `wss://nos.lol`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayTarget {
    url: String,
}

impl RelayTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),
}

/// Delivers one publish frame to one relay.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn publish(&self, relay: &RelayTarget, frame: &str) -> Result<(), RelayError>;
}

/// WebSocket delivery: connect, send a single text frame, keep the socket open for a
/// grace period so the relay can process it, then close.
///
/// The attempt resolves as soon as the frame is sent; the grace period and close run
/// on a detached task.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    close_grace: Duration,
}

impl WebSocketTransport {
    pub fn new(close_grace: Duration) -> Self {
        Self { close_grace }
    }
}

#[async_trait]
impl RelayTransport for WebSocketTransport {
    async fn publish(&self, relay: &RelayTarget, frame: &str) -> Result<(), RelayError> {
        let (mut ws, _) = connect_async(relay.url())
            .await
            .map_err(|e| RelayError::Connect(e.to_string()))?;

        if let Err(e) = ws.send(Message::Text(frame.to_string())).await {
            let _ = ws.close(None).await;
            return Err(RelayError::Send(e.to_string()));
        }

        let grace = self.close_grace;
        let url = relay.url().to_string();
        tokio::spawn(async move {
            // Relays answer with ["OK", <id>, <accepted>, <message>]; surfaced for debugging only.
            let _ = tokio::time::timeout(grace, async {
                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Text(text) = msg {
                        debug!(relay = %url, "Relay response: {}", text);
                    }
                }
            })
            .await;

            if let Err(e) = ws.close(None).await {
                debug!(relay = %url, "Relay close failed: {}", e);
            }
        });

        Ok(())
    }
}

/// How a single relay attempt settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    Failed,
    TimedOut,
}

impl RelayOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayOutcome::Delivered => "delivered",
            RelayOutcome::Failed => "failed",
            RelayOutcome::TimedOut => "timed_out",
        }
    }
}

/// Per-relay outcomes of one broadcast. Informational only; never affects a claim.
#[derive(Debug, Clone, Default)]
pub struct BroadcastSummary {
    pub outcomes: Vec<(RelayTarget, RelayOutcome)>,
}

impl BroadcastSummary {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == RelayOutcome::Delivered)
            .count()
    }
}

pub struct RelayBroadcaster {
    transport: Arc<dyn RelayTransport>,
    relays: Arc<[RelayTarget]>,
    per_relay_timeout: Duration,
    metrics: Arc<FaucetMetrics>,
}

impl RelayBroadcaster {
    pub fn new(
        transport: Arc<dyn RelayTransport>,
        relays: Vec<RelayTarget>,
        per_relay_timeout: Duration,
        metrics: Arc<FaucetMetrics>,
    ) -> Self {
        Self {
            transport,
            relays: relays.into(),
            per_relay_timeout,
            metrics,
        }
    }

    pub fn relays(&self) -> &[RelayTarget] {
        &self.relays
    }

    /// Announce `payout` on every relay and wait until all attempts have settled.
    pub async fn broadcast(&self, payout: &SignedPayout) -> BroadcastSummary {
        let started = Instant::now();

        let frame = match payout.to_publish_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(event_id = %payout.id(), "Could not encode publish frame: {}", e);
                let outcomes = self
                    .relays
                    .iter()
                    .map(|relay| (relay.clone(), RelayOutcome::Failed))
                    .collect();
                return self.settle(payout, outcomes, started);
            }
        };

        let attempts = self.relays.iter().cloned().map(|relay| {
            let transport = self.transport.clone();
            let frame = frame.clone();
            let timeout = self.per_relay_timeout;

            tokio::spawn(async move {
                let outcome = match tokio::time::timeout(timeout, transport.publish(&relay, &frame)).await {
                    Ok(Ok(())) => {
                        debug!(relay = %relay.url(), "Payout published");
                        RelayOutcome::Delivered
                    }
                    Ok(Err(e)) => {
                        warn!(relay = %relay.url(), "Relay publish failed: {}", e);
                        RelayOutcome::Failed
                    }
                    Err(_) => {
                        warn!(relay = %relay.url(), "Relay publish timed out after {:?}", timeout);
                        RelayOutcome::TimedOut
                    }
                };
                (relay, outcome)
            })
        });

        // join on all settled, not all succeeded
        let settled = futures::future::join_all(attempts).await;

        let outcomes: Vec<(RelayTarget, RelayOutcome)> = settled
            .into_iter()
            .zip(self.relays.iter())
            .map(|(joined, relay)| match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(relay = %relay.url(), "Relay task aborted: {}", e);
                    (relay.clone(), RelayOutcome::Failed)
                }
            })
            .collect();

        self.settle(payout, outcomes, started)
    }

    /// Count every outcome and close out the broadcast timer.
    fn settle(
        &self,
        payout: &SignedPayout,
        outcomes: Vec<(RelayTarget, RelayOutcome)>,
        started: Instant,
    ) -> BroadcastSummary {
        for (_, outcome) in &outcomes {
            self.metrics.record_relay_attempt(*outcome);
        }
        self.metrics.observe_broadcast(started.elapsed());

        let summary = BroadcastSummary { outcomes };
        info!(
            event_id = %payout.id(),
            delivered = summary.delivered(),
            attempted = summary.attempted(),
            "Broadcast settled"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostrcoin_common::types::PublicKey;
    use nostrcoin_crypto::{FaucetKeys, UnsignedPayout};
    use std::sync::Mutex;

    /// Behaves per relay url: "ok" delivers, "down" refuses, "slow" hangs.
    #[derive(Default)]
    struct ScriptedTransport {
        frames: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl RelayTransport for ScriptedTransport {
        async fn publish(&self, relay: &RelayTarget, frame: &str) -> Result<(), RelayError> {
            if relay.url().contains("down") {
                return Err(RelayError::Connect("connection refused".to_string()));
            }
            if relay.url().contains("slow") {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.frames
                .lock()
                .unwrap()
                .push((relay.url().to_string(), frame.to_string()));
            Ok(())
        }
    }

    fn payout() -> SignedPayout {
        let keys = FaucetKeys::from_bytes(&[7u8; 32]).unwrap();
        UnsignedPayout::new(keys.public_key(), PublicKey([9; 32]), "5".parse().unwrap(), 1_700_000_000)
            .sign(&keys)
            .unwrap()
    }

    fn broadcaster(transport: Arc<ScriptedTransport>, urls: &[&str]) -> RelayBroadcaster {
        RelayBroadcaster::new(
            transport,
            urls.iter().map(|u| RelayTarget::new(*u)).collect(),
            Duration::from_millis(200),
            Arc::new(FaucetMetrics::new().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_delivers_to_every_relay() {
        let transport = Arc::new(ScriptedTransport::default());
        let broadcaster = broadcaster(transport.clone(), &["wss://ok-1", "wss://ok-2", "wss://ok-3"]);
        let payout = payout();

        let summary = broadcaster.broadcast(&payout).await;
        assert_eq!(summary.attempted(), 3);
        assert_eq!(summary.delivered(), 3);

        let frames = transport.frames.lock().unwrap();
        assert_eq!(frames.len(), 3);
        let expected = payout.to_publish_frame().unwrap();
        assert!(frames.iter().all(|(_, frame)| frame == &expected));
    }

    #[tokio::test]
    async fn test_partial_failure_is_absorbed() {
        let transport = Arc::new(ScriptedTransport::default());
        let broadcaster = broadcaster(transport.clone(), &["wss://ok", "wss://down", "wss://slow"]);

        let summary = broadcaster.broadcast(&payout()).await;
        let outcomes: Vec<RelayOutcome> = summary.outcomes.iter().map(|(_, o)| *o).collect();
        assert_eq!(
            outcomes,
            vec![RelayOutcome::Delivered, RelayOutcome::Failed, RelayOutcome::TimedOut]
        );
    }

    #[tokio::test]
    async fn test_completes_when_all_relays_unreachable() {
        let transport = Arc::new(ScriptedTransport::default());
        let broadcaster = broadcaster(transport.clone(), &["wss://down-1", "wss://slow-2"]);

        let started = Instant::now();
        let summary = broadcaster.broadcast(&payout()).await;

        assert_eq!(summary.delivered(), 0);
        assert_eq!(summary.attempted(), 2);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_every_outcome_is_counted() {
        let transport = Arc::new(ScriptedTransport::default());
        let broadcaster = broadcaster(transport, &["wss://ok", "wss://down", "wss://slow"]);
        broadcaster.broadcast(&payout()).await;

        let attempts = &broadcaster.metrics.relay_attempts_total;
        assert_eq!(attempts.with_label_values(&["delivered"]).get(), 1);
        assert_eq!(attempts.with_label_values(&["failed"]).get(), 1);
        assert_eq!(attempts.with_label_values(&["timed_out"]).get(), 1);
        assert_eq!(broadcaster.metrics.broadcast_duration.get_sample_count(), 1);
    }

    #[test]
    fn test_unsent_broadcast_still_counts_failures() {
        let broadcaster = broadcaster(Arc::new(ScriptedTransport::default()), &["wss://a", "wss://b"]);
        let outcomes = broadcaster
            .relays()
            .iter()
            .map(|relay| (relay.clone(), RelayOutcome::Failed))
            .collect();

        let summary = broadcaster.settle(&payout(), outcomes, Instant::now());
        assert_eq!(summary.attempted(), 2);
        assert_eq!(summary.delivered(), 0);
        assert_eq!(
            broadcaster.metrics.relay_attempts_total.with_label_values(&["failed"]).get(),
            2
        );
        assert_eq!(broadcaster.metrics.broadcast_duration.get_sample_count(), 1);
    }

    #[tokio::test]
    async fn test_websocket_transport_reports_connect_failure() {
        let transport = WebSocketTransport::new(Duration::from_millis(10));
        // port 9 on localhost: nothing listens there in test environments
        let result = transport
            .publish(&RelayTarget::new("ws://127.0.0.1:9"), "[\"EVENT\",{}]")
            .await;
        assert!(matches!(result, Err(RelayError::Connect(_))));
    }
}
