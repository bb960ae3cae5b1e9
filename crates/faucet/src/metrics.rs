use crate::relay::RelayOutcome;
use prometheus::{
    histogram_opts, opts, Encoder, Histogram, IntCounterVec, Registry, TextEncoder,
};
use std::time::Duration;

/// Prometheus metrics for claims and relay delivery
#[derive(Debug)]
pub struct FaucetMetrics {
    registry: Registry,

    /// Claims by terminal state: success, invalid_identity, cooldown, storage_error, internal_error
    pub claims_total: IntCounterVec,

    /// Relay attempts by outcome: delivered, failed, timed_out
    pub relay_attempts_total: IntCounterVec,

    pub broadcast_duration: Histogram,
}

impl FaucetMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let claims_total = IntCounterVec::new(
            opts!("nostrcoin_faucet_claims_total", "Claims processed, by outcome"),
            &["outcome"],
        )?;

        let relay_attempts_total = IntCounterVec::new(
            opts!(
                "nostrcoin_faucet_relay_attempts_total",
                "Relay delivery attempts, by outcome"
            ),
            &["outcome"],
        )?;

        let broadcast_duration = Histogram::with_opts(histogram_opts!(
            "nostrcoin_faucet_broadcast_duration_seconds",
            "Time until every relay attempt of a broadcast settled",
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
        ))?;

        registry.register(Box::new(claims_total.clone()))?;
        registry.register(Box::new(relay_attempts_total.clone()))?;
        registry.register(Box::new(broadcast_duration.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

        Ok(Self {
            registry,
            claims_total,
            relay_attempts_total,
            broadcast_duration,
        })
    }

    pub fn record_claim(&self, outcome: &str) {
        self.claims_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_relay_attempt(&self, outcome: RelayOutcome) {
        self.relay_attempts_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    pub fn observe_broadcast(&self, elapsed: Duration) {
        self.broadcast_duration.observe(elapsed.as_secs_f64());
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
