//! Faucet configuration

use crate::error::{FaucetError, FaucetResult};
use crate::relay::RelayTarget;
use nostrcoin_common::types::Amount;
use nostrcoin_common::utils::config::load_config;
use nostrcoin_common::utils::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

const SECS_PER_DAY: u64 = 86_400;
const MILLIS_PER_DAY: i64 = 86_400_000;

/// Faucet service configuration
///
/// Everything here is fixed at startup; nothing is re-read while serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaucetConfig {
    /// Server address
    pub server_addr: String,

    /// Faucet secret key, `nsec1…` or hex
    pub private_key: String,

    /// Amount issued per claim, fixed-point with 8 decimals
    pub amount: String,

    /// Minimum number of days between two claims by the same identity
    pub cooldown_days: u64,

    /// Relay endpoints the payout is announced to
    pub relays: Vec<String>,

    /// Upper bound for connecting to and publishing on a single relay (seconds)
    pub relay_timeout_secs: u64,

    /// How long a relay connection stays open after publishing (milliseconds)
    pub relay_close_grace_ms: u64,

    /// Database path
    pub db_path: String,

    /// Directory served as static files, e.g. the faucet front-end
    pub static_dir: Option<String>,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Expose Prometheus metrics on /metrics
    pub metrics_enabled: bool,

    pub logging: LoggingConfig,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:3000".to_string(),
            private_key: String::new(),
            amount: "5.00000000".to_string(),
            cooldown_days: 30,
            relays: vec![
                "wss://relay.damus.io".to_string(),
                "wss://nos.lol".to_string(),
                "wss://relay.nostr.band".to_string(),
                "wss://nostr.mom".to_string(),
            ],
            relay_timeout_secs: 5,
            relay_close_grace_ms: 3000,
            db_path: "./faucet_data".to_string(),
            static_dir: Some("public".to_string()),
            cors_enabled: true,
            metrics_enabled: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl FaucetConfig {
    /// Load from an optional config file (TOML, YAML or JSON), falling back to defaults.
    pub fn load(path: Option<&Path>) -> FaucetResult<Self> {
        match path {
            Some(path) => Ok(load_config(path)?),
            None => Ok(Self::default()),
        }
    }

    /// Apply `FAUCET_*` environment variable overrides
    pub fn apply_env(&mut self) -> FaucetResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> FaucetResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("FAUCET_SERVER_ADDR") {
            self.server_addr = addr;
        }

        if let Some(key) = lookup("FAUCET_PRIVATE_KEY") {
            self.private_key = key;
        }

        if let Some(amount) = lookup("FAUCET_AMOUNT") {
            self.amount = amount;
        }

        if let Some(days) = lookup("FAUCET_COOLDOWN_DAYS") {
            self.cooldown_days = parse_env("FAUCET_COOLDOWN_DAYS", &days)?;
        }

        if let Some(relays) = lookup("FAUCET_RELAYS") {
            self.relays = relays
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(timeout) = lookup("FAUCET_RELAY_TIMEOUT") {
            self.relay_timeout_secs = parse_env("FAUCET_RELAY_TIMEOUT", &timeout)?;
        }

        if let Some(db_path) = lookup("FAUCET_DB_PATH") {
            self.db_path = db_path;
        }

        if let Some(dir) = lookup("FAUCET_STATIC_DIR") {
            self.static_dir = if dir.is_empty() { None } else { Some(dir) };
        }

        if let Some(level) = lookup("FAUCET_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Reject configurations the service cannot run with.
    ///
    /// The private key is checked separately when the signer is built.
    pub fn validate(&self) -> FaucetResult<()> {
        self.server_addr
            .parse::<SocketAddr>()
            .map_err(|_| FaucetError::Config(format!("invalid server address: {}", self.server_addr)))?;

        self.amount()?;

        if self.cooldown_days == 0 {
            return Err(FaucetError::Config("cooldown_days must be at least 1".to_string()));
        }

        // the ledger compares cooldowns as i64 milliseconds
        if i64::try_from(self.cooldown_days)
            .ok()
            .and_then(|days| days.checked_mul(MILLIS_PER_DAY))
            .is_none()
        {
            return Err(FaucetError::Config(format!(
                "cooldown_days is too large: {}",
                self.cooldown_days
            )));
        }

        if self.relays.is_empty() {
            return Err(FaucetError::Config("at least one relay is required".to_string()));
        }

        if let Some(bad) = self
            .relays
            .iter()
            .find(|r| !(r.starts_with("ws://") || r.starts_with("wss://")))
        {
            return Err(FaucetError::Config(format!("relay must be a ws:// or wss:// url: {}", bad)));
        }

        if self.relay_timeout_secs == 0 {
            return Err(FaucetError::Config("relay_timeout_secs must be at least 1".to_string()));
        }

        Ok(())
    }

    pub fn amount(&self) -> FaucetResult<Amount> {
        self.amount
            .parse()
            .map_err(|_| FaucetError::Config(format!("invalid amount: {}", self.amount)))
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_days.saturating_mul(SECS_PER_DAY))
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }

    pub fn relay_close_grace(&self) -> Duration {
        Duration::from_millis(self.relay_close_grace_ms)
    }

    pub fn relay_targets(&self) -> Vec<RelayTarget> {
        self.relays.iter().map(|url| RelayTarget::new(url.clone())).collect()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> FaucetResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| FaucetError::Config(format!("{} has an invalid value: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = FaucetConfig::default();
        assert_eq!(config.amount().unwrap().to_string(), "5.00000000");
        assert_eq!(config.cooldown(), Duration::from_secs(30 * 86_400));
        assert_eq!(config.relays.len(), 4);
        assert_eq!(config.relay_close_grace(), Duration::from_secs(3));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FAUCET_AMOUNT", "1.5"),
            ("FAUCET_COOLDOWN_DAYS", "7"),
            ("FAUCET_RELAYS", "wss://a.example, ws://b.example ,"),
            ("FAUCET_STATIC_DIR", ""),
        ]
        .into_iter()
        .collect();

        let mut config = FaucetConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.amount().unwrap().to_string(), "1.50000000");
        assert_eq!(config.cooldown_days, 7);
        assert_eq!(config.relays, vec!["wss://a.example", "ws://b.example"]);
        assert_eq!(config.static_dir, None);
    }

    #[test]
    fn test_env_override_rejects_bad_number() {
        let mut config = FaucetConfig::default();
        let result = config.apply_overrides(|k| (k == "FAUCET_COOLDOWN_DAYS").then(|| "soon".to_string()));
        assert!(matches!(result, Err(FaucetError::Config(_))));
    }

    #[test]
    fn test_validate() {
        assert!(FaucetConfig::default().validate().is_ok());

        let bad_amount = FaucetConfig { amount: "five".to_string(), ..Default::default() };
        assert!(matches!(bad_amount.validate(), Err(FaucetError::Config(_))));

        let no_relays = FaucetConfig { relays: vec![], ..Default::default() };
        assert!(matches!(no_relays.validate(), Err(FaucetError::Config(_))));

        let http_relay = FaucetConfig { relays: vec!["https://nos.lol".to_string()], ..Default::default() };
        assert!(matches!(http_relay.validate(), Err(FaucetError::Config(_))));

        let zero_cooldown = FaucetConfig { cooldown_days: 0, ..Default::default() };
        assert!(matches!(zero_cooldown.validate(), Err(FaucetError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_overflowing_cooldown() {
        let huge = FaucetConfig { cooldown_days: u64::MAX, ..Default::default() };
        assert!(matches!(huge.validate(), Err(FaucetError::Config(_))));
        assert_eq!(huge.cooldown(), Duration::from_secs(u64::MAX));

        let just_over = FaucetConfig {
            cooldown_days: (i64::MAX / MILLIS_PER_DAY) as u64 + 1,
            ..Default::default()
        };
        assert!(matches!(just_over.validate(), Err(FaucetError::Config(_))));

        let a_century = FaucetConfig { cooldown_days: 36_500, ..Default::default() };
        assert!(a_century.validate().is_ok());
        assert_eq!(a_century.cooldown(), Duration::from_secs(36_500 * 86_400));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "cooldown_days = 14\nrelays = [\"wss://relay.example\"]").unwrap();

        let config = FaucetConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.cooldown_days, 14);
        assert_eq!(config.relays, vec!["wss://relay.example"]);
        assert_eq!(config.amount, "5.00000000");
    }
}
