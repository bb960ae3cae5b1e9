//! Faucet service binary

use anyhow::Context;
use clap::Parser;
use nostrcoin_common::utils::logging::init_logging;
use nostrcoin_crypto::FaucetKeys;
use nostrcoin_faucet::{
    api, ClaimLedger, ClaimService, FaucetConfig, FaucetMetrics, PayoutIssuer, RelayBroadcaster,
    SystemClock, WebSocketTransport,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// Faucet service CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server address
    #[arg(long)]
    server_addr: Option<String>,

    /// Faucet secret key (nsec or hex)
    #[arg(long, env = "FAUCET_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Amount per claim, e.g. 5.00000000
    #[arg(long)]
    amount: Option<String>,

    /// Days between two claims by the same identity
    #[arg(long)]
    cooldown_days: Option<u64>,

    /// Relay url, repeat for several relays
    #[arg(long = "relay")]
    relays: Vec<String>,

    /// Database path
    #[arg(long)]
    db_path: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = FaucetConfig::load(args.config.as_deref())?;
    config.apply_env()?;

    // Override with CLI arguments
    if let Some(addr) = args.server_addr {
        config.server_addr = addr;
    }

    if let Some(key) = args.private_key {
        config.private_key = key;
    }

    if let Some(amount) = args.amount {
        config.amount = amount;
    }

    if let Some(days) = args.cooldown_days {
        config.cooldown_days = days;
    }

    if !args.relays.is_empty() {
        config.relays = args.relays;
    }

    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }

    if args.debug {
        config.logging.level = "debug".to_string();
    }

    let _log_guard = init_logging(&config.logging)?;

    info!("Starting Nostrcoin Faucet v{}", env!("CARGO_PKG_VERSION"));
    config.validate()?;

    // A faucet that cannot sign must not serve
    let keys = match FaucetKeys::from_secret(&config.private_key) {
        Ok(keys) => Arc::new(keys),
        Err(e) => {
            error!("Invalid faucet key: {}", e);
            return Err(e).context("faucet signing key is missing or invalid");
        }
    };

    info!("Configuration:");
    info!("  Server address: {}", config.server_addr);
    info!("  Faucet npub: {}", keys.npub()?);
    info!("  Amount: {}", config.amount);
    info!("  Cooldown: {} day(s)", config.cooldown_days);
    info!("  Relays: {}", config.relays.join(", "));

    let ledger = Arc::new(ClaimLedger::open(&config.db_path)?);
    info!("Claim ledger holds {} identities", ledger.claimed_identities());

    let metrics = Arc::new(FaucetMetrics::new()?);
    let broadcaster = RelayBroadcaster::new(
        Arc::new(WebSocketTransport::new(config.relay_close_grace())),
        config.relay_targets(),
        config.relay_timeout(),
        metrics.clone(),
    );

    let service = Arc::new(ClaimService::new(
        ledger,
        PayoutIssuer::new(keys, config.amount()?),
        broadcaster,
        config.cooldown(),
        Arc::new(SystemClock),
        metrics,
    ));
    info!("Faucet service initialized");

    let app = api::router(service, &config);

    // Start server
    let addr: SocketAddr = config.server_addr.parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down gracefully");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
