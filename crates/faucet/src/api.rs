//! HTTP API for faucet service

use super::config::FaucetConfig;
use super::error::{FaucetError, FaucetResult};
use super::service::{ClaimService, FaucetStatus, PayoutReceipt};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Claim request body: `{"npub": "npub1..."}`
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    #[serde(default)]
    pub npub: Option<serde_json::Value>,
}

/// Successful claim response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub success: bool,
    pub event_id: String,
    pub amount: String,
}

impl From<PayoutReceipt> for ClaimResponse {
    fn from(receipt: PayoutReceipt) -> Self {
        Self {
            success: true,
            event_id: receipt.event_id.to_string(),
            amount: receipt.amount.to_string(),
        }
    }
}

/// Build the faucet router
pub fn router(service: Arc<ClaimService>, config: &FaucetConfig) -> Router {
    let mut app = Router::new()
        .route("/faucet", post(claim_handler))
        .route("/health", get(health_handler))
        .route("/api/status", get(status_handler));

    if config.metrics_enabled {
        app = app.route("/metrics", get(metrics_handler));
    }

    let mut app = app.with_state(service);

    if let Some(dir) = &config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
        info!("Serving static files from {}", dir);
    }

    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app.layer(TraceLayer::new_for_http())
}

/// Claim handler
///
/// The claim runs on its own task so a client hanging up does not cut a broadcast or
/// commit short.
pub async fn claim_handler(
    State(service): State<Arc<ClaimService>>,
    body: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Json<ClaimResponse>, FaucetError> {
    let token = match body {
        Ok(Json(ClaimRequest {
            npub: Some(serde_json::Value::String(npub)),
        })) if !npub.is_empty() => npub,
        _ => return Err(FaucetError::InvalidIdentity("Missing npub".to_string())),
    };

    let claim = tokio::spawn(async move { service.request_payout(&token).await });

    match claim.await {
        Ok(Ok(receipt)) => Ok(Json(receipt.into())),
        Ok(Err(e)) => Err(e),
        Err(e) => {
            error!("Claim task failed: {}", e);
            Err(FaucetError::Internal(e.to_string()))
        }
    }
}

/// Status handler
pub async fn status_handler(
    State(service): State<Arc<ClaimService>>,
) -> FaucetResult<Json<FaucetStatus>> {
    Ok(Json(service.status()?))
}

/// Prometheus metrics
pub async fn metrics_handler(State(service): State<Arc<ClaimService>>) -> impl IntoResponse {
    match service.metrics().gather() {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
