//! Error types for the faucet service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nostrcoin_crypto::CryptoError;
use serde_json::json;
use thiserror::Error;

/// Faucet service errors
///
/// Display strings are what the caller sees, so they never carry storage paths or key
/// material. Underlying causes stay in the variant for logging via `{:?}`.
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error("{0}")]
    InvalidIdentity(String),

    #[error("Please wait {days_remaining} day(s) before claiming again")]
    CooldownActive { days_remaining: u64 },

    #[error("Database error")]
    StorageFailure(String),

    #[error("Signing configuration error")]
    SigningConfiguration(#[from] CryptoError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Internal error")]
    Internal(String),
}

impl FaucetError {
    /// Stable machine-readable kind reported alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            FaucetError::InvalidIdentity(_) => "INVALID_IDENTITY",
            FaucetError::CooldownActive { .. } => "COOLDOWN_ACTIVE",
            FaucetError::StorageFailure(_) => "STORAGE_FAILURE",
            FaucetError::SigningConfiguration(_) => "SIGNING_CONFIGURATION_FAILURE",
            FaucetError::Config(_) => "CONFIG_ERROR",
            FaucetError::Metrics(_) => "METRICS_ERROR",
            FaucetError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            FaucetError::InvalidIdentity(_) => StatusCode::BAD_REQUEST,
            FaucetError::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
            FaucetError::StorageFailure(_)
            | FaucetError::SigningConfiguration(_)
            | FaucetError::Config(_)
            | FaucetError::Metrics(_)
            | FaucetError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sled::Error> for FaucetError {
    fn from(err: sled::Error) -> Self {
        FaucetError::StorageFailure(err.to_string())
    }
}

impl From<nostrcoin_common::CommonError> for FaucetError {
    fn from(err: nostrcoin_common::CommonError) -> Self {
        match err {
            nostrcoin_common::CommonError::Config(msg) => FaucetError::Config(msg),
            other => FaucetError::Config(other.to_string()),
        }
    }
}

impl IntoResponse for FaucetError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "code": self.code(),
            "error": self.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));

        (self.status_code(), body).into_response()
    }
}

pub type FaucetResult<T> = Result<T, FaucetError>;
