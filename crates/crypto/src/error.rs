use thiserror::Error;

/// Errors raised while decoding keys or producing signed payout records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Identity token that is not a well-formed `npub`
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Secret key material that cannot be used for signing
    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Signature verification failed: {0}")]
    VerificationFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
