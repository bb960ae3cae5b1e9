use crate::error::{CryptoError, CryptoResult};
use crate::nip19;
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::schnorr::{Signature, SigningKey, VerifyingKey};
use nostrcoin_common::types::PublicKey;
use std::fmt;

pub const SIGNATURE_LENGTH: usize = 64;

/// The faucet's signing identity.
///
/// Built once at startup from configured key material and shared read-only for the
/// lifetime of the process.
pub struct FaucetKeys {
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl FaucetKeys {
    /// Accepts either an `nsec1…` token or 64 hex characters (optionally `0x` prefixed).
    pub fn from_secret(secret: &str) -> CryptoResult<Self> {
        let secret = secret.trim();
        if secret.starts_with("nsec1") {
            return Self::from_bytes(&nip19::decode_nsec(secret)?);
        }

        let hex_str = secret.strip_prefix("0x").unwrap_or(secret);
        let bytes = hex::decode(hex_str)
            .map_err(|_| CryptoError::InvalidSecretKey("expected nsec or hex secret key".to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let signing_key = SigningKey::from_bytes(bytes)
            .map_err(|_| CryptoError::InvalidSecretKey("not a valid secp256k1 scalar".to_string()))?;
        let public_key = PublicKey::from_slice(&signing_key.verifying_key().to_bytes())
            .ok_or_else(|| CryptoError::InvalidSecretKey("unexpected public key length".to_string()))?;

        Ok(Self {
            signing_key,
            public_key,
        })
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn npub(&self) -> CryptoResult<String> {
        nip19::encode_npub(&self.public_key)
    }

    /// BIP-340 signature over a 32-byte digest, with zeroed auxiliary randomness so
    /// that the same digest always yields the same signature.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> CryptoResult<[u8; SIGNATURE_LENGTH]> {
        let signature: Signature = self
            .signing_key
            .sign_prehash(digest)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        Ok(signature.to_bytes())
    }
}

impl fmt::Debug for FaucetKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaucetKeys")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Check a BIP-340 signature over a 32-byte digest against an x-only public key.
pub fn verify_digest(public_key: &PublicKey, digest: &[u8; 32], signature: &[u8]) -> CryptoResult<()> {
    let verifying_key = VerifyingKey::from_bytes(public_key.as_bytes())
        .map_err(|_| CryptoError::VerificationFailed("invalid public key".to_string()))?;
    let signature = Signature::try_from(signature)
        .map_err(|_| CryptoError::VerificationFailed("malformed signature".to_string()))?;

    verifying_key
        .verify_prehash(digest, &signature)
        .map_err(|_| CryptoError::VerificationFailed("signature mismatch".to_string()))
}
