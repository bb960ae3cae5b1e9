//! Payout records announced to relays.
//!
//! A payout is a Nostr event of kind [`PAYOUT_KIND`]. Its id is the sha256 of the
//! canonical serialization `[0, pubkey, created_at, kind, tags, content]`, which binds
//! issuer, recipient, amount, issue time and protocol tag. The signature covers the id.

use crate::error::{CryptoError, CryptoResult};
use crate::schnorr::{verify_digest, FaucetKeys};
use nostrcoin_common::types::{Amount, EventId, PublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const PAYOUT_KIND: u16 = 30334;
pub const PROTOCOL_TAG: &str = "nostrcoin";
pub const PAYOUT_CONTENT: &str = "Faucet payout";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedPayout {
    pubkey: PublicKey,
    created_at: u64,
    kind: u16,
    tags: Vec<Vec<String>>,
    content: String,
}

impl UnsignedPayout {
    pub fn new(issuer: PublicKey, recipient: PublicKey, amount: Amount, issued_at: u64) -> Self {
        Self {
            pubkey: issuer,
            created_at: issued_at,
            kind: PAYOUT_KIND,
            tags: vec![
                vec!["protocol".to_string(), PROTOCOL_TAG.to_string()],
                vec!["p".to_string(), recipient.to_hex()],
                vec!["amount".to_string(), amount.to_string()],
            ],
            content: PAYOUT_CONTENT.to_string(),
        }
    }

    pub fn id(&self) -> CryptoResult<EventId> {
        event_id(&self.pubkey, self.created_at, self.kind, &self.tags, &self.content)
    }

    /// Sign with the faucet key, consuming the draft.
    pub fn sign(self, keys: &FaucetKeys) -> CryptoResult<SignedPayout> {
        if keys.public_key() != self.pubkey {
            return Err(CryptoError::Signing("issuer key does not match signer".to_string()));
        }

        let id = self.id()?;
        let sig = keys.sign_digest(&id.0)?;

        Ok(SignedPayout {
            id,
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig: hex::encode(sig),
        })
    }
}

/// A signed payout event, serialized exactly as relays expect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayout {
    id: EventId,
    pubkey: PublicKey,
    created_at: u64,
    kind: u16,
    tags: Vec<Vec<String>>,
    content: String,
    sig: String,
}

impl SignedPayout {
    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn issuer(&self) -> PublicKey {
        self.pubkey
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn kind(&self) -> u16 {
        self.kind
    }

    pub fn tags(&self) -> &[Vec<String>] {
        &self.tags
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn signature(&self) -> &str {
        &self.sig
    }

    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.first().map(String::as_str) == Some(name))
            .and_then(|tag| tag.get(1))
            .map(String::as_str)
    }

    /// Recompute the id and check the signature.
    pub fn verify(&self) -> CryptoResult<()> {
        let expected = event_id(&self.pubkey, self.created_at, self.kind, &self.tags, &self.content)?;
        if expected != self.id {
            return Err(CryptoError::VerificationFailed("id does not match content".to_string()));
        }

        let sig = hex::decode(&self.sig)
            .map_err(|_| CryptoError::VerificationFailed("signature is not hex".to_string()))?;
        verify_digest(&self.pubkey, &self.id.0, &sig)
    }

    /// NIP-01 publish frame: `["EVENT", <event>]`.
    pub fn to_publish_frame(&self) -> CryptoResult<String> {
        serde_json::to_string(&("EVENT", self)).map_err(|e| CryptoError::Serialization(e.to_string()))
    }
}

fn event_id(
    pubkey: &PublicKey,
    created_at: u64,
    kind: u16,
    tags: &[Vec<String>],
    content: &str,
) -> CryptoResult<EventId> {
    let canonical = serde_json::to_vec(&(0u8, pubkey.to_hex(), created_at, kind, tags, content))
        .map_err(|e| CryptoError::Serialization(e.to_string()))?;

    let digest = Sha256::digest(&canonical);
    let mut id = EventId::default();
    id.0.copy_from_slice(&digest);
    Ok(id)
}
