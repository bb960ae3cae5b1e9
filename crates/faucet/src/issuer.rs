use crate::error::{FaucetError, FaucetResult};
use nostrcoin_common::types::{Amount, PublicKey};
use nostrcoin_crypto::{FaucetKeys, SignedPayout, UnsignedPayout};
use std::sync::Arc;

/// Builds and signs payout records with the faucet key.
///
/// Holds no state besides the immutable key and per-claim amount.
#[derive(Debug, Clone)]
pub struct PayoutIssuer {
    keys: Arc<FaucetKeys>,
    amount: Amount,
}

impl PayoutIssuer {
    pub fn new(keys: Arc<FaucetKeys>, amount: Amount) -> Self {
        Self { keys, amount }
    }

    pub fn issuer(&self) -> PublicKey {
        self.keys.public_key()
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Sign a payout of the configured amount to `recipient`, dated `issued_at` (unix seconds).
    pub fn issue(&self, recipient: PublicKey, issued_at: u64) -> FaucetResult<SignedPayout> {
        UnsignedPayout::new(self.keys.public_key(), recipient, self.amount, issued_at)
            .sign(&self.keys)
            .map_err(FaucetError::SigningConfiguration)
    }
}
