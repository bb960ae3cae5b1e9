//! Key handling and signed payout records for the nostrcoin faucet.
//!
//! - [`nip19`]: `npub`/`nsec` bech32 codec mapping identity tokens to canonical keys
//! - [`schnorr`]: the faucet keypair (BIP-340 over secp256k1)
//! - [`payout`]: construction, signing and verification of payout events

pub mod error;
pub mod nip19;
pub mod payout;
pub mod schnorr;

pub use error::{CryptoError, CryptoResult};
pub use payout::{SignedPayout, UnsignedPayout, PAYOUT_CONTENT, PAYOUT_KIND, PROTOCOL_TAG};
pub use schnorr::FaucetKeys;
