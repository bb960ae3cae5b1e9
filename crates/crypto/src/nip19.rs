//! NIP-19 bech32 entities.
//!
//! Only the two bare-key entities are supported: `npub` (public identity handed in by
//! claimants) and `nsec` (the faucet's own secret key). Decoding is total-or-reject: a
//! token either yields a full 32-byte key or an error, never a partial value.

use crate::error::{CryptoError, CryptoResult};
use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use nostrcoin_common::types::{PublicKey, PUBLIC_KEY_LENGTH};

pub const NPUB_HRP: &str = "npub";
pub const NSEC_HRP: &str = "nsec";

/// Decode an `npub1…` token into the canonical identity key.
pub fn decode_npub(token: &str) -> CryptoResult<PublicKey> {
    let bytes = decode_entity(token, NPUB_HRP).map_err(CryptoError::InvalidIdentity)?;
    PublicKey::from_slice(&bytes)
        .ok_or_else(|| CryptoError::InvalidIdentity(format!("expected {} bytes", PUBLIC_KEY_LENGTH)))
}

/// Encode a public key as an `npub1…` token.
pub fn encode_npub(key: &PublicKey) -> CryptoResult<String> {
    bech32::encode::<Bech32>(Hrp::parse_unchecked(NPUB_HRP), key.as_bytes())
        .map_err(|e| CryptoError::Serialization(e.to_string()))
}

/// Decode an `nsec1…` token into raw secret key bytes.
pub fn decode_nsec(token: &str) -> CryptoResult<[u8; 32]> {
    // Never echo the token back, it is secret material.
    let bytes = decode_entity(token, NSEC_HRP)
        .map_err(|_| CryptoError::InvalidSecretKey("malformed nsec".to_string()))?;
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidSecretKey("expected 32 bytes".to_string()))
}

fn decode_entity(token: &str, hrp: &str) -> Result<Vec<u8>, String> {
    if token.is_empty() {
        return Err("empty token".to_string());
    }
    if !token.starts_with(hrp) || token.as_bytes().get(hrp.len()) != Some(&b'1') {
        return Err(format!("expected {}1 prefix", hrp));
    }

    // NIP-19 entities carry a bech32 checksum; bech32m is rejected
    let checked = CheckedHrpstring::new::<Bech32>(token).map_err(|e| e.to_string())?;
    if checked.hrp().to_lowercase() != hrp {
        return Err(format!("expected {}1 prefix", hrp));
    }
    Ok(checked.byte_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bech32::Bech32m;

    fn sample_key() -> PublicKey {
        let mut bytes = [0u8; PUBLIC_KEY_LENGTH];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8 * 7 + 3;
        }
        PublicKey(bytes)
    }

    #[test]
    fn test_npub_encodes_and_decodes_to_same_key() {
        let key = sample_key();
        let npub = encode_npub(&key).unwrap();
        assert!(npub.starts_with("npub1"));
        assert_eq!(decode_npub(&npub).unwrap(), key);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let npub = encode_npub(&sample_key()).unwrap();
        let first = decode_npub(&npub).unwrap();
        for _ in 0..5 {
            assert_eq!(decode_npub(&npub).unwrap(), first);
        }
    }

    #[test]
    fn test_rejects_empty_token() {
        assert!(matches!(decode_npub(""), Err(CryptoError::InvalidIdentity(_))));
    }

    #[test]
    fn test_rejects_wrong_prefix() {
        let key = sample_key();
        let note = bech32::encode::<Bech32>(Hrp::parse_unchecked("note"), key.as_bytes()).unwrap();
        assert!(matches!(decode_npub(&note), Err(CryptoError::InvalidIdentity(_))));

        let nsec = bech32::encode::<Bech32>(Hrp::parse_unchecked(NSEC_HRP), key.as_bytes()).unwrap();
        assert!(matches!(decode_npub(&nsec), Err(CryptoError::InvalidIdentity(_))));

        assert!(matches!(decode_npub(&key.to_hex()), Err(CryptoError::InvalidIdentity(_))));
    }

    #[test]
    fn test_rejects_bad_checksum() {
        let npub = encode_npub(&sample_key()).unwrap();
        let mut chars: Vec<char> = npub.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'q' { 'p' } else { 'q' };
        let corrupted: String = chars.into_iter().collect();

        assert!(matches!(decode_npub(&corrupted), Err(CryptoError::InvalidIdentity(_))));
    }

    #[test]
    fn test_rejects_bech32m_checksum() {
        let key = sample_key();
        let npub_m = bech32::encode::<Bech32m>(Hrp::parse_unchecked(NPUB_HRP), key.as_bytes()).unwrap();
        assert!(npub_m.starts_with("npub1"));
        assert!(matches!(decode_npub(&npub_m), Err(CryptoError::InvalidIdentity(_))));

        let nsec_m = bech32::encode::<Bech32m>(Hrp::parse_unchecked(NSEC_HRP), &[0x11u8; 32]).unwrap();
        assert!(matches!(decode_nsec(&nsec_m), Err(CryptoError::InvalidSecretKey(_))));
    }

    #[test]
    fn test_rejects_wrong_length_payload() {
        let short = bech32::encode::<Bech32>(Hrp::parse_unchecked(NPUB_HRP), &[1u8; 20]).unwrap();
        assert!(matches!(decode_npub(&short), Err(CryptoError::InvalidIdentity(_))));
    }

    #[test]
    fn test_nsec_decodes_secret_bytes() {
        let secret = [0x11u8; 32];
        let nsec = bech32::encode::<Bech32>(Hrp::parse_unchecked(NSEC_HRP), &secret).unwrap();
        assert_eq!(decode_nsec(&nsec).unwrap(), secret);
    }

    #[test]
    fn test_nsec_error_does_not_echo_input() {
        let err = decode_nsec("nsec1notavalidkey").unwrap_err();
        assert!(!err.to_string().contains("notavalidkey"));
    }
}
