use crate::error::CommonError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const EVENT_ID_LENGTH: usize = 32;
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Number of fractional digits carried by every payout amount.
pub const AMOUNT_SCALE: u32 = 8;
const AMOUNT_FACTOR: u64 = 10u64.pow(AMOUNT_SCALE);

// --- NewTypes ---

/// x-only secp256k1 public key, the canonical identity of a claimant or issuer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().ok()?;
        Some(PublicKey(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        PublicKey::from_slice(&bytes).ok_or_else(|| serde::de::Error::custom("Invalid public key length"))
    }
}

/// Content address of a signed event: sha256 over its canonical serialization.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventId(pub [u8; EVENT_ID_LENGTH]);

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", hex::encode(self.0))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for EventId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        let arr: [u8; EVENT_ID_LENGTH] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("Invalid event id length"))?;
        Ok(EventId(arr))
    }
}

/// Fixed-point token amount with [`AMOUNT_SCALE`] fractional digits.
///
/// Stored as an integer count of the smallest unit so that formatting is exact:
/// `"5.00000000"` parses to `500_000_000` base units and prints back unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Amount(u64);

impl Amount {
    pub const fn from_base_units(units: u64) -> Self {
        Amount(units)
    }

    pub fn base_units(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / AMOUNT_FACTOR,
            self.0 % AMOUNT_FACTOR,
            width = AMOUNT_SCALE as usize
        )
    }
}

impl FromStr for Amount {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CommonError::InvalidAmount(s.to_string());

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > AMOUNT_SCALE as usize || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if s.contains('.') && frac.is_empty() {
            return Err(invalid());
        }

        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let mut frac_units: u64 = if frac.is_empty() { 0 } else { frac.parse().map_err(|_| invalid())? };
        frac_units *= 10u64.pow(AMOUNT_SCALE - frac.len() as u32);

        whole
            .checked_mul(AMOUNT_FACTOR)
            .and_then(|w| w.checked_add(frac_units))
            .map(Amount)
            .ok_or_else(invalid)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
