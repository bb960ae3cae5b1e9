//! Claim ledger: last successful claim per identity.
//!
//! Eligibility is checked with [`ClaimLedger::try_reserve`] and recorded later with
//! [`ClaimLedger::commit`]. Nothing is written at reservation time, so a crash between
//! the two leaves the identity eligible again rather than locked out.
//!
//! The check and the write are not one transaction. Two concurrent requests for the
//! same identity can both pass `try_reserve` before either commits.

use crate::error::{FaucetError, FaucetResult};
use nostrcoin_common::types::PublicKey;
use sled::{Db, IVec, Tree};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Granularity of the remaining-cooldown figure reported to claimants.
pub const COOLDOWN_UNIT: Duration = Duration::from_secs(86_400);

/// Proof that an identity passed the cooldown check. Redeemed by [`ClaimLedger::commit`].
#[derive(Debug)]
#[must_use = "a reservation records nothing until committed"]
pub struct Reservation {
    identity: PublicKey,
}

impl Reservation {
    pub fn identity(&self) -> &PublicKey {
        &self.identity
    }
}

pub struct ClaimLedger {
    db: Db,
    /// identity hex -> last claim, big-endian i64 milliseconds since epoch
    claims: Tree,
    /// Number of keys in `claims`, counted once at open and bumped on first commit
    identities: AtomicUsize,
    #[cfg(test)]
    fail_commits: std::sync::atomic::AtomicBool,
}

impl ClaimLedger {
    /// Create or open the ledger at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> FaucetResult<Self> {
        info!("Opening claim ledger at: {}", path.as_ref().display());

        let db = sled::Config::default()
            .path(path)
            .cache_capacity(64 * 1024 * 1024)
            .open()?;
        let claims = db.open_tree("claims")?;
        let identities = AtomicUsize::new(claims.len());

        Ok(Self {
            db,
            claims,
            identities,
            #[cfg(test)]
            fail_commits: std::sync::atomic::AtomicBool::new(false),
        })
    }

    /// Check whether `identity` may claim at `now_ms`.
    pub async fn try_reserve(
        &self,
        identity: PublicKey,
        now_ms: i64,
        cooldown: Duration,
    ) -> FaucetResult<Reservation> {
        if let Some(last_claim) = self.last_claim(&identity).await? {
            let cooldown_ms = i64::try_from(cooldown.as_millis()).unwrap_or(i64::MAX);
            let elapsed = now_ms.saturating_sub(last_claim);

            if elapsed < cooldown_ms {
                let days_remaining = units_remaining(cooldown_ms - elapsed);
                debug!(identity = %identity, days_remaining, "Claim rejected, cooldown active");
                return Err(FaucetError::CooldownActive { days_remaining });
            }
        }

        Ok(Reservation { identity })
    }

    /// Record `now_ms` as the identity's last claim, overwriting any earlier value.
    pub async fn commit(&self, reservation: Reservation, now_ms: i64) -> FaucetResult<()> {
        #[cfg(test)]
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(FaucetError::StorageFailure("commit disabled".to_string()));
        }

        let tree = self.claims.clone();
        let key = reservation.identity.to_hex();

        let previous = tokio::task::spawn_blocking(move || {
            tree.insert(key.as_bytes(), IVec::from(now_ms.to_be_bytes().as_slice()))
        })
        .await
        .map_err(|e| FaucetError::Internal(format!("ledger task failed: {}", e)))??;

        if previous.is_none() {
            self.identities.fetch_add(1, Ordering::Relaxed);
        }

        self.db.flush_async().await?;
        debug!(identity = %reservation.identity, now_ms, "Claim committed");
        Ok(())
    }

    /// Last recorded claim for `identity`, in milliseconds since epoch.
    pub async fn last_claim(&self, identity: &PublicKey) -> FaucetResult<Option<i64>> {
        let tree = self.claims.clone();
        let key = identity.to_hex();

        let stored = tokio::task::spawn_blocking(move || tree.get(key.as_bytes()))
            .await
            .map_err(|e| FaucetError::Internal(format!("ledger task failed: {}", e)))??;

        match stored {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    FaucetError::StorageFailure(format!("invalid timestamp for {}", identity))
                })?;
                Ok(Some(i64::from_be_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    /// Number of identities that have claimed at least once.
    pub fn claimed_identities(&self) -> usize {
        self.identities.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, identity: &PublicKey, value: &[u8]) -> FaucetResult<()> {
        if self.claims.insert(identity.to_hex().as_bytes(), value)?.is_none() {
            self.identities.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }
}

/// Whole cooldown units still to wait, rounded up.
fn units_remaining(remaining_ms: i64) -> u64 {
    if remaining_ms <= 0 {
        return 0;
    }
    let unit_ms = COOLDOWN_UNIT.as_millis() as i64;
    let whole = remaining_ms / unit_ms;
    (if remaining_ms % unit_ms == 0 { whole } else { whole + 1 }) as u64
}
