//! Payloads that stop decrypting after an expiration instant.
//!
//! The expiration travels inside the encrypted payload as an 8-byte
//! big-endian tick count (100 ns units since 0001-01-01T00:00:00Z) in front
//! of the plaintext. It is only read after the inner engine has
//! authenticated the payload, so it cannot be altered or probed.

use chrono::{DateTime, TimeDelta, Utc};
use zeroize::Zeroizing;

use crate::{
    encryptor::AuthenticatedEncryptor,
    env::{Environment, SystemEnv},
    error::{CryptoError, OperationError},
};

/// Ticks between 0001-01-01 and the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Largest representable instant, 9999-12-31T23:59:59.9999999Z.
pub const MAX_TICKS: u64 = 3_155_378_975_999_999_999;

const TICKS_PER_SECOND: i128 = 10_000_000;
const NANOS_PER_TICK: i128 = 100;

/// Size of the expiration envelope.
pub const EXPIRATION_SIZE: usize = 8;

/// Purpose prefix separating time-limited payloads from plain ones.
const PURPOSE_PREFIX: &[u8] = b"dataguard.TimeLimitedProtector.v1";

/// Convert an instant to ticks, clamped to `0..=MAX_TICKS`.
///
/// Sub-tick precision (below 100 ns) is truncated.
pub fn to_utc_ticks(instant: DateTime<Utc>) -> u64 {
    let ticks = i128::from(instant.timestamp()) * TICKS_PER_SECOND
        + i128::from(instant.timestamp_subsec_nanos()) / NANOS_PER_TICK
        + i128::from(UNIX_EPOCH_TICKS);
    let clamped = ticks.clamp(0, i128::from(MAX_TICKS));
    u64::try_from(clamped).unwrap_or(MAX_TICKS)
}

/// Convert ticks back to an instant. `None` above [`MAX_TICKS`].
pub fn from_utc_ticks(ticks: u64) -> Option<DateTime<Utc>> {
    if ticks > MAX_TICKS {
        return None;
    }
    let since_epoch = i128::from(ticks) - i128::from(UNIX_EPOCH_TICKS);
    let secs = i64::try_from(since_epoch.div_euclid(TICKS_PER_SECOND)).ok()?;
    let nanos = u32::try_from(since_epoch.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK).ok()?;
    DateTime::from_timestamp(secs, nanos)
}

/// The "never expires" instant, 9999-12-31T23:59:59.9999999Z.
pub fn never() -> DateTime<Utc> {
    let Some(instant) = from_utc_ticks(MAX_TICKS) else {
        unreachable!("MAX_TICKS is within chrono's supported range");
    };
    instant
}

/// Wraps an engine so each payload carries its own expiration.
///
/// Payloads are bound to `purpose` and to this wrapper, so they do not
/// decrypt through the bare inner engine and vice versa.
#[derive(Debug)]
pub struct TimeLimitedProtector<A, E: Environment = SystemEnv> {
    inner: A,
    aad: Vec<u8>,
    env: E,
}

impl<A: AuthenticatedEncryptor> TimeLimitedProtector<A, SystemEnv> {
    /// Wrap `inner`, reading time from the system clock.
    pub fn new(inner: A, purpose: &[u8]) -> Self {
        Self::with_env(inner, purpose, SystemEnv)
    }
}

impl<A: AuthenticatedEncryptor, E: Environment> TimeLimitedProtector<A, E> {
    /// Wrap `inner`, reading time from `env`.
    pub fn with_env(inner: A, purpose: &[u8], env: E) -> Self {
        let mut aad = Vec::with_capacity(8 + PURPOSE_PREFIX.len() + purpose.len());
        for part in [PURPOSE_PREFIX, purpose] {
            // Purposes are caller-chosen labels, far below 4 GiB.
            let len = u32::try_from(part.len()).unwrap_or(u32::MAX);
            aad.extend_from_slice(&len.to_be_bytes());
            aad.extend_from_slice(part);
        }
        Self { inner, aad, env }
    }

    /// The wrapped engine.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Protect with no expiration.
    pub fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.protect_until(plaintext, never())
    }

    /// Protect for `lifetime` from now. Overflowing lifetimes never expire.
    pub fn protect_for(
        &self,
        plaintext: &[u8],
        lifetime: TimeDelta,
    ) -> Result<Vec<u8>, CryptoError> {
        let expiration = self.env.utc_now().checked_add_signed(lifetime).unwrap_or_else(never);
        self.protect_until(plaintext, expiration)
    }

    /// Protect until `expiration`.
    pub fn protect_until(
        &self,
        plaintext: &[u8],
        expiration: DateTime<Utc>,
    ) -> Result<Vec<u8>, CryptoError> {
        let mut envelope = Zeroizing::new(Vec::with_capacity(EXPIRATION_SIZE + plaintext.len()));
        envelope.extend_from_slice(&to_utc_ticks(expiration).to_be_bytes());
        envelope.extend_from_slice(plaintext);

        self.inner.encrypt(&envelope, &self.aad)
    }

    /// Authenticate, decrypt and check expiration.
    ///
    /// Returns the plaintext and its expiration.
    ///
    /// # Errors
    ///
    /// - `Expired` if the payload is authentic but its expiration has passed
    /// - `CryptographicFailure` for anything else
    pub fn unprotect(&self, payload: &[u8]) -> Result<(Vec<u8>, DateTime<Utc>), CryptoError> {
        let envelope = Zeroizing::new(self.inner.decrypt(payload, &self.aad)?);

        let Some((ticks, plaintext)) = envelope.split_first_chunk::<EXPIRATION_SIZE>() else {
            return Err(OperationError::PayloadInvalid.into());
        };
        let expiration =
            from_utc_ticks(u64::from_be_bytes(*ticks)).ok_or(OperationError::PayloadInvalid)?;

        if self.env.utc_now() > expiration {
            tracing::debug!(%expiration, "rejected expired payload");
            return Err(CryptoError::Expired { expiration });
        }

        Ok((plaintext.to_vec(), expiration))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn unix_epoch_ticks() {
        let epoch = DateTime::<Utc>::default();
        assert_eq!(to_utc_ticks(epoch), 621_355_968_000_000_000);
        assert_eq!(from_utc_ticks(621_355_968_000_000_000), Some(epoch));
    }

    #[test]
    fn never_is_end_of_year_9999() {
        let end = never();
        assert_eq!((end.year(), end.month(), end.day()), (9999, 12, 31));
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
        assert_eq!(end.timestamp_subsec_nanos(), 999_999_900);
        assert_eq!(to_utc_ticks(end), MAX_TICKS);
    }

    #[test]
    fn ticks_truncate_below_100ns() {
        let instant = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let back = from_utc_ticks(to_utc_ticks(instant)).unwrap();
        assert_eq!(back.timestamp(), 1_700_000_000);
        assert_eq!(back.timestamp_subsec_nanos(), 123_456_700);
    }

    #[test]
    fn first_tick_is_year_one() {
        let start = from_utc_ticks(0).unwrap();
        assert_eq!((start.year(), start.month(), start.day()), (1, 1, 1));
    }

    #[test]
    fn out_of_range_instants_are_clamped() {
        assert_eq!(to_utc_ticks(DateTime::<Utc>::MAX_UTC), MAX_TICKS);
        assert_eq!(to_utc_ticks(DateTime::<Utc>::MIN_UTC), 0);
    }

    #[test]
    fn ticks_past_max_are_invalid() {
        assert_eq!(from_utc_ticks(MAX_TICKS + 1), None);
        assert_eq!(from_utc_ticks(u64::MAX), None);
    }
}
