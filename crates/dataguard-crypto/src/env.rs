//! Environment abstraction for randomness and wall-clock time.
//!
//! Encryptors never call the OS directly. Key modifiers, IVs and nonces come
//! from [`Environment::random_bytes`], and expiration checks read
//! [`Environment::utc_now`]. Production code uses [`SystemEnv`]; tests plug in
//! seeded generators and fixed clocks to get reproducible ciphertexts.

use chrono::{DateTime, Utc};

/// Source of randomness and time shared by every encryptor.
///
/// # Invariants
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Implementations are cheap to clone and safe to share across threads
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Current UTC wall-clock time.
    fn utc_now(&self) -> DateTime<Utc>;
}

/// Production environment: OS CSPRNG and the system clock.
///
/// Zero-sized, so every encryptor shares the same process-wide randomness
/// source.
///
/// # Panics
///
/// Panics if the OS RNG fails. Without functioning randomness every key
/// modifier and IV would be predictable, so there is nothing safe to fall
/// back to.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - cannot generate key material");
    }

    #[allow(clippy::disallowed_methods)]
    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic environment for unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    };

    use chrono::{DateTime, Utc};

    use super::Environment;

    /// Emits 0, 1, 2, ... across calls and a clock frozen at the Unix epoch.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct CountingEnv(Arc<AtomicU8>);

    impl Environment for CountingEnv {
        fn random_bytes(&self, buffer: &mut [u8]) {
            for byte in buffer {
                *byte = self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        fn utc_now(&self) -> DateTime<Utc> {
            DateTime::<Utc>::default()
        }
    }
}
