//! Error types for authenticated encryption.
//!
//! Callers only ever see [`CryptoError`]. Everything that can go wrong while
//! decrypting (short payloads, MAC mismatches, padding faults) collapses into
//! [`CryptoError::CryptographicFailure`] so the error value cannot be used as a
//! decryption oracle. The precise cause lives in [`OperationError`], which
//! never leaves the crate.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::kdf::KdfError;

/// Errors surfaced by encryptors and protectors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A protect or unprotect operation failed.
    ///
    /// Malformed payloads, integrity failures and cipher faults are
    /// deliberately indistinguishable.
    #[error("an error occurred during a cryptographic operation")]
    CryptographicFailure,

    /// The payload authenticated correctly but its embedded expiration has
    /// passed.
    #[error("the payload expired at {expiration}")]
    Expired {
        /// Expiration carried inside the payload
        expiration: DateTime<Utc>,
    },

    /// The encryptor could not be constructed.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl CryptoError {
    /// Returns true if the payload was valid but expired.
    ///
    /// Expiry is the only decryption failure a caller can act on (re-issue the
    /// payload); every other failure means the input is unusable.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired { .. })
    }
}

/// Construction-time failures. Raised once when an encryptor is built, never
/// per operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Key derivation key is shorter than the supported minimum
    #[error("key derivation key must be at least {minimum} bytes, got {actual}")]
    KeyTooShort {
        /// Minimum accepted length in bytes
        minimum: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Encryption algorithm name was not recognised
    #[error("unknown encryption algorithm: {0}")]
    UnknownEncryptionAlgorithm(String),

    /// Validation algorithm name was not recognised
    #[error("unknown validation algorithm: {0}")]
    UnknownValidationAlgorithm(String),

    /// The context header for the algorithm could not be computed
    #[error("failed to compute context header for {algorithm}")]
    ContextHeader {
        /// Algorithm whose header failed
        algorithm: &'static str,
    },

    /// A freshly built encryptor failed its encrypt/decrypt round trip
    #[error("encryptor self-test failed for {algorithm}")]
    SelfTestFailed {
        /// Algorithm under test
        algorithm: &'static str,
    },
}

/// Precise failure cause inside a single operation.
///
/// Converted to [`CryptoError::CryptographicFailure`] at the encryptor
/// boundary. The cause is recorded at trace level only.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperationError {
    /// Payload is shorter than the mandatory header and trailer
    #[error("payload invalid")]
    PayloadInvalid,

    /// MAC or tag did not verify
    #[error("integrity check failed")]
    IntegrityFailure,

    /// Block cipher, padding or AEAD primitive rejected its input
    #[error("cipher failure")]
    Cipher,

    /// Subkey derivation failed
    #[error("key derivation failed: {0}")]
    KeyDerivation(#[from] KdfError),

    /// Size arithmetic overflowed
    #[error("size overflow")]
    Overflow,
}

impl From<OperationError> for CryptoError {
    fn from(err: OperationError) -> Self {
        tracing::trace!(cause = %err, "cryptographic operation failed");
        Self::CryptographicFailure
    }
}
