//! Dataguard command-line front end.
//!
//! Glue between the [`dataguard_crypto`] engines and the outside world:
//! key material arrives as hex (flag, file or environment variable), and
//! protected payloads leave as unpadded base64url so they survive URLs,
//! cookies and shell pipes.
//!
//! # Components
//!
//! - [`KeyOptions`]: where the key derivation key comes from
//! - [`Protector`]: an engine plus purpose, with optional expiration
//! - [`generate_key`]: fresh random key material, hex encoded

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::{fmt, fs, path::PathBuf, sync::Arc};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeDelta, Utc};
use dataguard_crypto::{
    AuthenticatedEncryptor, AuthenticatedEncryptorConfiguration, ConfigurationError, CryptoError,
    Secret, TimeLimitedProtector,
};
use thiserror::Error;
use zeroize::Zeroizing;

/// Environment variable consulted when no key flag is given.
pub const KEY_ENV_VAR: &str = "DATAGUARD_KEY";

/// Purpose used when the caller does not supply one.
pub const DEFAULT_PURPOSE: &str = "dataguard.cli";

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// No key flag, key file or environment variable was provided
    #[error("no key provided: pass --key-hex, --key-file or set DATAGUARD_KEY")]
    MissingKey,

    /// Key material was not valid hex
    #[error("key is not valid hex: {0}")]
    InvalidKeyHex(#[from] hex::FromHexError),

    /// Protected payload was not valid base64url
    #[error("payload is not valid base64url: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    /// Lifetime does not fit the supported time range
    #[error("lifetime of {seconds} seconds is out of range")]
    InvalidLifetime {
        /// Requested lifetime
        seconds: i64,
    },

    /// Engine construction failed
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Protect or unprotect failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Reading a key file or standard input failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where to load the key derivation key from.
///
/// Precedence: `key_hex`, then `key_file`. The CLI binds `key_hex` to
/// [`KEY_ENV_VAR`] as a fallback.
#[derive(Clone, Default)]
pub struct KeyOptions {
    /// Hex-encoded key
    pub key_hex: Option<Zeroizing<String>>,
    /// File containing a hex-encoded key
    pub key_file: Option<PathBuf>,
}

impl KeyOptions {
    /// Key given directly as hex.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self { key_hex: Some(Zeroizing::new(hex.into())), key_file: None }
    }

    /// Key read from a file holding hex.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self { key_hex: None, key_file: Some(path.into()) }
    }

    /// Decode the configured key into a [`Secret`].
    pub fn load(&self) -> Result<Secret, CliError> {
        let from_file;
        let encoded = match (&self.key_hex, &self.key_file) {
            (Some(hex), _) => hex.as_str(),
            (None, Some(path)) => {
                tracing::debug!(path = %path.display(), "reading key file");
                from_file = Zeroizing::new(fs::read_to_string(path)?);
                from_file.as_str()
            },
            (None, None) => return Err(CliError::MissingKey),
        };

        let bytes = Zeroizing::new(hex::decode(encoded.trim())?);
        Ok(Secret::new(&bytes))
    }
}

impl fmt::Debug for KeyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyOptions")
            .field("key_hex", &self.key_hex.as_ref().map(|_| "[REDACTED]"))
            .field("key_file", &self.key_file)
            .finish()
    }
}

/// Generate `len` random key bytes, hex encoded.
pub fn generate_key(len: usize) -> Zeroizing<String> {
    let secret = Secret::generate(len);
    Zeroizing::new(secret.with_plaintext(|bytes| hex::encode(bytes)))
}

/// Result of a successful unprotect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unprotected {
    /// Recovered plaintext
    pub plaintext: Vec<u8>,
    /// Embedded expiration, for time-limited payloads
    pub expiration: Option<DateTime<Utc>>,
}

/// An engine bound to a purpose string.
pub struct Protector {
    engine: Arc<dyn AuthenticatedEncryptor>,
    purpose: Vec<u8>,
}

impl Protector {
    /// Build and self-test the engine described by `config`.
    pub fn new(
        config: AuthenticatedEncryptorConfiguration,
        kdk: Secret,
        purpose: &str,
    ) -> Result<Self, CliError> {
        let engine = config.create_encryptor(kdk)?;
        Ok(Self { engine: Arc::from(engine), purpose: purpose.as_bytes().to_vec() })
    }

    /// Protect `plaintext`, optionally expiring after `expires_in` seconds.
    ///
    /// Returns unpadded base64url.
    pub fn protect(&self, plaintext: &[u8], expires_in: Option<i64>) -> Result<String, CliError> {
        let payload = match expires_in {
            Some(seconds) => {
                let lifetime =
                    TimeDelta::try_seconds(seconds).ok_or(CliError::InvalidLifetime { seconds })?;
                self.time_limited().protect_for(plaintext, lifetime)?
            },
            None => self.engine.encrypt(plaintext, &self.purpose)?,
        };
        Ok(URL_SAFE_NO_PAD.encode(payload))
    }

    /// Decode and unprotect a base64url payload.
    ///
    /// `time_limited` must match how the payload was protected.
    pub fn unprotect(&self, encoded: &str, time_limited: bool) -> Result<Unprotected, CliError> {
        let payload = URL_SAFE_NO_PAD.decode(encoded.trim())?;

        if time_limited {
            let (plaintext, expiration) = self.time_limited().unprotect(&payload)?;
            Ok(Unprotected { plaintext, expiration: Some(expiration) })
        } else {
            let plaintext = self.engine.decrypt(&payload, &self.purpose)?;
            Ok(Unprotected { plaintext, expiration: None })
        }
    }

    fn time_limited(&self) -> TimeLimitedProtector<Arc<dyn AuthenticatedEncryptor>> {
        TimeLimitedProtector::new(Arc::clone(&self.engine), &self.purpose)
    }
}
