//! Dataguard Authenticated Encryption
//!
//! Authenticated encryption core for protecting data at rest and in transit
//! between trusted parties: SP 800-108 key derivation, AES-CBC + HMAC and
//! AES-GCM engines, and a time-limited wrapper. Randomness and time come
//! from an [`Environment`], so tests get reproducible ciphertexts.
//!
//! # Key Lifecycle
//!
//! A long-lived key derivation key (KDK) never encrypts anything itself.
//! Every operation draws a fresh random key modifier and derives one-shot
//! subkeys bound to the caller's associated data and to the engine's
//! configuration.
//!
//! ```text
//! KDK (masked in memory)
//!        │
//!        ▼
//! SP 800-108 CTR HMAC-SHA512
//!   label   = associated data
//!   context = context header || key modifier
//!        │
//!        ▼
//! Subkeys (encryption key [|| MAC key])
//!        │
//!        ▼
//! AES-CBC + HMAC  or  AES-GCM → payload
//! ```
//!
//! Subkeys live in zero-on-drop buffers for the duration of one call.
//!
//! # Security
//!
//! Integrity:
//! - Every payload byte is authenticated before any plaintext is produced
//! - MACs are compared in constant time
//! - All decryption failures collapse into one opaque error
//!
//! Configuration binding:
//! - The context header fingerprints algorithm and key sizes
//! - It is mixed into every derivation, so payloads never cross engines
//!
//! Secret hygiene:
//! - The KDK is held XOR-masked and unmasked only per operation
//! - Derived keys and temporary plaintext are zeroed on every exit path

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithms;
pub mod cbc_hmac;
mod cipher;
pub mod configuration;
pub mod constant_time;
pub mod context_header;
pub mod encryptor;
pub mod env;
pub mod error;
pub mod gcm;
pub mod kdf;
pub mod secret;
pub mod time_limited;

pub use algorithms::{AesKeySize, CipherMode, EncryptionAlgorithm, ValidationAlgorithm};
pub use cbc_hmac::CbcHmacEncryptor;
pub use configuration::AuthenticatedEncryptorConfiguration;
pub use constant_time::buffers_are_equal;
pub use encryptor::{AuthenticatedEncryptor, KEY_MODIFIER_SIZE, MIN_KDK_BYTES, perform_self_test};
pub use env::{Environment, SystemEnv};
pub use error::{ConfigurationError, CryptoError};
pub use gcm::AesGcmEncryptor;
pub use kdf::{KdfError, derive_keys};
pub use secret::{DEFAULT_MASTER_KEY_BYTES, Secret, SecretBuffer};
pub use time_limited::{TimeLimitedProtector, from_utc_ticks, never, to_utc_ticks};
