//! Algorithm selection and engine construction.

use crate::{
    algorithms::{CipherMode, EncryptionAlgorithm, ValidationAlgorithm},
    cbc_hmac::CbcHmacEncryptor,
    encryptor::{AuthenticatedEncryptor, perform_self_test},
    env::{Environment, SystemEnv},
    error::ConfigurationError,
    gcm::AesGcmEncryptor,
    secret::Secret,
};

/// Which engine to build and with which primitives.
///
/// `validation` only applies to CBC; GCM carries its own tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthenticatedEncryptorConfiguration {
    /// Symmetric algorithm and mode
    pub encryption: EncryptionAlgorithm,
    /// MAC for CBC payloads
    pub validation: ValidationAlgorithm,
}

impl AuthenticatedEncryptorConfiguration {
    /// Configuration for the given algorithms.
    pub const fn new(encryption: EncryptionAlgorithm, validation: ValidationAlgorithm) -> Self {
        Self { encryption, validation }
    }

    /// Human-readable description, e.g. `AES_256_CBC/HMACSHA256`.
    pub fn describe(self) -> String {
        match self.encryption.mode() {
            CipherMode::Cbc => format!("{}/{}", self.encryption, self.validation),
            CipherMode::Gcm => self.encryption.to_string(),
        }
    }

    /// Build and self-test an engine keyed by `kdk`.
    pub fn create_encryptor(
        self,
        kdk: Secret,
    ) -> Result<Box<dyn AuthenticatedEncryptor>, ConfigurationError> {
        self.create_encryptor_with_env(kdk, SystemEnv)
    }

    /// Build and self-test an engine drawing randomness from `env`.
    ///
    /// # Errors
    ///
    /// - `KeyTooShort` if `kdk` is under 128 bits
    /// - `SelfTestFailed` if the engine cannot round-trip data
    pub fn create_encryptor_with_env<E: Environment>(
        self,
        kdk: Secret,
        env: E,
    ) -> Result<Box<dyn AuthenticatedEncryptor>, ConfigurationError> {
        let key_size = self.encryption.key_size();
        let encryptor: Box<dyn AuthenticatedEncryptor> = match self.encryption.mode() {
            CipherMode::Cbc => Box::new(CbcHmacEncryptor::with_env(
                kdk,
                key_size,
                self.validation,
                env.clone(),
            )?),
            CipherMode::Gcm => Box::new(AesGcmEncryptor::with_env(kdk, key_size, env.clone())?),
        };

        perform_self_test(encryptor.as_ref(), &env)?;

        tracing::info!(algorithm = %self.describe(), "authenticated encryptor ready");
        Ok(encryptor)
    }
}
