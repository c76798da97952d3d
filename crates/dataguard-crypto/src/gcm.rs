//! AES-GCM authenticated encryption.
//!
//! ```text
//! +---------------+----------+------------------+----------+
//! | key modifier  | nonce    | AES-GCM(pt)      | tag      |
//! | 16 bytes      | 12 bytes | len(pt) bytes    | 16 bytes |
//! +---------------+----------+------------------+----------+
//! ```
//!
//! The caller's associated data is bound through the KDF label, so the AEAD
//! itself runs with empty associated data.

use crate::{
    algorithms::AesKeySize,
    cipher::{self, GCM_NONCE_SIZE, GCM_TAG_SIZE},
    context_header,
    encryptor::{AuthenticatedEncryptor, KEY_MODIFIER_SIZE, MIN_KDK_BYTES},
    env::{Environment, SystemEnv},
    error::{ConfigurationError, CryptoError, OperationError},
    kdf::{self, DerivedKeys},
    secret::Secret,
};

/// Fixed bytes added to every plaintext.
const OVERHEAD: usize = KEY_MODIFIER_SIZE + GCM_NONCE_SIZE + GCM_TAG_SIZE;

/// AES-GCM engine.
#[derive(Debug)]
pub struct AesGcmEncryptor<E: Environment = SystemEnv> {
    kdk: Secret,
    key_size: AesKeySize,
    context_header: Vec<u8>,
    env: E,
}

impl AesGcmEncryptor<SystemEnv> {
    /// Create an engine backed by the OS RNG.
    pub fn new(kdk: Secret, key_size: AesKeySize) -> Result<Self, ConfigurationError> {
        Self::with_env(kdk, key_size, SystemEnv)
    }
}

impl<E: Environment> AesGcmEncryptor<E> {
    /// Create an engine drawing key modifiers and nonces from `env`.
    pub fn with_env(kdk: Secret, key_size: AesKeySize, env: E) -> Result<Self, ConfigurationError> {
        if kdk.len() < MIN_KDK_BYTES {
            return Err(ConfigurationError::KeyTooShort {
                minimum: MIN_KDK_BYTES,
                actual: kdk.len(),
            });
        }

        let context_header = context_header::gcm_header(key_size)?;
        let encryptor = Self { kdk, key_size, context_header, env };

        tracing::debug!(algorithm = encryptor.algorithm(), "created GCM encryptor");

        Ok(encryptor)
    }

    fn derive(&self, aad: &[u8], key_modifier: &[u8]) -> Result<DerivedKeys, OperationError> {
        let keys = self.kdk.with_plaintext(|kdk| {
            kdf::derive_subkeys(
                kdk,
                aad,
                &self.context_header,
                key_modifier,
                self.key_size.bytes(),
                0,
            )
        })?;
        Ok(keys)
    }

    fn encrypt_into(
        &self,
        plaintext: &[u8],
        aad: &[u8],
        payload: &mut [u8],
    ) -> Result<(), OperationError> {
        let (key_modifier, rest) = payload.split_at_mut(KEY_MODIFIER_SIZE);
        let (nonce, rest) = rest.split_at_mut(GCM_NONCE_SIZE);
        let (ciphertext, tag) = rest.split_at_mut(plaintext.len());

        self.env.random_bytes(key_modifier);
        self.env.random_bytes(nonce);

        let keys = self.derive(aad, key_modifier)?;

        ciphertext.copy_from_slice(plaintext);
        let computed = cipher::gcm_seal(self.key_size, keys.encryption_key(), nonce, ciphertext)?;
        tag.copy_from_slice(&computed);
        Ok(())
    }

    fn decrypt_into(
        &self,
        payload: &[u8],
        aad: &[u8],
        destination: &mut [u8],
    ) -> Result<Option<usize>, OperationError> {
        let plaintext_len =
            payload.len().checked_sub(OVERHEAD).ok_or(OperationError::PayloadInvalid)?;
        let Some(plaintext) = destination.get_mut(..plaintext_len) else {
            return Ok(None);
        };

        let (key_modifier, rest) = payload.split_at(KEY_MODIFIER_SIZE);
        let (nonce, rest) = rest.split_at(GCM_NONCE_SIZE);
        let (ciphertext, tag) = rest.split_at(plaintext_len);

        let keys = self.derive(aad, key_modifier)?;

        plaintext.copy_from_slice(ciphertext);
        if let Err(err) =
            cipher::gcm_open(self.key_size, keys.encryption_key(), nonce, plaintext, tag)
        {
            plaintext.fill(0);
            return Err(err);
        }
        Ok(Some(plaintext_len))
    }
}

impl<E: Environment> AuthenticatedEncryptor for AesGcmEncryptor<E> {
    fn algorithm(&self) -> &'static str {
        match self.key_size {
            AesKeySize::Aes128 => "AES_128_GCM",
            AesKeySize::Aes192 => "AES_192_GCM",
            AesKeySize::Aes256 => "AES_256_GCM",
        }
    }

    fn context_header(&self) -> &[u8] {
        &self.context_header
    }

    fn encrypted_size(&self, plaintext_len: usize) -> Option<usize> {
        plaintext_len.checked_add(OVERHEAD)
    }

    fn decrypted_size(&self, ciphertext_len: usize) -> Option<usize> {
        ciphertext_len.checked_sub(OVERHEAD)
    }

    fn try_encrypt(
        &self,
        plaintext: &[u8],
        aad: &[u8],
        destination: &mut [u8],
    ) -> Result<Option<usize>, CryptoError> {
        let size = self.encrypted_size(plaintext.len()).ok_or(OperationError::Overflow)?;
        let Some(payload) = destination.get_mut(..size) else {
            return Ok(None);
        };
        self.encrypt_into(plaintext, aad, payload)?;
        Ok(Some(size))
    }

    fn try_decrypt(
        &self,
        ciphertext: &[u8],
        aad: &[u8],
        destination: &mut [u8],
    ) -> Result<Option<usize>, CryptoError> {
        Ok(self.decrypt_into(ciphertext, aad, destination)?)
    }
}
