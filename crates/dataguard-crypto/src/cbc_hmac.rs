//! AES-CBC + HMAC authenticated encryption (encrypt-then-MAC).
//!
//! # Payload
//!
//! ```text
//! +---------------+----------+---------------------+-----------------+
//! | key modifier  | IV       | AES-CBC(PKCS#7)     | HMAC(IV || ct)  |
//! | 16 bytes      | 16 bytes | n * 16 bytes        | digest bytes    |
//! +---------------+----------+---------------------+-----------------+
//! ```
//!
//! Every operation derives fresh subkeys:
//! `KDF(kdk, label = aad, context = context header || key modifier)`, split
//! into the AES key followed by the HMAC key (digest-length).

use crate::{
    algorithms::{AesKeySize, ValidationAlgorithm},
    cipher::{self, AES_BLOCK_SIZE},
    constant_time::buffers_are_equal,
    context_header,
    encryptor::{AuthenticatedEncryptor, KEY_MODIFIER_SIZE, MIN_KDK_BYTES},
    env::{Environment, SystemEnv},
    error::{ConfigurationError, CryptoError, OperationError},
    kdf::{self, DerivedKeys},
    secret::{Secret, SecretBuffer},
};

/// CBC + HMAC engine.
///
/// Owns its key derivation key. The context header is computed once here
/// and never changes.
#[derive(Debug)]
pub struct CbcHmacEncryptor<E: Environment = SystemEnv> {
    kdk: Secret,
    key_size: AesKeySize,
    validation: ValidationAlgorithm,
    context_header: Vec<u8>,
    env: E,
}

impl CbcHmacEncryptor<SystemEnv> {
    /// Create an engine backed by the OS RNG.
    pub fn new(
        kdk: Secret,
        key_size: AesKeySize,
        validation: ValidationAlgorithm,
    ) -> Result<Self, ConfigurationError> {
        Self::with_env(kdk, key_size, validation, SystemEnv)
    }
}

impl<E: Environment> CbcHmacEncryptor<E> {
    /// Create an engine drawing key modifiers and IVs from `env`.
    ///
    /// # Errors
    ///
    /// - `KeyTooShort` if `kdk` is under 128 bits
    /// - `ContextHeader` if the header primitives fail
    pub fn with_env(
        kdk: Secret,
        key_size: AesKeySize,
        validation: ValidationAlgorithm,
        env: E,
    ) -> Result<Self, ConfigurationError> {
        if kdk.len() < MIN_KDK_BYTES {
            return Err(ConfigurationError::KeyTooShort {
                minimum: MIN_KDK_BYTES,
                actual: kdk.len(),
            });
        }

        let context_header = context_header::cbc_hmac_header(key_size, validation)?;
        let encryptor = Self { kdk, key_size, validation, context_header, env };

        tracing::debug!(
            algorithm = encryptor.algorithm(),
            validation = %validation,
            "created CBC+HMAC encryptor"
        );

        Ok(encryptor)
    }

    fn overhead(&self) -> usize {
        KEY_MODIFIER_SIZE + AES_BLOCK_SIZE + self.validation.digest_bytes()
    }

    fn derive(&self, aad: &[u8], key_modifier: &[u8]) -> Result<DerivedKeys, OperationError> {
        let keys = self.kdk.with_plaintext(|kdk| {
            kdf::derive_subkeys(
                kdk,
                aad,
                &self.context_header,
                key_modifier,
                self.key_size.bytes(),
                self.validation.digest_bytes(),
            )
        })?;
        Ok(keys)
    }

    /// `payload` is exactly `encrypted_size(plaintext.len())` bytes.
    fn encrypt_into(
        &self,
        plaintext: &[u8],
        aad: &[u8],
        payload: &mut [u8],
    ) -> Result<(), OperationError> {
        let mac_offset = payload
            .len()
            .checked_sub(self.validation.digest_bytes())
            .ok_or(OperationError::Overflow)?;
        let (body, mac) = payload.split_at_mut(mac_offset);
        let (key_modifier, body) = body.split_at_mut(KEY_MODIFIER_SIZE);
        let (iv, ciphertext) = body.split_at_mut(AES_BLOCK_SIZE);

        self.env.random_bytes(key_modifier);
        self.env.random_bytes(iv);

        let keys = self.derive(aad, key_modifier)?;

        let written =
            cipher::cbc_encrypt(self.key_size, keys.encryption_key(), iv, plaintext, ciphertext)?;
        if written != ciphertext.len() {
            return Err(OperationError::Cipher);
        }

        cipher::compute_mac(self.validation, keys.validation_key(), &[&*iv, &*ciphertext], mac)
    }

    fn decrypt_into(
        &self,
        payload: &[u8],
        aad: &[u8],
        destination: &mut [u8],
    ) -> Result<Option<usize>, OperationError> {
        let ciphertext_len =
            payload.len().checked_sub(self.overhead()).ok_or(OperationError::PayloadInvalid)?;

        let (key_modifier, rest) = payload.split_at(KEY_MODIFIER_SIZE);
        let (iv, rest) = rest.split_at(AES_BLOCK_SIZE);
        let (ciphertext, mac) = rest.split_at(ciphertext_len);

        let keys = self.derive(aad, key_modifier)?;

        let mut expected_mac = vec![0u8; self.validation.digest_bytes()];
        cipher::compute_mac(
            self.validation,
            keys.validation_key(),
            &[iv, ciphertext],
            &mut expected_mac,
        )?;
        if !buffers_are_equal(&expected_mac, mac) {
            return Err(OperationError::IntegrityFailure);
        }

        if destination.len() >= ciphertext.len() {
            let key = keys.encryption_key();
            let result = cipher::cbc_decrypt(self.key_size, key, iv, ciphertext, destination);
            if result.is_err() {
                destination.fill(0);
            }
            return result.map(Some);
        }

        // Padding length is only known after decryption.
        let mut scratch = SecretBuffer::zeroed(ciphertext.len());
        let len = cipher::cbc_decrypt(
            self.key_size,
            keys.encryption_key(),
            iv,
            ciphertext,
            scratch.as_mut_slice(),
        )?;
        if len > destination.len() {
            return Ok(None);
        }
        destination[..len].copy_from_slice(&scratch.as_slice()[..len]);
        Ok(Some(len))
    }
}

impl<E: Environment> AuthenticatedEncryptor for CbcHmacEncryptor<E> {
    fn algorithm(&self) -> &'static str {
        match (self.key_size, self.validation) {
            (AesKeySize::Aes128, ValidationAlgorithm::HmacSha256) => "AES_128_CBC/HMACSHA256",
            (AesKeySize::Aes128, ValidationAlgorithm::HmacSha512) => "AES_128_CBC/HMACSHA512",
            (AesKeySize::Aes192, ValidationAlgorithm::HmacSha256) => "AES_192_CBC/HMACSHA256",
            (AesKeySize::Aes192, ValidationAlgorithm::HmacSha512) => "AES_192_CBC/HMACSHA512",
            (AesKeySize::Aes256, ValidationAlgorithm::HmacSha256) => "AES_256_CBC/HMACSHA256",
            (AesKeySize::Aes256, ValidationAlgorithm::HmacSha512) => "AES_256_CBC/HMACSHA512",
        }
    }

    fn context_header(&self) -> &[u8] {
        &self.context_header
    }

    fn encrypted_size(&self, plaintext_len: usize) -> Option<usize> {
        cipher::cbc_padded_len(plaintext_len)?.checked_add(self.overhead())
    }

    fn decrypted_size(&self, ciphertext_len: usize) -> Option<usize> {
        ciphertext_len.checked_sub(self.overhead())
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
