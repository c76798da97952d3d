//! The [`AuthenticatedEncryptor`] trait shared by every engine.
//!
//! Engines implement the caller-buffer primitives (`try_encrypt`,
//! `try_decrypt`) plus size calculations; the allocating entry points are
//! provided on top of them.

use std::sync::Arc;

use crate::{
    env::Environment,
    error::{ConfigurationError, CryptoError},
};

/// Size of the random key modifier at the front of every payload.
pub const KEY_MODIFIER_SIZE: usize = 16;

/// Minimum accepted key derivation key length (128 bits).
pub const MIN_KDK_BYTES: usize = 16;

/// Authenticated encryption with associated data.
///
/// The associated data is not stored in the payload; the same bytes must be
/// supplied to [`decrypt`](Self::decrypt). Implementations are immutable after
/// construction and safe to share across threads.
pub trait AuthenticatedEncryptor: Send + Sync {
    /// Name of the algorithm configuration, for logs.
    fn algorithm(&self) -> &'static str;

    /// Self-describing fingerprint of this engine's configuration.
    fn context_header(&self) -> &[u8];

    /// Exact payload size for a plaintext of `plaintext_len` bytes, or `None`
    /// on arithmetic overflow.
    fn encrypted_size(&self, plaintext_len: usize) -> Option<usize>;

    /// Upper bound on the plaintext size for a payload of `ciphertext_len`
    /// bytes, or `None` if no valid payload has that length.
    fn decrypted_size(&self, ciphertext_len: usize) -> Option<usize>;

    /// Encrypt into `destination`.
    ///
    /// Returns `Ok(None)` without doing any work if `destination` is smaller
    /// than [`encrypted_size`](Self::encrypted_size).
    fn try_encrypt(
        &self,
        plaintext: &[u8],
        aad: &[u8],
        destination: &mut [u8],
    ) -> Result<Option<usize>, CryptoError>;

    /// Authenticate and decrypt into `destination`.
    ///
    /// Returns `Ok(None)` if the plaintext does not fit. Destination contents
    /// are unspecified after `Ok(None)` or an error.
    fn try_decrypt(
        &self,
        ciphertext: &[u8],
        aad: &[u8],
        destination: &mut [u8],
    ) -> Result<Option<usize>, CryptoError>;

    /// Encrypt `plaintext` bound to `aad`.
    fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.encrypt_with_buffers(plaintext, aad, 0, 0)
    }

    /// Encrypt, reserving `pre` zero bytes before and `post` zero bytes after
    /// the payload.
    fn encrypt_with_buffers(
        &self,
        plaintext: &[u8],
        aad: &[u8],
        pre: usize,
        post: usize,
    ) -> Result<Vec<u8>, CryptoError> {
        let size = self.encrypted_size(plaintext.len()).ok_or(CryptoError::CryptographicFailure)?;
        let total = pre
            .checked_add(size)
            .and_then(|n| n.checked_add(post))
            .ok_or(CryptoError::CryptographicFailure)?;

        let mut output = vec![0u8; total];
        let written = self
            .try_encrypt(plaintext, aad, &mut output[pre..pre + size])?
            .ok_or(CryptoError::CryptographicFailure)?;

        // Keep the post buffer directly behind the payload.
        output.drain(pre + written..pre + size);
        Ok(output)
    }

    /// Authenticate and decrypt a payload produced by [`encrypt`](Self::encrypt).
    fn decrypt(&self, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let bound = self.decrypted_size(ciphertext.len()).ok_or(CryptoError::CryptographicFailure)?;
        let mut plaintext = vec![0u8; bound];
        let written = self
            .try_decrypt(ciphertext, aad, &mut plaintext)?
            .ok_or(CryptoError::CryptographicFailure)?;
        plaintext.truncate(written);
        Ok(plaintext)
    }
}

impl<T: AuthenticatedEncryptor + ?Sized> AuthenticatedEncryptor for Box<T> {
    fn algorithm(&self) -> &'static str {
        (**self).algorithm()
    }

    fn context_header(&self) -> &[u8] {
        (**self).context_header()
    }

    fn encrypted_size(&self, plaintext_len: usize) -> Option<usize> {
        (**self).encrypted_size(plaintext_len)
    }

    fn decrypted_size(&self, ciphertext_len: usize) -> Option<usize> {
        (**self).decrypted_size(ciphertext_len)
    }

    fn try_encrypt(
        &self,
        plaintext: &[u8],
        aad: &[u8],
        destination: &mut [u8],
    ) -> Result<Option<usize>, CryptoError> {
        (**self).try_encrypt(plaintext, aad, destination)
    }

    fn try_decrypt(
        &self,
        ciphertext: &[u8],
        aad: &[u8],
        destination: &mut [u8],
    ) -> Result<Option<usize>, CryptoError> {
        (**self).try_decrypt(ciphertext, aad, destination)
    }
}

impl<T: AuthenticatedEncryptor + ?Sized> AuthenticatedEncryptor for Arc<T> {
    fn algorithm(&self) -> &'static str {
        (**self).algorithm()
    }

    fn context_header(&self) -> &[u8] {
        (**self).context_header()
    }

    fn encrypted_size(&self, plaintext_len: usize) -> Option<usize> {
        (**self).encrypted_size(plaintext_len)
    }

    fn decrypted_size(&self, ciphertext_len: usize) -> Option<usize> {
        (**self).decrypted_size(ciphertext_len)
    }

    fn try_encrypt(
        &self,
        plaintext: &[u8],
        aad: &[u8],
        destination: &mut [u8],
    ) -> Result<Option<usize>, CryptoError> {
        (**self).try_encrypt(plaintext, aad, destination)
    }

    fn try_decrypt(
        &self,
        ciphertext: &[u8],
        aad: &[u8],
        destination: &mut [u8],
    ) -> Result<Option<usize>, CryptoError> {
        (**self).try_decrypt(ciphertext, aad, destination)
    }
}

/// Round-trip a random plaintext under random associated data.
///
/// Catches a misconfigured engine (wrong primitive, broken platform crypto)
/// before it protects anything real.
pub fn perform_self_test<A, E>(encryptor: &A, env: &E) -> Result<(), ConfigurationError>
where
    A: AuthenticatedEncryptor + ?Sized,
    E: Environment,
{
    let algorithm = encryptor.algorithm();
    let failed = |_: CryptoError| ConfigurationError::SelfTestFailed { algorithm };

    let mut plaintext = [0u8; 16];
    let mut aad = [0u8; 16];
    env.random_bytes(&mut plaintext);
    env.random_bytes(&mut aad);

    let payload = encryptor.encrypt(&plaintext, &aad).map_err(failed)?;
    let recovered = encryptor.decrypt(&payload, &aad).map_err(failed)?;

    if recovered != plaintext {
        tracing::warn!(algorithm, "self-test round trip produced different plaintext");
        return Err(ConfigurationError::SelfTestFailed { algorithm });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::SystemEnv;

    /// Reversible toy engine: `[len][plaintext][aad checksum]`.
    struct Echo;

    impl AuthenticatedEncryptor for Echo {
        fn algorithm(&self) -> &'static str {
            "ECHO"
        }

        fn context_header(&self) -> &[u8] {
            b"echo"
        }

        fn encrypted_size(&self, plaintext_len: usize) -> Option<usize> {
            plaintext_len.checked_add(2)
        }

        fn decrypted_size(&self, ciphertext_len: usize) -> Option<usize> {
            ciphertext_len.checked_sub(2)
        }

        fn try_encrypt(
            &self,
            plaintext: &[u8],
            aad: &[u8],
            destination: &mut [u8],
        ) -> Result<Option<usize>, CryptoError> {
            let Some(size) = self.encrypted_size(plaintext.len()) else {
                return Err(CryptoError::CryptographicFailure);
            };
            if destination.len() < size {
                return Ok(None);
            }
            destination[0] = u8::try_from(plaintext.len()).unwrap();
            destination[1..=plaintext.len()].copy_from_slice(plaintext);
            destination[size - 1] = aad.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
            Ok(Some(size))
        }

        fn try_decrypt(
            &self,
            ciphertext: &[u8],
            aad: &[u8],
            destination: &mut [u8],
        ) -> Result<Option<usize>, CryptoError> {
            let Some(len) = self.decrypted_size(ciphertext.len()) else {
                return Err(CryptoError::CryptographicFailure);
            };
            let checksum = aad.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
            if ciphertext[ciphertext.len() - 1] != checksum {
                return Err(CryptoError::CryptographicFailure);
            }
            if destination.len() < len {
                return Ok(None);
            }
            destination[..len].copy_from_slice(&ciphertext[1..=len]);
            Ok(Some(len))
        }
    }

    #[test]
    fn allocating_round_trip() {
        let payload = Echo.encrypt(b"abc", b"x").unwrap();
        assert_eq!(Echo.decrypt(&payload, b"x").unwrap(), b"abc");
        assert!(Echo.decrypt(&payload, b"y").is_err());
    }

    #[test]
    fn buffers_surround_the_payload() {
        let plain = Echo.encrypt(b"abc", b"").unwrap();
        let framed = Echo.encrypt_with_buffers(b"abc", b"", 3, 2).unwrap();

        assert_eq!(framed.len(), 3 + plain.len() + 2);
        assert_eq!(&framed[..3], &[0, 0, 0]);
        assert_eq!(&framed[3..3 + plain.len()], &plain[..]);
        assert_eq!(&framed[3 + plain.len()..], &[0, 0]);
    }

    #[test]
    fn buffer_overflow_is_rejected() {
        let result = Echo.encrypt_with_buffers(b"", b"", usize::MAX, 1);
        assert_eq!(result, Err(CryptoError::CryptographicFailure));
    }

    #[test]
    fn boxed_and_shared_encryptors_forward() {
        let boxed: Box<dyn AuthenticatedEncryptor> = Box::new(Echo);
        let shared: Arc<dyn AuthenticatedEncryptor> = Arc::new(Echo);

        let payload = boxed.encrypt(b"hi", b"").unwrap();
        assert_eq!(shared.decrypt(&payload, b"").unwrap(), b"hi");
        assert_eq!(boxed.context_header(), shared.context_header());
    }

    #[test]
    fn self_test_passes_for_working_engine() {
        assert_eq!(perform_self_test(&Echo, &SystemEnv), Ok(()));
    }

    #[test]
    fn self_test_detects_broken_engine() {
        struct Lossy;

        impl AuthenticatedEncryptor for Lossy {
            fn algorithm(&self) -> &'static str {
                "LOSSY"
            }

            fn context_header(&self) -> &[u8] {
                &[]
            }

            fn encrypted_size(&self, plaintext_len: usize) -> Option<usize> {
                Some(plaintext_len)
            }

            fn decrypted_size(&self, ciphertext_len: usize) -> Option<usize> {
                Some(ciphertext_len)
            }

            fn try_encrypt(
                &self,
                plaintext: &[u8],
                _aad: &[u8],
                destination: &mut [u8],
            ) -> Result<Option<usize>, CryptoError> {
                destination[..plaintext.len()].fill(0);
                Ok(Some(plaintext.len()))
            }

            fn try_decrypt(
                &self,
                ciphertext: &[u8],
                _aad: &[u8],
                destination: &mut [u8],
            ) -> Result<Option<usize>, CryptoError> {
                destination[..ciphertext.len()].copy_from_slice(ciphertext);
                Ok(Some(ciphertext.len()))
            }
        }

        assert_eq!(
            perform_self_test(&Lossy, &SystemEnv),
            Err(ConfigurationError::SelfTestFailed { algorithm: "LOSSY" })
        );
    }
}
