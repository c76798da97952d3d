//! Primitive dispatch: AES-CBC, AES-GCM and HMAC by algorithm enum.
//!
//! Each operation is generic over the concrete RustCrypto type and a thin
//! `match` picks the instantiation. Keys are passed as slices borrowed from a
//! [`SecretBuffer`](crate::secret::SecretBuffer). The expanded key schedules
//! built from them are wiped on drop.

use aes::{Aes128, Aes192, Aes256};
use aes_gcm::{
    AeadCore, AeadInPlace, Aes128Gcm, Aes256Gcm, AesGcm,
    aead::{
        consts::{U12, U16},
        generic_array::GenericArray,
    },
};
use cbc::cipher::{
    BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit, block_padding::Pkcs7,
};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use zeroize::ZeroizeOnDrop;

use crate::{
    algorithms::{AesKeySize, ValidationAlgorithm},
    error::OperationError,
};

/// AES block size in bytes. Also the CBC IV size.
pub const AES_BLOCK_SIZE: usize = 16;

/// GCM nonce size in bytes.
pub const GCM_NONCE_SIZE: usize = 12;

/// GCM authentication tag size in bytes.
pub const GCM_TAG_SIZE: usize = 16;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Ciphertext length of CBC/PKCS#7 for a plaintext of `plaintext_len` bytes.
///
/// PKCS#7 always adds at least one byte, so an exact multiple of the block
/// size gains a full block.
pub fn cbc_padded_len(plaintext_len: usize) -> Option<usize> {
    (plaintext_len / AES_BLOCK_SIZE).checked_add(1)?.checked_mul(AES_BLOCK_SIZE)
}

/// Encrypt `plaintext` into `out` with AES-CBC/PKCS#7. Returns bytes written.
pub fn cbc_encrypt(
    key_size: AesKeySize,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
    out: &mut [u8],
) -> Result<usize, OperationError> {
    match key_size {
        AesKeySize::Aes128 => cbc_encrypt_with::<Aes128>(key, iv, plaintext, out),
        AesKeySize::Aes192 => cbc_encrypt_with::<Aes192>(key, iv, plaintext, out),
        AesKeySize::Aes256 => cbc_encrypt_with::<Aes256>(key, iv, plaintext, out),
    }
}

/// Decrypt `ciphertext` into `out` and strip PKCS#7 padding. Returns the
/// plaintext length.
///
/// `out` must be at least `ciphertext.len()` bytes.
pub fn cbc_decrypt(
    key_size: AesKeySize,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    out: &mut [u8],
) -> Result<usize, OperationError> {
    match key_size {
        AesKeySize::Aes128 => cbc_decrypt_with::<Aes128>(key, iv, ciphertext, out),
        AesKeySize::Aes192 => cbc_decrypt_with::<Aes192>(key, iv, ciphertext, out),
        AesKeySize::Aes256 => cbc_decrypt_with::<Aes256>(key, iv, ciphertext, out),
    }
}

fn cbc_encrypt_with<C>(
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
    out: &mut [u8],
) -> Result<usize, OperationError>
where
    C: BlockEncryptMut + BlockCipher + KeyInit + ZeroizeOnDrop,
{
    let encryptor =
        cbc::Encryptor::<C>::new_from_slices(key, iv).map_err(|_| OperationError::Cipher)?;
    let written = encryptor
        .encrypt_padded_b2b_mut::<Pkcs7>(plaintext, out)
        .map_err(|_| OperationError::Cipher)?;
    Ok(written.len())
}

fn cbc_decrypt_with<C>(
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    out: &mut [u8],
) -> Result<usize, OperationError>
where
    C: BlockDecryptMut + BlockCipher + KeyInit + ZeroizeOnDrop,
{
    let decryptor =
        cbc::Decryptor::<C>::new_from_slices(key, iv).map_err(|_| OperationError::Cipher)?;
    let plaintext = decryptor
        .decrypt_padded_b2b_mut::<Pkcs7>(ciphertext, out)
        .map_err(|_| OperationError::Cipher)?;
    Ok(plaintext.len())
}

/// HMAC over the concatenation of `parts`, written to `out`.
///
/// `out` must be exactly [`ValidationAlgorithm::digest_bytes`] long.
pub fn compute_mac(
    validation: ValidationAlgorithm,
    key: &[u8],
    parts: &[&[u8]],
    out: &mut [u8],
) -> Result<(), OperationError> {
    match validation {
        ValidationAlgorithm::HmacSha256 => mac_with::<Hmac<Sha256>>(key, parts, out),
        ValidationAlgorithm::HmacSha512 => mac_with::<Hmac<Sha512>>(key, parts, out),
    }
}

fn mac_with<M>(key: &[u8], parts: &[&[u8]], out: &mut [u8]) -> Result<(), OperationError>
where
    M: Mac + KeyInit,
{
    let mut mac = <M as KeyInit>::new_from_slice(key).map_err(|_| OperationError::Cipher)?;
    for part in parts {
        mac.update(part);
    }
    let digest = mac.finalize().into_bytes();
    if out.len() != digest.len() {
        return Err(OperationError::Cipher);
    }
    out.copy_from_slice(&digest);
    Ok(())
}

/// Encrypt `buffer` in place with AES-GCM and empty associated data.
/// Returns the detached tag.
pub fn gcm_seal(
    key_size: AesKeySize,
    key: &[u8],
    nonce: &[u8],
    buffer: &mut [u8],
) -> Result<[u8; GCM_TAG_SIZE], OperationError> {
    match key_size {
        AesKeySize::Aes128 => gcm_seal_with::<Aes128Gcm>(key, nonce, buffer),
        AesKeySize::Aes192 => gcm_seal_with::<Aes192Gcm>(key, nonce, buffer),
        AesKeySize::Aes256 => gcm_seal_with::<Aes256Gcm>(key, nonce, buffer),
    }
}

/// Verify `tag` and decrypt `buffer` in place. On failure `buffer` is left
/// as ciphertext.
pub fn gcm_open(
    key_size: AesKeySize,
    key: &[u8],
    nonce: &[u8],
    buffer: &mut [u8],
    tag: &[u8],
) -> Result<(), OperationError> {
    match key_size {
        AesKeySize::Aes128 => gcm_open_with::<Aes128Gcm>(key, nonce, buffer, tag),
        AesKeySize::Aes192 => gcm_open_with::<Aes192Gcm>(key, nonce, buffer, tag),
        AesKeySize::Aes256 => gcm_open_with::<Aes256Gcm>(key, nonce, buffer, tag),
    }
}

fn gcm_seal_with<A>(
    key: &[u8],
    nonce: &[u8],
    buffer: &mut [u8],
) -> Result<[u8; GCM_TAG_SIZE], OperationError>
where
    A: AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16> + KeyInit,
{
    if nonce.len() != GCM_NONCE_SIZE {
        return Err(OperationError::Cipher);
    }
    let aead = A::new_from_slice(key).map_err(|_| OperationError::Cipher)?;
    let tag = aead
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), &[], buffer)
        .map_err(|_| OperationError::Cipher)?;

    let mut out = [0u8; GCM_TAG_SIZE];
    out.copy_from_slice(&tag);
    Ok(out)
}

fn gcm_open_with<A>(
    key: &[u8],
    nonce: &[u8],
    buffer: &mut [u8],
    tag: &[u8],
) -> Result<(), OperationError>
where
    A: AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16> + KeyInit,
{
    if nonce.len() != GCM_NONCE_SIZE || tag.len() != GCM_TAG_SIZE {
        return Err(OperationError::PayloadInvalid);
    }
    let aead = A::new_from_slice(key).map_err(|_| OperationError::Cipher)?;
    aead.decrypt_in_place_detached(
        GenericArray::from_slice(nonce),
        &[],
        buffer,
        GenericArray::from_slice(tag),
    )
    .map_err(|_| OperationError::IntegrityFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wiped_on_drop<T: ZeroizeOnDrop>() {}

    #[test]
    fn key_schedules_are_wiped_on_drop() {
        wiped_on_drop::<Aes128>();
        wiped_on_drop::<Aes192>();
        wiped_on_drop::<Aes256>();
        wiped_on_drop::<cbc::Encryptor<Aes256>>();
        wiped_on_drop::<cbc::Decryptor<Aes256>>();
        wiped_on_drop::<Aes128Gcm>();
        wiped_on_drop::<Aes192Gcm>();
        wiped_on_drop::<Aes256Gcm>();
    }

    #[test]
    fn padded_len_always_adds_padding() {
        assert_eq!(cbc_padded_len(0), Some(16));
        assert_eq!(cbc_padded_len(15), Some(16));
        assert_eq!(cbc_padded_len(16), Some(32));
        assert_eq!(cbc_padded_len(usize::MAX), None);
    }

    #[test]
    fn cbc_round_trip_every_key_size() {
        for key_size in [AesKeySize::Aes128, AesKeySize::Aes192, AesKeySize::Aes256] {
            let key = vec![0x11u8; key_size.bytes()];
            let iv = [0x22u8; AES_BLOCK_SIZE];
            let plaintext = b"seventeen bytes!!";

            let mut ciphertext = [0u8; 32];
            let written = cbc_encrypt(key_size, &key, &iv, plaintext, &mut ciphertext).unwrap();
            assert_eq!(written, 32);

            let mut recovered = [0u8; 32];
            let len = cbc_decrypt(key_size, &key, &iv, &ciphertext, &mut recovered).unwrap();
            assert_eq!(&recovered[..len], plaintext);
        }
    }

    #[test]
    fn cbc_encrypt_rejects_short_output() {
        let mut out = [0u8; 15];
        let result = cbc_encrypt(AesKeySize::Aes128, &[0; 16], &[0; 16], b"", &mut out);
        assert_eq!(result, Err(OperationError::Cipher));
    }

    #[test]
    fn cbc_decrypt_rejects_partial_block() {
        let mut out = [0u8; 32];
        let result = cbc_decrypt(AesKeySize::Aes128, &[0; 16], &[0; 16], &[0; 17], &mut out);
        assert_eq!(result, Err(OperationError::Cipher));
    }

    #[test]
    fn cbc_rejects_wrong_key_length() {
        let mut out = [0u8; 16];
        let result = cbc_encrypt(AesKeySize::Aes256, &[0; 16], &[0; 16], b"", &mut out);
        assert_eq!(result, Err(OperationError::Cipher));
    }

    #[test]
    fn mac_over_parts_equals_mac_over_concatenation() {
        let mut split = [0u8; 32];
        let mut joined = [0u8; 32];
        compute_mac(ValidationAlgorithm::HmacSha256, b"key", &[b"ab", b"cd"], &mut split).unwrap();
        compute_mac(ValidationAlgorithm::HmacSha256, b"key", &[b"abcd"], &mut joined).unwrap();
        assert_eq!(split, joined);
    }

    #[test]
    fn mac_rejects_wrong_output_length() {
        let mut out = [0u8; 32];
        let result = compute_mac(ValidationAlgorithm::HmacSha512, b"key", &[b""], &mut out);
        assert_eq!(result, Err(OperationError::Cipher));
    }

    #[test]
    fn gcm_round_trip_every_key_size() {
        for key_size in [AesKeySize::Aes128, AesKeySize::Aes192, AesKeySize::Aes256] {
            let key = vec![0x33u8; key_size.bytes()];
            let nonce = [0x44u8; GCM_NONCE_SIZE];
            let mut buffer = *b"attack at dawn";

            let tag = gcm_seal(key_size, &key, &nonce, &mut buffer).unwrap();
            assert_ne!(&buffer, b"attack at dawn");

            gcm_open(key_size, &key, &nonce, &mut buffer, &tag).unwrap();
            assert_eq!(&buffer, b"attack at dawn");
        }
    }

    #[test]
    fn gcm_open_detects_tampered_tag() {
        let key = [0x55u8; 32];
        let nonce = [0u8; GCM_NONCE_SIZE];
        let mut buffer = *b"payload";
        let mut tag = gcm_seal(AesKeySize::Aes256, &key, &nonce, &mut buffer).unwrap();
        tag[0] ^= 1;

        let result = gcm_open(AesKeySize::Aes256, &key, &nonce, &mut buffer, &tag);
        assert_eq!(result, Err(OperationError::IntegrityFailure));
    }

    #[test]
    fn gcm_rejects_wrong_nonce_length() {
        let mut buffer = [0u8; 4];
        let result = gcm_seal(AesKeySize::Aes128, &[0; 16], &[0; 16], &mut buffer);
        assert_eq!(result, Err(OperationError::Cipher));
    }
}
