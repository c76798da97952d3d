//! Context headers: a self-describing fingerprint of an algorithm
//! configuration.
//!
//! The header is mixed into every KDF invocation, so payloads produced under
//! one configuration never authenticate under another. Layout (all integers
//! big-endian `u32`):
//!
//! ```text
//! CBC+HMAC: [00][00] keyBytes blockBytes macKeyBytes digestBytes  E("")   MAC("")
//! GCM:      [00][01] keyBytes nonceBytes blockBytes  tagBytes     tag("")
//! ```
//!
//! `E("")`, `MAC("")` and `tag("")` are computed under keys derived from an
//! empty KDK, label and context, which pins the actual primitive behavior and
//! not just its parameters.

use crate::{
    algorithms::{AesKeySize, ValidationAlgorithm},
    cipher::{self, AES_BLOCK_SIZE, GCM_NONCE_SIZE, GCM_TAG_SIZE},
    error::{ConfigurationError, OperationError},
    kdf,
    secret::SecretBuffer,
};

/// Identifies the KDF in use (SP 800-108 CTR HMAC-SHA512).
pub const KDF_ID: u8 = 0x00;

/// Mode byte for CBC encryption + HMAC validation.
pub const MODE_CBC_HMAC: u8 = 0x00;

/// Mode byte for GCM.
pub const MODE_GCM: u8 = 0x01;

/// Length of the fixed prefix before the computed trailer.
const PREFIX_LEN: usize = 2 + 4 * 4;

/// Build the header for AES-CBC with an HMAC validation algorithm.
pub fn cbc_hmac_header(
    key_size: AesKeySize,
    validation: ValidationAlgorithm,
) -> Result<Vec<u8>, ConfigurationError> {
    let failure = |_: OperationError| ConfigurationError::ContextHeader { algorithm: "CBC+HMAC" };

    let key_bytes = key_size.bytes();
    let digest_bytes = validation.digest_bytes();

    let mut header = Vec::with_capacity(PREFIX_LEN + AES_BLOCK_SIZE + digest_bytes);
    header.extend_from_slice(&[KDF_ID, MODE_CBC_HMAC]);
    push_u32(&mut header, key_bytes)?;
    push_u32(&mut header, AES_BLOCK_SIZE)?;
    push_u32(&mut header, digest_bytes)?;
    push_u32(&mut header, digest_bytes)?;

    let keys = kdf::derive_subkeys(&[], &[], &[], &[], key_bytes, digest_bytes)
        .map_err(|err| failure(OperationError::from(err)))?;

    let mut empty_ciphertext = [0u8; AES_BLOCK_SIZE];
    let zero_iv = [0u8; AES_BLOCK_SIZE];
    cipher::cbc_encrypt(key_size, keys.encryption_key(), &zero_iv, &[], &mut empty_ciphertext)
        .map_err(failure)?;
    header.extend_from_slice(&empty_ciphertext);

    let mut empty_mac = vec![0u8; digest_bytes];
    cipher::compute_mac(validation, keys.validation_key(), &[], &mut empty_mac).map_err(failure)?;
    header.extend_from_slice(&empty_mac);

    Ok(header)
}

/// Build the header for AES-GCM.
pub fn gcm_header(key_size: AesKeySize) -> Result<Vec<u8>, ConfigurationError> {
    let failure = |_: OperationError| ConfigurationError::ContextHeader { algorithm: "GCM" };

    let key_bytes = key_size.bytes();

    let mut header = Vec::with_capacity(PREFIX_LEN + GCM_TAG_SIZE);
    header.extend_from_slice(&[KDF_ID, MODE_GCM]);
    push_u32(&mut header, key_bytes)?;
    push_u32(&mut header, GCM_NONCE_SIZE)?;
    push_u32(&mut header, AES_BLOCK_SIZE)?;
    push_u32(&mut header, GCM_TAG_SIZE)?;

    let mut key = SecretBuffer::zeroed(key_bytes);
    kdf::derive_keys(&[], &[], &[], &[], key.as_mut_slice())
        .map_err(|err| failure(OperationError::from(err)))?;

    let zero_nonce = [0u8; GCM_NONCE_SIZE];
    let tag = cipher::gcm_seal(key_size, key.as_slice(), &zero_nonce, &mut []).map_err(failure)?;
    header.extend_from_slice(&tag);

    Ok(header)
}

fn push_u32(header: &mut Vec<u8>, value: usize) -> Result<(), ConfigurationError> {
    let value = u32::try_from(value)
        .map_err(|_| ConfigurationError::ContextHeader { algorithm: "header field" })?;
    header.extend_from_slice(&value.to_be_bytes());
    Ok(())
}
