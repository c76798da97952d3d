//! Fuzz target for payload tampering
//!
//! # Strategy
//!
//! - Encrypt arbitrary plaintext under arbitrary AAD
//! - Apply a sequence of byte edits (flip, set, truncate, extend)
//!
//! # Invariants
//!
//! - Untouched payloads always round-trip
//! - Any payload that differs from the original fails to decrypt

#![no_main]

use arbitrary::Arbitrary;
use dataguard_crypto::{
    AuthenticatedEncryptor, AuthenticatedEncryptorConfiguration, CryptoError, EncryptionAlgorithm,
    Secret, ValidationAlgorithm,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Edit {
    Flip { index: u16, mask: u8 },
    Set { index: u16, value: u8 },
    Truncate { len: u16 },
    Extend { bytes: Vec<u8> },
}

#[derive(Debug, Arbitrary)]
struct Input {
    gcm: bool,
    sha512: bool,
    plaintext: Vec<u8>,
    aad: Vec<u8>,
    edits: Vec<Edit>,
}

fuzz_target!(|input: Input| {
    let encryption =
        if input.gcm { EncryptionAlgorithm::Aes128Gcm } else { EncryptionAlgorithm::Aes128Cbc };
    let validation = if input.sha512 {
        ValidationAlgorithm::HmacSha512
    } else {
        ValidationAlgorithm::HmacSha256
    };
    let engine = AuthenticatedEncryptorConfiguration::new(encryption, validation)
        .create_encryptor(Secret::new(&[7; 16]))
        .unwrap();

    let original = engine.encrypt(&input.plaintext, &input.aad).unwrap();
    assert_eq!(engine.decrypt(&original, &input.aad).unwrap(), input.plaintext);

    let mut tampered = original.clone();
    for edit in input.edits {
        match edit {
            Edit::Flip { index, mask } => {
                if let Some(byte) = tampered.get_mut(usize::from(index)) {
                    *byte ^= mask;
                }
            },
            Edit::Set { index, value } => {
                if let Some(byte) = tampered.get_mut(usize::from(index)) {
                    *byte = value;
                }
            },
            Edit::Truncate { len } => tampered.truncate(usize::from(len)),
            Edit::Extend { bytes } => tampered.extend_from_slice(&bytes),
        }
    }

    let result = engine.decrypt(&tampered, &input.aad);
    if tampered == original {
        assert_eq!(result.unwrap(), input.plaintext);
    } else {
        assert_eq!(result, Err(CryptoError::CryptographicFailure));
    }
});
