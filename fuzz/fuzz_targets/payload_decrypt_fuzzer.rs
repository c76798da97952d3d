//! Fuzz target for decrypting attacker-controlled payloads
//!
//! # Strategy
//!
//! - Random bytes of arbitrary length fed to every engine configuration
//! - Same bytes through the time-limited protector
//! - Destination buffers of arbitrary size for `try_decrypt`
//!
//! # Invariants
//!
//! - NEVER panic on malformed payloads
//! - Every failure is the single homogenized `CryptographicFailure`
//! - Forged payloads never authenticate

#![no_main]

use std::sync::{Arc, OnceLock};

use arbitrary::Arbitrary;
use dataguard_crypto::{
    AuthenticatedEncryptor, AuthenticatedEncryptorConfiguration, CryptoError, EncryptionAlgorithm,
    Secret, TimeLimitedProtector, ValidationAlgorithm,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    engine: u8,
    aad: Vec<u8>,
    payload: Vec<u8>,
    destination_len: u16,
}

fn engines() -> &'static [Arc<dyn AuthenticatedEncryptor>] {
    static ENGINES: OnceLock<Vec<Arc<dyn AuthenticatedEncryptor>>> = OnceLock::new();
    ENGINES.get_or_init(|| {
        let mut engines = Vec::new();
        for encryption in EncryptionAlgorithm::ALL {
            for validation in ValidationAlgorithm::ALL {
                let config = AuthenticatedEncryptorConfiguration::new(encryption, validation);
                let engine = config.create_encryptor(Secret::new(&[0x42; 32])).unwrap();
                engines.push(Arc::from(engine));
            }
        }
        engines
    })
}

fuzz_target!(|input: Input| {
    let engines = engines();
    let engine = &engines[usize::from(input.engine) % engines.len()];

    assert_eq!(engine.decrypt(&input.payload, &input.aad), Err(CryptoError::CryptographicFailure));

    let mut destination = vec![0u8; usize::from(input.destination_len)];
    match engine.try_decrypt(&input.payload, &input.aad, &mut destination) {
        Ok(None) | Err(CryptoError::CryptographicFailure) => {},
        other => panic!("forged payload produced {other:?}"),
    }

    let protector = TimeLimitedProtector::new(Arc::clone(engine), &input.aad);
    assert_eq!(protector.unprotect(&input.payload), Err(CryptoError::CryptographicFailure));
});
