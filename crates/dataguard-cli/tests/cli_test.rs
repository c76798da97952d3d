//! End-to-end tests for the CLI library surface.

use std::{
    io::Write,
    process::{Command, Stdio},
};

use dataguard_cli::{CliError, DEFAULT_PURPOSE, KeyOptions, Protector, generate_key};
use dataguard_crypto::{
    AuthenticatedEncryptorConfiguration, CryptoError, EncryptionAlgorithm, ValidationAlgorithm,
};
use proptest::prelude::*;

fn protector(config: AuthenticatedEncryptorConfiguration, key: &str, purpose: &str) -> Protector {
    let kdk = KeyOptions::from_hex(key).load().unwrap();
    Protector::new(config, kdk, purpose).unwrap()
}

fn gcm() -> AuthenticatedEncryptorConfiguration {
    AuthenticatedEncryptorConfiguration::new(
        EncryptionAlgorithm::Aes256Gcm,
        ValidationAlgorithm::HmacSha256,
    )
}

#[test]
fn key_file_round_trip() {
    let key = generate_key(64);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{}", key.as_str()).unwrap();

    let options = KeyOptions::from_file(file.path());
    let from_file = Protector::new(gcm(), options.load().unwrap(), DEFAULT_PURPOSE).unwrap();
    let from_hex = protector(gcm(), &key, DEFAULT_PURPOSE);

    let encoded = from_file.protect(b"shared key", None).unwrap();
    assert_eq!(from_hex.unprotect(&encoded, false).unwrap().plaintext, b"shared key");
}

#[test]
fn missing_key_file_is_io_error() {
    let options = KeyOptions::from_file("/nonexistent/dataguard.key");
    assert!(matches!(options.load(), Err(CliError::Io(_))));
}

#[test]
fn short_key_is_configuration_error() {
    let kdk = KeyOptions::from_hex("00112233").load().unwrap();
    let result = Protector::new(gcm(), kdk, DEFAULT_PURPOSE);
    assert!(matches!(result, Err(CliError::Configuration(_))));
}

#[test]
fn time_limited_round_trip_reports_expiration() {
    let key = generate_key(32);
    let protector = protector(gcm(), &key, "invite");

    let encoded = protector.protect(b"welcome", Some(3600)).unwrap();
    let unprotected = protector.unprotect(&encoded, true).unwrap();

    assert_eq!(unprotected.plaintext, b"welcome");
    assert!(unprotected.expiration.is_some());
}

#[test]
fn expired_payload_is_reported_as_expired() {
    let key = generate_key(32);
    let protector = protector(gcm(), &key, "invite");

    let encoded = protector.protect(b"too late", Some(-60)).unwrap();
    match protector.unprotect(&encoded, true) {
        Err(CliError::Crypto(err)) => assert!(err.is_expired()),
        other => panic!("expected expiry, got {other:?}"),
    }
}

#[test]
fn time_limited_flag_must_match() {
    let key = generate_key(32);
    let protector = protector(gcm(), &key, DEFAULT_PURPOSE);

    let plain = protector.protect(b"x", None).unwrap();
    let limited = protector.protect(b"x", Some(60)).unwrap();

    assert!(matches!(
        protector.unprotect(&plain, true),
        Err(CliError::Crypto(CryptoError::CryptographicFailure))
    ));
    assert!(matches!(
        protector.unprotect(&limited, false),
        Err(CliError::Crypto(CryptoError::CryptographicFailure))
    ));
}

#[test]
fn purpose_isolates_payloads() {
    let key = generate_key(32);
    let encoded = protector(gcm(), &key, "alpha").protect(b"x", None).unwrap();

    let result = protector(gcm(), &key, "beta").unprotect(&encoded, false);
    assert!(matches!(result, Err(CliError::Crypto(CryptoError::CryptographicFailure))));
}

#[test]
fn failure_is_reported_on_stderr_with_logging_off() {
    let output = Command::new(env!("CARGO_BIN_EXE_dataguard"))
        .arg("unprotect")
        .env("RUST_LOG", "off")
        .env_remove("DATAGUARD_KEY")
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("MissingKey"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_protect_unprotect_round_trip(
        plaintext in prop::collection::vec(any::<u8>(), 0..256),
        encryption in prop::sample::select(EncryptionAlgorithm::ALL.to_vec()),
        validation in prop::sample::select(ValidationAlgorithm::ALL.to_vec()),
    ) {
        let config = AuthenticatedEncryptorConfiguration::new(encryption, validation);
        let protector = protector(config, &"ab".repeat(32), DEFAULT_PURPOSE);

        let encoded = protector.protect(&plaintext, None).unwrap();
        let unprotected = protector.unprotect(&encoded, false).unwrap();

        prop_assert_eq!(unprotected.plaintext, plaintext);
        prop_assert_eq!(unprotected.expiration, None);
    }
}
