//! Fuzz target for SP 800-108 key derivation
//!
//! # Strategy
//!
//! - Arbitrary KDK, label, context header and context
//! - Output lengths spanning partial and multiple PRF blocks
//!
//! # Invariants
//!
//! - Derivation is deterministic
//! - Moving bytes between context header and context does not change output
//! - A one-byte change in the label changes the output

#![no_main]

use arbitrary::Arbitrary;
use dataguard_crypto::derive_keys;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    kdk: Vec<u8>,
    label: Vec<u8>,
    context: Vec<u8>,
    split: u8,
    output_len: u8,
}

fuzz_target!(|input: Input| {
    let len = usize::from(input.output_len).max(1);
    let split = usize::from(input.split).min(input.context.len());
    let (header, context) = input.context.split_at(split);

    let mut first = vec![0u8; len];
    let mut second = vec![0u8; len];
    derive_keys(&input.kdk, &input.label, header, context, &mut first).unwrap();
    derive_keys(&input.kdk, &input.label, &[], &input.context, &mut second).unwrap();
    assert_eq!(first, second);

    let mut label = input.label.clone();
    label.push(0);
    let mut other = vec![0u8; len];
    derive_keys(&input.kdk, &label, header, context, &mut other).unwrap();
    assert_ne!(first, other);
});
