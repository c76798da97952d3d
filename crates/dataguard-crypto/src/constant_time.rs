//! Timing-independent buffer comparison.

use subtle::{Choice, ConstantTimeEq};

/// Compare two byte buffers without leaking where they differ.
///
/// Every byte of the longer input is visited regardless of content, with the
/// shorter input padded by zeros, and the length check is folded into the
/// same accumulator. Only the lengths themselves (public in every payload
/// format here) influence timing.
pub fn buffers_are_equal(expected: &[u8], actual: &[u8]) -> bool {
    let len = expected.len().max(actual.len());
    let mut diff = 0u8;
    for i in 0..len {
        let a = expected.get(i).copied().unwrap_or(0);
        let b = actual.get(i).copied().unwrap_or(0);
        diff |= a ^ b;
    }

    let same_len = Choice::from(u8::from(expected.len() == actual.len()));
    (diff.ct_eq(&0) & same_len).into()
}
