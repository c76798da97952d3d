//! SP 800-108 counter-mode key derivation with HMAC-SHA512
//!
//! ```text
//! K(i) = HMAC-SHA512(KDK, [i]_32 || Label || 0x00 || ContextHeader || Context || [L]_32)
//! ```
//!
//! `i` starts at 1 and `L` is the total output length in bits. Blocks are
//! concatenated and the last one is truncated to the requested length.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use thiserror::Error;
use zeroize::Zeroize;

use crate::secret::SecretBuffer;

type HmacSha512 = Hmac<Sha512>;

/// Output size of the PRF (HMAC-SHA512) in bytes
pub const PRF_OUTPUT_SIZE: usize = 64;

/// Errors from key derivation
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum KdfError {
    /// Requested output does not fit the 32-bit length-in-bits field
    #[error("requested {requested} bytes exceeds the maximum KDF output length")]
    OutputTooLarge {
        /// Requested output length in bytes
        requested: usize,
    },
}

/// Fill `output` with key material derived from `kdk`.
///
/// `context_header` and `context` are concatenated into the SP 800-108
/// context field. Identical inputs always produce identical output.
pub fn derive_keys(
    kdk: &[u8],
    label: &[u8],
    context_header: &[u8],
    context: &[u8],
    output: &mut [u8],
) -> Result<(), KdfError> {
    let requested = output.len();
    let output_bits = u32::try_from(requested)
        .ok()
        .and_then(|len| len.checked_mul(8))
        .ok_or(KdfError::OutputTooLarge { requested })?;

    let Ok(prf) = HmacSha512::new_from_slice(kdk) else {
        unreachable!("HMAC-SHA512 accepts any key size");
    };

    // [i]_32 || label || 0x00 || context header || context || [L]_32
    let mut prf_input =
        Vec::with_capacity(4 + label.len() + 1 + context_header.len() + context.len() + 4);
    prf_input.extend_from_slice(&[0u8; 4]);
    prf_input.extend_from_slice(label);
    prf_input.push(0x00);
    prf_input.extend_from_slice(context_header);
    prf_input.extend_from_slice(context);
    prf_input.extend_from_slice(&output_bits.to_be_bytes());

    for (counter, chunk) in (1u32..).zip(output.chunks_mut(PRF_OUTPUT_SIZE)) {
        prf_input[..4].copy_from_slice(&counter.to_be_bytes());

        let mut mac = prf.clone();
        mac.update(&prf_input);
        let mut block = mac.finalize().into_bytes();
        chunk.copy_from_slice(&block[..chunk.len()]);
        block.as_mut_slice().zeroize();
    }

    Ok(())
}

/// Encryption and validation subkeys derived in a single KDF call.
///
/// The split is fixed: the first `encryption_len` bytes are the encryption
/// subkey, the remainder is the validation (MAC) subkey.
#[derive(Debug)]
pub struct DerivedKeys {
    material: SecretBuffer,
    split: usize,
}

impl DerivedKeys {
    /// Encryption subkey.
    pub fn encryption_key(&self) -> &[u8] {
        &self.material.as_slice()[..self.split]
    }

    /// Validation (MAC) subkey. Empty for AEAD modes.
    pub fn validation_key(&self) -> &[u8] {
        &self.material.as_slice()[self.split..]
    }
}

/// Derive an encryption subkey followed by a validation subkey.
pub fn derive_subkeys(
    kdk: &[u8],
    label: &[u8],
    context_header: &[u8],
    context: &[u8],
    encryption_len: usize,
    validation_len: usize,
) -> Result<DerivedKeys, KdfError> {
    let total = encryption_len
        .checked_add(validation_len)
        .ok_or(KdfError::OutputTooLarge { requested: usize::MAX })?;

    let mut material = SecretBuffer::zeroed(total);
    derive_keys(kdk, label, context_header, context, material.as_mut_slice())?;

    Ok(DerivedKeys { material, split: encryption_len })
}
