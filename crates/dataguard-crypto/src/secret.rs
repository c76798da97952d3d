//! Secret material with guaranteed erasure.
//!
//! Two types cover the key lifecycle:
//!
//! - [`Secret`]: the long-lived key derivation key. Stored XOR-masked with a
//!   random pad so the raw key never sits in memory between operations.
//! - [`SecretBuffer`]: a transient plaintext copy (unmasked KDK, derived
//!   subkeys). Zeroed in `Drop`, so every exit path (return, `?`, unwind)
//!   erases it.

use std::fmt;

use zeroize::Zeroize;

use crate::env::{Environment, SystemEnv};

/// Default master key size for newly generated keys (512 bits).
pub const DEFAULT_MASTER_KEY_BYTES: usize = 64;

/// Heap buffer for secret bytes, zeroed when dropped.
pub struct SecretBuffer {
    bytes: Box<[u8]>,
}

impl SecretBuffer {
    /// Allocate a zero-filled buffer of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        #[cfg(test)]
        instrumentation::acquired();
        Self { bytes: vec![0u8; len].into_boxed_slice() }
    }

    /// Copy `bytes` into a new buffer.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut buffer = Self::zeroed(bytes.len());
        buffer.bytes.copy_from_slice(bytes);
        buffer
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read access to the secret bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Write access to the secret bytes.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Overwrite the contents with zeros.
    pub fn wipe(&mut self) {
        self.bytes.zeroize();
    }
}

impl Drop for SecretBuffer {
    fn drop(&mut self) {
        self.wipe();
        #[cfg(test)]
        instrumentation::released();
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBuffer([REDACTED; {} bytes])", self.bytes.len())
    }
}

/// Long-lived secret such as a key derivation key.
///
/// The bytes are held XOR-masked with a random pad of equal length. Reading
/// the plaintext requires [`Secret::expose`], which returns a
/// [`SecretBuffer`] that erases itself when the operation finishes.
pub struct Secret {
    masked: Box<[u8]>,
    pad: Box<[u8]>,
}

impl Secret {
    /// Take a copy of `bytes`, masked with OS randomness.
    ///
    /// The caller still owns `bytes` and is responsible for erasing it.
    pub fn new(bytes: &[u8]) -> Self {
        Self::with_env(bytes, &SystemEnv)
    }

    /// Take a copy of `bytes`, masked with randomness from `env`.
    pub fn with_env<E: Environment>(bytes: &[u8], env: &E) -> Self {
        let mut pad = vec![0u8; bytes.len()].into_boxed_slice();
        env.random_bytes(&mut pad);
        let masked = bytes.iter().zip(pad.iter()).map(|(byte, mask)| byte ^ mask).collect();
        Self { masked, pad }
    }

    /// Generate a fresh random secret of `len` bytes.
    pub fn generate(len: usize) -> Self {
        let mut fresh = SecretBuffer::zeroed(len);
        SystemEnv.random_bytes(fresh.as_mut_slice());
        Self::new(fresh.as_slice())
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.masked.len()
    }

    /// True if the secret holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.masked.is_empty()
    }

    /// Unmask into a transient buffer.
    ///
    /// Keep the returned buffer scoped to a single operation.
    pub fn expose(&self) -> SecretBuffer {
        let mut plain = SecretBuffer::zeroed(self.masked.len());
        for ((out, masked), mask) in
            plain.as_mut_slice().iter_mut().zip(self.masked.iter()).zip(self.pad.iter())
        {
            *out = masked ^ mask;
        }
        plain
    }

    /// Run `f` with the plaintext secret, erasing it afterwards.
    pub fn with_plaintext<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let plain = self.expose();
        f(plain.as_slice())
    }
}

impl From<Vec<u8>> for Secret {
    /// Takes ownership of `bytes` and erases the original allocation.
    fn from(mut bytes: Vec<u8>) -> Self {
        let secret = Self::new(&bytes);
        bytes.zeroize();
        secret
    }
}

impl Clone for Secret {
    fn clone(&self) -> Self {
        let plain = self.expose();
        Self::new(plain.as_slice())
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.masked.zeroize();
        self.pad.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED; {} bytes])", self.masked.len())
    }
}

/// Live-buffer accounting for hygiene tests.
///
/// Thread-local so parallel tests don't observe each other.
#[cfg(test)]
pub(crate) mod instrumentation {
    use std::cell::Cell;

    thread_local! {
        static LIVE: Cell<isize> = const { Cell::new(0) };
        static TOTAL: Cell<usize> = const { Cell::new(0) };
    }

    pub(crate) fn acquired() {
        LIVE.with(|live| live.set(live.get() + 1));
        TOTAL.with(|total| total.set(total.get() + 1));
    }

    pub(crate) fn released() {
        LIVE.with(|live| live.set(live.get() - 1));
    }

    /// Number of `SecretBuffer`s currently alive on this thread.
    pub(crate) fn live_buffers() -> isize {
        LIVE.with(Cell::get)
    }

    /// Number of `SecretBuffer`s ever allocated on this thread.
    pub(crate) fn acquisitions() -> usize {
        TOTAL.with(Cell::get)
    }
}
