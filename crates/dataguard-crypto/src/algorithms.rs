//! Algorithm identifiers for encryptor configuration.
//!
//! Names follow the conventional identifiers (`AES_256_CBC`, `HMACSHA256`)
//! so they round-trip through configuration files and CLI flags.

use std::{fmt, str::FromStr};

use crate::error::ConfigurationError;

/// AES key size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AesKeySize {
    /// 128-bit key
    Aes128,
    /// 192-bit key
    Aes192,
    /// 256-bit key
    Aes256,
}

impl AesKeySize {
    /// Key length in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }

    /// Key length in bits.
    pub const fn bits(self) -> usize {
        self.bytes() * 8
    }
}

/// Block cipher mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherMode {
    /// CBC with PKCS#7 padding, authenticated by a separate HMAC
    Cbc,
    /// Galois/Counter Mode (AEAD)
    Gcm,
}

/// Symmetric encryption algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncryptionAlgorithm {
    /// AES-128 in CBC mode
    Aes128Cbc,
    /// AES-192 in CBC mode
    Aes192Cbc,
    /// AES-256 in CBC mode
    #[default]
    Aes256Cbc,
    /// AES-128 in GCM mode
    Aes128Gcm,
    /// AES-192 in GCM mode
    Aes192Gcm,
    /// AES-256 in GCM mode
    Aes256Gcm,
}

impl EncryptionAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [Self; 6] = [
        Self::Aes128Cbc,
        Self::Aes192Cbc,
        Self::Aes256Cbc,
        Self::Aes128Gcm,
        Self::Aes192Gcm,
        Self::Aes256Gcm,
    ];

    /// AES key size.
    pub const fn key_size(self) -> AesKeySize {
        match self {
            Self::Aes128Cbc | Self::Aes128Gcm => AesKeySize::Aes128,
            Self::Aes192Cbc | Self::Aes192Gcm => AesKeySize::Aes192,
            Self::Aes256Cbc | Self::Aes256Gcm => AesKeySize::Aes256,
        }
    }

    /// Cipher mode.
    pub const fn mode(self) -> CipherMode {
        match self {
            Self::Aes128Cbc | Self::Aes192Cbc | Self::Aes256Cbc => CipherMode::Cbc,
            Self::Aes128Gcm | Self::Aes192Gcm | Self::Aes256Gcm => CipherMode::Gcm,
        }
    }

    /// Conventional identifier, e.g. `AES_256_CBC`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aes128Cbc => "AES_128_CBC",
            Self::Aes192Cbc => "AES_192_CBC",
            Self::Aes256Cbc => "AES_256_CBC",
            Self::Aes128Gcm => "AES_128_GCM",
            Self::Aes192Gcm => "AES_192_GCM",
            Self::Aes256Gcm => "AES_256_GCM",
        }
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncryptionAlgorithm {
    type Err = ConfigurationError;

    /// Case-insensitive; `-` is accepted in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == normalized)
            .ok_or_else(|| ConfigurationError::UnknownEncryptionAlgorithm(s.to_owned()))
    }
}

/// MAC algorithm for CBC payloads. Ignored by GCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValidationAlgorithm {
    /// HMAC with SHA-256
    #[default]
    HmacSha256,
    /// HMAC with SHA-512
    HmacSha512,
}

impl ValidationAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [Self; 2] = [Self::HmacSha256, Self::HmacSha512];

    /// Digest length in bytes. Also the validation subkey length.
    pub const fn digest_bytes(self) -> usize {
        match self {
            Self::HmacSha256 => 32,
            Self::HmacSha512 => 64,
        }
    }

    /// Conventional identifier, e.g. `HMACSHA256`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::HmacSha256 => "HMACSHA256",
            Self::HmacSha512 => "HMACSHA512",
        }
    }
}

impl fmt::Display for ValidationAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValidationAlgorithm {
    type Err = ConfigurationError;

    /// Case-insensitive; `HMAC-SHA256` and `HMAC_SHA256` are accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == normalized)
            .ok_or_else(|| ConfigurationError::UnknownValidationAlgorithm(s.to_owned()))
    }
}
