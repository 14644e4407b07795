//! Access keys and key derivation.
//!
//! This module owns two responsibilities:
//! 1. Holding the caller's access key and the key derived from it in types
//!    that never print their contents and are zeroised on drop.
//! 2. Deriving the 256-bit field encryption key from an access key with
//!    PBKDF2-HMAC-SHA256.
//!
//! This is one of exactly two modules that import `ring` key primitives
//! directly (the other is `crypto`).
//!
//! ## Derivation structure
//!
//! ```text
//! PBKDF2-HMAC-SHA256(
//!     password   = utf8(access_key),
//!     salt       = "softovault-salt-2024",
//!     iterations = 100_000,
//!     dk_len     = 32,
//! )
//! ```
//!
//! The salt is a fixed system-wide constant, so the same access key always
//! yields the same key and nothing per vault has to be stored. Confidentiality
//! rests entirely on the entropy of the access key.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::KEY_LEN;
use crate::error::{Result, SoftovaultError};

/// PRF used for derivation.
static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

/// The system-wide salt. Public and constant; not a secret.
pub const DEFAULT_SALT: &[u8] = b"softovault-salt-2024";

/// PBKDF2 iteration count used unless configured otherwise.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Length of a per-vault salt produced by [`KdfParams::generate_vault_salt`].
pub const VAULT_SALT_LEN: usize = 16;

/// Number of random bytes behind a freshly generated access key.
const ACCESS_KEY_ENTROPY: usize = 32;

// ---------------------------------------------------------------------------
// Access key
// ---------------------------------------------------------------------------

/// The opaque credential for a vault.
///
/// It is both the lookup key of the vault row and the only input to key
/// derivation. Holding it is necessary and sufficient to read the vault.
///
/// - Never printed: `Debug` renders `[REDACTED]`, and there is no `Display`.
/// - Zeroised on drop through `secrecy`.
pub struct AccessKey(SecretString);

impl AccessKey {
    /// Wrap a caller-supplied access key.
    ///
    /// Only emptiness is rejected. Low-entropy keys are accepted.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(SoftovaultError::validation("access key must not be empty"));
        }
        Ok(Self(SecretString::from(key)))
    }

    /// Generate a fresh high-entropy access key for a new vault.
    pub fn generate() -> Result<Self> {
        let rng = SystemRandom::new();
        let mut buf = [0u8; ACCESS_KEY_ENTROPY];
        rng.fill(&mut buf)
            .map_err(|_| SoftovaultError::RandomnessFailure)?;
        let encoded = URL_SAFE_NO_PAD.encode(buf);
        buf.zeroize();
        Ok(Self(SecretString::from(encoded)))
    }

    /// Borrow the raw key. Callers that hand it to a store lookup must not
    /// log or persist anything derived from it.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for AccessKey {
    fn clone(&self) -> Self {
        Self(SecretString::from(self.expose().to_owned()))
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessKey([REDACTED])")
    }
}

impl FromStr for AccessKey {
    type Err = SoftovaultError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// Derivation parameters
// ---------------------------------------------------------------------------

/// Parameters for PBKDF2 key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// PBKDF2 iteration count.
    pub iterations: u32,
    /// Salt bytes. Defaults to the fixed system-wide salt.
    pub salt: Vec<u8>,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            salt: DEFAULT_SALT.to_vec(),
        }
    }
}

impl KdfParams {
    /// Same salt, different iteration count.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Same iteration count, different salt. Used when a vault carries its
    /// own plaintext salt instead of the system-wide one.
    pub fn with_salt(mut self, salt: impl Into<Vec<u8>>) -> Self {
        self.salt = salt.into();
        self
    }

    /// Generate a random salt to store next to a new vault.
    pub fn generate_vault_salt() -> Result<[u8; VAULT_SALT_LEN]> {
        let rng = SystemRandom::new();
        let mut salt = [0u8; VAULT_SALT_LEN];
        rng.fill(&mut salt)
            .map_err(|_| SoftovaultError::RandomnessFailure)?;
        Ok(salt)
    }
}

// ---------------------------------------------------------------------------
// Derived key
// ---------------------------------------------------------------------------

/// A 256-bit AES-GCM key derived from an access key.
///
/// - Not `Clone`. Lives only for the duration of an operation.
/// - Zeroised on drop.
/// - Raw bytes are `pub(crate)`; they never leave the crate.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive the field encryption key for an access key.
///
/// Deterministic: identical access key and parameters always produce the
/// same key. Costs `params.iterations` HMAC rounds, so batch callers should
/// derive once and reuse the key.
pub fn derive(access_key: &AccessKey, params: &KdfParams) -> Result<DerivedKey> {
    let iterations = NonZeroU32::new(params.iterations)
        .ok_or_else(|| SoftovaultError::validation("iteration count must be non-zero"))?;

    let mut bytes = [0u8; KEY_LEN];
    pbkdf2::derive(
        PBKDF2_ALG,
        iterations,
        &params.salt,
        access_key.expose().as_bytes(),
        &mut bytes,
    );

    Ok(DerivedKey { bytes })
}
