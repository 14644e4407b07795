//! Field-level authenticated encryption.
//!
//! This module is one of exactly two places in the crate that import `ring`
//! directly (the other is `keys`). Records are encrypted exclusively through
//! the functions exposed here.
//!
//! Primitive choices:
//! - **Cipher**: AES-256-GCM
//! - **Nonce**: 96-bit, generated fresh per call via `SystemRandom`
//! - **Encoding**: standard base64 with padding
//!
//! # Stored layout of an [`EncryptedField`]
//! ```text
//! base64( [ nonce (12 bytes) ][ ciphertext ][ GCM tag (16 bytes) ] )
//! ```

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SoftovaultError};
use crate::keys::DerivedKey;

/// The AEAD algorithm used throughout softovault.
const ALGORITHM: &aead::Algorithm = &AES_256_GCM;

/// Size of the nonce in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Size of a derived key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// A ciphertext unit as persisted and transmitted.
///
/// Created fresh by every [`encrypt`] call; two encryptions of the same
/// plaintext under the same key never produce the same field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedField(String);

impl EncryptedField {
    /// Wrap a string read back from storage. No validation happens until
    /// the field is decrypted.
    pub fn from_stored(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EncryptedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encrypt a plaintext field without associated data.
pub fn encrypt(plaintext: &str, key: &DerivedKey) -> Result<EncryptedField> {
    encrypt_bound(plaintext, key, &[])
}

/// Decrypt a field produced by [`encrypt`].
///
/// Every failure, whatever its cause, surfaces as
/// [`SoftovaultError::Decryption`].
pub fn decrypt(field: &EncryptedField, key: &DerivedKey) -> Result<String> {
    decrypt_bound(field, key, &[])
}

/// Encrypt a plaintext field, authenticating `aad` alongside it.
pub fn encrypt_bound(plaintext: &str, key: &DerivedKey, aad: &[u8]) -> Result<EncryptedField> {
    let sealed = seal(key.as_bytes(), plaintext.as_bytes(), aad)?;
    Ok(EncryptedField(STANDARD.encode(sealed)))
}

/// Decrypt a field produced by [`encrypt_bound`] with the same `aad`.
pub fn decrypt_bound(field: &EncryptedField, key: &DerivedKey, aad: &[u8]) -> Result<String> {
    let sealed = STANDARD.decode(field.as_str()).map_err(|e| {
        debug!(error = %e, "encrypted field is not valid base64");
        SoftovaultError::Decryption
    })?;

    let plaintext = open(key.as_bytes(), &sealed, aad)?;

    String::from_utf8(plaintext).map_err(|_| {
        debug!("decrypted field is not valid UTF-8");
        SoftovaultError::Decryption
    })
}

/// Generate a cryptographically secure random nonce.
///
/// A fresh nonce is drawn for every encryption call. There is no nonce
/// caching or counter-based generation.
fn generate_nonce() -> Result<[u8; NONCE_LEN]> {
    let rng = SystemRandom::new();
    let mut buf = [0u8; NONCE_LEN];
    rng.fill(&mut buf)
        .map_err(|_| SoftovaultError::RandomnessFailure)?;
    Ok(buf)
}

/// Seal `plaintext` and return `nonce || ciphertext || tag`.
fn seal(key_bytes: &[u8; KEY_LEN], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let unbound =
        UnboundKey::new(ALGORITHM, key_bytes).map_err(|_| SoftovaultError::EncryptionFailure)?;
    let key = LessSafeKey::new(unbound);

    let nonce_bytes = generate_nonce()?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(nonce, Aad::from(aad), &mut in_out)
        .map_err(|_| SoftovaultError::EncryptionFailure)?;

    let mut output = Vec::with_capacity(NONCE_LEN + in_out.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&in_out);
    Ok(output)
}

/// Open a `nonce || ciphertext || tag` blob. The caller receives no partial
/// plaintext on failure.
fn open(key_bytes: &[u8; KEY_LEN], sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        debug!(len = sealed.len(), "encrypted field too short");
        return Err(SoftovaultError::Decryption);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| SoftovaultError::Decryption)?;

    let unbound =
        UnboundKey::new(ALGORITHM, key_bytes).map_err(|_| SoftovaultError::Decryption)?;
    let key = LessSafeKey::new(unbound);

    let mut payload = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(nonce, Aad::from(aad), &mut payload)
        .map_err(|_| {
            debug!("AEAD authentication failed");
            SoftovaultError::Decryption
        })?;

    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{derive, AccessKey, KdfParams};

    fn key(s: &str) -> DerivedKey {
        let params = KdfParams::default().with_iterations(1_000);
        derive(&AccessKey::new(s).unwrap(), &params).unwrap()
    }

    #[test]
    fn test_layout_sizes() {
        let k = key("layout");
        let field = encrypt("hello", &k).unwrap();
        let raw = STANDARD.decode(field.as_str()).unwrap();
        assert_eq!(raw.len(), NONCE_LEN + "hello".len() + TAG_LEN);
    }

    #[test]
    fn test_empty_plaintext_round_trips() {
        let k = key("empty");
        let field = encrypt("", &k).unwrap();
        assert_eq!(decrypt(&field, &k).unwrap(), "");
    }

    #[test]
    fn test_short_and_garbage_input_is_decryption_error() {
        let k = key("short");
        for stored in ["", "AAAA", "not base64 at all!", &STANDARD.encode([0u8; 20])] {
            let err = decrypt(&EncryptedField::from_stored(stored), &k).unwrap_err();
            assert!(err.is_decryption(), "{stored:?} gave {err:?}");
        }
    }

    #[test]
    fn test_associated_data_must_match() {
        let k = key("aad");
        let field = encrypt_bound("v", &k, b"rec-1:value").unwrap();
        assert_eq!(decrypt_bound(&field, &k, b"rec-1:value").unwrap(), "v");
        assert!(decrypt_bound(&field, &k, b"rec-2:value").is_err());
        assert!(decrypt(&field, &k).is_err());
    }

    #[test]
    fn test_serde_is_a_bare_string() {
        let field = EncryptedField::from_stored("abc=");
        assert_eq!(serde_json::to_string(&field).unwrap(), "\"abc=\"");
    }
}
