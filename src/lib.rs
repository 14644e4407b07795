//! # softovault
//!
//! Zero-knowledge secrets vault.
//!
//! A vault is a collection of key/value secrets protected by an opaque access
//! key. The access key is the only credential for the vault's contents: the
//! field encryption key is derived from it with PBKDF2-HMAC-SHA256, and every
//! protected field is sealed with AES-256-GCM before it reaches storage. The
//! store only ever sees ciphertext plus the plaintext lookup key.
//!
//! ## Public API
//!
//! - [`keys`]: access keys and key derivation
//! - [`crypto`]: the field cipher and the stored [`EncryptedField`] format
//! - [`codec`]: which record fields are encrypted, single and batch forms
//! - [`gateway`] and [`access`]: access-key authorization and the operations
//!   an HTTP layer calls
//!
//! The free functions below use the default scheme and take the access key
//! as a plain string.

pub mod access;
pub mod audit;
pub mod cache;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod gateway;
pub mod keys;
pub mod limits;
pub mod record;
pub mod store;

pub use codec::{CodecConfig, FieldBinding, RecordCodec, SecretOutcome};
pub use config::SoftovaultConfig;
pub use crypto::EncryptedField;
pub use error::{Result, SoftovaultError};
pub use keys::{AccessKey, DerivedKey, KdfParams};
pub use record::{EncryptedSecret, EncryptedVault, Secret, Vault};

// ---------------------------------------------------------------------------
// Default-scheme shortcuts
// ---------------------------------------------------------------------------

/// Derive the field encryption key for `access_key`.
pub fn derive_encryption_key(access_key: &str) -> Result<DerivedKey> {
    keys::derive(&AccessKey::new(access_key)?, &KdfParams::default())
}

pub fn encrypt_vault_data(vault: Vault, access_key: &str) -> Result<EncryptedVault> {
    RecordCodec::default().encrypt_vault(vault, &AccessKey::new(access_key)?)
}

pub fn decrypt_vault_data(vault: EncryptedVault, access_key: &str) -> Result<Vault> {
    RecordCodec::default().decrypt_vault(vault, &AccessKey::new(access_key)?)
}

pub fn encrypt_secret_data(secret: Secret, access_key: &str) -> Result<EncryptedSecret> {
    RecordCodec::default().encrypt_secret(secret, &AccessKey::new(access_key)?)
}

pub fn decrypt_secret_data(secret: EncryptedSecret, access_key: &str) -> Result<Secret> {
    RecordCodec::default().decrypt_secret(secret, &AccessKey::new(access_key)?)
}

/// Decrypt a batch, skipping (and logging) secrets that fail.
pub fn decrypt_secrets(secrets: Vec<EncryptedSecret>, access_key: &str) -> Result<Vec<Secret>> {
    RecordCodec::default().decrypt_secrets(secrets, &AccessKey::new(access_key)?)
}
