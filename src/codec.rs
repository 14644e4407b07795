//! Record-level encryption.
//!
//! The codec decides which fields of a record are protected and applies the
//! field cipher to each of them:
//!
//! | Record | Always encrypted | Encrypted when non-empty | Untouched        |
//! |--------|------------------|--------------------------|------------------|
//! | Vault  | `title`          | `description`            | everything else  |
//! | Secret | `key`, `value`   | `description`            | everything else  |
//!
//! An empty description passes through as an empty string and an absent one
//! stays absent. Each single-record operation derives the key once; the
//! `*_with_key` forms take an already derived key so batches pay for PBKDF2
//! only once.

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::crypto::{self, EncryptedField};
use crate::error::{Result, SoftovaultError};
use crate::keys::{self, AccessKey, DerivedKey, KdfParams};
use crate::record::{EncryptedSecret, EncryptedVault, Secret, Vault};

/// Whether ciphertexts are bound to the record and field they belong to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldBinding {
    /// No associated data. Ciphertexts of the same vault can be swapped
    /// between fields undetected.
    #[default]
    Unbound,
    /// Authenticate `"<record id>:<field name>"` as associated data. The
    /// record id is empty for records that have none yet.
    RecordField,
}

/// Codec settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub kdf: KdfParams,
    pub binding: FieldBinding,
}

/// Result of decrypting one item of a batch.
#[derive(Debug)]
pub enum SecretOutcome {
    Decrypted(Secret),
    Failed {
        id: Option<Uuid>,
        error: SoftovaultError,
    },
}

impl SecretOutcome {
    pub fn ok(self) -> Option<Secret> {
        match self {
            Self::Decrypted(secret) => Some(secret),
            Self::Failed { .. } => None,
        }
    }
}

/// Applies field encryption to vault and secret records.
#[derive(Debug, Clone, Default)]
pub struct RecordCodec {
    config: CodecConfig,
}

impl RecordCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Derive the field key for `access_key` under this codec's parameters.
    pub fn derive(&self, access_key: &AccessKey) -> Result<DerivedKey> {
        keys::derive(access_key, &self.config.kdf)
    }

    // -- vaults -------------------------------------------------------------

    pub fn encrypt_vault(&self, vault: Vault, access_key: &AccessKey) -> Result<EncryptedVault> {
        let key = self.derive(access_key)?;
        self.encrypt_vault_with_key(vault, &key)
    }

    pub fn encrypt_vault_with_key(&self, vault: Vault, key: &DerivedKey) -> Result<EncryptedVault> {
        let aad = FieldAad::new(self.config.binding, vault.id)?;
        let title = crypto::encrypt_bound(&vault.title, key, &aad.field("title"))?;
        let description =
            encrypt_optional(vault.description.as_deref(), key, &aad.field("description"))?;
        Ok(vault.with_fields(title, description))
    }

    pub fn decrypt_vault(&self, vault: EncryptedVault, access_key: &AccessKey) -> Result<Vault> {
        let key = self.derive(access_key)?;
        self.decrypt_vault_with_key(vault, &key)
    }

    pub fn decrypt_vault_with_key(&self, vault: EncryptedVault, key: &DerivedKey) -> Result<Vault> {
        let aad = FieldAad::new(self.config.binding, vault.id)?;
        let title = crypto::decrypt_bound(&vault.title, key, &aad.field("title"))?;
        let description =
            decrypt_optional(vault.description.as_ref(), key, &aad.field("description"))?;
        Ok(vault.with_fields(title, description))
    }

    // -- secrets ------------------------------------------------------------

    pub fn encrypt_secret(&self, secret: Secret, access_key: &AccessKey) -> Result<EncryptedSecret> {
        let key = self.derive(access_key)?;
        self.encrypt_secret_with_key(secret, &key)
    }

    pub fn encrypt_secret_with_key(
        &self,
        secret: Secret,
        key: &DerivedKey,
    ) -> Result<EncryptedSecret> {
        let aad = FieldAad::new(self.config.binding, secret.id)?;
        let k = crypto::encrypt_bound(&secret.key, key, &aad.field("key"))?;
        let v = crypto::encrypt_bound(&secret.value, key, &aad.field("value"))?;
        let description =
            encrypt_optional(secret.description.as_deref(), key, &aad.field("description"))?;
        Ok(secret.with_fields(k, v, description))
    }

    pub fn decrypt_secret(&self, secret: EncryptedSecret, access_key: &AccessKey) -> Result<Secret> {
        let key = self.derive(access_key)?;
        self.decrypt_secret_with_key(secret, &key)
    }

    pub fn decrypt_secret_with_key(
        &self,
        secret: EncryptedSecret,
        key: &DerivedKey,
    ) -> Result<Secret> {
        let aad = FieldAad::new(self.config.binding, secret.id)?;
        let k = crypto::decrypt_bound(&secret.key, key, &aad.field("key"))?;
        let v = crypto::decrypt_bound(&secret.value, key, &aad.field("value"))?;
        let description =
            decrypt_optional(secret.description.as_ref(), key, &aad.field("description"))?;
        Ok(secret.with_fields(k, v, description))
    }

    // -- batches ------------------------------------------------------------

    /// Decrypt every secret that can be decrypted, skipping the rest.
    ///
    /// A secret that fails is logged with its id and left out of the result;
    /// it never aborts the batch. Survivors keep their input order.
    pub fn decrypt_secrets(
        &self,
        secrets: Vec<EncryptedSecret>,
        access_key: &AccessKey,
    ) -> Result<Vec<Secret>> {
        let key = self.derive(access_key)?;
        Ok(self.decrypt_secrets_with_key(secrets, &key))
    }

    pub fn decrypt_secrets_with_key(
        &self,
        secrets: Vec<EncryptedSecret>,
        key: &DerivedKey,
    ) -> Vec<Secret> {
        self.decrypt_each(secrets, key)
            .filter_map(SecretOutcome::ok)
            .collect()
    }

    /// Like [`decrypt_secrets`](Self::decrypt_secrets), but reports one
    /// outcome per input so callers can tell a failed secret from a missing
    /// one.
    pub fn decrypt_secrets_detailed(
        &self,
        secrets: Vec<EncryptedSecret>,
        access_key: &AccessKey,
    ) -> Result<Vec<SecretOutcome>> {
        let key = self.derive(access_key)?;
        Ok(self.decrypt_each(secrets, &key).collect())
    }

    fn decrypt_each<'a>(
        &'a self,
        secrets: Vec<EncryptedSecret>,
        key: &'a DerivedKey,
    ) -> impl Iterator<Item = SecretOutcome> + 'a {
        secrets.into_iter().map(move |secret| {
            let id = secret.id;
            match self.decrypt_secret_with_key(secret, key) {
                Ok(plain) => SecretOutcome::Decrypted(plain),
                Err(error) => {
                    warn!(secret_id = ?id, error = %error, "skipping secret that failed to decrypt");
                    SecretOutcome::Failed { id, error }
                }
            }
        })
    }
}

/// Builds the associated data for each field of one record.
struct FieldAad {
    prefix: Option<String>,
}

impl FieldAad {
    /// Bound fields name their record, so a record without an id is
    /// rejected rather than sealed under an id the store assigns later.
    fn new(binding: FieldBinding, id: Option<Uuid>) -> Result<Self> {
        let prefix = match (binding, id) {
            (FieldBinding::Unbound, _) => None,
            (FieldBinding::RecordField, Some(id)) => Some(id.to_string()),
            (FieldBinding::RecordField, None) => {
                return Err(SoftovaultError::validation(
                    "record id required for bound fields",
                ))
            }
        };
        Ok(Self { prefix })
    }

    fn field(&self, name: &str) -> Vec<u8> {
        match &self.prefix {
            None => Vec::new(),
            Some(prefix) => format!("{prefix}:{name}").into_bytes(),
        }
    }
}

fn encrypt_optional(
    plaintext: Option<&str>,
    key: &DerivedKey,
    aad: &[u8],
) -> Result<Option<EncryptedField>> {
    match plaintext {
        None => Ok(None),
        Some("") => Ok(Some(EncryptedField::from_stored(String::new()))),
        Some(text) => crypto::encrypt_bound(text, key, aad).map(Some),
    }
}

fn decrypt_optional(
    field: Option<&EncryptedField>,
    key: &DerivedKey,
    aad: &[u8],
) -> Result<Option<String>> {
    match field {
        None => Ok(None),
        Some(f) if f.is_empty() => Ok(Some(String::new())),
        Some(f) => crypto::decrypt_bound(f, key, aad).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(binding: FieldBinding) -> RecordCodec {
        RecordCodec::new(CodecConfig {
            kdf: KdfParams::default().with_iterations(1_000),
            binding,
        })
    }

    fn ak() -> AccessKey {
        AccessKey::new("codec-key").unwrap()
    }

    #[test]
    fn test_empty_description_passes_through() {
        let c = codec(FieldBinding::Unbound);
        let enc = c
            .encrypt_vault(Vault::new("T").with_description(""), &ak())
            .unwrap();
        assert_eq!(enc.description.as_ref().map(EncryptedField::as_str), Some(""));
        let dec = c.decrypt_vault(enc, &ak()).unwrap();
        assert_eq!(dec.description.as_deref(), Some(""));
    }

    #[test]
    fn test_bound_fields_cannot_be_swapped() {
        let c = codec(FieldBinding::RecordField);
        let mut secret = Secret::new("KEY", "VAL");
        secret.id = Some(Uuid::new_v4());
        let mut enc = c.encrypt_secret(secret, &ak()).unwrap();
        std::mem::swap(&mut enc.key, &mut enc.value);
        assert!(c.decrypt_secret(enc, &ak()).unwrap_err().is_decryption());
    }

    #[test]
    fn test_bound_field_tied_to_record_id() {
        let c = codec(FieldBinding::RecordField);
        let mut secret = Secret::new("KEY", "VAL");
        secret.id = Some(Uuid::new_v4());
        let mut enc = c.encrypt_secret(secret, &ak()).unwrap();
        enc.id = Some(Uuid::new_v4());
        assert!(c.decrypt_secret(enc, &ak()).is_err());
    }

    #[test]
    fn test_bound_fields_require_record_id() {
        let c = codec(FieldBinding::RecordField);
        let err = c.encrypt_secret(Secret::new("K", "V"), &ak()).unwrap_err();
        assert!(matches!(err, SoftovaultError::Validation(_)));
        let err = c.encrypt_vault(Vault::new("T"), &ak()).unwrap_err();
        assert!(matches!(err, SoftovaultError::Validation(_)));

        let mut secret = Secret::new("K", "V");
        secret.id = Some(Uuid::new_v4());
        let mut enc = c.encrypt_secret(secret, &ak()).unwrap();
        enc.id = None;
        let err = c.decrypt_secret(enc, &ak()).unwrap_err();
        assert!(matches!(err, SoftovaultError::Validation(_)));
    }

    #[test]
    fn test_unbound_swap_goes_undetected() {
        let c = codec(FieldBinding::Unbound);
        let mut enc = c.encrypt_secret(Secret::new("KEY", "VAL"), &ak()).unwrap();
        std::mem::swap(&mut enc.key, &mut enc.value);
        let dec = c.decrypt_secret(enc, &ak()).unwrap();
        assert_eq!(dec.key, "VAL");
    }

    #[test]
    fn test_detailed_reports_every_item() {
        let c = codec(FieldBinding::Unbound);
        let good = c.encrypt_secret(Secret::new("A", "1"), &ak()).unwrap();
        let mut bad = c.encrypt_secret(Secret::new("B", "2"), &ak()).unwrap();
        bad.id = Some(Uuid::new_v4());
        bad.value = EncryptedField::from_stored("garbage");

        let outcomes = c.decrypt_secrets_detailed(vec![good, bad.clone()], &ak()).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0], SecretOutcome::Decrypted(_)));
        match &outcomes[1] {
            SecretOutcome::Failed { id, error } => {
                assert_eq!(*id, bad.id);
                assert!(error.is_decryption());
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
