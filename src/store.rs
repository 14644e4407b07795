//! The relational store seam.
//!
//! The vault and secret tables live in an external database. The crate only
//! needs the handful of queries below; [`MemoryVaultStore`] implements them
//! in memory for tests and demos. Stores only ever see ciphertext records
//! and the plaintext lookup access key.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Result, SoftovaultError};
use crate::keys::AccessKey;
use crate::record::{EncryptedSecret, EncryptedVault};

/// Queries the crate issues against the vault database.
pub trait VaultStore: Send + Sync {
    /// Look up the vault whose access key column equals `access_key`.
    fn find_vault_by_access_key(&self, access_key: &AccessKey) -> Result<Option<EncryptedVault>>;

    /// Mark the vault as accessed at `at`.
    fn record_vault_access(&self, vault_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// All secrets of a vault, oldest first.
    fn secrets_for_vault(&self, vault_id: Uuid) -> Result<Vec<EncryptedSecret>>;

    /// Insert a vault under its lookup key. Returns the stored row with id
    /// and timestamps filled in.
    fn insert_vault(&self, vault: EncryptedVault, access_key: &AccessKey) -> Result<EncryptedVault>;

    /// Insert a secret into `vault_id`. Returns the stored row.
    fn insert_secret(&self, vault_id: Uuid, secret: EncryptedSecret) -> Result<EncryptedSecret>;

    fn count_vaults_for_user(&self, user_id: Uuid) -> Result<usize>;

    fn count_secrets_for_vault(&self, vault_id: Uuid) -> Result<usize>;
}

#[derive(Default)]
struct Tables {
    vaults: HashMap<Uuid, EncryptedVault>,
    /// access key -> vault id
    lookup: HashMap<String, Uuid>,
    secrets: Vec<EncryptedSecret>,
}

/// An in-memory [`VaultStore`].
#[derive(Default)]
pub struct MemoryVaultStore {
    tables: RwLock<Tables>,
}

impl MemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| SoftovaultError::Store("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| SoftovaultError::Store("store lock poisoned".to_string()))
    }

    /// Overwrite a stored secret wholesale. Handy for simulating damaged rows.
    pub fn replace_secret(&self, secret: EncryptedSecret) -> Result<()> {
        let mut tables = self.write()?;
        let slot = tables
            .secrets
            .iter_mut()
            .find(|s| s.id.is_some() && s.id == secret.id)
            .ok_or_else(|| SoftovaultError::NotFound("secret".to_string()))?;
        *slot = secret;
        Ok(())
    }
}

impl std::fmt::Debug for MemoryVaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts = self
            .tables
            .read()
            .map(|t| (t.vaults.len(), t.secrets.len()))
            .ok();
        f.debug_struct("MemoryVaultStore")
            .field("vaults_and_secrets", &counts)
            .finish()
    }
}

impl VaultStore for MemoryVaultStore {
    fn find_vault_by_access_key(&self, access_key: &AccessKey) -> Result<Option<EncryptedVault>> {
        let tables = self.read()?;
        Ok(tables
            .lookup
            .get(access_key.expose())
            .and_then(|id| tables.vaults.get(id))
            .cloned())
    }

    fn record_vault_access(&self, vault_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.write()?;
        let vault = tables
            .vaults
            .get_mut(&vault_id)
            .ok_or_else(|| SoftovaultError::NotFound(format!("vault {vault_id}")))?;
        vault
            .extra
            .insert("last_accessed".to_string(), Value::String(at.to_rfc3339()));
        vault.extra.insert("accessed".to_string(), Value::Bool(true));
        Ok(())
    }

    fn secrets_for_vault(&self, vault_id: Uuid) -> Result<Vec<EncryptedSecret>> {
        let tables = self.read()?;
        let mut rows: Vec<_> = tables
            .secrets
            .iter()
            .filter(|s| s.vault_id == Some(vault_id))
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.created_at);
        Ok(rows)
    }

    fn insert_vault(&self, mut vault: EncryptedVault, access_key: &AccessKey) -> Result<EncryptedVault> {
        let mut tables = self.write()?;
        if tables.lookup.contains_key(access_key.expose()) {
            return Err(SoftovaultError::Store("access key already in use".to_string()));
        }
        let now = Utc::now();
        let id = *vault.id.get_or_insert_with(Uuid::new_v4);
        vault.created_at.get_or_insert(now);
        vault.updated_at.get_or_insert(now);
        tables.lookup.insert(access_key.expose().to_owned(), id);
        tables.vaults.insert(id, vault.clone());
        Ok(vault)
    }

    fn insert_secret(&self, vault_id: Uuid, mut secret: EncryptedSecret) -> Result<EncryptedSecret> {
        let mut tables = self.write()?;
        if !tables.vaults.contains_key(&vault_id) {
            return Err(SoftovaultError::NotFound(format!("vault {vault_id}")));
        }
        let now = Utc::now();
        secret.id.get_or_insert_with(Uuid::new_v4);
        secret.vault_id = Some(vault_id);
        secret.created_at.get_or_insert(now);
        secret.updated_at.get_or_insert(now);
        tables.secrets.push(secret.clone());
        Ok(secret)
    }

    fn count_vaults_for_user(&self, user_id: Uuid) -> Result<usize> {
        let tables = self.read()?;
        Ok(tables
            .vaults
            .values()
            .filter(|v| v.user_id == Some(user_id))
            .count())
    }

    fn count_secrets_for_vault(&self, vault_id: Uuid) -> Result<usize> {
        let tables = self.read()?;
        Ok(tables
            .secrets
            .iter()
            .filter(|s| s.vault_id == Some(vault_id))
            .count())
    }
}
