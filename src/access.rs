//! Access-key driven vault operations.
//!
//! [`VaultApi`] is what an HTTP layer calls: it extracts the bearer access
//! key, resolves it through the gateway, moves ciphertext between the store
//! and the codec, and logs the access. Plaintext is only ever produced for
//! the holder of the access key.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AccessLog, AccessOperation, AccessRecord, AccessSink, AccessSinks};
use crate::codec::RecordCodec;
use crate::config::SoftovaultConfig;
use crate::error::{Result, SoftovaultError};
use crate::gateway::{bearer_access_key, StoreGateway, VaultAccessGateway, VaultIdentity};
use crate::keys::AccessKey;
use crate::limits::{check_secret_limit, check_vault_limit, LimitsConfig, Profile};
use crate::record::{EncryptedSecret, EncryptedVault, Secret, Vault};
use crate::store::VaultStore;

/// All secrets of a vault as a flat key/value map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretsResponse {
    pub success: bool,
    pub secrets: BTreeMap<String, String>,
    pub count: usize,
}

/// One secret looked up by its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretResponse {
    pub success: bool,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Secret> for SecretResponse {
    fn from(secret: Secret) -> Self {
        Self {
            success: true,
            key: secret.key,
            value: secret.value,
            description: secret.description,
            created_at: secret.created_at,
            updated_at: secret.updated_at,
        }
    }
}

/// A newly created vault and the access key that unlocks it. The key is
/// shown to the owner once; only its lookup copy is stored.
#[derive(Debug)]
pub struct CreatedVault {
    pub vault: EncryptedVault,
    pub access_key: AccessKey,
}

/// Vault operations authorized by access key.
pub struct VaultApi<S> {
    gateway: StoreGateway<S>,
    codec: RecordCodec,
    limits: LimitsConfig,
    log: Mutex<AccessLog>,
    sinks: Mutex<AccessSinks>,
}

impl<S> std::fmt::Debug for VaultApi<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultApi")
            .field("codec", &self.codec)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl<S: VaultStore> VaultApi<S> {
    pub fn new(store: S, config: SoftovaultConfig) -> Self {
        Self {
            gateway: StoreGateway::new(store),
            codec: RecordCodec::new(config.codec),
            limits: config.limits,
            log: Mutex::new(AccessLog::with_retention(config.audit.retain)),
            sinks: Mutex::new(AccessSinks::new()),
        }
    }

    pub fn store(&self) -> &S {
        self.gateway.store()
    }

    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    /// Forward every future access record to `sink`.
    pub fn add_access_sink(&self, sink: Box<dyn AccessSink>) -> Result<()> {
        self.sinks
            .lock()
            .map_err(|_| SoftovaultError::Store("access sinks lock poisoned".to_string()))?
            .add(sink);
        Ok(())
    }

    /// Snapshot of the most recent accesses, oldest first.
    pub fn access_log(&self) -> Result<Vec<AccessRecord>> {
        Ok(self.lock_log()?.iter().cloned().collect())
    }

    /// Every decryptable secret of the vault as `key -> value`.
    ///
    /// Secrets that fail to decrypt are left out; `count` is the number of
    /// secrets returned.
    pub fn all_secrets(&self, authorization: Option<&str>) -> Result<SecretsResponse> {
        let (access_key, vault) = self.authorize(authorization)?;
        let rows = self.store().secrets_for_vault(vault.vault_id)?;
        let total = rows.len();
        let secrets = self.codec.decrypt_secrets(rows, &access_key)?;
        if secrets.len() < total {
            warn!(
                vault_id = %vault.vault_id,
                skipped = total - secrets.len(),
                "some secrets could not be decrypted"
            );
        }

        self.record(vault.vault_id, AccessOperation::ListSecrets);

        let count = secrets.len();
        let secrets = secrets.into_iter().map(|s| (s.key, s.value)).collect();
        Ok(SecretsResponse {
            success: true,
            secrets,
            count,
        })
    }

    /// The secret whose decrypted key equals `key`.
    pub fn secret_by_key(&self, authorization: Option<&str>, key: &str) -> Result<SecretResponse> {
        let (access_key, vault) = self.authorize(authorization)?;
        if key.is_empty() {
            return Err(SoftovaultError::validation("secret key is required"));
        }
        let rows = self.store().secrets_for_vault(vault.vault_id)?;
        let secret = self
            .codec
            .decrypt_secrets(rows, &access_key)?
            .into_iter()
            .find(|s| s.key == key)
            .ok_or_else(|| SoftovaultError::NotFound(format!("secret with key '{key}'")))?;

        self.record(vault.vault_id, AccessOperation::ReadSecret);
        Ok(secret.into())
    }

    /// Create a vault for `owner` behind a freshly generated access key.
    pub fn create_vault(
        &self,
        owner: Uuid,
        profile: Option<&Profile>,
        mut vault: Vault,
    ) -> Result<CreatedVault> {
        let current = self.store().count_vaults_for_user(owner)?;
        check_vault_limit(&self.limits, profile, current).into_result()?;

        let access_key = AccessKey::generate()?;
        vault.user_id = Some(owner);
        // Ids are assigned before sealing so that bound fields can name them.
        vault.id.get_or_insert_with(Uuid::new_v4);
        let sealed = self.codec.encrypt_vault(vault, &access_key)?;
        let stored = self.store().insert_vault(sealed, &access_key)?;

        if let Some(id) = stored.id {
            info!(vault_id = %id, "vault created");
            self.record(id, AccessOperation::CreateVault);
        }
        Ok(CreatedVault {
            vault: stored,
            access_key,
        })
    }

    /// Add a secret to the vault the access key unlocks.
    pub fn create_secret(
        &self,
        authorization: Option<&str>,
        profile: Option<&Profile>,
        mut secret: Secret,
    ) -> Result<EncryptedSecret> {
        let (access_key, vault) = self.authorize(authorization)?;
        let current = self.store().count_secrets_for_vault(vault.vault_id)?;
        check_secret_limit(&self.limits, profile, current).into_result()?;

        secret.vault_id = Some(vault.vault_id);
        secret.id.get_or_insert_with(Uuid::new_v4);
        let sealed = self.codec.encrypt_secret(secret, &access_key)?;
        let stored = self.store().insert_secret(vault.vault_id, sealed)?;

        self.record(vault.vault_id, AccessOperation::CreateSecret);
        Ok(stored)
    }

    /// Decrypt the vault's own title and description.
    pub fn vault_details(&self, authorization: Option<&str>) -> Result<Vault> {
        let (access_key, vault) = self.authorize(authorization)?;
        let sealed = self
            .store()
            .find_vault_by_access_key(&access_key)?
            .ok_or_else(|| SoftovaultError::authz("invalid access key"))?;
        let plain = self.codec.decrypt_vault(sealed, &access_key)?;

        self.record(vault.vault_id, AccessOperation::ReadVault);
        Ok(plain)
    }

    fn authorize(&self, authorization: Option<&str>) -> Result<(AccessKey, VaultIdentity)> {
        let access_key = bearer_access_key(authorization)?;
        let identity = self.gateway.resolve(&access_key)?;
        Ok((access_key, identity))
    }

    /// The log lock is released before sinks run, so readers of the log
    /// never wait on sink I/O.
    fn record(&self, vault_id: Uuid, operation: AccessOperation) {
        let record = AccessRecord::now(vault_id, operation);
        match self.lock_log() {
            Ok(mut log) => log.append(record.clone()),
            Err(e) => warn!(%vault_id, error = %e, "access not logged"),
        }
        match self.sinks.lock() {
            Ok(mut sinks) => sinks.forward(&record),
            Err(_) => warn!(%vault_id, "access not forwarded: sinks lock poisoned"),
        }
    }

    fn lock_log(&self) -> Result<std::sync::MutexGuard<'_, AccessLog>> {
        self.log
            .lock()
            .map_err(|_| SoftovaultError::Store("access log lock poisoned".to_string()))
    }
}
