//! Access-key authorization.
//!
//! The gateway is trust-equivalent to the access key: whoever presents a key
//! that resolves to a vault is fully authorized for it. There is no second
//! factor and no user session involved. The cipher layer performs no
//! authorization of its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{Result, SoftovaultError};
use crate::keys::AccessKey;
use crate::store::VaultStore;

const BEARER_PREFIX: &str = "Bearer ";

/// The plaintext identity of a vault, as known to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultIdentity {
    pub vault_id: Uuid,
    pub owner_user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resolves an access key to the vault it unlocks.
pub trait VaultAccessGateway {
    /// Fails with [`SoftovaultError::Authz`] when the key matches no vault.
    fn resolve(&self, access_key: &AccessKey) -> Result<VaultIdentity>;
}

/// Extract the access key from an `Authorization: Bearer <key>` header value.
pub fn bearer_access_key(header: Option<&str>) -> Result<AccessKey> {
    let token = header
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .ok_or_else(|| {
            SoftovaultError::authz("Authorization header must be in format: Bearer <access_key>")
        })?;
    if token.is_empty() {
        return Err(SoftovaultError::authz("Authorization header required"));
    }
    AccessKey::new(token)
}

/// A gateway backed by a [`VaultStore`].
///
/// Every successful resolution also marks the vault as accessed. Failing to
/// record the access does not fail the resolution.
#[derive(Debug)]
pub struct StoreGateway<S> {
    store: S,
}

impl<S: VaultStore> StoreGateway<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: VaultStore> VaultAccessGateway for StoreGateway<S> {
    fn resolve(&self, access_key: &AccessKey) -> Result<VaultIdentity> {
        let vault = self
            .store
            .find_vault_by_access_key(access_key)?
            .ok_or_else(|| SoftovaultError::authz("invalid access key"))?;

        let incomplete = || SoftovaultError::Store("vault row is missing identity columns".to_string());
        let identity = VaultIdentity {
            vault_id: vault.id.ok_or_else(incomplete)?,
            owner_user_id: vault.user_id.ok_or_else(incomplete)?,
            created_at: vault.created_at.ok_or_else(incomplete)?,
            updated_at: vault.updated_at.ok_or_else(incomplete)?,
        };

        if let Err(e) = self.store.record_vault_access(identity.vault_id, Utc::now()) {
            warn!(vault_id = %identity.vault_id, error = %e, "failed to record vault access");
        }

        Ok(identity)
    }
}
