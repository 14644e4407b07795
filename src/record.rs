//! Vault and secret records.
//!
//! Both record kinds are generic over the type of their protected fields:
//! `String` for plaintext, [`EncryptedField`] for what the store holds.
//! Ids, timestamps, ownership and any column this crate does not know about
//! are carried through untouched.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::crypto::EncryptedField;

/// A vault: a named collection of secrets owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct VaultRecord<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub title: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Columns passed through without interpretation.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single key/value secret belonging to exactly one vault.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct SecretRecord<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_id: Option<Uuid>,
    pub key: T,
    pub value: T,
    #[serde(default)]
    pub description: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type Vault = VaultRecord<String>;
pub type EncryptedVault = VaultRecord<EncryptedField>;
pub type Secret = SecretRecord<String>;
pub type EncryptedSecret = SecretRecord<EncryptedField>;

impl Vault {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            user_id: None,
            title: title.into(),
            description: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Secret {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            vault_id: None,
            key: key.into(),
            value: value.into(),
            description: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl<T> VaultRecord<T> {
    /// Rebuild the record with its protected fields swapped for `title` and
    /// `description`; everything else is moved across as is.
    pub(crate) fn with_fields<U>(self, title: U, description: Option<U>) -> VaultRecord<U> {
        VaultRecord {
            id: self.id,
            user_id: self.user_id,
            title,
            description,
            created_at: self.created_at,
            updated_at: self.updated_at,
            extra: self.extra,
        }
    }
}

impl<T> SecretRecord<T> {
    pub(crate) fn with_fields<U>(self, key: U, value: U, description: Option<U>) -> SecretRecord<U> {
        SecretRecord {
            id: self.id,
            vault_id: self.vault_id,
            key,
            value,
            description,
            created_at: self.created_at,
            updated_at: self.updated_at,
            extra: self.extra,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SecretRecord<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("id", &self.id)
            .field("vault_id", &self.vault_id)
            .field("key", &self.key)
            .field("value", &"[REDACTED]")
            .field("description", &self.description)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Records addressable by id, for caches and batch reporting.
pub trait Identified {
    fn record_id(&self) -> Option<Uuid>;
}

impl<T> Identified for VaultRecord<T> {
    fn record_id(&self) -> Option<Uuid> {
        self.id
    }
}

impl<T> Identified for SecretRecord<T> {
    fn record_id(&self) -> Option<Uuid> {
        self.id
    }
}
