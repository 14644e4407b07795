//! Record cache keyed by collection.
//!
//! Holds the rows of each opened collection (the vaults of a user, the
//! secrets of a vault) and keeps them current from change events. A
//! collection exists only between `open` and `close`; events for anything
//! not open are dropped.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::record::Identified;

/// A row-level change delivered by the store's change feed.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<T> {
    Insert(T),
    Update(T),
    Delete { id: Uuid },
}

/// Per-collection row cache with an explicit open/close lifecycle.
#[derive(Debug)]
pub struct RecordCache<T> {
    collections: HashMap<Uuid, Vec<T>>,
}

impl<T> Default for RecordCache<T> {
    fn default() -> Self {
        Self {
            collections: HashMap::new(),
        }
    }
}

impl<T: Identified> RecordCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `collection` with its current rows, newest first.
    /// Reopening replaces the cached rows.
    pub fn open(&mut self, collection: Uuid, rows: Vec<T>) {
        self.collections.insert(collection, rows);
    }

    pub fn is_open(&self, collection: Uuid) -> bool {
        self.collections.contains_key(&collection)
    }

    pub fn get(&self, collection: Uuid) -> Option<&[T]> {
        self.collections.get(&collection).map(Vec::as_slice)
    }

    /// Apply one change. Returns false when the collection is not open.
    pub fn apply(&mut self, collection: Uuid, event: ChangeEvent<T>) -> bool {
        let Some(rows) = self.collections.get_mut(&collection) else {
            debug!(%collection, "dropping change for closed collection");
            return false;
        };
        match event {
            ChangeEvent::Insert(row) => rows.insert(0, row),
            ChangeEvent::Update(row) => {
                let id = row.record_id();
                if let Some(slot) = rows.iter_mut().find(|r| id.is_some() && r.record_id() == id) {
                    *slot = row;
                }
            }
            ChangeEvent::Delete { id } => rows.retain(|r| r.record_id() != Some(id)),
        }
        true
    }

    /// Stop tracking `collection` and hand back its rows.
    pub fn close(&mut self, collection: Uuid) -> Option<Vec<T>> {
        self.collections.remove(&collection)
    }

    /// Close every collection.
    pub fn clear(&mut self) {
        self.collections.clear();
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EncryptedField;
    use crate::record::{EncryptedSecret, SecretRecord};
    use serde_json::Map;

    fn row(id: Uuid, value: &str) -> EncryptedSecret {
        SecretRecord {
            id: Some(id),
            vault_id: None,
            key: EncryptedField::from_stored("k"),
            value: EncryptedField::from_stored(value),
            description: None,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_events_follow_lifecycle() {
        let vault = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut cache = RecordCache::new();

        assert!(!cache.apply(vault, ChangeEvent::Insert(row(a, "x"))));

        cache.open(vault, vec![row(a, "1")]);
        assert!(cache.apply(vault, ChangeEvent::Insert(row(b, "2"))));
        assert_eq!(cache.get(vault).unwrap()[0].id, Some(b));

        cache.apply(vault, ChangeEvent::Update(row(a, "1b")));
        let rows = cache.get(vault).unwrap();
        assert_eq!(rows[1].value.as_str(), "1b");

        cache.apply(vault, ChangeEvent::Delete { id: b });
        assert_eq!(cache.get(vault).unwrap().len(), 1);

        assert_eq!(cache.close(vault).unwrap().len(), 1);
        assert!(!cache.is_open(vault));
    }

    #[test]
    fn test_clear_closes_everything() {
        let mut cache: RecordCache<EncryptedSecret> = RecordCache::new();
        cache.open(Uuid::new_v4(), Vec::new());
        cache.open(Uuid::new_v4(), Vec::new());
        cache.clear();
        assert!(cache.is_empty());
    }
}
