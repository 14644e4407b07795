//! Vault access log.
//!
//! Records every authorized access to a vault. The in-memory log keeps only
//! the most recent records; durable history belongs in a sink ([`AccessSinks`]
//! fans each record out to files, queues and the like).
//! Records carry the vault id only; access keys never reach the log.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// A sink that receives access records.
pub trait AccessSink: Send {
    /// Called once for every appended record.
    fn append(&mut self, record: &AccessRecord);
}

/// What the caller did with the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOperation {
    CreateVault,
    ReadVault,
    ListSecrets,
    ReadSecret,
    CreateSecret,
}

/// A permanent record of one vault access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub vault_id: Uuid,
    pub operation: AccessOperation,
    pub timestamp: DateTime<Utc>,
}

impl AccessRecord {
    pub fn now(vault_id: Uuid, operation: AccessOperation) -> Self {
        Self {
            vault_id,
            operation,
            timestamp: Utc::now(),
        }
    }
}

/// Records kept in memory when no retention is configured.
pub const DEFAULT_RETAIN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// How many recent records the in-memory log keeps. `0` keeps none.
    pub retain: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            retain: DEFAULT_RETAIN,
        }
    }
}

/// The most recent vault accesses, oldest first.
#[derive(Debug, Clone)]
pub struct AccessLog {
    records: VecDeque<AccessRecord>,
    retain: usize,
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETAIN)
    }
}

impl AccessLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retain: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(retain.min(DEFAULT_RETAIN)),
            retain,
        }
    }

    /// Append `record`, evicting the oldest one once the log is full.
    pub fn append(&mut self, record: AccessRecord) {
        if self.retain == 0 {
            return;
        }
        while self.records.len() >= self.retain {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn retain(&self) -> usize {
        self.retain
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, AccessRecord> {
        self.records.iter()
    }
}

/// Forwards every record to each registered sink, in registration order.
#[derive(Default)]
pub struct AccessSinks {
    sinks: Vec<Box<dyn AccessSink>>,
}

impl std::fmt::Debug for AccessSinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessSinks")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl AccessSinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: Box<dyn AccessSink>) {
        self.sinks.push(sink);
    }

    pub fn forward(&mut self, record: &AccessRecord) {
        for sink in self.sinks.iter_mut() {
            sink.append(record);
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: file
// ---------------------------------------------------------------------------

/// Writes access records as JSON lines, appending to the file.
pub struct FileAccessSink {
    file: std::fs::File,
}

impl FileAccessSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

impl AccessSink for FileAccessSink {
    fn append(&mut self, record: &AccessRecord) {
        let written = serde_json::to_string(record)
            .map_err(std::io::Error::other)
            .and_then(|line| writeln!(self.file, "{line}"))
            .and_then(|_| self.file.flush());
        if let Err(e) = written {
            warn!(error = %e, "failed to write access record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.jsonl");

        let mut sinks = AccessSinks::new();
        sinks.add(Box::new(FileAccessSink::new(&path).unwrap()));

        let vault_id = Uuid::new_v4();
        sinks.forward(&AccessRecord::now(vault_id, AccessOperation::ListSecrets));
        sinks.forward(&AccessRecord::now(vault_id, AccessOperation::ReadSecret));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<AccessRecord> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].operation, AccessOperation::ReadSecret);
    }

    #[test]
    fn test_log_keeps_only_recent_records() {
        let vault_id = Uuid::new_v4();
        let mut log = AccessLog::with_retention(2);
        for op in [
            AccessOperation::CreateVault,
            AccessOperation::ListSecrets,
            AccessOperation::ReadSecret,
        ] {
            log.append(AccessRecord::now(vault_id, op));
        }
        let ops: Vec<_> = log.iter().map(|r| r.operation).collect();
        assert_eq!(ops, vec![AccessOperation::ListSecrets, AccessOperation::ReadSecret]);

        let mut none = AccessLog::with_retention(0);
        none.append(AccessRecord::now(vault_id, AccessOperation::ReadVault));
        assert!(none.is_empty());
    }

    #[test]
    fn test_default_retention_is_bounded() {
        let vault_id = Uuid::new_v4();
        let mut log = AccessLog::new();
        for _ in 0..DEFAULT_RETAIN + 10 {
            log.append(AccessRecord::now(vault_id, AccessOperation::ListSecrets));
        }
        assert_eq!(log.len(), DEFAULT_RETAIN);
        assert_eq!(AuditConfig::default().retain, log.retain());
    }
}
