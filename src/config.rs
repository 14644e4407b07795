//! Crate configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration and yields the standard scheme (100,000 PBKDF2 iterations,
//! fixed salt, unbound fields, the last 1024 accesses kept in memory).

use serde::{Deserialize, Serialize};

use crate::audit::AuditConfig;
use crate::codec::CodecConfig;
use crate::error::{Result, SoftovaultError};
use crate::limits::LimitsConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftovaultConfig {
    pub codec: CodecConfig,
    pub limits: LimitsConfig,
    pub audit: AuditConfig,
}

impl SoftovaultConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SoftovaultError::Config(e.to_string()))
    }
}
