//! Error types for softovault.
//!
//! Every variant is a distinct failure class of the vault. Messages are
//! minimal: they say *what* failed without revealing *why* in ways that could
//! leak key material or act as a decryption oracle.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SoftovaultError>;

/// The single error type for all softovault operations.
#[derive(Debug, Error)]
pub enum SoftovaultError {
    /// Malformed caller input (empty access key, zero iterations, empty
    /// lookup key). Never retried.
    #[error("invalid input: {0}")]
    Validation(String),

    /// AEAD authentication failed. Covers wrong key, tampered ciphertext,
    /// undecodable base64 and truncated blobs alike.
    #[error("invalid access key or corrupted data")]
    Decryption,

    /// The presented access key does not authorize anything.
    #[error("unauthorized: {0}")]
    Authz(String),

    /// A record addressed by the caller does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A plan limit refused the creation of a vault or secret.
    #[error("limit reached: {0}")]
    LimitExceeded(String),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The underlying `ring` seal operation returned an error.
    #[error("encryption failed")]
    EncryptionFailure,

    /// The system's random number generator failed to produce bytes.
    #[error("randomness source failed")]
    RandomnessFailure,
}

impl SoftovaultError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn authz(msg: impl Into<String>) -> Self {
        Self::Authz(msg.into())
    }

    /// True for failures that can only be caused by a wrong key or damaged
    /// data, as opposed to caller or environment problems.
    pub fn is_decryption(&self) -> bool {
        matches!(self, Self::Decryption)
    }
}
