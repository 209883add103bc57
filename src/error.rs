//! Error types for stores, persistence and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a [`StateStorage`](crate::persist::StateStorage) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Key cannot be mapped onto the backend (empty, path separators, `..`).
    #[error("invalid storage key '{key}'")]
    InvalidKey { key: String },

    /// Reading, writing or removing the backing file failed.
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while writing or restoring a persisted snapshot.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The stored record is not valid JSON or does not match the snapshot shape.
    #[error("persisted record '{name}' is unreadable: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory snapshot could not be serialized.
    #[error("failed to encode snapshot: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },

    /// The configured migration rejected the stored record.
    #[error("migration from version {from} to {to} failed: {message}")]
    Migration { from: u32, to: u32, message: String },
}

/// Errors raised while loading [`AppConfig`](crate::config::AppConfig).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown build mode '{value}' (expected development, production or test)")]
    InvalidMode { value: String },

    #[error("application name must not be empty")]
    EmptyAppName,
}

/// Top-level error for store operations that can fail.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The operation needs a persistence layer but the store was built without one.
    #[error("store was built without a persistence layer")]
    PersistenceDisabled,

    /// Every handle to the store has been dropped.
    #[error("store has been released")]
    Released,

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
