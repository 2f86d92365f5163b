//! Definition registries, subsystem records, and on-disk layout for berth.
//!
//! This crate provides the storage layer: `StoreLayout` for the user and
//! built-in directory structure, `DefinitionStore` for the two-tier package
//! manager and stack registries (YAML, user tier writable), and
//! `SubsystemStore` for checksummed JSON subsystem records. Every write goes
//! through a temp file, a rename, and a directory fsync.

pub mod definitions;
pub mod layout;
pub mod subsystems;

pub use definitions::{DefinitionStore, Tier};
pub use layout::{StoreLayout, STORE_FORMAT_VERSION};
pub use subsystems::{
    container_name, validate_name, SubsystemRecord, SubsystemState, SubsystemStore,
    CONTAINER_PREFIX,
};

use berth_schema::DefinitionError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Fsync a directory so that a preceding `rename()` is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

/// Write `content` to `dest` via a temp file in the same directory.
pub(crate) fn write_atomic(dest: &Path, content: &[u8]) -> Result<(), StoreError> {
    let dir = dest
        .parent()
        .ok_or_else(|| StoreError::Io(std::io::Error::other("destination has no parent")))?;
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| StoreError::Io(e.error))?;
    fsync_dir(dir)?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: &'static str, name: String },
    #[error("{kind} '{name}' is built-in and cannot be modified")]
    BuiltIn { kind: &'static str, name: String },
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("{kind} file '{}' declares name '{declared}'", .path.display())]
    NameMismatch {
        kind: &'static str,
        path: std::path::PathBuf,
        declared: String,
    },
    #[error("integrity check failed for subsystem '{name}': expected {expected}, got {actual}")]
    IntegrityFailure {
        name: String,
        expected: String,
        actual: String,
    },
    #[error("store format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("definition error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}
