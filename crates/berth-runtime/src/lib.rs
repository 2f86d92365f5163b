//! Container backends and host integration for berth subsystems.
//!
//! This crate implements the execution layer: the pluggable
//! `ContainerBackend` trait with a distrobox backend and an in-memory mock,
//! desktop-entry and executable-shim export helpers for publishing
//! containerized applications on the host, and prerequisite checking.

pub mod backend;
pub mod distrobox;
pub mod export;
pub mod mock;
pub mod prereq;

pub use backend::{
    select_backend, BackendOptions, ContainerBackend, ContainerSpec, ContainerStatus,
    ExecOptions, ExecOutput,
};
pub use prereq::{check_distrobox_prereqs, format_missing, MissingPrereq};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("container '{0}' already exists")]
    ContainerExists(String),
    #[error("container '{0}' does not exist")]
    ContainerMissing(String),
    #[error("container command failed: {0}")]
    CommandFailed(String),
    #[error("refusing to overwrite '{}': not created by berth", .0.display())]
    ForeignFile(PathBuf),
    #[error("runtime state error: {0}")]
    State(#[from] serde_json::Error),
}
