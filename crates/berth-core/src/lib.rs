//! Core orchestration for berth subsystems.
//!
//! This crate ties together the definition schema, the on-disk registries,
//! and a container backend into the `Engine`: the API for managing package
//! manager and stack definitions, driving the subsystem lifecycle
//! (create, start, stop, exec, remove, reset), dispatching package verbs
//! into a subsystem, and exporting containerized applications to the host.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod export;
pub mod lifecycle;
pub mod registry;

pub use config::Config;
pub use engine::Engine;
pub use export::ExportedItems;
pub use lifecycle::validate_transition;

use berth_schema::DefinitionError;
use berth_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: &'static str, name: String },
    #[error("{kind} '{name}' is built-in and cannot be changed")]
    BuiltIn { kind: &'static str, name: String },
    #[error("{kind} '{name}' is still used by: {}", .dependents.join(", "))]
    ReferentialIntegrity {
        kind: &'static str,
        name: String,
        dependents: Vec<String>,
    },
    #[error("{kind} '{name}' refers to {target_kind} '{target}', which does not exist")]
    UnresolvedReference {
        kind: &'static str,
        name: String,
        target_kind: &'static str,
        target: String,
    },
    #[error("failed to provision subsystem '{name}': {reason}")]
    Provision { name: String, reason: String },
    #[error("command exited with code {code}")]
    Execution { code: i32 },
    #[error("{0}")]
    Validation(String),
    #[error("unknown verb '{0}'")]
    UnknownVerb(String),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("store error: {0}")]
    Store(StoreError),
    #[error("runtime error: {0}")]
    Runtime(#[from] berth_runtime::RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DefinitionError> for CoreError {
    fn from(e: DefinitionError) -> Self {
        match e {
            DefinitionError::UnknownVerb(verb) => CoreError::UnknownVerb(verb),
            DefinitionError::Io(e) => CoreError::Io(e),
            other => CoreError::Validation(other.to_string()),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { kind, name } => CoreError::NotFound { kind, name },
            StoreError::AlreadyExists { kind, name } => CoreError::AlreadyExists { kind, name },
            StoreError::BuiltIn { kind, name } => CoreError::BuiltIn { kind, name },
            StoreError::InvalidName(msg) => CoreError::Validation(msg),
            StoreError::Definition(e) => e.into(),
            other => CoreError::Store(other),
        }
    }
}
