//! Definition schema for berth: package managers, stacks, and package verbs.
//!
//! This crate defines the data model shared by every other berth crate: the
//! closed [`Verb`] set, [`PackageManager`] command templates and the command
//! generator built on them, [`Stack`] definitions binding a base image to a
//! package manager, YAML parsing/serialization, and the bundled built-in
//! definitions shipped with berth.

pub mod builtin;
pub mod definition;
pub mod pkgmanager;
pub mod stack;
pub mod types;
pub mod verb;

pub use builtin::{
    builtin_pkg_managers, builtin_stacks, find_builtin, BuiltinSource, BUILTIN_PKG_MANAGERS,
    BUILTIN_STACKS,
};
pub use definition::{definition_to_yaml, parse_definition_file, parse_definition_str, Definition};
pub use pkgmanager::{PackageManager, SUDO};
pub use stack::Stack;
pub use types::{PkgManagerName, StackName, SubsystemName};
pub use verb::Verb;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read definition file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse definition: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unknown verb '{0}' (expected one of: {list})", list = Verb::names().join(", "))]
    UnknownVerb(String),
    #[error("{kind} '{name}': {field} must not be empty")]
    EmptyField {
        kind: &'static str,
        name: String,
        field: &'static str,
    },
    #[error("package manager '{name}' is missing commands for: {}", format_verbs(.verbs))]
    MissingTemplates { name: String, verbs: Vec<Verb> },
}

fn format_verbs(verbs: &[Verb]) -> String {
    verbs
        .iter()
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_templates_lists_every_verb() {
        let e = DefinitionError::MissingTemplates {
            name: "apt".to_owned(),
            verbs: vec![Verb::Install, Verb::Clean],
        };
        let msg = e.to_string();
        assert!(msg.contains("apt"));
        assert!(msg.contains("install, clean"));
    }

    #[test]
    fn unknown_verb_lists_valid_verbs() {
        let msg = DefinitionError::UnknownVerb("frobnicate".to_owned()).to_string();
        assert!(msg.contains("frobnicate"));
        assert!(msg.contains("autoRemove"));
    }
}
