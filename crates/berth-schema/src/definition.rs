use crate::DefinitionError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// A named, file-backed definition kept in a built-in and a user registry.
pub trait Definition: Serialize + DeserializeOwned + Clone {
    /// Human-readable kind, used in error messages ("package manager").
    const KIND: &'static str;
    /// Registry subdirectory holding one file per definition.
    const DIR: &'static str;

    fn name(&self) -> &str;

    fn is_built_in(&self) -> bool;

    fn set_built_in(&mut self, built_in: bool);

    /// Fill defaultable fields and check the invariants that must hold
    /// before the definition is written to a registry.
    fn prepare(&mut self) -> Result<(), DefinitionError>;
}

pub fn parse_definition_str<D: Definition>(input: &str) -> Result<D, DefinitionError> {
    Ok(serde_yaml::from_str(input)?)
}

pub fn parse_definition_file<D: Definition>(path: impl AsRef<Path>) -> Result<D, DefinitionError> {
    let content = fs::read_to_string(path)?;
    parse_definition_str(&content)
}

pub fn definition_to_yaml<D: Definition>(def: &D) -> Result<String, DefinitionError> {
    Ok(serde_yaml::to_string(def)?)
}
