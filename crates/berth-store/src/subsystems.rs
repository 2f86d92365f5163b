use crate::layout::StoreLayout;
use crate::{write_atomic, StoreError};
use berth_schema::{Stack, SubsystemName};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Prefix of every runtime container managed by berth.
pub const CONTAINER_PREFIX: &str = "berth-";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubsystemState {
    NotCreated,
    Stopped,
    Running,
    Removed,
}

impl std::fmt::Display for SubsystemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubsystemState::NotCreated => write!(f, "not created"),
            SubsystemState::Stopped => write!(f, "stopped"),
            SubsystemState::Running => write!(f, "running"),
            SubsystemState::Removed => write!(f, "removed"),
        }
    }
}

/// Persistent record of a subsystem.
///
/// `stack` is a private copy taken when the record was built; editing or
/// removing the stack definition afterwards does not affect it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubsystemRecord {
    pub name: SubsystemName,
    pub stack: Stack,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<PathBuf>,
    #[serde(default)]
    pub init: bool,
    pub state: SubsystemState,
    pub container: String,
    pub created_at: String,
    pub updated_at: String,
    /// blake3 checksum for integrity verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl SubsystemRecord {
    /// Build an in-memory record in `NotCreated`.
    pub fn new(name: SubsystemName, stack: Stack, home: Option<PathBuf>, init: bool) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            container: container_name(&name),
            name,
            stack,
            home,
            init,
            state: SubsystemState::NotCreated,
            created_at: now.clone(),
            updated_at: now,
            checksum: None,
        }
    }

    /// Compute the checksum over the record content (excluding the checksum field itself).
    fn compute_checksum(&self) -> Result<String, StoreError> {
        let mut copy = self.clone();
        copy.checksum = None;
        let json = serde_json::to_string_pretty(&copy)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

pub fn container_name(name: &str) -> String {
    format!("{CONTAINER_PREFIX}{name}")
}

/// Names become file and container names: 1-64 chars of `[A-Za-z0-9_.-]`,
/// not starting with a dot.
pub fn validate_name(kind: &str, name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.len() > 64 {
        return Err(StoreError::InvalidName(format!(
            "{kind} name must be 1-64 characters"
        )));
    }
    if name.starts_with('.') {
        return Err(StoreError::InvalidName(format!(
            "{kind} name must not start with '.'"
        )));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(StoreError::InvalidName(format!(
            "{kind} name '{name}' must match [A-Za-z0-9_.-]"
        )));
    }
    Ok(())
}

const KIND: &str = "subsystem";

pub struct SubsystemStore {
    layout: StoreLayout,
}

impl SubsystemStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn put(&self, record: &SubsystemRecord) -> Result<(), StoreError> {
        validate_name(KIND, &record.name)?;
        let dest = self.layout.subsystem_path(&record.name);

        let mut with_checksum = record.clone();
        with_checksum.checksum = Some(with_checksum.compute_checksum()?);
        let content = serde_json::to_string_pretty(&with_checksum)?;
        write_atomic(&dest, content.as_bytes())
    }

    pub fn get(&self, name: &str) -> Result<SubsystemRecord, StoreError> {
        validate_name(KIND, name)?;
        let path = self.layout.subsystem_path(name);
        if !path.exists() {
            return Err(StoreError::NotFound {
                kind: KIND,
                name: name.to_owned(),
            });
        }
        let content = fs::read_to_string(&path)?;
        let record: SubsystemRecord = serde_json::from_str(&content)?;

        if let Some(ref expected) = record.checksum {
            let actual = record.compute_checksum()?;
            if actual != *expected {
                return Err(StoreError::IntegrityFailure {
                    name: name.to_owned(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        Ok(record)
    }

    pub fn update_state(&self, name: &str, new_state: SubsystemState) -> Result<(), StoreError> {
        let mut record = self.get(name)?;
        record.state = new_state;
        record.updated_at = chrono::Utc::now().to_rfc3339();
        self.put(&record)
    }

    pub fn exists(&self, name: &str) -> bool {
        validate_name(KIND, name).is_ok() && self.layout.subsystem_path(name).exists()
    }

    /// Delete the record. A missing record is not an error.
    pub fn remove(&self, name: &str) -> Result<(), StoreError> {
        validate_name(KIND, name)?;
        let path = self.layout.subsystem_path(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Names of all record files, in directory order.
    fn record_names(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.layout.subsystems_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(name.to_owned());
            }
        }
        Ok(names)
    }

    pub fn list(&self) -> Result<Vec<SubsystemRecord>, StoreError> {
        let mut results = Vec::new();
        for name in self.record_names()? {
            match self.get(&name) {
                Ok(record) => results.push(record),
                Err(e) => {
                    tracing::warn!("skipping corrupted subsystem record '{name}': {e}");
                }
            }
        }
        results.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(results)
    }

    /// Names of subsystems whose snapshot was taken from stack `stack`,
    /// sorted. A record that cannot be read fails the lookup.
    pub fn bound_to(&self, stack: &str) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for name in self.record_names()? {
            let record = self.get(&name)?;
            if record.stack.name == stack {
                names.push(record.name.into_inner());
            }
        }
        names.sort();
        Ok(names)
    }
}
