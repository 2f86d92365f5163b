use crate::layout::{definition_file, definition_name, StoreLayout, YAML_EXT, YML_EXT};
use crate::subsystems::validate_name;
use crate::{write_atomic, StoreError};
use berth_schema::{definition_to_yaml, parse_definition_file, Definition};
use std::collections::BTreeMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Which registry a definition was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    BuiltIn,
    User,
}

/// Two-tier registry of YAML definitions of one kind.
///
/// Reads consult the user tier first, then the built-in tier. Writes only
/// ever touch the user tier.
pub struct DefinitionStore<D> {
    layout: StoreLayout,
    _kind: PhantomData<fn() -> D>,
}

impl<D: Definition> DefinitionStore<D> {
    pub fn new(layout: StoreLayout) -> Self {
        Self {
            layout,
            _kind: PhantomData,
        }
    }

    pub fn user_dir(&self) -> PathBuf {
        self.layout.user_dir(D::DIR)
    }

    pub fn builtin_dir(&self) -> PathBuf {
        self.layout.builtin_dir(D::DIR)
    }

    fn dir(&self, tier: Tier) -> PathBuf {
        match tier {
            Tier::BuiltIn => self.builtin_dir(),
            Tier::User => self.user_dir(),
        }
    }

    fn not_found(name: &str) -> StoreError {
        StoreError::NotFound {
            kind: D::KIND,
            name: name.to_owned(),
        }
    }

    fn read(path: &Path, tier: Tier) -> Result<D, StoreError> {
        let mut def: D = parse_definition_file(path)?;
        def.set_built_in(tier == Tier::BuiltIn);
        Ok(def)
    }

    /// Read a registry file, which must declare the name it is stored under.
    fn read_named(path: &Path, tier: Tier, name: &str) -> Result<D, StoreError> {
        let def = Self::read(path, tier)?;
        if def.name() != name {
            return Err(StoreError::NameMismatch {
                kind: D::KIND,
                path: path.to_path_buf(),
                declared: def.name().to_owned(),
            });
        }
        Ok(def)
    }

    /// Existing file for `name` in `tier`.
    fn file_in(&self, tier: Tier, name: &str) -> Option<PathBuf> {
        let path = definition_file(&self.dir(tier), name);
        path.is_file().then_some(path)
    }

    /// The tier `name` resolves to, user tier first.
    pub fn tier_of(&self, name: &str) -> Option<Tier> {
        if validate_name(D::KIND, name).is_err() {
            return None;
        }
        [Tier::User, Tier::BuiltIn]
            .into_iter()
            .find(|t| self.file_in(*t, name).is_some())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.tier_of(name).is_some()
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        validate_name(D::KIND, name).is_ok() && self.file_in(Tier::BuiltIn, name).is_some()
    }

    pub fn load(&self, name: &str) -> Result<D, StoreError> {
        validate_name(D::KIND, name)?;
        for tier in [Tier::User, Tier::BuiltIn] {
            if let Some(path) = self.file_in(tier, name) {
                debug!("loading {} '{name}' from {}", D::KIND, path.display());
                return Self::read_named(&path, tier, name);
            }
        }
        Err(Self::not_found(name))
    }

    /// Write `def` to the user tier, replacing any user definition of the
    /// same name. Returns the definition as stored.
    pub fn save(&self, def: &D) -> Result<D, StoreError> {
        let name = def.name().to_owned();
        validate_name(D::KIND, &name)?;
        if self.is_builtin(&name) {
            return Err(StoreError::BuiltIn {
                kind: D::KIND,
                name,
            });
        }

        let mut stored = def.clone();
        stored.set_built_in(false);
        stored.prepare()?;
        let content = definition_to_yaml(&stored)?;

        let dir = self.user_dir();
        let dest = dir.join(format!("{name}.{YAML_EXT}"));
        write_atomic(&dest, content.as_bytes())?;

        let stale = dir.join(format!("{name}.{YML_EXT}"));
        if stale.exists() {
            fs::remove_file(&stale)?;
        }
        debug!("saved {} '{name}' to {}", D::KIND, dest.display());
        Ok(stored)
    }

    /// Like [`save`](Self::save), but refuses to replace an existing user
    /// definition.
    pub fn create(&self, def: &D) -> Result<D, StoreError> {
        validate_name(D::KIND, def.name())?;
        if self.file_in(Tier::User, def.name()).is_some() {
            return Err(StoreError::AlreadyExists {
                kind: D::KIND,
                name: def.name().to_owned(),
            });
        }
        self.save(def)
    }

    /// Delete a user definition. Dependents are the caller's concern.
    pub fn remove(&self, name: &str) -> Result<(), StoreError> {
        validate_name(D::KIND, name)?;
        if self.file_in(Tier::User, name).is_none() {
            if self.is_builtin(name) {
                return Err(StoreError::BuiltIn {
                    kind: D::KIND,
                    name: name.to_owned(),
                });
            }
            return Err(Self::not_found(name));
        }

        let dir = self.user_dir();
        for ext in [YAML_EXT, YML_EXT] {
            let path = dir.join(format!("{name}.{ext}"));
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        crate::fsync_dir(&dir)?;
        debug!("removed {} '{name}'", D::KIND);
        Ok(())
    }

    /// Definitions in one tier, keyed by name. Unreadable files are skipped.
    pub fn list_tier(&self, tier: Tier) -> Result<BTreeMap<String, D>, StoreError> {
        self.collect_tier(tier, false)
    }

    /// Like [`list_tier`](Self::list_tier), but any file that cannot be read
    /// or declares a different name fails the whole scan.
    pub fn scan_tier(&self, tier: Tier) -> Result<BTreeMap<String, D>, StoreError> {
        self.collect_tier(tier, true)
    }

    fn collect_tier(&self, tier: Tier, strict: bool) -> Result<BTreeMap<String, D>, StoreError> {
        let dir = self.dir(tier);
        let mut results = BTreeMap::new();
        if !dir.is_dir() {
            return Ok(results);
        }
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(name) = definition_name(&path) else {
                continue;
            };
            if results.contains_key(name) {
                continue;
            }
            // Go through file_in so the .yaml/.yml precedence matches load().
            let Some(chosen) = self.file_in(tier, name) else {
                continue;
            };
            match Self::read_named(&chosen, tier, name) {
                Ok(def) => {
                    results.insert(name.to_owned(), def);
                }
                Err(e) if strict => return Err(e),
                Err(e) => {
                    warn!("skipping {} file '{}': {e}", D::KIND, chosen.display());
                }
            }
        }
        Ok(results)
    }

    /// Merged view of both tiers sorted by name, user entries shadowing
    /// built-in ones.
    pub fn list(&self) -> Result<Vec<D>, StoreError> {
        let mut merged = self.list_tier(Tier::BuiltIn)?;
        merged.extend(self.list_tier(Tier::User)?);
        Ok(merged.into_values().collect())
    }

    /// Read a definition from an arbitrary file as a user definition.
    pub fn load_from_path(&self, path: &Path) -> Result<D, StoreError> {
        if !path.is_file() {
            return Err(StoreError::NotFound {
                kind: "file",
                name: path.display().to_string(),
            });
        }
        Self::read(path, Tier::User)
    }

    /// Write the YAML of `name` to `dest`.
    pub fn export(&self, name: &str, dest: &Path) -> Result<(), StoreError> {
        let def = self.load(name)?;
        let content = definition_to_yaml(&def)?;
        write_atomic(dest, content.as_bytes())?;
        Ok(())
    }
}
