use crate::StoreError;
use berth_schema::{Definition, PackageManager, Stack};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Current user store format version. Incremented on incompatible layout changes.
pub const STORE_FORMAT_VERSION: u32 = 1;
const VERSION_FILE: &str = "version";

pub const YAML_EXT: &str = "yaml";
pub const YML_EXT: &str = "yml";

/// Directory layout for the two registry tiers and the subsystem records.
///
/// The user root holds writable definitions and subsystem records; the
/// built-in root is read-only and holds definitions shipped with the system.
/// User directories are created lazily on [`initialize`](Self::initialize).
#[derive(Debug, Clone)]
pub struct StoreLayout {
    user_root: PathBuf,
    builtin_root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreVersion {
    format_version: u32,
}

impl StoreLayout {
    pub fn new(user_root: impl Into<PathBuf>, builtin_root: impl Into<PathBuf>) -> Self {
        Self {
            user_root: user_root.into(),
            builtin_root: builtin_root.into(),
        }
    }

    #[inline]
    pub fn user_root(&self) -> &Path {
        &self.user_root
    }

    #[inline]
    pub fn builtin_root(&self) -> &Path {
        &self.builtin_root
    }

    /// Definition directory named `dir` in the user tier.
    #[inline]
    pub fn user_dir(&self, dir: &str) -> PathBuf {
        self.user_root.join(dir)
    }

    /// Definition directory named `dir` in the built-in tier.
    #[inline]
    pub fn builtin_dir(&self, dir: &str) -> PathBuf {
        self.builtin_root.join(dir)
    }

    #[inline]
    pub fn subsystems_dir(&self) -> PathBuf {
        self.user_root.join("subsystems")
    }

    #[inline]
    pub fn subsystem_path(&self, name: &str) -> PathBuf {
        self.subsystems_dir().join(format!("{name}.json"))
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(self.user_dir(PackageManager::DIR))?;
        fs::create_dir_all(self.user_dir(Stack::DIR))?;
        fs::create_dir_all(self.subsystems_dir())?;

        let version_path = self.user_root.join(VERSION_FILE);
        if version_path.exists() {
            self.verify_version()?;
        } else {
            let ver = StoreVersion {
                format_version: STORE_FORMAT_VERSION,
            };
            let content = serde_json::to_string_pretty(&ver)?;
            crate::write_atomic(&version_path, content.as_bytes())?;
        }

        Ok(())
    }

    pub fn verify_version(&self) -> Result<(), StoreError> {
        let version_path = self.user_root.join(VERSION_FILE);
        let content = fs::read_to_string(&version_path)?;
        let ver: StoreVersion = serde_json::from_str(&content)?;

        if ver.format_version != STORE_FORMAT_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: STORE_FORMAT_VERSION,
                found: ver.format_version,
            });
        }
        Ok(())
    }
}

/// Path of the definition file for `name` inside `dir`.
///
/// `<name>.yaml` is preferred; `<name>.yml` is returned only when the
/// `.yaml` file does not exist. The result may not exist at all.
pub fn definition_file(dir: &Path, name: &str) -> PathBuf {
    let yaml = dir.join(format!("{name}.{YAML_EXT}"));
    if yaml.exists() {
        return yaml;
    }
    let yml = dir.join(format!("{name}.{YML_EXT}"));
    if yml.exists() {
        yml
    } else {
        yaml
    }
}

/// Definition name for a registry file, if it has a YAML extension.
pub fn definition_name(path: &Path) -> Option<&str> {
    let ext = path.extension()?.to_str()?;
    if ext != YAML_EXT && ext != YML_EXT {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    (!stem.starts_with('.')).then_some(stem)
}
