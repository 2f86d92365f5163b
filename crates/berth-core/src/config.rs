use crate::CoreError;
use berth_runtime::{export, BackendOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_BACKEND: &str = "distrobox";
pub const DEFAULT_BUILTIN_DIR: &str = "/usr/share/berth";
const SYSTEM_CONFIG: &str = "/etc/berth/config.toml";
const MOCK_STATE_FILE: &str = "mock-state.json";

/// Settings read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Parent of the user store; the store itself lives in `<data_dir>/berth`.
    pub data_dir: Option<PathBuf>,
    pub builtin_dir: Option<PathBuf>,
    pub backend: Option<String>,
    pub distrobox_path: Option<PathBuf>,
    pub container_manager: Option<String>,
    pub applications_dir: Option<PathBuf>,
    pub bin_dir: Option<PathBuf>,
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| CoreError::Config(format!("invalid config {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| CoreError::Config(format!("cannot serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Candidate config files, most specific first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = env_path("XDG_CONFIG_HOME") {
            paths.push(dir.join("berth/config.toml"));
        } else if let Some(home) = env_path("HOME") {
            paths.push(home.join(".config/berth/config.toml"));
        }
        paths.push(PathBuf::from(SYSTEM_CONFIG));
        paths
    }

    /// Load the first config file that exists, or the defaults.
    pub fn discover() -> Result<Self, CoreError> {
        for path in Self::search_paths() {
            if path.is_file() {
                debug!("using config {}", path.display());
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// Root of the writable user store.
    pub fn user_root(&self) -> Result<PathBuf, CoreError> {
        let data_dir = self
            .data_dir
            .clone()
            .or_else(|| env_path("XDG_DATA_HOME"))
            .or_else(|| env_path("HOME").map(|h| h.join(".local/share")))
            .ok_or_else(|| {
                CoreError::Config(
                    "cannot determine data directory: set data_dir, XDG_DATA_HOME or HOME"
                        .to_owned(),
                )
            })?;
        Ok(data_dir.join("berth"))
    }

    pub fn builtin_root(&self) -> PathBuf {
        self.builtin_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILTIN_DIR))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.as_deref().unwrap_or(DEFAULT_BACKEND)
    }

    pub fn applications_dir(&self) -> Result<PathBuf, CoreError> {
        match &self.applications_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(export::default_applications_dir()?),
        }
    }

    pub fn bin_dir(&self) -> Result<PathBuf, CoreError> {
        match &self.bin_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(export::default_bin_dir()?),
        }
    }

    /// Backend settings. The mock backend keeps its state next to the store
    /// so separate invocations see the same containers.
    pub fn backend_options(&self) -> Result<BackendOptions, CoreError> {
        let state_file = if self.backend_name() == "mock" {
            Some(self.user_root()?.join(MOCK_STATE_FILE))
        } else {
            None
        };
        Ok(BackendOptions {
            distrobox_path: self.distrobox_path.clone(),
            container_manager: self.container_manager.clone(),
            state_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("berth/config.toml");

        let config = Config {
            data_dir: Some(PathBuf::from("/srv/data")),
            backend: Some("mock".to_owned()),
            container_manager: Some("podman".to_owned()),
            ..Config::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backend_name(), "distrobox");
        assert_eq!(config.builtin_root(), PathBuf::from("/usr/share/berth"));
    }

    #[test]
    fn unknown_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backnd = \"mock\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(CoreError::Config(_))));
    }

    #[test]
    fn explicit_dirs_win() {
        let config = Config {
            data_dir: Some(PathBuf::from("/data")),
            applications_dir: Some(PathBuf::from("/apps")),
            bin_dir: Some(PathBuf::from("/bin-out")),
            ..Config::default()
        };
        assert_eq!(config.user_root().unwrap(), PathBuf::from("/data/berth"));
        assert_eq!(config.applications_dir().unwrap(), PathBuf::from("/apps"));
        assert_eq!(config.bin_dir().unwrap(), PathBuf::from("/bin-out"));
    }

    #[test]
    fn mock_backend_gets_state_file() {
        let config = Config {
            data_dir: Some(PathBuf::from("/data")),
            backend: Some("mock".to_owned()),
            ..Config::default()
        };
        let options = config.backend_options().unwrap();
        assert_eq!(
            options.state_file,
            Some(PathBuf::from("/data/berth/mock-state.json"))
        );
    }
}
