use crate::engine::{Engine, SUBSYSTEM};
use crate::CoreError;
use berth_runtime::export::{
    list_entries, list_shims, remove_all_entries, remove_all_shims, remove_bin_shim,
    remove_desktop_entry, shim_owner, write_bin_shim, write_desktop_entry,
    CONTAINER_APPLICATION_DIRS,
};
use berth_runtime::RuntimeError;
use berth_store::validate_name;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything a subsystem currently has published on the host.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ExportedItems {
    pub desktop_entries: Vec<String>,
    pub binaries: Vec<String>,
}

impl ExportedItems {
    pub fn len(&self) -> usize {
        self.desktop_entries.len() + self.binaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A host file berth did not write, or one owned by another subsystem.
fn foreign_as_exists(e: RuntimeError) -> CoreError {
    match e {
        RuntimeError::ForeignFile(path) => CoreError::AlreadyExists {
            kind: "file",
            name: path.display().to_string(),
        },
        other => other.into(),
    }
}

fn check_app_name(app: &str) -> Result<(), CoreError> {
    if app.is_empty() || app.contains('/') || app.starts_with('.') {
        return Err(CoreError::Validation(format!("invalid application name '{app}'")));
    }
    Ok(())
}

impl Engine {
    /// Publish `<app>.desktop` from subsystem `name` on the host.
    pub fn export_desktop_entry(&self, name: &str, app: &str) -> Result<PathBuf, CoreError> {
        check_app_name(app)?;
        let record = self.running_subsystem(name)?;

        for dir in CONTAINER_APPLICATION_DIRS {
            let path = format!("{dir}/{app}.desktop");
            let content = self
                .backend
                .read_file(&record.container, &path)
                .map_err(|e| Self::runtime_error(&record, e))?;
            if let Some(content) = content {
                let dest = write_desktop_entry(
                    &self.applications_dir,
                    name,
                    app,
                    &content,
                    &self.launcher,
                )
                .map_err(foreign_as_exists)?;
                info!("exported {app} from {name} to {}", dest.display());
                return Ok(dest);
            }
        }

        Err(CoreError::NotFound {
            kind: "desktop entry",
            name: format!("{app}.desktop"),
        })
    }

    /// Export every app in `apps` that ships a desktop entry; apps without
    /// one are skipped. Returns how many were exported.
    pub fn export_desktop_entries<S: AsRef<str>>(
        &self,
        name: &str,
        apps: &[S],
    ) -> Result<usize, CoreError> {
        let mut exported = 0;
        for app in apps {
            match self.export_desktop_entry(name, app.as_ref()) {
                Ok(_) => exported += 1,
                Err(CoreError::NotFound {
                    kind: "desktop entry",
                    ..
                }) => debug!("{} ships no desktop entry", app.as_ref()),
                Err(e) => return Err(e),
            }
        }
        Ok(exported)
    }

    /// Remove the host entry for `app`; returns whether one existed.
    pub fn unexport_desktop_entry(&self, name: &str, app: &str) -> Result<bool, CoreError> {
        validate_name(SUBSYSTEM, name)?;
        check_app_name(app)?;
        Ok(remove_desktop_entry(&self.applications_dir, name, app)?)
    }

    pub fn unexport_desktop_entries<S: AsRef<str>>(
        &self,
        name: &str,
        apps: &[S],
    ) -> Result<usize, CoreError> {
        let mut removed = 0;
        for app in apps {
            if self.unexport_desktop_entry(name, app.as_ref())? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Publish `binary` from subsystem `name` as a shim in `output_dir`
    /// (the configured bin directory by default).
    pub fn export_bin(
        &self,
        name: &str,
        binary: &str,
        output_dir: Option<&Path>,
    ) -> Result<PathBuf, CoreError> {
        let record = self.running_subsystem(name)?;
        let resolved = self
            .backend
            .which(&record.container, binary)
            .map_err(|e| Self::runtime_error(&record, e))?
            .ok_or_else(|| CoreError::NotFound {
                kind: "binary",
                name: binary.to_owned(),
            })?;
        let shim_name = Path::new(&resolved)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CoreError::Validation(format!("invalid binary path '{resolved}'")))?;

        let dir = output_dir.unwrap_or(self.bin_dir.as_path());
        let path = write_bin_shim(dir, name, shim_name, &resolved, &self.launcher)
            .map_err(foreign_as_exists)?;
        info!("exported {resolved} from {name} to {}", path.display());
        Ok(path)
    }

    /// Remove the shim for `binary` if it forwards to subsystem `name`.
    pub fn unexport_bin(
        &self,
        name: &str,
        binary: &str,
        output_dir: Option<&Path>,
    ) -> Result<bool, CoreError> {
        validate_name(SUBSYSTEM, name)?;
        let Some(shim_name) = Path::new(binary).file_name().and_then(|n| n.to_str()) else {
            return Ok(false);
        };
        let dir = output_dir.unwrap_or(self.bin_dir.as_path());
        if shim_owner(&dir.join(shim_name)).as_deref() != Some(name) {
            return Ok(false);
        }
        Ok(remove_bin_shim(dir, shim_name)?)
    }

    pub fn list_exported(&self, name: &str) -> Result<ExportedItems, CoreError> {
        validate_name(SUBSYSTEM, name)?;
        Ok(ExportedItems {
            desktop_entries: list_entries(&self.applications_dir, name)?,
            binaries: list_shims(&self.bin_dir, name)?,
        })
    }

    /// Withdraw every desktop entry and shim of subsystem `name`.
    pub fn unexport_all(&self, name: &str) -> Result<usize, CoreError> {
        validate_name(SUBSYSTEM, name)?;
        let entries = remove_all_entries(&self.applications_dir, name)?;
        let shims = remove_all_shims(&self.bin_dir, name)?;
        Ok(entries.len() + shims.len())
    }
}
