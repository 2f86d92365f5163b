//! Host-side files that launch programs living inside a subsystem.
//!
//! Desktop entries are written as `berth-<subsystem>-<app>.desktop` into the
//! host applications directory; executables are published as small `sh`
//! shims. Both forward to `<launcher> run <subsystem> -- <command>`.

use crate::RuntimeError;
use std::path::{Path, PathBuf};

/// Where applications keep their desktop entries inside a container.
pub const CONTAINER_APPLICATION_DIRS: &[&str] =
    &["/usr/share/applications", "/usr/local/share/applications"];

pub const SUBSYSTEM_KEY: &str = "X-Berth-Subsystem";
const SHIM_MARKER: &str = "# berth-shim:";
const DESKTOP_EXT: &str = ".desktop";
const MAIN_GROUP: &str = "[Desktop Entry]";

fn home_dir() -> Result<PathBuf, RuntimeError> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| RuntimeError::CommandFailed("HOME environment variable not set".to_owned()))
}

pub fn default_applications_dir() -> Result<PathBuf, RuntimeError> {
    if let Some(data) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(data).join("applications"));
    }
    Ok(home_dir()?.join(".local/share/applications"))
}

pub fn default_bin_dir() -> Result<PathBuf, RuntimeError> {
    Ok(home_dir()?.join(".local/bin"))
}

pub fn desktop_file_name(subsystem: &str, app: &str) -> String {
    format!("berth-{subsystem}-{app}{DESKTOP_EXT}")
}

fn desktop_prefix(subsystem: &str) -> String {
    format!("berth-{subsystem}-")
}

/// Quote `arg` for a desktop entry `Exec=` line when it needs it.
fn desktop_quote(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || "\"'\\$`".contains(c)) {
        let escaped = arg
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$")
            .replace('`', "\\`");
        format!("\"{escaped}\"")
    } else {
        arg.to_owned()
    }
}

/// Single-quote `arg` for POSIX sh.
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Rewrite a container desktop entry so it launches through berth.
///
/// Every `Exec=` line is prefixed with `<launcher> run <subsystem> --`,
/// `TryExec=` and `DBusActivatable=` are dropped (neither can be checked on
/// the host), the main `Name=` gets an `(on <subsystem>)` suffix, and a
/// subsystem marker key is added to the main group.
pub fn rewrite_desktop_entry(content: &str, subsystem: &str, launcher: &str) -> String {
    let prefix = format!(
        "{} run {} --",
        desktop_quote(launcher),
        desktop_quote(subsystem)
    );
    let marker = format!("{SUBSYSTEM_KEY}={subsystem}");
    let mut out = Vec::new();
    let mut in_main = false;
    let mut saw_main = false;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            in_main = trimmed.trim_end() == MAIN_GROUP;
            out.push(line.to_owned());
            if in_main && !saw_main {
                saw_main = true;
                out.push(marker.clone());
            }
            continue;
        }
        if trimmed.starts_with("TryExec=")
            || trimmed.starts_with("DBusActivatable=")
            || trimmed.starts_with(&format!("{SUBSYSTEM_KEY}="))
        {
            continue;
        }
        if let Some(cmd) = trimmed.strip_prefix("Exec=") {
            out.push(format!("Exec={prefix} {cmd}"));
        } else if let Some(name) = trimmed.strip_prefix("Name=").filter(|_| in_main) {
            out.push(format!("Name={name} (on {subsystem})"));
        } else {
            out.push(line.to_owned());
        }
    }

    if !saw_main {
        out.insert(0, marker);
        out.insert(0, MAIN_GROUP.to_owned());
    }
    let mut result = out.join("\n");
    result.push('\n');
    result
}

/// Subsystem a desktop entry was exported from, `None` for entries berth
/// did not write.
pub fn entry_owner(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let key = format!("{SUBSYSTEM_KEY}=");
    content
        .lines()
        .find_map(|l| l.trim().strip_prefix(&key).map(str::to_owned))
}

fn belongs_to(path: &Path, subsystem: &str) -> bool {
    entry_owner(path).as_deref() == Some(subsystem)
}

/// Write the rewritten entry for `app` into `dir`, replacing an earlier
/// export of the same subsystem. `dev`/`tools-app` and `dev-tools`/`app`
/// share a file name, so an entry owned by anyone else is left in place.
pub fn write_desktop_entry(
    dir: &Path,
    subsystem: &str,
    app: &str,
    content: &str,
    launcher: &str,
) -> Result<PathBuf, RuntimeError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(desktop_file_name(subsystem, app));
    if path.exists() && !belongs_to(&path, subsystem) {
        return Err(RuntimeError::ForeignFile(path));
    }
    std::fs::write(&path, rewrite_desktop_entry(content, subsystem, launcher))?;
    Ok(path)
}

/// Returns whether a file was removed. Entries of other subsystems are kept.
pub fn remove_desktop_entry(dir: &Path, subsystem: &str, app: &str) -> Result<bool, RuntimeError> {
    let path = dir.join(desktop_file_name(subsystem, app));
    if !belongs_to(&path, subsystem) {
        return Ok(false);
    }
    std::fs::remove_file(&path)?;
    Ok(true)
}

/// Apps exported from `subsystem` into `dir`, sorted.
pub fn list_entries(dir: &Path, subsystem: &str) -> Result<Vec<String>, RuntimeError> {
    let prefix = desktop_prefix(subsystem);
    let mut apps = Vec::new();

    if dir.exists() {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            let Some(app) = name_str
                .strip_prefix(&prefix)
                .and_then(|s| s.strip_suffix(DESKTOP_EXT))
            else {
                continue;
            };
            // "berth-dev-" also prefixes entries of a subsystem named "dev-tools".
            if belongs_to(&entry.path(), subsystem) {
                apps.push(app.to_owned());
            }
        }
    }

    apps.sort();
    Ok(apps)
}

pub fn remove_all_entries(dir: &Path, subsystem: &str) -> Result<Vec<String>, RuntimeError> {
    let apps = list_entries(dir, subsystem)?;
    for app in &apps {
        remove_desktop_entry(dir, subsystem, app)?;
    }
    Ok(apps)
}

pub fn shim_contents(subsystem: &str, binary: &str, launcher: &str) -> String {
    format!(
        "#!/bin/sh\n{SHIM_MARKER} {subsystem}\nexec {} run {} -- {} \"$@\"\n",
        shell_quote(launcher),
        shell_quote(subsystem),
        shell_quote(binary)
    )
}

/// Subsystem a shim forwards to, `None` for anything that is not a shim.
pub fn shim_owner(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    content
        .lines()
        .nth(1)?
        .strip_prefix(SHIM_MARKER)
        .map(|s| s.trim().to_owned())
}

/// Write an executable shim named `name` into `dir` forwarding to `binary`
/// inside `subsystem`. Existing shims are replaced; other files are not.
pub fn write_bin_shim(
    dir: &Path,
    subsystem: &str,
    name: &str,
    binary: &str,
    launcher: &str,
) -> Result<PathBuf, RuntimeError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    if path.exists() && shim_owner(&path).is_none() {
        return Err(RuntimeError::ForeignFile(path));
    }
    std::fs::write(&path, shim_contents(subsystem, binary, launcher))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}

/// Remove the shim `name` from `dir`. Missing files and files that are not
/// berth shims are left alone; returns whether a shim was removed.
pub fn remove_bin_shim(dir: &Path, name: &str) -> Result<bool, RuntimeError> {
    let path = dir.join(name);
    if shim_owner(&path).is_none() {
        return Ok(false);
    }
    std::fs::remove_file(&path)?;
    Ok(true)
}

/// Shims in `dir` forwarding to `subsystem`, sorted.
pub fn list_shims(dir: &Path, subsystem: &str) -> Result<Vec<String>, RuntimeError> {
    let mut names = Vec::new();
    if dir.exists() {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if shim_owner(&entry.path()).as_deref() == Some(subsystem) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
    }
    names.sort();
    Ok(names)
}

pub fn remove_all_shims(dir: &Path, subsystem: &str) -> Result<Vec<String>, RuntimeError> {
    let names = list_shims(dir, subsystem)?;
    for name in &names {
        remove_bin_shim(dir, name)?;
    }
    Ok(names)
}
