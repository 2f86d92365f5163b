use super::{json_pretty, EXIT_SUCCESS};
use berth_schema::{
    BuiltinSource, Definition, PackageManager, Stack, BUILTIN_PKG_MANAGERS, BUILTIN_STACKS,
};
use std::path::{Path, PathBuf};

fn install_set(
    root: &Path,
    dir: &str,
    sources: &[BuiltinSource],
    force: bool,
) -> Result<Vec<PathBuf>, String> {
    let target = root.join(dir);
    std::fs::create_dir_all(&target)
        .map_err(|e| format!("failed to create {}: {e}", target.display()))?;
    let mut written = Vec::new();
    for src in sources {
        let path = target.join(format!("{}.yaml", src.name));
        if path.exists() && !force {
            tracing::debug!("keeping existing {}", path.display());
            continue;
        }
        std::fs::write(&path, src.source)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Write the bundled definitions into a built-in directory.
pub fn install(root: &Path, force: bool) -> Result<Vec<PathBuf>, String> {
    let mut written = install_set(root, PackageManager::DIR, BUILTIN_PKG_MANAGERS, force)?;
    written.extend(install_set(root, Stack::DIR, BUILTIN_STACKS, force)?);
    Ok(written)
}

pub fn run(root: &Path, force: bool, json: bool) -> Result<u8, String> {
    let written = install(root, force)?;
    if json {
        println!("{}", json_pretty(&written)?);
    } else {
        println!(
            "installed {} built-in definition(s) into {}",
            written.len(),
            root.display()
        );
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_every_bundled_definition() {
        let dir = tempfile::tempdir().unwrap();
        let written = install(dir.path(), false).unwrap();
        assert_eq!(
            written.len(),
            BUILTIN_PKG_MANAGERS.len() + BUILTIN_STACKS.len()
        );
        assert!(dir.path().join("package-managers/apt.yaml").is_file());
        assert!(dir.path().join("stacks/ubuntu.yaml").is_file());
    }

    #[test]
    fn keeps_existing_files_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let apt = dir.path().join("package-managers/apt.yaml");
        std::fs::create_dir_all(apt.parent().unwrap()).unwrap();
        std::fs::write(&apt, "local edit").unwrap();

        let written = install(dir.path(), false).unwrap();
        assert!(!written.contains(&apt));
        assert_eq!(std::fs::read_to_string(&apt).unwrap(), "local edit");

        install(dir.path(), true).unwrap();
        assert!(std::fs::read_to_string(&apt).unwrap().contains("needSudo"));
    }
}
