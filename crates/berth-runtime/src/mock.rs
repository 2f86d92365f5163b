use crate::backend::{ContainerBackend, ContainerSpec, ContainerStatus, ExecOptions, ExecOutput};
use crate::RuntimeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;

const BIN_DIRS: &[&str] = &["/usr/local/bin", "/usr/bin", "/bin"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MockContainer {
    pub image: String,
    pub running: bool,
    #[serde(default)]
    pub home: Option<PathBuf>,
    #[serde(default)]
    pub init: bool,
    /// Files visible inside the container, keyed by absolute path.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecRecord {
    pub container: String,
    pub argv: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MockState {
    containers: BTreeMap<String, MockContainer>,
    exec_log: Vec<ExecRecord>,
}

/// In-memory backend for tests.
///
/// Each stack package `p` provisions `/usr/bin/p` and
/// `/usr/share/applications/p.desktop`. Commands whose first token is
/// `false` exit with code 1; everything else succeeds. With a state file the
/// state survives across processes.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
    state_file: Option<PathBuf>,
    fail_create: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load state from `path` if it exists and write it back after every change.
    pub fn with_state_file(path: impl Into<PathBuf>) -> Result<Self, RuntimeError> {
        let path = path.into();
        let state = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            MockState::default()
        };
        Ok(Self {
            state: Mutex::new(state),
            state_file: Some(path),
            fail_create: false,
        })
    }

    /// A backend whose `create` leaves a container fragment behind and fails.
    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, RuntimeError> {
        self.state
            .lock()
            .map_err(|e| RuntimeError::CommandFailed(format!("mutex poisoned: {e}")))
    }

    fn persist(&self, state: &MockState) -> Result<(), RuntimeError> {
        let Some(path) = &self.state_file else {
            return Ok(());
        };
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(serde_json::to_string_pretty(state)?.as_bytes())?;
        tmp.persist(path).map_err(|e| RuntimeError::Io(e.error))?;
        Ok(())
    }

    /// Place a file inside an existing container.
    pub fn put_file(&self, container: &str, path: &str, content: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        let c = state
            .containers
            .get_mut(container)
            .ok_or_else(|| RuntimeError::ContainerMissing(container.to_owned()))?;
        c.files.insert(path.to_owned(), content.to_owned());
        self.persist(&state)
    }

    pub fn container(&self, container: &str) -> Option<MockContainer> {
        self.lock().ok()?.containers.get(container).cloned()
    }

    pub fn exec_log(&self) -> Vec<ExecRecord> {
        self.lock().map(|s| s.exec_log.clone()).unwrap_or_default()
    }
}

fn seed_files(packages: &[String]) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    files.insert("/bin/sh".to_owned(), "mock shell\n".to_owned());
    for pkg in packages {
        files.insert(format!("/usr/bin/{pkg}"), format!("mock binary {pkg}\n"));
        files.insert(
            format!("/usr/share/applications/{pkg}.desktop"),
            format!(
                "[Desktop Entry]\nType=Application\nName={pkg}\nExec=/usr/bin/{pkg} %U\n\
                 TryExec=/usr/bin/{pkg}\nIcon={pkg}\n"
            ),
        );
    }
    files
}

impl ContainerBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn create(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        if state.containers.contains_key(&spec.name) {
            return Err(RuntimeError::ContainerExists(spec.name.clone()));
        }
        state.containers.insert(
            spec.name.clone(),
            MockContainer {
                image: spec.image.clone(),
                running: false,
                home: spec.home.clone(),
                init: spec.init,
                files: seed_files(&spec.packages),
            },
        );
        self.persist(&state)?;
        if self.fail_create {
            return Err(RuntimeError::CommandFailed(format!(
                "mock create of {} failed",
                spec.name
            )));
        }
        Ok(())
    }

    fn start(&self, container: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        let c = state
            .containers
            .get_mut(container)
            .ok_or_else(|| RuntimeError::ContainerMissing(container.to_owned()))?;
        c.running = true;
        self.persist(&state)
    }

    fn stop(&self, container: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        let c = state
            .containers
            .get_mut(container)
            .ok_or_else(|| RuntimeError::ContainerMissing(container.to_owned()))?;
        c.running = false;
        self.persist(&state)
    }

    fn exec(
        &self,
        container: &str,
        options: ExecOptions,
        argv: &[String],
    ) -> Result<ExecOutput, RuntimeError> {
        let mut state = self.lock()?;
        let c = state
            .containers
            .get_mut(container)
            .ok_or_else(|| RuntimeError::ContainerMissing(container.to_owned()))?;
        c.running = true;
        state.exec_log.push(ExecRecord {
            container: container.to_owned(),
            argv: argv.to_vec(),
        });
        self.persist(&state)?;

        let code = i32::from(argv.first().is_some_and(|a| a == "false"));
        let line = format!("mock-exec: {}\n", argv.join(" "));
        if options.capture_output {
            Ok(ExecOutput { code, stdout: line })
        } else {
            print!("{line}");
            Ok(ExecOutput {
                code,
                stdout: String::new(),
            })
        }
    }

    fn remove(&self, container: &str) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        if state.containers.remove(container).is_some() {
            self.persist(&state)?;
        }
        Ok(())
    }

    fn status(&self, container: &str) -> Result<ContainerStatus, RuntimeError> {
        let state = self.lock()?;
        Ok(match state.containers.get(container) {
            None => ContainerStatus::Missing,
            Some(c) if c.running => ContainerStatus::Running,
            Some(_) => ContainerStatus::Stopped,
        })
    }

    fn read_file(&self, container: &str, path: &str) -> Result<Option<String>, RuntimeError> {
        let state = self.lock()?;
        let c = state
            .containers
            .get(container)
            .ok_or_else(|| RuntimeError::ContainerMissing(container.to_owned()))?;
        Ok(c.files.get(path).cloned())
    }

    fn which(&self, container: &str, binary: &str) -> Result<Option<String>, RuntimeError> {
        let state = self.lock()?;
        let c = state
            .containers
            .get(container)
            .ok_or_else(|| RuntimeError::ContainerMissing(container.to_owned()))?;
        if binary.starts_with('/') {
            return Ok(c.files.contains_key(binary).then(|| binary.to_owned()));
        }
        Ok(BIN_DIRS
            .iter()
            .map(|dir| format!("{dir}/{binary}"))
            .find(|p| c.files.contains_key(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> ContainerSpec {
        ContainerSpec {
            name: name.to_owned(),
            image: "mock:latest".to_owned(),
            home: None,
            init: false,
            packages: vec!["firefox".to_owned()],
        }
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn lifecycle_transitions() {
        let backend = MockBackend::new();
        assert_eq!(backend.status("c").unwrap(), ContainerStatus::Missing);
        backend.create(&spec("c")).unwrap();
        assert_eq!(backend.status("c").unwrap(), ContainerStatus::Stopped);
        backend.start("c").unwrap();
        assert_eq!(backend.status("c").unwrap(), ContainerStatus::Running);
        backend.stop("c").unwrap();
        assert_eq!(backend.status("c").unwrap(), ContainerStatus::Stopped);
        backend.remove("c").unwrap();
        assert_eq!(backend.status("c").unwrap(), ContainerStatus::Missing);
        backend.remove("c").unwrap();
    }

    #[test]
    fn duplicate_create_fails() {
        let backend = MockBackend::new();
        backend.create(&spec("c")).unwrap();
        assert!(matches!(
            backend.create(&spec("c")),
            Err(RuntimeError::ContainerExists(_))
        ));
    }

    #[test]
    fn exec_records_argv_and_exit_code() {
        let backend = MockBackend::new();
        backend.create(&spec("c")).unwrap();
        let out = backend
            .exec("c", ExecOptions::captured(), &argv(&["apt", "list"]))
            .unwrap();
        assert_eq!(out.code, 0);
        assert_eq!(out.stdout, "mock-exec: apt list\n");
        assert_eq!(backend.status("c").unwrap(), ContainerStatus::Running);

        let out = backend
            .exec("c", ExecOptions::captured(), &argv(&["false"]))
            .unwrap();
        assert_eq!(out.code, 1);

        let log = backend.exec_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].argv, vec!["apt", "list"]);
    }

    #[test]
    fn exec_in_missing_container_fails() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.exec("nope", ExecOptions::default(), &[]),
            Err(RuntimeError::ContainerMissing(_))
        ));
    }

    #[test]
    fn packages_are_seeded() {
        let backend = MockBackend::new();
        backend.create(&spec("c")).unwrap();
        assert_eq!(
            backend.which("c", "firefox").unwrap().as_deref(),
            Some("/usr/bin/firefox")
        );
        assert!(backend.which("c", "vim").unwrap().is_none());
        let entry = backend
            .read_file("c", "/usr/share/applications/firefox.desktop")
            .unwrap()
            .unwrap();
        assert!(entry.contains("Exec=/usr/bin/firefox %U"));
        backend.put_file("c", "/usr/local/bin/tool", "x").unwrap();
        assert_eq!(
            backend.which("c", "tool").unwrap().as_deref(),
            Some("/usr/local/bin/tool")
        );
    }

    #[test]
    fn failing_create_leaves_fragment() {
        let backend = MockBackend::failing_create();
        assert!(backend.create(&spec("c")).is_err());
        assert_eq!(backend.status("c").unwrap(), ContainerStatus::Stopped);
    }

    #[test]
    fn state_file_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mock-state.json");
        {
            let backend = MockBackend::with_state_file(&path).unwrap();
            backend.create(&spec("c")).unwrap();
            backend.start("c").unwrap();
        }
        let backend = MockBackend::with_state_file(&path).unwrap();
        assert_eq!(backend.status("c").unwrap(), ContainerStatus::Running);
        assert_eq!(backend.container("c").unwrap().image, "mock:latest");
    }
}
