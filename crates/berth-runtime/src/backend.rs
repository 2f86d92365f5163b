use crate::RuntimeError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a backend needs to provision a container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub home: Option<PathBuf>,
    pub init: bool,
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContainerStatus {
    Missing,
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Attach a TTY and the caller's stdin.
    pub interactive: bool,
    /// Collect stdout instead of streaming it to the terminal.
    pub capture_output: bool,
}

impl ExecOptions {
    pub fn captured() -> Self {
        Self {
            interactive: false,
            capture_output: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub code: i32,
    /// Captured stdout; empty unless `capture_output` was requested.
    pub stdout: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

pub trait ContainerBackend: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    fn create(&self, spec: &ContainerSpec) -> Result<(), RuntimeError>;

    fn start(&self, container: &str) -> Result<(), RuntimeError>;

    fn stop(&self, container: &str) -> Result<(), RuntimeError>;

    /// Run `argv` inside the container. A non-zero exit is reported through
    /// [`ExecOutput::code`], not as an error.
    fn exec(
        &self,
        container: &str,
        options: ExecOptions,
        argv: &[String],
    ) -> Result<ExecOutput, RuntimeError>;

    /// Interactive login shell.
    fn enter(&self, container: &str) -> Result<ExecOutput, RuntimeError> {
        self.exec(
            container,
            ExecOptions {
                interactive: true,
                capture_output: false,
            },
            &[],
        )
    }

    /// Remove the container. Removing a missing container succeeds.
    fn remove(&self, container: &str) -> Result<(), RuntimeError>;

    fn status(&self, container: &str) -> Result<ContainerStatus, RuntimeError>;

    /// Contents of a file inside the container, `None` if it does not exist.
    fn read_file(&self, container: &str, path: &str) -> Result<Option<String>, RuntimeError> {
        let out = self.exec(
            container,
            ExecOptions::captured(),
            &["cat".to_owned(), path.to_owned()],
        )?;
        Ok(out.success().then_some(out.stdout))
    }

    /// Absolute path of `binary` on the container's `PATH`.
    fn which(&self, container: &str, binary: &str) -> Result<Option<String>, RuntimeError> {
        let argv = ["sh", "-c", "command -v \"$1\"", "sh", binary].map(str::to_owned);
        let out = self.exec(container, ExecOptions::captured(), &argv)?;
        let found = out.stdout.trim();
        Ok((out.success() && found.starts_with('/')).then(|| found.to_owned()))
    }
}

/// Backend-specific settings taken from the configuration.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub distrobox_path: Option<PathBuf>,
    pub container_manager: Option<String>,
    /// Mock backend only: persist state to this JSON file.
    pub state_file: Option<PathBuf>,
}

pub fn select_backend(
    name: &str,
    options: &BackendOptions,
) -> Result<Box<dyn ContainerBackend>, RuntimeError> {
    match name {
        "distrobox" => Ok(Box::new(crate::distrobox::DistroboxBackend::new(
            options.distrobox_path.clone(),
            options.container_manager.clone(),
        ))),
        "mock" => match &options.state_file {
            Some(path) => Ok(Box::new(crate::mock::MockBackend::with_state_file(path)?)),
            None => Ok(Box::new(crate::mock::MockBackend::new())),
        },
        other => Err(RuntimeError::BackendUnavailable(other.to_owned())),
    }
}
