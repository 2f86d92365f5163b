use crate::backend::{ContainerBackend, ContainerSpec, ContainerStatus, ExecOptions, ExecOutput};
use crate::RuntimeError;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info};

const DEFAULT_PROGRAM: &str = "distrobox";

/// Backend that drives containers through the `distrobox` CLI.
pub struct DistroboxBackend {
    program: PathBuf,
    container_manager: Option<String>,
}

impl Default for DistroboxBackend {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl DistroboxBackend {
    pub fn new(program: Option<PathBuf>, container_manager: Option<String>) -> Self {
        Self {
            program: program.unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM)),
            container_manager,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(manager) = &self.container_manager {
            cmd.env("DBX_CONTAINER_MANAGER", manager);
        }
        cmd
    }

    fn run_quiet(&self, args: &[String]) -> Result<(), RuntimeError> {
        debug!("{} {}", self.program.display(), args.join(" "));
        let output = self
            .command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(&e))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(RuntimeError::CommandFailed(format!(
                "distrobox {} exited with code {}: {}",
                args.first().map_or("", String::as_str),
                output.status.code().unwrap_or(1),
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    fn spawn_error(&self, e: &std::io::Error) -> RuntimeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            RuntimeError::BackendUnavailable(self.program.display().to_string())
        } else {
            RuntimeError::CommandFailed(format!("failed to run {}: {e}", self.program.display()))
        }
    }
}

/// Arguments for `distrobox create`.
pub fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args: Vec<String> = [
        "create",
        "--yes",
        "--no-entry",
        "--name",
        spec.name.as_str(),
        "--image",
        spec.image.as_str(),
    ]
    .into_iter()
    .map(str::to_owned)
    .collect();

    if let Some(home) = &spec.home {
        args.push("--home".to_owned());
        args.push(home.display().to_string());
    }
    if spec.init {
        args.push("--init".to_owned());
        args.push("--additional-packages".to_owned());
        args.push("systemd".to_owned());
    }
    if !spec.packages.is_empty() {
        args.push("--additional-packages".to_owned());
        args.push(spec.packages.join(" "));
    }
    args
}

/// Arguments for `distrobox enter` running `argv`.
pub fn enter_args(container: &str, options: ExecOptions, argv: &[String]) -> Vec<String> {
    let mut args = vec!["enter".to_owned(), "--name".to_owned(), container.to_owned()];
    if !options.interactive {
        args.push("--no-tty".to_owned());
    }
    if !argv.is_empty() {
        args.push("--".to_owned());
        args.extend(argv.iter().cloned());
    }
    args
}

/// Find `container` in `distrobox list --no-color` output.
///
/// Rows look like `ID | NAME | STATUS | IMAGE`; a status starting with
/// `Up` means the container is running.
pub fn parse_list(output: &str, container: &str) -> ContainerStatus {
    for line in output.lines().skip(1) {
        let cols: Vec<&str> = line.split('|').map(str::trim).collect();
        if cols.len() < 3 || cols[1] != container {
            continue;
        }
        return if cols[2].starts_with("Up") || cols[2].starts_with("running") {
            ContainerStatus::Running
        } else {
            ContainerStatus::Stopped
        };
    }
    ContainerStatus::Missing
}

impl ContainerBackend for DistroboxBackend {
    fn name(&self) -> &'static str {
        "distrobox"
    }

    fn available(&self) -> bool {
        self.command()
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn create(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        if self.status(&spec.name)? != ContainerStatus::Missing {
            return Err(RuntimeError::ContainerExists(spec.name.clone()));
        }
        info!("creating container {} from {}", spec.name, spec.image);
        self.run_quiet(&create_args(spec))
    }

    fn start(&self, container: &str) -> Result<(), RuntimeError> {
        match self.status(container)? {
            ContainerStatus::Running => Ok(()),
            ContainerStatus::Missing => Err(RuntimeError::ContainerMissing(container.to_owned())),
            ContainerStatus::Stopped => {
                let argv = ["true".to_owned()];
                self.run_quiet(&enter_args(container, ExecOptions::default(), &argv))
            }
        }
    }

    fn stop(&self, container: &str) -> Result<(), RuntimeError> {
        match self.status(container)? {
            ContainerStatus::Running => {
                self.run_quiet(&["stop", "--yes", container].map(str::to_owned))
            }
            ContainerStatus::Stopped => Ok(()),
            ContainerStatus::Missing => Err(RuntimeError::ContainerMissing(container.to_owned())),
        }
    }

    fn exec(
        &self,
        container: &str,
        options: ExecOptions,
        argv: &[String],
    ) -> Result<ExecOutput, RuntimeError> {
        let args = enter_args(container, options, argv);
        debug!("{} {}", self.program.display(), args.join(" "));
        let mut cmd = self.command();
        cmd.args(&args).stderr(Stdio::inherit());
        if !options.interactive {
            cmd.stdin(Stdio::null());
        }

        if options.capture_output {
            let output = cmd.output().map_err(|e| self.spawn_error(&e))?;
            Ok(ExecOutput {
                code: output.status.code().unwrap_or(1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            })
        } else {
            let status = cmd
                .stdout(Stdio::inherit())
                .status()
                .map_err(|e| self.spawn_error(&e))?;
            Ok(ExecOutput {
                code: status.code().unwrap_or(1),
                stdout: String::new(),
            })
        }
    }

    fn remove(&self, container: &str) -> Result<(), RuntimeError> {
        if self.status(container)? == ContainerStatus::Missing {
            return Ok(());
        }
        info!("removing container {container}");
        self.run_quiet(&["rm", "--force", container].map(str::to_owned))
    }

    fn status(&self, container: &str) -> Result<ContainerStatus, RuntimeError> {
        let output = self
            .command()
            .args(["list", "--no-color"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(&e))?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed(format!(
                "distrobox list failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(parse_list(&String::from_utf8_lossy(&output.stdout), container))
    }
}
