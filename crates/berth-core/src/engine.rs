use crate::config::Config;
use crate::lifecycle::validate_transition;
use crate::CoreError;
use berth_runtime::{
    select_backend, ContainerBackend, ContainerSpec, ContainerStatus, ExecOptions, ExecOutput,
    RuntimeError,
};
use berth_schema::{PackageManager, Stack};
use berth_store::{
    validate_name, DefinitionStore, StoreLayout, SubsystemRecord, SubsystemState, SubsystemStore,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub(crate) const SUBSYSTEM: &str = "subsystem";
pub(crate) const CONTAINER: &str = "container";
const DEFAULT_LAUNCHER: &str = "berth";

/// Central handle for every berth operation.
///
/// Holds the resolved configuration, the definition registries, the
/// subsystem records, and the container backend. There is no global state:
/// callers build one `Engine` and pass it around.
pub struct Engine {
    layout: StoreLayout,
    pub(crate) pkg_managers: DefinitionStore<PackageManager>,
    pub(crate) stacks: DefinitionStore<Stack>,
    pub(crate) subsystems: SubsystemStore,
    pub(crate) backend: Box<dyn ContainerBackend>,
    pub(crate) applications_dir: PathBuf,
    pub(crate) bin_dir: PathBuf,
    pub(crate) launcher: String,
}

impl Engine {
    /// Open (and initialize if needed) the store described by `layout`.
    pub fn new(
        layout: StoreLayout,
        backend: Box<dyn ContainerBackend>,
        applications_dir: impl Into<PathBuf>,
        bin_dir: impl Into<PathBuf>,
    ) -> Result<Self, CoreError> {
        layout.initialize()?;
        Ok(Self {
            pkg_managers: DefinitionStore::new(layout.clone()),
            stacks: DefinitionStore::new(layout.clone()),
            subsystems: SubsystemStore::new(layout.clone()),
            layout,
            backend,
            applications_dir: applications_dir.into(),
            bin_dir: bin_dir.into(),
            launcher: DEFAULT_LAUNCHER.to_owned(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, CoreError> {
        let layout = StoreLayout::new(config.user_root()?, config.builtin_root());
        let backend = select_backend(config.backend_name(), &config.backend_options()?)?;
        debug!(
            "store {} (built-ins {}), backend {}",
            layout.user_root().display(),
            layout.builtin_root().display(),
            backend.name()
        );
        Self::new(
            layout,
            backend,
            config.applications_dir()?,
            config.bin_dir()?,
        )
    }

    /// Program written into exported launchers, `berth` by default.
    #[must_use]
    pub fn with_launcher(mut self, launcher: impl Into<String>) -> Self {
        self.launcher = launcher.into();
        self
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn backend(&self) -> &dyn ContainerBackend {
        self.backend.as_ref()
    }

    pub fn applications_dir(&self) -> &Path {
        &self.applications_dir
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    pub fn launcher(&self) -> &str {
        &self.launcher
    }

    /// Build an in-memory subsystem record from the current contents of
    /// stack `stack`. Nothing is written until [`create`](Self::create).
    pub fn new_subsystem(
        &self,
        name: &str,
        stack: &str,
        home: Option<PathBuf>,
        init: bool,
    ) -> Result<SubsystemRecord, CoreError> {
        validate_name(SUBSYSTEM, name)?;
        if self.subsystems.exists(name) {
            return Err(CoreError::AlreadyExists {
                kind: SUBSYSTEM,
                name: name.to_owned(),
            });
        }
        let stack = self.load_stack(stack)?;
        self.resolve_pkg_manager(&stack)?;
        Ok(SubsystemRecord::new(name.into(), stack, home, init))
    }

    /// Provision the container for `record` and persist the record.
    ///
    /// On failure any partially created container is removed and the
    /// record is left untouched in `NotCreated`.
    pub fn create(&self, record: &mut SubsystemRecord) -> Result<(), CoreError> {
        let name = record.name.to_string();
        info!("creating subsystem {name} from stack {}", record.stack.name);
        validate_transition(record.state, SubsystemState::Stopped)?;
        if self.subsystems.exists(&name) {
            return Err(CoreError::AlreadyExists {
                kind: SUBSYSTEM,
                name,
            });
        }

        let provision = |reason: String| CoreError::Provision {
            name: name.clone(),
            reason,
        };

        let status = self
            .backend
            .status(&record.container)
            .map_err(|e| provision(e.to_string()))?;
        if status != ContainerStatus::Missing {
            return Err(provision(format!(
                "container '{}' already exists",
                record.container
            )));
        }

        let spec = ContainerSpec {
            name: record.container.clone(),
            image: record.stack.base.clone(),
            home: record.home.clone(),
            init: record.init,
            packages: record.stack.packages.clone(),
        };
        if let Err(e) = self.backend.create(&spec) {
            warn!("provisioning {name} failed, removing partial container: {e}");
            if let Err(cleanup) = self.backend.remove(&record.container) {
                warn!("cleanup of {} failed: {cleanup}", record.container);
            }
            return Err(provision(e.to_string()));
        }

        let mut created = record.clone();
        created.state = SubsystemState::Stopped;
        created.updated_at = chrono::Utc::now().to_rfc3339();
        if let Err(e) = self.subsystems.put(&created) {
            warn!("recording {name} failed, removing container: {e}");
            if let Err(cleanup) = self.backend.remove(&record.container) {
                warn!("cleanup of {} failed: {cleanup}", record.container);
            }
            return Err(e.into());
        }
        *record = created;
        Ok(())
    }

    pub fn subsystem_exists(&self, name: &str) -> bool {
        self.subsystems.exists(name)
    }

    /// Load a record with its state refreshed from the backend.
    pub fn load_subsystem(&self, name: &str) -> Result<SubsystemRecord, CoreError> {
        let mut record = self.subsystems.get(name)?;
        record.state = self.observed_state(&record)?;
        Ok(record)
    }

    pub fn list_subsystems(&self) -> Result<Vec<SubsystemRecord>, CoreError> {
        let mut records = self.subsystems.list()?;
        for record in &mut records {
            match self.observed_state(record) {
                Ok(state) => record.state = state,
                Err(e) => warn!("cannot query container of {}: {e}", record.name),
            }
        }
        Ok(records)
    }

    fn observed_state(&self, record: &SubsystemRecord) -> Result<SubsystemState, CoreError> {
        Ok(match self.backend.status(&record.container)? {
            ContainerStatus::Running => SubsystemState::Running,
            ContainerStatus::Stopped => SubsystemState::Stopped,
            ContainerStatus::Missing => SubsystemState::NotCreated,
        })
    }

    fn missing_container(record: &SubsystemRecord) -> CoreError {
        CoreError::NotFound {
            kind: CONTAINER,
            name: record.container.clone(),
        }
    }

    fn set_state(&self, record: &SubsystemRecord, to: SubsystemState) -> Result<(), CoreError> {
        if record.state != to {
            self.subsystems.update_state(&record.name, to)?;
        }
        Ok(())
    }

    pub fn start(&self, name: &str) -> Result<(), CoreError> {
        info!("starting subsystem {name}");
        let record = self.load_subsystem(name)?;
        match record.state {
            SubsystemState::NotCreated => return Err(Self::missing_container(&record)),
            SubsystemState::Running => {
                debug!("subsystem {name} already running");
            }
            state => {
                validate_transition(state, SubsystemState::Running)?;
                self.backend
                    .start(&record.container)
                    .map_err(|e| CoreError::Provision {
                        name: name.to_owned(),
                        reason: e.to_string(),
                    })?;
            }
        }
        self.set_state(&record, SubsystemState::Running)
    }

    pub fn stop(&self, name: &str) -> Result<(), CoreError> {
        info!("stopping subsystem {name}");
        let record = self.load_subsystem(name)?;
        match record.state {
            SubsystemState::NotCreated => return Err(Self::missing_container(&record)),
            SubsystemState::Stopped => {
                debug!("subsystem {name} already stopped");
            }
            state => {
                validate_transition(state, SubsystemState::Stopped)?;
                self.backend
                    .stop(&record.container)
                    .map_err(|e| CoreError::Provision {
                        name: name.to_owned(),
                        reason: e.to_string(),
                    })?;
            }
        }
        self.set_state(&record, SubsystemState::Stopped)
    }

    /// Load the record and make sure its container is running.
    pub(crate) fn running_subsystem(&self, name: &str) -> Result<SubsystemRecord, CoreError> {
        let record = self.load_subsystem(name)?;
        match record.state {
            SubsystemState::NotCreated => Err(Self::missing_container(&record)),
            SubsystemState::Running => Ok(record),
            _ => {
                self.start(name)?;
                self.load_subsystem(name)
            }
        }
    }

    pub(crate) fn runtime_error(record: &SubsystemRecord, e: RuntimeError) -> CoreError {
        match e {
            RuntimeError::ContainerMissing(_) => Self::missing_container(record),
            other => CoreError::Runtime(other),
        }
    }

    /// Run `argv` inside subsystem `name`, starting it if needed.
    ///
    /// A non-zero exit status is returned as [`CoreError::Execution`].
    pub fn exec(
        &self,
        name: &str,
        options: ExecOptions,
        argv: &[String],
    ) -> Result<ExecOutput, CoreError> {
        debug!("exec in subsystem {name}: {argv:?}");
        let record = self.running_subsystem(name)?;
        let output = self
            .backend
            .exec(&record.container, options, argv)
            .map_err(|e| Self::runtime_error(&record, e))?;
        if output.success() {
            Ok(output)
        } else {
            Err(CoreError::Execution { code: output.code })
        }
    }

    /// Open an interactive shell in subsystem `name`.
    pub fn enter(&self, name: &str) -> Result<(), CoreError> {
        info!("entering subsystem {name}");
        let record = self.running_subsystem(name)?;
        let output = self
            .backend
            .enter(&record.container)
            .map_err(|e| Self::runtime_error(&record, e))?;
        if output.success() {
            Ok(())
        } else {
            Err(CoreError::Execution { code: output.code })
        }
    }

    /// Tear down the container, withdraw everything exported from it, and
    /// delete the record. Removing an unknown subsystem succeeds.
    pub fn remove(&self, name: &str) -> Result<(), CoreError> {
        validate_name(SUBSYSTEM, name)?;
        if !self.subsystems.exists(name) {
            debug!("subsystem {name} already removed");
            return Ok(());
        }
        info!("removing subsystem {name}");
        let record = self.load_subsystem(name)?;
        validate_transition(record.state, SubsystemState::Removed)?;

        self.backend
            .remove(&record.container)
            .map_err(|e| CoreError::Provision {
                name: name.to_owned(),
                reason: e.to_string(),
            })?;

        match self.unexport_all(name) {
            Ok(n) if n > 0 => info!("withdrew {n} exported item(s) of {name}"),
            Ok(_) => {}
            Err(e) => warn!("failed to withdraw exports of {name}: {e}"),
        }

        self.subsystems.remove(name)?;
        Ok(())
    }

    /// Remove and re-create `name` from its own stack snapshot, home, and
    /// init setting. The stack definition is not consulted.
    pub fn reset(&self, name: &str) -> Result<SubsystemRecord, CoreError> {
        info!("resetting subsystem {name}");
        let old = self.subsystems.get(name)?;
        self.remove(name)?;
        let mut fresh = SubsystemRecord::new(old.name, old.stack, old.home, old.init);
        self.create(&mut fresh)?;
        Ok(fresh)
    }
}
