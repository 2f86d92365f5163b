use crate::engine::Engine;
use crate::CoreError;
use berth_runtime::{ExecOptions, ExecOutput};
use berth_schema::Verb;
use tracing::{info, warn};

const INTERACTIVE: ExecOptions = ExecOptions {
    interactive: true,
    capture_output: false,
};

impl Engine {
    /// Expand `verb` with the package manager of subsystem `name` and run it
    /// there, attached to the terminal.
    pub fn dispatch<S: AsRef<str>>(
        &self,
        name: &str,
        verb: Verb,
        args: &[S],
    ) -> Result<ExecOutput, CoreError> {
        self.dispatch_with(name, verb, args, INTERACTIVE)
    }

    pub fn dispatch_with<S: AsRef<str>>(
        &self,
        name: &str,
        verb: Verb,
        args: &[S],
        options: ExecOptions,
    ) -> Result<ExecOutput, CoreError> {
        let argv = self.command_for(name, verb, args)?;
        info!("{verb} in {name}: {}", argv.join(" "));
        self.exec(name, options, &argv)
    }

    /// The argument vector `dispatch` would run, without running it.
    pub fn command_for<S: AsRef<str>>(
        &self,
        name: &str,
        verb: Verb,
        args: &[S],
    ) -> Result<Vec<String>, CoreError> {
        let record = self.subsystems.get(name)?;
        let pm = self.resolve_pkg_manager(&record.stack)?;
        Ok(pm.generate_command(verb, args)?)
    }

    /// Install `packages` and, when `export` is set, publish the desktop
    /// entries they ship. Returns the number of entries exported.
    pub fn install_packages(
        &self,
        name: &str,
        packages: &[String],
        export: bool,
    ) -> Result<usize, CoreError> {
        self.dispatch(name, Verb::Install, packages)?;
        if !export {
            return Ok(0);
        }
        match self.export_desktop_entries(name, packages) {
            Ok(n) => Ok(n),
            Err(e) => {
                warn!("packages installed in {name}, but exporting their launchers failed: {e}");
                Ok(0)
            }
        }
    }

    /// Withdraw the desktop entries of `packages`, then remove them.
    /// Returns the number of entries withdrawn.
    pub fn remove_packages(&self, name: &str, packages: &[String]) -> Result<usize, CoreError> {
        let withdrawn = match self.unexport_desktop_entries(name, packages) {
            Ok(n) => n,
            Err(e) => {
                warn!("failed to withdraw launchers from {name}: {e}");
                0
            }
        };
        self.dispatch(name, Verb::Remove, packages)?;
        Ok(withdrawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_runtime::mock::MockBackend;
    use berth_schema::{PackageManager, Stack};
    use berth_store::StoreLayout;

    fn engine_with_dev() -> (tempfile::TempDir, Engine) {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path().join("data"), dir.path().join("builtin"));
        let engine = Engine::new(
            layout,
            Box::new(MockBackend::new()),
            dir.path().join("applications"),
            dir.path().join("bin"),
        )
        .unwrap();
        let apt = PackageManager::new("apt", false)
            .with_template(Verb::Install, "apt install -y")
            .with_template(Verb::Remove, "apt remove -y")
            .with_template(Verb::Update, "apt update")
            .with_template(Verb::Upgrade, "apt upgrade -y")
            .with_template(Verb::List, "apt list --installed")
            .with_template(Verb::Search, "apt search")
            .with_template(Verb::Show, "apt show")
            .with_template(Verb::Clean, "apt clean");
        let saved = engine.create_pkg_manager(&apt).unwrap();
        assert_eq!(saved.cmd_purge, "apt remove -y");
        engine
            .create_stack(&Stack::new("ubuntu-apt", "ubuntu:24.04", "apt", vec![]))
            .unwrap();
        let mut record = engine
            .new_subsystem("dev", "ubuntu-apt", None, false)
            .unwrap();
        engine.create(&mut record).unwrap();
        (dir, engine)
    }

    #[test]
    fn search_routes_through_exec() {
        let (_dir, engine) = engine_with_dev();
        assert_eq!(
            engine.command_for("dev", Verb::Search, &["vim"]).unwrap(),
            vec!["apt", "search", "vim"]
        );
        let out = engine
            .dispatch_with("dev", Verb::Search, &["vim"], ExecOptions::captured())
            .unwrap();
        assert_eq!(out.stdout, "mock-exec: apt search vim\n");
    }

    #[test]
    fn purge_uses_remove_after_save() {
        let (_dir, engine) = engine_with_dev();
        assert_eq!(
            engine.command_for("dev", Verb::Purge, &["vim"]).unwrap(),
            vec!["apt", "remove", "-y", "vim"]
        );
    }

    #[test]
    fn unknown_subsystem_is_not_found() {
        let (_dir, engine) = engine_with_dev();
        assert!(matches!(
            engine.command_for("ghost", Verb::List, &[] as &[&str]),
            Err(CoreError::NotFound { kind: "subsystem", .. })
        ));
    }
}
