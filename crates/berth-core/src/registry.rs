//! Package manager and stack registry operations.

use crate::engine::Engine;
use crate::CoreError;
use berth_schema::{Definition, PackageManager, Stack};
use berth_store::{DefinitionStore, Tier};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

fn store_definition<D: Definition>(
    store: &DefinitionStore<D>,
    def: &D,
    overwrite: bool,
) -> Result<D, CoreError> {
    let stored = if overwrite {
        store.save(def)?
    } else {
        store.create(def)?
    };
    info!("saved {} '{}'", D::KIND, stored.name());
    Ok(stored)
}

/// Load, modify, check, and save a user definition. Renaming is not allowed.
fn update_definition<D: Definition>(
    store: &DefinitionStore<D>,
    name: &str,
    change: impl FnOnce(&mut D),
    check: impl FnOnce(&D) -> Result<(), CoreError>,
) -> Result<D, CoreError> {
    let mut def = store.load(name)?;
    if def.is_built_in() {
        return Err(CoreError::BuiltIn {
            kind: D::KIND,
            name: name.to_owned(),
        });
    }
    change(&mut def);
    if def.name() != name {
        return Err(CoreError::Validation(format!(
            "{} '{name}' cannot be renamed to '{}'",
            D::KIND,
            def.name()
        )));
    }
    check(&def)?;
    Ok(store.save(&def)?)
}

/// Make sure `name` is a user definition that may be deleted.
fn removable<D: Definition>(store: &DefinitionStore<D>, name: &str) -> Result<(), CoreError> {
    match store.tier_of(name) {
        Some(Tier::User) => Ok(()),
        Some(Tier::BuiltIn) => Err(CoreError::BuiltIn {
            kind: D::KIND,
            name: name.to_owned(),
        }),
        None => Err(CoreError::NotFound {
            kind: D::KIND,
            name: name.to_owned(),
        }),
    }
}

fn refuse_dependents(
    kind: &'static str,
    name: &str,
    dependents: Vec<String>,
) -> Result<(), CoreError> {
    if dependents.is_empty() {
        Ok(())
    } else {
        Err(CoreError::ReferentialIntegrity {
            kind,
            name: name.to_owned(),
            dependents,
        })
    }
}

impl Engine {
    pub fn list_pkg_managers(&self) -> Result<Vec<PackageManager>, CoreError> {
        Ok(self.pkg_managers.list()?)
    }

    pub fn load_pkg_manager(&self, name: &str) -> Result<PackageManager, CoreError> {
        Ok(self.pkg_managers.load(name)?)
    }

    pub fn pkg_manager_exists(&self, name: &str) -> bool {
        self.pkg_managers.exists(name)
    }

    /// Save a new user package manager; fails if the name is taken.
    pub fn create_pkg_manager(&self, pm: &PackageManager) -> Result<PackageManager, CoreError> {
        store_definition(&self.pkg_managers, pm, false)
    }

    /// Save a user package manager, replacing one of the same name.
    pub fn save_pkg_manager(&self, pm: &PackageManager) -> Result<PackageManager, CoreError> {
        store_definition(&self.pkg_managers, pm, true)
    }

    pub fn update_pkg_manager(
        &self,
        name: &str,
        change: impl FnOnce(&mut PackageManager),
    ) -> Result<PackageManager, CoreError> {
        update_definition(&self.pkg_managers, name, change, |_| Ok(()))
    }

    /// Names of every stack, built-in or user, that uses package manager `name`.
    /// Fails if any stack file cannot be read.
    pub fn stacks_using(&self, name: &str) -> Result<Vec<String>, CoreError> {
        let mut users = BTreeSet::new();
        for tier in [Tier::BuiltIn, Tier::User] {
            for (stack_name, stack) in self.stacks.scan_tier(tier)? {
                if stack.pkg_manager == name {
                    users.insert(stack_name);
                }
            }
        }
        Ok(users.into_iter().collect())
    }

    /// Delete a user package manager. Nothing is deleted while any stack
    /// still refers to it.
    pub fn remove_pkg_manager(&self, name: &str) -> Result<(), CoreError> {
        removable(&self.pkg_managers, name)?;
        refuse_dependents(PackageManager::KIND, name, self.stacks_using(name)?)?;
        self.pkg_managers.remove(name)?;
        info!("removed package manager '{name}'");
        Ok(())
    }

    pub fn export_pkg_manager(&self, name: &str, dest: &Path) -> Result<(), CoreError> {
        Ok(self.pkg_managers.export(name, dest)?)
    }

    /// Read a package manager from `path` and save it as a user definition.
    pub fn import_pkg_manager(
        &self,
        path: &Path,
        overwrite: bool,
    ) -> Result<PackageManager, CoreError> {
        let pm = self.pkg_managers.load_from_path(path)?;
        store_definition(&self.pkg_managers, &pm, overwrite)
    }

    pub fn list_stacks(&self) -> Result<Vec<Stack>, CoreError> {
        Ok(self.stacks.list()?)
    }

    pub fn load_stack(&self, name: &str) -> Result<Stack, CoreError> {
        Ok(self.stacks.load(name)?)
    }

    pub fn stack_exists(&self, name: &str) -> bool {
        self.stacks.exists(name)
    }

    /// The package manager `stack` refers to.
    pub fn resolve_pkg_manager(&self, stack: &Stack) -> Result<PackageManager, CoreError> {
        self.pkg_managers
            .load(&stack.pkg_manager)
            .map_err(|e| match e {
                berth_store::StoreError::NotFound { .. } => CoreError::UnresolvedReference {
                    kind: Stack::KIND,
                    name: stack.name.to_string(),
                    target_kind: PackageManager::KIND,
                    target: stack.pkg_manager.to_string(),
                },
                other => other.into(),
            })
    }

    fn check_stack(&self, stack: &Stack) -> Result<(), CoreError> {
        let mut prepared = stack.clone();
        prepared.prepare()?;
        self.resolve_pkg_manager(&prepared).map(|_| ())
    }

    /// Save a new user stack; its package manager must exist.
    pub fn create_stack(&self, stack: &Stack) -> Result<Stack, CoreError> {
        self.check_stack(stack)?;
        store_definition(&self.stacks, stack, false)
    }

    pub fn save_stack(&self, stack: &Stack) -> Result<Stack, CoreError> {
        self.check_stack(stack)?;
        store_definition(&self.stacks, stack, true)
    }

    /// Subsystems never follow later edits; only new subsystems see them.
    pub fn update_stack(
        &self,
        name: &str,
        change: impl FnOnce(&mut Stack),
    ) -> Result<Stack, CoreError> {
        update_definition(&self.stacks, name, change, |stack| self.check_stack(stack))
    }

    /// Names of subsystems created from stack `name`.
    pub fn subsystems_using(&self, name: &str) -> Result<Vec<String>, CoreError> {
        Ok(self.subsystems.bound_to(name)?)
    }

    /// Delete a user stack. Nothing is deleted while any subsystem was
    /// created from it.
    pub fn remove_stack(&self, name: &str) -> Result<(), CoreError> {
        removable(&self.stacks, name)?;
        refuse_dependents(Stack::KIND, name, self.subsystems_using(name)?)?;
        self.stacks.remove(name)?;
        info!("removed stack '{name}'");
        Ok(())
    }

    pub fn export_stack(&self, name: &str, dest: &Path) -> Result<(), CoreError> {
        Ok(self.stacks.export(name, dest)?)
    }

    pub fn import_stack(&self, path: &Path, overwrite: bool) -> Result<Stack, CoreError> {
        let stack = self.stacks.load_from_path(path)?;
        self.check_stack(&stack)?;
        store_definition(&self.stacks, &stack, overwrite)
    }
}
