use super::{confirm, core_err, is_tty, json_pretty, origin_label, EXIT_SUCCESS};
use berth_core::Engine;
use berth_schema::{PackageManager, Verb};
use clap::{Args, Subcommand};
use dialoguer::Input;
use std::path::{Path, PathBuf};

#[derive(Debug, Subcommand)]
pub enum PkgManagerCommand {
    /// List built-in and user package managers.
    List,
    /// Show one package manager.
    Show { name: String },
    /// Define a new package manager. Missing commands are prompted for.
    New {
        name: String,
        /// Prefix every command with sudo.
        #[arg(long, default_value_t = false)]
        need_sudo: bool,
        #[command(flatten)]
        templates: TemplateArgs,
        /// Fail instead of prompting for missing commands.
        #[arg(long, default_value_t = false)]
        no_prompt: bool,
    },
    /// Change commands of a user package manager.
    Update {
        name: String,
        /// Set whether commands are prefixed with sudo.
        #[arg(long)]
        need_sudo: Option<bool>,
        #[command(flatten)]
        templates: TemplateArgs,
    },
    /// Remove a user package manager no stack refers to.
    Rm {
        name: String,
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
    /// Write a package manager definition to a file.
    Export {
        name: String,
        /// Destination file (default: ./<name>.yaml).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Add a package manager from a definition file.
    Import {
        path: PathBuf,
        /// Replace an existing user definition of the same name.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

/// One optional flag per verb.
#[derive(Debug, Default, Args)]
pub struct TemplateArgs {
    /// Command used to install packages.
    #[arg(long = "install", value_name = "CMD")]
    pub install: Option<String>,
    /// Command used to refresh the package index.
    #[arg(long = "update", value_name = "CMD")]
    pub update: Option<String>,
    #[arg(long = "remove", value_name = "CMD")]
    pub remove: Option<String>,
    /// Defaults to the remove command.
    #[arg(long = "purge", value_name = "CMD")]
    pub purge: Option<String>,
    /// Defaults to the remove command.
    #[arg(long = "autoremove", value_name = "CMD")]
    pub auto_remove: Option<String>,
    #[arg(long = "clean", value_name = "CMD")]
    pub clean: Option<String>,
    #[arg(long = "list", value_name = "CMD")]
    pub list: Option<String>,
    #[arg(long = "search", value_name = "CMD")]
    pub search: Option<String>,
    #[arg(long = "show", value_name = "CMD")]
    pub show: Option<String>,
    #[arg(long = "upgrade", value_name = "CMD")]
    pub upgrade: Option<String>,
}

impl TemplateArgs {
    fn get(&self, verb: Verb) -> Option<&str> {
        match verb {
            Verb::Install => self.install.as_deref(),
            Verb::Update => self.update.as_deref(),
            Verb::Remove => self.remove.as_deref(),
            Verb::Purge => self.purge.as_deref(),
            Verb::AutoRemove => self.auto_remove.as_deref(),
            Verb::Clean => self.clean.as_deref(),
            Verb::List => self.list.as_deref(),
            Verb::Search => self.search.as_deref(),
            Verb::Show => self.show.as_deref(),
            Verb::Upgrade => self.upgrade.as_deref(),
        }
    }

    fn apply(&self, pm: &mut PackageManager) {
        for verb in Verb::ALL {
            if let Some(template) = self.get(verb) {
                *pm.template_mut(verb) = template.trim().to_owned();
            }
        }
    }
}

pub fn run(engine: &Engine, command: PkgManagerCommand, json: bool) -> Result<u8, String> {
    match command {
        PkgManagerCommand::List => list(engine, json),
        PkgManagerCommand::Show { name } => show(engine, &name, json),
        PkgManagerCommand::New {
            name,
            need_sudo,
            templates,
            no_prompt,
        } => new(engine, &name, need_sudo, &templates, no_prompt, json),
        PkgManagerCommand::Update {
            name,
            need_sudo,
            templates,
        } => update(engine, &name, need_sudo, &templates, json),
        PkgManagerCommand::Rm { name, yes } => remove(engine, &name, yes, json),
        PkgManagerCommand::Export { name, output } => export(engine, &name, output, json),
        PkgManagerCommand::Import { path, force } => import(engine, &path, force, json),
    }
}

fn list(engine: &Engine, json: bool) -> Result<u8, String> {
    let pms = engine.list_pkg_managers().map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&pms)?);
    } else if pms.is_empty() {
        println!("no package managers found");
    } else {
        println!("{:<16} {:<10} {:<5} INSTALL", "NAME", "ORIGIN", "SUDO");
        for pm in &pms {
            println!(
                "{:<16} {:<10} {:<5} {}",
                pm.name,
                origin_label(pm.built_in),
                if pm.need_sudo { "yes" } else { "no" },
                pm.cmd_install
            );
        }
    }
    Ok(EXIT_SUCCESS)
}

fn print_pkg_manager(pm: &PackageManager) {
    println!("name:      {}", pm.name);
    println!("origin:    {}", origin_label(pm.built_in));
    println!("need sudo: {}", pm.need_sudo);
    for verb in Verb::ALL {
        println!("{:<10} {}", format!("{verb}:"), pm.template(verb));
    }
}

fn show(engine: &Engine, name: &str, json: bool) -> Result<u8, String> {
    let pm = engine.load_pkg_manager(name).map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&pm)?);
    } else {
        print_pkg_manager(&pm);
    }
    Ok(EXIT_SUCCESS)
}

fn prompt_missing(pm: &mut PackageManager) -> Result<(), String> {
    for verb in pm.missing_templates() {
        // Answering remove also satisfies purge and autoRemove.
        if pm.resolve_template(verb).is_some() {
            continue;
        }
        let template: String = Input::new()
            .with_prompt(format!("command for '{verb}'"))
            .interact_text()
            .map_err(|e| format!("prompt failed: {e}"))?;
        *pm.template_mut(verb) = template.trim().to_owned();
    }
    Ok(())
}

fn new(
    engine: &Engine,
    name: &str,
    need_sudo: bool,
    templates: &TemplateArgs,
    no_prompt: bool,
    json: bool,
) -> Result<u8, String> {
    let mut pm = PackageManager::new(name, need_sudo);
    templates.apply(&mut pm);
    if !no_prompt && !pm.missing_templates().is_empty() && is_tty() {
        prompt_missing(&mut pm)?;
    }
    let stored = engine.create_pkg_manager(&pm).map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&stored)?);
    } else {
        println!("created package manager '{}'", stored.name);
    }
    Ok(EXIT_SUCCESS)
}

fn update(
    engine: &Engine,
    name: &str,
    need_sudo: Option<bool>,
    templates: &TemplateArgs,
    json: bool,
) -> Result<u8, String> {
    let updated = engine
        .update_pkg_manager(name, |pm| {
            if let Some(sudo) = need_sudo {
                pm.need_sudo = sudo;
            }
            templates.apply(pm);
        })
        .map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&updated)?);
    } else {
        println!("updated package manager '{}'", updated.name);
    }
    Ok(EXIT_SUCCESS)
}

fn remove(engine: &Engine, name: &str, yes: bool, json: bool) -> Result<u8, String> {
    if !confirm(&format!("remove package manager '{name}'?"), yes)? {
        println!("aborted");
        return Ok(EXIT_SUCCESS);
    }
    engine.remove_pkg_manager(name).map_err(core_err)?;
    if json {
        let payload = serde_json::json!({ "name": name, "status": "removed" });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("removed package manager '{name}'");
    }
    Ok(EXIT_SUCCESS)
}

pub(crate) fn default_export_path(name: &str, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| PathBuf::from(format!("{name}.yaml")))
}

fn export(engine: &Engine, name: &str, output: Option<PathBuf>, json: bool) -> Result<u8, String> {
    let dest = default_export_path(name, output);
    engine.export_pkg_manager(name, &dest).map_err(core_err)?;
    if json {
        let payload = serde_json::json!({ "name": name, "path": dest });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("exported package manager '{name}' to {}", dest.display());
    }
    Ok(EXIT_SUCCESS)
}

fn import(engine: &Engine, path: &Path, force: bool, json: bool) -> Result<u8, String> {
    let pm = engine.import_pkg_manager(path, force).map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&pm)?);
    } else {
        println!("imported package manager '{}'", pm.name);
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_args_set_only_given_verbs() {
        let args = TemplateArgs {
            install: Some(" apt install -y ".to_owned()),
            search: Some("apt search".to_owned()),
            ..TemplateArgs::default()
        };
        let mut pm = PackageManager::new("apt", false).with_template(Verb::List, "apt list");
        args.apply(&mut pm);
        assert_eq!(pm.cmd_install, "apt install -y");
        assert_eq!(pm.cmd_search, "apt search");
        assert_eq!(pm.cmd_list, "apt list");
        assert_eq!(pm.cmd_show, "");
    }

    #[test]
    fn export_path_defaults_to_name() {
        assert_eq!(default_export_path("apt", None), PathBuf::from("apt.yaml"));
        assert_eq!(
            default_export_path("apt", Some(PathBuf::from("/tmp/x.yml"))),
            PathBuf::from("/tmp/x.yml")
        );
    }
}
