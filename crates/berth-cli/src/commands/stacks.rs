use super::pkgmanagers::default_export_path;
use super::{confirm, core_err, is_tty, json_pretty, origin_label, EXIT_SUCCESS};
use berth_core::Engine;
use berth_schema::Stack;
use clap::Subcommand;
use dialoguer::{Input, Select};
use std::path::{Path, PathBuf};

#[derive(Debug, Subcommand)]
pub enum StackCommand {
    /// List built-in and user stacks.
    List,
    /// Show one stack.
    Show { name: String },
    /// Define a new stack.
    New {
        name: String,
        /// Base image, e.g. docker.io/library/ubuntu:24.04.
        #[arg(long)]
        base: Option<String>,
        /// Package manager used inside the image.
        #[arg(long)]
        pkg_manager: Option<String>,
        /// Packages preinstalled in every subsystem (comma-separated).
        #[arg(long, value_delimiter = ',')]
        packages: Vec<String>,
        /// Fail instead of prompting for missing values.
        #[arg(long, default_value_t = false)]
        no_prompt: bool,
    },
    /// Change a user stack. Existing subsystems keep their copy.
    Update {
        name: String,
        #[arg(long)]
        base: Option<String>,
        #[arg(long)]
        pkg_manager: Option<String>,
        /// Add packages (comma-separated).
        #[arg(long, value_delimiter = ',')]
        add: Vec<String>,
        /// Drop packages (comma-separated).
        #[arg(long, value_delimiter = ',')]
        drop: Vec<String>,
    },
    /// Remove a user stack no subsystem was created from.
    Rm {
        name: String,
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
    /// Write a stack definition to a file.
    Export {
        name: String,
        /// Destination file (default: ./<name>.yaml).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Add a stack from a definition file.
    Import {
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

pub fn run(engine: &Engine, command: StackCommand, json: bool) -> Result<u8, String> {
    match command {
        StackCommand::List => list(engine, json),
        StackCommand::Show { name } => show(engine, &name, json),
        StackCommand::New {
            name,
            base,
            pkg_manager,
            packages,
            no_prompt,
        } => new(engine, &name, base, pkg_manager, packages, no_prompt, json),
        StackCommand::Update {
            name,
            base,
            pkg_manager,
            add,
            drop,
        } => update(engine, &name, base, pkg_manager, &add, &drop, json),
        StackCommand::Rm { name, yes } => remove(engine, &name, yes, json),
        StackCommand::Export { name, output } => {
            let dest = default_export_path(&name, output);
            engine.export_stack(&name, &dest).map_err(core_err)?;
            if json {
                let payload = serde_json::json!({ "name": name, "path": dest });
                println!("{}", json_pretty(&payload)?);
            } else {
                println!("exported stack '{name}' to {}", dest.display());
            }
            Ok(EXIT_SUCCESS)
        }
        StackCommand::Import { path, force } => import(engine, &path, force, json),
    }
}

fn list(engine: &Engine, json: bool) -> Result<u8, String> {
    let stacks = engine.list_stacks().map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&stacks)?);
    } else if stacks.is_empty() {
        println!("no stacks found");
    } else {
        println!("{:<16} {:<10} {:<12} BASE", "NAME", "ORIGIN", "PKG_MANAGER");
        for stack in &stacks {
            println!(
                "{:<16} {:<10} {:<12} {}",
                stack.name,
                origin_label(stack.built_in),
                stack.pkg_manager,
                stack.base
            );
        }
    }
    Ok(EXIT_SUCCESS)
}

fn show(engine: &Engine, name: &str, json: bool) -> Result<u8, String> {
    let stack = engine.load_stack(name).map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&stack)?);
    } else {
        println!("name:        {}", stack.name);
        println!("origin:      {}", origin_label(stack.built_in));
        println!("base:        {}", stack.base);
        println!("pkg manager: {}", stack.pkg_manager);
        if stack.packages.is_empty() {
            println!("packages:    (none)");
        } else {
            println!("packages:    {}", stack.packages.join(" "));
        }
    }
    Ok(EXIT_SUCCESS)
}

fn prompt_base() -> Result<String, String> {
    Input::new()
        .with_prompt("base image")
        .interact_text()
        .map_err(|e| format!("prompt failed: {e}"))
}

fn prompt_pkg_manager(engine: &Engine) -> Result<String, String> {
    let names: Vec<String> = engine
        .list_pkg_managers()
        .map_err(core_err)?
        .into_iter()
        .map(|pm| pm.name.into_inner())
        .collect();
    if names.is_empty() {
        return Err("no package managers defined; create one first".to_owned());
    }
    let idx = Select::new()
        .with_prompt("package manager")
        .items(&names)
        .default(0)
        .interact()
        .map_err(|e| format!("prompt failed: {e}"))?;
    Ok(names[idx].clone())
}

fn new(
    engine: &Engine,
    name: &str,
    base: Option<String>,
    pkg_manager: Option<String>,
    packages: Vec<String>,
    no_prompt: bool,
    json: bool,
) -> Result<u8, String> {
    let interactive = !no_prompt && is_tty();
    let base = match base {
        Some(b) => b,
        None if interactive => prompt_base()?,
        None => return Err("missing --base".to_owned()),
    };
    let pkg_manager = match pkg_manager {
        Some(p) => p,
        None if interactive => prompt_pkg_manager(engine)?,
        None => return Err("missing --pkg-manager".to_owned()),
    };

    let stack = Stack::new(name, base, pkg_manager, packages);
    let stored = engine.create_stack(&stack).map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&stored)?);
    } else {
        println!("created stack '{}'", stored.name);
    }
    Ok(EXIT_SUCCESS)
}

fn update(
    engine: &Engine,
    name: &str,
    base: Option<String>,
    pkg_manager: Option<String>,
    add: &[String],
    drop: &[String],
    json: bool,
) -> Result<u8, String> {
    let updated = engine
        .update_stack(name, |stack| {
            if let Some(base) = base {
                stack.base = base;
            }
            if let Some(pm) = pkg_manager {
                stack.pkg_manager = pm.into();
            }
            stack.packages.retain(|p| !drop.contains(p));
            for pkg in add {
                if !stack.packages.contains(pkg) {
                    stack.packages.push(pkg.clone());
                }
            }
        })
        .map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&updated)?);
    } else {
        println!("updated stack '{}'", updated.name);
    }
    Ok(EXIT_SUCCESS)
}

fn remove(engine: &Engine, name: &str, yes: bool, json: bool) -> Result<u8, String> {
    if !confirm(&format!("remove stack '{name}'?"), yes)? {
        println!("aborted");
        return Ok(EXIT_SUCCESS);
    }
    engine.remove_stack(name).map_err(core_err)?;
    if json {
        let payload = serde_json::json!({ "name": name, "status": "removed" });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("removed stack '{name}'");
    }
    Ok(EXIT_SUCCESS)
}

fn import(engine: &Engine, path: &Path, force: bool, json: bool) -> Result<u8, String> {
    let stack = engine.import_stack(path, force).map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&stack)?);
    } else {
        println!("imported stack '{}'", stack.name);
    }
    Ok(EXIT_SUCCESS)
}
