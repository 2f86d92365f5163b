use super::{colorize_state, confirm, core_err, json_pretty, with_spinner, EXIT_SUCCESS};
use berth_core::Engine;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum SubsystemCommand {
    /// List subsystems and their state.
    List,
    /// Show a subsystem, its stack copy, and what it exports.
    Show { name: String },
    /// Create a subsystem from a stack.
    New {
        name: String,
        #[arg(short, long)]
        stack: String,
        /// Custom home directory for the container.
        #[arg(long)]
        home: Option<PathBuf>,
        /// Run systemd as init inside the container.
        #[arg(long, default_value_t = false)]
        init: bool,
    },
    /// Remove a subsystem, its container, and everything it exported.
    Rm {
        name: String,
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
    /// Recreate a subsystem from the stack it was created with.
    Reset {
        name: String,
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
}

pub fn run(engine: &Engine, command: SubsystemCommand, json: bool) -> Result<u8, String> {
    match command {
        SubsystemCommand::List => list(engine, json),
        SubsystemCommand::Show { name } => show(engine, &name, json),
        SubsystemCommand::New {
            name,
            stack,
            home,
            init,
        } => new(engine, &name, &stack, home, init, json),
        SubsystemCommand::Rm { name, yes } => remove(engine, &name, yes, json),
        SubsystemCommand::Reset { name, yes } => reset(engine, &name, yes, json),
    }
}

fn list(engine: &Engine, json: bool) -> Result<u8, String> {
    let records = engine.list_subsystems().map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&records)?);
    } else if records.is_empty() {
        println!("no subsystems found");
    } else {
        println!("{:<16} {:<16} {:<12} CONTAINER", "NAME", "STACK", "STATE");
        for r in &records {
            let state = r.state.to_string();
            println!(
                "{:<16} {:<16} {:<12} {}",
                r.name,
                r.stack.name,
                colorize_state(&state),
                r.container
            );
        }
    }
    Ok(EXIT_SUCCESS)
}

fn show(engine: &Engine, name: &str, json: bool) -> Result<u8, String> {
    let record = engine.load_subsystem(name).map_err(core_err)?;
    let exported = engine.list_exported(name).map_err(core_err)?;
    if json {
        let payload = serde_json::json!({
            "subsystem": record,
            "exported": exported,
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }
    println!("name:        {}", record.name);
    println!("state:       {}", colorize_state(&record.state.to_string()));
    println!("container:   {}", record.container);
    println!("stack:       {}", record.stack.name);
    println!("base:        {}", record.stack.base);
    println!("pkg manager: {}", record.stack.pkg_manager);
    if let Some(home) = &record.home {
        println!("home:        {}", home.display());
    }
    println!("init:        {}", record.init);
    println!("created:     {}", record.created_at);
    if !exported.desktop_entries.is_empty() {
        println!("apps:        {}", exported.desktop_entries.join(" "));
    }
    if !exported.binaries.is_empty() {
        println!("binaries:    {}", exported.binaries.join(" "));
    }
    Ok(EXIT_SUCCESS)
}

fn new(
    engine: &Engine,
    name: &str,
    stack: &str,
    home: Option<PathBuf>,
    init: bool,
    json: bool,
) -> Result<u8, String> {
    let mut record = engine
        .new_subsystem(name, stack, home, init)
        .map_err(core_err)?;
    with_spinner(
        json,
        &format!("creating subsystem '{name}'..."),
        &format!("subsystem '{name}' created"),
        "create failed",
        || engine.create(&mut record),
    )?;
    if json {
        println!("{}", json_pretty(&record)?);
    }
    Ok(EXIT_SUCCESS)
}

fn remove(engine: &Engine, name: &str, yes: bool, json: bool) -> Result<u8, String> {
    if !confirm(&format!("remove subsystem '{name}' and its container?"), yes)? {
        println!("aborted");
        return Ok(EXIT_SUCCESS);
    }
    with_spinner(
        json,
        &format!("removing subsystem '{name}'..."),
        &format!("subsystem '{name}' removed"),
        "remove failed",
        || engine.remove(name),
    )?;
    if json {
        let payload = serde_json::json!({ "name": name, "status": "removed" });
        println!("{}", json_pretty(&payload)?);
    }
    Ok(EXIT_SUCCESS)
}

fn reset(engine: &Engine, name: &str, yes: bool, json: bool) -> Result<u8, String> {
    if !confirm(
        &format!("reset subsystem '{name}'? Changes inside the container are lost"),
        yes,
    )? {
        println!("aborted");
        return Ok(EXIT_SUCCESS);
    }
    let record = with_spinner(
        json,
        &format!("resetting subsystem '{name}'..."),
        &format!("subsystem '{name}' reset"),
        "reset failed",
        || engine.reset(name),
    )?;
    if json {
        println!("{}", json_pretty(&record)?);
    }
    Ok(EXIT_SUCCESS)
}
