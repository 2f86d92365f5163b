mod commands;

use berth_core::{Config, Engine};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::pkgmanagers::PkgManagerCommand;
use commands::stacks::StackCommand;
use commands::subsystems::SubsystemCommand;
use commands::{core_err, exit_code_for};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "berth",
    version,
    about = "Package-manager-aware container subsystems"
)]
struct Cli {
    /// Read settings from this file instead of the default locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Parent directory of the user store (overrides config).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory holding built-in definitions (overrides config).
    #[arg(long, global = true)]
    builtin_dir: Option<PathBuf>,

    /// Container backend: distrobox or mock (overrides config).
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage package manager definitions.
    #[command(subcommand)]
    Pkgmanagers(PkgManagerCommand),
    /// Manage stack definitions.
    #[command(subcommand)]
    Stacks(StackCommand),
    /// Create, list, remove, and reset subsystems.
    #[command(subcommand)]
    Subsystems(SubsystemCommand),
    /// Open a shell in a subsystem.
    Enter {
        /// Subsystem name.
        name: String,
    },
    /// Run a command in a subsystem.
    Run {
        /// Subsystem name.
        name: String,
        /// Command and arguments (after --).
        #[arg(required = true, last = true)]
        command: Vec<String>,
    },
    /// Start a subsystem's container.
    Start {
        /// Subsystem name.
        name: String,
    },
    /// Stop a subsystem's container.
    Stop {
        /// Subsystem name.
        name: String,
    },
    /// Run a package verb (install, remove, search, ...) in a subsystem.
    Pkg {
        /// Subsystem name.
        name: String,
        /// One of: install, update, remove, purge, autoremove, clean, list,
        /// search, show, upgrade.
        verb: String,
        /// Packages or other arguments passed through verbatim.
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
        /// Do not export desktop entries of installed packages.
        #[arg(long, default_value_t = false)]
        no_export: bool,
    },
    /// Publish an application or binary of a subsystem on the host.
    Export {
        /// Subsystem name.
        name: String,
        /// Application whose desktop entry is exported.
        #[arg(long, required_unless_present = "bin")]
        app: Option<String>,
        /// Binary exported as a shim.
        #[arg(long)]
        bin: Option<String>,
        /// Directory for the shim (default: ~/.local/bin).
        #[arg(long, requires = "bin")]
        output: Option<PathBuf>,
    },
    /// Withdraw an exported application or binary.
    Unexport {
        /// Subsystem name.
        name: String,
        #[arg(long, required_unless_present = "bin")]
        app: Option<String>,
        #[arg(long)]
        bin: Option<String>,
        #[arg(long, requires = "bin")]
        output: Option<PathBuf>,
    },
    /// Write the bundled package managers and stacks into a directory.
    InstallBuiltins {
        /// Target directory (usually the built-in directory).
        dir: PathBuf,
        /// Overwrite files that already exist.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

impl Commands {
    fn needs_runtime(&self) -> bool {
        matches!(
            self,
            Commands::Subsystems(
                SubsystemCommand::New { .. }
                    | SubsystemCommand::Rm { .. }
                    | SubsystemCommand::Reset { .. }
            ) | Commands::Enter { .. }
                | Commands::Run { .. }
                | Commands::Start { .. }
                | Commands::Stop { .. }
                | Commands::Pkg { .. }
                | Commands::Export { .. }
                | Commands::Unexport { .. }
        )
    }
}

struct GlobalOpts {
    config: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    builtin_dir: Option<PathBuf>,
    backend: Option<String>,
}

fn load_config(opts: GlobalOpts) -> Result<Config, String> {
    let mut config = match &opts.config {
        Some(path) => Config::load(path),
        None => Config::discover(),
    }
    .map_err(core_err)?;
    if opts.data_dir.is_some() {
        config.data_dir = opts.data_dir;
    }
    if opts.builtin_dir.is_some() {
        config.builtin_dir = opts.builtin_dir;
    }
    if opts.backend.is_some() {
        config.backend = opts.backend;
    }
    Ok(config)
}

fn check_prereqs(config: &Config) -> Result<(), String> {
    if config.backend_name() != "distrobox"
        || std::env::var("BERTH_SKIP_PREREQS").as_deref() == Ok("1")
    {
        return Ok(());
    }
    let program = config
        .distrobox_path
        .as_ref()
        .map_or_else(|| "distrobox".to_owned(), |p| p.display().to_string());
    let missing = berth_runtime::check_distrobox_prereqs(&program);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(berth_runtime::format_missing(&missing))
    }
}

/// How exported entries and shims call back into berth.
fn launcher() -> String {
    std::env::current_exe()
        .ok()
        .map_or_else(|| "berth".to_owned(), |p| p.display().to_string())
}

fn open_engine(opts: GlobalOpts, needs_runtime: bool) -> Result<Engine, String> {
    let config = load_config(opts)?;
    if needs_runtime {
        check_prereqs(&config)?;
    }
    Ok(Engine::from_config(&config)
        .map_err(core_err)?
        .with_launcher(launcher()))
}

fn run_with_engine(engine: &Engine, command: Commands, json: bool) -> Result<u8, String> {
    match command {
        Commands::Pkgmanagers(cmd) => commands::pkgmanagers::run(engine, cmd, json),
        Commands::Stacks(cmd) => commands::stacks::run(engine, cmd, json),
        Commands::Subsystems(cmd) => commands::subsystems::run(engine, cmd, json),
        Commands::Enter { name } => commands::enter::run(engine, &name),
        Commands::Run { name, command } => commands::run::run(engine, &name, &command),
        Commands::Start { name } => commands::start::run(engine, &name),
        Commands::Stop { name } => commands::stop::run(engine, &name),
        Commands::Pkg {
            name,
            verb,
            args,
            no_export,
        } => commands::pkg::run(engine, &name, &verb, &args, no_export, json),
        Commands::Export {
            name,
            app,
            bin,
            output,
        } => commands::export::run(
            engine,
            &name,
            app.as_deref(),
            bin.as_deref(),
            output.as_deref(),
            json,
        ),
        Commands::Unexport {
            name,
            app,
            bin,
            output,
        } => commands::unexport::run(
            engine,
            &name,
            app.as_deref(),
            bin.as_deref(),
            output.as_deref(),
            json,
        ),
        Commands::InstallBuiltins { .. } | Commands::Completions { .. } | Commands::ManPages { .. } => {
            Err("command is handled before the store is opened".to_owned())
        }
    }
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BERTH_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    let opts = GlobalOpts {
        config: cli.config,
        data_dir: cli.data_dir,
        builtin_dir: cli.builtin_dir,
        backend: cli.backend,
    };

    let result = match cli.command {
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
        Commands::InstallBuiltins { dir, force } => {
            commands::install_builtins::run(&dir, force, json)
        }
        command => {
            let needs_runtime = command.needs_runtime();
            open_engine(opts, needs_runtime)
                .and_then(|engine| run_with_engine(&engine, command, json))
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}
