//! Microkern - a minimal plugin microkernel.
//!
//! Discovers WebAssembly plugins in a directory, loads the ones that honor
//! the plugin contract and dispatches user input to them.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use microkern::{Config, Kernel, Shell};

/// A minimal plugin microkernel
#[derive(Parser)]
#[command(name = "microkern")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory to load plugins from (overrides the config file)
    #[arg(long, global = true, env = "MICROKERN_PLUGIN_DIR", value_name = "DIR")]
    plugin_dir: Option<PathBuf>,

    /// Configuration file to use instead of the default lookup
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load plugins and open the interactive menu (default)
    Shell,

    /// Load plugins and list them
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Load plugins and run one of them once
    Run {
        /// 1-based plugin number, as shown by `list`
        index: usize,

        /// Input passed to the plugin (joined with spaces)
        input: Vec<String>,
    },

    /// Show the effective configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    let config = load_config(&cli)?;

    // Handle commands
    match &cli.command {
        None | Some(Commands::Shell) => cmd_shell(config),
        Some(Commands::List { format }) => cmd_list(config, *format),
        Some(Commands::Run { index, input }) => cmd_run(config, *index, &input.join(" ")),
        Some(Commands::Config { path }) => cmd_config(&cli, &config, *path),
    }
}

/// Resolve the effective configuration from file lookup and flags.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };

    if let Some(dir) = &cli.plugin_dir {
        config.kernel.plugin_dir.clone_from(dir);
    }

    Ok(config)
}

/// Load plugins and run the interactive menu.
fn cmd_shell(config: Config) -> Result<ExitCode> {
    let mut kernel = Kernel::new(config.kernel)?;

    println!("Plugin system: microkernel pattern");
    println!("Scanning {}...\n", kernel.config().plugin_dir.display());
    kernel.load_all();

    let stdin = io::stdin();
    let mut shell = Shell::new(&mut kernel, stdin.lock(), io::stdout());
    shell.print_load_report()?;
    shell.run()?;

    Ok(ExitCode::SUCCESS)
}

/// List loaded plugins.
fn cmd_list(config: Config, format: Format) -> Result<ExitCode> {
    let mut kernel = Kernel::new(config.kernel)?;
    kernel.load_all();
    let summaries = kernel.summaries();

    match format {
        Format::Json => {
            let json = serde_json::to_string_pretty(&summaries)?;
            println!("{json}");
        }
        Format::Text => {
            for summary in &summaries {
                println!("[{}] {} - {}", summary.index, summary.name, summary.description);
            }
            for failure in kernel.failures() {
                eprintln!("{}", failure.render());
            }
            println!("\nTotal: {} plugins", summaries.len());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Dispatch a single invocation.
fn cmd_run(config: Config, index: usize, input: &str) -> Result<ExitCode> {
    let mut kernel = Kernel::new(config.kernel)?;
    kernel.load_all();

    match kernel.try_dispatch(index, input) {
        Ok(output) => {
            println!("{output}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Show configuration.
fn cmd_config(cli: &Cli, config: &Config, show_path: bool) -> Result<ExitCode> {
    if show_path {
        match cli.config.clone().or_else(Config::locate) {
            Some(path) => println!("{}", path.display()),
            None => {
                if let Some(dir) = Config::config_dir() {
                    println!("{}", dir.join("config.toml").display());
                }
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    print!("{}", config.to_toml()?);

    Ok(ExitCode::SUCCESS)
}
