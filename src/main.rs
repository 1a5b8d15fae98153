mod commands;
mod compiler;
mod config;
mod diagnostics;
mod error;
mod modules;
mod naming;
mod pipeline;
mod resolver;
mod rewrite;
mod scanner;
mod types;
mod watch;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;

use crate::commands::Session;
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "dustlink",
    about = "Resolve partial references between Dust templates and compile them into modules"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Config file (default: ./dustlink.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Template root, in priority order (repeatable; replaces configured roots)
    #[arg(long = "path", global = true)]
    paths: Vec<PathBuf>,
    /// Log resolution details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every template under the roots into the output directory
    Build {
        /// Output directory (overrides `out_dir`)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Compile one template into a module
    Compile {
        /// Template file
        file: PathBuf,
        /// Write the module here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the template files a template depends on
    Deps {
        /// Template file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a template's canonical identifier
    Name {
        /// Template file
        file: PathBuf,
    },
    /// Print the template file a canonical identifier denotes
    Resolve {
        /// Canonical identifier, e.g. `home-widgets-welcome`
        identifier: String,
    },
    /// Build, then rebuild whenever a template changes
    Watch {
        /// Output directory (overrides `out_dir`)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

/// Send tracing output to stderr; `verbose` lowers the threshold to debug.
fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .init();
}

/// Load `--config` if given, else `./dustlink.toml`, then apply `--path`.
///
/// # Errors
///
/// Returns config loading errors.
fn load_config(cli: &Cli) -> Result<Config, error::Error> {
    let config = match &cli.config {
        Some(path) => Config::load_file(path)?,
        None => Config::load(Path::new("."))?,
    };
    return Ok(config.override_roots(&cli.paths));
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            diagnostics::print_error(&e);
            return ExitCode::FAILURE;
        },
    };
    init_logging(cli.verbose || config.verbose);

    // Tree-wide commands name every template against one root set; without
    // configured roots that is the working directory.
    let config = match cli.command {
        Commands::Build { .. } | Commands::Resolve { .. } | Commands::Watch { .. } => {
            config.with_fallback_root(Path::new("."))
        },
        Commands::Compile { .. } | Commands::Deps { .. } | Commands::Name { .. } => config,
    };

    let session = Session::new(config);
    let result = run(&session, &cli.command);

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    };
}

/// Dispatch a subcommand.
///
/// # Errors
///
/// Returns whatever the command fails with.
fn run(session: &Session, command: &Commands) -> Result<ExitCode, error::Error> {
    let default_out = session.config().out_dir.clone();

    match command {
        Commands::Build { out_dir } => {
            let out_dir = out_dir.clone().unwrap_or(default_out);
            let report = commands::build(session, &out_dir)?;
            return Ok(report.exit_code());
        },
        Commands::Compile { file, output } => commands::compile(session, file, output.as_deref())?,
        Commands::Deps { file, json } => commands::deps(session, file, *json)?,
        Commands::Name { file } => commands::name(session, file),
        Commands::Resolve { identifier } => commands::resolve(session, identifier)?,
        Commands::Watch { out_dir } => {
            let out_dir = out_dir.clone().unwrap_or(default_out);
            return watch::run(session, &out_dir);
        },
    }
    return Ok(ExitCode::SUCCESS);
}
