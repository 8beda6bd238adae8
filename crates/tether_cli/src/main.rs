//! Tether CLI: incremental native wrapper generation.
//!
//! Provides `tether generate` to bring the wrapper directory up to date,
//! `tether closure` to inspect the dependency closure of a set of types and
//! `tether clean` to discard all incremental state.

#![warn(missing_docs)]

mod clean;
mod closure;
mod generate;
mod project;

use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Tether: generates script wrappers for native types, incrementally.
#[derive(Parser, Debug)]
#[command(name = "tether", version, about = "Tether wrapper generator")]
pub struct Cli {
    /// Only report errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log at debug level, including per-task decisions.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `tether.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of `tether`.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate or update wrappers for every referenced type.
    Generate(GenerateArgs),
    /// Print the dependency closure of one or more types.
    Closure(ClosureArgs),
    /// Delete all incremental state so the next run is a full one.
    Clean,
}

/// Arguments for the `tether generate` subcommand.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Metabase file, overriding `paths.metabase`.
    #[arg(long)]
    pub metabase: Option<String>,

    /// Reference set file, overriding `paths.references` and `paths.sources`.
    #[arg(long)]
    pub references: Option<String>,
}

/// Arguments for the `tether closure` subcommand.
#[derive(Parser, Debug)]
pub struct ClosureArgs {
    /// Qualified type names to start from.
    #[arg(required = true, num_args = 1..)]
    pub names: Vec<String>,

    /// Metabase file, overriding `paths.metabase`.
    #[arg(long)]
    pub metabase: Option<String>,
}

/// Flags shared by every subcommand.
pub struct GlobalArgs {
    /// `--quiet` was given.
    pub quiet: bool,
    /// `--verbose` was given.
    pub verbose: bool,
    /// `--config`, a `tether.toml` file or the directory holding one.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Generate(ref args) => generate::run(args, &global),
        Command::Closure(ref args) => closure::run(args, &global),
        Command::Clean => clean::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Level forced by `--verbose` or `--quiet`, if any.
fn forced_level(global: &GlobalArgs) -> Option<&'static str> {
    if global.verbose {
        Some("debug")
    } else if global.quiet {
        Some("error")
    } else {
        None
    }
}

/// `RUST_LOG` applies only when neither flag is set.
fn log_filter(global: &GlobalArgs) -> EnvFilter {
    match forced_level(global) {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

fn init_tracing(global: &GlobalArgs) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(log_filter(global))
        .init();
}
