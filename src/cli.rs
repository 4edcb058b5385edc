//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Monobuild - Build the modules of a monorepo that a change affects
#[derive(Parser, Debug)]
#[command(name = "monobuild")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Directory inside the repository to work on
    #[arg(
        short,
        long,
        global = true,
        value_name = "DIR",
        env = "MONOBUILD_DIR",
        default_value = "."
    )]
    dir: PathBuf,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "info",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the selected modules in dependency order
    Build(commands::build::BuildArgs),

    /// Print the selected modules without building them
    Describe(commands::describe::DescribeArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Build(args) => commands::build::execute(args, &self.dir, &self.color),
            Commands::Describe(args) => {
                commands::describe::execute(args, &self.dir, &self.color)
            }
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Log to stderr at `level`; `RUST_LOG` takes precedence when set.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A logger may already be installed when running under a test harness.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
