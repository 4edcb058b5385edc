//! # Build Command Implementation
//!
//! This module implements the `build` subcommand. It selects modules with one
//! of the [`Selector`] modes and builds them in dependency order, printing one
//! line per module as soon as its fate is decided:
//!
//! ```text
//! BUILD app-a in app-a for 3f2a...
//! SKIP app-c in app-c for 91bc...
//! ```
//!
//! Build commands inherit the terminal's standard streams. Local selections
//! build in the working directory; all other selections build in a temporary
//! checkout of the selected commit.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use log::info;

use monobuild::build::{BuildOptions, BuildStage, Orchestrator};
use monobuild::git::GitCli;
use monobuild::manifest::Module;
use monobuild::output::{stage_line, OutputConfig};
use monobuild::runner::{BuildIo, CommandRunner};

use super::Selector;

/// Build the selected modules in dependency order
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Which modules to build
    #[command(subcommand)]
    pub selector: Selector,

    /// Platform to match against buildPlatforms (default: the host platform)
    #[arg(long, global = true, value_name = "PLATFORM", env = "MONOBUILD_PLATFORM")]
    pub platform: Option<String>,
}

/// Execute the `build` command.
///
/// # Arguments
/// * `args` - The command arguments
/// * `dir` - Directory inside the repository
/// * `color_flag` - The value of the global --color flag ("always", "never", or "auto")
pub fn execute(args: BuildArgs, dir: &Path, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let manifest = args.selector.select(dir)?;

    let options = match args.platform {
        Some(platform) => BuildOptions::with_platform(platform),
        None => BuildOptions::default(),
    };
    let repo = GitCli::at(manifest.dir());
    let orchestrator = Orchestrator::new(&repo, &CommandRunner).with_options(options);

    let mut io = BuildIo::inherit();
    let on_stage = |module: &Module, stage: BuildStage| {
        println!("{}", stage_line(&out, module, stage));
    };
    let summary = if args.selector.builds_in_workdir() {
        orchestrator.build_dir(&manifest, &mut io, on_stage)?
    } else {
        orchestrator.build(&manifest, &mut io, on_stage)?
    };

    info!(
        "built {} module(s), skipped {}",
        summary.built.len(),
        summary.skipped.len()
    );
    Ok(())
}
