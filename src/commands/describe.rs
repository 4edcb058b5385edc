//! # Describe Command Implementation
//!
//! This module implements the `describe` subcommand, which resolves the same
//! selections as `build` but only prints the resulting manifest. It is a
//! read-only operation: nothing is checked out and no build command runs.
//!
//! Plain output has one line per module in build order with its name, path,
//! version and why it was selected. `--json` prints the whole manifest.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use monobuild::output::{describe_line, OutputConfig};

use super::Selector;

/// Print the selected modules without building them
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Which modules to describe
    #[command(subcommand)]
    pub selector: Selector,

    /// Print the manifest as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Execute the `describe` command.
pub fn execute(args: DescribeArgs, dir: &Path, color_flag: &str) -> Result<()> {
    let manifest = args.selector.select(dir)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    let out = OutputConfig::from_env_and_flag(color_flag);
    for module in manifest.modules() {
        println!("{}", describe_line(&out, module));
    }
    Ok(())
}
