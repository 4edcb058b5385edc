//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `monobuild`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `monobuild` library.
//!
//! `build` and `describe` share the [`Selector`] subcommands, which choose the
//! set of modules to work on.

pub mod build;
pub mod completions;
pub mod describe;

use std::path::Path;

use clap::Subcommand;

use monobuild::manifest::Manifest;
use monobuild::phases;

/// Which modules to select.
#[derive(Subcommand, Debug, Clone)]
pub enum Selector {
    /// All modules in the commit currently checked out
    Head,

    /// All modules at the tip of a branch (default: master)
    Branch {
        /// Branch name
        name: Option<String>,
    },

    /// Modules changed between the merge base of src and dst, and the tip of dst
    Pr {
        /// Source branch
        #[arg(long)]
        src: String,
        /// Destination branch
        #[arg(long)]
        dst: String,
    },

    /// Modules changed between the merge base of two commits, and the to commit
    ///
    /// Commit SHAs must be the complete 40 character SHA-1 string.
    Diff {
        /// From commit
        #[arg(long)]
        from: String,
        /// To commit
        #[arg(long)]
        to: String,
    },

    /// All modules in a commit
    Commit {
        /// Complete 40 character commit SHA-1
        sha: String,
    },

    /// Modules changed in the working directory since the last commit
    Local {
        /// Select every module in the working directory
        #[arg(short, long)]
        all: bool,
    },
}

impl Selector {
    /// Resolve the selection against the repository containing `dir`.
    pub fn select(&self, dir: &Path) -> monobuild::Result<Manifest> {
        match self {
            Selector::Head => phases::manifest_by_head(dir),
            Selector::Branch { name } => phases::manifest_by_branch(dir, name.as_deref()),
            Selector::Pr { src, dst } => phases::manifest_by_pr(dir, src, dst),
            Selector::Diff { from, to } => phases::manifest_by_diff(dir, from, to),
            Selector::Commit { sha } => phases::manifest_by_sha(dir, sha),
            Selector::Local { all } => phases::manifest_by_local_dir(dir, *all),
        }
    }

    /// Local selections are built in place; everything else in a checkout.
    pub fn builds_in_workdir(&self) -> bool {
        matches!(self, Selector::Local { .. })
    }
}
