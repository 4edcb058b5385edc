//! Orchestrator for manifest selection
//!
//! This module ties the phases together behind the selection entry points a
//! caller actually asks for: "what is at HEAD", "what changed in this pull
//! request", and so on. Each entry point resolves its references to a tree
//! state and hands off to [resolution](super::resolution) or
//! [selection](super::selection).
//!
//! The free functions take a directory inside a working tree and talk to the
//! system `git`; [`ManifestSelector`] accepts any [`GitQuery`] implementation.

use std::path::Path;

use log::info;

use super::{resolution, selection};
use crate::defaults::DEFAULT_BRANCH;
use crate::error::Result;
use crate::git::GitCli;
use crate::manifest::Manifest;
use crate::repository::{GitQuery, TreeState};

/// Manifest selection against one repository.
pub struct ManifestSelector<'a> {
    repo: &'a dyn GitQuery,
    scope: String,
}

impl<'a> ManifestSelector<'a> {
    /// Select modules under `scope`, a repository-relative directory
    /// (empty for the whole repository).
    pub fn new(repo: &'a dyn GitQuery, scope: impl Into<String>) -> Self {
        Self {
            repo,
            scope: scope.into(),
        }
    }

    /// Every module in the commit currently checked out.
    pub fn by_head(&self) -> Result<Manifest> {
        let head = self.repo.head()?;
        info!("selecting modules at HEAD ({})", head);
        resolution::execute(self.repo, &TreeState::Commit(head), &self.scope)
    }

    /// Every module at the tip of `branch`, or of the default branch.
    pub fn by_branch(&self, branch: Option<&str>) -> Result<Manifest> {
        let branch = branch.unwrap_or(DEFAULT_BRANCH);
        let tip = self.repo.resolve_branch(branch)?;
        info!("selecting modules on branch {} ({})", branch, tip);
        resolution::execute(self.repo, &TreeState::Commit(tip), &self.scope)
    }

    /// Modules impacted between the merge base of `src` and `dst`, and the tip of `dst`.
    pub fn by_pr(&self, src: &str, dst: &str) -> Result<Manifest> {
        let src_tip = self.repo.resolve_branch(src)?;
        let dst_tip = self.repo.resolve_branch(dst)?;
        info!("selecting modules changed between {} and {}", src, dst);
        selection::select_between(self.repo, &src_tip, &dst_tip, &self.scope)
    }

    /// Modules impacted between the merge base of two commits, and `to`.
    pub fn by_diff(&self, from: &str, to: &str) -> Result<Manifest> {
        let from = self.repo.resolve_commit(from)?;
        let to = self.repo.resolve_commit(to)?;
        info!("selecting modules changed between {} and {}", from, to);
        selection::select_between(self.repo, &from, &to, &self.scope)
    }

    /// Every module in commit `sha`.
    pub fn by_sha(&self, sha: &str) -> Result<Manifest> {
        let commit = self.repo.resolve_commit(sha)?;
        info!("selecting modules in commit {}", commit);
        resolution::execute(self.repo, &TreeState::Commit(commit), &self.scope)
    }

    /// Modules changed in the working directory since the last commit, or
    /// every module in the working directory when `all` is set.
    pub fn by_local_dir(&self, all: bool) -> Result<Manifest> {
        info!(
            "selecting {} modules in the working directory",
            if all { "all" } else { "changed" }
        );
        selection::select_local(self.repo, all, &self.scope)
    }
}

fn with_selector<T>(dir: &Path, f: impl FnOnce(&ManifestSelector<'_>) -> Result<T>) -> Result<T> {
    let found = GitCli::discover(dir)?;
    let selector = ManifestSelector::new(&found.repo, found.scope);
    f(&selector)
}

/// See [`ManifestSelector::by_head`].
pub fn manifest_by_head(dir: &Path) -> Result<Manifest> {
    with_selector(dir, |s| s.by_head())
}

/// See [`ManifestSelector::by_branch`].
pub fn manifest_by_branch(dir: &Path, branch: Option<&str>) -> Result<Manifest> {
    with_selector(dir, |s| s.by_branch(branch))
}

/// See [`ManifestSelector::by_pr`].
pub fn manifest_by_pr(dir: &Path, src: &str, dst: &str) -> Result<Manifest> {
    with_selector(dir, |s| s.by_pr(src, dst))
}

/// See [`ManifestSelector::by_diff`].
pub fn manifest_by_diff(dir: &Path, from: &str, to: &str) -> Result<Manifest> {
    with_selector(dir, |s| s.by_diff(from, to))
}

/// See [`ManifestSelector::by_sha`].
pub fn manifest_by_sha(dir: &Path, sha: &str) -> Result<Manifest> {
    with_selector(dir, |s| s.by_sha(sha))
}

/// See [`ManifestSelector::by_local_dir`].
pub fn manifest_by_local_dir(dir: &Path, all: bool) -> Result<Manifest> {
    with_selector(dir, |s| s.by_local_dir(all))
}
