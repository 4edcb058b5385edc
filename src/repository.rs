//! # Git Query Layer
//!
//! This module defines the narrow interface through which the manifest builder,
//! the change selector and the build orchestrator read a repository. It is
//! designed so the core never talks to git directly.
//!
//! ## Design
//!
//! - **`GitQuery`**: The capability trait. Everything it exposes is read-only
//!   with respect to repository state; the only side effect is materializing a
//!   commit into a separate checkout directory for isolated builds.
//!
//! - **`TreeState`**: The snapshot a query runs against, either a commit or the
//!   live working directory.
//!
//! Two implementations exist. [`GitCli`](crate::git::GitCli) shells out to the
//! system `git` binary. [`MemoryRepo`] keeps commits, branches and a working
//! directory in memory so the core can be exercised without a repository.

use crate::error::{Error, Result};
use crate::filesystem::{blob_id, MemoryTree};
use crate::path::normalize;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A full-length commit identifier (40 lowercase hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    /// Parse a full-length SHA-1 hex string.
    ///
    /// Abbreviated or non-hex identifiers fail with `InvalidReference`.
    pub fn parse(sha: &str) -> Result<Self> {
        let sha = sha.trim();
        if sha.len() != 40 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::invalid_reference(
                sha,
                "commit must be the complete 40 character SHA-1",
            ));
        }
        Ok(Self(sha.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The repository snapshot a query is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeState {
    /// The tree of a commit.
    Commit(CommitId),
    /// The files currently in the working directory, tracked or untracked but
    /// not ignored.
    Workdir,
}

/// One file of a tree state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileEntry {
    /// Repository-relative path.
    pub path: String,
    /// Content hash of the file (a git blob id).
    pub blob: String,
}

/// Read access to a git repository.
///
/// Paths passed in and returned are repository-relative and `/`-separated.
/// `scope` restricts listings to a subdirectory; the empty string is the root.
pub trait GitQuery: Send + Sync {
    /// Root of the working directory.
    fn workdir(&self) -> &Path;

    /// The commit currently checked out.
    fn head(&self) -> Result<CommitId>;

    /// The tip commit of a branch. Unknown branches fail with `InvalidReference`.
    fn resolve_branch(&self, name: &str) -> Result<CommitId>;

    /// Validate a full-length commit sha and check that the commit exists.
    fn resolve_commit(&self, sha: &str) -> Result<CommitId>;

    /// The best common ancestor of two commits, if there is one.
    fn merge_base(&self, a: &CommitId, b: &CommitId) -> Result<Option<CommitId>>;

    /// Every file at or below `scope` in `state`, sorted by path.
    fn list_files(&self, state: &TreeState, scope: &str) -> Result<Vec<FileEntry>>;

    /// Content of one file in `state`, `None` if it does not exist there.
    fn read_file(&self, state: &TreeState, path: &str) -> Result<Option<Vec<u8>>>;

    /// Paths added, modified or deleted between the tree of `from` and `to`.
    ///
    /// Renames are reported as a deletion of the old path and an addition of
    /// the new one, so both sides always count as changed.
    fn changed_files(&self, from: &CommitId, to: &TreeState) -> Result<Vec<String>>;

    /// Materialize `commit` into the empty directory `target`.
    fn checkout(&self, commit: &CommitId, target: &Path) -> Result<()>;

    /// Dispose of a directory created by [`checkout`](Self::checkout).
    fn remove_checkout(&self, target: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
struct MemoryCommit {
    tree: MemoryTree,
    parents: Vec<CommitId>,
}

/// An in-memory [`GitQuery`] implementation.
///
/// Holds a working tree, a set of commits and branches. `commit` snapshots the
/// working tree onto the current branch, `switch_branch` moves between branches
/// and resets the working tree to the branch tip.
#[derive(Debug, Clone)]
pub struct MemoryRepo {
    workdir: PathBuf,
    working: MemoryTree,
    commits: BTreeMap<CommitId, MemoryCommit>,
    branches: BTreeMap<String, CommitId>,
    current_branch: String,
    counter: u64,
}

impl MemoryRepo {
    /// Create an empty repository whose working directory is reported as `workdir`.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            working: MemoryTree::new(),
            commits: BTreeMap::new(),
            branches: BTreeMap::new(),
            current_branch: crate::defaults::DEFAULT_BRANCH.to_string(),
            counter: 0,
        }
    }

    /// Write a file into the working tree.
    pub fn write(&mut self, path: &str, content: impl Into<Vec<u8>>) -> &mut Self {
        self.working.add_file(path, content);
        self
    }

    /// Delete a file or directory from the working tree.
    pub fn remove(&mut self, path: &str) -> &mut Self {
        self.working.remove_file(path);
        self.working.remove_dir(path);
        self
    }

    /// Rename a directory in the working tree.
    pub fn rename(&mut self, from: &str, to: &str) -> &mut Self {
        self.working.rename_dir(from, to);
        self
    }

    /// Snapshot the working tree as a new commit on the current branch.
    pub fn commit(&mut self, message: &str) -> CommitId {
        self.counter += 1;
        let parents: Vec<CommitId> = self
            .branches
            .get(&self.current_branch)
            .cloned()
            .into_iter()
            .collect();

        let mut hasher = Sha256::new();
        hasher.update(self.counter.to_be_bytes());
        hasher.update(message.as_bytes());
        for parent in &parents {
            hasher.update(parent.as_str().as_bytes());
        }
        let id = CommitId(hex::encode(&hasher.finalize()[..20]));

        self.commits.insert(
            id.clone(),
            MemoryCommit {
                tree: self.working.clone(),
                parents,
            },
        );
        self.branches
            .insert(self.current_branch.clone(), id.clone());
        id
    }

    /// Switch to `name`, creating it at the current tip if it does not exist,
    /// and reset the working tree to the branch tip.
    pub fn switch_branch(&mut self, name: &str) -> &mut Self {
        if !self.branches.contains_key(name) {
            if let Some(tip) = self.branches.get(&self.current_branch).cloned() {
                self.branches.insert(name.to_string(), tip);
            }
        }
        self.current_branch = name.to_string();
        if let Some(tip) = self.branches.get(name) {
            self.working = self.commits[tip].tree.clone();
        }
        self
    }

    fn tree(&self, state: &TreeState) -> Result<&MemoryTree> {
        match state {
            TreeState::Workdir => Ok(&self.working),
            TreeState::Commit(id) => self
                .commits
                .get(id)
                .map(|commit| &commit.tree)
                .ok_or_else(|| Error::invalid_reference(id.as_str(), "no such commit")),
        }
    }

    fn ancestors(&self, start: &CommitId) -> Vec<CommitId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([start.clone()]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(&id) {
                queue.extend(commit.parents.iter().cloned());
            }
            order.push(id);
        }
        order
    }
}

impl GitQuery for MemoryRepo {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn head(&self) -> Result<CommitId> {
        self.branches
            .get(&self.current_branch)
            .cloned()
            .ok_or_else(|| Error::git("rev-parse HEAD", "no commits on the current branch"))
    }

    fn resolve_branch(&self, name: &str) -> Result<CommitId> {
        self.branches
            .get(name)
            .cloned()
            .ok_or_else(|| Error::invalid_reference(name, "no such branch"))
    }

    fn resolve_commit(&self, sha: &str) -> Result<CommitId> {
        let id = CommitId::parse(sha)?;
        if self.commits.contains_key(&id) {
            Ok(id)
        } else {
            Err(Error::invalid_reference(sha, "no such commit"))
        }
    }

    fn merge_base(&self, a: &CommitId, b: &CommitId) -> Result<Option<CommitId>> {
        let from_a: HashSet<CommitId> = self.ancestors(a).into_iter().collect();
        Ok(self
            .ancestors(b)
            .into_iter()
            .find(|id| from_a.contains(id)))
    }

    fn list_files(&self, state: &TreeState, scope: &str) -> Result<Vec<FileEntry>> {
        let scope = normalize(scope);
        Ok(self
            .tree(state)?
            .files_under(&scope)
            .map(|(path, content)| FileEntry {
                path: path.to_string(),
                blob: blob_id(content),
            })
            .collect())
    }

    fn read_file(&self, state: &TreeState, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.tree(state)?.get_file(path).map(<[u8]>::to_vec))
    }

    fn changed_files(&self, from: &CommitId, to: &TreeState) -> Result<Vec<String>> {
        let before = self.tree(&TreeState::Commit(from.clone()))?;
        let after = self.tree(to)?;
        Ok(before.diff(after))
    }

    fn checkout(&self, commit: &CommitId, target: &Path) -> Result<()> {
        self.tree(&TreeState::Commit(commit.clone()))?
            .write_to(target)
    }

    fn remove_checkout(&self, target: &Path) -> Result<()> {
        if target.exists() {
            fs::remove_dir_all(target)?;
        }
        Ok(())
    }
}
