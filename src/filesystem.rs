//! In-memory file tree used to model tree states without a repository

use crate::error::Result;
use crate::path::{is_under, normalize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Content identifier of a blob held in a [`MemoryTree`].
///
/// 40 hex characters, the same shape as a git blob id, derived from a
/// SHA-256 of the content.
pub fn blob_id(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    hex::encode(&digest[..20])
}

/// In-memory snapshot of a directory tree
///
/// Files are keyed by normalized repository-relative path, so iteration is
/// always in bytewise path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTree {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryTree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a file
    pub fn add_file(&mut self, path: &str, content: impl Into<Vec<u8>>) {
        self.files.insert(normalize(path), content.into());
    }

    /// Remove a file, returning its previous content
    pub fn remove_file(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(&normalize(path))
    }

    /// Remove every file at or below `dir`
    pub fn remove_dir(&mut self, dir: &str) {
        let dir = normalize(dir);
        self.files.retain(|path, _| !is_under(path, &dir));
    }

    /// Move every file at or below `from` to the same relative place under `to`
    pub fn rename_dir(&mut self, from: &str, to: &str) {
        let from = normalize(from);
        let to = normalize(to);
        let moved: Vec<(String, Vec<u8>)> = self
            .files
            .iter()
            .filter(|(path, _)| is_under(path, &from))
            .map(|(path, content)| {
                let rest = path[from.len()..].trim_start_matches('/');
                (normalize(&format!("{}/{}", to, rest)), content.clone())
            })
            .collect();
        self.remove_dir(&from);
        self.files.extend(moved);
    }

    /// Get a file by path
    pub fn get_file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(&normalize(path)).map(Vec::as_slice)
    }

    /// Check if a file exists
    pub fn exists(&self, path: &str) -> bool {
        self.files.contains_key(&normalize(path))
    }

    /// Iterate over `(path, content)` pairs at or below `scope`
    pub fn files_under<'a>(&'a self, scope: &'a str) -> impl Iterator<Item = (&'a str, &'a [u8])> {
        self.files
            .iter()
            .filter(move |(path, _)| is_under(path, scope))
            .map(|(path, content)| (path.as_str(), content.as_slice()))
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the tree is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths whose content differs between `self` and `other`, including paths
    /// present on only one side, in path order.
    pub fn diff(&self, other: &MemoryTree) -> Vec<String> {
        let mut changed: Vec<String> = self
            .files
            .iter()
            .filter(|(path, content)| other.files.get(*path) != Some(*content))
            .map(|(path, _)| path.clone())
            .collect();
        changed.extend(
            other
                .files
                .keys()
                .filter(|path| !self.files.contains_key(*path))
                .cloned(),
        );
        changed.sort();
        changed
    }

    /// Write every file to disk below `root`
    pub fn write_to(&self, root: &Path) -> Result<()> {
        for (path, content) in &self.files {
            let full_path = root.join(path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&full_path, content)?;
        }
        Ok(())
    }
}
