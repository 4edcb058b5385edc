//! Phase 1: Descriptor Discovery
//!
//! This is the first phase of manifest construction. It lists every file under
//! the requested scope at one tree state, picks out the module specification
//! files, and parses each of them into a [`ModuleDescriptor`].
//!
//! ## Process
//!
//! 1.  **Listing**: The git layer returns `(path, blob)` entries for the scope.
//!     The same listing is kept and handed to the versioning step, so a tree is
//!     only read once per manifest.
//!
//! 2.  **Locating Descriptors**: Any file named `appspec.yaml` marks its
//!     directory as a module.
//!
//! 3.  **Parsing**: Descriptor contents are read from the same tree state and
//!     parsed. The first malformed descriptor aborts discovery.
//!
//! Dependency references are returned as written. Resolving them is the next
//! phase's job.

use log::debug;

use crate::defaults::DESCRIPTOR_FILE;
use crate::descriptor::{self, ModuleDescriptor};
use crate::error::{Error, Result};
use crate::path::{file_name, parent_dir};
use crate::repository::{FileEntry, GitQuery, TreeState};

/// Everything read from one tree state.
#[derive(Debug, Clone)]
pub struct Discovery {
    /// Parsed descriptors, ordered by module path.
    pub descriptors: Vec<ModuleDescriptor>,
    /// Every file under the scope, sorted by path.
    pub files: Vec<FileEntry>,
}

/// Executes Phase 1: discover and parse all descriptors under `scope`.
pub fn execute(repo: &dyn GitQuery, state: &TreeState, scope: &str) -> Result<Discovery> {
    let files = repo.list_files(state, scope)?;

    let mut descriptors = Vec::new();
    for entry in files.iter().filter(|e| is_descriptor(&e.path)) {
        let module_path = parent_dir(&entry.path);
        let content = repo
            .read_file(state, &entry.path)?
            .ok_or_else(|| Error::git(format!("read {}", entry.path), "listed file is missing"))?;
        let parsed = descriptor::parse_bytes(&content, module_path, &entry.path)?;
        debug!("found module '{}' in '{}'", parsed.name, module_path);
        descriptors.push(parsed);
    }
    descriptors.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(Discovery { descriptors, files })
}

/// Returns `true` if `path` is a module descriptor file.
pub fn is_descriptor(path: &str) -> bool {
    file_name(path) == DESCRIPTOR_FILE
}
