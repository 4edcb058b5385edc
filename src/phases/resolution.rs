//! Phase 2: Manifest Resolution
//!
//! Turns the descriptors found by [discovery](super::discovery) into a
//! validated [`Manifest`].
//!
//! ## Process
//!
//! 1.  **File Ownership**: Each listed file is assigned to the module with the
//!     deepest path containing it. Module directories do not nest, so a
//!     module's version only covers files no inner module claims.
//!
//! 2.  **Versioning**: Each module's owned files are hashed into its version.
//!
//! 3.  **Reference Resolution**: A dependency reference is first matched
//!     against module names, then against module paths (after normalizing
//!     `./` and trailing separators). References matching neither are kept as
//!     written so that [`Manifest::new`] reports them.
//!
//! 4.  **Validation**: [`Manifest::new`] checks name and path uniqueness,
//!     unresolved references and cycles, then stores modules in build order.

use std::collections::HashMap;

use log::debug;

use super::discovery;
use crate::descriptor::ModuleDescriptor;
use crate::error::Result;
use crate::manifest::{Manifest, ManifestSource, Module};
use crate::path::{normalize, owning_dir};
use crate::repository::{FileEntry, GitQuery, TreeState};
use crate::version::module_version;

/// Executes Phase 2: build the full manifest for `state` under `scope`.
pub fn execute(repo: &dyn GitQuery, state: &TreeState, scope: &str) -> Result<Manifest> {
    let found = discovery::execute(repo, state, scope)?;
    let modules = resolve(&found.descriptors, &found.files);
    debug!("resolved {} module(s)", modules.len());
    Manifest::new(repo.workdir(), source_of(state), modules)
}

/// The manifest source matching a tree state.
pub fn source_of(state: &TreeState) -> ManifestSource {
    match state {
        TreeState::Commit(id) => ManifestSource::Commit(id.clone()),
        TreeState::Workdir => ManifestSource::Workdir,
    }
}

/// Build unvalidated module records from descriptors and the file listing.
pub fn resolve(descriptors: &[ModuleDescriptor], files: &[FileEntry]) -> Vec<Module> {
    let mut owned: HashMap<&str, Vec<&FileEntry>> = HashMap::new();
    for file in files {
        if let Some(dir) = owning_dir(&file.path, descriptors.iter().map(|d| d.path.as_str())) {
            owned.entry(dir).or_default().push(file);
        }
    }

    let by_name: HashMap<&str, &str> = descriptors
        .iter()
        .map(|d| (d.name.as_str(), d.name.as_str()))
        .collect();
    let by_path: HashMap<&str, &str> = descriptors
        .iter()
        .map(|d| (d.path.as_str(), d.name.as_str()))
        .collect();

    descriptors
        .iter()
        .map(|d| {
            let version = module_version(
                &d.path,
                owned.get(d.path.as_str()).into_iter().flatten().copied(),
            );
            let dependencies = d
                .dependencies
                .iter()
                .map(|reference| {
                    by_name
                        .get(reference.as_str())
                        .or_else(|| by_path.get(normalize(reference).as_str()))
                        .map(|name| name.to_string())
                        .unwrap_or_else(|| reference.clone())
                })
                .collect();

            Module::new(
                d.name.clone(),
                d.path.clone(),
                version,
                d.build.clone(),
                d.build_platforms.clone(),
                d.properties.clone(),
                dependencies,
            )
        })
        .collect()
}
