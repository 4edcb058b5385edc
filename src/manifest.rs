//! # Modules and Manifests
//!
//! A [`Manifest`] is the resolved, versioned set of modules valid for one tree
//! state. It is built once per selection request and never mutated afterwards.
//!
//! Modules are plain value records. Dependencies are stored as module names,
//! keys into the manifest's table, rather than as references between records.
//! [`Manifest::new`] is the only constructor and enforces the global
//! invariants:
//!
//! - module names are unique, and so are module paths;
//! - every dependency names a module of the same manifest;
//! - the dependency graph is acyclic.
//!
//! Modules are stored in build order: dependencies first, ties between
//! independent modules broken by ascending path.

use crate::error::{DuplicateKind, Error, Result};
use crate::path::owning_dir;
use crate::phases::ordering;
use crate::repository::CommitId;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Why a module is part of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// Full manifest, no change filtering applied.
    All,
    /// The module's own files changed.
    Changed,
    /// A dependency (direct or transitive) was impacted.
    Dependent,
    /// Not impacted; kept only because an impacted module depends on it.
    Carried,
    /// The module's descriptor was deleted between the compared states.
    Removed,
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Selection::All => "all",
            Selection::Changed => "changed",
            Selection::Dependent => "dependent",
            Selection::Carried => "carried",
            Selection::Removed => "removed",
        };
        write!(f, "{}", label)
    }
}

/// One buildable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    name: String,
    path: String,
    version: String,
    build: Option<String>,
    build_platforms: Vec<String>,
    properties: BTreeMap<String, String>,
    dependencies: Vec<String>,
    selection: Selection,
}

impl Module {
    /// Create a module record.
    ///
    /// `dependencies` are names of other modules; duplicates are dropped.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        version: impl Into<String>,
        build: Option<String>,
        build_platforms: Vec<String>,
        properties: BTreeMap<String, String>,
        mut dependencies: Vec<String>,
    ) -> Self {
        dependencies.sort();
        dependencies.dedup();
        Self {
            name: name.into(),
            path: path.into(),
            version: version.into(),
            build,
            build_platforms,
            properties,
            dependencies,
            selection: Selection::All,
        }
    }

    /// The same module with a different selection marker.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Build executable relative to the module path, if the module has one.
    pub fn build_command(&self) -> Option<&str> {
        self.build.as_deref()
    }

    pub fn build_platforms(&self) -> &[String] {
        &self.build_platforms
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Names of the modules this one depends on, sorted.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Whether the module may build on `platform`. No platforms means any.
    pub fn supports_platform(&self, platform: &str) -> bool {
        self.build_platforms.is_empty() || self.build_platforms.iter().any(|p| p == platform)
    }
}

/// The tree state a manifest was evaluated at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "commit")]
pub enum ManifestSource {
    Commit(CommitId),
    Workdir,
}

/// An immutable, build-ordered set of modules.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    dir: PathBuf,
    source: ManifestSource,
    modules: Vec<Module>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl Manifest {
    /// Validate `modules` and store them in build order.
    ///
    /// `dir` is the repository working directory the manifest belongs to.
    pub fn new(dir: impl Into<PathBuf>, source: ManifestSource, modules: Vec<Module>) -> Result<Self> {
        check_unique(&modules, DuplicateKind::Name, Module::name)?;
        check_unique(&modules, DuplicateKind::Path, Module::path)?;

        let names: HashMap<&str, ()> = modules.iter().map(|m| (m.name(), ())).collect();
        for module in &modules {
            if let Some(missing) = module
                .dependencies()
                .iter()
                .find(|dep| !names.contains_key(dep.as_str()))
            {
                return Err(Error::UnresolvedDependency {
                    module: module.name().to_string(),
                    reference: missing.clone(),
                });
            }
        }

        let order = ordering::build_order(&modules)?;
        let mut slots: Vec<Option<Module>> = modules.into_iter().map(Some).collect();
        let modules: Vec<Module> = order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();

        let by_name = modules
            .iter()
            .enumerate()
            .map(|(index, module)| (module.name().to_string(), index))
            .collect();

        Ok(Self {
            dir: dir.into(),
            source,
            modules,
            by_name,
        })
    }

    /// Repository working directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn source(&self) -> &ManifestSource {
        &self.source
    }

    /// Modules in build order.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.by_name.get(name).map(|&index| &self.modules[index])
    }

    pub fn by_path(&self, path: &str) -> Option<&Module> {
        self.modules.iter().find(|module| module.path() == path)
    }

    /// The module owning a repository-relative file path, if any.
    pub fn owner_of(&self, file: &str) -> Option<&Module> {
        let dir = owning_dir(file, self.modules.iter().map(Module::path))?;
        self.by_path(dir)
    }

    /// Names of the modules that declare a dependency on each module.
    pub fn dependents(&self) -> HashMap<&str, Vec<&str>> {
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for module in &self.modules {
            for dep in module.dependencies() {
                dependents
                    .entry(dep.as_str())
                    .or_default()
                    .push(module.name());
            }
        }
        dependents
    }
}

fn check_unique<'a>(
    modules: &'a [Module],
    kind: DuplicateKind,
    key: fn(&'a Module) -> &'a str,
) -> Result<()> {
    let mut seen: HashMap<&str, &Module> = HashMap::new();
    for module in modules {
        if let Some(first) = seen.insert(key(module), module) {
            return Err(Error::DuplicateModule {
                kind,
                value: key(module).to_string(),
                first: first.path().to_string(),
                second: module.path().to_string(),
            });
        }
    }
    Ok(())
}
