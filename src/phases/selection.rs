//! Phase 4: Change Selection
//!
//! Narrows a full manifest down to the modules affected by a change between
//! two tree states.
//!
//! ## Process
//!
//! 1.  **Target Manifest**: The full manifest is built at the target state.
//!
//! 2.  **Changed Paths**: The git layer diffs the base commit against the
//!     target. Renames count as a deletion plus an addition, so a moved file
//!     marks both its old and its new owner.
//!
//! 3.  **Direct Impact**: A module is `Changed` if any changed path falls in
//!     a directory it owns.
//!
//! 4.  **Removed Modules**: A descriptor present in the base but gone from
//!     the target becomes a `Removed` tombstone read from the base tree, so
//!     the removal shows up in the build report. If a module with the same
//!     name still exists in the target (the module moved), no tombstone is
//!     added.
//!
//! 5.  **Transitive Impact**: Every module that depends, directly or
//!     transitively, on an impacted module is marked `Dependent`.
//!
//! 6.  **Carried Dependencies**: Unimpacted dependencies of impacted modules
//!     are kept as `Carried` so the result stays closed under dependencies.
//!
//! When the two states share no history there is nothing to diff against and
//! every module is treated as `Changed`.

use std::collections::{HashMap, VecDeque};

use log::{debug, warn};

use super::{discovery, resolution};
use crate::defaults::EMPTY_VERSION;
use crate::descriptor;
use crate::error::Result;
use crate::manifest::{Manifest, Module, Selection};
use crate::path::{is_under, parent_dir};
use crate::repository::{CommitId, GitQuery, TreeState};

/// Select the modules under `scope` impacted between `base` and `target`.
///
/// `base` is the commit to diff against; `None` selects everything.
pub fn select_changed(
    repo: &dyn GitQuery,
    base: Option<&CommitId>,
    target: &TreeState,
    scope: &str,
) -> Result<Manifest> {
    let full = resolution::execute(repo, target, scope)?;
    let Some(base) = base else {
        debug!("no common history, selecting every module");
        let modules = full
            .modules()
            .iter()
            .map(|m| m.clone().with_selection(Selection::Changed))
            .collect();
        return Manifest::new(full.dir(), full.source().clone(), modules);
    };

    let changed = repo.changed_files(base, target)?;
    debug!("{} path(s) changed since {}", changed.len(), base);

    let mut marks: HashMap<&str, Selection> = HashMap::new();
    for path in &changed {
        if let Some(owner) = full.owner_of(path) {
            marks.insert(owner.name(), Selection::Changed);
        }
    }

    let tombstones = removed_modules(repo, base, &full, &changed, scope)?;

    mark_dependents(&full, &mut marks);
    mark_carried(&full, &mut marks);

    let mut modules: Vec<Module> = full
        .modules()
        .iter()
        .filter_map(|m| marks.get(m.name()).map(|&s| m.clone().with_selection(s)))
        .collect();
    modules.extend(tombstones);

    Manifest::new(full.dir(), full.source().clone(), modules)
}

/// Select the impacted modules between the merge base of `from` and `to`, and `to`.
pub fn select_between(
    repo: &dyn GitQuery,
    from: &CommitId,
    to: &CommitId,
    scope: &str,
) -> Result<Manifest> {
    let base = repo.merge_base(from, to)?;
    match &base {
        Some(base) => debug!("merge base of {} and {} is {}", from, to, base),
        None => warn!("{} and {} have no common ancestor", from, to),
    }
    select_changed(repo, base.as_ref(), &TreeState::Commit(to.clone()), scope)
}

/// Select modules changed in the working directory since the last commit.
///
/// With `all` set, every module in the working directory is returned.
pub fn select_local(repo: &dyn GitQuery, all: bool, scope: &str) -> Result<Manifest> {
    if all {
        return resolution::execute(repo, &TreeState::Workdir, scope);
    }
    let head = repo.head()?;
    select_changed(repo, Some(&head), &TreeState::Workdir, scope)
}

fn removed_modules(
    repo: &dyn GitQuery,
    base: &CommitId,
    target: &Manifest,
    changed: &[String],
    scope: &str,
) -> Result<Vec<Module>> {
    let base_state = TreeState::Commit(base.clone());
    let mut tombstones: Vec<Module> = Vec::new();

    for path in changed
        .iter()
        .filter(|p| discovery::is_descriptor(p) && is_under(p, scope))
    {
        let module_path = parent_dir(path);
        if target.by_path(module_path).is_some() {
            continue;
        }
        let Some(content) = repo.read_file(&base_state, path)? else {
            // Added and removed again, or never committed.
            continue;
        };
        let old = match descriptor::parse_bytes(&content, module_path, path) {
            Ok(old) => old,
            Err(e) => {
                warn!("ignoring removed descriptor {}: {}", path, e);
                continue;
            }
        };
        if target.get(&old.name).is_some() || tombstones.iter().any(|t| t.name() == old.name) {
            debug!("module '{}' moved away from '{}'", old.name, module_path);
            continue;
        }

        debug!("module '{}' removed from '{}'", old.name, module_path);
        tombstones.push(
            Module::new(
                old.name,
                old.path,
                EMPTY_VERSION,
                None,
                old.build_platforms,
                old.properties,
                Vec::new(),
            )
            .with_selection(Selection::Removed),
        );
    }

    Ok(tombstones)
}

/// Mark every module depending on a marked module as `Dependent`.
fn mark_dependents<'a>(manifest: &'a Manifest, marks: &mut HashMap<&'a str, Selection>) {
    let dependents = manifest.dependents();
    let mut queue: VecDeque<&str> = marks.keys().copied().collect();

    while let Some(name) = queue.pop_front() {
        for &dependent in dependents.get(name).into_iter().flatten() {
            if !marks.contains_key(dependent) {
                marks.insert(dependent, Selection::Dependent);
                queue.push_back(dependent);
            }
        }
    }
}

/// Mark unmarked dependencies of marked modules as `Carried`.
fn mark_carried<'a>(manifest: &'a Manifest, marks: &mut HashMap<&'a str, Selection>) {
    let mut stack: Vec<&str> = marks.keys().copied().collect();

    while let Some(name) = stack.pop() {
        let Some(module) = manifest.get(name) else {
            continue;
        };
        for dep in module.dependencies() {
            if !marks.contains_key(dep.as_str()) {
                marks.insert(dep.as_str(), Selection::Carried);
                stack.push(dep.as_str());
            }
        }
    }
}
