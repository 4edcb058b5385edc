//! # Monobuild Library
//!
//! This library works out which modules of a git monorepo a change affects and
//! builds them in dependency order. It is used by the `monobuild` command-line
//! tool but can be embedded in other build tooling.
//!
//! ## Quick Example
//!
//! ```
//! use monobuild::phases::ManifestSelector;
//! use monobuild::repository::MemoryRepo;
//!
//! let mut repo = MemoryRepo::new("/repo");
//! repo.write("app-a/appspec.yaml", "name: app-a\nbuild: build.sh\n")
//!     .write("app-b/appspec.yaml", "name: app-b\ndependencies: [app-a]\n");
//! repo.commit("initial");
//! repo.write("app-a/main.c", "int main;");
//!
//! // app-a changed locally, and app-b depends on it
//! let manifest = ManifestSelector::new(&repo, "").by_local_dir(false).unwrap();
//! let names: Vec<&str> = manifest.modules().iter().map(|m| m.name()).collect();
//! assert_eq!(names, vec!["app-a", "app-b"]);
//! ```
//!
//! ## Core Concepts
//!
//! - **Descriptors (`descriptor`)**: Each module directory holds an
//!   `appspec.yaml` naming the module, its build command, platforms,
//!   properties and dependencies.
//! - **Manifests (`manifest`)**: The validated, build-ordered set of modules
//!   for one tree state, each with a content-derived version (`version`).
//! - **Git access (`repository`, `git`)**: The `GitQuery` trait is the only
//!   way the core reads a repository. `GitCli` uses the system `git`,
//!   `MemoryRepo` keeps everything in memory.
//! - **Phases (`phases`)**: Discovery, resolution, ordering and change
//!   selection, plus the selection entry points.
//! - **Builds (`build`, `runner`)**: The orchestrator walks a manifest, skips
//!   or launches each module's build command and reports every decision.
//!
//! ## Execution Flow
//!
//! 1.  **Selection**: Resolve a branch, commit pair or the working directory
//!     to tree states.
//! 2.  **Discovery**: Find and parse every descriptor at the target state.
//! 3.  **Resolution**: Version modules and resolve dependency references.
//! 4.  **Ordering**: Sort modules so dependencies come first.
//! 5.  **Impact**: For change-based selections, keep only impacted modules.
//! 6.  **Build**: Run build commands in order, stopping at the first failure.

pub mod build;
pub mod defaults;
pub mod descriptor;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod manifest;
pub mod output;
pub mod path;
pub mod phases;
pub mod repository;
pub mod runner;
pub mod version;

pub use error::{Error, Result};

#[cfg(test)]
mod path_proptest;
