//! The manifest pipeline.
//!
//! ## Overview
//!
//! A manifest is produced in four phases:
//! 1. Discovery - List the files of a tree state and parse every module descriptor
//! 2. Resolution - Version each module and resolve its dependency references
//! 3. Ordering - Sort modules so dependencies come first (run by `Manifest::new`)
//! 4. Selection - Narrow the manifest to the modules impacted by a change
//!
//! Phases 1 to 3 always run; phase 4 only runs for the diff, pull request and
//! local selection modes. The [`orchestrator`] exposes the entry points.
//!
//! Each phase depends only on the previous phases and the foundation layers
//! (`repository`, `descriptor`, `version`, `manifest`).

pub mod discovery;
pub mod orchestrator;
pub mod ordering;
pub mod resolution;
pub mod selection;

pub use discovery as phase1;
pub use ordering as phase3;
pub use resolution as phase2;
pub use selection as phase4;

pub use orchestrator::{
    manifest_by_branch, manifest_by_diff, manifest_by_head, manifest_by_local_dir,
    manifest_by_pr, manifest_by_sha, ManifestSelector,
};
