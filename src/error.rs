//! # Error Handling
//!
//! This module defines the centralized error type for `monobuild`. It uses the
//! `thiserror` library to create an `Error` enum that covers every failure the
//! manifest builder, change selector and build orchestrator can report.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Manifest-construction variants
//!   (`MalformedDescriptor`, `DuplicateModule`, `UnresolvedDependency`,
//!   `CyclicDependency`) abort manifest building entirely, so no partial
//!   manifest is ever handed to the orchestrator. `InvalidReference` and
//!   `GitQueryFailed` come from the git layer, and `BuildFailed` stops a build
//!   sequence at the first failing module.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Nothing in the library retries. Transient git failures surface as
//! `GitQueryFailed` so that a caller can decide whether to try again.

use thiserror::Error;

/// Which unique key of a module collided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    Name,
    Path,
}

impl std::fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateKind::Name => write!(f, "name"),
            DuplicateKind::Path => write!(f, "path"),
        }
    }
}

/// Main error type for monobuild operations
#[derive(Error, Debug)]
pub enum Error {
    /// A module descriptor file could not be parsed into a descriptor.
    ///
    /// Raised when the YAML is invalid, when `name` is missing or empty, or
    /// when a field has the wrong type.
    #[error("Malformed module descriptor {path}: {message}")]
    MalformedDescriptor { path: String, message: String },

    /// Two descriptors in the same manifest share a name or a path.
    #[error("Duplicate module {kind} '{value}' declared in {first} and {second}")]
    DuplicateModule {
        kind: DuplicateKind,
        value: String,
        first: String,
        second: String,
    },

    /// A declared dependency matched neither a module name nor a module path.
    #[error("Module '{module}' depends on '{reference}', which is not a module in this manifest")]
    UnresolvedDependency { module: String, reference: String },

    /// The dependency graph contains a cycle.
    ///
    /// `cycle` lists module names along the cycle, first name repeated last.
    #[error("Cyclic dependency between modules: {cycle}")]
    CyclicDependency { cycle: String },

    /// A branch name or commit identifier could not be resolved.
    #[error("Invalid reference '{reference}': {message}")]
    InvalidReference { reference: String, message: String },

    /// The underlying repository access failed.
    #[error("Git query failed: {command} - {stderr}")]
    GitQueryFailed { command: String, stderr: String },

    /// A build command exited non-zero or could not be launched.
    ///
    /// `status` is the exit code when the process ran to completion, `None`
    /// when it could not be started or was terminated by a signal.
    #[error("Build failed for module '{module}'{}: {message}", status.map(|s| format!(" (exit status {})", s)).unwrap_or_default())]
    BuildFailed {
        module: String,
        status: Option<i32>,
        message: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a `GitQueryFailed` from a git invocation and its stderr.
    pub fn git(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Error::GitQueryFailed {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Build an `InvalidReference` for `reference`.
    pub fn invalid_reference(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidReference {
            reference: reference.into(),
            message: message.into(),
        }
    }
}
