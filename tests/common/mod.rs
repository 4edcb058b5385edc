//! Shared test utilities for integration and E2E tests.
//!
//! This module provides a fixture that builds a real git repository in a
//! temporary directory, plus helpers for module descriptors and build scripts.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let Some(repo) = GitRepo::new() else { return };
//!     repo.module("app-a", "name: app-a\nbuild: build.sh\n");
//!     repo.commit("initial");
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git_available, GitRepo};
}

/// Returns `true` if a `git` binary is on `PATH`.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A git repository in a temporary directory, on branch `master`.
///
/// All helpers panic on failure; they are only used to set up tests.
pub struct GitRepo {
    temp_dir: assert_fs::TempDir,
}

impl GitRepo {
    /// Create an empty repository, or `None` when git is not installed.
    pub fn new() -> Option<Self> {
        if !git_available() {
            eprintln!("git not found, skipping");
            return None;
        }
        let repo = Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        };
        repo.git(&["init", "-q"]);
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/master"]);
        repo.git(&["config", "user.name", "Test"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        Some(repo)
    }

    /// Run git in the repository and return its trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .arg("-C")
            .arg(self.path())
            .args(args)
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Write a file.
    pub fn write(&self, path: &str, content: &str) -> &Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Write an executable shell script.
    pub fn script(&self, path: &str, body: &str) -> &Self {
        self.write(path, &format!("#!/bin/sh\n{}\n", body));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(
                self.path().join(path),
                std::fs::Permissions::from_mode(0o755),
            )
            .expect("Failed to make script executable");
        }
        self
    }

    /// Write `<dir>/appspec.yaml`.
    pub fn module(&self, dir: &str, descriptor: &str) -> &Self {
        self.write(&format!("{}/appspec.yaml", dir), descriptor)
    }

    /// Write a module whose `build.sh` prints `built <name>`.
    pub fn buildable(&self, dir: &str, descriptor: &str) -> &Self {
        self.module(dir, descriptor).script(
            &format!("{}/build.sh", dir),
            "echo \"built $MONOBUILD_MODULE_NAME\"",
        )
    }

    /// Delete a file or directory.
    pub fn remove(&self, path: &str) -> &Self {
        let full = self.path().join(path);
        if full.is_dir() {
            std::fs::remove_dir_all(full).expect("Failed to remove directory");
        } else {
            std::fs::remove_file(full).expect("Failed to remove file");
        }
        self
    }

    /// Stage everything and commit, returning the new commit sha.
    pub fn commit(&self, message: &str) -> String {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "--allow-empty", "-m", message]);
        self.head()
    }

    /// The sha of HEAD.
    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"])
    }

    /// Create and switch to a new branch.
    pub fn branch(&self, name: &str) -> &Self {
        self.git(&["checkout", "-q", "-b", name]);
        self
    }

    /// Switch to an existing branch.
    pub fn checkout(&self, name: &str) -> &Self {
        self.git(&["checkout", "-q", name]);
        self
    }

    /// Get the path to the working directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a `monobuild` command running in the working directory.
    #[allow(dead_code)]
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("monobuild");
        cmd.current_dir(self.path())
            .env_remove("MONOBUILD_DIR")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_repo_commits() {
        let Some(repo) = GitRepo::new() else { return };
        repo.module("app-a", "name: app-a\n");
        let sha = repo.commit("initial");
        assert_eq!(sha.len(), 40);
        assert_eq!(repo.git(&["rev-parse", "--abbrev-ref", "HEAD"]), "master");
    }
}
