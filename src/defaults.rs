//! Default values for monobuild.
//!
//! This module provides centralized default values used across the library and
//! the CLI, ensuring consistency and avoiding duplication.

/// File name that marks a directory as a module.
pub const DESCRIPTOR_FILE: &str = "appspec.yaml";

/// Branch used by branch selection when no branch name is given.
pub const DEFAULT_BRANCH: &str = "master";

/// Prefix of every environment entry handed to a build command.
pub const ENV_PREFIX: &str = "MONOBUILD_";

/// Version of a module directory that contains no tracked files.
///
/// This is the SHA-256 digest of empty input, which is what hashing an empty
/// list of `(path, blob)` pairs produces.
pub const EMPTY_VERSION: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Returns the platform identifier of the running host.
///
/// Identifiers follow the names used in `buildPlatforms`: `darwin`, `linux`,
/// `windows`, `freebsd` and so on. Rust reports macOS as `macos`, which is
/// mapped to `darwin`.
pub fn current_platform() -> String {
    match std::env::consts::OS {
        "macos" => "darwin".to_string(),
        other => other.to_string(),
    }
}
