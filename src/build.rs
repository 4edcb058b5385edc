//! # Build Orchestration
//!
//! Walks a manifest in build order and decides, for each module, whether to
//! run its build command or skip it.
//!
//! ## Stages
//!
//! Each module reaches exactly one [`BuildStage`], reported to the caller's
//! `on_stage` callback before anything happens:
//!
//! - `SkipBuild` when the module has no build command, its platforms exclude
//!   the current one, or it is only part of the manifest as a carried
//!   dependency or a removal record.
//! - `BeforeBuild` right before its build command is launched.
//!
//! The first build that cannot be launched or exits unsuccessfully stops the
//! run with `BuildFailed`. Modules later in the order are never attempted and
//! nothing already built is undone.
//!
//! ## Where builds run
//!
//! [`Orchestrator::build`] builds a commit-sourced manifest in a detached
//! temporary checkout of that commit, so uncommitted changes never leak into
//! the build. [`Orchestrator::build_dir`] always builds in the working
//! directory. A workdir-sourced manifest is built in the working directory by
//! both.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use log::{debug, warn};
use serde::Serialize;

use crate::defaults::{current_platform, ENV_PREFIX};
use crate::error::{Error, Result};
use crate::git::GitCli;
use crate::manifest::{Manifest, ManifestSource, Module, Selection};
use crate::repository::{CommitId, GitQuery};
use crate::runner::{BuildIo, CommandRunner, ProcessRunner, RunRequest};

/// The decision reported for a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildStage {
    /// The build command is about to run.
    BeforeBuild,
    /// The module will not be built.
    SkipBuild,
}

/// Why a module is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoBuildCommand,
    UnsupportedPlatform,
    Unchanged,
    Removed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoBuildCommand => write!(f, "no build command"),
            SkipReason::UnsupportedPlatform => write!(f, "platform not supported"),
            SkipReason::Unchanged => write!(f, "unchanged dependency"),
            SkipReason::Removed => write!(f, "module removed"),
        }
    }
}

/// Decide what happens to `module` on `platform`.
///
/// Returns the build command to run, or why the module is skipped.
pub fn decide<'m>(module: &'m Module, platform: &str) -> std::result::Result<&'m str, SkipReason> {
    match module.selection() {
        Selection::Removed => return Err(SkipReason::Removed),
        Selection::Carried => return Err(SkipReason::Unchanged),
        _ => {}
    }
    let command = module.build_command().ok_or(SkipReason::NoBuildCommand)?;
    if !module.supports_platform(platform) {
        return Err(SkipReason::UnsupportedPlatform);
    }
    Ok(command)
}

/// Settings for a build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Platform identifier matched against `buildPlatforms`.
    pub platform: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            platform: current_platform(),
        }
    }
}

impl BuildOptions {
    pub fn with_platform(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
        }
    }
}

/// Names of the modules built and skipped, in the order they were decided.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub built: Vec<String>,
    pub skipped: Vec<String>,
}

/// Drives builds for manifests of one repository.
pub struct Orchestrator<'a> {
    repo: &'a dyn GitQuery,
    runner: &'a dyn ProcessRunner,
    options: BuildOptions,
}

impl<'a> Orchestrator<'a> {
    pub fn new(repo: &'a dyn GitQuery, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            repo,
            runner,
            options: BuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Build `manifest` at the state it was evaluated at.
    pub fn build(
        &self,
        manifest: &Manifest,
        io: &mut BuildIo<'_>,
        mut on_stage: impl FnMut(&Module, BuildStage),
    ) -> Result<BuildSummary> {
        let ManifestSource::Commit(commit) = manifest.source() else {
            return self.run(manifest, manifest.dir(), io, &mut on_stage);
        };
        if !self.has_work(manifest) {
            return self.run(manifest, manifest.dir(), io, &mut on_stage);
        }

        let temp = tempfile::Builder::new().prefix("monobuild-").tempdir()?;
        let checkout = temp.path().join("tree");
        debug!("checking out {} into {}", commit, checkout.display());
        self.repo.checkout(commit, &checkout)?;

        let result = self.run(manifest, &checkout, io, &mut on_stage);

        if let Err(e) = self.repo.remove_checkout(&checkout) {
            warn!("failed to remove checkout {}: {}", checkout.display(), e);
        }
        result
    }

    /// Build `manifest` against the files in the working directory.
    pub fn build_dir(
        &self,
        manifest: &Manifest,
        io: &mut BuildIo<'_>,
        mut on_stage: impl FnMut(&Module, BuildStage),
    ) -> Result<BuildSummary> {
        self.run(manifest, manifest.dir(), io, &mut on_stage)
    }

    fn has_work(&self, manifest: &Manifest) -> bool {
        manifest
            .modules()
            .iter()
            .any(|m| decide(m, &self.options.platform).is_ok())
    }

    fn run(
        &self,
        manifest: &Manifest,
        root: &Path,
        io: &mut BuildIo<'_>,
        on_stage: &mut dyn FnMut(&Module, BuildStage),
    ) -> Result<BuildSummary> {
        let commit = match manifest.source() {
            ManifestSource::Commit(id) => Some(id),
            ManifestSource::Workdir => None,
        };
        let mut summary = BuildSummary::default();

        for module in manifest.modules() {
            let command = match decide(module, &self.options.platform) {
                Ok(command) => command,
                Err(reason) => {
                    debug!("SKIP {} ({})", module.name(), reason);
                    on_stage(module, BuildStage::SkipBuild);
                    summary.skipped.push(module.name().to_string());
                    continue;
                }
            };

            let cwd = root.join(module.path());
            let program = cwd.join(command);
            let env = build_env(module, commit);

            debug!("BUILD {} in {}", module.name(), module.path());
            on_stage(module, BuildStage::BeforeBuild);

            let request = RunRequest {
                program: &program,
                cwd: &cwd,
                env: &env,
            };
            let status = self
                .runner
                .run(&request, io)
                .map_err(|e| Error::BuildFailed {
                    module: module.name().to_string(),
                    status: None,
                    message: format!("could not run {}: {}", program.display(), e),
                })?;

            if !status.success() {
                return Err(Error::BuildFailed {
                    module: module.name().to_string(),
                    status: status.code,
                    message: match status.code {
                        Some(_) => format!("{} exited unsuccessfully", command),
                        None => format!("{} was terminated by a signal", command),
                    },
                });
            }
            summary.built.push(module.name().to_string());
        }

        Ok(summary)
    }
}

/// Environment entries describing `module` to its build command.
pub fn build_env(module: &Module, commit: Option<&CommitId>) -> Vec<(String, String)> {
    let mut env = vec![
        (format!("{}MODULE_NAME", ENV_PREFIX), module.name().to_string()),
        (format!("{}MODULE_PATH", ENV_PREFIX), module.path().to_string()),
        (
            format!("{}MODULE_VERSION", ENV_PREFIX),
            module.version().to_string(),
        ),
    ];
    if let Some(commit) = commit {
        env.push((format!("{}BUILD_COMMIT", ENV_PREFIX), commit.to_string()));
    }
    let mut sources: HashMap<String, &str> = HashMap::new();
    for (key, value) in module.properties() {
        let name = format!("{}PROPERTY_{}", ENV_PREFIX, env_key(key));
        if let Some(previous) = sources.insert(name.clone(), key.as_str()) {
            warn!(
                "module {}: properties '{}' and '{}' both map to {}, using '{}'",
                module.name(),
                previous,
                key,
                name,
                key
            );
            env.retain(|(existing, _)| *existing != name);
        }
        env.push((name, value.clone()));
    }
    env
}

fn env_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Build `manifest` with the system `git` and real processes.
pub fn build(
    manifest: &Manifest,
    io: &mut BuildIo<'_>,
    on_stage: impl FnMut(&Module, BuildStage),
) -> Result<BuildSummary> {
    let repo = GitCli::at(manifest.dir());
    Orchestrator::new(&repo, &CommandRunner).build(manifest, io, on_stage)
}

/// Build `manifest` in its working directory with real processes.
pub fn build_dir(
    manifest: &Manifest,
    io: &mut BuildIo<'_>,
    on_stage: impl FnMut(&Module, BuildStage),
) -> Result<BuildSummary> {
    let repo = GitCli::at(manifest.dir());
    Orchestrator::new(&repo, &CommandRunner).build_dir(manifest, io, on_stage)
}
