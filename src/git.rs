//! [`GitQuery`] backed by the system `git` binary.
//!
//! Every query is a single `git -C <root> ...` invocation. Using the system
//! command means repository configuration (worktrees, alternates, safe
//! directories, `core.*` settings) behaves exactly as it does for the user.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;

use log::debug;

use crate::error::{Error, Result};
use crate::path::{is_under, normalize};
use crate::repository::{CommitId, FileEntry, GitQuery, TreeState};

/// A repository accessed through the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

/// Result of [`GitCli::discover`]: the repository plus where `dir` sits in it.
#[derive(Debug, Clone)]
pub struct Discovered {
    pub repo: GitCli,
    /// `dir` relative to the repository root, empty at the root.
    pub scope: String,
}

impl GitCli {
    /// Use `root` as the top level of a working tree without validating it.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Locate the repository containing `dir`.
    pub fn discover(dir: &Path) -> Result<Discovered> {
        let output = git_in(dir, &["rev-parse", "--show-toplevel", "--show-prefix"])?;
        let mut lines = output.lines();
        let root = lines
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .ok_or_else(|| Error::git("rev-parse --show-toplevel", "no working tree"))?;
        let scope = normalize(lines.next().unwrap_or(""));
        debug!("repository root {} (scope '{}')", root, scope);

        Ok(Discovered {
            repo: GitCli::at(root),
            scope,
        })
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        git_in(&self.root, args)
    }

    fn git_raw(&self, args: &[&str]) -> Result<Output> {
        run_raw(&self.root, args)
    }

    fn resolve_ref(&self, rev: &str) -> Result<Option<CommitId>> {
        let target = format!("{}^{{commit}}", rev);
        let output = self.git_raw(&["rev-parse", "--verify", "--quiet", &target])?;
        if !output.status.success() {
            return Ok(None);
        }
        let sha = String::from_utf8_lossy(&output.stdout);
        CommitId::parse(sha.trim()).map(Some)
    }

    fn workdir_files(&self, scope: &str) -> Result<Vec<String>> {
        let mut args = vec![
            "ls-files",
            "-z",
            "--cached",
            "--others",
            "--exclude-standard",
        ];
        if !scope.is_empty() {
            args.extend(["--", scope]);
        }
        let listed = self.git(&args)?;

        // Deleted-but-tracked files are still in the index; only keep what is on disk.
        let paths: BTreeSet<String> = listed
            .split('\0')
            .filter(|path| !path.is_empty())
            .filter(|path| self.root.join(path).is_file())
            .map(str::to_string)
            .collect();
        Ok(paths.into_iter().collect())
    }

    fn hash_paths(&self, paths: &[String]) -> Result<Vec<String>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let mut child = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(["hash-object", "--stdin-paths"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::git("hash-object --stdin-paths", e.to_string()))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::git("hash-object --stdin-paths", "stdin unavailable"))?;

        // Feed paths from another thread so a full stdout pipe cannot stall us.
        let output = thread::scope(|scope| {
            scope.spawn(move || {
                for path in paths {
                    if writeln!(stdin, "{}", path).is_err() {
                        break;
                    }
                }
            });
            child.wait_with_output()
        })
        .map_err(|e| Error::git("hash-object --stdin-paths", e.to_string()))?;

        if !output.status.success() {
            return Err(Error::git(
                "hash-object --stdin-paths",
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        let blobs: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim().to_string())
            .collect();
        if blobs.len() != paths.len() {
            return Err(Error::git(
                "hash-object --stdin-paths",
                format!("expected {} hashes, got {}", paths.len(), blobs.len()),
            ));
        }
        Ok(blobs)
    }
}

impl GitQuery for GitCli {
    fn workdir(&self) -> &Path {
        &self.root
    }

    fn head(&self) -> Result<CommitId> {
        self.resolve_ref("HEAD")?
            .ok_or_else(|| Error::git("rev-parse HEAD", "HEAD does not point at a commit"))
    }

    fn resolve_branch(&self, name: &str) -> Result<CommitId> {
        for candidate in [format!("refs/heads/{}", name), format!("refs/remotes/{}", name)] {
            if let Some(id) = self.resolve_ref(&candidate)? {
                return Ok(id);
            }
        }
        Err(Error::invalid_reference(name, "no such branch"))
    }

    fn resolve_commit(&self, sha: &str) -> Result<CommitId> {
        let id = CommitId::parse(sha)?;
        match self.resolve_ref(id.as_str())? {
            Some(resolved) if resolved == id => Ok(id),
            _ => Err(Error::invalid_reference(sha, "no such commit")),
        }
    }

    fn merge_base(&self, a: &CommitId, b: &CommitId) -> Result<Option<CommitId>> {
        let output = self.git_raw(&["merge-base", a.as_str(), b.as_str()])?;
        match output.status.code() {
            Some(0) => CommitId::parse(String::from_utf8_lossy(&output.stdout).trim()).map(Some),
            // Exit status 1 with no output means the histories are unrelated.
            Some(1) if output.stdout.is_empty() => Ok(None),
            _ => Err(Error::git(
                format!("merge-base {} {}", a, b),
                String::from_utf8_lossy(&output.stderr).trim(),
            )),
        }
    }

    fn list_files(&self, state: &TreeState, scope: &str) -> Result<Vec<FileEntry>> {
        let scope = normalize(scope);
        let mut files = match state {
            TreeState::Commit(id) => {
                let mut args = vec!["ls-tree", "-r", "-z", "--full-tree", id.as_str()];
                if !scope.is_empty() {
                    args.extend(["--", scope.as_str()]);
                }
                let listing = self.git(&args)?;
                parse_ls_tree(&listing)
            }
            TreeState::Workdir => {
                let paths = self.workdir_files(&scope)?;
                let blobs = self.hash_paths(&paths)?;
                paths
                    .into_iter()
                    .zip(blobs)
                    .map(|(path, blob)| FileEntry { path, blob })
                    .collect()
            }
        };
        files.retain(|entry| is_under(&entry.path, &scope));
        files.sort();
        debug!("listed {} file(s) under '{}'", files.len(), scope);
        Ok(files)
    }

    fn read_file(&self, state: &TreeState, path: &str) -> Result<Option<Vec<u8>>> {
        let path = normalize(path);
        match state {
            TreeState::Commit(id) => {
                let object = format!("{}:{}", id, path);
                let exists = self.git_raw(&["cat-file", "-e", &object])?;
                if !exists.status.success() {
                    return Ok(None);
                }
                let output = self.git_raw(&["cat-file", "blob", &object])?;
                if !output.status.success() {
                    return Err(Error::git(
                        format!("cat-file blob {}", object),
                        String::from_utf8_lossy(&output.stderr).trim(),
                    ));
                }
                Ok(Some(output.stdout))
            }
            TreeState::Workdir => match std::fs::read(self.root.join(&path)) {
                Ok(content) => Ok(Some(content)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(Error::git(format!("read {}", path), e.to_string())),
            },
        }
    }

    fn changed_files(&self, from: &CommitId, to: &TreeState) -> Result<Vec<String>> {
        let mut changed = BTreeSet::new();
        let diff = match to {
            TreeState::Commit(to) => self.git(&[
                "diff",
                "--name-only",
                "-z",
                "--no-renames",
                from.as_str(),
                to.as_str(),
                "--",
            ])?,
            TreeState::Workdir => {
                let untracked =
                    self.git(&["ls-files", "-z", "--others", "--exclude-standard"])?;
                changed.extend(split_nul(&untracked));
                self.git(&["diff", "--name-only", "-z", "--no-renames", from.as_str(), "--"])?
            }
        };
        changed.extend(split_nul(&diff));
        debug!("{} changed path(s) since {}", changed.len(), from);
        Ok(changed.into_iter().collect())
    }

    fn checkout(&self, commit: &CommitId, target: &Path) -> Result<()> {
        let target = target.to_string_lossy();
        self.git(&["worktree", "add", "--detach", "--force", &target, commit.as_str()])?;
        Ok(())
    }

    fn remove_checkout(&self, target: &Path) -> Result<()> {
        let target = target.to_string_lossy();
        self.git(&["worktree", "remove", "--force", &target])?;
        Ok(())
    }
}

fn run_raw(dir: &Path, args: &[&str]) -> Result<Output> {
    Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map_err(|e| Error::git(args.join(" "), e.to_string()))
}

fn git_in(dir: &Path, args: &[&str]) -> Result<String> {
    let output = run_raw(dir, args)?;
    if !output.status.success() {
        return Err(Error::git(
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn split_nul(listing: &str) -> impl Iterator<Item = String> + '_ {
    listing
        .split('\0')
        .filter(|path| !path.is_empty())
        .map(str::to_string)
}

/// Parse `git ls-tree -r -z` output into blob entries.
///
/// Each record is `<mode> SP <type> SP <oid> TAB <path>`. Submodule commits
/// and anything else that is not a blob is dropped.
fn parse_ls_tree(listing: &str) -> Vec<FileEntry> {
    listing
        .split('\0')
        .filter_map(|record| {
            let (meta, path) = record.split_once('\t')?;
            let mut fields = meta.split(' ');
            let _mode = fields.next()?;
            let kind = fields.next()?;
            let oid = fields.next()?;
            (kind == "blob").then(|| FileEntry {
                path: path.to_string(),
                blob: oid.to_string(),
            })
        })
        .collect()
}
