//! Integration tests running selection and builds against real git repositories.

#![cfg(unix)]

#[allow(dead_code)]
mod common;

use common::GitRepo;
use monobuild::build::{BuildOptions, BuildStage, BuildSummary, Orchestrator};
use monobuild::error::{DuplicateKind, Error};
use monobuild::git::GitCli;
use monobuild::manifest::{Manifest, ManifestSource, Selection};
use monobuild::phases::{self, ManifestSelector};
use monobuild::runner::{BuildIo, CommandRunner, Input, Output};

/// app-a <- app-b, both buildable, on one commit.
fn two_apps() -> Option<(GitRepo, String)> {
    let repo = GitRepo::new()?;
    repo.buildable("app-a", "name: app-a\nbuild: build.sh\n")
        .buildable(
            "app-b",
            "name: app-b\nbuild: build.sh\ndependencies: [app-a]\n",
        );
    let sha = repo.commit("initial");
    Some((repo, sha))
}

struct Run {
    result: monobuild::Result<BuildSummary>,
    stages: Vec<(String, BuildStage)>,
    stdout: String,
}

fn run(manifest: &Manifest, platform: &str, in_workdir: bool) -> Run {
    let repo = GitCli::at(manifest.dir());
    let orchestrator =
        Orchestrator::new(&repo, &CommandRunner).with_options(BuildOptions::with_platform(platform));

    let mut stdout = Vec::new();
    let mut stages = Vec::new();
    let result = {
        let mut io = BuildIo::new(Input::Null, Output::Writer(&mut stdout), Output::Null);
        let on_stage = |m: &monobuild::manifest::Module, stage: BuildStage| {
            stages.push((m.name().to_string(), stage))
        };
        if in_workdir {
            orchestrator.build_dir(manifest, &mut io, on_stage)
        } else {
            orchestrator.build(manifest, &mut io, on_stage)
        }
    };
    Run {
        result,
        stages,
        stdout: String::from_utf8(stdout).unwrap(),
    }
}

fn names(manifest: &Manifest) -> Vec<&str> {
    manifest.modules().iter().map(|m| m.name()).collect()
}

#[test]
fn test_diff_builds_changed_module_and_dependent() {
    let Some((repo, first)) = two_apps() else { return };
    repo.write("app-a/main.c", "int a;");
    let second = repo.commit("change app-a");

    let manifest = phases::manifest_by_diff(repo.path(), &first, &second).unwrap();
    assert_eq!(names(&manifest), vec!["app-a", "app-b"]);

    let run = run(&manifest, "linux", false);
    run.result.unwrap();
    assert_eq!(
        run.stages,
        vec![
            ("app-a".to_string(), BuildStage::BeforeBuild),
            ("app-b".to_string(), BuildStage::BeforeBuild),
        ]
    );
    assert_eq!(run.stdout, "built app-a\nbuilt app-b\n");
}

#[test]
fn test_platform_mismatch_skips_module() {
    let Some(repo) = GitRepo::new() else { return };
    repo.buildable(
        "app-c",
        "name: app-c\nbuild: build.sh\nbuildPlatforms: [darwin]\n",
    );
    repo.commit("initial");

    let manifest = phases::manifest_by_head(repo.path()).unwrap();
    let run = run(&manifest, "linux", false);

    assert_eq!(run.result.unwrap().skipped, vec!["app-c"]);
    assert_eq!(run.stages, vec![("app-c".to_string(), BuildStage::SkipBuild)]);
    assert!(run.stdout.is_empty());
}

#[test]
fn test_failing_build_stops_dependents() {
    let Some((repo, _)) = two_apps() else { return };
    repo.script("app-a/build.sh", "echo failing; exit 7");
    repo.commit("break app-a");

    let manifest = phases::manifest_by_head(repo.path()).unwrap();
    let run = run(&manifest, "linux", false);

    match run.result.unwrap_err() {
        Error::BuildFailed { module, status, .. } => {
            assert_eq!(module, "app-a");
            assert_eq!(status, Some(7));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        run.stages,
        vec![("app-a".to_string(), BuildStage::BeforeBuild)]
    );
    assert_eq!(run.stdout, "failing\n");
}

#[test]
fn test_duplicate_module_name() {
    let Some(repo) = GitRepo::new() else { return };
    repo.module("one", "name: app\n").module("two", "name: app\n");
    repo.commit("initial");

    match phases::manifest_by_head(repo.path()).unwrap_err() {
        Error::DuplicateModule { kind, value, .. } => {
            assert_eq!(kind, DuplicateKind::Name);
            assert_eq!(value, "app");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_dependency_cycle() {
    let Some(repo) = GitRepo::new() else { return };
    repo.module("a", "name: a\ndependencies: [b]\n")
        .module("b", "name: b\ndependencies: [a]\n");
    repo.commit("initial");

    match phases::manifest_by_head(repo.path()).unwrap_err() {
        Error::CyclicDependency { cycle } => assert_eq!(cycle, "a -> b -> a"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_local_changes() {
    let Some((repo, _)) = two_apps() else { return };
    repo.write("app-b/untracked.txt", "new");

    let manifest = phases::manifest_by_local_dir(repo.path(), false).unwrap();
    assert_eq!(manifest.source(), &ManifestSource::Workdir);
    assert_eq!(
        manifest.get("app-b").unwrap().selection(),
        Selection::Changed
    );
    assert_eq!(
        manifest.get("app-a").unwrap().selection(),
        Selection::Carried
    );

    let run = run(&manifest, "linux", true);
    assert_eq!(run.result.unwrap().built, vec!["app-b"]);
    assert_eq!(run.stdout, "built app-b\n");

    let all = phases::manifest_by_local_dir(repo.path(), true).unwrap();
    assert_eq!(names(&all), vec!["app-a", "app-b"]);
}

#[test]
fn test_local_without_changes_is_empty() {
    let Some((repo, _)) = two_apps() else { return };
    let manifest = phases::manifest_by_local_dir(repo.path(), false).unwrap();
    assert!(manifest.is_empty());

    let run = run(&manifest, "linux", true);
    assert_eq!(run.result.unwrap(), BuildSummary::default());
}

#[test]
fn test_pr_between_branches() {
    let Some((repo, _)) = two_apps() else { return };
    repo.branch("feature");
    repo.write("app-b/feature.txt", "x");
    repo.commit("feature work");
    repo.checkout("master");
    repo.write("app-a/master.txt", "y");
    repo.commit("master work");

    let manifest = phases::manifest_by_pr(repo.path(), "master", "feature").unwrap();
    assert_eq!(
        manifest.get("app-b").unwrap().selection(),
        Selection::Changed
    );
    assert_eq!(
        manifest.get("app-a").unwrap().selection(),
        Selection::Carried
    );

    let manifest = phases::manifest_by_pr(repo.path(), "feature", "master").unwrap();
    assert_eq!(
        manifest.get("app-a").unwrap().selection(),
        Selection::Changed
    );
    assert_eq!(
        manifest.get("app-b").unwrap().selection(),
        Selection::Dependent
    );
}

#[test]
fn test_unknown_branch() {
    let Some((repo, _)) = two_apps() else { return };
    assert!(matches!(
        phases::manifest_by_branch(repo.path(), Some("missing")),
        Err(Error::InvalidReference { .. })
    ));
    assert_eq!(
        phases::manifest_by_branch(repo.path(), None).unwrap().len(),
        2
    );
}

#[test]
fn test_by_sha_is_idempotent() {
    let Some((repo, sha)) = two_apps() else { return };
    repo.write("app-a/later.txt", "later");
    repo.commit("later");

    let one = phases::manifest_by_sha(repo.path(), &sha).unwrap();
    let two = phases::manifest_by_sha(repo.path(), &sha).unwrap();
    assert_eq!(one.modules(), two.modules());
    assert_eq!(one.source(), two.source());
}

#[test]
fn test_malformed_sha() {
    let Some((repo, sha)) = two_apps() else { return };
    for bad in [&sha[..7], "not-a-sha", "0000000000000000000000000000000000000000"] {
        assert!(
            matches!(
                phases::manifest_by_sha(repo.path(), bad),
                Err(Error::InvalidReference { .. })
            ),
            "{bad} should be rejected"
        );
    }
}

#[test]
fn test_commit_build_ignores_uncommitted_changes() {
    let Some((repo, _)) = two_apps() else { return };
    repo.script("app-a/build.sh", "echo uncommitted");

    let manifest = phases::manifest_by_head(repo.path()).unwrap();
    let run = run(&manifest, "linux", false);
    run.result.unwrap();
    assert_eq!(run.stdout, "built app-a\nbuilt app-b\n");

    let worktrees = repo.git(&["worktree", "list"]);
    assert_eq!(worktrees.lines().count(), 1, "temporary checkout left behind");
}

#[test]
fn test_version_matches_between_git_and_workdir() {
    let Some((repo, sha)) = two_apps() else { return };

    let at_commit = phases::manifest_by_sha(repo.path(), &sha).unwrap();
    let in_workdir = phases::manifest_by_local_dir(repo.path(), true).unwrap();
    for module in at_commit.modules() {
        assert_eq!(
            module.version(),
            in_workdir.get(module.name()).unwrap().version()
        );
    }
}

#[test]
fn test_version_changes_only_for_touched_module() {
    let Some((repo, first)) = two_apps() else { return };
    repo.write("app-b/x", "1");
    let second = repo.commit("touch b");

    let before = phases::manifest_by_sha(repo.path(), &first).unwrap();
    let after = phases::manifest_by_sha(repo.path(), &second).unwrap();
    assert_eq!(
        before.get("app-a").unwrap().version(),
        after.get("app-a").unwrap().version()
    );
    assert_ne!(
        before.get("app-b").unwrap().version(),
        after.get("app-b").unwrap().version()
    );
}

#[test]
fn test_removed_module_is_skipped() {
    let Some((repo, first)) = two_apps() else { return };
    repo.buildable("old", "name: old\nbuild: build.sh\n");
    let second = repo.commit("add old");
    repo.remove("old");
    let third = repo.commit("remove old");

    let manifest = phases::manifest_by_diff(repo.path(), &second, &third).unwrap();
    let old = manifest.get("old").unwrap();
    assert_eq!(old.selection(), Selection::Removed);

    let run = run(&manifest, "linux", false);
    assert_eq!(run.result.unwrap().skipped, vec!["old"]);
    assert!(run.stdout.is_empty());

    // Nothing from the first commit survives into the comparison.
    let manifest = phases::manifest_by_diff(repo.path(), &first, &third).unwrap();
    assert!(manifest.is_empty());
}

#[test]
fn test_selection_from_subdirectory_is_scoped() {
    let Some(repo) = GitRepo::new() else { return };
    repo.module("apps/a", "name: a\n")
        .module("tools/t", "name: t\n");
    repo.commit("initial");

    let manifest = phases::manifest_by_head(&repo.path().join("apps")).unwrap();
    assert_eq!(names(&manifest), vec!["a"]);
}

#[test]
fn test_build_environment() {
    let Some(repo) = GitRepo::new() else { return };
    repo.module(
        "svc",
        "name: svc\nbuild: build.sh\nproperties:\n  team.name: payments\n",
    )
    .script(
        "svc/build.sh",
        "echo \"$MONOBUILD_MODULE_PATH $MONOBUILD_PROPERTY_TEAM_NAME $MONOBUILD_BUILD_COMMIT\"",
    );
    let sha = repo.commit("initial");

    let manifest = phases::manifest_by_head(repo.path()).unwrap();
    let run = run(&manifest, "linux", false);
    run.result.unwrap();
    assert_eq!(run.stdout, format!("svc payments {}\n", sha));
}

#[test]
fn test_selector_over_git_cli() {
    let Some((repo, _)) = two_apps() else { return };
    let found = GitCli::discover(repo.path()).unwrap();
    assert_eq!(found.scope, "");

    let selector = ManifestSelector::new(&found.repo, found.scope.clone());
    assert_eq!(names(&selector.by_head().unwrap()), vec!["app-a", "app-b"]);
}
