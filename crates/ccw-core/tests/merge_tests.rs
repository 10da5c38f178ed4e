//! Merge detection against real repositories

mod common;

use std::path::Path;

use ccw_core::git::{GitCli, Vcs};
use ccw_core::merge::{MergeVerdict, is_merged, remote_branch_has_unmerged_commits};
use ccw_core::{CcwError, ReviewOracle};
use common::{StubOracle, TestEnv, commit_file, configure_user, git};

/// Local-only repository on `main` with two files
fn local_repo() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    git(temp.path(), &["init", "-b", "main"]);
    configure_user(temp.path());
    commit_file(temp.path(), "a.txt", "a1\n", "add a");
    commit_file(temp.path(), "b.txt", "b1\n", "add b");
    temp
}

fn verdict(repo: &Path, branch: &str, oracle: Option<&dyn ReviewOracle>) -> MergeVerdict {
    is_merged(&GitCli::default(), repo, branch, "main", oracle).expect("merge check failed")
}

#[test]
fn test_fast_forward_merge_is_merged_by_ancestry() {
    let temp = local_repo();
    let repo = temp.path();
    git(repo, &["checkout", "-b", "feature"]);
    commit_file(repo, "a.txt", "a2\n", "change a");
    git(repo, &["checkout", "main"]);
    git(repo, &["merge", "--ff-only", "feature"]);

    assert_eq!(verdict(repo, "feature", None), MergeVerdict::Merged);
}

#[test]
fn test_squash_merge_detected_despite_unrelated_base_changes() {
    let temp = local_repo();
    let repo = temp.path();
    git(repo, &["checkout", "-b", "feature"]);
    commit_file(repo, "a.txt", "a2\n", "change a");
    commit_file(repo, "a.txt", "a3\n", "change a again");

    git(repo, &["checkout", "main"]);
    commit_file(repo, "b.txt", "b2\n", "unrelated work on main");
    commit_file(repo, "a.txt", "a3\n", "squashed feature");

    let v = verdict(repo, "feature", None);
    assert_eq!(v, MergeVerdict::SquashMerged);
    assert!(v.is_merged());
}

#[test]
fn test_unmerged_changes_are_not_merged() {
    let temp = local_repo();
    let repo = temp.path();
    git(repo, &["checkout", "-b", "feature"]);
    commit_file(repo, "c.txt", "new\n", "add c");
    git(repo, &["checkout", "main"]);
    commit_file(repo, "b.txt", "b2\n", "unrelated work on main");

    assert_eq!(verdict(repo, "feature", None), MergeVerdict::NotMerged);
}

#[test]
fn test_branch_without_commits_is_merged() {
    let temp = local_repo();
    let repo = temp.path();
    git(repo, &["branch", "feature"]);
    commit_file(repo, "b.txt", "b2\n", "main moves on");

    assert_eq!(verdict(repo, "feature", None), MergeVerdict::Merged);
}

#[test]
fn test_oracle_verdict_wins_over_git() {
    let temp = local_repo();
    let repo = temp.path();
    git(repo, &["branch", "feature"]);

    let says_open = StubOracle::with("feature", false);
    assert_eq!(
        verdict(repo, "feature", Some(&says_open)),
        MergeVerdict::NotMerged
    );

    git(repo, &["checkout", "-b", "other"]);
    commit_file(repo, "c.txt", "new\n", "add c");
    git(repo, &["checkout", "main"]);
    let says_merged = StubOracle::with("other", true);
    assert_eq!(
        verdict(repo, "other", Some(&says_merged)),
        MergeVerdict::Merged
    );
}

#[test]
fn test_oracle_without_record_or_failing_falls_back_to_git() {
    let temp = local_repo();
    let repo = temp.path();
    git(repo, &["checkout", "-b", "feature"]);
    commit_file(repo, "c.txt", "new\n", "add c");
    git(repo, &["checkout", "main"]);

    let no_record = StubOracle::default();
    assert_eq!(
        verdict(repo, "feature", Some(&no_record)),
        MergeVerdict::NotMerged
    );

    let failing = StubOracle {
        fail: true,
        ..StubOracle::with("feature", true)
    };
    assert_eq!(
        verdict(repo, "feature", Some(&failing)),
        MergeVerdict::NotMerged
    );
}

#[test]
fn test_unresolvable_base_is_an_error() {
    let temp = local_repo();
    let repo = temp.path();
    git(repo, &["branch", "feature"]);

    let err = is_merged(&GitCli::default(), repo, "feature", "develop", None).unwrap_err();
    assert!(matches!(err, CcwError::BaseBranchNotFound { .. }));
}

#[test]
fn test_empty_base_auto_detects() {
    let temp = local_repo();
    let repo = temp.path();
    git(repo, &["branch", "feature"]);

    let v = is_merged(&GitCli::default(), repo, "feature", "", None).unwrap();
    assert_eq!(v, MergeVerdict::Merged);

    git(repo, &["branch", "master"]);
    let err = is_merged(&GitCli::default(), repo, "feature", "", None).unwrap_err();
    assert!(matches!(err, CcwError::AmbiguousDefaultBranch));
}

#[test]
fn test_remote_branch_missing_has_nothing_unmerged() {
    let env = TestEnv::new();
    git(&env.repo, &["checkout", "-b", "feature"]);
    commit_file(&env.repo, "c.txt", "new\n", "add c");
    git(&env.repo, &["checkout", "main"]);

    let unmerged =
        remote_branch_has_unmerged_commits(&GitCli::default(), &env.repo, "feature", "main", None)
            .unwrap();
    assert!(!unmerged);
}

#[test]
fn test_remote_branch_unmerged_until_squashed_into_base() {
    let env = TestEnv::new();
    let repo = env.repo.as_path();
    let vcs = GitCli::default();

    git(repo, &["checkout", "-b", "feature"]);
    commit_file(repo, "c.txt", "new\n", "add c");
    git(repo, &["push", "origin", "feature"]);
    git(repo, &["checkout", "main"]);

    assert!(remote_branch_has_unmerged_commits(&vcs, repo, "feature", "main", None).unwrap());

    // Oracle says merged: trust it
    let merged = StubOracle::with("feature", true);
    assert!(
        !remote_branch_has_unmerged_commits(&vcs, repo, "feature", "main", Some(&merged)).unwrap()
    );

    commit_file(repo, "c.txt", "new\n", "squashed feature");
    git(repo, &["push", "origin", "main"]);
    vcs.fetch(repo, true).unwrap();

    assert!(!remote_branch_has_unmerged_commits(&vcs, repo, "feature", "main", None).unwrap());
}

#[test]
fn test_remote_branch_contained_in_base_by_ancestry() {
    let env = TestEnv::new();
    let repo = env.repo.as_path();
    let vcs = GitCli::default();

    git(repo, &["checkout", "-b", "feature"]);
    commit_file(repo, "c.txt", "new\n", "add c");
    git(repo, &["push", "origin", "feature"]);
    git(repo, &["checkout", "main"]);
    git(repo, &["merge", "--ff-only", "feature"]);
    git(repo, &["push", "origin", "main"]);
    vcs.fetch(repo, true).unwrap();

    assert_eq!(vcs.count_commits(repo, "origin/main..origin/feature").unwrap(), 0);
    assert!(!remote_branch_has_unmerged_commits(&vcs, repo, "feature", "main", None).unwrap());
}
