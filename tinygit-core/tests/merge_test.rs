//! Merge scenarios: fast-forward, three-way reconciliation, conflicts,
//! and precondition errors.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tinygit_core::{Error, Repository};

fn init_repo() -> (TempDir, Repository) {
    let tmp = TempDir::new().unwrap();
    let repo = Repository::init(tmp.path()).unwrap();
    (tmp, repo)
}

fn write_file(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn commit_file(repo: &Repository, dir: &Path, name: &str, contents: &str, message: &str) {
    write_file(dir, name, contents);
    repo.add(name).unwrap();
    repo.commit(message).unwrap();
}

#[test]
fn merge_fast_forwards_when_head_is_the_ancestor() {
    let (tmp, repo) = init_repo();
    commit_file(&repo, tmp.path(), "base.txt", "base", "base");

    repo.branch("feature").unwrap();
    repo.checkout_branch("feature").unwrap();
    commit_file(&repo, tmp.path(), "extra.txt", "extra", "feature work");
    let (feature_head, _) = repo.head_commit().unwrap();

    repo.checkout_branch("master").unwrap();
    assert!(!tmp.path().join("extra.txt").exists());

    let outcome = repo.merge("feature").unwrap();
    assert!(outcome.fast_forwarded);
    assert!(outcome.conflicts.is_empty());
    assert_eq!(outcome.commit, feature_head);

    let (master_head, _) = repo.head_commit().unwrap();
    assert_eq!(master_head, feature_head);
    assert_eq!(fs::read(tmp.path().join("extra.txt")).unwrap(), b"extra");
}

#[test]
fn conflicting_edits_get_markers_and_a_two_parent_commit() {
    let (tmp, repo) = init_repo();
    commit_file(&repo, tmp.path(), "f.txt", "base\n", "base");
    repo.branch("other").unwrap();

    commit_file(&repo, tmp.path(), "f.txt", "head\n", "edit on master");
    let (master_head, _) = repo.head_commit().unwrap();

    repo.checkout_branch("other").unwrap();
    commit_file(&repo, tmp.path(), "f.txt", "other\n", "edit on other");
    let (other_head, _) = repo.head_commit().unwrap();

    repo.checkout_branch("master").unwrap();
    let outcome = repo.merge("other").unwrap();

    assert!(!outcome.fast_forwarded);
    assert_eq!(outcome.conflicts, vec!["f.txt"]);

    let merged = fs::read_to_string(tmp.path().join("f.txt")).unwrap();
    assert_eq!(
        merged,
        "<<<<<<< HEAD\nhead\n=======\nother\n>>>>>>>\n"
    );

    let (head_digest, head) = repo.head_commit().unwrap();
    assert_eq!(head_digest, outcome.commit);
    assert!(head.is_merge());
    assert_eq!(head.parent, Some(master_head));
    assert_eq!(head.other_parent, Some(other_head));
    assert_eq!(head.message, "Merged other into master.");
}

#[test]
fn file_removed_on_head_stays_removed() {
    let (tmp, repo) = init_repo();
    write_file(tmp.path(), "f.txt", "f");
    write_file(tmp.path(), "keep.txt", "keep v1");
    repo.add("f.txt").unwrap();
    repo.add("keep.txt").unwrap();
    repo.commit("base").unwrap();
    repo.branch("other").unwrap();

    repo.rm("f.txt").unwrap();
    repo.commit("drop f").unwrap();

    repo.checkout_branch("other").unwrap();
    commit_file(&repo, tmp.path(), "keep.txt", "keep v2", "touch keep");

    repo.checkout_branch("master").unwrap();
    let outcome = repo.merge("other").unwrap();

    assert!(outcome.conflicts.is_empty());
    assert!(!tmp.path().join("f.txt").exists());
    assert_eq!(fs::read(tmp.path().join("keep.txt")).unwrap(), b"keep v2");

    let (_, head) = repo.head_commit().unwrap();
    assert!(head.is_merge());
    assert!(!head.tracked.contains_key("f.txt"));
}

#[test]
fn file_removed_on_other_side_is_removed_by_the_merge() {
    let (tmp, repo) = init_repo();
    commit_file(&repo, tmp.path(), "f.txt", "f", "base");
    repo.branch("other").unwrap();

    repo.checkout_branch("other").unwrap();
    repo.rm("f.txt").unwrap();
    repo.commit("drop f").unwrap();

    repo.checkout_branch("master").unwrap();
    commit_file(&repo, tmp.path(), "m.txt", "m", "master work");

    let outcome = repo.merge("other").unwrap();
    assert!(outcome.conflicts.is_empty());
    assert!(!tmp.path().join("f.txt").exists());

    let (_, head) = repo.head_commit().unwrap();
    assert!(!head.tracked.contains_key("f.txt"));
    assert!(head.tracked.contains_key("m.txt"));
}

#[test]
fn merging_an_ancestor_reports_already_up_to_date() {
    let (tmp, repo) = init_repo();
    commit_file(&repo, tmp.path(), "f.txt", "f", "base");
    repo.branch("stale").unwrap();
    commit_file(&repo, tmp.path(), "g.txt", "g", "more work");

    assert!(matches!(repo.merge("stale"), Err(Error::AlreadyUpToDate)));
}

#[test]
fn merge_preconditions() {
    let (tmp, repo) = init_repo();
    commit_file(&repo, tmp.path(), "f.txt", "f", "base");
    repo.branch("feature").unwrap();

    assert!(matches!(
        repo.merge("missing"),
        Err(Error::BranchNotFound(_))
    ));
    assert!(matches!(repo.merge("master"), Err(Error::CannotMergeSelf)));

    write_file(tmp.path(), "pending.txt", "p");
    repo.add("pending.txt").unwrap();
    assert!(matches!(
        repo.merge("feature"),
        Err(Error::UncommittedChanges)
    ));
}

#[test]
fn identical_changes_on_both_sides_leave_nothing_to_commit() {
    let (tmp, repo) = init_repo();
    commit_file(&repo, tmp.path(), "a.txt", "a", "base");
    repo.branch("other").unwrap();

    commit_file(&repo, tmp.path(), "g.txt", "same", "master adds g");

    repo.checkout_branch("other").unwrap();
    commit_file(&repo, tmp.path(), "g.txt", "same", "other adds g");

    repo.checkout_branch("master").unwrap();
    // Every file reconciles to the side HEAD already has, so the merge
    // has no delta to record.
    assert!(matches!(repo.merge("other"), Err(Error::EmptyStagingArea)));
}
