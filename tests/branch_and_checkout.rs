use assert_fs::TempDir;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

use common::command::{head_commit_oid, init_repository_dir, pygit_commit, run_pygit};
use common::file::{FileSpec, append_to_file, read_file, write_file};

#[rstest]
fn branches_list_with_the_current_one_starred(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    run_pygit(dir.path(), &["branch", "feature"]).assert().success();

    run_pygit(dir.path(), &["branch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* main"))
        .stdout(predicate::str::contains("  feature"));
}

#[rstest]
fn duplicate_branch_names_are_refused(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    run_pygit(dir.path(), &["branch", "feature"]).assert().success();
    run_pygit(dir.path(), &["branch", "feature"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[rstest]
fn invalid_branch_names_are_refused(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    for bad in ["bad..name", ".hidden", "name/", "has space", "x.lock"] {
        run_pygit(dir.path(), &["branch", bad]).assert().failure();
    }
}

#[rstest]
fn branch_from_an_explicit_start_revision(init_repository_dir: TempDir) {
    let dir = init_repository_dir;
    let first_oid = head_commit_oid(dir.path());

    append_to_file(&dir.path().join("1.txt"), "more\n");
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "second").assert().success();

    run_pygit(dir.path(), &["branch", "from-first", &first_oid])
        .assert()
        .success();

    let branch_oid =
        std::fs::read_to_string(dir.path().join(".pygit/refs/heads/from-first")).unwrap();
    assert_eq!(branch_oid.trim(), first_oid);
}

#[rstest]
fn checkout_isolates_branch_work(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    run_pygit(dir.path(), &["branch", "feature"]).assert().success();
    run_pygit(dir.path(), &["checkout", "feature"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Switched to branch 'feature'"));

    write_file(FileSpec::new(
        dir.path().join("feature-file.txt"),
        "feature work\n".to_string(),
    ));
    run_pygit(dir.path(), &["add", "feature-file.txt"]).assert().success();
    pygit_commit(dir.path(), "feature work").assert().success();
    assert!(dir.path().join("feature-file.txt").exists());

    run_pygit(dir.path(), &["checkout", "main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Switched to branch 'main'"));

    // the feature branch's file must be gone from the working tree
    assert!(!dir.path().join("feature-file.txt").exists());

    run_pygit(dir.path(), &["checkout", "feature"]).assert().success();
    assert_eq!(read_file(&dir.path().join("feature-file.txt")), "feature work\n");
}

#[rstest]
fn checkout_by_commit_id_detaches_head(init_repository_dir: TempDir) {
    let dir = init_repository_dir;
    let oid = head_commit_oid(dir.path());

    run_pygit(dir.path(), &["checkout", &oid])
        .assert()
        .success()
        .stdout(predicate::str::contains("detached HEAD"));

    run_pygit(dir.path(), &["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "HEAD detached at {}",
            &oid[..7]
        )));

    let head = std::fs::read_to_string(dir.path().join(".pygit/HEAD")).unwrap();
    assert_eq!(head.trim(), oid);

    // reattach
    run_pygit(dir.path(), &["checkout", "main"]).assert().success();
    let head = std::fs::read_to_string(dir.path().join(".pygit/HEAD")).unwrap();
    assert_eq!(head.trim(), "ref: refs/heads/main");
}

#[rstest]
fn checkout_by_abbreviated_id(init_repository_dir: TempDir) {
    let dir = init_repository_dir;
    let oid = head_commit_oid(dir.path());

    run_pygit(dir.path(), &["checkout", &oid[..8]])
        .assert()
        .success()
        .stdout(predicate::str::contains("detached HEAD").or(predicate::str::contains("HEAD is now at")));
}

#[rstest]
fn checkout_refuses_to_overwrite_local_changes(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    run_pygit(dir.path(), &["branch", "feature"]).assert().success();
    run_pygit(dir.path(), &["checkout", "feature"]).assert().success();
    append_to_file(&dir.path().join("1.txt"), "feature change\n");
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "change 1.txt").assert().success();

    run_pygit(dir.path(), &["checkout", "main"]).assert().success();

    // dirty the file both branches disagree on
    append_to_file(&dir.path().join("1.txt"), "local edit\n");

    run_pygit(dir.path(), &["checkout", "feature"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("local changes"));

    // nothing was touched
    assert_eq!(read_file(&dir.path().join("1.txt")), "one\nlocal edit\n");
}

#[rstest]
fn checkout_refuses_to_clobber_untracked_files(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    run_pygit(dir.path(), &["branch", "feature"]).assert().success();
    run_pygit(dir.path(), &["checkout", "feature"]).assert().success();
    write_file(FileSpec::new(
        dir.path().join("new.txt"),
        "committed on feature\n".to_string(),
    ));
    run_pygit(dir.path(), &["add", "new.txt"]).assert().success();
    pygit_commit(dir.path(), "add new.txt").assert().success();

    run_pygit(dir.path(), &["checkout", "main"]).assert().success();

    // an untracked file now sits where the feature branch has content
    write_file(FileSpec::new(
        dir.path().join("new.txt"),
        "untracked local\n".to_string(),
    ));

    run_pygit(dir.path(), &["checkout", "feature"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("untracked working tree files"))
        .stderr(predicate::str::contains("new.txt"));

    assert_eq!(read_file(&dir.path().join("new.txt")), "untracked local\n");
}

#[rstest]
fn deleting_the_checked_out_branch_is_refused(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    run_pygit(dir.path(), &["branch", "-d", "main"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("in use"));
}

#[rstest]
fn deleting_another_branch_succeeds(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    run_pygit(dir.path(), &["branch", "doomed"]).assert().success();
    run_pygit(dir.path(), &["branch", "-d", "doomed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted branch doomed"));

    assert!(!dir.path().join(".pygit/refs/heads/doomed").exists());
}

#[rstest]
fn unknown_revisions_fail_checkout(init_repository_dir: TempDir) {
    run_pygit(init_repository_dir.path(), &["checkout", "no-such-branch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad revision"));
}
