use assert_fs::TempDir;
use predicates::prelude::predicate;
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

use common::command::{head_commit_oid, pygit_commit, repository_dir, run_pygit};
use common::file::{FileSpec, write_file};

#[rstest]
fn init_creates_the_repository_skeleton(repository_dir: TempDir) {
    run_pygit(repository_dir.path(), &["init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized empty PyGit repository in"));

    let repo = repository_dir.path().join(".pygit");
    assert!(repo.join("objects").is_dir());
    assert!(repo.join("refs").join("heads").is_dir());
    assert!(repo.join("refs").join("tags").is_dir());
    assert!(repo.join("index").is_file());
    assert!(repo.join("config").is_file());

    let head = std::fs::read_to_string(repo.join("HEAD")).unwrap();
    assert_eq!(head.trim(), "ref: refs/heads/main");
}

#[rstest]
fn init_refuses_an_existing_repository(repository_dir: TempDir) {
    run_pygit(repository_dir.path(), &["init"]).assert().success();

    run_pygit(repository_dir.path(), &["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[rstest]
fn commands_outside_a_repository_fail(repository_dir: TempDir) {
    run_pygit(repository_dir.path(), &["status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a pygit repository"));
}

#[rstest]
fn first_commit_advances_main(repository_dir: TempDir) {
    run_pygit(repository_dir.path(), &["init"]).assert().success();

    write_file(FileSpec::new(
        repository_dir.path().join("file1.txt"),
        "Hello, PyGit!\n".to_string(),
    ));
    run_pygit(repository_dir.path(), &["add", "file1.txt"])
        .assert()
        .success();

    pygit_commit(repository_dir.path(), "Initial commit")
        .assert()
        .success()
        .stdout(predicate::str::is_match(
            r"^\[main \(root-commit\) [0-9a-f]{7}\] Initial commit\n$",
        ).unwrap());

    // HEAD stays symbolic, the branch holds the commit id
    let head = std::fs::read_to_string(repository_dir.path().join(".pygit/HEAD")).unwrap();
    assert_eq!(head.trim(), "ref: refs/heads/main");

    let oid = head_commit_oid(repository_dir.path());
    assert_eq!(oid.len(), 40);
    assert!(oid.chars().all(|c| c.is_ascii_hexdigit()));

    run_pygit(repository_dir.path(), &["log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initial commit"))
        .stdout(predicate::str::contains(&oid));
}

#[rstest]
fn commit_with_nothing_staged_fails(repository_dir: TempDir) {
    run_pygit(repository_dir.path(), &["init"]).assert().success();

    pygit_commit(repository_dir.path(), "empty")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to commit"));
}

#[rstest]
fn unchanged_tree_refuses_a_second_commit(repository_dir: TempDir) {
    run_pygit(repository_dir.path(), &["init"]).assert().success();
    write_file(FileSpec::new(
        repository_dir.path().join("f.txt"),
        "content\n".to_string(),
    ));
    run_pygit(repository_dir.path(), &["add", "f.txt"]).assert().success();
    pygit_commit(repository_dir.path(), "first").assert().success();

    pygit_commit(repository_dir.path(), "again")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to commit"));
}

#[rstest]
fn add_of_a_missing_path_fails(repository_dir: TempDir) {
    run_pygit(repository_dir.path(), &["init"]).assert().success();

    run_pygit(repository_dir.path(), &["add", "missing.txt"])
        .assert()
        .failure();
}

#[rstest]
fn log_on_a_fresh_repository_reports_no_commits(repository_dir: TempDir) {
    run_pygit(repository_dir.path(), &["init"]).assert().success();

    run_pygit(repository_dir.path(), &["log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No commits yet."));
}

#[rstest]
fn second_commit_links_to_the_first(repository_dir: TempDir) {
    run_pygit(repository_dir.path(), &["init"]).assert().success();

    write_file(FileSpec::new(
        repository_dir.path().join("f.txt"),
        "v1\n".to_string(),
    ));
    run_pygit(repository_dir.path(), &["add", "."]).assert().success();
    pygit_commit(repository_dir.path(), "first").assert().success();
    let first_oid = head_commit_oid(repository_dir.path());

    write_file(FileSpec::new(
        repository_dir.path().join("f.txt"),
        "v2\n".to_string(),
    ));
    run_pygit(repository_dir.path(), &["add", "."]).assert().success();
    pygit_commit(repository_dir.path(), "second").assert().success();
    let second_oid = head_commit_oid(repository_dir.path());

    assert_ne!(first_oid, second_oid);

    // log walks the first-parent chain, newest first
    let output = run_pygit(repository_dir.path(), &["log"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let output = String::from_utf8(output).unwrap();

    let second_pos = output.find("second").unwrap();
    let first_pos = output.find("first").unwrap();
    assert!(second_pos < first_pos);
}
