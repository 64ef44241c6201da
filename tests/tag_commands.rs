use assert_fs::TempDir;
use predicates::prelude::predicate;
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

use common::command::{head_commit_oid, init_repository_dir, pygit_commit, run_pygit};
use common::file::{FileSpec, write_file};

#[rstest]
fn lightweight_tags_point_at_the_commit(init_repository_dir: TempDir) {
    let dir = init_repository_dir;
    let oid = head_commit_oid(dir.path());

    run_pygit(dir.path(), &["tag", "v1.0"]).assert().success();

    let tag_ref = std::fs::read_to_string(dir.path().join(".pygit/refs/tags/v1.0")).unwrap();
    assert_eq!(tag_ref.trim(), oid);

    run_pygit(dir.path(), &["tag"])
        .assert()
        .success()
        .stdout(predicate::str::contains("v1.0"));
}

#[rstest]
fn annotated_tags_create_a_tag_object(init_repository_dir: TempDir) {
    let dir = init_repository_dir;
    let commit_oid = head_commit_oid(dir.path());

    let mut cmd = run_pygit(dir.path(), &["tag", "-m", "first release", "v2.0"]);
    cmd.envs(vec![
        ("PYGIT_AUTHOR_NAME", "Tagger"),
        ("PYGIT_AUTHOR_EMAIL", "tagger@example.com"),
    ]);
    cmd.assert().success();

    // the ref holds the tag object's id, not the commit's
    let tag_ref = std::fs::read_to_string(dir.path().join(".pygit/refs/tags/v2.0")).unwrap();
    let tag_oid = tag_ref.trim().to_string();
    assert_ne!(tag_oid, commit_oid);

    // showing the tag object prints the tag and the peeled commit
    run_pygit(dir.path(), &["show", &tag_oid])
        .assert()
        .success()
        .stdout(predicate::str::contains("tag v2.0"))
        .stdout(predicate::str::contains("first release"))
        .stdout(predicate::str::contains(format!("commit {}", commit_oid)));

    // the resolver peels the tag down to the commit
    run_pygit(dir.path(), &["checkout", "v2.0"])
        .assert()
        .success();
    let head = std::fs::read_to_string(dir.path().join(".pygit/HEAD")).unwrap();
    assert_eq!(head.trim(), commit_oid);
}

#[rstest]
fn duplicate_tags_are_refused(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    run_pygit(dir.path(), &["tag", "v1.0"]).assert().success();
    run_pygit(dir.path(), &["tag", "v1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[rstest]
fn tags_can_target_an_explicit_revision(init_repository_dir: TempDir) {
    let dir = init_repository_dir;
    let first_oid = head_commit_oid(dir.path());

    write_file(FileSpec::new(dir.path().join("x.txt"), "x\n".to_string()));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "second").assert().success();

    run_pygit(dir.path(), &["tag", "old", &first_oid]).assert().success();

    let tag_ref = std::fs::read_to_string(dir.path().join(".pygit/refs/tags/old")).unwrap();
    assert_eq!(tag_ref.trim(), first_oid);
}

#[rstest]
fn ancestor_suffixes_resolve_through_tags_and_branches(init_repository_dir: TempDir) {
    let dir = init_repository_dir;
    let first_oid = head_commit_oid(dir.path());

    write_file(FileSpec::new(dir.path().join("x.txt"), "x\n".to_string()));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "second").assert().success();

    // HEAD~1 and HEAD^ both name the first commit
    run_pygit(dir.path(), &["checkout", "HEAD~1"]).assert().success();
    assert_eq!(head_commit_oid(dir.path()), first_oid);

    run_pygit(dir.path(), &["checkout", "main"]).assert().success();
    run_pygit(dir.path(), &["checkout", "main^"]).assert().success();
    assert_eq!(head_commit_oid(dir.path()), first_oid);
}

#[rstest]
fn show_prints_blobs_and_commits(init_repository_dir: TempDir) {
    let dir = init_repository_dir;
    let oid = head_commit_oid(dir.path());

    run_pygit(dir.path(), &["show", "HEAD"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("commit {}", oid)))
        .stdout(predicate::str::contains("Initial commit"));

    run_pygit(dir.path(), &["show", "no-such-rev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad revision"));
}
