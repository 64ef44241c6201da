use assert_fs::TempDir;
use predicates::prelude::predicate;
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

use common::command::{head_commit_oid, init_repository_dir, pygit_commit, run_pygit};
use common::file::{FileSpec, read_file, write_file};

#[rstest]
fn fast_forward_when_head_is_the_base(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    run_pygit(dir.path(), &["branch", "feature"]).assert().success();
    run_pygit(dir.path(), &["checkout", "feature"]).assert().success();
    write_file(FileSpec::new(dir.path().join("ff.txt"), "ff\n".to_string()));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "feature ahead").assert().success();
    let feature_oid = head_commit_oid(dir.path());

    run_pygit(dir.path(), &["checkout", "main"]).assert().success();
    assert!(!dir.path().join("ff.txt").exists());

    run_pygit(dir.path(), &["merge", "feature"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fast-forward"));

    assert_eq!(head_commit_oid(dir.path()), feature_oid);
    assert_eq!(read_file(&dir.path().join("ff.txt")), "ff\n");
}

#[rstest]
fn merging_an_ancestor_is_a_noop(init_repository_dir: TempDir) {
    let dir = init_repository_dir;
    let first_oid = head_commit_oid(dir.path());

    write_file(FileSpec::new(dir.path().join("x.txt"), "x\n".to_string()));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "ahead").assert().success();
    let head_before = head_commit_oid(dir.path());

    run_pygit(dir.path(), &["merge", &first_oid])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already up to date."));

    assert_eq!(head_commit_oid(dir.path()), head_before);
}

#[rstest]
fn clean_three_way_merge_creates_a_merge_commit(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    // diverge: branch1 edits left.txt, branch2 edits right.txt
    write_file(FileSpec::new(dir.path().join("left.txt"), "initial\n".to_string()));
    write_file(FileSpec::new(dir.path().join("right.txt"), "initial\n".to_string()));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "base files").assert().success();

    run_pygit(dir.path(), &["branch", "branch2"]).assert().success();

    write_file(FileSpec::new(
        dir.path().join("left.txt"),
        "initial\nmain change\n".to_string(),
    ));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "main changes left").assert().success();
    let main_oid = head_commit_oid(dir.path());

    run_pygit(dir.path(), &["checkout", "branch2"]).assert().success();
    write_file(FileSpec::new(
        dir.path().join("right.txt"),
        "initial\nbranch2 change\n".to_string(),
    ));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "branch2 changes right").assert().success();

    run_pygit(dir.path(), &["checkout", "main"]).assert().success();
    run_pygit(dir.path(), &["merge", "branch2"]).assert().success();

    // both sides' changes are present
    assert_eq!(read_file(&dir.path().join("left.txt")), "initial\nmain change\n");
    assert_eq!(
        read_file(&dir.path().join("right.txt")),
        "initial\nbranch2 change\n"
    );

    // the merge commit has two parents, mainline first
    let merge_oid = head_commit_oid(dir.path());
    assert_ne!(merge_oid, main_oid);
    run_pygit(dir.path(), &["log"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Merge: {}", &main_oid[..7])));

    assert!(!dir.path().join(".pygit/MERGE_HEAD").exists());
}

#[rstest]
fn conflicting_merge_writes_markers_and_merge_head(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    run_pygit(dir.path(), &["branch", "branch1"]).assert().success();
    run_pygit(dir.path(), &["branch", "branch2"]).assert().success();

    run_pygit(dir.path(), &["checkout", "branch1"]).assert().success();
    write_file(FileSpec::new(
        dir.path().join("conflict.txt"),
        "conflict1\n".to_string(),
    ));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "branch1 version").assert().success();

    run_pygit(dir.path(), &["checkout", "branch2"]).assert().success();
    write_file(FileSpec::new(
        dir.path().join("conflict.txt"),
        "conflict2\n".to_string(),
    ));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "branch2 version").assert().success();
    let branch2_oid = head_commit_oid(dir.path());

    run_pygit(dir.path(), &["checkout", "branch1"]).assert().success();
    run_pygit(dir.path(), &["merge", "branch2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFLICT"));

    let conflicted = read_file(&dir.path().join("conflict.txt"));
    assert!(conflicted.contains("<<<<<<< HEAD"));
    assert!(conflicted.contains("conflict1"));
    assert!(conflicted.contains("======="));
    assert!(conflicted.contains("conflict2"));
    assert!(conflicted.contains(">>>>>>> branch2"));

    let merge_head =
        std::fs::read_to_string(dir.path().join(".pygit").join("MERGE_HEAD")).unwrap();
    assert_eq!(merge_head.trim(), branch2_oid);
}

#[rstest]
fn committing_after_resolving_concludes_the_merge(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    run_pygit(dir.path(), &["branch", "branch2"]).assert().success();

    write_file(FileSpec::new(
        dir.path().join("conflict.txt"),
        "ours\n".to_string(),
    ));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "our version").assert().success();
    let our_oid = head_commit_oid(dir.path());

    run_pygit(dir.path(), &["checkout", "branch2"]).assert().success();
    write_file(FileSpec::new(
        dir.path().join("conflict.txt"),
        "theirs\n".to_string(),
    ));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "their version").assert().success();
    let their_oid = head_commit_oid(dir.path());

    run_pygit(dir.path(), &["checkout", "main"]).assert().success();

    // merge ours first (fast-forward), then theirs (conflict)
    run_pygit(dir.path(), &["merge", &our_oid]).assert().success();
    run_pygit(dir.path(), &["merge", "branch2"]).assert().failure();

    // resolve and conclude
    write_file(FileSpec::new(
        dir.path().join("conflict.txt"),
        "resolved\n".to_string(),
    ));
    run_pygit(dir.path(), &["add", "conflict.txt"]).assert().success();
    pygit_commit(dir.path(), "merge branch2").assert().success();

    assert!(!dir.path().join(".pygit").join("MERGE_HEAD").exists());

    // the concluding commit carries both parents
    run_pygit(dir.path(), &["log"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "Merge: {} {}",
            &our_oid[..7],
            &their_oid[..7]
        )));
}

#[rstest]
fn merge_is_symmetric_on_conflict_free_trees(init_repository_dir: TempDir) {
    let dir = init_repository_dir;

    write_file(FileSpec::new(dir.path().join("l.txt"), "l\n".to_string()));
    write_file(FileSpec::new(dir.path().join("r.txt"), "r\n".to_string()));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "base").assert().success();

    run_pygit(dir.path(), &["branch", "other"]).assert().success();

    write_file(FileSpec::new(dir.path().join("l.txt"), "l2\n".to_string()));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "main edit").assert().success();

    run_pygit(dir.path(), &["checkout", "other"]).assert().success();
    write_file(FileSpec::new(dir.path().join("r.txt"), "r2\n".to_string()));
    run_pygit(dir.path(), &["add", "."]).assert().success();
    pygit_commit(dir.path(), "other edit").assert().success();

    // merge main into other
    run_pygit(dir.path(), &["merge", "main"]).assert().success();
    let other_l = read_file(&dir.path().join("l.txt"));
    let other_r = read_file(&dir.path().join("r.txt"));

    assert_eq!(other_l, "l2\n");
    assert_eq!(other_r, "r2\n");
}
