use assert_cmd::Command;
use assert_fs::TempDir;
use derive_new::new;
use rstest::fixture;
use std::path::Path;

use crate::common::file::{FileSpec, write_file};

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("failed to create temp dir")
}

/// A repository with three committed files: `1.txt`, `a/2.txt`, `a/b/3.txt`.
#[fixture]
pub fn init_repository_dir(repository_dir: TempDir) -> TempDir {
    run_pygit(repository_dir.path(), &["init"]).assert().success();

    write_file(FileSpec::new(repository_dir.path().join("1.txt"), "one\n".to_string()));
    write_file(FileSpec::new(
        repository_dir.path().join("a").join("2.txt"),
        "two\n".to_string(),
    ));
    write_file(FileSpec::new(
        repository_dir.path().join("a").join("b").join("3.txt"),
        "three\n".to_string(),
    ));

    run_pygit(repository_dir.path(), &["add", "."])
        .assert()
        .success();
    pygit_commit(repository_dir.path(), "Initial commit")
        .assert()
        .success();

    repository_dir
}

pub fn run_pygit(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("pygit").expect("failed to find pygit binary");
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

#[derive(Debug, Clone, new)]
pub struct RandomAuthor {
    pub name: String,
    pub email: String,
}

pub fn generate_random_author() -> RandomAuthor {
    use fake::Fake;
    use fake::faker::internet::en::FreeEmail;
    use fake::faker::name::en::Name;

    let name = Name().fake::<String>().replace(' ', "_");
    let email = FreeEmail().fake::<String>();
    RandomAuthor::new(name, email)
}

/// `pygit commit -m <message>` with a generated author identity.
pub fn pygit_commit(dir: &Path, message: &str) -> Command {
    let author = generate_random_author();
    let mut cmd = run_pygit(dir, &["commit", "-m", message]);
    cmd.envs(vec![
        ("PYGIT_AUTHOR_NAME", &author.name),
        ("PYGIT_AUTHOR_EMAIL", &author.email),
    ]);
    cmd
}

/// The commit id the current branch points at.
pub fn head_commit_oid(dir: &Path) -> String {
    let head = std::fs::read_to_string(dir.join(".pygit").join("HEAD"))
        .expect("failed to read HEAD")
        .trim()
        .to_string();

    match head.strip_prefix("ref: ") {
        Some(ref_path) => std::fs::read_to_string(dir.join(".pygit").join(ref_path))
            .expect("failed to read branch ref")
            .trim()
            .to_string(),
        None => head,
    }
}
