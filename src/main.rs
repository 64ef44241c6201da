#![allow(dead_code)]

use crate::areas::repository::Repository;
use crate::artifacts::core::RepoError;
use crate::commands::porcelain::reset::ResetMode;
use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod areas;
mod artifacts;
mod commands;

#[derive(Parser)]
#[command(
    name = "pygit",
    version = "0.1.0",
    about = "A loose-object version control tool built on the Git data model",
    long_about = "pygit records snapshots of a directory tree as content-addressed \
    objects, arranges them into a commit graph, and reconciles divergent \
    histories with three-way merges. One repository, one user, no network."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create an empty repository")]
    Init {
        #[arg(index = 1, help = "Directory to initialise (defaults to the current one)")]
        path: Option<String>,
    },
    #[command(about = "Stage file contents for the next commit")]
    Add {
        #[arg(index = 1, required = true, help = "Files or directories to stage")]
        paths: Vec<String>,
    },
    #[command(about = "Remove tracked files and stage the deletion")]
    Rm {
        #[arg(index = 1, required = true, help = "Tracked paths to remove")]
        paths: Vec<String>,
    },
    #[command(about = "Record the staged tree as a new commit")]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: String,
    },
    #[command(about = "Show the first-parent history from HEAD")]
    Log,
    #[command(about = "Show staged, unstaged and untracked paths")]
    Status {
        #[arg(long, help = "Machine-readable two-column output")]
        porcelain: bool,
    },
    #[command(about = "Show unstaged changes, or staged ones with --staged")]
    Diff {
        #[arg(long, help = "Compare HEAD against the index instead")]
        staged: bool,
    },
    #[command(about = "List, create or delete branches")]
    Branch {
        #[arg(index = 1, help = "Branch name to create or delete")]
        name: Option<String>,
        #[arg(index = 2, help = "Revision the new branch starts at (defaults to HEAD)")]
        start: Option<String>,
        #[arg(short, long, help = "Delete the named branch")]
        delete: bool,
    },
    #[command(about = "Materialise a revision and move HEAD")]
    Checkout {
        #[arg(index = 1, help = "Branch name or revision")]
        target: String,
    },
    #[command(about = "Merge a revision into the current branch")]
    Merge {
        #[arg(index = 1, help = "Revision to merge")]
        target: String,
    },
    #[command(about = "Replay the current branch onto another revision")]
    Rebase {
        #[arg(index = 1, help = "Revision to rebase onto")]
        target: String,
    },
    #[command(about = "List tags, or tag a revision")]
    Tag {
        #[arg(index = 1, help = "Tag name to create")]
        name: Option<String>,
        #[arg(index = 2, help = "Revision to tag (defaults to HEAD)")]
        rev: Option<String>,
        #[arg(short, long, help = "Create an annotated tag with this message")]
        message: Option<String>,
    },
    #[command(about = "Shelve and restore uncommitted changes")]
    Stash {
        #[command(subcommand)]
        action: Option<StashAction>,
    },
    #[command(about = "Move HEAD, optionally resetting index and working tree")]
    #[command(group = ArgGroup::new("mode").args(["soft", "mixed", "hard"])) ]
    Reset {
        #[arg(long, help = "Move HEAD only")]
        soft: bool,
        #[arg(long, help = "Move HEAD and reset the index (default)")]
        mixed: bool,
        #[arg(long, help = "Move HEAD, reset index and working tree")]
        hard: bool,
        #[arg(index = 1, help = "Target revision")]
        rev: String,
    },
    #[command(about = "Get or set a configuration value")]
    Config {
        #[arg(index = 1, help = "Key of the form section.key")]
        key: String,
        #[arg(index = 2, help = "Value to set; omit to read")]
        value: Option<String>,
    },
    #[command(about = "List or remove untracked files")]
    #[command(group = ArgGroup::new("action").required(true).args(["dry_run", "force"]))]
    Clean {
        #[arg(short = 'n', help = "Only list what would be removed")]
        dry_run: bool,
        #[arg(short = 'f', help = "Actually remove untracked files")]
        force: bool,
        #[arg(short = 'd', help = "Include untracked directories")]
        dirs: bool,
    },
    #[command(about = "Print the object a revision names")]
    Show {
        #[arg(index = 1, help = "Revision to show")]
        rev: String,
    },
}

#[derive(Subcommand)]
enum StashAction {
    #[command(about = "Save index and working tree, then reset to HEAD")]
    Push,
    #[command(about = "List stash entries, newest first")]
    List,
    #[command(about = "Restore the newest stash entry and drop it")]
    Pop,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PYGIT_LOG").unwrap_or_else(|_| EnvFilter::new("off")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        match err.downcast_ref::<RepoError>() {
            Some(repo_err) => eprintln!("{}", repo_err),
            None => eprintln!("fatal: {:#}", err),
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { path } = &cli.command {
        let path = match path {
            Some(path) => std::path::PathBuf::from(path),
            None => std::env::current_dir()?,
        };
        std::fs::create_dir_all(&path)?;

        let repository = Repository::at(path, Box::new(std::io::stdout()))?;
        return repository.init();
    }

    let cwd = std::env::current_dir()?;
    let repository = Repository::discover(&cwd, Box::new(std::io::stdout()))?;

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Add { paths } => repository.add(&paths),
        Commands::Rm { paths } => repository.rm(&paths),
        Commands::Commit { message } => repository.commit(&message),
        Commands::Log => repository.log(),
        Commands::Status { porcelain } => repository.status(porcelain),
        Commands::Diff { staged } => repository.diff(staged),
        Commands::Branch {
            name,
            start,
            delete,
        } => repository.branch(name.as_deref(), start.as_deref(), delete),
        Commands::Checkout { target } => repository.checkout(&target),
        Commands::Merge { target } => repository.merge(&target),
        Commands::Rebase { target } => repository.rebase(&target),
        Commands::Tag { name, rev, message } => {
            repository.tag(name.as_deref(), rev.as_deref(), message.as_deref())
        }
        Commands::Stash { action } => match action.unwrap_or(StashAction::Push) {
            StashAction::Push => repository.stash_push(),
            StashAction::List => repository.stash_list(),
            StashAction::Pop => repository.stash_pop(),
        },
        Commands::Reset {
            soft,
            mixed: _,
            hard,
            rev,
        } => {
            let mode = if soft {
                ResetMode::Soft
            } else if hard {
                ResetMode::Hard
            } else {
                ResetMode::Mixed
            };
            repository.reset(mode, &rev)
        }
        Commands::Config { key, value } => repository.config_command(&key, value.as_deref()),
        Commands::Clean {
            dry_run: _,
            force,
            dirs,
        } => repository.clean(force, dirs),
        Commands::Show { rev } => repository.show(&rev),
    }
}
