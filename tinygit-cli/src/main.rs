//! tinygit — a small local version-control system.
//!
//! Every subcommand maps 1:1 onto a core operation; this binary only
//! parses arguments, formats output, and converts errors into exit codes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tinygit_core::{Commit, Digest, Repository};

#[derive(Parser, Debug)]
#[command(name = "tinygit")]
#[command(version = "0.1.0")]
#[command(about = "A small local version-control system")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize a new repository in the current directory
    Init,

    /// Stage a file for addition
    Add { file: String },

    /// Record the staged changes as a new commit
    Commit { message: String },

    /// Stage a file for removal and delete it if tracked
    Rm { file: String },

    /// Show the current branch's history
    Log,

    /// Show every commit in the repository
    #[command(name = "global-log")]
    GlobalLog,

    /// Print the ids of all commits with the given message
    Find { message: String },

    /// Show branches and staged files
    Status,

    /// Restore a file or switch branches:
    /// `checkout -- <file>`, `checkout <commit> -- <file>`, or
    /// `checkout <branch>`
    #[command(verbatim_doc_comment)]
    Checkout {
        /// Commit id (abbreviations allowed) or branch name
        target: Option<String>,
        /// File to restore, after `--`
        #[arg(last = true)]
        file: Option<String>,
    },

    /// Create a new branch pointing at the current commit
    Branch { name: String },

    /// Delete a branch pointer
    #[command(name = "rm-branch")]
    RmBranch { name: String },

    /// Move the current branch to a commit and restore its files
    Reset { commit: String },

    /// Merge a branch into the current branch
    Merge { branch: String },

    /// Register a remote repository under a name
    #[command(name = "add-remote")]
    AddRemote { name: String, path: PathBuf },

    /// Forget a remote
    #[command(name = "rm-remote")]
    RmRemote { name: String },

    /// Append the current branch's commits to a remote branch
    Push { remote: String, branch: String },

    /// Copy commits and blobs from a remote branch
    Fetch { remote: String, branch: String },

    /// Fetch a remote branch and merge it into the current branch
    Pull { remote: String, branch: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // User-facing condition, reported on stdout like any other
            // command output; the exit code carries the failure.
            println!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;

    if let Commands::Init = cli.command {
        Repository::init(&cwd)?;
        return Ok(());
    }

    let repo = Repository::open(&cwd)?;
    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Add { file } => repo.add(&file)?,
        Commands::Commit { message } => {
            repo.commit(&message)?;
        }
        Commands::Rm { file } => repo.rm(&file)?,
        Commands::Log => {
            for (digest, commit) in repo.log()? {
                print_commit(digest, &commit);
            }
        }
        Commands::GlobalLog => {
            for (digest, commit) in repo.global_log()? {
                print_commit(digest, &commit);
            }
        }
        Commands::Find { message } => {
            let matches = repo.find(&message)?;
            if matches.is_empty() {
                println!("Found no commit with that message.");
            }
            for digest in matches {
                println!("{digest}");
            }
        }
        Commands::Status => {
            let status = repo.status()?;
            println!("=== Branches ===");
            println!("*{}", status.current_branch);
            for branch in &status.branches {
                if *branch != status.current_branch {
                    println!("{branch}");
                }
            }
            println!("\n=== Staged Files ===");
            for name in &status.staged {
                println!("{name}");
            }
            println!("\n=== Removed Files ===");
            for name in &status.removed {
                println!("{name}");
            }
            println!();
        }
        Commands::Checkout { target, file } => match (target, file) {
            (None, Some(file)) => repo.checkout_file(&file)?,
            (Some(commit), Some(file)) => repo.checkout_file_at(&commit, &file)?,
            (Some(branch), None) => repo.checkout_branch(&branch)?,
            (None, None) => {
                println!("Invalid number of arguments for: checkout.");
                return Ok(());
            }
        },
        Commands::Branch { name } => repo.branch(&name)?,
        Commands::RmBranch { name } => repo.rm_branch(&name)?,
        Commands::Reset { commit } => repo.reset(&commit)?,
        Commands::Merge { branch } => report_merge(repo.merge(&branch)?),
        Commands::AddRemote { name, path } => repo.add_remote(&name, Path::new(&path))?,
        Commands::RmRemote { name } => repo.rm_remote(&name)?,
        Commands::Push { remote, branch } => repo.push(&remote, &branch)?,
        Commands::Fetch { remote, branch } => repo.fetch(&remote, &branch)?,
        Commands::Pull { remote, branch } => report_merge(repo.pull(&remote, &branch)?),
    }
    Ok(())
}

fn report_merge(outcome: tinygit_core::MergeOutcome) {
    if outcome.fast_forwarded {
        println!("Current branch fast-forwarded.");
    } else if !outcome.conflicts.is_empty() {
        println!("Encountered a merge conflict.");
    }
}

fn print_commit(digest: Digest, commit: &Commit) {
    println!("===");
    println!("commit {digest}");
    if let (Some(parent), Some(other)) = (commit.parent, commit.other_parent) {
        println!(
            "Merge: {} {}",
            &parent.to_hex()[..7],
            &other.to_hex()[..7]
        );
    }
    println!("Date: {}", format_date(commit.timestamp));
    println!("{}\n", commit.message);
}

fn format_date(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%a %b %d %H:%M:%S %Y %z").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(args).unwrap().command
    }

    #[test]
    fn checkout_argument_forms() {
        match parse(&["tinygit", "checkout", "--", "f.txt"]) {
            Commands::Checkout {
                target: None,
                file: Some(file),
            } => assert_eq!(file, "f.txt"),
            other => panic!("unexpected parse: {other:?}"),
        }
        match parse(&["tinygit", "checkout", "abc123", "--", "f.txt"]) {
            Commands::Checkout {
                target: Some(target),
                file: Some(file),
            } => {
                assert_eq!(target, "abc123");
                assert_eq!(file, "f.txt");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
        match parse(&["tinygit", "checkout", "feature"]) {
            Commands::Checkout {
                target: Some(target),
                file: None,
            } => assert_eq!(target, "feature"),
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn date_formatting_is_stable() {
        assert_eq!(format_date(0), "Thu Jan 01 00:00:00 1970 +0000");
        assert_eq!(format_date(1_700_000_000), "Tue Nov 14 22:13:20 2023 +0000");
    }
}
