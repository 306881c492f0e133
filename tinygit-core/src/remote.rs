//! Remote synchronization between two repository roots on the filesystem.
//!
//! A remote is a named descriptor pointing at another repository's marker
//! directory. Push and fetch walk first-parent commit chains, copying
//! objects that the receiving store does not already hold; because stores
//! are content-addressed and append-only, re-running an interrupted
//! transfer is safe — already-present objects are skipped and ref pointers
//! only advance after a complete walk.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};
use crate::object::{Commit, Digest};
use crate::refs::{Branch, RefStore};
use crate::repo::Repository;
use crate::store::ObjectStore;

/// Named reference to another repository's root path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    /// Path to the remote repository's marker directory.
    pub path: PathBuf,
}

fn remotes_dir(repo: &Repository) -> PathBuf {
    repo.root().join("objects").join("remotes")
}

/// Record a remote descriptor.
pub fn add_remote(repo: &Repository, name: &str, path: &Path) -> Result<()> {
    let remote = Remote {
        name: name.to_string(),
        path: path.to_path_buf(),
    };
    let dir = remotes_dir(repo);
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(name), serde_json::to_string_pretty(&remote)?)?;
    Ok(())
}

/// Delete a remote descriptor.
pub fn rm_remote(repo: &Repository, name: &str) -> Result<()> {
    let path = remotes_dir(repo).join(name);
    if !path.is_file() {
        return Err(Error::RemoteNotFound(name.to_string()));
    }
    fs::remove_file(&path)?;
    Ok(())
}

/// Load a remote descriptor and verify its root exists.
fn load_remote(repo: &Repository, name: &str) -> Result<Remote> {
    let path = remotes_dir(repo).join(name);
    if !path.is_file() {
        return Err(Error::RemoteNotFound(name.to_string()));
    }
    let remote: Remote = serde_json::from_str(&fs::read_to_string(&path)?)?;
    if !remote.path.is_dir() {
        return Err(Error::RemoteNotFound(name.to_string()));
    }
    Ok(remote)
}

/// Copy one commit and any of its referenced blobs the destination store
/// is missing.
fn copy_commit(
    src: &ObjectStore,
    dst: &ObjectStore,
    digest: Digest,
    commit: &Commit,
) -> Result<()> {
    for blob_digest in commit.tracked.values() {
        if !dst.contains_blob(*blob_digest) {
            dst.put_blob(&src.blob(*blob_digest)?)?;
        }
    }
    if !dst.contains_commit(digest) {
        dst.put_commit(commit)?;
    }
    Ok(())
}

/// Append the current branch's commits to `branch_name` at the remote.
///
/// Walks the local HEAD's first-parent chain until it reaches the remote
/// branch's current head. If the chain bottoms out first, the remote has
/// history the local branch does not and the push fails with
/// `DivergedHistory` before anything is copied. A branch the remote does
/// not have yet is created from the full chain. On success the remote
/// branch and its local shadow advance to the local head.
pub fn push(repo: &Repository, remote_name: &str, branch_name: &str) -> Result<()> {
    let remote = load_remote(repo, remote_name)?;
    let remote_objects = ObjectStore::new(&remote.path);
    let remote_refs = RefStore::new(&remote.path);

    let (head_digest, _) = repo.head_commit()?;
    let remote_head = if remote_refs.branch_exists(branch_name) {
        Some(remote_refs.branch(branch_name)?.commit)
    } else {
        None
    };

    // Collect the chain first: a diverged push must not mutate the remote.
    let mut chain = Vec::new();
    let mut cursor = Some(head_digest);
    loop {
        match cursor {
            Some(digest) if Some(digest) == remote_head => break,
            Some(digest) => {
                let commit = repo.objects().commit(digest)?;
                cursor = commit.parent;
                chain.push((digest, commit));
            }
            None => {
                if remote_head.is_some() {
                    return Err(Error::DivergedHistory);
                }
                break;
            }
        }
    }

    for (digest, commit) in chain.iter().rev() {
        copy_commit(repo.objects(), &remote_objects, *digest, commit)?;
    }

    remote_refs.save_branch(&Branch::new(branch_name, head_digest))?;
    repo.refs().save_branch(&Branch::new(
        format!("{remote_name}/{branch_name}"),
        head_digest,
    ))?;
    repo.refs().set_remote_head(remote_name, branch_name)?;
    info!(
        commits = chain.len(),
        head = %head_digest,
        "pushed to {remote_name}/{branch_name}"
    );
    Ok(())
}

/// Copy commits and blobs from the remote branch into the local store.
///
/// Walks from the remote head along first-parent links, copying commits
/// the local store is missing, and stops at the first commit already
/// present (or the root). Blobs are then copied for the last commit
/// loaded during the walk. The local shadow branch advances to the remote
/// head; re-running without intervening remote changes is a no-op.
pub fn fetch(repo: &Repository, remote_name: &str, branch_name: &str) -> Result<()> {
    let remote = load_remote(repo, remote_name)?;
    let remote_objects = ObjectStore::new(&remote.path);
    let remote_refs = RefStore::new(&remote.path);

    let remote_head = remote_refs.branch(branch_name)?.commit;
    let mut last_loaded = remote_objects.commit(remote_head)?;
    let mut copied = 0usize;
    let mut cursor = Some(remote_head);
    while let Some(digest) = cursor {
        if repo.objects().contains_commit(digest) {
            break;
        }
        let commit = remote_objects.commit(digest)?;
        repo.objects().put_commit(&commit)?;
        copied += 1;
        cursor = commit.parent;
        last_loaded = commit;
    }

    for blob_digest in last_loaded.tracked.values() {
        if !repo.objects().contains_blob(*blob_digest) {
            repo.objects().put_blob(&remote_objects.blob(*blob_digest)?)?;
        }
    }

    repo.refs().save_branch(&Branch::new(
        format!("{remote_name}/{branch_name}"),
        remote_head,
    ))?;
    repo.refs().set_remote_head(remote_name, branch_name)?;
    info!(
        commits = copied,
        head = %remote_head,
        "fetched {remote_name}/{branch_name}"
    );
    Ok(())
}
