//! Content-addressed object store.
//!
//! One file per object under `objects/blobs` and `objects/commits`, named by
//! digest. The store is append-only: `put` is idempotent (an existing file
//! short-circuits the write) and nothing is ever overwritten or deleted.
//! Writes go through a temp file + rename so a crash never leaves a
//! half-written object under its final name.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::object::{Blob, Commit, Digest};

/// Handle to the object store of one repository root.
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Create a handle for the given repository root (the marker directory).
    /// Does not touch the filesystem; see [`ObjectStore::create_dirs`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join("objects").join("blobs")
    }

    pub fn commits_dir(&self) -> PathBuf {
        self.root.join("objects").join("commits")
    }

    /// Ensure the object directories exist.
    pub fn create_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.blobs_dir())?;
        fs::create_dir_all(self.commits_dir())?;
        Ok(())
    }

    fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Store a blob under the digest of its contents. Idempotent.
    pub fn put_blob(&self, blob: &Blob) -> Result<Digest> {
        let digest = blob.digest();
        let path = self.blobs_dir().join(digest.to_hex());
        if path.exists() {
            return Ok(digest); // already stored, content-addressed
        }
        Self::write_atomic(&path, &blob.to_bytes()?)?;
        debug!(digest = %digest, name = %blob.name, "stored blob");
        Ok(digest)
    }

    /// Store a commit under the digest of its canonical form. Idempotent.
    pub fn put_commit(&self, commit: &Commit) -> Result<Digest> {
        let bytes = commit.to_bytes()?;
        let digest = Digest::from_data(&bytes);
        let path = self.commits_dir().join(digest.to_hex());
        if path.exists() {
            return Ok(digest);
        }
        Self::write_atomic(&path, &bytes)?;
        debug!(digest = %digest, "stored commit");
        Ok(digest)
    }

    /// Load a blob, failing if the digest is referenced but absent.
    pub fn blob(&self, digest: Digest) -> Result<Blob> {
        let path = self.blobs_dir().join(digest.to_hex());
        if !path.is_file() {
            return Err(Error::ObjectMissing(digest));
        }
        Blob::from_bytes(&fs::read(&path)?)
    }

    /// Load a commit by its full digest.
    pub fn commit(&self, digest: Digest) -> Result<Commit> {
        let path = self.commits_dir().join(digest.to_hex());
        if !path.is_file() {
            return Err(Error::CommitNotFound(digest.to_hex()));
        }
        Commit::from_bytes(&fs::read(&path)?)
    }

    pub fn contains_blob(&self, digest: Digest) -> bool {
        self.blobs_dir().join(digest.to_hex()).is_file()
    }

    pub fn contains_commit(&self, digest: Digest) -> bool {
        self.commits_dir().join(digest.to_hex()).is_file()
    }

    /// All stored commit digests, sorted for deterministic iteration.
    pub fn commit_digests(&self) -> Result<Vec<Digest>> {
        let mut digests = Vec::new();
        for entry in fs::read_dir(self.commits_dir())? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(digest) = entry.file_name().to_str().and_then(Digest::from_hex) {
                digests.push(digest);
            }
        }
        digests.sort();
        Ok(digests)
    }

    /// Resolve a (possibly abbreviated) commit id by a linear scan over the
    /// sorted commit digests. Zero matches and multiple matches both
    /// surface as `CommitNotFound`: an ambiguous prefix is deliberately
    /// treated as not-found rather than picking one of the candidates.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<Digest> {
        if prefix.is_empty() || prefix.len() > 64 {
            return Err(Error::CommitNotFound(prefix.to_string()));
        }
        let mut matches = self
            .commit_digests()?
            .into_iter()
            .filter(|d| d.to_hex().starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(digest), None) => Ok(digest),
            _ => Err(Error::CommitNotFound(prefix.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ObjectStore) {
        let tmp = TempDir::new().unwrap();
        let store = ObjectStore::new(tmp.path());
        store.create_dirs().unwrap();
        (tmp, store)
    }

    #[test]
    fn put_blob_is_idempotent() {
        let (_tmp, store) = store();
        let blob = Blob::new("f.txt", b"hello".to_vec());
        let first = store.put_blob(&blob).unwrap();
        let second = store.put_blob(&blob).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read_dir(store.blobs_dir()).unwrap().count(), 1);
    }

    #[test]
    fn commit_roundtrip_preserves_digest() {
        let (_tmp, store) = store();
        let commit = Commit::root();
        let digest = store.put_commit(&commit).unwrap();
        let loaded = store.commit(digest).unwrap();
        assert_eq!(loaded.digest().unwrap(), digest);
        assert_eq!(loaded.message, "initial commit");
    }

    #[test]
    fn missing_commit_is_not_found() {
        let (_tmp, store) = store();
        let absent = Digest::from_data(b"nothing here");
        assert!(matches!(
            store.commit(absent),
            Err(Error::CommitNotFound(_))
        ));
    }

    #[test]
    fn resolve_prefix_unique_and_missing() {
        let (_tmp, store) = store();
        let digest = store.put_commit(&Commit::root()).unwrap();
        let hex = digest.to_hex();

        assert_eq!(store.resolve_prefix(&hex[..8]).unwrap(), digest);
        assert_eq!(store.resolve_prefix(&hex).unwrap(), digest);
        assert!(store.resolve_prefix("0123456789abcdef").is_err());
        assert!(store.resolve_prefix("").is_err());
    }

    #[test]
    fn resolve_prefix_ambiguous_is_not_found() {
        let (_tmp, store) = store();
        let a = store.put_commit(&Commit::new("a", 1, None, None)).unwrap();
        let b = store.put_commit(&Commit::new("b", 2, None, None)).unwrap();
        // The empty-prefix guard aside, any shared prefix must not resolve.
        let shared: String = a
            .to_hex()
            .chars()
            .zip(b.to_hex().chars())
            .take_while(|(x, y)| x == y)
            .map(|(x, _)| x)
            .collect();
        if !shared.is_empty() {
            assert!(store.resolve_prefix(&shared).is_err());
        }
    }
}
