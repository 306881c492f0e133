//! Staging area: the pending add/remove delta awaiting the next commit.
//!
//! Two disjoint sides persisted one file per entry under
//! `objects/staged/addition` and `objects/staged/removal`. On-disk entries
//! are keyed by the file name with its extension stripped; the record
//! inside carries the full name. Entries are created by `add`/`rm` and
//! consumed atomically by the next successful commit, checkout, or reset.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::object::{Blob, Commit, Digest};
use crate::store::ObjectStore;

/// A pending addition: the file name and the blob captured for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedAddition {
    pub name: String,
    pub blob: Digest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RemovalRecord {
    name: String,
}

/// Handle to the staging area of one repository root.
pub struct Stage {
    root: PathBuf,
}

impl Stage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn addition_dir(&self) -> PathBuf {
        self.root.join("objects").join("staged").join("addition")
    }

    pub fn removal_dir(&self) -> PathBuf {
        self.root.join("objects").join("staged").join("removal")
    }

    /// Ensure both staging directories exist.
    pub fn create_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.addition_dir())?;
        fs::create_dir_all(self.removal_dir())?;
        Ok(())
    }

    /// On-disk entry key: the file name without its extension. A name with
    /// no extension is used as-is.
    fn stem(name: &str) -> String {
        Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name)
            .to_string()
    }

    fn addition_path(&self, name: &str) -> PathBuf {
        self.addition_dir().join(Self::stem(name))
    }

    fn removal_path(&self, name: &str) -> PathBuf {
        self.removal_dir().join(Self::stem(name))
    }

    /// Stage a blob for addition against the given HEAD commit.
    ///
    /// If the blob's content digest equals what HEAD already tracks for
    /// that name, the file is unchanged: any pending addition is dropped
    /// and nothing new is staged. Otherwise the blob is persisted into the
    /// object store immediately and recorded as a pending addition,
    /// replacing any prior entry for the name.
    pub fn stage_for_addition(&self, store: &ObjectStore, head: &Commit, blob: Blob) -> Result<()> {
        let digest = blob.digest();
        let entry_path = self.addition_path(&blob.name);

        if head.tracked.get(&blob.name) == Some(&digest) {
            if entry_path.is_file() {
                fs::remove_file(&entry_path)?;
                debug!(name = %blob.name, "un-staged unchanged file");
            }
            return Ok(());
        }

        store.put_blob(&blob)?;
        let record = StagedAddition {
            name: blob.name,
            blob: digest,
        };
        fs::write(&entry_path, bincode::serialize(&record)?)?;
        Ok(())
    }

    /// Stage a file for removal.
    ///
    /// Fails with `NothingToRemove` unless the file is pending addition
    /// (then it is simply un-staged) or tracked by HEAD (then it is
    /// recorded for removal and its working copy deleted).
    pub fn stage_for_removal(&self, head: &Commit, work_dir: &Path, name: &str) -> Result<()> {
        let mut acted = false;

        let addition_path = self.addition_path(name);
        if addition_path.is_file() {
            fs::remove_file(&addition_path)?;
            acted = true;
        }

        if head.tracked.contains_key(name) {
            let record = RemovalRecord {
                name: name.to_string(),
            };
            fs::write(self.removal_path(name), bincode::serialize(&record)?)?;
            let working_copy = work_dir.join(name);
            if working_copy.is_file() {
                fs::remove_file(&working_copy)?;
            }
            acted = true;
        }

        if !acted {
            return Err(Error::NothingToRemove(name.to_string()));
        }
        Ok(())
    }

    /// True iff neither side has pending entries. Gates the commit
    /// operation.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(Self::dir_is_empty(&self.addition_dir())? && Self::dir_is_empty(&self.removal_dir())?)
    }

    fn dir_is_empty(dir: &Path) -> Result<bool> {
        Ok(fs::read_dir(dir)?.next().is_none())
    }

    /// Pending additions, sorted by file name.
    pub fn additions(&self) -> Result<Vec<StagedAddition>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.addition_dir())? {
            let entry = entry?;
            let record: StagedAddition = bincode::deserialize(&fs::read(entry.path())?)?;
            entries.push(record);
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Pending removal file names, sorted.
    pub fn removals(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.removal_dir())? {
            let entry = entry?;
            let record: RemovalRecord = bincode::deserialize(&fs::read(entry.path())?)?;
            names.push(record.name);
        }
        names.sort();
        Ok(names)
    }

    /// Empty both sides. Called after every successful commit, checkout,
    /// or reset.
    pub fn clear(&self) -> Result<()> {
        for dir in [self.addition_dir(), self.removal_dir()] {
            for entry in fs::read_dir(&dir)? {
                fs::remove_file(entry?.path())?;
            }
        }
        Ok(())
    }
}
