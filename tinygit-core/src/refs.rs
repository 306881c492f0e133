//! Reference store: branches, HEAD, and the remote-head marker.
//!
//! Branches are named mutable pointers to commit digests, stored as JSON
//! files under `refs/heads/<name>`. Shadow branches for remotes live in a
//! subdirectory per remote (`refs/heads/<remote>/<branch>`). HEAD is a
//! plain-text file holding the relative path of the current branch file,
//! so switching branches never touches branch objects themselves.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::object::Digest;

/// A named mutable pointer to a commit digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name, unique under `refs/heads`. Shadow branches use the
    /// `<remote>/<branch>` form.
    pub name: String,
    /// Commit digest the branch currently points at.
    pub commit: Digest,
}

impl Branch {
    pub fn new(name: impl Into<String>, commit: Digest) -> Self {
        Self {
            name: name.into(),
            commit,
        }
    }
}

/// Handle to the reference store of one repository root.
pub struct RefStore {
    root: PathBuf,
}

impl RefStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn heads_dir(&self) -> PathBuf {
        self.root.join("refs").join("heads")
    }

    fn branch_path(&self, name: &str) -> PathBuf {
        self.heads_dir().join(name)
    }

    fn head_path(&self) -> PathBuf {
        self.root.join("HEAD")
    }

    fn remote_head_path(&self) -> PathBuf {
        self.root.join("REMOTE_HEAD")
    }

    /// Ensure the refs directory exists.
    pub fn create_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.heads_dir())?;
        Ok(())
    }

    fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Branch names may contain dots; append the suffix instead of
        // `with_extension` so `feature.x` and `feature` never share a
        // temp path.
        let mut tmp_name = path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Create or update a branch pointer.
    pub fn save_branch(&self, branch: &Branch) -> Result<()> {
        let data = serde_json::to_string_pretty(branch)?;
        Self::write_atomic(&self.branch_path(&branch.name), data.as_bytes())
    }

    /// Load a branch by name (shadow names like `origin/master` included).
    pub fn branch(&self, name: &str) -> Result<Branch> {
        let path = self.branch_path(name);
        if !path.is_file() {
            return Err(Error::BranchNotFound(name.to_string()));
        }
        Ok(serde_json::from_str(&fs::read_to_string(&path)?)?)
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        self.branch_path(name).is_file()
    }

    pub fn delete_branch(&self, name: &str) -> Result<()> {
        let path = self.branch_path(name);
        if !path.is_file() {
            return Err(Error::BranchNotFound(name.to_string()));
        }
        fs::remove_file(&path)?;
        Ok(())
    }

    /// Local branch names (plain files directly under `refs/heads`), sorted.
    /// Shadow branches live in subdirectories and are not listed.
    pub fn branch_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.heads_dir())? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Point HEAD at the given branch.
    pub fn set_head(&self, branch_name: &str) -> Result<()> {
        let target = format!("refs/heads/{branch_name}");
        Self::write_atomic(&self.head_path(), target.as_bytes())
    }

    /// Name of the branch HEAD currently points at.
    pub fn head_branch_name(&self) -> Result<String> {
        let path = self.head_path();
        if !path.is_file() {
            return Err(Error::NotInitialized);
        }
        let target = fs::read_to_string(&path)?;
        Ok(target
            .trim()
            .strip_prefix("refs/heads/")
            .unwrap_or(target.trim())
            .to_string())
    }

    /// Record the last remote branch touched by push or fetch.
    pub fn set_remote_head(&self, remote: &str, branch: &str) -> Result<()> {
        let target = format!("refs/heads/{remote}/{branch}");
        Self::write_atomic(&self.remote_head_path(), target.as_bytes())
    }
}
