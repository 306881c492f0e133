//! Repository handle and the operations behind each command.
//!
//! `Repository` is an explicit context object carrying the resolved paths
//! and store handles for one repository root; every operation takes it as
//! `&self`. There is no global filesystem state and nothing here ever
//! terminates the process — failures are typed errors propagated to the
//! caller.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};
use crate::merge::{MergeEngine, MergeOutcome};
use crate::object::{Blob, Commit, Digest};
use crate::refs::{Branch, RefStore};
use crate::remote;
use crate::stage::Stage;
use crate::store::ObjectStore;

/// Name of the marker directory inside the working directory.
pub const REPO_DIR: &str = ".tinygit";

/// Name of the branch created by `init`.
pub const DEFAULT_BRANCH: &str = "master";

/// Snapshot of branch and staging state for the `status` command.
#[derive(Debug, Clone)]
pub struct Status {
    /// Name of the branch HEAD points at.
    pub current_branch: String,
    /// All local branch names, sorted.
    pub branches: Vec<String>,
    /// File names staged for addition, sorted.
    pub staged: Vec<String>,
    /// File names staged for removal, sorted.
    pub removed: Vec<String>,
}

/// Handle to one repository: the working directory plus the stores under
/// its marker directory.
pub struct Repository {
    work_dir: PathBuf,
    objects: ObjectStore,
    refs: RefStore,
    stage: Stage,
}

impl Repository {
    /// Create a new repository in `work_dir`: marker directory tree, the
    /// root commit, and a `master` branch HEAD points at.
    pub fn init(work_dir: &Path) -> Result<Self> {
        let root = work_dir.join(REPO_DIR);
        if root.exists() {
            return Err(Error::AlreadyInitialized);
        }
        let repo = Self::at(work_dir);
        repo.objects.create_dirs()?;
        repo.refs.create_dirs()?;
        repo.stage.create_dirs()?;
        fs::create_dir_all(root.join("objects").join("remotes"))?;

        let root_digest = repo.objects.put_commit(&Commit::root())?;
        repo.refs
            .save_branch(&Branch::new(DEFAULT_BRANCH, root_digest))?;
        repo.refs.set_head(DEFAULT_BRANCH)?;
        info!(root = %root_digest, "initialized repository");
        Ok(repo)
    }

    /// Open an existing repository in `work_dir`.
    pub fn open(work_dir: &Path) -> Result<Self> {
        if !work_dir.join(REPO_DIR).is_dir() {
            return Err(Error::NotInitialized);
        }
        Ok(Self::at(work_dir))
    }

    fn at(work_dir: &Path) -> Self {
        let root = work_dir.join(REPO_DIR);
        Self {
            work_dir: work_dir.to_path_buf(),
            objects: ObjectStore::new(&root),
            refs: RefStore::new(&root),
            stage: Stage::new(&root),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Root of the marker directory (what remote descriptors point at).
    pub fn root(&self) -> PathBuf {
        self.work_dir.join(REPO_DIR)
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn refs(&self) -> &RefStore {
        &self.refs
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// The current branch's head commit, with its digest.
    pub fn head_commit(&self) -> Result<(Digest, Commit)> {
        let branch = self.refs.branch(&self.refs.head_branch_name()?)?;
        Ok((branch.commit, self.objects.commit(branch.commit)?))
    }

    // ==================== Staging ====================

    /// Stage a working-directory file for addition.
    pub fn add(&self, file_name: &str) -> Result<()> {
        let path = self.work_dir.join(file_name);
        if !path.is_file() {
            return Err(Error::FileNotFound(file_name.to_string()));
        }
        let blob = Blob::new(file_name, fs::read(&path)?);
        let (_, head) = self.head_commit()?;
        self.stage.stage_for_addition(&self.objects, &head, blob)
    }

    /// Stage a file for removal and delete its working copy if tracked.
    pub fn rm(&self, file_name: &str) -> Result<()> {
        let (_, head) = self.head_commit()?;
        self.stage
            .stage_for_removal(&head, &self.work_dir, file_name)
    }

    // ==================== Commit ====================

    /// Turn the staged delta into a new commit on the current branch.
    pub fn commit(&self, message: &str) -> Result<Digest> {
        self.commit_with(message, None)
    }

    /// Commit with an optional second parent. This is the single path by
    /// which staged changes become durable; the merge engine reuses it.
    pub(crate) fn commit_with(
        &self,
        message: &str,
        other_parent: Option<Digest>,
    ) -> Result<Digest> {
        if self.stage.is_empty()? {
            return Err(Error::EmptyStagingArea);
        }
        if message.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }

        let (parent_digest, parent) = self.head_commit()?;
        let mut commit = Commit::new(
            message,
            chrono::Utc::now().timestamp(),
            Some(parent_digest),
            other_parent,
        );
        commit.tracked = parent.tracked;
        for addition in self.stage.additions()? {
            commit.tracked.insert(addition.name, addition.blob);
        }
        for name in self.stage.removals()? {
            commit.tracked.remove(&name);
        }

        let digest = self.objects.put_commit(&commit)?;
        let branch_name = self.refs.head_branch_name()?;
        self.refs.save_branch(&Branch::new(&branch_name, digest))?;
        self.stage.clear()?;
        info!(commit = %digest, branch = %branch_name, "created commit");
        Ok(digest)
    }

    // ==================== History ====================

    /// Commits from HEAD back to the root, following first-parent links.
    pub fn log(&self) -> Result<Vec<(Digest, Commit)>> {
        let (mut digest, mut commit) = self.head_commit()?;
        let mut entries = Vec::new();
        loop {
            let parent = commit.parent;
            entries.push((digest, commit));
            match parent {
                Some(p) => {
                    digest = p;
                    commit = self.objects.commit(p)?;
                }
                None => return Ok(entries),
            }
        }
    }

    /// Every commit in the object store, in digest order.
    pub fn global_log(&self) -> Result<Vec<(Digest, Commit)>> {
        self.objects
            .commit_digests()?
            .into_iter()
            .map(|d| Ok((d, self.objects.commit(d)?)))
            .collect()
    }

    /// Digests of all commits whose message matches exactly.
    pub fn find(&self, message: &str) -> Result<Vec<Digest>> {
        let mut matches = Vec::new();
        for (digest, commit) in self.global_log()? {
            if commit.message == message {
                matches.push(digest);
            }
        }
        Ok(matches)
    }

    /// Branch and staging state for the `status` command.
    pub fn status(&self) -> Result<Status> {
        Ok(Status {
            current_branch: self.refs.head_branch_name()?,
            branches: self.refs.branch_names()?,
            staged: self
                .stage
                .additions()?
                .into_iter()
                .map(|a| a.name)
                .collect(),
            removed: self.stage.removals()?,
        })
    }

    // ==================== Checkout / reset ====================

    /// Restore one file from the HEAD commit into the working directory.
    pub fn checkout_file(&self, file_name: &str) -> Result<()> {
        let (_, head) = self.head_commit()?;
        self.restore_file(&head, file_name)
    }

    /// Restore one file from the commit matching the given id or prefix.
    pub fn checkout_file_at(&self, commit_id: &str, file_name: &str) -> Result<()> {
        let digest = self.objects.resolve_prefix(commit_id)?;
        let commit = self.objects.commit(digest)?;
        self.restore_file(&commit, file_name)
    }

    /// Switch HEAD to another branch, replacing the working directory with
    /// the files its head commit tracks.
    pub fn checkout_branch(&self, branch_name: &str) -> Result<()> {
        let current = self.refs.head_branch_name()?;
        if branch_name == current {
            return Err(Error::AlreadyOnBranch(branch_name.to_string()));
        }
        let target = self.refs.branch(branch_name)?;
        let commit = self.objects.commit(target.commit)?;

        self.check_untracked(&commit)?;
        self.update_working_dir(&commit)?;
        self.stage.clear()?;
        self.refs.set_head(branch_name)?;
        Ok(())
    }

    /// Create a branch pointing at the current head. Does not switch HEAD.
    pub fn branch(&self, branch_name: &str) -> Result<()> {
        if self.refs.branch_exists(branch_name) {
            return Err(Error::BranchAlreadyExists(branch_name.to_string()));
        }
        let (head_digest, _) = self.head_commit()?;
        self.refs
            .save_branch(&Branch::new(branch_name, head_digest))
    }

    /// Delete a branch pointer (the commits stay).
    pub fn rm_branch(&self, branch_name: &str) -> Result<()> {
        if !self.refs.branch_exists(branch_name) {
            return Err(Error::BranchNotFound(branch_name.to_string()));
        }
        if branch_name == self.refs.head_branch_name()? {
            return Err(Error::CannotRemoveCurrentBranch);
        }
        self.refs.delete_branch(branch_name)
    }

    /// Move the current branch to the given commit and restore the working
    /// directory to its state.
    pub fn reset(&self, commit_id: &str) -> Result<()> {
        let digest = self.objects.resolve_prefix(commit_id)?;
        let commit = self.objects.commit(digest)?;

        self.check_untracked(&commit)?;
        self.update_working_dir(&commit)?;
        self.stage.clear()?;
        let branch_name = self.refs.head_branch_name()?;
        self.refs.save_branch(&Branch::new(&branch_name, digest))
    }

    // ==================== Merge ====================

    /// Merge the given branch into the current branch.
    pub fn merge(&self, branch_name: &str) -> Result<MergeOutcome> {
        MergeEngine::new(self).run(branch_name)
    }

    // ==================== Remotes ====================

    /// Record a remote repository under a name.
    pub fn add_remote(&self, name: &str, path: &Path) -> Result<()> {
        remote::add_remote(self, name, path)
    }

    /// Forget a remote. Shadow branches are left in place.
    pub fn rm_remote(&self, name: &str) -> Result<()> {
        remote::rm_remote(self, name)
    }

    /// Append the current branch's commits to a branch at the remote.
    pub fn push(&self, remote_name: &str, branch_name: &str) -> Result<()> {
        remote::push(self, remote_name, branch_name)
    }

    /// Copy commits and blobs from a remote branch into the local store.
    pub fn fetch(&self, remote_name: &str, branch_name: &str) -> Result<()> {
        remote::fetch(self, remote_name, branch_name)
    }

    /// Fetch, then merge the remote branch's shadow into the current
    /// branch.
    pub fn pull(&self, remote_name: &str, branch_name: &str) -> Result<MergeOutcome> {
        self.fetch(remote_name, branch_name)?;
        self.merge(&format!("{remote_name}/{branch_name}"))
    }

    // ==================== Working-directory helpers ====================

    /// Plain file names directly under the working directory, sorted. The
    /// marker directory is a directory and therefore never listed.
    pub(crate) fn working_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.work_dir)? {
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

    /// Write the version of `file_name` tracked by `commit` over the
    /// working copy.
    pub(crate) fn restore_file(&self, commit: &Commit, file_name: &str) -> Result<()> {
        let digest = commit
            .tracked
            .get(file_name)
            .ok_or_else(|| Error::FileNotInCommit(file_name.to_string()))?;
        let blob = self.objects.blob(*digest)?;
        fs::write(self.work_dir.join(file_name), &blob.data)?;
        Ok(())
    }

    /// Fail if any working file untracked by HEAD would be overwritten or
    /// discarded by switching to `target`. An untracked file whose
    /// contents already match `target`'s version is allowed.
    pub(crate) fn check_untracked(&self, target: &Commit) -> Result<()> {
        let (_, head) = self.head_commit()?;
        for name in self.working_files()? {
            if head.tracked.contains_key(&name) {
                continue;
            }
            let digest = Digest::from_data(&fs::read(self.work_dir.join(&name))?);
            if target.tracked.get(&name) != Some(&digest) {
                return Err(Error::UntrackedFileConflict(name));
            }
        }
        Ok(())
    }

    /// Replace the working directory with the files `target` tracks,
    /// removing files it does not. Callers must run the untracked check
    /// first.
    pub(crate) fn update_working_dir(&self, target: &Commit) -> Result<()> {
        for name in target.tracked.keys() {
            self.restore_file(target, name)?;
        }
        for name in self.working_files()? {
            if !target.tracked.contains_key(&name) {
                fs::remove_file(self.work_dir.join(&name))?;
            }
        }
        Ok(())
    }
}
