//! Merge engine: three-way reconciliation between the current branch, a
//! target branch, and their lowest common ancestor.
//!
//! For every file named by any of the three commits' tracked mappings, the
//! engine classifies the (HEAD, other, LCA) digest triple and either keeps
//! a side, stages the other side's version, stages a removal, or writes
//! conflict markers. Conflicts are soft: the merge still commits, and the
//! outcome reports which files conflicted.

use std::collections::BTreeSet;
use std::fs;

use tracing::info;

use crate::error::{Error, Result};
use crate::graph;
use crate::object::{Blob, Commit, Digest};
use crate::refs::Branch;
use crate::repo::Repository;

/// Result of a completed merge.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The merge commit, or the target head when fast-forwarded.
    pub commit: Digest,
    /// True when the current branch pointer was simply advanced.
    pub fast_forwarded: bool,
    /// Files that received conflict markers, sorted.
    pub conflicts: Vec<String>,
}

pub(crate) struct MergeEngine<'r> {
    repo: &'r Repository,
}

impl<'r> MergeEngine<'r> {
    pub fn new(repo: &'r Repository) -> Self {
        Self { repo }
    }

    /// Merge `branch_name` into the current branch.
    pub fn run(&self, branch_name: &str) -> Result<MergeOutcome> {
        let repo = self.repo;
        let other_branch = repo.refs().branch(branch_name)?;
        let current_name = repo.refs().head_branch_name()?;
        if branch_name == current_name {
            return Err(Error::CannotMergeSelf);
        }
        if !repo.stage().is_empty()? {
            return Err(Error::UncommittedChanges);
        }

        let (head_digest, head) = repo.head_commit()?;
        let other_digest = other_branch.commit;
        let other = repo.objects().commit(other_digest)?;
        repo.check_untracked(&other)?;

        let lca_digest = graph::find_lca(repo.objects(), head_digest, other_digest)?;
        if lca_digest == other_digest {
            return Err(Error::AlreadyUpToDate);
        }
        if lca_digest == head_digest {
            return self.fast_forward(&current_name, other_digest, &other);
        }
        let lca = repo.objects().commit(lca_digest)?;

        let conflicts = self.reconcile(&head, &other, &lca)?;
        let message = format!("Merged {branch_name} into {current_name}.");
        let commit = repo.commit_with(&message, Some(other_digest))?;
        info!(
            commit = %commit,
            conflicts = conflicts.len(),
            "merged {branch_name} into {current_name}"
        );
        Ok(MergeOutcome {
            commit,
            fast_forwarded: false,
            conflicts,
        })
    }

    /// The LCA is the current head: advance the branch pointer to the
    /// other head without any classification.
    fn fast_forward(
        &self,
        current_name: &str,
        other_digest: Digest,
        other: &Commit,
    ) -> Result<MergeOutcome> {
        let repo = self.repo;
        repo.update_working_dir(other)?;
        repo.stage().clear()?;
        repo.refs()
            .save_branch(&Branch::new(current_name, other_digest))?;
        info!(commit = %other_digest, "fast-forwarded {current_name}");
        Ok(MergeOutcome {
            commit: other_digest,
            fast_forwarded: true,
            conflicts: Vec::new(),
        })
    }

    /// Classify every file named by any of the three commits and stage the
    /// reconciled result. Returns the conflicted file names.
    fn reconcile(&self, head: &Commit, other: &Commit, lca: &Commit) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        names.extend(head.tracked.keys());
        names.extend(other.tracked.keys());
        names.extend(lca.tracked.keys());

        let mut conflicts = Vec::new();
        for name in names {
            let h = head.tracked.get(name);
            let o = other.tracked.get(name);
            let l = lca.tracked.get(name);

            if l.is_some() && h.is_none() && o.is_none() {
                // Removed on both sides.
                continue;
            }
            if h.is_some() && o.is_none() && l.is_none() {
                // Added only on HEAD.
                continue;
            }
            if o == l && h.is_none() {
                // Removed on HEAD, untouched on the other side.
                continue;
            }
            if h == l && o.is_none() {
                // Untouched on HEAD, removed on the other side.
                self.repo
                    .stage()
                    .stage_for_removal(head, self.repo.work_dir(), name)?;
                continue;
            }
            if h == l && o != l {
                // Untouched (or absent) on HEAD, changed or added on the
                // other side: take the other version.
                self.take_other(head, other, name)?;
                continue;
            }
            if o == l && h != l {
                // Changed only on HEAD: keep the working copy as-is.
                continue;
            }
            if h == o {
                // Same change on both sides.
                continue;
            }
            self.write_conflict(head, name, h, o)?;
            conflicts.push(name.clone());
        }
        Ok(conflicts)
    }

    /// Write the other side's version into the working directory and stage
    /// it.
    fn take_other(&self, head: &Commit, other: &Commit, name: &str) -> Result<()> {
        self.repo.restore_file(other, name)?;
        let digest = other.tracked[name];
        let blob = self.repo.objects().blob(digest)?;
        self.repo
            .stage()
            .stage_for_addition(self.repo.objects(), head, Blob::new(name, blob.data))
    }

    /// Both sides changed the file in different ways: frame both versions
    /// with conflict markers, write the result to the working directory,
    /// and stage it.
    fn write_conflict(
        &self,
        head: &Commit,
        name: &str,
        h: Option<&Digest>,
        o: Option<&Digest>,
    ) -> Result<()> {
        let head_data = self.side_contents(h)?;
        let other_data = self.side_contents(o)?;

        let mut merged = Vec::new();
        merged.extend_from_slice(b"<<<<<<< HEAD\n");
        push_terminated(&mut merged, &head_data);
        merged.extend_from_slice(b"=======\n");
        push_terminated(&mut merged, &other_data);
        merged.extend_from_slice(b">>>>>>>\n");

        fs::write(self.repo.work_dir().join(name), &merged)?;
        self.repo
            .stage()
            .stage_for_addition(self.repo.objects(), head, Blob::new(name, merged))?;
        Ok(())
    }

    /// A side's contents, or empty when the side deleted the file.
    fn side_contents(&self, digest: Option<&Digest>) -> Result<Vec<u8>> {
        match digest {
            Some(d) => Ok(self.repo.objects().blob(*d)?.data),
            None => Ok(Vec::new()),
        }
    }
}

/// Append `data`, guaranteeing the following marker starts on its own line.
fn push_terminated(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(data);
    if !data.is_empty() && !data.ends_with(b"\n") {
        out.push(b'\n');
    }
}
