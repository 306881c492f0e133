//! Error taxonomy for tinygit core operations.
//!
//! Every failure a command can hit is a typed variant here. Core code never
//! terminates the process; errors propagate by `Result` to the CLI boundary,
//! which renders the message and converts the failure into an exit code.
//! Display strings are the user-facing messages printed by the CLI.

use crate::object::Digest;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not in an initialized tinygit directory.")]
    NotInitialized,

    #[error("A tinygit version-control system already exists in the current directory.")]
    AlreadyInitialized,

    #[error("File does not exist.")]
    FileNotFound(String),

    #[error("No reason to remove the file.")]
    NothingToRemove(String),

    #[error("No changes added to the commit.")]
    EmptyStagingArea,

    #[error("Please enter a commit message.")]
    EmptyMessage,

    #[error("No commit with that id exists.")]
    CommitNotFound(String),

    #[error("File does not exist in that commit.")]
    FileNotInCommit(String),

    #[error("A branch with that name does not exist.")]
    BranchNotFound(String),

    #[error("A branch with that name already exists.")]
    BranchAlreadyExists(String),

    #[error("No need to checkout the current branch.")]
    AlreadyOnBranch(String),

    #[error("Cannot remove the current branch.")]
    CannotRemoveCurrentBranch,

    #[error("There is an untracked file in the way; delete it, or add and commit it first.")]
    UntrackedFileConflict(String),

    #[error("Given branch is an ancestor of the current branch.")]
    AlreadyUpToDate,

    #[error("Cannot merge a branch with itself.")]
    CannotMergeSelf,

    #[error("You have uncommitted changes.")]
    UncommittedChanges,

    #[error("Please pull down remote changes before pushing.")]
    DivergedHistory,

    #[error("Remote directory not found.")]
    RemoteNotFound(String),

    /// A digest is referenced by a commit or ref but absent from the object
    /// store. Indicates a corrupt or partially-copied repository.
    #[error("Object {0} is missing from the object store.")]
    ObjectMissing(Digest),

    /// Two branches share no first-parent ancestor. Cannot happen for
    /// repositories created by `init` (all share the root commit digest).
    #[error("No common ancestor exists between the two branches.")]
    NoCommonAncestor,

    #[error("Unsupported object format version: {0}")]
    UnsupportedFormat(u8),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Ref encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
