//! Commit graph traversal and lowest-common-ancestor discovery.
//!
//! The graph is implicit: each commit carries up to two parent digests and
//! there is no separate adjacency structure. Both primitives here follow
//! first-parent links only — a merge commit's second-parent lineage is not
//! visited unless it is also reachable through first-parent edges. This is
//! a deliberate restriction of the merge algorithm, not an oversight.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::object::Digest;
use crate::store::ObjectStore;

/// All digests reachable from `start` via first-parent links, including
/// `start` itself.
pub fn ancestor_set(store: &ObjectStore, start: Digest) -> Result<HashSet<Digest>> {
    let mut seen = HashSet::new();
    let mut cursor = Some(start);
    while let Some(digest) = cursor {
        seen.insert(digest);
        cursor = store.commit(digest)?.parent;
    }
    Ok(seen)
}

/// Lowest common ancestor of `head` and `other` in first-parent history:
/// the first commit on `head`'s first-parent chain that is also a
/// first-parent ancestor of `other`.
pub fn find_lca(store: &ObjectStore, head: Digest, other: Digest) -> Result<Digest> {
    let other_ancestors = ancestor_set(store, other)?;
    let mut cursor = head;
    loop {
        if other_ancestors.contains(&cursor) {
            return Ok(cursor);
        }
        match store.commit(cursor)?.parent {
            Some(parent) => cursor = parent,
            None => return Err(Error::NoCommonAncestor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Commit;
    use tempfile::TempDir;

    fn store() -> (TempDir, ObjectStore) {
        let tmp = TempDir::new().unwrap();
        let store = ObjectStore::new(tmp.path());
        store.create_dirs().unwrap();
        (tmp, store)
    }

    fn child(store: &ObjectStore, message: &str, parent: Digest) -> Digest {
        store
            .put_commit(&Commit::new(message, 1, Some(parent), None))
            .unwrap()
    }

    #[test]
    fn ancestor_set_walks_to_root() {
        let (_tmp, store) = store();
        let root = store.put_commit(&Commit::root()).unwrap();
        let a = child(&store, "a", root);
        let b = child(&store, "b", a);

        let ancestors = ancestor_set(&store, b).unwrap();
        assert_eq!(ancestors.len(), 3);
        assert!(ancestors.contains(&root));
        assert!(ancestors.contains(&a));
        assert!(ancestors.contains(&b));
    }

    #[test]
    fn ancestor_set_ignores_second_parents() {
        let (_tmp, store) = store();
        let root = store.put_commit(&Commit::root()).unwrap();
        let side = child(&store, "side", root);
        let merge = store
            .put_commit(&Commit::new("merge", 2, Some(root), Some(side)))
            .unwrap();

        let ancestors = ancestor_set(&store, merge).unwrap();
        assert!(!ancestors.contains(&side));
    }

    #[test]
    fn lca_of_diverged_branches_is_the_fork_point() {
        let (_tmp, store) = store();
        let root = store.put_commit(&Commit::root()).unwrap();
        let fork = child(&store, "fork", root);
        let left = child(&store, "left", fork);
        let right = child(&store, "right", fork);

        assert_eq!(find_lca(&store, left, right).unwrap(), fork);
        assert_eq!(find_lca(&store, right, left).unwrap(), fork);
    }

    #[test]
    fn lca_diamond_resolves_to_root_of_the_diamond() {
        // root → a, root → b; merge of a and b has first parent a. Walking
        // the merge against b finds root, since b is not on the merge's
        // first-parent chain.
        let (_tmp, store) = store();
        let root = store.put_commit(&Commit::root()).unwrap();
        let a = child(&store, "a", root);
        let b = child(&store, "b", root);
        let merge = store
            .put_commit(&Commit::new("merge", 2, Some(a), Some(b)))
            .unwrap();

        assert_eq!(find_lca(&store, merge, b).unwrap(), root);
    }

    #[test]
    fn lca_degenerate_cases_return_a_head() {
        let (_tmp, store) = store();
        let root = store.put_commit(&Commit::root()).unwrap();
        let tip = child(&store, "tip", root);

        // Other is an ancestor of head.
        assert_eq!(find_lca(&store, tip, root).unwrap(), root);
        // Head is an ancestor of other.
        assert_eq!(find_lca(&store, root, tip).unwrap(), root);
    }
}
