//! Property tests for commit cleanup.

use graft_core::{BranchId, Commit, Statement};
use proptest::prelude::*;

fn statement(i: u8) -> Statement {
    Statement::new(&format!("s{i}"), "p", "o")
}

fn statements() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..12, 0..10)
}

proptest! {
    #[test]
    fn cleanup_is_idempotent(
        base_added in statements(),
        base_removed in statements(),
        more_added in statements(),
        more_removed in statements(),
    ) {
        let mut commit = Commit::new(
            BranchId::from("a"),
            None,
            "prop",
            base_added.iter().copied().map(statement),
            base_removed.iter().copied().map(statement),
        );
        let (add_offset, remove_offset) = (commit.addition_count(), commit.removal_count());
        commit.append_added(more_added.iter().copied().map(statement));
        commit.append_removed(more_removed.iter().copied().map(statement));

        commit.remove_effectless_statements(add_offset, remove_offset);
        let once = commit.clone();
        commit.remove_effectless_statements(add_offset, remove_offset);

        prop_assert_eq!(commit, once);
    }

    #[test]
    fn cleanup_leaves_no_overlap_beyond_prefix(
        base_added in statements(),
        more_added in statements(),
        more_removed in statements(),
    ) {
        // A prefix with no removals is clean by construction.
        let mut commit = Commit::new(
            BranchId::from("a"),
            None,
            "prop",
            base_added.iter().copied().map(statement),
            Vec::new(),
        );
        let add_offset = commit.addition_count();
        commit.append_added(more_added.iter().copied().map(statement));
        commit.append_removed(more_removed.iter().copied().map(statement));

        commit.remove_effectless_statements(add_offset, 0);

        for s in commit.added() {
            prop_assert!(!commit.removed().contains(s));
        }
    }
}
