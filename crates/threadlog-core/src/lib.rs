// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for threadlog.
//!
//! This crate provides the record types, the summary algebra, the bounded
//! message history, the error type, and the collaborator traits used
//! throughout the workspace. It performs no I/O of its own; storage backends
//! implement [`RecordStore`] and lookup services implement [`BugLookup`].

pub mod error;
pub mod history;
pub mod summary;
pub mod traits;
pub mod transaction;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{PropagationFailure, ThreadlogError};
pub use history::MAX_MESSAGES_IN_DISCUSSION;
pub use summary::Summary;
pub use traits::{BugLookup, CommitBatch, Record, RecordKey, RecordStore, Versioned};
pub use transaction::{Transaction, TransactionBody, TransactionOptions, run_in_transaction};
pub use types::{
    Bug, BugDiscussionInfo, Discussion, DiscussionKey, DiscussionMessage, DiscussionType,
    DiscussionUpdate, LORE_SOURCE, NewDiscussionMessage,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keys_render_with_kind_prefix() {
        let d = RecordKey::Discussion(DiscussionKey::new("lore", "<a@b>"));
        let b = RecordKey::Bug("abc123".into());
        assert_eq!(d.to_string(), "discussion/lore/<a@b>");
        assert_eq!(b.to_string(), "bug/abc123");
    }

    #[test]
    fn record_key_matches_record() {
        let bug = Bug::new("k1", "title");
        assert_eq!(Record::Bug(bug).key(), RecordKey::Bug("k1".into()));

        let disc = Discussion::new(DiscussionKey::new("lore", "x"), DiscussionType::Patch, "");
        assert_eq!(
            Record::Discussion(disc).key(),
            RecordKey::Discussion(DiscussionKey::new("lore", "x"))
        );
    }

    #[test]
    fn all_trait_objects_are_usable() {
        // Compiles only if both collaborator traits stay object-safe.
        fn _assert_store(_: &dyn RecordStore) {}
        fn _assert_lookup(_: &dyn BugLookup) {}
    }
}
