// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folding a discussion diff into one bug's per-source summary.

use async_trait::async_trait;
use threadlog_core::{
    RecordStore, Summary, ThreadlogError, Transaction, TransactionBody, TransactionOptions,
    run_in_transaction,
};

/// Merges `diff` into the `source` entry of one bug. Touches only that bug.
struct BugSummaryMerge<'a> {
    bug_key: &'a str,
    source: &'a str,
    diff: Summary,
}

#[async_trait]
impl<'a> TransactionBody for BugSummaryMerge<'a> {
    type Output = Summary;

    fn target(&self) -> String {
        format!("bug/{}", self.bug_key)
    }

    async fn apply(&mut self, tx: &mut Transaction<'_>) -> Result<Summary, ThreadlogError> {
        let mut bug = tx
            .get_bug(self.bug_key)
            .await?
            .ok_or_else(|| ThreadlogError::MissingBug {
                key: self.bug_key.to_string(),
            })?;
        bug.merge_discussion_summary(self.source, &self.diff);
        let merged = bug.source_summary(self.source).copied().unwrap_or_default();
        tx.put_bug(bug)?;
        Ok(merged)
    }
}

/// Adds `diff` to bug `bug_key`'s summary for `source` in its own
/// transaction, creating the entry on first use. Returns the new per-source
/// summary.
pub async fn propagate_summary(
    store: &dyn RecordStore,
    options: TransactionOptions,
    bug_key: &str,
    source: &str,
    diff: &Summary,
) -> Result<Summary, ThreadlogError> {
    let mut body = BugSummaryMerge {
        bug_key,
        source,
        diff: *diff,
    };
    run_in_transaction(store, options, &mut body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use threadlog_core::{Bug, CommitBatch, Record};
    use threadlog_storage::MemoryStore;

    fn diff(all: u64, external: u64, secs: i64) -> Summary {
        Summary {
            all_messages: all,
            external_messages: external,
            last_message: Some(Utc.timestamp_opt(secs, 0).unwrap()),
            last_patch_message: None,
        }
    }

    async fn store_with_bug(key: &str) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .commit(CommitBatch::blind_write(Record::Bug(Bug::new(key, "t"))))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn creates_entry_then_accumulates() {
        let store = store_with_bug("k").await;
        let opts = TransactionOptions::single_group(3);

        let first = propagate_summary(&store, opts, "k", "lore", &diff(2, 1, 100))
            .await
            .unwrap();
        assert_eq!(first.all_messages, 2);

        let second = propagate_summary(&store, opts, "k", "lore", &diff(1, 1, 50))
            .await
            .unwrap();
        assert_eq!(second.all_messages, 3);
        assert_eq!(second.external_messages, 2);
        assert_eq!(second.last_message, Some(Utc.timestamp_opt(100, 0).unwrap()));

        let bug = store.load_bug("k").await.unwrap().unwrap().value;
        assert_eq!(bug.discussion_info.len(), 1);
    }

    #[tokio::test]
    async fn sources_are_kept_apart() {
        let store = store_with_bug("k").await;
        let opts = TransactionOptions::single_group(3);
        propagate_summary(&store, opts, "k", "lore", &diff(2, 0, 10))
            .await
            .unwrap();
        propagate_summary(&store, opts, "k", "gerrit", &diff(5, 5, 20))
            .await
            .unwrap();

        let bug = store.load_bug("k").await.unwrap().unwrap().value;
        let sources: Vec<&str> = bug.discussion_info.iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, vec!["lore", "gerrit"]);
        assert_eq!(bug.discussion_summary().all_messages, 7);
    }

    #[tokio::test]
    async fn missing_bug_is_not_created() {
        let store = MemoryStore::new();
        let err = propagate_summary(
            &store,
            TransactionOptions::single_group(3),
            "ghost",
            "lore",
            &diff(1, 0, 1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ThreadlogError::MissingBug { ref key } if key == "ghost"));
        assert!(store.load_bug("ghost").await.unwrap().is_none());
    }
}
