// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merging message batches into discussions.
//!
//! A merge runs in two phases that are not atomic together:
//!
//! 1. One transaction loads (or creates) the discussion, unions in the bug
//!    keys, appends the new messages and stores the result together with the
//!    diff those messages contribute.
//! 2. The diff is propagated to every bug associated with the stored
//!    discussion, one independent single-record transaction per bug.
//!
//! Phase 2 failures do not undo phase 1. Redelivering the same messages
//! yields an empty diff and propagates nothing, so a failed bug is caught up
//! only by [`DiscussionMerger::retry_propagation`] with the diff carried in
//! [`ThreadlogError::PartialPropagation`].

use std::sync::Arc;

use async_trait::async_trait;
use threadlog_config::MergeConfig;
use threadlog_core::{
    BugLookup, Discussion, DiscussionType, DiscussionUpdate, PropagationFailure, RecordStore,
    Summary, ThreadlogError, Transaction, TransactionBody, run_in_transaction,
};
use tracing::{debug, info, warn};

use crate::propagate::propagate_summary;

/// What a successful merge did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The discussion as stored after the merge.
    pub discussion: Discussion,
    /// Contribution of the messages accepted by this merge.
    pub diff: Summary,
    /// True if this merge created the discussion.
    pub created: bool,
    /// Bugs whose summaries received `diff`.
    pub updated_bugs: Vec<String>,
}

struct DiscussionWrite {
    discussion: Discussion,
    diff: Summary,
    created: bool,
    written: bool,
}

/// Phase 1: the discussion-scope transaction body.
struct MergeIntoDiscussion<'a> {
    update: &'a DiscussionUpdate,
    bug_keys: &'a [String],
}

#[async_trait]
impl<'a> TransactionBody for MergeIntoDiscussion<'a> {
    type Output = DiscussionWrite;

    fn target(&self) -> String {
        format!("discussion/{}", self.update.key())
    }

    async fn apply(&mut self, tx: &mut Transaction<'_>) -> Result<DiscussionWrite, ThreadlogError> {
        let key = self.update.key();
        // Everything below is recomputed from the fresh read on each attempt.
        let (mut discussion, created) = match tx.get_discussion(&key).await? {
            Some(existing) => (existing, false),
            None => (
                Discussion::new(key, self.update.kind, self.update.subject.clone()),
                true,
            ),
        };

        let new_bugs = discussion.add_bug_keys(self.bug_keys);
        let mut diff = discussion.add_messages(&self.update.messages);
        if discussion.kind == DiscussionType::Patch {
            diff.promote_patch_activity();
        }
        discussion.summary.merge(&diff);

        let written = created || new_bugs > 0 || !diff.is_empty();
        if written {
            tx.put_discussion(discussion.clone())?;
        }
        debug!(
            discussion = %discussion.key(),
            accepted = diff.all_messages,
            new_bugs,
            created,
            "discussion merge attempt"
        );
        Ok(DiscussionWrite {
            discussion,
            diff,
            created,
            written,
        })
    }
}

/// Coordinates discussion merges over a shared store.
///
/// Holds no state of its own between calls, so one merger can serve
/// any number of concurrent merges.
pub struct DiscussionMerger {
    store: Arc<dyn RecordStore>,
    lookup: Arc<dyn BugLookup>,
    config: MergeConfig,
}

impl DiscussionMerger {
    pub fn new(
        store: Arc<dyn RecordStore>,
        lookup: Arc<dyn BugLookup>,
        config: MergeConfig,
    ) -> Self {
        Self {
            store,
            lookup,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Merges `update` into its discussion, then into each associated bug.
    ///
    /// Fails without writing anything on an empty batch, an unresolvable
    /// reporting id, or an exhausted discussion transaction. Once the
    /// discussion is stored, bugs that could not be updated are reported
    /// together in [`ThreadlogError::PartialPropagation`]; the others keep
    /// their update.
    pub async fn merge_discussion(
        &self,
        update: &DiscussionUpdate,
    ) -> Result<MergeOutcome, ThreadlogError> {
        if update.messages.is_empty() {
            return Err(ThreadlogError::NoMessages);
        }
        let bug_keys = self.resolve_bug_keys(&update.bug_ids).await?;

        let mut body = MergeIntoDiscussion {
            update,
            bug_keys: &bug_keys,
        };
        let write = run_in_transaction(
            self.store.as_ref(),
            self.config.discussion_options(),
            &mut body,
        )
        .await?;
        let discussion_key = write.discussion.key();

        if !write.written {
            debug!(discussion = %discussion_key, "no new messages or bugs, nothing written");
        }
        if write.diff.is_empty() {
            return Ok(MergeOutcome {
                discussion: write.discussion,
                diff: write.diff,
                created: write.created,
                updated_bugs: Vec::new(),
            });
        }

        // Bugs come from the stored record so that keys added by concurrent
        // merges receive this diff too.
        let updated_bugs = self
            .propagate_to(
                &discussion_key.to_string(),
                &write.discussion.source,
                &write.diff,
                &write.discussion.bug_keys,
            )
            .await?;

        info!(
            discussion = %discussion_key,
            accepted = write.diff.all_messages,
            created = write.created,
            bugs = updated_bugs.len(),
            "discussion merged"
        );
        Ok(MergeOutcome {
            discussion: write.discussion,
            diff: write.diff,
            created: write.created,
            updated_bugs,
        })
    }

    /// Re-runs propagation for the bugs listed in a
    /// [`ThreadlogError::PartialPropagation`], using the diff it carries.
    ///
    /// Returns the bugs updated this time. Bugs that fail again are reported
    /// in a new `PartialPropagation`. Any other error is handed back as an
    /// [`ThreadlogError::Internal`], since there is nothing to retry.
    pub async fn retry_propagation(
        &self,
        err: &ThreadlogError,
    ) -> Result<Vec<String>, ThreadlogError> {
        match err {
            ThreadlogError::PartialPropagation {
                discussion,
                source_name,
                diff,
                failures,
            } => {
                let bug_keys: Vec<String> = failures.iter().map(|f| f.bug_key.clone()).collect();
                let updated = self
                    .propagate_to(discussion, source_name, diff, &bug_keys)
                    .await?;
                info!(discussion = %discussion, bugs = updated.len(), "propagation retried");
                Ok(updated)
            }
            other => Err(ThreadlogError::Internal(format!(
                "no propagation to retry for: {other}"
            ))),
        }
    }

    /// Folds `diff` into each bug in its own transaction. Every bug is tried;
    /// failures are collected into one `PartialPropagation`.
    async fn propagate_to(
        &self,
        discussion: &str,
        source: &str,
        diff: &Summary,
        bug_keys: &[String],
    ) -> Result<Vec<String>, ThreadlogError> {
        let mut updated_bugs = Vec::with_capacity(bug_keys.len());
        let mut failures = Vec::new();
        for bug_key in bug_keys {
            match propagate_summary(
                self.store.as_ref(),
                self.config.bug_options(),
                bug_key,
                source,
                diff,
            )
            .await
            {
                Ok(_) => updated_bugs.push(bug_key.clone()),
                Err(err) => {
                    warn!(
                        discussion = %discussion,
                        bug = %bug_key,
                        error = %err,
                        "failed to update bug discussion summary"
                    );
                    failures.push(PropagationFailure {
                        bug_key: bug_key.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(ThreadlogError::PartialPropagation {
                discussion: discussion.to_string(),
                source_name: source.to_string(),
                diff: *diff,
                failures,
            });
        }
        Ok(updated_bugs)
    }

    /// Resolves every reporting id, stopping at the first failure.
    async fn resolve_bug_keys(&self, bug_ids: &[String]) -> Result<Vec<String>, ThreadlogError> {
        let mut keys = Vec::with_capacity(bug_ids.len());
        for id in bug_ids {
            keys.push(self.lookup.resolve(id).await?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadlog_core::{DiscussionKey, RecordKey};
    use threadlog_test_utils::fixtures::{msg, update};
    use threadlog_test_utils::{StaticBugLookup, TestHarness};
    use tracing_test::traced_test;

    fn fast_config() -> MergeConfig {
        MergeConfig {
            retry_backoff_ms: 0,
            ..MergeConfig::default()
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn partial_propagation_is_logged_per_bug() {
        let harness = TestHarness::builder()
            .with_bug("k1", &["r1"])
            .with_bug("k2", &["r2"])
            .build()
            .await
            .unwrap();
        harness.store.break_record(RecordKey::Bug("k2".into())).await;
        let lookup = Arc::new(StaticBugLookup::new().with("r1", "k1").with("r2", "k2"));
        let merger = DiscussionMerger::new(harness.record_store(), lookup, fast_config());

        let err = merger
            .merge_discussion(&update(
                "<t@x>",
                DiscussionType::Report,
                &["r1", "r2"],
                vec![msg("<t@x>", 0, true)],
            ))
            .await
            .unwrap_err();

        assert_eq!(err.failed_bugs(), vec!["k2"]);
        assert!(logs_contain("failed to update bug discussion summary"));
        assert!(logs_contain("k2"));
    }

    #[tokio::test]
    async fn discussion_retries_recompute_from_fresh_state() {
        let harness = TestHarness::builder()
            .with_bug("k1", &["r1"])
            .build()
            .await
            .unwrap();
        let lookup = Arc::new(StaticBugLookup::new().with("r1", "k1"));
        let merger = DiscussionMerger::new(harness.record_store(), lookup, fast_config());

        // A concurrent writer stores the same message first.
        let mut theirs = Discussion::new(
            DiscussionKey::new("lore", "<t@x>"),
            DiscussionType::Report,
            "theirs",
        );
        theirs.add_messages(&[msg("<t@x>", 0, true)]);
        theirs.summary.all_messages = 1;
        harness
            .store
            .interfere_once(threadlog_core::Record::Discussion(theirs))
            .await;

        let outcome = merger
            .merge_discussion(&update(
                "<t@x>",
                DiscussionType::Report,
                &["r1"],
                vec![msg("<t@x>", 0, true)],
            ))
            .await
            .unwrap();

        assert!(!outcome.created);
        assert!(outcome.diff.is_empty());
        assert_eq!(outcome.discussion.summary.all_messages, 1);
        assert_eq!(outcome.discussion.subject, "theirs");
        // The bug key was still added, but an empty diff is not propagated.
        assert_eq!(outcome.discussion.bug_keys, vec!["k1".to_string()]);
        assert!(outcome.updated_bugs.is_empty());
    }
}
