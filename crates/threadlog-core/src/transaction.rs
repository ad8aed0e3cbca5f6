// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Optimistic transactions over a [`RecordStore`] with bounded retry.
//!
//! A [`Transaction`] records the version of every record it reads and buffers
//! every write. Commit hands both to the store, which rejects the batch if any
//! read record changed meanwhile. [`run_in_transaction`] re-runs the body from
//! scratch on such conflicts, so bodies must derive everything from what they
//! read inside the transaction.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ThreadlogError;
use crate::traits::store::{CommitBatch, Record, RecordKey, RecordStore};
use crate::types::{Bug, Discussion, DiscussionKey};

/// Retry ceiling used when nothing else is configured.
pub const DEFAULT_ATTEMPTS: u32 = 15;

/// Most record groups a cross-group transaction may touch.
pub const DEFAULT_MAX_CROSS_GROUP: usize = 25;

/// How a transaction is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    /// Allow touching more than one record group.
    pub cross_group: bool,
    /// Group ceiling when `cross_group` is set.
    pub max_cross_group: usize,
    /// Sleep before retry `n` is `backoff * n`.
    pub backoff: Duration,
}

impl TransactionOptions {
    /// A transaction confined to one record.
    pub fn single_group(attempts: u32) -> Self {
        Self {
            attempts,
            cross_group: false,
            max_cross_group: DEFAULT_MAX_CROSS_GROUP,
            backoff: Duration::ZERO,
        }
    }

    /// A transaction that may span up to `max_cross_group` records.
    pub fn cross_group(attempts: u32) -> Self {
        Self {
            cross_group: true,
            ..Self::single_group(attempts)
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_cross_group(mut self, max: usize) -> Self {
        self.max_cross_group = max;
        self
    }

    /// Number of record groups this transaction may touch.
    pub fn group_limit(&self) -> usize {
        if self.cross_group {
            self.max_cross_group
        } else {
            1
        }
    }
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self::single_group(DEFAULT_ATTEMPTS)
    }
}

/// One attempt at a transaction.
pub struct Transaction<'s> {
    store: &'s dyn RecordStore,
    options: TransactionOptions,
    reads: BTreeMap<RecordKey, u64>,
    writes: BTreeMap<RecordKey, Record>,
}

impl<'s> Transaction<'s> {
    pub fn new(store: &'s dyn RecordStore, options: TransactionOptions) -> Self {
        Self {
            store,
            options,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    /// Reads a discussion, seeing this transaction's own pending write if any.
    pub async fn get_discussion(
        &mut self,
        key: &DiscussionKey,
    ) -> Result<Option<Discussion>, ThreadlogError> {
        let record_key = RecordKey::Discussion(key.clone());
        if let Some(Record::Discussion(pending)) = self.writes.get(&record_key) {
            return Ok(Some(pending.clone()));
        }
        let loaded = self.store.load_discussion(key).await?;
        let version = loaded.as_ref().map_or(0, |v| v.version);
        self.note_read(record_key, version)?;
        Ok(loaded.map(|v| v.value))
    }

    /// Reads a bug, seeing this transaction's own pending write if any.
    pub async fn get_bug(&mut self, key: &str) -> Result<Option<Bug>, ThreadlogError> {
        let record_key = RecordKey::Bug(key.to_string());
        if let Some(Record::Bug(pending)) = self.writes.get(&record_key) {
            return Ok(Some(pending.clone()));
        }
        let loaded = self.store.load_bug(key).await?;
        let version = loaded.as_ref().map_or(0, |v| v.version);
        self.note_read(record_key, version)?;
        Ok(loaded.map(|v| v.value))
    }

    pub fn put_discussion(&mut self, discussion: Discussion) -> Result<(), ThreadlogError> {
        self.put(Record::Discussion(discussion))
    }

    pub fn put_bug(&mut self, bug: Bug) -> Result<(), ThreadlogError> {
        self.put(Record::Bug(bug))
    }

    /// Distinct record groups read or written so far.
    pub fn groups(&self) -> usize {
        self.reads.len()
            + self
                .writes
                .keys()
                .filter(|k| !self.reads.contains_key(*k))
                .count()
    }

    /// Hands reads and writes to the store. Read-only transactions are
    /// validated locally and never reach the store.
    pub async fn commit(self) -> Result<(), ThreadlogError> {
        self.check_groups()?;
        if self.writes.is_empty() {
            return Ok(());
        }
        debug!(
            store = self.store.name(),
            reads = self.reads.len(),
            writes = self.writes.len(),
            "committing transaction"
        );
        let batch = CommitBatch {
            reads: self.reads.into_iter().collect(),
            writes: self.writes.into_values().collect(),
        };
        self.store.commit(batch).await
    }

    fn put(&mut self, record: Record) -> Result<(), ThreadlogError> {
        self.writes.insert(record.key(), record);
        self.check_groups()
    }

    fn note_read(&mut self, key: RecordKey, version: u64) -> Result<(), ThreadlogError> {
        // Keep the first observed version; a later re-read must not mask a conflict.
        self.reads.entry(key).or_insert(version);
        self.check_groups()
    }

    fn check_groups(&self) -> Result<(), ThreadlogError> {
        let groups = self.groups();
        let limit = self.options.group_limit();
        if groups > limit {
            return Err(ThreadlogError::TooManyGroups { groups, limit });
        }
        Ok(())
    }
}

/// The work done inside one transaction, re-run on every attempt.
#[async_trait]
pub trait TransactionBody: Send {
    type Output: Send;

    /// Names the records this body targets, for logs and errors.
    fn target(&self) -> String;

    async fn apply(&mut self, tx: &mut Transaction<'_>) -> Result<Self::Output, ThreadlogError>;
}

/// Runs `body` until it commits, fails with a non-retryable error, or uses up
/// `options.attempts`.
pub async fn run_in_transaction<B>(
    store: &dyn RecordStore,
    options: TransactionOptions,
    body: &mut B,
) -> Result<B::Output, ThreadlogError>
where
    B: TransactionBody + ?Sized,
{
    let attempts = options.attempts.max(1);
    for attempt in 1..=attempts {
        let mut tx = Transaction::new(store, options);
        let result = match body.apply(&mut tx).await {
            Ok(output) => tx.commit().await.map(|()| output),
            Err(err) => Err(err),
        };
        match result {
            Ok(output) => {
                if attempt > 1 {
                    debug!(record = %body.target(), attempt, "transaction committed after retry");
                }
                return Ok(output);
            }
            Err(err) if err.is_retryable() => {
                warn!(record = %body.target(), attempt, attempts, error = %err, "transaction conflict, will retry");
                if attempt < attempts && !options.backoff.is_zero() {
                    tokio::time::sleep(options.backoff * attempt).await;
                }
            }
            Err(err) => return Err(err),
        }
    }
    Err(ThreadlogError::TransactionExhausted {
        key: body.target(),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_group_allows_one_record() {
        let opts = TransactionOptions::single_group(3);
        assert_eq!(opts.group_limit(), 1);
        assert_eq!(opts.attempts, 3);
        assert!(opts.backoff.is_zero());
    }

    #[test]
    fn cross_group_uses_configured_ceiling() {
        let opts = TransactionOptions::cross_group(15);
        assert_eq!(opts.group_limit(), DEFAULT_MAX_CROSS_GROUP);
        assert_eq!(opts.with_max_cross_group(5).group_limit(), 5);
    }

    #[test]
    fn default_options_match_datastore_defaults() {
        let opts = TransactionOptions::default();
        assert_eq!(opts.attempts, DEFAULT_ATTEMPTS);
        assert!(!opts.cross_group);
    }
}
