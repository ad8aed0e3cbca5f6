// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record store trait for persistence backends (SQLite, in-memory).

use std::fmt;

use async_trait::async_trait;

use crate::error::ThreadlogError;
use crate::types::{Bug, Discussion, DiscussionKey};

/// Key of one stored record. Each record is its own transaction group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKey {
    Discussion(DiscussionKey),
    Bug(String),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Discussion(key) => write!(f, "discussion/{key}"),
            RecordKey::Bug(key) => write!(f, "bug/{key}"),
        }
    }
}

/// A record to be written by a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Discussion(Discussion),
    Bug(Bug),
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self {
            Record::Discussion(d) => RecordKey::Discussion(d.key()),
            Record::Bug(b) => RecordKey::Bug(b.key.clone()),
        }
    }
}

/// A stored value and the version it was read at. Versions start at 1;
/// 0 stands for "absent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// The effects of one transaction, applied atomically by [`RecordStore::commit`].
#[derive(Debug, Clone, Default)]
pub struct CommitBatch {
    /// Versions observed by the transaction; any mismatch rejects the batch.
    pub reads: Vec<(RecordKey, u64)>,
    /// Records to store, each bumping its key's version.
    pub writes: Vec<Record>,
}

impl CommitBatch {
    /// A batch that overwrites `record` regardless of its current version.
    pub fn blind_write(record: Record) -> Self {
        Self {
            reads: Vec::new(),
            writes: vec![record],
        }
    }
}

/// Durable store for discussions and bugs.
///
/// Implementations provide point reads, an atomic optimistic commit, and the
/// secondary indexes the resolver and reports need. They hold no locks across
/// calls; concurrent writers are arbitrated by [`RecordStore::commit`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    async fn load_discussion(
        &self,
        key: &DiscussionKey,
    ) -> Result<Option<Versioned<Discussion>>, ThreadlogError>;

    async fn load_bug(&self, key: &str) -> Result<Option<Versioned<Bug>>, ThreadlogError>;

    /// Applies `batch` if every read version still matches, otherwise fails
    /// with [`ThreadlogError::Conflict`] and writes nothing.
    async fn commit(&self, batch: CommitBatch) -> Result<(), ThreadlogError>;

    /// Discussions of `source` whose retained messages include `message_id`,
    /// at most `limit` of them.
    async fn discussions_by_message_id(
        &self,
        source: &str,
        message_id: &str,
        limit: usize,
    ) -> Result<Vec<Discussion>, ThreadlogError>;

    /// Discussions associated with the bug stored under `bug_key`.
    async fn discussions_for_bug(&self, bug_key: &str) -> Result<Vec<Discussion>, ThreadlogError>;

    /// The bug reported under `reporting_id`, if any.
    async fn find_bug_by_reporting_id(
        &self,
        reporting_id: &str,
    ) -> Result<Option<Bug>, ThreadlogError>;

    /// Flushes pending state before shutdown. The store stays usable.
    async fn close(&self) -> Result<(), ThreadlogError> {
        Ok(())
    }
}
