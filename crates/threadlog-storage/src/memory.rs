// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local [`RecordStore`] behind a single async lock.

use std::collections::HashMap;

use async_trait::async_trait;
use threadlog_core::{
    Bug, CommitBatch, Discussion, DiscussionKey, Record, RecordKey, RecordStore, ThreadlogError,
    Versioned,
};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Tables {
    discussions: HashMap<DiscussionKey, Versioned<Discussion>>,
    bugs: HashMap<String, Versioned<Bug>>,
}

impl Tables {
    fn version(&self, key: &RecordKey) -> u64 {
        match key {
            RecordKey::Discussion(k) => self.discussions.get(k).map_or(0, |v| v.version),
            RecordKey::Bug(k) => self.bugs.get(k).map_or(0, |v| v.version),
        }
    }

    fn put(&mut self, record: Record) {
        let version = self.version(&record.key()) + 1;
        match record {
            Record::Discussion(d) => {
                self.discussions
                    .insert(d.key(), Versioned { value: d, version });
            }
            Record::Bug(b) => {
                self.bugs
                    .insert(b.key.clone(), Versioned { value: b, version });
            }
        }
    }

    /// Discussions in key order, so queries are deterministic.
    fn sorted_discussions(&self) -> Vec<&Discussion> {
        let mut all: Vec<&Discussion> = self.discussions.values().map(|v| &v.value).collect();
        all.sort_by(|a, b| (&a.source, &a.id).cmp(&(&b.source, &b.id)));
        all
    }
}

/// In-memory record store. Contents are lost when it is dropped.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_discussion(
        &self,
        key: &DiscussionKey,
    ) -> Result<Option<Versioned<Discussion>>, ThreadlogError> {
        Ok(self.tables.read().await.discussions.get(key).cloned())
    }

    async fn load_bug(&self, key: &str) -> Result<Option<Versioned<Bug>>, ThreadlogError> {
        Ok(self.tables.read().await.bugs.get(key).cloned())
    }

    async fn commit(&self, batch: CommitBatch) -> Result<(), ThreadlogError> {
        let mut tables = self.tables.write().await;
        for (key, expected) in &batch.reads {
            if tables.version(key) != *expected {
                debug!(record = %key, "commit rejected: version moved");
                return Err(ThreadlogError::Conflict {
                    key: key.to_string(),
                });
            }
        }
        for record in batch.writes {
            tables.put(record);
        }
        Ok(())
    }

    async fn discussions_by_message_id(
        &self,
        source: &str,
        message_id: &str,
        limit: usize,
    ) -> Result<Vec<Discussion>, ThreadlogError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sorted_discussions()
            .into_iter()
            .filter(|d| d.source == source && d.messages.iter().any(|m| m.id == message_id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn discussions_for_bug(&self, bug_key: &str) -> Result<Vec<Discussion>, ThreadlogError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sorted_discussions()
            .into_iter()
            .filter(|d| d.bug_keys.iter().any(|k| k == bug_key))
            .cloned()
            .collect())
    }

    async fn find_bug_by_reporting_id(
        &self,
        reporting_id: &str,
    ) -> Result<Option<Bug>, ThreadlogError> {
        let tables = self.tables.read().await;
        let mut matches: Vec<&Bug> = tables
            .bugs
            .values()
            .map(|v| &v.value)
            .filter(|b| b.reporting_ids.iter().any(|r| r == reporting_id))
            .collect();
        matches.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(matches.first().map(|b| (*b).clone()))
    }
}
