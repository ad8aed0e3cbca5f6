// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fault-injecting [`RecordStore`] wrapper.
//!
//! `FlakyStore` forwards everything to an inner store but can fail commits
//! that write a chosen record, either a fixed number of times with
//! [`ThreadlogError::Conflict`] or permanently with a storage error. It can
//! also apply a competing write just before a commit, which produces a real
//! version conflict in the inner store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use threadlog_core::{
    Bug, CommitBatch, Discussion, DiscussionKey, Record, RecordKey, RecordStore, ThreadlogError,
    Versioned,
};
use tokio::sync::Mutex;
use tracing::debug;

enum Fault {
    Conflicts(u32),
    Broken,
}

pub struct FlakyStore {
    inner: Arc<dyn RecordStore>,
    faults: Mutex<HashMap<RecordKey, Fault>>,
    interference: Mutex<HashMap<RecordKey, Record>>,
    commits: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashMap::new()),
            interference: Mutex::new(HashMap::new()),
            commits: AtomicUsize::new(0),
        }
    }

    /// Reject the next `times` commits that write `key`.
    pub async fn conflict_on(&self, key: RecordKey, times: u32) {
        self.faults.lock().await.insert(key, Fault::Conflicts(times));
    }

    /// Fail every commit that writes `key`.
    pub async fn break_record(&self, key: RecordKey) {
        self.faults.lock().await.insert(key, Fault::Broken);
    }

    /// Before the next commit writing `record`'s key, store `record` as if a
    /// concurrent writer had got there first.
    pub async fn interfere_once(&self, record: Record) {
        self.interference.lock().await.insert(record.key(), record);
    }

    /// Commits attempted through this wrapper, including rejected ones.
    pub fn commit_attempts(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &Arc<dyn RecordStore> {
        &self.inner
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn load_discussion(
        &self,
        key: &DiscussionKey,
    ) -> Result<Option<Versioned<Discussion>>, ThreadlogError> {
        self.inner.load_discussion(key).await
    }

    async fn load_bug(&self, key: &str) -> Result<Option<Versioned<Bug>>, ThreadlogError> {
        self.inner.load_bug(key).await
    }

    async fn commit(&self, batch: CommitBatch) -> Result<(), ThreadlogError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        let touched: Vec<RecordKey> = batch.writes.iter().map(Record::key).collect();

        let competing: Vec<Record> = {
            let mut pending = self.interference.lock().await;
            touched.iter().filter_map(|k| pending.remove(k)).collect()
        };
        for record in competing {
            debug!(record = %record.key(), "injecting competing write");
            self.inner.commit(CommitBatch::blind_write(record)).await?;
        }

        {
            let mut faults = self.faults.lock().await;
            for key in &touched {
                match faults.get_mut(key) {
                    Some(Fault::Broken) => {
                        return Err(ThreadlogError::storage(format!(
                            "injected failure writing {key}"
                        )));
                    }
                    Some(Fault::Conflicts(left)) if *left > 0 => {
                        *left -= 1;
                        return Err(ThreadlogError::Conflict {
                            key: key.to_string(),
                        });
                    }
                    _ => {}
                }
            }
        }

        self.inner.commit(batch).await
    }

    async fn discussions_by_message_id(
        &self,
        source: &str,
        message_id: &str,
        limit: usize,
    ) -> Result<Vec<Discussion>, ThreadlogError> {
        self.inner
            .discussions_by_message_id(source, message_id, limit)
            .await
    }

    async fn discussions_for_bug(&self, bug_key: &str) -> Result<Vec<Discussion>, ThreadlogError> {
        self.inner.discussions_for_bug(bug_key).await
    }

    async fn find_bug_by_reporting_id(
        &self,
        reporting_id: &str,
    ) -> Result<Option<Bug>, ThreadlogError> {
        self.inner.find_bug_by_reporting_id(reporting_id).await
    }

    async fn close(&self) -> Result<(), ThreadlogError> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadlog_storage::MemoryStore;

    fn bug_write(key: &str, title: &str) -> CommitBatch {
        CommitBatch::blind_write(Record::Bug(Bug::new(key, title)))
    }

    #[tokio::test]
    async fn conflicts_run_out() {
        let store = FlakyStore::new(Arc::new(MemoryStore::new()));
        store.conflict_on(RecordKey::Bug("a".into()), 2).await;

        assert!(store.commit(bug_write("a", "")).await.unwrap_err().is_retryable());
        assert!(store.commit(bug_write("a", "")).await.is_err());
        store.commit(bug_write("a", "")).await.unwrap();
        store.commit(bug_write("b", "")).await.unwrap();
        assert_eq!(store.commit_attempts(), 4);
    }

    #[tokio::test]
    async fn broken_record_never_commits() {
        let store = FlakyStore::new(Arc::new(MemoryStore::new()));
        store.break_record(RecordKey::Bug("a".into())).await;
        for _ in 0..3 {
            let err = store.commit(bug_write("a", "")).await.unwrap_err();
            assert!(!err.is_retryable());
        }
        assert!(store.load_bug("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn interference_lands_before_commit() {
        let store = FlakyStore::new(Arc::new(MemoryStore::new()));
        store.interfere_once(Record::Bug(Bug::new("a", "theirs"))).await;

        let batch = CommitBatch {
            reads: vec![(RecordKey::Bug("a".into()), 0)],
            writes: vec![Record::Bug(Bug::new("a", "ours"))],
        };
        assert!(store.commit(batch).await.unwrap_err().is_retryable());
        assert_eq!(store.load_bug("a").await.unwrap().unwrap().value.title, "theirs");
    }
}
