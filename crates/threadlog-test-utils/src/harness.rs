// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness with a seeded store.
//!
//! `TestHarness` owns a record store (in memory or a temp SQLite file)
//! wrapped in a [`FlakyStore`], pre-loaded with bugs.

use std::sync::Arc;

use tempfile::TempDir;
use threadlog_config::model::{StorageBackend, StorageConfig};
use threadlog_core::{Bug, CommitBatch, Record, RecordStore, ThreadlogError};
use threadlog_storage::{MemoryStore, SqliteStore};

use crate::flaky_store::FlakyStore;

/// Builder for creating test environments.
pub struct TestHarnessBuilder {
    sqlite: bool,
    bugs: Vec<Bug>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            sqlite: false,
            bugs: Vec::new(),
        }
    }

    /// Back the harness with a SQLite file in a temp directory.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Seed a bug stored under `key` and reported as each of `reporting_ids`.
    pub fn with_bug(mut self, key: &str, reporting_ids: &[&str]) -> Self {
        let mut bug = Bug::new(key, format!("bug {key}"));
        bug.reporting_ids = reporting_ids.iter().map(|r| r.to_string()).collect();
        self.bugs.push(bug);
        self
    }

    pub async fn build(self) -> Result<TestHarness, ThreadlogError> {
        let temp_dir = TempDir::new().map_err(ThreadlogError::storage)?;
        let inner: Arc<dyn RecordStore> = if self.sqlite {
            let config = StorageConfig {
                backend: StorageBackend::Sqlite,
                database_path: temp_dir
                    .path()
                    .join("test.db")
                    .to_string_lossy()
                    .into_owned(),
                wal_mode: true,
            };
            Arc::new(SqliteStore::open(config).await?)
        } else {
            Arc::new(MemoryStore::new())
        };

        for bug in self.bugs {
            inner.commit(CommitBatch::blind_write(Record::Bug(bug))).await?;
        }

        Ok(TestHarness {
            store: Arc::new(FlakyStore::new(inner)),
            _temp_dir: temp_dir,
        })
    }
}

/// A seeded store for one test. Dropping it removes any temp files.
pub struct TestHarness {
    pub store: Arc<FlakyStore>,
    _temp_dir: TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The store as the trait object pipeline code expects.
    pub fn record_store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    /// Current stored value of bug `key`.
    pub async fn bug(&self, key: &str) -> Option<Bug> {
        self.store
            .load_bug(key)
            .await
            .ok()
            .flatten()
            .map(|v| v.value)
    }
}
