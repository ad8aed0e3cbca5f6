// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`RecordStore`] trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use threadlog_config::model::StorageConfig;
use threadlog_core::{
    Bug, CommitBatch, Discussion, DiscussionKey, RecordStore, ThreadlogError, Versioned,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed record store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened by [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store for the configured path without opening it.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create and initialize in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, ThreadlogError> {
        let store = Self::new(config);
        store.initialize().await?;
        Ok(store)
    }

    /// Wrap an already opened database.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, ThreadlogError> {
        self.db.get().ok_or_else(|| ThreadlogError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    pub async fn initialize(&self) -> Result<(), ThreadlogError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ThreadlogError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load_discussion(
        &self,
        key: &DiscussionKey,
    ) -> Result<Option<Versioned<Discussion>>, ThreadlogError> {
        queries::discussions::get_discussion(self.db()?, key).await
    }

    async fn load_bug(&self, key: &str) -> Result<Option<Versioned<Bug>>, ThreadlogError> {
        queries::bugs::get_bug(self.db()?, key).await
    }

    async fn commit(&self, batch: CommitBatch) -> Result<(), ThreadlogError> {
        queries::commit::commit(self.db()?, batch).await
    }

    async fn discussions_by_message_id(
        &self,
        source: &str,
        message_id: &str,
        limit: usize,
    ) -> Result<Vec<Discussion>, ThreadlogError> {
        queries::discussions::find_by_message_id(self.db()?, source, message_id, limit).await
    }

    async fn discussions_for_bug(&self, bug_key: &str) -> Result<Vec<Discussion>, ThreadlogError> {
        queries::discussions::find_by_bug(self.db()?, bug_key).await
    }

    async fn find_bug_by_reporting_id(
        &self,
        reporting_id: &str,
    ) -> Result<Option<Bug>, ThreadlogError> {
        queries::bugs::find_by_reporting_id(self.db()?, reporting_id).await
    }

    /// Checkpoint the WAL. The connection itself closes on drop.
    async fn close(&self) -> Result<(), ThreadlogError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
