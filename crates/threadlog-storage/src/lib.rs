// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record stores for threadlog.
//!
//! [`SqliteStore`] persists discussions and bugs as versioned JSON rows in a
//! WAL-mode SQLite database with embedded migrations, serializing all access
//! through `tokio-rusqlite`'s single background thread. [`MemoryStore`] keeps
//! the same records in process memory.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;

use std::sync::Arc;

use threadlog_config::model::{StorageBackend, StorageConfig};
use threadlog_core::{RecordStore, ThreadlogError};

pub use adapter::SqliteStore;
pub use database::Database;
pub use memory::MemoryStore;

/// Open the backend selected by `config`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn RecordStore>, ThreadlogError> {
    let store: Arc<dyn RecordStore> = match config.backend {
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(config.clone()).await?),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    tracing::info!(backend = store.name(), "record store ready");
    Ok(store)
}
