// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for threadlog.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use threadlog_core::TransactionOptions;
use threadlog_core::transaction::{DEFAULT_ATTEMPTS, DEFAULT_MAX_CROSS_GROUP};

/// Top-level threadlog configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ThreadlogConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Transaction retry settings for discussion merges.
    #[serde(default)]
    pub merge: MergeConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Which [`RecordStore`](threadlog_core::RecordStore) backs the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    /// Process-local, lost on exit.
    Memory,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("threadlog").join("threadlog.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("threadlog.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Retry and scope limits for the two merge phases.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    /// Attempts for the discussion-scope transaction.
    #[serde(default = "default_attempts")]
    pub discussion_attempts: u32,

    /// Attempts for each per-bug propagation transaction.
    #[serde(default = "default_attempts")]
    pub bug_attempts: u32,

    /// Base delay between attempts, multiplied by the attempt number.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Most records one cross-group transaction may touch.
    #[serde(default = "default_max_cross_group")]
    pub max_cross_group: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            discussion_attempts: default_attempts(),
            bug_attempts: default_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_cross_group: default_max_cross_group(),
        }
    }
}

impl MergeConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Options for the discussion transaction, which may span several groups.
    pub fn discussion_options(&self) -> TransactionOptions {
        TransactionOptions::cross_group(self.discussion_attempts)
            .with_max_cross_group(self.max_cross_group)
            .with_backoff(self.retry_backoff())
    }

    /// Options for one bug's propagation transaction.
    pub fn bug_options(&self) -> TransactionOptions {
        TransactionOptions::single_group(self.bug_attempts).with_backoff(self.retry_backoff())
    }
}

fn default_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}

fn default_retry_backoff_ms() -> u64 {
    10
}

fn default_max_cross_group() -> usize {
    DEFAULT_MAX_CROSS_GROUP
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
