// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `threadlog register-bug` command implementation.

use async_trait::async_trait;
use threadlog_config::MergeConfig;
use threadlog_core::{
    Bug, RecordStore, ThreadlogError, Transaction, TransactionBody, run_in_transaction,
};
use tracing::info;

/// Sets title and reporting ids, keeping any accumulated summaries.
struct RegisterBug<'a> {
    key: &'a str,
    title: &'a str,
    reporting_ids: &'a [String],
}

#[async_trait]
impl<'a> TransactionBody for RegisterBug<'a> {
    type Output = bool;

    fn target(&self) -> String {
        format!("bug/{}", self.key)
    }

    async fn apply(&mut self, tx: &mut Transaction<'_>) -> Result<bool, ThreadlogError> {
        let existing = tx.get_bug(self.key).await?;
        let created = existing.is_none();
        let mut bug = existing.unwrap_or_else(|| Bug::new(self.key, ""));
        bug.title = self.title.to_string();
        bug.reporting_ids = self.reporting_ids.to_vec();
        tx.put_bug(bug)?;
        Ok(created)
    }
}

pub async fn register_bug(
    store: &dyn RecordStore,
    config: &MergeConfig,
    key: &str,
    title: &str,
    reporting_ids: &[String],
) -> Result<(), ThreadlogError> {
    if key.trim().is_empty() {
        return Err(ThreadlogError::Config("bug key must not be empty".to_string()));
    }
    let mut body = RegisterBug {
        key,
        title,
        reporting_ids,
    };
    let created = run_in_transaction(store, config.bug_options(), &mut body).await?;
    info!(bug = key, created, reporting_ids = reporting_ids.len(), "bug registered");
    Ok(())
}
