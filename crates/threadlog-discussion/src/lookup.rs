// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bug lookup backed by the record store's reporting-id index.

use std::sync::Arc;

use async_trait::async_trait;
use threadlog_core::{BugLookup, RecordStore, ThreadlogError};

pub struct StoreBugLookup {
    store: Arc<dyn RecordStore>,
}

impl StoreBugLookup {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BugLookup for StoreBugLookup {
    async fn resolve(&self, reporting_id: &str) -> Result<String, ThreadlogError> {
        self.store
            .find_bug_by_reporting_id(reporting_id)
            .await?
            .map(|bug| bug.key)
            .ok_or_else(|| ThreadlogError::BugNotFound {
                reporting_id: reporting_id.to_string(),
            })
    }
}
