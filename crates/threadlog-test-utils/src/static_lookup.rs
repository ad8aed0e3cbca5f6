// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bug lookup with a fixed table, for tests that do not need a store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use threadlog_core::{BugLookup, ThreadlogError};

/// Resolves reporting ids from an in-memory table and counts calls.
#[derive(Default)]
pub struct StaticBugLookup {
    table: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StaticBugLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `reporting_id` to `bug_key`.
    pub fn with(mut self, reporting_id: &str, bug_key: &str) -> Self {
        self.table
            .insert(reporting_id.to_string(), bug_key.to_string());
        self
    }

    /// Number of resolve calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BugLookup for StaticBugLookup {
    async fn resolve(&self, reporting_id: &str) -> Result<String, ThreadlogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(reporting_id)
            .cloned()
            .ok_or_else(|| ThreadlogError::BugNotFound {
                reporting_id: reporting_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_known_and_rejects_unknown() {
        let lookup = StaticBugLookup::new().with("rep", "key");
        assert_eq!(lookup.resolve("rep").await.unwrap(), "key");
        let err = lookup.resolve("other").await.unwrap_err();
        assert!(matches!(err, ThreadlogError::BugNotFound { .. }));
        assert_eq!(lookup.calls(), 2);
    }
}
