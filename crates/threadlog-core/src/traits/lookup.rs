// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of external reporting ids to bug storage keys.

use async_trait::async_trait;

use crate::error::ThreadlogError;

/// Maps the id a bug was reported under (as quoted in mail) to its storage key.
#[async_trait]
pub trait BugLookup: Send + Sync {
    /// Returns the storage key, or [`ThreadlogError::BugNotFound`].
    async fn resolve(&self, reporting_id: &str) -> Result<String, ThreadlogError>;
}
