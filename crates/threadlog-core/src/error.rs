// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for threadlog.

use thiserror::Error;

use crate::summary::Summary;

/// A single bug whose summary could not be updated during propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationFailure {
    /// Storage key of the bug.
    pub bug_key: String,
    /// Rendered cause of the failure.
    pub reason: String,
}

/// The primary error type used across all threadlog crates.
#[derive(Debug, Error)]
pub enum ThreadlogError {
    /// A merge was requested with an empty message batch.
    #[error("no messages")]
    NoMessages,

    /// An inbound message is missing a required field.
    #[error("invalid message: {message}")]
    InvalidMessage { message: String },

    /// The issue-lookup collaborator knows no bug for this reporting id.
    #[error("failed to find bug for {reporting_id}")]
    BugNotFound { reporting_id: String },

    /// A reply pointer matched more than one discussion of the same source.
    #[error("message {message_id} is present in {matches} discussions of {source_name}")]
    AmbiguousThread {
        source_name: String,
        message_id: String,
        matches: usize,
    },

    /// A record read inside a transaction changed before commit.
    #[error("concurrent modification of {key}")]
    Conflict { key: String },

    /// A transaction kept conflicting until its attempt ceiling.
    #[error("transaction on {key} failed after {attempts} attempts")]
    TransactionExhausted { key: String, attempts: u32 },

    /// A transaction touched more record groups than its options allow.
    #[error("transaction touches {groups} record groups, limit is {limit}")]
    TooManyGroups { groups: usize, limit: usize },

    /// The bug a summary should be propagated to does not exist.
    #[error("failed to get bug {key}: no such record")]
    MissingBug { key: String },

    /// The discussion was committed but some bug summaries were not.
    ///
    /// Carries the diff that was being propagated so the listed bugs can be
    /// caught up later; redelivering the messages would produce an empty diff.
    #[error("failed to update summary for {} of discussion {discussion}", format_failures(.failures))]
    PartialPropagation {
        discussion: String,
        /// Discussion source, the per-source summary the diff belongs to.
        source_name: String,
        diff: Summary,
        failures: Vec<PropagationFailure>,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ThreadlogError {
    /// Wraps any backend error as [`ThreadlogError::Storage`].
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ThreadlogError::Storage {
            source: source.into(),
        }
    }

    /// Returns true if re-running the enclosing transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ThreadlogError::Conflict { .. })
    }

    /// Bug keys named by a partial propagation failure, empty for every other error.
    pub fn failed_bugs(&self) -> Vec<&str> {
        match self {
            ThreadlogError::PartialPropagation { failures, .. } => {
                failures.iter().map(|f| f.bug_key.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn format_failures(failures: &[PropagationFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.bug_key, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}
