// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mergeable message statistics.
//!
//! A [`Summary`] is both the running total stored on a discussion or bug and
//! the diff produced by one merge. Counts add and timestamps take the later
//! value, so the same diff can be folded into any number of owners in any
//! order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message counters and latest-activity timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Every message ever accepted, including ones since evicted from history.
    pub all_messages: u64,
    /// Accepted messages that originated outside the project.
    pub external_messages: u64,
    /// Timestamp of the latest accepted message.
    pub last_message: Option<DateTime<Utc>>,
    /// Timestamp of the latest message in a patch discussion.
    pub last_patch_message: Option<DateTime<Utc>>,
}

impl Summary {
    /// Absorbs `diff` into `self`.
    pub fn merge(&mut self, diff: &Summary) {
        self.all_messages += diff.all_messages;
        self.external_messages += diff.external_messages;
        self.last_message = later(self.last_message, diff.last_message);
        self.last_patch_message = later(self.last_patch_message, diff.last_patch_message);
    }

    /// Returns the merge of `self` and `other` without mutating either.
    pub fn merged(mut self, other: &Summary) -> Summary {
        self.merge(other);
        self
    }

    /// Records every message of this diff as patch activity.
    pub fn promote_patch_activity(&mut self) {
        self.last_patch_message = self.last_message;
    }

    /// True when merging this summary would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == Summary::default()
    }
}

fn later(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    // None sorts before every Some.
    a.max(b)
}
