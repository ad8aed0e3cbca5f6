// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded, deduplicated message history of a discussion.

use crate::summary::Summary;
use crate::types::{Discussion, DiscussionMessage};

/// Most messages a discussion retains. Older ones are evicted first;
/// summary counters keep counting them.
pub const MAX_MESSAGES_IN_DISCUSSION: usize = 1500;

impl Discussion {
    /// Appends messages not seen before and returns the diff they contribute.
    ///
    /// Known ids are skipped, so redelivery yields an empty diff. The history
    /// is re-sorted by time afterwards and trimmed to
    /// [`MAX_MESSAGES_IN_DISCUSSION`].
    pub fn add_messages(&mut self, messages: &[DiscussionMessage]) -> Summary {
        let mut diff = Summary::default();
        let mut known: std::collections::HashSet<String> =
            self.messages.iter().map(|m| m.id.clone()).collect();
        for message in messages {
            if !known.insert(message.id.clone()) {
                continue;
            }
            diff.all_messages += 1;
            if message.external {
                diff.external_messages += 1;
            }
            if diff.last_message < Some(message.time) {
                diff.last_message = Some(message.time);
            }
            self.messages.push(message.clone());
        }
        self.messages.sort_by_key(|m| m.time);
        if self.messages.len() > MAX_MESSAGES_IN_DISCUSSION {
            let excess = self.messages.len() - MAX_MESSAGES_IN_DISCUSSION;
            self.messages.drain(..excess);
        }
        diff
    }
}
