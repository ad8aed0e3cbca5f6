// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small builders shared by tests.

use chrono::{DateTime, TimeZone, Utc};
use threadlog_core::{DiscussionMessage, DiscussionType, DiscussionUpdate, LORE_SOURCE};

/// 2023-11-14T22:13:20Z plus `secs`.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .unwrap_or_default()
}

pub fn msg(id: &str, secs: i64, external: bool) -> DiscussionMessage {
    DiscussionMessage {
        id: id.to_string(),
        time: ts(secs),
        external,
    }
}

/// A lore update for thread `id` reporting the given bugs.
pub fn update(
    id: &str,
    kind: DiscussionType,
    bug_ids: &[&str],
    messages: Vec<DiscussionMessage>,
) -> DiscussionUpdate {
    DiscussionUpdate {
        source: LORE_SOURCE.to_string(),
        id: id.to_string(),
        kind,
        subject: format!("[PATCH] thread {id}"),
        bug_ids: bug_ids.iter().map(|b| b.to_string()).collect(),
        messages,
    }
}
