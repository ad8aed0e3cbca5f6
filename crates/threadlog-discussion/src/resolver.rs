// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Finding the discussion a reply belongs to.

use threadlog_core::{
    Discussion, DiscussionType, NewDiscussionMessage, RecordStore, ThreadlogError,
};
use tracing::debug;

/// Two matches are enough to tell a unique thread from an ambiguous one.
const MATCH_LIMIT: usize = 2;

/// The discussion of `source` whose history contains `message_id`.
///
/// Returns `None` when no discussion has seen the message and
/// [`ThreadlogError::AmbiguousThread`] when more than one has.
pub async fn discussion_by_message_id(
    store: &dyn RecordStore,
    source: &str,
    message_id: &str,
) -> Result<Option<Discussion>, ThreadlogError> {
    let mut found = store
        .discussions_by_message_id(source, message_id, MATCH_LIMIT)
        .await?;
    match found.len() {
        0 | 1 => Ok(found.pop()),
        matches => Err(ThreadlogError::AmbiguousThread {
            source_name: source.to_string(),
            message_id: message_id.to_string(),
            matches,
        }),
    }
}

/// Where an inbound message should be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadTarget {
    /// The reply pointer matched a stored discussion.
    Existing { id: String, kind: DiscussionType },
    /// No known parent: the message heads its own discussion.
    New {
        id: String,
        subject: String,
        kind: DiscussionType,
    },
}

impl ThreadTarget {
    pub fn id(&self) -> &str {
        match self {
            ThreadTarget::Existing { id, .. } | ThreadTarget::New { id, .. } => id,
        }
    }
}

/// Resolves `msg`'s reply pointer to a thread.
///
/// A reply whose parent was never observed roots a new discussion at itself,
/// and stays there if the parent shows up later.
pub async fn resolve_thread(
    store: &dyn RecordStore,
    msg: &NewDiscussionMessage,
) -> Result<ThreadTarget, ThreadlogError> {
    if let Some(parent) = msg.reply_target() {
        if let Some(discussion) = discussion_by_message_id(store, &msg.source, parent).await? {
            debug!(
                source = %msg.source,
                message = %msg.id,
                discussion = %discussion.id,
                "reply joins known thread"
            );
            return Ok(ThreadTarget::Existing {
                id: discussion.id,
                kind: discussion.kind,
            });
        }
        debug!(source = %msg.source, message = %msg.id, parent, "parent not seen, starting sub-thread");
    }
    Ok(ThreadTarget::New {
        id: msg.id.clone(),
        subject: msg.subject.clone(),
        kind: msg.kind,
    })
}
