// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry point for single inbound messages.

use threadlog_core::{DiscussionUpdate, NewDiscussionMessage, ThreadlogError};

use crate::merge::{DiscussionMerger, MergeOutcome};
use crate::resolver::{ThreadTarget, resolve_thread};

fn validate(msg: &NewDiscussionMessage) -> Result<(), ThreadlogError> {
    if msg.id.trim().is_empty() {
        return Err(ThreadlogError::InvalidMessage {
            message: "message id is empty".to_string(),
        });
    }
    if msg.source.trim().is_empty() {
        return Err(ThreadlogError::InvalidMessage {
            message: format!("message {} has no source", msg.id),
        });
    }
    Ok(())
}

/// Builds the one-message update `msg` turns into once its thread is known.
pub fn update_for(msg: &NewDiscussionMessage, target: ThreadTarget) -> DiscussionUpdate {
    let (id, subject, kind) = match target {
        // Subject only matters when creating, and the thread already exists.
        ThreadTarget::Existing { id, kind } => (id, String::new(), kind),
        ThreadTarget::New { id, subject, kind } => (id, subject, kind),
    };
    DiscussionUpdate {
        source: msg.source.clone(),
        id,
        kind,
        subject,
        bug_ids: msg.bug_ids.clone(),
        messages: vec![msg.to_message()],
    }
}

/// Records one received message: finds its thread, then merges it.
pub async fn save_discussion_message(
    merger: &DiscussionMerger,
    msg: &NewDiscussionMessage,
) -> Result<MergeOutcome, ThreadlogError> {
    validate(msg)?;
    let target = resolve_thread(merger.store().as_ref(), msg).await?;
    merger.merge_discussion(&update_for(msg, target)).await
}
