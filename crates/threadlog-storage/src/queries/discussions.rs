// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discussion reads.

use rusqlite::{OptionalExtension, params};
use threadlog_core::{Discussion, DiscussionKey, ThreadlogError, Versioned};

use super::decode;
use crate::database::{Database, map_tr_err};

pub async fn get_discussion(
    db: &Database,
    key: &DiscussionKey,
) -> Result<Option<Versioned<Discussion>>, ThreadlogError> {
    let key = key.clone();
    let row = db
        .connection()
        .call(move |conn| -> Result<Option<(String, u64)>, rusqlite::Error> {
            conn.query_row(
                "SELECT body, version FROM discussions WHERE source = ?1 AND id = ?2",
                params![key.source, key.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;

    row.map(|(body, version)| {
        Ok(Versioned {
            value: decode(&body)?,
            version,
        })
    })
    .transpose()
}

/// Discussions of `source` that retain a message with `message_id`.
pub async fn find_by_message_id(
    db: &Database,
    source: &str,
    message_id: &str,
    limit: usize,
) -> Result<Vec<Discussion>, ThreadlogError> {
    let source = source.to_string();
    let message_id = message_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let bodies = db
        .connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT d.body FROM discussion_messages m
                 JOIN discussions d ON d.source = m.source AND d.id = m.discussion_id
                 WHERE m.source = ?1 AND m.message_id = ?2
                 ORDER BY d.id LIMIT ?3",
            )?;
            let bodies = stmt
                .query_map(params![source, message_id, limit], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(bodies)
        })
        .await
        .map_err(map_tr_err)?;

    bodies.iter().map(|body| decode(body)).collect()
}

/// Discussions associated with `bug_key`, ordered by source then id.
pub async fn find_by_bug(db: &Database, bug_key: &str) -> Result<Vec<Discussion>, ThreadlogError> {
    let bug_key = bug_key.to_string();
    let bodies = db
        .connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT d.body FROM discussion_bugs b
                 JOIN discussions d ON d.source = b.source AND d.id = b.discussion_id
                 WHERE b.bug_key = ?1
                 ORDER BY d.source, d.id",
            )?;
            let bodies = stmt
                .query_map(params![bug_key], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(bodies)
        })
        .await
        .map_err(map_tr_err)?;

    bodies.iter().map(|body| decode(body)).collect()
}
