// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Optimistic commit: verify read versions and apply writes in one SQLite
//! transaction.

use rusqlite::{OptionalExtension, Transaction, params};
use threadlog_core::{CommitBatch, Record, RecordKey, ThreadlogError};
use tracing::debug;

use crate::database::{Database, map_tr_err};

/// A record flattened into the columns and index rows it is stored as.
enum Row {
    Discussion {
        source: String,
        id: String,
        kind: String,
        subject: String,
        body: String,
        message_ids: Vec<String>,
        bug_keys: Vec<String>,
    },
    Bug {
        key: String,
        title: String,
        body: String,
        reporting_ids: Vec<String>,
    },
}

impl Row {
    fn encode(record: &Record) -> Result<Self, ThreadlogError> {
        let row = match record {
            Record::Discussion(d) => Row::Discussion {
                source: d.source.clone(),
                id: d.id.clone(),
                kind: d.kind.to_string(),
                subject: d.subject.clone(),
                body: serde_json::to_string(d).map_err(ThreadlogError::storage)?,
                message_ids: d.messages.iter().map(|m| m.id.clone()).collect(),
                bug_keys: d.bug_keys.clone(),
            },
            Record::Bug(b) => Row::Bug {
                key: b.key.clone(),
                title: b.title.clone(),
                body: serde_json::to_string(b).map_err(ThreadlogError::storage)?,
                reporting_ids: b.reporting_ids.clone(),
            },
        };
        Ok(row)
    }

    fn write(&self, tx: &Transaction<'_>, now: &str) -> Result<(), rusqlite::Error> {
        match self {
            Row::Discussion {
                source,
                id,
                kind,
                subject,
                body,
                message_ids,
                bug_keys,
            } => {
                tx.execute(
                    "INSERT INTO discussions (source, id, version, kind, subject, body, updated_at)
                     VALUES (?1, ?2, 1, ?3, ?4, ?5, ?6)
                     ON CONFLICT(source, id) DO UPDATE SET
                        version = version + 1,
                        kind = excluded.kind,
                        subject = excluded.subject,
                        body = excluded.body,
                        updated_at = excluded.updated_at",
                    params![source, id, kind, subject, body, now],
                )?;
                tx.execute(
                    "DELETE FROM discussion_messages WHERE source = ?1 AND discussion_id = ?2",
                    params![source, id],
                )?;
                let mut insert = tx.prepare_cached(
                    "INSERT OR IGNORE INTO discussion_messages (source, discussion_id, message_id)
                     VALUES (?1, ?2, ?3)",
                )?;
                for message_id in message_ids {
                    insert.execute(params![source, id, message_id])?;
                }
                tx.execute(
                    "DELETE FROM discussion_bugs WHERE source = ?1 AND discussion_id = ?2",
                    params![source, id],
                )?;
                let mut insert = tx.prepare_cached(
                    "INSERT OR IGNORE INTO discussion_bugs (source, discussion_id, bug_key)
                     VALUES (?1, ?2, ?3)",
                )?;
                for bug_key in bug_keys {
                    insert.execute(params![source, id, bug_key])?;
                }
            }
            Row::Bug {
                key,
                title,
                body,
                reporting_ids,
            } => {
                tx.execute(
                    "INSERT INTO bugs (key, version, title, body, updated_at)
                     VALUES (?1, 1, ?2, ?3, ?4)
                     ON CONFLICT(key) DO UPDATE SET
                        version = version + 1,
                        title = excluded.title,
                        body = excluded.body,
                        updated_at = excluded.updated_at",
                    params![key, title, body, now],
                )?;
                tx.execute(
                    "DELETE FROM bug_reporting_ids WHERE bug_key = ?1",
                    params![key],
                )?;
                let mut insert = tx.prepare_cached(
                    "INSERT OR IGNORE INTO bug_reporting_ids (reporting_id, bug_key)
                     VALUES (?1, ?2)",
                )?;
                for reporting_id in reporting_ids {
                    insert.execute(params![reporting_id, key])?;
                }
            }
        }
        Ok(())
    }
}

fn current_version(tx: &Transaction<'_>, key: &RecordKey) -> Result<u64, rusqlite::Error> {
    let version = match key {
        RecordKey::Discussion(k) => tx
            .query_row(
                "SELECT version FROM discussions WHERE source = ?1 AND id = ?2",
                params![k.source, k.id],
                |row| row.get(0),
            )
            .optional()?,
        RecordKey::Bug(k) => tx
            .query_row(
                "SELECT version FROM bugs WHERE key = ?1",
                params![k],
                |row| row.get(0),
            )
            .optional()?,
    };
    Ok(version.unwrap_or(0))
}

/// Apply `batch` atomically, or fail with [`ThreadlogError::Conflict`]
/// naming the first record whose version moved.
pub async fn commit(db: &Database, batch: CommitBatch) -> Result<(), ThreadlogError> {
    let rows = batch
        .writes
        .iter()
        .map(Row::encode)
        .collect::<Result<Vec<_>, _>>()?;
    let reads = batch.reads;
    let now = chrono::Utc::now().to_rfc3339();

    let conflict = db
        .connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            let tx = conn.transaction()?;
            for (key, expected) in &reads {
                if current_version(&tx, key)? != *expected {
                    // Dropping `tx` rolls back.
                    return Ok(Some(key.to_string()));
                }
            }
            for row in &rows {
                row.write(&tx, &now)?;
            }
            tx.commit()?;
            Ok(None)
        })
        .await
        .map_err(map_tr_err)?;

    match conflict {
        Some(key) => {
            debug!(record = %key, "commit rejected: version moved");
            Err(ThreadlogError::Conflict { key })
        }
        None => Ok(()),
    }
}
