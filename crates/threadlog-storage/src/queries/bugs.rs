// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bug reads.

use rusqlite::{OptionalExtension, params};
use threadlog_core::{Bug, ThreadlogError, Versioned};

use super::decode;
use crate::database::{Database, map_tr_err};

pub async fn get_bug(db: &Database, key: &str) -> Result<Option<Versioned<Bug>>, ThreadlogError> {
    let key = key.to_string();
    let row = db
        .connection()
        .call(move |conn| -> Result<Option<(String, u64)>, rusqlite::Error> {
            conn.query_row(
                "SELECT body, version FROM bugs WHERE key = ?1",
                params![key],
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

/// The bug carrying `reporting_id`, lowest key first when several share it.
pub async fn find_by_reporting_id(
    db: &Database,
    reporting_id: &str,
) -> Result<Option<Bug>, ThreadlogError> {
    let reporting_id = reporting_id.to_string();
    let body = db
        .connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT b.body FROM bug_reporting_ids r
                 JOIN bugs b ON b.key = r.bug_key
                 WHERE r.reporting_id = ?1
                 ORDER BY r.bug_key
                 LIMIT 1",
                params![reporting_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;

    body.map(|body| decode(&body)).transpose()
}
