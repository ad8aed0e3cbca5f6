// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `threadlog ingest` command implementation.
//!
//! Reads one `NewDiscussionMessage` JSON object per line and records each.
//! A bad line or a failed merge is logged and counted; processing continues.

use std::fmt;

use threadlog_core::{NewDiscussionMessage, ThreadlogError};
use threadlog_discussion::{DiscussionMerger, save_discussion_message};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Tally of one ingest run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Messages that added something new.
    pub ingested: usize,
    /// Messages already recorded before.
    pub duplicates: usize,
    /// Lines that could not be parsed or merged.
    pub failed: usize,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ingested {}, duplicates {}, failed {}",
            self.ingested, self.duplicates, self.failed
        )
    }
}

/// Ingest from `input`, a file path or `-` for stdin.
pub async fn run_ingest(
    merger: &DiscussionMerger,
    input: &str,
) -> Result<IngestReport, ThreadlogError> {
    if input == "-" {
        ingest_lines(merger, BufReader::new(tokio::io::stdin())).await
    } else {
        let file = tokio::fs::File::open(input)
            .await
            .map_err(|e| ThreadlogError::Internal(format!("cannot open {input}: {e}")))?;
        ingest_lines(merger, BufReader::new(file)).await
    }
}

pub async fn ingest_lines<R>(
    merger: &DiscussionMerger,
    reader: R,
) -> Result<IngestReport, ThreadlogError>
where
    R: AsyncBufRead + Unpin,
{
    let mut report = IngestReport::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| ThreadlogError::Internal(format!("failed to read input: {e}")))?
    {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let event: NewDiscussionMessage = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(err) => {
                warn!(line = line_no, error = %err, "skipping malformed event");
                report.failed += 1;
                continue;
            }
        };
        match save_discussion_message(merger, &event).await {
            Ok(outcome) if outcome.diff.is_empty() => {
                debug!(line = line_no, message = %event.id, "already recorded");
                report.duplicates += 1;
            }
            Ok(_) => report.ingested += 1,
            Err(err) => {
                warn!(
                    line = line_no,
                    message = %event.id,
                    source = %event.source,
                    error = %err,
                    "failed to ingest message"
                );
                report.failed += 1;
            }
        }
    }
    Ok(report)
}
