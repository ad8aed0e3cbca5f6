// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only commands: `discussion`, `bug`, `bug-discussions`.

use serde::Serialize;
use threadlog_core::{Bug, Discussion, DiscussionKey, RecordStore, Summary, ThreadlogError};

#[derive(Debug, Serialize)]
struct DiscussionView<'a> {
    #[serde(flatten)]
    discussion: &'a Discussion,
    link: Option<String>,
}

#[derive(Debug, Serialize)]
struct BugView<'a> {
    #[serde(flatten)]
    bug: &'a Bug,
    overall: Summary,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ThreadlogError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ThreadlogError::Internal(format!("failed to render JSON: {e}")))
}

pub fn render_discussion(discussion: &Discussion) -> Result<String, ThreadlogError> {
    to_json(&DiscussionView {
        discussion,
        link: discussion.link(),
    })
}

fn render_summary(summary: &Summary) -> String {
    let time = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
    };
    format!(
        "messages {} (external {}), last {}, last patch {}",
        summary.all_messages,
        summary.external_messages,
        time(summary.last_message),
        time(summary.last_patch_message)
    )
}

pub fn render_bug_text(bug: &Bug) -> String {
    let mut out = format!("{} {}\n", bug.key, bug.title);
    for info in &bug.discussion_info {
        out.push_str(&format!("  {}: {}\n", info.source, render_summary(&info.summary)));
    }
    out.push_str(&format!(
        "  overall: {}",
        render_summary(&bug.discussion_summary())
    ));
    out
}

pub async fn print_discussion(
    store: &dyn RecordStore,
    source: &str,
    id: &str,
) -> Result<(), ThreadlogError> {
    let key = DiscussionKey::new(source, id);
    let discussion = store
        .load_discussion(&key)
        .await?
        .ok_or_else(|| ThreadlogError::Internal(format!("no discussion {key}")))?;
    println!("{}", render_discussion(&discussion.value)?);
    Ok(())
}

pub async fn print_bug(store: &dyn RecordStore, key: &str, json: bool) -> Result<(), ThreadlogError> {
    let bug = store
        .load_bug(key)
        .await?
        .ok_or_else(|| ThreadlogError::MissingBug {
            key: key.to_string(),
        })?
        .value;
    if json {
        println!(
            "{}",
            to_json(&BugView {
                bug: &bug,
                overall: bug.discussion_summary(),
            })?
        );
    } else {
        println!("{}", render_bug_text(&bug));
    }
    Ok(())
}

pub async fn print_bug_discussions(store: &dyn RecordStore, key: &str) -> Result<(), ThreadlogError> {
    for d in store.discussions_for_bug(key).await? {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            d.source,
            d.id,
            d.kind,
            d.summary.all_messages,
            d.link().unwrap_or_else(|| d.subject.clone())
        );
    }
    Ok(())
}
