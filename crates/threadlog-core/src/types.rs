// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Records stored by threadlog and the inbound event shapes that feed them.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::summary::Summary;

/// Source name of the kernel mailing-list archive.
pub const LORE_SOURCE: &str = "lore";

/// Declared kind of a discussion thread.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiscussionType {
    /// A bug report and the replies to it.
    #[default]
    Report,
    /// A patch series; every message counts as patch activity.
    Patch,
    /// A periodic reminder about open bugs.
    Reminder,
    /// A thread that merely mentions a bug.
    Mention,
}

/// Identity of a discussion: the originating system plus its thread id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiscussionKey {
    pub source: String,
    pub id: String,
}

impl DiscussionKey {
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DiscussionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.id)
    }
}

/// One message of a discussion. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionMessage {
    pub id: String,
    pub time: DateTime<Utc>,
    /// Sent from outside the project rather than generated by it.
    pub external: bool,
}

/// The durable aggregate for one observed thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discussion {
    pub source: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DiscussionType,
    pub subject: String,
    /// Retained history, sorted by time, unique by id.
    pub messages: Vec<DiscussionMessage>,
    /// Storage keys of the bugs this thread refers to.
    pub bug_keys: Vec<String>,
    pub summary: Summary,
}

impl Discussion {
    /// An empty discussion with the given identity.
    pub fn new(key: DiscussionKey, kind: DiscussionType, subject: impl Into<String>) -> Self {
        Self {
            source: key.source,
            id: key.id,
            kind,
            subject: subject.into(),
            messages: Vec::new(),
            bug_keys: Vec::new(),
            summary: Summary::default(),
        }
    }

    pub fn key(&self) -> DiscussionKey {
        DiscussionKey::new(self.source.clone(), self.id.clone())
    }

    /// Ids of the retained messages, rebuilt on every call.
    pub fn message_ids(&self) -> HashSet<&str> {
        self.messages.iter().map(|m| m.id.as_str()).collect()
    }

    /// Adds bug keys not yet associated. Returns how many were new.
    pub fn add_bug_keys<'a>(&mut self, keys: impl IntoIterator<Item = &'a String>) -> usize {
        let mut added = 0;
        for key in keys {
            if !self.bug_keys.contains(key) {
                self.bug_keys.push(key.clone());
                added += 1;
            }
        }
        added
    }

    /// Web link to the thread for sources that have one.
    pub fn link(&self) -> Option<String> {
        match self.source.as_str() {
            LORE_SOURCE => Some(format!(
                "https://lore.kernel.org/all/{}/T/",
                self.id.trim_matches(|c| c == '<' || c == '>')
            )),
            _ => None,
        }
    }
}

/// Per-source discussion statistics kept on a bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugDiscussionInfo {
    pub source: String,
    pub summary: Summary,
}

/// The slice of a tracked bug that threadlog reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
    /// Internal storage key.
    pub key: String,
    #[serde(default)]
    pub title: String,
    /// External ids under which the bug was reported.
    #[serde(default)]
    pub reporting_ids: Vec<String>,
    /// One entry per discussion source. A bug sees only a handful of
    /// sources, so lookups scan the list.
    #[serde(default)]
    pub discussion_info: Vec<BugDiscussionInfo>,
}

impl Bug {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Folds `diff` into the summary for `source`, creating the entry on first use.
    pub fn merge_discussion_summary(&mut self, source: &str, diff: &Summary) {
        let index = match self.discussion_info.iter().position(|i| i.source == source) {
            Some(index) => index,
            None => {
                self.discussion_info.push(BugDiscussionInfo {
                    source: source.to_string(),
                    summary: Summary::default(),
                });
                self.discussion_info.len() - 1
            }
        };
        self.discussion_info[index].summary.merge(diff);
    }

    /// Summary for a single source, if any message from it was propagated.
    pub fn source_summary(&self, source: &str) -> Option<&Summary> {
        self.discussion_info
            .iter()
            .find(|i| i.source == source)
            .map(|i| &i.summary)
    }

    /// The merge of every per-source summary.
    pub fn discussion_summary(&self) -> Summary {
        self.discussion_info
            .iter()
            .fold(Summary::default(), |acc, item| acc.merged(&item.summary))
    }
}

/// A batch of messages to fold into one discussion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscussionUpdate {
    pub source: String,
    /// Thread id; the head message id for new threads.
    pub id: String,
    pub kind: DiscussionType,
    /// Used only when the discussion is created.
    pub subject: String,
    /// External reporting ids, resolved to storage keys before any write.
    pub bug_ids: Vec<String>,
    pub messages: Vec<DiscussionMessage>,
}

impl DiscussionUpdate {
    pub fn key(&self) -> DiscussionKey {
        DiscussionKey::new(self.source.clone(), self.id.clone())
    }
}

/// One message as delivered by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDiscussionMessage {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    pub source: String,
    #[serde(rename = "type", default)]
    pub kind: DiscussionType,
    #[serde(default)]
    pub bug_ids: Vec<String>,
    #[serde(default)]
    pub in_reply_to: Option<String>,
    #[serde(default)]
    pub external: bool,
    pub time: DateTime<Utc>,
}

impl NewDiscussionMessage {
    /// The reply pointer, treating an empty string as absent.
    pub fn reply_target(&self) -> Option<&str> {
        self.in_reply_to.as_deref().filter(|id| !id.is_empty())
    }

    pub fn to_message(&self) -> DiscussionMessage {
        DiscussionMessage {
            id: self.id.clone(),
            time: self.time,
            external: self.external,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn discussion_type_round_trips_through_strings() {
        for kind in [
            DiscussionType::Report,
            DiscussionType::Patch,
            DiscussionType::Reminder,
            DiscussionType::Mention,
        ] {
            let parsed = DiscussionType::from_str(&kind.to_string()).expect("should parse back");
            assert_eq!(parsed, kind);
        }
        assert_eq!(DiscussionType::Patch.to_string(), "patch");
        assert_eq!(
            serde_json::to_string(&DiscussionType::Patch).unwrap(),
            "\"patch\""
        );
    }

    #[test]
    fn lore_link_strips_angle_brackets() {
        let d = Discussion::new(
            DiscussionKey::new(LORE_SOURCE, "<123@kernel.org>"),
            DiscussionType::Report,
            "subject",
        );
        assert_eq!(
            d.link().as_deref(),
            Some("https://lore.kernel.org/all/123@kernel.org/T/")
        );

        let other = Discussion::new(
            DiscussionKey::new("gerrit", "42"),
            DiscussionType::Report,
            "",
        );
        assert_eq!(other.link(), None);
    }

    #[test]
    fn add_bug_keys_is_a_set_union() {
        let mut d = Discussion::new(DiscussionKey::new("lore", "a"), DiscussionType::Report, "");
        let first = vec!["b1".to_string(), "b2".to_string(), "b1".to_string()];
        assert_eq!(d.add_bug_keys(&first), 2);
        let second = vec!["b2".to_string(), "b3".to_string()];
        assert_eq!(d.add_bug_keys(&second), 1);
        assert_eq!(d.bug_keys, vec!["b1", "b2", "b3"]);
    }

    #[test]
    fn bug_summary_entries_are_created_lazily_per_source() {
        let mut bug = Bug::new("bug-1", "crash in foo");
        assert!(bug.source_summary("lore").is_none());

        let diff = Summary {
            all_messages: 2,
            external_messages: 1,
            last_message: Some(ts(10)),
            last_patch_message: None,
        };
        bug.merge_discussion_summary("lore", &diff);
        bug.merge_discussion_summary("lore", &diff);
        bug.merge_discussion_summary(
            "gerrit",
            &Summary {
                all_messages: 1,
                external_messages: 0,
                last_message: Some(ts(30)),
                last_patch_message: Some(ts(30)),
            },
        );

        assert_eq!(bug.discussion_info.len(), 2);
        assert_eq!(bug.source_summary("lore").unwrap().all_messages, 4);

        let overall = bug.discussion_summary();
        assert_eq!(overall.all_messages, 5);
        assert_eq!(overall.external_messages, 2);
        assert_eq!(overall.last_message, Some(ts(30)));
        assert_eq!(overall.last_patch_message, Some(ts(30)));
    }

    #[test]
    fn empty_reply_pointer_is_absent() {
        let mut msg = NewDiscussionMessage {
            id: "m".into(),
            subject: String::new(),
            source: "lore".into(),
            kind: DiscussionType::Report,
            bug_ids: vec![],
            in_reply_to: Some(String::new()),
            external: false,
            time: ts(1),
        };
        assert_eq!(msg.reply_target(), None);
        msg.in_reply_to = Some("parent".into());
        assert_eq!(msg.reply_target(), Some("parent"));
    }

    #[test]
    fn inbound_message_parses_with_defaults() {
        let msg: NewDiscussionMessage = serde_json::from_str(
            r#"{"id":"<m@x>","source":"lore","time":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(msg.kind, DiscussionType::Report);
        assert!(msg.bug_ids.is_empty());
        assert!(!msg.external);
        assert_eq!(msg.reply_target(), None);
    }
}
