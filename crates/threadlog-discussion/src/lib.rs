// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folding inbound thread messages into discussions and bug summaries.
//!
//! The pipeline for one message is:
//!
//! 1. [`resolve_thread`] decides which discussion the message belongs to.
//! 2. [`DiscussionMerger::merge_discussion`] updates that discussion in one
//!    transaction and computes the summary diff of the accepted messages.
//! 3. The diff is folded into every associated bug by [`propagate_summary`],
//!    one single-record transaction per bug.
//!
//! [`save_discussion_message`] runs all three for one inbound message.

pub mod ingest;
pub mod lookup;
pub mod merge;
pub mod propagate;
pub mod resolver;

pub use ingest::save_discussion_message;
pub use lookup::StoreBugLookup;
pub use merge::{DiscussionMerger, MergeOutcome};
pub use propagate::propagate_summary;
pub use resolver::{ThreadTarget, discussion_by_message_id, resolve_thread};
