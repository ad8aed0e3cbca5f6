// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits: the durable record store and the bug lookup service.
//!
//! Both use `#[async_trait]` so they can be held as trait objects.

pub mod lookup;
pub mod store;

pub use lookup::BugLookup;
pub use store::{CommitBatch, Record, RecordKey, RecordStore, Versioned};
