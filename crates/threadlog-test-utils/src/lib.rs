// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for threadlog integration tests.
//!
//! Provides fault-injecting and fake collaborators plus a harness with
//! seeded stores, so merge scenarios run fast and deterministically.
//!
//! # Components
//!
//! - [`FlakyStore`] - Record store wrapper that injects commit failures per record
//! - [`StaticBugLookup`] - Bug lookup backed by a fixed reporting-id table
//! - [`TestHarness`] - Seeded store and lookup over memory or temp SQLite
//! - [`fixtures`] - Builders for timestamps, messages and updates

pub mod fixtures;
pub mod flaky_store;
pub mod harness;
pub mod static_lookup;

pub use flaky_store::FlakyStore;
pub use harness::TestHarness;
pub use static_lookup::StaticBugLookup;
