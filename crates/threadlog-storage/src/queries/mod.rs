// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions, one module per record kind plus the atomic commit.

pub mod bugs;
pub mod commit;
pub mod discussions;

use serde::de::DeserializeOwned;
use threadlog_core::ThreadlogError;

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ThreadlogError> {
    serde_json::from_str(body).map_err(ThreadlogError::storage)
}
