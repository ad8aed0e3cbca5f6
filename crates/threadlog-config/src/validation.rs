// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::{StorageBackend, ThreadlogConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns every violation found rather than stopping at the first.
pub fn validate_config(config: &ThreadlogConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    for (key, value) in [
        ("merge.discussion_attempts", config.merge.discussion_attempts),
        ("merge.bug_attempts", config.merge.bug_attempts),
    ] {
        if value < 1 {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be at least 1, got {value}"),
            });
        }
    }

    // A discussion write plus at least one other group.
    if config.merge.max_cross_group < 2 {
        errors.push(ConfigError::Validation {
            message: format!(
                "merge.max_cross_group must be at least 2, got {}",
                config.merge.max_cross_group
            ),
        });
    }

    let level = config.log.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{}` is not one of {}",
                config.log.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
