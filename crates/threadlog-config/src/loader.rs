// SPDX-FileCopyrightText: 2026 Threadlog Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./threadlog.toml` > `~/.config/threadlog/threadlog.toml`
//! > `/etc/threadlog/threadlog.toml`, with `THREADLOG_` environment overrides.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ThreadlogConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/threadlog/threadlog.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "threadlog.toml";

/// `~/.config/threadlog/threadlog.toml`, when a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("threadlog").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/threadlog/threadlog.toml`
/// 3. `~/.config/threadlog/threadlog.toml`
/// 4. `./threadlog.toml`
/// 5. `THREADLOG_*` environment variables
pub fn load_config() -> Result<ThreadlogConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ThreadlogConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ThreadlogConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ThreadlogConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ThreadlogConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ThreadlogConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Maps `THREADLOG_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys such as
/// `database_path` contain underscores themselves.
fn env_provider() -> Env {
    Env::prefixed("THREADLOG_").map(|key| {
        key.as_str()
            .replacen("storage_", "storage.", 1)
            .replacen("merge_", "merge.", 1)
            .replacen("log_", "log.", 1)
            .into()
    })
}
