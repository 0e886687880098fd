// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./civiq.toml` > `~/.config/civiq/civiq.toml` >
//! `/etc/civiq/civiq.toml` with environment variable overrides via the
//! `CIVIQ_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CiviqConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/civiq/civiq.toml` (system-wide)
/// 3. `~/.config/civiq/civiq.toml` (user XDG config)
/// 4. `./civiq.toml` (local directory)
/// 5. `CIVIQ_*` environment variables
pub fn load_config() -> Result<CiviqConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CiviqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CiviqConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CiviqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CiviqConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for
/// diagnostic use: callers can inspect metadata before extraction).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CiviqConfig::default()))
        .merge(Toml::file("/etc/civiq/civiq.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("civiq/civiq.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("civiq.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// key names stay unambiguous: `CIVIQ_SMTP_FROM_ADDRESS` must map to
/// `smtp.from_address`, not `smtp.from.address`.
fn env_provider() -> Env {
    Env::prefixed("CIVIQ_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("smtp_", "smtp.", 1)
            .replacen("requests_", "requests.", 1)
            .replacen("attachments_", "attachments.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("scheduler_", "scheduler.", 1);
        mapped.into()
    })
}
