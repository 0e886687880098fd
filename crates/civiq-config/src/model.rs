// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Civiq request tracker.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so unrecognized keys are
//! rejected at startup with an actionable diagnostic.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level Civiq configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional and defaults to sensible
/// values; mailboxes default to none, which disables polling.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CiviqConfig {
    /// Service identity, logging and the correlation mail domain.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Named inbound mailboxes to poll for responses.
    #[serde(default)]
    pub mailboxes: BTreeMap<String, MailboxConfig>,

    /// Outbound SMTP transport settings.
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Request lifecycle thresholds.
    #[serde(default)]
    pub requests: RequestsConfig,

    /// Attachment storage settings.
    #[serde(default)]
    pub attachments: AttachmentsConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Background task cadence and timeouts.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Service identity and the deployment's mail domain.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the deployment.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Mail domain of the deployment; correlation reply addresses are built
    /// as `<slug>.<request-id>@<domain>`.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Public contact address shown in reminder footers. Defaults to
    /// `info@<domain>` when unset.
    #[serde(default)]
    pub info_address: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            domain: default_domain(),
            info_address: None,
        }
    }
}

impl ServiceConfig {
    /// The configured info address, or `info@<domain>`.
    pub fn info_address(&self) -> String {
        self.info_address
            .clone()
            .unwrap_or_else(|| format!("info@{}", self.domain))
    }
}

fn default_service_name() -> String {
    "civiq".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_domain() -> String {
    "localhost".to_string()
}

/// One IMAP mailbox to poll for inbound responses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MailboxConfig {
    pub host: String,

    #[serde(default = "default_imap_port")]
    pub port: u16,

    pub login: String,

    pub password: String,

    #[serde(default = "default_use_ssl")]
    pub use_ssl: bool,
}

fn default_imap_port() -> u16 {
    993
}

fn default_use_ssl() -> bool {
    true
}

/// Outbound SMTP transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// `None` sends without authentication (local relay).
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Envelope and header From for system mail (reminders, reports,
    /// notifications).
    #[serde(default = "default_from_address")]
    pub from_address: String,

    #[serde(default = "default_smtp_timeout")]
    pub timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: None,
            password: None,
            from_address: default_from_address(),
            timeout_secs: default_smtp_timeout(),
        }
    }
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "requests@localhost".to_string()
}

fn default_smtp_timeout() -> u64 {
    30
}

/// Request lifecycle thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RequestsConfig {
    /// Days before an unanswered request becomes overdue. The long-overdue
    /// tier fires at twice this value.
    #[serde(default = "default_overdue_days")]
    pub overdue_days: u32,
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            overdue_days: default_overdue_days(),
        }
    }
}

fn default_overdue_days() -> u32 {
    16
}

/// Attachment storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttachmentsConfig {
    /// Filesystem root for stored attachments; recorded paths are relative
    /// to it.
    #[serde(default = "default_attachment_root")]
    pub root_dir: String,

    /// Maximum size of a single attachment in bytes.
    #[serde(default = "default_max_filesize")]
    pub max_filesize: u64,

    /// Maximum number of attachments saved per message; the rest are
    /// recorded as errors.
    #[serde(default = "default_max_count")]
    pub max_count: usize,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            root_dir: default_attachment_root(),
            max_filesize: default_max_filesize(),
            max_count: default_max_count(),
        }
    }
}

fn default_attachment_root() -> String {
    dirs::data_dir()
        .map(|p| p.join("civiq").join("attachments"))
        .unwrap_or_else(|| std::path::PathBuf::from("attachments"))
        .to_string_lossy()
        .into_owned()
}

fn default_max_filesize() -> u64 {
    15_728_640 // 15 MiB
}

fn default_max_count() -> usize {
    5
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("civiq").join("civiq.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("civiq.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Background task cadence and external call timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Seconds between mailbox polls.
    #[serde(default = "default_mail_poll_secs")]
    pub mail_poll_secs: u64,

    /// Seconds between overdue escalation sweeps.
    #[serde(default = "default_overdue_sweep_secs")]
    pub overdue_sweep_secs: u64,

    /// Seconds between notification delivery sweeps.
    #[serde(default = "default_notify_secs")]
    pub notify_secs: u64,

    /// Timeout for one mailbox fetch, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mail_poll_secs: default_mail_poll_secs(),
            overdue_sweep_secs: default_overdue_sweep_secs(),
            notify_secs: default_notify_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_mail_poll_secs() -> u64 {
    600
}

fn default_overdue_sweep_secs() -> u64 {
    3600
}

fn default_notify_secs() -> u64 {
    120
}

fn default_fetch_timeout_secs() -> u64 {
    60
}
