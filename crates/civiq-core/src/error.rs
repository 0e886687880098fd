// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Civiq request tracker.

use thiserror::Error;

/// The primary error type used across all Civiq adapter traits and core operations.
#[derive(Debug, Error)]
pub enum CiviqError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Mailbox errors (IMAP connect/login failure, fetch failure, flag update failure).
    #[error("mailbox error: {message}")]
    Mailbox {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Outbound mail errors (SMTP connect, envelope construction, send failure).
    #[error("outbound mail error: {message}")]
    Outbound {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A MIME message or one of its fields could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// No template registered under the requested name.
    #[error("unknown template: {0}")]
    Template(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
