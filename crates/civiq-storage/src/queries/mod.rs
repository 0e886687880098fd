// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table group.

pub mod attachments;
pub mod notifications;
pub mod parties;
pub mod requests;
pub mod subscriptions;
pub mod thread;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};

use civiq_core::types::{NotifyAction, RequestStatus};

/// Timestamps are stored as RFC 3339 TEXT with millisecond precision,
/// matching the `strftime` defaults used in the schema.
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_ts(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(Box::new(e)))
}

pub(crate) fn parse_status(value: &str) -> rusqlite::Result<RequestStatus> {
    RequestStatus::from_str(value).map_err(|e| conversion_err(Box::new(e)))
}

pub(crate) fn parse_action(value: &str) -> rusqlite::Result<NotifyAction> {
    NotifyAction::from_str(value).map_err(|e| conversion_err(Box::new(e)))
}

fn conversion_err(
    e: Box<dyn std::error::Error + Send + Sync + 'static>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e)
}
