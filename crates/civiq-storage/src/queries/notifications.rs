// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification event operations.
//!
//! Events are created awaiting and flip to delivered exactly once; a failed
//! delivery leaves the row awaiting for the next sweep. The core never
//! deletes events.

use rusqlite::params;

use civiq_core::CiviqError;
use civiq_core::types::{NotificationEvent, NotifyAction};
use chrono::{DateTime, Utc};

use crate::database::Database;
use crate::queries::{format_ts, parse_action, parse_ts};

const COLUMNS: &str = "id, interest_id, action, awaiting, summary, receiver_email, created_at";

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationEvent> {
    Ok(NotificationEvent {
        id: row.get(0)?,
        interest_id: row.get(1)?,
        action: parse_action(&row.get::<_, String>(2)?)?,
        awaiting: row.get(3)?,
        summary: row.get(4)?,
        receiver_email: row.get(5)?,
        created: parse_ts(&row.get::<_, String>(6)?)?,
    })
}

/// Ensure an event exists for (interest, action, summary). Returns `true`
/// when a new awaiting row was created, `false` when one already existed,
/// pending or delivered.
pub async fn ensure_notification(
    db: &Database,
    interest_id: i64,
    action: NotifyAction,
    summary: &str,
    receiver_email: &str,
    created: DateTime<Utc>,
) -> Result<bool, CiviqError> {
    let summary = summary.to_string();
    let receiver_email = receiver_email.to_string();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO notification_events
                     (interest_id, action, awaiting, summary, receiver_email, created_at)
                 VALUES (?1, ?2, 1, ?3, ?4, ?5)
                 ON CONFLICT (interest_id, action, summary) DO NOTHING",
                params![
                    interest_id,
                    action.to_string(),
                    summary,
                    receiver_email,
                    format_ts(&created),
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_awaiting_notifications(
    db: &Database,
) -> Result<Vec<NotificationEvent>, CiviqError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM notification_events
                 WHERE awaiting = 1 ORDER BY id ASC"
            ))?;
            let rows = stmt
                .query_map([], row_to_event)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn mark_notification_delivered(db: &Database, id: i64) -> Result<(), CiviqError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE notification_events SET awaiting = 0 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
