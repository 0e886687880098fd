// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request table operations.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use civiq_core::CiviqError;
use civiq_core::types::{NewRequest, Request, RequestStatus};

use crate::database::Database;
use crate::queries::{format_ts, parse_status, parse_ts};

const COLUMNS: &str = "id, user_id, organization_id, status, created_at, latest_entry, summary";

fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<Request> {
    Ok(Request {
        id: row.get(0)?,
        user_id: row.get(1)?,
        organization_id: row.get(2)?,
        status: parse_status(&row.get::<_, String>(3)?)?,
        created: parse_ts(&row.get::<_, String>(4)?)?,
        latest_entry: row.get(5)?,
        summary: row.get(6)?,
    })
}

/// Insert a request. Returns the assigned id.
pub async fn create_request(db: &Database, request: &NewRequest) -> Result<i64, CiviqError> {
    let request = request.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO requests (user_id, organization_id, status, created_at, summary)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    request.user_id,
                    request.organization_id,
                    request.status.to_string(),
                    format_ts(&request.created),
                    request.summary,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn find_request(db: &Database, id: i64) -> Result<Option<Request>, CiviqError> {
    db.connection()
        .call(move |conn| {
            let request = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM requests WHERE id = ?1"),
                    params![id],
                    row_to_request,
                )
                .optional()?;
            Ok(request)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn update_request_status(
    db: &Database,
    id: i64,
    status: RequestStatus,
) -> Result<(), CiviqError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE requests SET status = ?1 WHERE id = ?2",
                params![status.to_string(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn set_latest_entry(db: &Database, id: i64, entry_id: i64) -> Result<(), CiviqError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE requests SET latest_entry = ?1 WHERE id = ?2",
                params![entry_id, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Requests in one of `statuses` created at or before the cutoff, oldest
/// first, so a request created exactly at the threshold escalates on the
/// same sweep. The status strings come from the enum, never from user input.
pub async fn list_escalation_candidates(
    db: &Database,
    statuses: &[RequestStatus],
    created_before: DateTime<Utc>,
) -> Result<Vec<Request>, CiviqError> {
    let status_list = statuses
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ");
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {COLUMNS} FROM requests
                 WHERE status IN ({status_list}) AND created_at <= ?1
                 ORDER BY id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![format_ts(&created_before)], row_to_request)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
