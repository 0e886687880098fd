// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread entry operations. Entries are append-only.

use rusqlite::{OptionalExtension, params};

use civiq_core::CiviqError;
use civiq_core::types::{NewThreadEntry, ThreadEntry};

use crate::database::Database;
use crate::queries::{format_ts, parse_ts};

const COLUMNS: &str =
    "id, request_id, is_response, email_from, email_to, subject, body, fingerprint, created_at";

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<ThreadEntry> {
    Ok(ThreadEntry {
        id: row.get(0)?,
        request_id: row.get(1)?,
        is_response: row.get(2)?,
        email_from: row.get(3)?,
        email_to: row.get(4)?,
        subject: row.get(5)?,
        body: row.get(6)?,
        fingerprint: row.get(7)?,
        created: parse_ts(&row.get::<_, String>(8)?)?,
    })
}

/// Append an entry. Returns the assigned id.
pub async fn append_entry(db: &Database, entry: &NewThreadEntry) -> Result<i64, CiviqError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO thread_entries
                     (request_id, is_response, email_from, email_to, subject, body,
                      fingerprint, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    entry.request_id,
                    entry.is_response,
                    entry.email_from,
                    entry.email_to,
                    entry.subject,
                    entry.body,
                    entry.fingerprint,
                    format_ts(&entry.created),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn find_entry_by_fingerprint(
    db: &Database,
    request_id: i64,
    fingerprint: &str,
) -> Result<Option<ThreadEntry>, CiviqError> {
    let fingerprint = fingerprint.to_string();
    db.connection()
        .call(move |conn| {
            let entry = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM thread_entries
                         WHERE request_id = ?1 AND fingerprint = ?2"
                    ),
                    params![request_id, fingerprint],
                    row_to_entry,
                )
                .optional()?;
            Ok(entry)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All entries for a request ordered by creation time ascending, which is
/// the conversation order.
pub async fn list_entries(db: &Database, request_id: i64) -> Result<Vec<ThreadEntry>, CiviqError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM thread_entries
                 WHERE request_id = ?1
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt
                .query_map(params![request_id], row_to_entry)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn count_responses(db: &Database, request_id: i64) -> Result<u64, CiviqError> {
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM thread_entries
                 WHERE request_id = ?1 AND is_response = 1",
                params![request_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
