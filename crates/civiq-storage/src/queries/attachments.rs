// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment record operations.

use rusqlite::{OptionalExtension, params};

use civiq_core::CiviqError;
use civiq_core::types::{Attachment, NewAttachment};

use crate::database::Database;

const COLUMNS: &str = "id, entry_id, filename, filetype, filesize, path";

fn row_to_attachment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        filename: row.get(2)?,
        filetype: row.get(3)?,
        filesize: row.get(4)?,
        path: row.get(5)?,
    })
}

pub async fn create_attachment(
    db: &Database,
    attachment: &NewAttachment,
) -> Result<i64, CiviqError> {
    let attachment = attachment.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO attachments (entry_id, filename, filetype, filesize, path)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    attachment.entry_id,
                    attachment.filename,
                    attachment.filetype,
                    attachment.filesize,
                    attachment.path,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Lookup by the dedup key (entry, filename, size).
pub async fn find_attachment(
    db: &Database,
    entry_id: i64,
    filename: &str,
    filesize: i64,
) -> Result<Option<Attachment>, CiviqError> {
    let filename = filename.to_string();
    db.connection()
        .call(move |conn| {
            let attachment = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM attachments
                         WHERE entry_id = ?1 AND filename = ?2 AND filesize = ?3"
                    ),
                    params![entry_id, filename, filesize],
                    row_to_attachment,
                )
                .optional()?;
            Ok(attachment)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_attachments(
    db: &Database,
    entry_id: i64,
) -> Result<Vec<Attachment>, CiviqError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM attachments WHERE entry_id = ?1 ORDER BY id ASC"
            ))?;
            let rows = stmt
                .query_map(params![entry_id], row_to_attachment)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
