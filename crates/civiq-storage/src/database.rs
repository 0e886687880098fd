// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use civiq_core::CiviqError;

/// Handle to the SQLite database behind a tokio-rusqlite connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if necessary) the database at `path`, apply PRAGMAs
    /// and run pending migrations.
    pub async fn open(path: &str) -> Result<Self, CiviqError> {
        Self::open_with_options(path, true).await
    }

    /// As [`Database::open`], with WAL mode configurable.
    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, CiviqError> {
        // Migrations need a plain blocking connection; run them to completion
        // before the async connection ever sees the file.
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), CiviqError> {
            if let Some(parent) = Path::new(&migrate_path).parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).map_err(|e| CiviqError::Storage {
                    source: Box::new(e),
                })?;
            }
            let mut conn =
                rusqlite::Connection::open(&migrate_path).map_err(|e| CiviqError::Storage {
                    source: Box::new(e),
                })?;
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")
                    .map_err(|e| CiviqError::Storage {
                        source: Box::new(e),
                    })?;
            }
            crate::migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| CiviqError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CiviqError::Storage {
                source: Box::new(e),
            })?;
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA synchronous = NORMAL;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        Ok(Self { conn })
    }

    /// The underlying serialized connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and release the connection.
    pub async fn close(&self) -> Result<(), CiviqError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the crate error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> CiviqError {
    CiviqError::Storage {
        source: Box::new(e),
    }
}
