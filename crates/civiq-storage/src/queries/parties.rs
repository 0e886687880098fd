// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User and organization lookups. The full CRUD surface for these records
//! lives outside the core; only what ingestion and notification need is here.

use rusqlite::{OptionalExtension, params};

use civiq_core::CiviqError;
use civiq_core::types::{Organization, User};

use crate::database::Database;

pub async fn create_user(db: &Database, name: &str, email: &str) -> Result<i64, CiviqError> {
    let name = name.to_string();
    let email = email.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (name, email) VALUES (?1, ?2)",
                params![name, email],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn find_user(db: &Database, id: i64) -> Result<Option<User>, CiviqError> {
    db.connection()
        .call(move |conn| {
            let user = conn
                .query_row(
                    "SELECT id, name, email FROM users WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(User {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            email: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(user)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn create_organization(
    db: &Database,
    name: &str,
    email: &str,
    active: bool,
) -> Result<i64, CiviqError> {
    let name = name.to_string();
    let email = email.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO organizations (name, email, active) VALUES (?1, ?2, ?3)",
                params![name, email, active],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn find_organization(
    db: &Database,
    id: i64,
) -> Result<Option<Organization>, CiviqError> {
    db.connection()
        .call(move |conn| {
            let organization = conn
                .query_row(
                    "SELECT id, name, email, active FROM organizations WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(Organization {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            email: row.get(2)?,
                            active: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(organization)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn set_organization_active(
    db: &Database,
    id: i64,
    active: bool,
) -> Result<(), CiviqError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE organizations SET active = ?1 WHERE id = ?2",
                params![active, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
