// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription operations: subscribed items and per-receiver interests.
//!
//! An item row exists only while at least one interest points at it;
//! removing the last interest removes the item.

use rusqlite::{OptionalExtension, params};

use civiq_core::CiviqError;
use civiq_core::types::{Interest, NotifyAction, SubscribedItem};

use crate::database::Database;
use crate::queries::parse_action;

fn item_from_parts(kind: &str, object_id: i64) -> rusqlite::Result<SubscribedItem> {
    match kind {
        "request" => Ok(SubscribedItem::Request(object_id)),
        "organization" => Ok(SubscribedItem::Organization(object_id)),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown subscribed item kind `{other}`").into(),
        )),
    }
}

fn row_to_interest(row: &rusqlite::Row<'_>) -> rusqlite::Result<Interest> {
    Ok(Interest {
        id: row.get(0)?,
        item: item_from_parts(&row.get::<_, String>(1)?, row.get(2)?)?,
        action: parse_action(&row.get::<_, String>(3)?)?,
        receiver_user: row.get(4)?,
        receiver_email: row.get(5)?,
        summary: row.get(6)?,
    })
}

const INTEREST_COLUMNS: &str = "i.id, s.kind, s.object_id, i.action, i.receiver_user, \
                                i.receiver_email, s.summary";

/// Register an interest, creating the item row on first use. Idempotent on
/// (item, action, receiver email); returns the existing row's id on repeats.
pub async fn add_interest(
    db: &Database,
    item: SubscribedItem,
    summary: &str,
    action: NotifyAction,
    receiver_user: Option<i64>,
    receiver_email: &str,
) -> Result<i64, CiviqError> {
    let summary = summary.to_string();
    let receiver_email = receiver_email.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO subscribed_items (kind, object_id, summary)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (kind, object_id) DO NOTHING",
                params![item.kind(), item.object_id(), summary],
            )?;
            let item_id: i64 = tx.query_row(
                "SELECT id FROM subscribed_items WHERE kind = ?1 AND object_id = ?2",
                params![item.kind(), item.object_id()],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO interests (item_id, action, receiver_user, receiver_email)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (item_id, action, receiver_email) DO NOTHING",
                params![item_id, action.to_string(), receiver_user, receiver_email],
            )?;
            let interest_id: i64 = tx.query_row(
                "SELECT id FROM interests
                 WHERE item_id = ?1 AND action = ?2 AND receiver_email = ?3",
                params![item_id, action.to_string(), receiver_email],
                |row| row.get(0),
            )?;

            tx.commit()?;
            Ok(interest_id)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove all of one receiver's interests in an item. Drops the item row
/// when no interest remains.
pub async fn remove_interests(
    db: &Database,
    item: SubscribedItem,
    receiver_email: &str,
) -> Result<(), CiviqError> {
    let receiver_email = receiver_email.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let item_id: Option<i64> = tx
                .query_row(
                    "SELECT id FROM subscribed_items WHERE kind = ?1 AND object_id = ?2",
                    params![item.kind(), item.object_id()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(item_id) = item_id else {
                tx.commit()?;
                return Ok(());
            };

            tx.execute(
                "DELETE FROM interests WHERE item_id = ?1 AND receiver_email = ?2",
                params![item_id, receiver_email],
            )?;

            let remaining: i64 = tx.query_row(
                "SELECT COUNT(*) FROM interests WHERE item_id = ?1",
                params![item_id],
                |row| row.get(0),
            )?;
            if remaining == 0 {
                tx.execute(
                    "DELETE FROM subscribed_items WHERE id = ?1",
                    params![item_id],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_interests(
    db: &Database,
    item: SubscribedItem,
    action: NotifyAction,
) -> Result<Vec<Interest>, CiviqError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INTEREST_COLUMNS}
                 FROM interests i JOIN subscribed_items s ON s.id = i.item_id
                 WHERE s.kind = ?1 AND s.object_id = ?2 AND i.action = ?3
                 ORDER BY i.id ASC"
            ))?;
            let rows = stmt
                .query_map(
                    params![item.kind(), item.object_id(), action.to_string()],
                    row_to_interest,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn find_interest(db: &Database, id: i64) -> Result<Option<Interest>, CiviqError> {
    db.connection()
        .call(move |conn| {
            let interest = conn
                .query_row(
                    &format!(
                        "SELECT {INTEREST_COLUMNS}
                         FROM interests i JOIN subscribed_items s ON s.id = i.item_id
                         WHERE i.id = ?1"
                    ),
                    params![id],
                    row_to_interest,
                )
                .optional()?;
            Ok(interest)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn add_interest_is_idempotent() {
        let (db, _dir) = setup().await;
        let item = SubscribedItem::Request(42);

        let first = add_interest(
            &db,
            item,
            "Road budget",
            NotifyAction::NewMessage,
            None,
            "follower@people.example.com",
        )
        .await
        .unwrap();
        let second = add_interest(
            &db,
            item,
            "Road budget",
            NotifyAction::NewMessage,
            None,
            "follower@people.example.com",
        )
        .await
        .unwrap();
        assert_eq!(first, second, "same triple must reuse the row");

        let interests = list_interests(&db, item, NotifyAction::NewMessage)
            .await
            .unwrap();
        assert_eq!(interests.len(), 1);
        assert_eq!(interests[0].item, item);
    }

    #[tokio::test]
    async fn distinct_receivers_get_distinct_rows() {
        let (db, _dir) = setup().await;
        let item = SubscribedItem::Organization(7);
        add_interest(&db, item, "Town Hall", NotifyAction::NewMessage, None, "a@x.example")
            .await
            .unwrap();
        add_interest(&db, item, "Town Hall", NotifyAction::NewMessage, None, "b@x.example")
            .await
            .unwrap();
        let interests = list_interests(&db, item, NotifyAction::NewMessage)
            .await
            .unwrap();
        assert_eq!(interests.len(), 2);
    }

    #[tokio::test]
    async fn removing_last_interest_drops_the_item() {
        let (db, _dir) = setup().await;
        let item = SubscribedItem::Request(9);
        add_interest(&db, item, "s", NotifyAction::NewMessage, None, "a@x.example")
            .await
            .unwrap();
        add_interest(&db, item, "s", NotifyAction::Annotation, None, "a@x.example")
            .await
            .unwrap();

        remove_interests(&db, item, "a@x.example").await.unwrap();

        let count: i64 = db
            .connection()
            .call(|conn| {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM subscribed_items",
                    [],
                    |row| row.get(0),
                )?;
                Ok::<_, rusqlite::Error>(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 0, "orphaned item should be removed");
    }

    #[tokio::test]
    async fn removing_one_receiver_keeps_the_item_for_others() {
        let (db, _dir) = setup().await;
        let item = SubscribedItem::Request(9);
        add_interest(&db, item, "s", NotifyAction::NewMessage, None, "a@x.example")
            .await
            .unwrap();
        add_interest(&db, item, "s", NotifyAction::NewMessage, None, "b@x.example")
            .await
            .unwrap();

        remove_interests(&db, item, "a@x.example").await.unwrap();

        let interests = list_interests(&db, item, NotifyAction::NewMessage)
            .await
            .unwrap();
        assert_eq!(interests.len(), 1);
        assert_eq!(interests[0].receiver_email, "b@x.example");
    }

    #[tokio::test]
    async fn unfollow_of_unknown_item_is_a_no_op() {
        let (db, _dir) = setup().await;
        remove_interests(&db, SubscribedItem::Request(404), "a@x.example")
            .await
            .unwrap();
    }
}
