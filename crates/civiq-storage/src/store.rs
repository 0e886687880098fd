// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the core `Store` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use civiq_config::model::StorageConfig;
use civiq_core::types::{
    Attachment, Interest, NewAttachment, NewRequest, NewThreadEntry, NotificationEvent,
    NotifyAction, Organization, Request, RequestStatus, SubscribedItem, ThreadEntry, User,
};
use civiq_core::{CiviqError, Store};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the database at the configured path, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, CiviqError> {
        let db = Database::open_with_options(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite store opened");
        Ok(Self { db })
    }

    /// Checkpoint and release the connection.
    pub async fn close(&self) -> Result<(), CiviqError> {
        self.db.close().await
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_request(&self, request: &NewRequest) -> Result<i64, CiviqError> {
        queries::requests::create_request(&self.db, request).await
    }

    async fn find_request(&self, id: i64) -> Result<Option<Request>, CiviqError> {
        queries::requests::find_request(&self.db, id).await
    }

    async fn update_request_status(
        &self,
        id: i64,
        status: RequestStatus,
    ) -> Result<(), CiviqError> {
        queries::requests::update_request_status(&self.db, id, status).await
    }

    async fn set_latest_entry(&self, id: i64, entry_id: i64) -> Result<(), CiviqError> {
        queries::requests::set_latest_entry(&self.db, id, entry_id).await
    }

    async fn list_escalation_candidates(
        &self,
        statuses: &[RequestStatus],
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Request>, CiviqError> {
        queries::requests::list_escalation_candidates(&self.db, statuses, created_before).await
    }

    async fn count_responses(&self, request_id: i64) -> Result<u64, CiviqError> {
        queries::thread::count_responses(&self.db, request_id).await
    }

    async fn append_entry(&self, entry: &NewThreadEntry) -> Result<i64, CiviqError> {
        queries::thread::append_entry(&self.db, entry).await
    }

    async fn find_entry_by_fingerprint(
        &self,
        request_id: i64,
        fingerprint: &str,
    ) -> Result<Option<ThreadEntry>, CiviqError> {
        queries::thread::find_entry_by_fingerprint(&self.db, request_id, fingerprint).await
    }

    async fn list_entries(&self, request_id: i64) -> Result<Vec<ThreadEntry>, CiviqError> {
        queries::thread::list_entries(&self.db, request_id).await
    }

    async fn create_attachment(&self, attachment: &NewAttachment) -> Result<i64, CiviqError> {
        queries::attachments::create_attachment(&self.db, attachment).await
    }

    async fn find_attachment(
        &self,
        entry_id: i64,
        filename: &str,
        filesize: i64,
    ) -> Result<Option<Attachment>, CiviqError> {
        queries::attachments::find_attachment(&self.db, entry_id, filename, filesize).await
    }

    async fn list_attachments(&self, entry_id: i64) -> Result<Vec<Attachment>, CiviqError> {
        queries::attachments::list_attachments(&self.db, entry_id).await
    }

    async fn create_user(&self, name: &str, email: &str) -> Result<i64, CiviqError> {
        queries::parties::create_user(&self.db, name, email).await
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, CiviqError> {
        queries::parties::find_user(&self.db, id).await
    }

    async fn create_organization(
        &self,
        name: &str,
        email: &str,
        active: bool,
    ) -> Result<i64, CiviqError> {
        queries::parties::create_organization(&self.db, name, email, active).await
    }

    async fn find_organization(&self, id: i64) -> Result<Option<Organization>, CiviqError> {
        queries::parties::find_organization(&self.db, id).await
    }

    async fn set_organization_active(&self, id: i64, active: bool) -> Result<(), CiviqError> {
        queries::parties::set_organization_active(&self.db, id, active).await
    }

    async fn add_interest(
        &self,
        item: SubscribedItem,
        summary: &str,
        action: NotifyAction,
        receiver_user: Option<i64>,
        receiver_email: &str,
    ) -> Result<i64, CiviqError> {
        queries::subscriptions::add_interest(
            &self.db,
            item,
            summary,
            action,
            receiver_user,
            receiver_email,
        )
        .await
    }

    async fn remove_interests(
        &self,
        item: SubscribedItem,
        receiver_email: &str,
    ) -> Result<(), CiviqError> {
        queries::subscriptions::remove_interests(&self.db, item, receiver_email).await
    }

    async fn list_interests(
        &self,
        item: SubscribedItem,
        action: NotifyAction,
    ) -> Result<Vec<Interest>, CiviqError> {
        queries::subscriptions::list_interests(&self.db, item, action).await
    }

    async fn find_interest(&self, id: i64) -> Result<Option<Interest>, CiviqError> {
        queries::subscriptions::find_interest(&self.db, id).await
    }

    async fn ensure_notification(
        &self,
        interest_id: i64,
        action: NotifyAction,
        summary: &str,
        receiver_email: &str,
        created: DateTime<Utc>,
    ) -> Result<bool, CiviqError> {
        queries::notifications::ensure_notification(
            &self.db,
            interest_id,
            action,
            summary,
            receiver_email,
            created,
        )
        .await
    }

    async fn list_awaiting_notifications(
        &self,
    ) -> Result<Vec<NotificationEvent>, CiviqError> {
        queries::notifications::list_awaiting_notifications(&self.db).await
    }

    async fn mark_notification_delivered(&self, id: i64) -> Result<(), CiviqError> {
        queries::notifications::mark_notification_delivered(&self.db, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn full_request_lifecycle_through_store() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&config(dir.path().join("s.db").to_str().unwrap()))
            .await
            .unwrap();

        let user = store
            .create_user("Jane Doe", "jane@people.example.com")
            .await
            .unwrap();
        let org = store
            .create_organization("Town Hall", "clerk@town.example.com", true)
            .await
            .unwrap();
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap();
        let request = store
            .create_request(&NewRequest {
                user_id: user,
                organization_id: org,
                status: RequestStatus::InProgress,
                created,
                summary: "Road budget".to_string(),
            })
            .await
            .unwrap();

        let entry = store
            .append_entry(&NewThreadEntry {
                request_id: request,
                is_response: true,
                email_from: "clerk@town.example.com".to_string(),
                email_to: "jane-doe.1@example.org".to_string(),
                subject: "Re: Road budget".to_string(),
                body: "attached".to_string(),
                fingerprint: "mid-1".to_string(),
                created: created + chrono::Duration::days(3),
            })
            .await
            .unwrap();
        store.set_latest_entry(request, entry).await.unwrap();
        store
            .update_request_status(request, RequestStatus::AwaitingClassification)
            .await
            .unwrap();

        let found = store.find_request(request).await.unwrap().unwrap();
        assert_eq!(found.latest_entry, Some(entry));
        assert_eq!(found.status, RequestStatus::AwaitingClassification);
        assert_eq!(store.count_responses(request).await.unwrap(), 1);

        store.close().await.unwrap();
    }
}
