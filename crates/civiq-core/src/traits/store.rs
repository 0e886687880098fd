// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait implemented by the storage backend.
//!
//! The core never touches SQL; it calls these narrow operations and treats
//! every fallible lookup as an explicit `Option`, reserving errors for
//! environmental failures (I/O, storage).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CiviqError;
use crate::types::{
    Attachment, Interest, NewAttachment, NewRequest, NewThreadEntry, NotificationEvent,
    NotifyAction, Organization, Request, RequestStatus, SubscribedItem, ThreadEntry, User,
};

/// Storage operations used by the ingestion, escalation and notification
/// pipelines.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    // --- Requests ---

    /// Create a request and return its assigned id.
    async fn create_request(&self, request: &NewRequest) -> Result<i64, CiviqError>;

    async fn find_request(&self, id: i64) -> Result<Option<Request>, CiviqError>;

    async fn update_request_status(
        &self,
        id: i64,
        status: RequestStatus,
    ) -> Result<(), CiviqError>;

    /// Point the request's de-normalized latest-entry reference at `entry_id`.
    async fn set_latest_entry(&self, id: i64, entry_id: i64) -> Result<(), CiviqError>;

    /// Requests in one of `statuses` created at or before `created_before`.
    /// The escalation sweep filters out answered requests itself via
    /// [`Store::count_responses`].
    async fn list_escalation_candidates(
        &self,
        statuses: &[RequestStatus],
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Request>, CiviqError>;

    /// Number of response entries (`is_response = true`) in the thread.
    async fn count_responses(&self, request_id: i64) -> Result<u64, CiviqError>;

    // --- Thread entries ---

    /// Append an entry and return its assigned id.
    async fn append_entry(&self, entry: &NewThreadEntry) -> Result<i64, CiviqError>;

    async fn find_entry_by_fingerprint(
        &self,
        request_id: i64,
        fingerprint: &str,
    ) -> Result<Option<ThreadEntry>, CiviqError>;

    /// All entries for a request, ordered by creation time ascending.
    async fn list_entries(&self, request_id: i64) -> Result<Vec<ThreadEntry>, CiviqError>;

    // --- Attachments ---

    async fn create_attachment(&self, attachment: &NewAttachment) -> Result<i64, CiviqError>;

    async fn find_attachment(
        &self,
        entry_id: i64,
        filename: &str,
        filesize: i64,
    ) -> Result<Option<Attachment>, CiviqError>;

    async fn list_attachments(&self, entry_id: i64) -> Result<Vec<Attachment>, CiviqError>;

    // --- Users and organizations ---

    async fn create_user(&self, name: &str, email: &str) -> Result<i64, CiviqError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, CiviqError>;

    async fn create_organization(
        &self,
        name: &str,
        email: &str,
        active: bool,
    ) -> Result<i64, CiviqError>;

    async fn find_organization(&self, id: i64) -> Result<Option<Organization>, CiviqError>;

    async fn set_organization_active(&self, id: i64, active: bool) -> Result<(), CiviqError>;

    // --- Subscriptions ---

    /// Register an interest. Idempotent: at most one row exists per
    /// (item, action, receiver email) and repeated calls return the existing
    /// row's id. Creates the subscribed-item row on first use.
    async fn add_interest(
        &self,
        item: SubscribedItem,
        summary: &str,
        action: NotifyAction,
        receiver_user: Option<i64>,
        receiver_email: &str,
    ) -> Result<i64, CiviqError>;

    /// Remove all of one receiver's interests in an item; the item row
    /// itself is dropped when its last interest goes.
    async fn remove_interests(
        &self,
        item: SubscribedItem,
        receiver_email: &str,
    ) -> Result<(), CiviqError>;

    /// All interests in `item` registered for `action`.
    async fn list_interests(
        &self,
        item: SubscribedItem,
        action: NotifyAction,
    ) -> Result<Vec<Interest>, CiviqError>;

    async fn find_interest(&self, id: i64) -> Result<Option<Interest>, CiviqError>;

    // --- Notification events ---

    /// Ensure a notification event exists for the interest. Returns `true`
    /// if a new awaiting event was created, `false` if one with the same
    /// (interest, action, summary) already existed, pending or delivered.
    async fn ensure_notification(
        &self,
        interest_id: i64,
        action: NotifyAction,
        summary: &str,
        receiver_email: &str,
        created: DateTime<Utc>,
    ) -> Result<bool, CiviqError>;

    async fn list_awaiting_notifications(&self)
        -> Result<Vec<NotificationEvent>, CiviqError>;

    async fn mark_notification_delivered(&self, id: i64) -> Result<(), CiviqError>;
}
