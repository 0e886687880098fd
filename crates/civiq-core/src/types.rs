// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Civiq workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Status of an information request.
///
/// The string forms (serde and Display) are the wire-visible values and the
/// TEXT values persisted by the storage backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    InProgress,
    AwaitingClassification,
    Successful,
    PartiallySuccessful,
    Refused,
    NoInformationHeld,
    Withdrawn,
    Overdue,
    LongOverdue,
}

impl RequestStatus {
    /// True for the user-set classification outcomes. A terminal request is
    /// never escalated and never reclassified by background work.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Successful
                | RequestStatus::PartiallySuccessful
                | RequestStatus::Refused
                | RequestStatus::NoInformationHeld
                | RequestStatus::Withdrawn
        )
    }

    /// True for the time-based escalation tiers.
    pub fn is_overdue_tier(self) -> bool {
        matches!(self, RequestStatus::Overdue | RequestStatus::LongOverdue)
    }
}

impl Default for RequestStatus {
    fn default() -> Self {
        RequestStatus::InProgress
    }
}

/// One information request sent by a user to an organization.
///
/// `latest_entry` de-normalizes the thread: it always points at the newest
/// [`ThreadEntry`] so listings never need a join, and it is updated in the
/// same operation that appends the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: i64,
    pub user_id: i64,
    pub organization_id: i64,
    pub status: RequestStatus,
    pub created: DateTime<Utc>,
    pub latest_entry: Option<i64>,
    pub summary: String,
}

/// Fields needed to create a [`Request`]; the id is assigned by storage.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub user_id: i64,
    pub organization_id: i64,
    pub status: RequestStatus,
    pub created: DateTime<Utc>,
    pub summary: String,
}

/// One message, inbound or outbound, in a request's conversation thread.
///
/// Entries are append-only: once created they are never edited or deleted.
/// `fingerprint` is the RFC Message-ID when the message carried one, else a
/// digest over the addressing fields and body; together with the request id
/// it makes re-ingestion of the same message a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadEntry {
    pub id: i64,
    pub request_id: i64,
    /// True when the message travels organization -> requester.
    pub is_response: bool,
    pub email_from: String,
    pub email_to: String,
    pub subject: String,
    pub body: String,
    pub fingerprint: String,
    pub created: DateTime<Utc>,
}

/// Fields needed to append a [`ThreadEntry`].
#[derive(Debug, Clone)]
pub struct NewThreadEntry {
    pub request_id: i64,
    pub is_response: bool,
    pub email_from: String,
    pub email_to: String,
    pub subject: String,
    pub body: String,
    pub fingerprint: String,
    pub created: DateTime<Utc>,
}

/// A file attached to one thread entry, stored under the attachment root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub entry_id: i64,
    pub filename: String,
    /// File extension, without the leading dot.
    pub filetype: String,
    pub filesize: i64,
    /// Path relative to the configured attachment root; stable for the life
    /// of the record.
    pub path: String,
}

/// Fields needed to record an [`Attachment`].
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub entry_id: i64,
    pub filename: String,
    pub filetype: String,
    pub filesize: i64,
    pub path: String,
}

/// A registered user (requester or follower).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// An organization that receives information requests.
///
/// `active` is the moderation flag: newly submitted records stay inactive
/// until reviewed, and `active`-action notifications are held back until
/// the flag flips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub active: bool,
}

/// The two kinds of item a user can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubscribedItem {
    Request(i64),
    Organization(i64),
}

impl SubscribedItem {
    /// The discriminant as stored in the database.
    pub fn kind(self) -> &'static str {
        match self {
            SubscribedItem::Request(_) => "request",
            SubscribedItem::Organization(_) => "organization",
        }
    }

    pub fn object_id(self) -> i64 {
        match self {
            SubscribedItem::Request(id) => id,
            SubscribedItem::Organization(id) => id,
        }
    }
}

/// Actions a subscriber can be notified about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotifyAction {
    /// Record has become active (passed moderation).
    Active,
    /// Request sent to the organization.
    RequestTo,
    /// Response received from the organization.
    ResponseFrom,
    /// New message in the thread, either direction.
    NewMessage,
    /// Annotation added to a thread message.
    Annotation,
    /// Record updated (status change).
    Update,
}

impl NotifyAction {
    /// Human-readable prefix used in notification subject lines.
    pub fn display_label(self) -> &'static str {
        match self {
            NotifyAction::Active => "Record has become active",
            NotifyAction::RequestTo => "Request to the organization",
            NotifyAction::ResponseFrom => "Response from the organization",
            NotifyAction::NewMessage => "New message",
            NotifyAction::Annotation => "New annotation",
            NotifyAction::Update => "Record updated",
        }
    }
}

/// One (item, action, receiver) interest registration.
///
/// At most one row exists per triple; the receiver email is resolved at
/// subscribe time so notifications can reach addresses outside the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interest {
    pub id: i64,
    pub item: SubscribedItem,
    pub action: NotifyAction,
    pub receiver_user: Option<i64>,
    pub receiver_email: String,
    pub summary: String,
}

/// One pending or delivered notification instance for one subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: i64,
    pub interest_id: i64,
    pub action: NotifyAction,
    /// True until a delivery attempt succeeds.
    pub awaiting: bool,
    pub summary: String,
    pub receiver_email: String,
    pub created: DateTime<Utc>,
}

/// An e-mail ready to hand to the outbound mailer.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: Option<String>,
}
