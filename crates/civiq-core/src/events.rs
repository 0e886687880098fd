// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain events produced by the ingester and the overdue scheduler.
//!
//! Components never fan notifications out as a side effect of saving.
//! Instead they return a list of these events, and the dispatcher consumes
//! the list in a separate step, which keeps the fan-out order explicit and
//! the event set directly assertable in tests.

use crate::types::RequestStatus;

/// Something happened that subscribers may care about.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// An inbound response was appended to a request's thread.
    ResponseReceived {
        request_id: i64,
        organization_id: i64,
        entry_id: i64,
        summary: String,
    },
    /// A user annotated a message in a request's thread.
    AnnotationAdded {
        request_id: i64,
        organization_id: i64,
        summary: String,
    },
    /// A request's status changed outside the ingest path (escalation or
    /// owner classification).
    StatusChanged {
        request_id: i64,
        organization_id: i64,
        from: RequestStatus,
        to: RequestStatus,
        summary: String,
    },
    /// An organization record passed moderation.
    RecordActivated {
        organization_id: i64,
        summary: String,
    },
}
