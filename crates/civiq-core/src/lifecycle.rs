// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The request status state machine.
//!
//! These rules are the single authority for status transitions; both the
//! mail ingester and the overdue scheduler go through them. The functions
//! are pure so every transition is testable without storage.

use chrono::{DateTime, Utc};

use crate::error::CiviqError;
use crate::types::RequestStatus;

/// Status after an inbound response has been appended to the thread.
///
/// Receiving a response always moves the request to awaiting classification,
/// regardless of how long it sat in an overdue tier.
pub fn on_response(_current: RequestStatus) -> RequestStatus {
    RequestStatus::AwaitingClassification
}

/// Time-based escalation decision for one request.
///
/// Returns the escalated status, or `None` when nothing applies. Escalation
/// only ever targets requests that have received no response at all; terminal
/// classifications always win over the overdue track.
pub fn escalate(
    current: RequestStatus,
    created: DateTime<Utc>,
    now: DateTime<Utc>,
    overdue_days: u32,
    response_count: u64,
) -> Option<RequestStatus> {
    if response_count > 0 || current.is_terminal() {
        return None;
    }
    let age = now.signed_duration_since(created);
    let tier1 = chrono::Duration::days(i64::from(overdue_days));
    let tier2 = chrono::Duration::days(2 * i64::from(overdue_days));

    if age >= tier2
        && matches!(current, RequestStatus::InProgress | RequestStatus::Overdue)
    {
        return Some(RequestStatus::LongOverdue);
    }
    if age >= tier1 && current == RequestStatus::InProgress {
        return Some(RequestStatus::Overdue);
    }
    None
}

/// Owner classification of a response.
///
/// Only a request awaiting classification can be classified, and only into
/// one of the user-set terminal states.
pub fn classify(
    current: RequestStatus,
    verdict: RequestStatus,
) -> Result<RequestStatus, CiviqError> {
    if current != RequestStatus::AwaitingClassification {
        return Err(CiviqError::Internal(format!(
            "cannot classify a request in status `{current}`"
        )));
    }
    if !verdict.is_terminal() {
        return Err(CiviqError::Internal(format!(
            "`{verdict}` is not a classification outcome"
        )));
    }
    Ok(verdict)
}
