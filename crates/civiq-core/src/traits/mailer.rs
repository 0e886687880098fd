// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound mail delivery trait.

use async_trait::async_trait;

use crate::error::CiviqError;
use crate::types::OutboundEmail;

/// Best-effort outbound e-mail delivery.
///
/// Implementations must strip literal newlines from the subject before
/// handing it to the transport; a multi-line subject is a header injection
/// vector, not a formatting choice.
#[async_trait]
pub trait OutboundMailer: Send + Sync + 'static {
    /// Attempt to send one message. Failures are returned, never panicked;
    /// callers decide whether a failure blocks anything.
    async fn send(&self, mail: &OutboundEmail) -> Result<(), CiviqError>;
}
