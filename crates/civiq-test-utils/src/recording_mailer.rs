// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound mailer double that records instead of sending.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use civiq_core::{CiviqError, OutboundEmail, OutboundMailer};

/// Captures every [`OutboundEmail`] handed to it. Can be switched into a
/// failing mode to exercise the logged-failure paths.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far, in order.
    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Make every subsequent send fail (until switched back).
    pub fn fail_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl OutboundMailer for RecordingMailer {
    async fn send(&self, mail: &OutboundEmail) -> Result<(), CiviqError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CiviqError::Outbound {
                message: "send disabled by test".to_string(),
                source: None,
            });
        }
        self.sent.lock().await.push(mail.clone());
        Ok(())
    }
}
