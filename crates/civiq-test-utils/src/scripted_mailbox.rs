// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mailbox client double serving pre-loaded messages.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use civiq_core::CiviqError;
use civiq_mail::{MailboxClient, RawMessage};

/// A mailbox whose unseen messages are loaded by the test. Marking a message
/// seen removes it from subsequent fetches, like a real mailbox.
pub struct ScriptedMailbox {
    name: String,
    unseen: Arc<Mutex<Vec<RawMessage>>>,
    seen: Arc<Mutex<Vec<u32>>>,
    unreachable: Arc<Mutex<bool>>,
}

impl ScriptedMailbox {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            unseen: Arc::new(Mutex::new(Vec::new())),
            seen: Arc::new(Mutex::new(Vec::new())),
            unreachable: Arc::new(Mutex::new(false)),
        }
    }

    /// Deliver a raw message into the mailbox with the next free uid.
    pub async fn deliver(&self, raw: impl Into<Vec<u8>>) -> u32 {
        let mut unseen = self.unseen.lock().await;
        let uid = unseen.iter().map(|m| m.uid).max().unwrap_or(0) + 1;
        unseen.push(RawMessage {
            uid,
            raw: raw.into(),
        });
        uid
    }

    /// Uids marked seen so far.
    pub async fn seen(&self) -> Vec<u32> {
        self.seen.lock().await.clone()
    }

    /// Simulate the mailbox becoming unreachable.
    pub async fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().await = unreachable;
    }
}

#[async_trait]
impl MailboxClient for ScriptedMailbox {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_unseen(&self) -> Result<Vec<RawMessage>, CiviqError> {
        if *self.unreachable.lock().await {
            return Err(CiviqError::Mailbox {
                message: "mailbox unreachable (scripted)".to_string(),
                source: None,
            });
        }
        Ok(self.unseen.lock().await.clone())
    }

    async fn mark_seen(&self, uids: &[u32]) -> Result<(), CiviqError> {
        if *self.unreachable.lock().await {
            return Err(CiviqError::Mailbox {
                message: "mailbox unreachable (scripted)".to_string(),
                source: None,
            });
        }
        let mut unseen = self.unseen.lock().await;
        unseen.retain(|m| !uids.contains(&m.uid));
        self.seen.lock().await.extend_from_slice(uids);
        Ok(())
    }
}
