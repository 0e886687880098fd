// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message ingestion.
//!
//! Each parsed message is correlated to its request through the address
//! codec, appended to the thread exactly once, and reflected in the request
//! status. Unroutable messages are reported, not retried: the poll loop
//! marks them seen regardless, which is the deliberate don't-reprocess-spam
//! policy. One message's failure never aborts the rest of the batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use civiq_core::types::NewThreadEntry;
use civiq_core::{
    CiviqError, DomainEvent, OutboundEmail, OutboundMailer, Request, Store, TemplateContext,
    TemplateRenderer, lifecycle,
};
use civiq_mail::{AddressCodec, MailboxClient, MessageParser, ParsedMessage};

use crate::attachments::AttachmentStore;

/// Why a message could not be ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmatchedReason {
    /// No recipient address carried a correlation token.
    NoCorrelationToken,
    /// A token was present but no such request exists.
    RequestNotFound,
}

/// One message that was examined but not ingested.
#[derive(Debug, Clone)]
pub struct Unmatched {
    pub reason: UnmatchedReason,
    pub from: String,
    pub to: String,
    pub subject: String,
}

/// Outcome of one ingestion batch.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub processed: usize,
    /// Thread entry ids created this batch.
    pub ingested: Vec<i64>,
    /// Messages skipped because their entry already existed.
    pub duplicates: usize,
    pub unmatched: Vec<Unmatched>,
    /// Non-fatal per-message failures (attachment writes, report sends).
    pub errors: Vec<String>,
    /// Domain events for the dispatch step.
    pub events: Vec<DomainEvent>,
}

/// Settings the ingester needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// From address for the response-received report to the requester.
    pub from_address: String,
    /// Attachments beyond this count per message are dropped with an error.
    pub max_attachments: usize,
}

/// Consumes parsed messages and appends them to request threads.
pub struct ThreadIngester {
    store: Arc<dyn Store>,
    mailer: Arc<dyn OutboundMailer>,
    templates: Arc<dyn TemplateRenderer>,
    attachments: AttachmentStore,
    codec: AddressCodec,
    settings: IngestSettings,
}

impl ThreadIngester {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn OutboundMailer>,
        templates: Arc<dyn TemplateRenderer>,
        attachments: AttachmentStore,
        codec: AddressCodec,
        settings: IngestSettings,
    ) -> Self {
        Self {
            store,
            mailer,
            templates,
            attachments,
            codec,
            settings,
        }
    }

    /// One full poll of a mailbox: fetch unseen, parse, ingest, mark seen.
    ///
    /// Every message that parsed is marked seen afterwards, matched or not;
    /// only a wholly unparseable fetch stays unseen for a later retry. A
    /// fetch failure aborts this mailbox only, so the caller can continue
    /// with its other mailboxes.
    pub async fn poll_mailbox(
        &self,
        mailbox: &dyn MailboxClient,
        parser: &MessageParser,
        now: DateTime<Utc>,
    ) -> Result<IngestReport, CiviqError> {
        let raw_messages = mailbox.fetch_unseen().await?;

        let mut parsed = Vec::with_capacity(raw_messages.len());
        let mut processed_uids = Vec::with_capacity(raw_messages.len());
        for raw in &raw_messages {
            match parser.parse(&raw.raw, now) {
                Some(message) => {
                    parsed.push(message);
                    processed_uids.push(raw.uid);
                }
                None => {
                    warn!(mailbox = mailbox.name(), uid = raw.uid,
                          "unparseable message left unseen for retry");
                }
            }
        }

        let mut report = self.ingest(&parsed, now).await;
        if let Err(e) = mailbox.mark_seen(&processed_uids).await {
            warn!(mailbox = mailbox.name(), error = %e, "marking messages seen failed");
            report
                .errors
                .push(format!("mailbox {}: marking seen failed: {e}", mailbox.name()));
        }
        Ok(report)
    }

    /// Ingest one batch of parsed messages, in mailbox order.
    pub async fn ingest(&self, messages: &[ParsedMessage], now: DateTime<Utc>) -> IngestReport {
        let mut report = IngestReport::default();
        for message in messages {
            report.processed += 1;
            if let Err(e) = self.ingest_one(message, now, &mut report).await {
                // Storage-level failure for this message; the rest of the
                // batch still runs.
                warn!(error = %e, subject = message.subject(), "message ingestion failed");
                report.errors.push(format!(
                    "ingestion of `{}` failed: {e}",
                    message.subject()
                ));
            }
        }
        report
    }

    async fn ingest_one(
        &self,
        message: &ParsedMessage,
        now: DateTime<Utc>,
        report: &mut IngestReport,
    ) -> Result<(), CiviqError> {
        let Some(request_id) = self.codec.decode(message.to()) else {
            warn!(to = message.to(), "no correlation token in recipient list, possible spam");
            report.unmatched.push(unmatched(message, UnmatchedReason::NoCorrelationToken));
            return Ok(());
        };

        let Some(request) = self.store.find_request(request_id).await? else {
            warn!(request_id, "correlation token does not resolve to a request");
            report.unmatched.push(unmatched(message, UnmatchedReason::RequestNotFound));
            return Ok(());
        };

        let fingerprint = fingerprint(message);
        if self
            .store
            .find_entry_by_fingerprint(request.id, &fingerprint)
            .await?
            .is_some()
        {
            report.duplicates += 1;
            return Ok(());
        }

        let entry_id = self
            .store
            .append_entry(&NewThreadEntry {
                request_id: request.id,
                is_response: true,
                email_from: message.from().to_string(),
                email_to: message.to().to_string(),
                subject: message.subject().to_string(),
                body: message.body.clone(),
                fingerprint,
                created: now,
            })
            .await?;
        self.store.set_latest_entry(request.id, entry_id).await?;

        let new_status = lifecycle::on_response(request.status);
        self.store
            .update_request_status(request.id, new_status)
            .await?;
        info!(request_id = request.id, entry_id, "response appended to thread");

        self.store_attachments(message, entry_id, now, report).await?;

        // The report to the requester is best-effort; the entry stands
        // whether or not the mail goes out.
        if let Err(e) = self.send_response_report(&request, now).await {
            warn!(request_id = request.id, error = %e, "response-received report failed");
            report
                .errors
                .push(format!("report for request {} failed: {e}", request.id));
        }

        report.events.push(DomainEvent::ResponseReceived {
            request_id: request.id,
            organization_id: request.organization_id,
            entry_id,
            summary: format!("New message in the thread of request {}", request.id),
        });
        report.ingested.push(entry_id);
        Ok(())
    }

    async fn store_attachments(
        &self,
        message: &ParsedMessage,
        entry_id: i64,
        now: DateTime<Utc>,
        report: &mut IngestReport,
    ) -> Result<(), CiviqError> {
        if message.attachments.is_empty() {
            return Ok(());
        }

        let dir_name = self.message_dir_name(message.to(), entry_id);
        let stamp = now.format("%d-%m-%Y_%H-%M").to_string();

        for (index, attachment) in message.attachments.iter().enumerate() {
            if index >= self.settings.max_attachments {
                report.errors.push(format!(
                    "entry {entry_id}: attachment `{}` dropped, limit of {} per message",
                    attachment.filename, self.settings.max_attachments
                ));
                continue;
            }

            let size = attachment.data.len() as i64;
            let filename = crate::attachments::sanitize_filename(&attachment.filename);
            if self
                .store
                .find_attachment(entry_id, &filename, size)
                .await?
                .is_some()
            {
                continue;
            }

            // A write failure is recorded against the batch but never rolls
            // back the entry; the message body is preserved regardless.
            match self.attachments.store(&dir_name, &stamp, attachment).await {
                Ok(stored) => {
                    self.store
                        .create_attachment(&civiq_core::types::NewAttachment {
                            entry_id,
                            filename: stored.filename,
                            filetype: stored.filetype,
                            filesize: stored.filesize,
                            path: stored.path,
                        })
                        .await?;
                }
                Err(e) => {
                    warn!(entry_id, filename = %attachment.filename, error = %e,
                          "attachment not saved");
                    report.errors.push(format!(
                        "entry {entry_id}: attachment `{}` not saved: {e}",
                        attachment.filename
                    ));
                }
            }
        }
        Ok(())
    }

    /// Per-message attachment directory, derived from the matched recipient
    /// local part with dots flattened to underscores.
    fn message_dir_name(&self, to_header: &str, entry_id: i64) -> String {
        self.codec
            .matched_address(to_header)
            .and_then(|addr| addr.split('@').next())
            .map(|local| local.replace('.', "_"))
            .unwrap_or_else(|| format!("entry_{entry_id}"))
    }

    async fn send_response_report(
        &self,
        request: &Request,
        now: DateTime<Utc>,
    ) -> Result<(), CiviqError> {
        let Some(user) = self.store.find_user(request.user_id).await? else {
            return Err(CiviqError::Internal(format!(
                "request {} has no requester record",
                request.id
            )));
        };
        let organization = self.store.find_organization(request.organization_id).await?;

        let request_date = request.created.format("%d %B %Y").to_string();
        let body = self.templates.render(
            "response_received",
            &TemplateContext {
                domain: self.codec.domain().to_string(),
                request_id: Some(request.id),
                request_date: Some(request_date.clone()),
                organization: organization.map(|o| o.name),
                requester: Some(user.name.clone()),
                summary: Some(request.summary.clone()),
                info_email: None,
                elapsed_days: Some((now - request.created).num_days()),
            },
        )?;
        self.mailer
            .send(&OutboundEmail {
                subject: format!(
                    "The response received for the Public Information Request {} from {}",
                    request.id, request_date
                ),
                body,
                from: self.settings.from_address.clone(),
                to: vec![user.email],
                reply_to: None,
            })
            .await
    }
}

/// Entry fingerprint: the Message-ID when the message carries one, else a
/// digest over the addressing fields and body.
pub fn fingerprint(message: &ParsedMessage) -> String {
    match message.message_id() {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => {
            let mut hasher = Sha256::new();
            for field in [
                message.from(),
                message.to(),
                message.subject(),
                message.body.as_str(),
            ] {
                hasher.update(field.as_bytes());
                hasher.update([0u8]);
            }
            format!("sha256:{:x}", hasher.finalize())
        }
    }
}

fn unmatched(message: &ParsedMessage, reason: UnmatchedReason) -> Unmatched {
    Unmatched {
        reason,
        from: message.from().to_string(),
        to: message.to().to_string(),
        subject: message.subject().to_string(),
    }
}
