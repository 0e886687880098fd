// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring: build the pipelines from configuration and run single passes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use civiq_config::CiviqConfig;
use civiq_core::{CiviqError, OutboundMailer, Store, TemplateRenderer};
use civiq_engine::{
    AttachmentStore, IngestSettings, NotificationDispatcher, OverdueScheduler, OverdueSettings,
    StockTemplates, ThreadIngester,
};
use civiq_mail::{AddressCodec, ImapMailbox, MailboxClient, MessageParser, SmtpMailer};
use civiq_storage::SqliteStore;

/// Everything the subcommands need, built once from configuration.
pub struct App {
    pub config: CiviqConfig,
    pub store: Arc<SqliteStore>,
    pub parser: MessageParser,
    pub ingester: ThreadIngester,
    pub scheduler: OverdueScheduler,
    pub dispatcher: NotificationDispatcher,
    mailboxes: Vec<ImapMailbox>,
}

impl App {
    pub async fn build(config: CiviqConfig) -> Result<Self, CiviqError> {
        let store = Arc::new(SqliteStore::open(&config.storage).await?);
        let mailer: Arc<dyn OutboundMailer> = Arc::new(SmtpMailer::new(&config.smtp)?);
        let templates: Arc<dyn TemplateRenderer> = Arc::new(StockTemplates::new());
        let codec = AddressCodec::new(&config.service.domain);
        let dyn_store: Arc<dyn Store> = store.clone();

        let ingester = ThreadIngester::new(
            dyn_store.clone(),
            mailer.clone(),
            templates.clone(),
            AttachmentStore::new(&config.attachments.root_dir, config.attachments.max_filesize),
            codec.clone(),
            IngestSettings {
                from_address: config.smtp.from_address.clone(),
                max_attachments: config.attachments.max_count,
            },
        );
        let scheduler = OverdueScheduler::new(
            dyn_store.clone(),
            mailer.clone(),
            templates.clone(),
            codec.clone(),
            OverdueSettings {
                overdue_days: config.requests.overdue_days,
                from_address: config.smtp.from_address.clone(),
                info_address: config.service.info_address(),
            },
        );
        let dispatcher = NotificationDispatcher::new(
            dyn_store,
            mailer,
            templates,
            &config.service.domain,
            &config.smtp.from_address,
        );

        let fetch_timeout = Duration::from_secs(config.scheduler.fetch_timeout_secs);
        let mailboxes = config
            .mailboxes
            .iter()
            .map(|(name, mailbox)| ImapMailbox::new(name, mailbox.clone(), fetch_timeout))
            .collect();

        Ok(Self {
            config,
            store,
            parser: MessageParser::new(),
            ingester,
            scheduler,
            dispatcher,
            mailboxes,
        })
    }

    /// Poll mailboxes for responses and record the resulting events.
    ///
    /// With `selection` empty every configured mailbox is polled; names that
    /// match no configuration are warned about and skipped. A failing
    /// mailbox never stops the others.
    pub async fn poll_mail(&self, selection: &[String], now: DateTime<Utc>) {
        let targets: Vec<&ImapMailbox> = if selection.is_empty() {
            self.mailboxes.iter().collect()
        } else {
            selection
                .iter()
                .filter_map(|name| {
                    let found = self.mailboxes.iter().find(|m| m.name() == name);
                    if found.is_none() {
                        warn!(mailbox = %name, "mailbox not found in configuration");
                    }
                    found
                })
                .collect()
        };
        if targets.is_empty() {
            warn!("no mailboxes to poll");
            return;
        }

        for mailbox in targets {
            match self.ingester.poll_mailbox(mailbox, &self.parser, now).await {
                Ok(report) => {
                    info!(
                        mailbox = mailbox.name(),
                        processed = report.processed,
                        ingested = report.ingested.len(),
                        unmatched = report.unmatched.len(),
                        duplicates = report.duplicates,
                        "mail check complete"
                    );
                    for problem in &report.errors {
                        warn!(mailbox = mailbox.name(), "{problem}");
                    }
                    if let Err(e) = self.dispatcher.record_events(&report.events, now).await {
                        error!(mailbox = mailbox.name(), error = %e,
                               "recording notification events failed");
                    }
                }
                Err(e) => {
                    // Isolated per mailbox; the others still get their turn.
                    error!(mailbox = mailbox.name(), error = %e, "mailbox poll failed");
                }
            }
        }
    }

    /// Run one overdue escalation sweep and record the resulting events.
    pub async fn sweep_overdue(&self, now: DateTime<Utc>) {
        let report = self.scheduler.sweep(now).await;
        for problem in &report.errors {
            warn!("{problem}");
        }
        if let Err(e) = self.dispatcher.record_events(&report.events, now).await {
            error!(error = %e, "recording notification events failed");
        }
    }

    /// Attempt delivery of all awaiting notifications.
    pub async fn deliver_notifications(&self) {
        if let Err(e) = self.dispatcher.deliver_pending().await {
            error!(error = %e, "notification sweep failed");
        }
    }

    pub async fn shutdown(&self) -> Result<(), CiviqError> {
        self.store.close().await
    }
}
