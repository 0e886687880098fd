// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline tests: mailbox -> parser -> ingester -> lifecycle ->
//! dispatcher, against a real SQLite store and recorded outbound mail.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use civiq_config::model::StorageConfig;
use civiq_core::types::{NotifyAction, RequestStatus, SubscribedItem, User};
use civiq_core::{DomainEvent, Store};
use civiq_engine::ingest::UnmatchedReason;
use civiq_engine::{
    AttachmentStore, IngestSettings, NotificationDispatcher, OverdueScheduler, OverdueSettings,
    StockTemplates, ThreadIngester,
};
use civiq_mail::{AddressCodec, MessageParser};
use civiq_test_utils::{RecordingMailer, ScriptedMailbox, mime};

const DOMAIN: &str = "example.org";
const OVERDUE_DAYS: u32 = 16;

struct Harness {
    store: Arc<civiq_storage::SqliteStore>,
    mailer: Arc<RecordingMailer>,
    ingester: ThreadIngester,
    scheduler: OverdueScheduler,
    dispatcher: NotificationDispatcher,
    parser: MessageParser,
    user_id: i64,
    org_id: i64,
    _dir: tempfile::TempDir,
}

impl Harness {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            civiq_storage::SqliteStore::open(&StorageConfig {
                database_path: dir.path().join("civiq.db").to_str().unwrap().to_string(),
                wal_mode: true,
            })
            .await
            .unwrap(),
        );
        let mailer = Arc::new(RecordingMailer::new());
        let templates = Arc::new(StockTemplates::new());
        let codec = AddressCodec::new(DOMAIN);

        let dyn_store: Arc<dyn Store> = store.clone();
        let dyn_mailer: Arc<dyn civiq_core::OutboundMailer> = mailer.clone();

        let ingester = ThreadIngester::new(
            dyn_store.clone(),
            dyn_mailer.clone(),
            templates.clone(),
            AttachmentStore::new(dir.path().join("attachments"), 15_728_640),
            codec.clone(),
            IngestSettings {
                from_address: format!("requests@{DOMAIN}"),
                max_attachments: 5,
            },
        );
        let scheduler = OverdueScheduler::new(
            dyn_store.clone(),
            dyn_mailer.clone(),
            templates.clone(),
            codec.clone(),
            OverdueSettings {
                overdue_days: OVERDUE_DAYS,
                from_address: format!("requests@{DOMAIN}"),
                info_address: format!("info@{DOMAIN}"),
            },
        );
        let dispatcher = NotificationDispatcher::new(
            dyn_store,
            dyn_mailer,
            templates,
            DOMAIN,
            &format!("requests@{DOMAIN}"),
        );

        let user_id = store
            .create_user("Jane Doe", "jane@people.example.com")
            .await
            .unwrap();
        let org_id = store
            .create_organization("Town Hall", "clerk@town.example.com", true)
            .await
            .unwrap();

        Self {
            store,
            mailer,
            ingester,
            scheduler,
            dispatcher,
            parser: MessageParser::new(),
            user_id,
            org_id,
            _dir: dir,
        }
    }

    /// Create a request with an explicit id so addresses in fixtures can be
    /// written out literally.
    async fn seed_request(&self, id: i64, created: DateTime<Utc>) -> i64 {
        let (user_id, org_id) = (self.user_id, self.org_id);
        let created = created.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        self.store
            .database()
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO requests (id, user_id, organization_id, status, created_at, summary)
                     VALUES (?1, ?2, ?3, 'in_progress', ?4, 'Road maintenance budget')",
                    rusqlite::params![id, user_id, org_id, created],
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .unwrap();
        id
    }

    async fn request_status(&self, id: i64) -> RequestStatus {
        self.store.find_request(id).await.unwrap().unwrap().status
    }

    fn user(&self) -> User {
        User {
            id: self.user_id,
            name: "Jane Doe".to_string(),
            email: "jane@people.example.com".to_string(),
        }
    }
}

fn day(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, n, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn correlates_and_appends_exactly_one_entry() {
    let h = Harness::new().await;
    h.seed_request(417, day(1)).await;

    let raw = mime::plain_reply(
        "Clerk <clerk@town.example.com>",
        "Jane Doe <jane.doe.417@example.org>, spam@other.org",
        "Re: Road maintenance budget",
        "resp-1@town.example.com",
        "The figures are attached to the next message.",
    );
    let parsed = h.parser.parse(raw.as_bytes(), day(5)).unwrap();
    let report = h.ingester.ingest(&[parsed], day(5)).await;

    assert_eq!(report.ingested.len(), 1);
    assert!(report.unmatched.is_empty());

    let entries = h.store.list_entries(417).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_response);
    assert_eq!(entries[0].email_from, "Clerk <clerk@town.example.com>");

    let request = h.store.find_request(417).await.unwrap().unwrap();
    assert_eq!(request.status, RequestStatus::AwaitingClassification);
    assert_eq!(request.latest_entry, Some(entries[0].id));
}

#[tokio::test]
async fn unmatched_mail_is_reported_not_ingested() {
    let h = Harness::new().await;
    h.seed_request(417, day(1)).await;

    let raw = mime::plain_reply(
        "someone@somewhere.example.com",
        "info@example.org",
        "hello",
        "m-1@somewhere.example.com",
        "no token here",
    );
    let parsed = h.parser.parse(raw.as_bytes(), day(5)).unwrap();
    let report = h.ingester.ingest(&[parsed], day(5)).await;

    assert!(report.ingested.is_empty());
    assert_eq!(report.unmatched.len(), 1);
    assert_eq!(report.unmatched[0].reason, UnmatchedReason::NoCorrelationToken);
    assert!(h.store.list_entries(417).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_request_gets_a_distinct_unmatched_reason() {
    let h = Harness::new().await;

    let raw = mime::plain_reply(
        "clerk@town.example.com",
        "jane.doe.999@example.org",
        "Re: ?",
        "m-2@town.example.com",
        "reply to a request that does not exist",
    );
    let parsed = h.parser.parse(raw.as_bytes(), day(5)).unwrap();
    let report = h.ingester.ingest(&[parsed], day(5)).await;

    assert_eq!(report.unmatched.len(), 1);
    assert_eq!(report.unmatched[0].reason, UnmatchedReason::RequestNotFound);
}

#[tokio::test]
async fn reingesting_the_same_message_is_idempotent() {
    let h = Harness::new().await;
    h.seed_request(417, day(1)).await;

    let raw = mime::reply_with_attachment(
        "clerk@town.example.com",
        "jane.doe.417@example.org",
        "Re: Road maintenance budget",
        "resp-1@town.example.com",
        "see attached",
        "answer.pdf",
    );
    let parsed = h.parser.parse(raw.as_bytes(), day(5)).unwrap();

    let first = h.ingester.ingest(std::slice::from_ref(&parsed), day(5)).await;
    assert_eq!(first.ingested.len(), 1);
    let entry_id = first.ingested[0];

    // Retry of the same message, as after a crash between ingest and
    // mark-seen.
    let second = h.ingester.ingest(&[parsed], day(5)).await;
    assert!(second.ingested.is_empty());
    assert_eq!(second.duplicates, 1);

    assert_eq!(h.store.list_entries(417).await.unwrap().len(), 1);
    let attachments = h.store.list_attachments(entry_id).await.unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].filename, "answer.pdf");
    assert_eq!(attachments[0].filetype, "pdf");
}

#[tokio::test]
async fn response_moves_overdue_request_to_awaiting_classification() {
    let h = Harness::new().await;
    h.seed_request(417, day(1)).await;

    for tier in [RequestStatus::Overdue, RequestStatus::LongOverdue] {
        h.store.update_request_status(417, tier).await.unwrap();
        let raw = mime::plain_reply(
            "clerk@town.example.com",
            "jane.doe.417@example.org",
            "Re: finally",
            &format!("late-{tier}@town.example.com"),
            "apologies for the delay",
        );
        let parsed = h.parser.parse(raw.as_bytes(), day(20)).unwrap();
        h.ingester.ingest(&[parsed], day(20)).await;
        assert_eq!(
            h.request_status(417).await,
            RequestStatus::AwaitingClassification,
            "a response must clear the {tier} tier"
        );
    }
}

#[tokio::test]
async fn ingestion_sends_response_report_to_requester() {
    let h = Harness::new().await;
    h.seed_request(417, day(1)).await;

    let raw = mime::plain_reply(
        "clerk@town.example.com",
        "jane.doe.417@example.org",
        "Re: Road maintenance budget",
        "resp-9@town.example.com",
        "answer",
    );
    let parsed = h.parser.parse(raw.as_bytes(), day(5)).unwrap();
    h.ingester.ingest(&[parsed], day(5)).await;

    let sent = h.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["jane@people.example.com".to_string()]);
    assert!(
        sent[0]
            .subject
            .contains("The response received for the Public Information Request 417")
    );
}

#[tokio::test]
async fn two_tier_overdue_escalation() {
    let h = Harness::new().await;
    // Created 20 days before the first sweep, OVERDUE_DAYS = 16.
    h.seed_request(417, day(1)).await;

    let first = h.scheduler.sweep(day(21)).await;
    assert_eq!(first.overdue, vec![417]);
    assert!(first.long_overdue.is_empty());
    assert_eq!(h.request_status(417).await, RequestStatus::Overdue);

    // Reminder to the organization plus report to the requester.
    let sent = h.mailer.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, vec!["clerk@town.example.com".to_string()]);
    assert_eq!(
        sent[0].reply_to.as_deref(),
        Some("jane-doe.417@example.org"),
        "reminder replies must route back to the request"
    );
    assert_eq!(sent[1].to, vec!["jane@people.example.com".to_string()]);

    // Day 33: past 2 * 16 days.
    let second = h.scheduler.sweep(day(1) + Duration::days(32)).await;
    assert_eq!(second.long_overdue, vec![417]);
    assert_eq!(h.request_status(417).await, RequestStatus::LongOverdue);
    let sent = h.mailer.sent().await;
    assert!(sent[2].subject.contains("long overdue"));
}

#[tokio::test]
async fn sweep_does_not_escalate_before_the_threshold() {
    let h = Harness::new().await;
    h.seed_request(417, day(1)).await;

    // One second short of 16 days.
    let report = h
        .scheduler
        .sweep(day(17) - Duration::seconds(1))
        .await;
    assert!(report.overdue.is_empty());
    assert_eq!(h.request_status(417).await, RequestStatus::InProgress);
}

#[tokio::test]
async fn answered_requests_are_never_escalated() {
    let h = Harness::new().await;
    h.seed_request(417, day(1)).await;

    let raw = mime::plain_reply(
        "clerk@town.example.com",
        "jane.doe.417@example.org",
        "Re: answer",
        "resp-1@town.example.com",
        "here you go",
    );
    let parsed = h.parser.parse(raw.as_bytes(), day(2)).unwrap();
    h.ingester.ingest(&[parsed], day(2)).await;

    let report = h.scheduler.sweep(day(1) + Duration::days(100)).await;
    assert!(report.overdue.is_empty());
    assert!(report.long_overdue.is_empty());
    assert_eq!(
        h.request_status(417).await,
        RequestStatus::AwaitingClassification
    );
}

#[tokio::test]
async fn send_failure_never_blocks_the_status_transition() {
    let h = Harness::new().await;
    h.seed_request(417, day(1)).await;

    h.mailer.fail_sends(true);
    let report = h.scheduler.sweep(day(21)).await;

    assert_eq!(report.overdue, vec![417]);
    assert_eq!(report.send_failures, 1);
    assert_eq!(h.request_status(417).await, RequestStatus::Overdue);
}

#[tokio::test]
async fn notification_fan_out_is_exactly_once_per_receiver() {
    let h = Harness::new().await;
    h.seed_request(417, day(1)).await;
    let request = h.store.find_request(417).await.unwrap().unwrap();

    let follower = User {
        id: h
            .store
            .create_user("Watcher", "watcher@people.example.com")
            .await
            .unwrap(),
        name: "Watcher".to_string(),
        email: "watcher@people.example.com".to_string(),
    };
    h.dispatcher.follow_request(&request, &h.user()).await.unwrap();
    h.dispatcher.follow_request(&request, &follower).await.unwrap();

    let events = [DomainEvent::ResponseReceived {
        request_id: 417,
        organization_id: h.org_id,
        entry_id: 1,
        summary: "New message in the thread of request 417".to_string(),
    }];

    // Fired twice before any delivery: still one event per receiver.
    let created_first = h.dispatcher.record_events(&events, day(5)).await.unwrap();
    let created_again = h.dispatcher.record_events(&events, day(5)).await.unwrap();
    assert_eq!(created_first, 2, "one per follower");
    assert_eq!(created_again, 0, "duplicate fire is a no-op");

    let pending = h.store.list_awaiting_notifications().await.unwrap();
    assert_eq!(pending.len(), 2);

    let delivery = h.dispatcher.deliver_pending().await.unwrap();
    assert_eq!(delivery.delivered, 2);
    assert_eq!(h.mailer.sent_count().await, 2);

    // A later sweep has nothing left to do.
    let idle = h.dispatcher.deliver_pending().await.unwrap();
    assert_eq!(idle.delivered, 0);
}

#[tokio::test]
async fn failed_delivery_stays_awaiting_for_the_next_sweep() {
    let h = Harness::new().await;
    h.seed_request(417, day(1)).await;
    let request = h.store.find_request(417).await.unwrap().unwrap();
    h.dispatcher.follow_request(&request, &h.user()).await.unwrap();

    let events = [DomainEvent::ResponseReceived {
        request_id: 417,
        organization_id: h.org_id,
        entry_id: 1,
        summary: "New message in the thread of request 417".to_string(),
    }];
    h.dispatcher.record_events(&events, day(5)).await.unwrap();

    h.mailer.fail_sends(true);
    let failed = h.dispatcher.deliver_pending().await.unwrap();
    assert_eq!(failed.failed, 1);
    assert_eq!(failed.delivered, 0);

    h.mailer.fail_sends(false);
    let retried = h.dispatcher.deliver_pending().await.unwrap();
    assert_eq!(retried.delivered, 1);
}

#[tokio::test]
async fn activation_notice_is_held_until_the_record_is_active() {
    let h = Harness::new().await;
    let org_id = h
        .store
        .create_organization("New Agency", "desk@agency.example.com", false)
        .await
        .unwrap();
    let organization = h.store.find_organization(org_id).await.unwrap().unwrap();
    h.dispatcher
        .watch_activation(&organization, &h.user())
        .await
        .unwrap();

    let events = [DomainEvent::RecordActivated {
        organization_id: org_id,
        summary: "New Agency".to_string(),
    }];
    h.dispatcher.record_events(&events, day(2)).await.unwrap();

    let held = h.dispatcher.deliver_pending().await.unwrap();
    assert_eq!(held.held, 1);
    assert_eq!(held.delivered, 0);

    h.store.set_organization_active(org_id, true).await.unwrap();
    let delivered = h.dispatcher.deliver_pending().await.unwrap();
    assert_eq!(delivered.delivered, 1);
    let sent = h.mailer.sent().await;
    assert!(sent[0].subject.contains("Record has become active"));
}

#[tokio::test]
async fn unfollow_stops_future_notifications() {
    let h = Harness::new().await;
    h.seed_request(417, day(1)).await;
    let request = h.store.find_request(417).await.unwrap().unwrap();
    h.dispatcher.follow_request(&request, &h.user()).await.unwrap();
    h.dispatcher
        .unfollow_request(417, "jane@people.example.com")
        .await
        .unwrap();

    let created = h
        .dispatcher
        .notify(
            SubscribedItem::Request(417),
            NotifyAction::NewMessage,
            "New message in the thread of request 417",
            day(5),
        )
        .await
        .unwrap();
    assert_eq!(created, 0);
}

#[tokio::test]
async fn poll_marks_processed_and_unmatched_seen() {
    let h = Harness::new().await;
    h.seed_request(417, day(1)).await;

    let mailbox = ScriptedMailbox::new("default");
    let matched_uid = mailbox
        .deliver(mime::plain_reply(
            "clerk@town.example.com",
            "jane.doe.417@example.org",
            "Re: budget",
            "resp-1@town.example.com",
            "answer",
        ))
        .await;
    let spam_uid = mailbox
        .deliver(mime::plain_reply(
            "noise@elsewhere.example.com",
            "info@example.org",
            "buy things",
            "spam-1@elsewhere.example.com",
            "spam",
        ))
        .await;
    let garbage_uid = mailbox.deliver(vec![0xff, 0xfe, 0x00]).await;

    let report = h
        .ingester
        .poll_mailbox(&mailbox, &h.parser, day(5))
        .await
        .unwrap();

    assert_eq!(report.ingested.len(), 1);
    assert_eq!(report.unmatched.len(), 1);

    let seen = mailbox.seen().await;
    assert!(seen.contains(&matched_uid));
    assert!(
        seen.contains(&spam_uid),
        "unroutable mail is marked seen so it is never retried"
    );
    assert!(
        !seen.contains(&garbage_uid),
        "an unparseable fetch stays unseen for retry"
    );

    // The next poll only sees the garbage message again.
    let again = h
        .ingester
        .poll_mailbox(&mailbox, &h.parser, day(5))
        .await
        .unwrap();
    assert_eq!(again.processed, 0);
}

#[tokio::test]
async fn unreachable_mailbox_fails_in_isolation() {
    let h = Harness::new().await;
    let mailbox = ScriptedMailbox::new("default");
    mailbox.set_unreachable(true).await;

    let result = h.ingester.poll_mailbox(&mailbox, &h.parser, day(5)).await;
    assert!(result.is_err(), "fetch failure surfaces to the caller");
}
