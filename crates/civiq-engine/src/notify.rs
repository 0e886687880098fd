// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification fan-out.
//!
//! The dispatcher consumes domain events in two steps: `record_events`
//! creates at most one awaiting notification per (interest, action, summary),
//! and `deliver_pending` attempts delivery, leaving failed events awaiting
//! for the next sweep. Activation notices are held back until the
//! organization record is actually active.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use civiq_core::types::{Interest, NotificationEvent};
use civiq_core::{
    CiviqError, DomainEvent, NotifyAction, Organization, OutboundEmail, OutboundMailer, Request,
    Store, SubscribedItem, TemplateContext, TemplateRenderer, User,
};

/// Outcome of one delivery sweep.
#[derive(Debug, Default, PartialEq)]
pub struct DeliveryReport {
    pub delivered: usize,
    /// Sends that failed; the events stay awaiting.
    pub failed: usize,
    /// Activation notices held back because the record is not active yet.
    pub held: usize,
}

/// Fans domain events out to subscribers and delivers pending notifications.
pub struct NotificationDispatcher {
    store: Arc<dyn Store>,
    mailer: Arc<dyn OutboundMailer>,
    templates: Arc<dyn TemplateRenderer>,
    domain: String,
    from_address: String,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn OutboundMailer>,
        templates: Arc<dyn TemplateRenderer>,
        domain: &str,
        from_address: &str,
    ) -> Self {
        Self {
            store,
            mailer,
            templates,
            domain: domain.to_string(),
            from_address: from_address.to_string(),
        }
    }

    /// Create notification events for every subscriber affected by `events`.
    ///
    /// Returns the number of newly created events; repeats of an already
    /// recorded event are no-ops.
    pub async fn record_events(
        &self,
        events: &[DomainEvent],
        now: DateTime<Utc>,
    ) -> Result<usize, CiviqError> {
        let mut created = 0;
        for event in events {
            for (item, action, summary) in fan_out(event) {
                created += self.notify(item, action, &summary, now).await?;
            }
        }
        Ok(created)
    }

    /// Ensure one awaiting event per interested receiver of (item, action).
    pub async fn notify(
        &self,
        item: SubscribedItem,
        action: NotifyAction,
        summary: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, CiviqError> {
        let mut created = 0;
        for interest in self.store.list_interests(item, action).await? {
            let receiver_email = self.resolve_receiver(&interest).await?;
            if self
                .store
                .ensure_notification(interest.id, action, summary, &receiver_email, now)
                .await?
            {
                created += 1;
            }
        }
        if created > 0 {
            debug!(?item, %action, created, "notification events recorded");
        }
        Ok(created)
    }

    /// The registered user's current email wins; the address stored on the
    /// interest is the fallback for receivers outside the system.
    async fn resolve_receiver(&self, interest: &Interest) -> Result<String, CiviqError> {
        if let Some(user_id) = interest.receiver_user
            && let Some(user) = self.store.find_user(user_id).await?
        {
            return Ok(user.email);
        }
        Ok(interest.receiver_email.clone())
    }

    /// Attempt delivery of every awaiting event.
    pub async fn deliver_pending(&self) -> Result<DeliveryReport, CiviqError> {
        let mut report = DeliveryReport::default();
        for event in self.store.list_awaiting_notifications().await? {
            if event.action == NotifyAction::Active && !self.activation_ready(&event).await? {
                report.held += 1;
                continue;
            }
            match self.deliver(&event).await {
                Ok(()) => {
                    self.store.mark_notification_delivered(event.id).await?;
                    report.delivered += 1;
                }
                Err(e) => {
                    // Stays awaiting; the next sweep retries.
                    warn!(event_id = event.id, error = %e, "notification delivery failed");
                    report.failed += 1;
                }
            }
        }
        if report != DeliveryReport::default() {
            info!(
                delivered = report.delivered,
                failed = report.failed,
                held = report.held,
                "notification sweep complete"
            );
        }
        Ok(report)
    }

    /// An `active` notice only goes out once the record passed moderation.
    async fn activation_ready(&self, event: &NotificationEvent) -> Result<bool, CiviqError> {
        let Some(interest) = self.store.find_interest(event.interest_id).await? else {
            return Ok(false);
        };
        match interest.item {
            SubscribedItem::Organization(org_id) => Ok(self
                .store
                .find_organization(org_id)
                .await?
                .is_some_and(|org| org.active)),
            SubscribedItem::Request(_) => Ok(true),
        }
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<(), CiviqError> {
        let body = self.templates.render(
            &format!("notification_{}", event.action),
            &TemplateContext {
                domain: self.domain.clone(),
                summary: Some(event.summary.clone()),
                ..TemplateContext::default()
            },
        )?;
        self.mailer
            .send(&OutboundEmail {
                subject: format!("{}: {}", event.action.display_label(), event.summary),
                body,
                from: self.from_address.clone(),
                to: vec![event.receiver_email.clone()],
                reply_to: None,
            })
            .await
    }

    // --- Subscription management ---

    /// Follow a request: thread messages and annotations.
    pub async fn follow_request(&self, request: &Request, user: &User) -> Result<(), CiviqError> {
        let item = SubscribedItem::Request(request.id);
        let summary = truncate(&request.summary, 50);
        for action in [NotifyAction::NewMessage, NotifyAction::Annotation] {
            self.store
                .add_interest(item, &summary, action, Some(user.id), &user.email)
                .await?;
        }
        Ok(())
    }

    pub async fn unfollow_request(
        &self,
        request_id: i64,
        receiver_email: &str,
    ) -> Result<(), CiviqError> {
        self.store
            .remove_interests(SubscribedItem::Request(request_id), receiver_email)
            .await
    }

    /// Follow an organization: new messages and responses across its requests.
    pub async fn follow_organization(
        &self,
        organization: &Organization,
        user: &User,
    ) -> Result<(), CiviqError> {
        let item = SubscribedItem::Organization(organization.id);
        for action in [NotifyAction::NewMessage, NotifyAction::ResponseFrom] {
            self.store
                .add_interest(item, &organization.name, action, Some(user.id), &user.email)
                .await?;
        }
        Ok(())
    }

    /// Register the submitter of a new organization record for the one-shot
    /// activation notice.
    pub async fn watch_activation(
        &self,
        organization: &Organization,
        user: &User,
    ) -> Result<(), CiviqError> {
        self.store
            .add_interest(
                SubscribedItem::Organization(organization.id),
                &organization.name,
                NotifyAction::Active,
                Some(user.id),
                &user.email,
            )
            .await?;
        Ok(())
    }
}

/// Map one domain event onto the (item, action) pairs it notifies.
fn fan_out(event: &DomainEvent) -> Vec<(SubscribedItem, NotifyAction, String)> {
    match event {
        DomainEvent::ResponseReceived {
            request_id,
            organization_id,
            summary,
            ..
        } => {
            let mut targets = Vec::new();
            for action in [NotifyAction::NewMessage, NotifyAction::ResponseFrom] {
                targets.push((SubscribedItem::Request(*request_id), action, summary.clone()));
                targets.push((
                    SubscribedItem::Organization(*organization_id),
                    action,
                    summary.clone(),
                ));
            }
            targets
        }
        DomainEvent::AnnotationAdded {
            request_id,
            organization_id,
            summary,
        } => vec![
            (
                SubscribedItem::Request(*request_id),
                NotifyAction::Annotation,
                summary.clone(),
            ),
            (
                SubscribedItem::Organization(*organization_id),
                NotifyAction::Annotation,
                summary.clone(),
            ),
        ],
        DomainEvent::StatusChanged {
            request_id,
            organization_id,
            summary,
            ..
        } => vec![
            (
                SubscribedItem::Request(*request_id),
                NotifyAction::Update,
                summary.clone(),
            ),
            (
                SubscribedItem::Organization(*organization_id),
                NotifyAction::Update,
                summary.clone(),
            ),
        ],
        DomainEvent::RecordActivated {
            organization_id,
            summary,
        } => vec![(
            SubscribedItem::Organization(*organization_id),
            NotifyAction::Active,
            summary.clone(),
        )],
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_event_targets_both_items_and_actions() {
        let event = DomainEvent::ResponseReceived {
            request_id: 417,
            organization_id: 7,
            entry_id: 1,
            summary: "s".to_string(),
        };
        let targets = fan_out(&event);
        assert_eq!(targets.len(), 4);
        assert!(targets.contains(&(
            SubscribedItem::Request(417),
            NotifyAction::ResponseFrom,
            "s".to_string()
        )));
        assert!(targets.contains(&(
            SubscribedItem::Organization(7),
            NotifyAction::NewMessage,
            "s".to_string()
        )));
    }

    #[test]
    fn activation_event_targets_only_the_organization() {
        let event = DomainEvent::RecordActivated {
            organization_id: 7,
            summary: "Town Hall".to_string(),
        };
        let targets = fan_out(&event);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].0, SubscribedItem::Organization(7));
        assert_eq!(targets[0].1, NotifyAction::Active);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("Żółta łódź płynie", 7), "Żółta ł");
        assert_eq!(truncate("short", 50), "short");
    }
}
