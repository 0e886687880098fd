// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic overdue escalation.
//!
//! A request that has received no response escalates at `overdue_days` to
//! `overdue` and at twice that to `long_overdue`. Each escalation sends a
//! reminder to the organization and a report to the requester, but the
//! status transition itself is unconditional: a failed send is logged and
//! counted, never a reason to keep the old status. Requests are processed
//! independently; one failure does not stop the sweep.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use civiq_core::{
    CiviqError, DomainEvent, OutboundEmail, OutboundMailer, Request, RequestStatus, Store,
    TemplateContext, TemplateRenderer, lifecycle,
};
use civiq_mail::AddressCodec;

/// Outcome of one escalation sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Candidates examined across both tiers.
    pub examined: usize,
    /// Request ids escalated to `overdue`.
    pub overdue: Vec<i64>,
    /// Request ids escalated to `long_overdue`.
    pub long_overdue: Vec<i64>,
    pub send_failures: usize,
    pub errors: Vec<String>,
    pub events: Vec<DomainEvent>,
}

/// Settings for the scheduler beyond its collaborators.
#[derive(Debug, Clone)]
pub struct OverdueSettings {
    pub overdue_days: u32,
    /// From address for reminders and reports.
    pub from_address: String,
    /// Public contact address shown in reminder footers.
    pub info_address: String,
}

/// Sweeps open requests and applies time-based escalation.
pub struct OverdueScheduler {
    store: Arc<dyn Store>,
    mailer: Arc<dyn OutboundMailer>,
    templates: Arc<dyn TemplateRenderer>,
    codec: AddressCodec,
    settings: OverdueSettings,
}

impl OverdueScheduler {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn OutboundMailer>,
        templates: Arc<dyn TemplateRenderer>,
        codec: AddressCodec,
        settings: OverdueSettings,
    ) -> Self {
        Self {
            store,
            mailer,
            templates,
            codec,
            settings,
        }
    }

    /// Run both escalation tiers against the clock value `now`.
    ///
    /// The long-overdue tier runs first so a request already past twice the
    /// threshold escalates straight to `long_overdue` in a single sweep.
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        let days = i64::from(self.settings.overdue_days);

        self.sweep_tier(
            now,
            now - Duration::days(2 * days),
            &[RequestStatus::InProgress, RequestStatus::Overdue],
            &mut report,
        )
        .await;

        self.sweep_tier(
            now,
            now - Duration::days(days),
            &[RequestStatus::InProgress],
            &mut report,
        )
        .await;

        info!(
            examined = report.examined,
            overdue = report.overdue.len(),
            long_overdue = report.long_overdue.len(),
            send_failures = report.send_failures,
            "overdue sweep complete"
        );
        report
    }

    async fn sweep_tier(
        &self,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
        statuses: &[RequestStatus],
        report: &mut SweepReport,
    ) {
        let candidates = match self.store.list_escalation_candidates(statuses, cutoff).await {
            Ok(candidates) => candidates,
            Err(e) => {
                report.errors.push(format!("candidate listing failed: {e}"));
                return;
            }
        };

        for request in candidates {
            report.examined += 1;
            if let Err(e) = self.escalate_one(&request, now, report).await {
                warn!(request_id = request.id, error = %e, "escalation failed");
                report
                    .errors
                    .push(format!("request {}: {e}", request.id));
            }
        }
    }

    async fn escalate_one(
        &self,
        request: &Request,
        now: DateTime<Utc>,
        report: &mut SweepReport,
    ) -> Result<(), CiviqError> {
        let responses = self.store.count_responses(request.id).await?;
        let Some(new_status) = lifecycle::escalate(
            request.status,
            request.created,
            now,
            self.settings.overdue_days,
            responses,
        ) else {
            return Ok(());
        };

        // Reminder to the organization first; the report to the requester
        // only goes out when the reminder was actually sent.
        match self.send_reminder(request, new_status).await {
            Ok(()) => {
                if let Err(e) = self.send_report(request, new_status, now).await {
                    warn!(request_id = request.id, error = %e, "status report failed");
                    report.send_failures += 1;
                }
            }
            Err(e) => {
                warn!(request_id = request.id, error = %e, "reminder failed");
                report.send_failures += 1;
            }
        }

        // The transition happens whether or not any mail went out.
        self.store
            .update_request_status(request.id, new_status)
            .await?;
        info!(request_id = request.id, status = %new_status, "request escalated");

        report.events.push(DomainEvent::StatusChanged {
            request_id: request.id,
            organization_id: request.organization_id,
            from: request.status,
            to: new_status,
            summary: format!("Request {} is now {new_status}", request.id),
        });
        match new_status {
            RequestStatus::LongOverdue => report.long_overdue.push(request.id),
            _ => report.overdue.push(request.id),
        }
        Ok(())
    }

    async fn send_reminder(
        &self,
        request: &Request,
        new_status: RequestStatus,
    ) -> Result<(), CiviqError> {
        let Some(organization) = self.store.find_organization(request.organization_id).await?
        else {
            return Err(CiviqError::Internal(format!(
                "request {} has no organization record",
                request.id
            )));
        };
        let Some(user) = self.store.find_user(request.user_id).await? else {
            return Err(CiviqError::Internal(format!(
                "request {} has no requester record",
                request.id
            )));
        };

        let request_date = request.created.format("%d %B %Y").to_string();
        let template = match new_status {
            RequestStatus::LongOverdue => "reminder_long_overdue",
            _ => "reminder_overdue",
        };
        let body = self.templates.render(
            template,
            &TemplateContext {
                domain: self.codec.domain().to_string(),
                request_id: Some(request.id),
                request_date: Some(request_date.clone()),
                organization: Some(organization.name.clone()),
                requester: Some(user.name.clone()),
                summary: Some(request.summary.clone()),
                info_email: Some(self.settings.info_address.clone()),
                elapsed_days: None,
            },
        )?;

        // Replies to the reminder must land back on the request thread.
        let reply_to = self.codec.encode(&user.name, request.id);
        self.mailer
            .send(&OutboundEmail {
                subject: subject_for(request.id, new_status, &request_date),
                body,
                from: self.settings.from_address.clone(),
                to: vec![organization.email],
                reply_to: Some(reply_to),
            })
            .await
    }

    async fn send_report(
        &self,
        request: &Request,
        new_status: RequestStatus,
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
        let template = match new_status {
            RequestStatus::LongOverdue => "report_long_overdue",
            _ => "report_overdue",
        };
        let body = self.templates.render(
            template,
            &TemplateContext {
                domain: self.codec.domain().to_string(),
                request_id: Some(request.id),
                request_date: Some(request_date.clone()),
                organization: organization.map(|o| o.name),
                requester: Some(user.name.clone()),
                summary: Some(request.summary.clone()),
                info_email: Some(self.settings.info_address.clone()),
                elapsed_days: Some((now - request.created).num_days()),
            },
        )?;

        self.mailer
            .send(&OutboundEmail {
                subject: subject_for(request.id, new_status, &request_date),
                body,
                from: self.settings.from_address.clone(),
                to: vec![user.email],
                reply_to: None,
            })
            .await
    }
}

fn subject_for(request_id: i64, status: RequestStatus, request_date: &str) -> String {
    match status {
        RequestStatus::LongOverdue => format!(
            "Public Information Request {request_id} is long overdue from {request_date}"
        ),
        _ => format!(
            "Public Information Request {request_id} is overdue from {request_date}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_differ_per_tier() {
        let tier1 = subject_for(417, RequestStatus::Overdue, "01 January 2026");
        let tier2 = subject_for(417, RequestStatus::LongOverdue, "01 January 2026");
        assert!(tier1.contains("is overdue"));
        assert!(tier2.contains("is long overdue"));
        assert_ne!(tier1, tier2);
    }
}
