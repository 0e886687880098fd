// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in plain-text templates for reminders, reports and notifications.
//!
//! The renderer trait stays in the core so a deployment can swap in its own
//! wording; this is the stock set.

use civiq_core::{CiviqError, TemplateContext, TemplateRenderer};

/// Stock implementation of [`TemplateRenderer`].
#[derive(Debug, Clone, Default)]
pub struct StockTemplates;

impl StockTemplates {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateRenderer for StockTemplates {
    fn render(&self, template: &str, ctx: &TemplateContext) -> Result<String, CiviqError> {
        let request_id = ctx.request_id.unwrap_or_default();
        let request_date = ctx.request_date.as_deref().unwrap_or("an earlier date");
        let organization = ctx.organization.as_deref().unwrap_or("the organization");
        let requester = ctx.requester.as_deref().unwrap_or("requester");
        let summary = ctx.summary.as_deref().unwrap_or("");
        let info_email = ctx
            .info_email
            .as_deref()
            .map(str::to_string)
            .unwrap_or_else(|| format!("info@{}", ctx.domain));

        let body = match template {
            "reminder_overdue" => format!(
                "Dear {organization},\n\n\
                 our records show that public information request {request_id}, \
                 sent to you on {request_date}, has not received a response \
                 within the statutory period.\n\n\
                 Please reply to this message; your answer will be delivered \
                 to the requester and published with the request.\n\n\
                 Questions about this service can be sent to {info_email}.\n"
            ),
            "reminder_long_overdue" => format!(
                "Dear {organization},\n\n\
                 this is a repeated reminder: public information request \
                 {request_id}, sent to you on {request_date}, is still without \
                 a response and is now long overdue.\n\n\
                 Please reply to this message; your answer will be delivered \
                 to the requester and published with the request.\n\n\
                 Questions about this service can be sent to {info_email}.\n"
            ),
            "report_overdue" => format!(
                "Dear {requester},\n\n\
                 your public information request {request_id} from \
                 {request_date} to {organization} has received no response \
                 within the statutory period and is now marked overdue.\n\n\
                 We have sent the organization a reminder. You will be \
                 notified as soon as a response arrives.\n"
            ),
            "report_long_overdue" => format!(
                "Dear {requester},\n\n\
                 your public information request {request_id} from \
                 {request_date} to {organization} is still without a response \
                 and is now marked long overdue.\n\n\
                 We have sent the organization a repeated reminder. You may \
                 also consider escalating the request through other channels.\n"
            ),
            "response_received" => format!(
                "Dear {requester},\n\n\
                 a response to your public information request {request_id} \
                 from {request_date} has arrived and was added to the request \
                 thread on {domain}.\n\n\
                 Please review it and classify the request: this tells other \
                 users whether the information was provided.\n",
                domain = ctx.domain
            ),
            name if name.starts_with("notification_") => format!(
                "{summary}\n\n\
                 You receive this message because you follow this item on \
                 {domain}. Unfollow it there to stop these notifications.\n",
                domain = ctx.domain
            ),
            other => return Err(CiviqError::Template(other.to_string())),
        };
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TemplateContext {
        TemplateContext {
            domain: "example.org".to_string(),
            request_id: Some(417),
            request_date: Some("01 January 2026".to_string()),
            organization: Some("Town Hall".to_string()),
            requester: Some("Jane Doe".to_string()),
            summary: Some("New message in the thread of request 417".to_string()),
            info_email: None,
            elapsed_days: Some(16),
        }
    }

    #[test]
    fn reminder_names_request_and_date() {
        let body = StockTemplates::new().render("reminder_overdue", &ctx()).unwrap();
        assert!(body.contains("request 417"));
        assert!(body.contains("01 January 2026"));
        assert!(body.contains("info@example.org"));
    }

    #[test]
    fn tiers_use_distinct_wording() {
        let t = StockTemplates::new();
        let tier1 = t.render("reminder_overdue", &ctx()).unwrap();
        let tier2 = t.render("reminder_long_overdue", &ctx()).unwrap();
        assert_ne!(tier1, tier2);
        assert!(tier2.contains("long overdue"));

        let report1 = t.render("report_overdue", &ctx()).unwrap();
        let report2 = t.render("report_long_overdue", &ctx()).unwrap();
        assert_ne!(report1, report2);
    }

    #[test]
    fn notification_templates_exist_per_action() {
        let t = StockTemplates::new();
        for action in [
            "notification_active",
            "notification_response_from",
            "notification_new_message",
            "notification_annotation",
            "notification_update",
        ] {
            let body = t.render(action, &ctx()).unwrap();
            assert!(body.contains("example.org"));
        }
    }

    #[test]
    fn unknown_template_errors() {
        assert!(matches!(
            StockTemplates::new().render("no_such_template", &ctx()),
            Err(CiviqError::Template(name)) if name == "no_such_template"
        ));
    }
}
