// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template rendering trait for reminder, report and notification bodies.

use crate::error::CiviqError;

/// Values available to a template. All fields are optional except the mail
/// domain; templates use what they need and ignore the rest.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub domain: String,
    pub request_id: Option<i64>,
    /// Creation date of the request, already formatted for display.
    pub request_date: Option<String>,
    pub organization: Option<String>,
    pub requester: Option<String>,
    pub summary: Option<String>,
    pub info_email: Option<String>,
    pub elapsed_days: Option<i64>,
}

/// Renders a named plain-text template against a context.
///
/// Distinct template names exist per status and action: `reminder_overdue`,
/// `reminder_long_overdue`, `report_overdue`, `report_long_overdue`,
/// `response_received` and one `notification_<action>` per subscriber action.
pub trait TemplateRenderer: Send + Sync + 'static {
    fn render(&self, template: &str, ctx: &TemplateContext) -> Result<String, CiviqError>;
}
