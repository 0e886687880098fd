// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background pipelines for the Civiq request tracker.
//!
//! - [`ingest::ThreadIngester`] correlates inbound mail to requests and
//!   appends thread entries exactly once.
//! - [`overdue::OverdueScheduler`] applies the two-tier time escalation.
//! - [`notify::NotificationDispatcher`] records and delivers subscriber
//!   notifications.
//! - [`attachments::AttachmentStore`] persists attachment blobs.
//! - [`templates::StockTemplates`] is the default template set.

pub mod attachments;
pub mod ingest;
pub mod notify;
pub mod overdue;
pub mod templates;

pub use attachments::AttachmentStore;
pub use ingest::{IngestReport, IngestSettings, ThreadIngester};
pub use notify::{DeliveryReport, NotificationDispatcher};
pub use overdue::{OverdueScheduler, OverdueSettings, SweepReport};
pub use templates::StockTemplates;
