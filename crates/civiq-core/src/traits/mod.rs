// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits implemented by the sibling crates.

pub mod mailer;
pub mod store;
pub mod templates;

pub use mailer::OutboundMailer;
pub use store::Store;
pub use templates::{TemplateContext, TemplateRenderer};
