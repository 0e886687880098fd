// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Civiq information-request tracker.
//!
//! This crate provides the domain types, the request status state machine,
//! the domain event list, and the adapter traits (storage, outbound mail,
//! templates) implemented by the sibling crates. It has no I/O of its own.

pub mod error;
pub mod events;
pub mod lifecycle;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CiviqError;
pub use events::DomainEvent;
pub use types::{
    Attachment, NotificationEvent, NotifyAction, Organization, OutboundEmail, Request,
    RequestStatus, SubscribedItem, ThreadEntry, User,
};

// Re-export all adapter traits at crate root.
pub use traits::{OutboundMailer, Store, TemplateContext, TemplateRenderer};
