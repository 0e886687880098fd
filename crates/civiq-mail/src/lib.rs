// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mail plumbing for the Civiq request tracker.
//!
//! Four pieces: the correlation [`address::AddressCodec`], the MIME
//! [`parser::MessageParser`], the [`mailbox::MailboxClient`] trait with its
//! IMAP implementation, and the SMTP [`outbound::SmtpMailer`].

pub mod address;
pub mod mailbox;
pub mod outbound;
pub mod parser;

pub use address::AddressCodec;
pub use mailbox::{ImapMailbox, MailboxClient, RawMessage};
pub use outbound::SmtpMailer;
pub use parser::{MailAttachment, MessageParser, ParsedMessage};
