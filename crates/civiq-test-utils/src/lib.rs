// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Civiq integration tests.
//!
//! Provides mock adapters and fixture builders for fast, deterministic,
//! CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`ScriptedMailbox`] - Mailbox client serving pre-loaded raw messages
//! - [`RecordingMailer`] - Outbound mailer capturing every send
//! - [`mime`] - Raw MIME fixture builders

pub mod mime;
pub mod recording_mailer;
pub mod scripted_mailbox;

pub use recording_mailer::RecordingMailer;
pub use scripted_mailbox::ScriptedMailbox;
