// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP implementation of the outbound mailer.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use civiq_config::model::SmtpConfig;
use civiq_core::{CiviqError, OutboundEmail, OutboundMailer};

/// Outbound mailer over SMTP with STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, CiviqError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| outbound_err(format!("invalid SMTP relay `{}`", config.host), e))?
            .port(config.port)
            .timeout(Some(std::time::Duration::from_secs(config.timeout_secs)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl OutboundMailer for SmtpMailer {
    async fn send(&self, mail: &OutboundEmail) -> Result<(), CiviqError> {
        let message = build_message(mail)?;
        self.transport
            .send(message)
            .await
            .map(|response| {
                debug!(code = %response.code(), "message accepted by relay");
            })
            .map_err(|e| outbound_err("SMTP send failed".to_string(), e))
    }
}

fn build_message(mail: &OutboundEmail) -> Result<Message, CiviqError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&mail.from)?)
        .subject(sanitize_subject(&mail.subject))
        .header(ContentType::TEXT_PLAIN);

    for to in &mail.to {
        builder = builder.to(parse_mailbox(to)?);
    }
    if let Some(reply_to) = &mail.reply_to {
        builder = builder.reply_to(parse_mailbox(reply_to)?);
    }

    builder
        .body(mail.body.clone())
        .map_err(|e| outbound_err("cannot assemble message".to_string(), e))
}

fn parse_mailbox(addr: &str) -> Result<lettre::message::Mailbox, CiviqError> {
    addr.parse()
        .map_err(|e| outbound_err(format!("invalid address `{addr}`"), e))
}

/// Strip literal newlines from a subject line. A subject with CR/LF in it is
/// a header injection vector, never a legitimate value.
pub fn sanitize_subject(subject: &str) -> String {
    let mut out = String::with_capacity(subject.len());
    let mut last_was_space = false;
    for ch in subject.chars() {
        if ch == '\r' || ch == '\n' {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            last_was_space = ch == ' ';
            out.push(ch);
        }
    }
    out.trim_end().to_string()
}

fn outbound_err(
    message: String,
    source: impl std::error::Error + Send + Sync + 'static,
) -> CiviqError {
    CiviqError::Outbound {
        message,
        source: Some(Box::new(source)),
    }
}
