// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MIME message parsing.
//!
//! Turns a raw RFC 822 message into a lower-cased header map, one plain-text
//! body and a list of attachment blobs. Header decoding (RFC 2047) is
//! mail-parser's and fails soft to the raw value; a field that cannot be
//! decoded never aborts the message. Only the first textual body part is
//! kept: later text parts are dropped, matching the legacy importer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mail_parser::{Address, HeaderValue, MessageParser as MimeParser, MimeHeaders};
use tracing::debug;

/// Headers that are MIME plumbing rather than message metadata; they never
/// enter the header map.
const CONTENT_RELATED: &[&str] = &[
    "content-type",
    "content-transfer-encoding",
    "content-id",
    "content-disposition",
];

/// One attachment extracted from a message.
#[derive(Debug, Clone, PartialEq)]
pub struct MailAttachment {
    /// Decoded filename, or a synthetic `part_<stamp><ext>` name when the
    /// part carried none.
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A parsed inbound message, ready for correlation and ingestion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedMessage {
    /// Lower-cased header names mapped to decoded values.
    pub headers: BTreeMap<String, String>,
    /// Plain text body; HTML-only messages are converted.
    pub body: String,
    pub attachments: Vec<MailAttachment>,
}

impl ParsedMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn to(&self) -> &str {
        self.header("to").unwrap_or_default()
    }

    pub fn from(&self) -> &str {
        self.header("from").unwrap_or_default()
    }

    pub fn subject(&self) -> &str {
        self.header("subject").unwrap_or_default()
    }

    pub fn message_id(&self) -> Option<&str> {
        self.header("message-id")
    }
}

/// Parses raw MIME messages into [`ParsedMessage`]s.
#[derive(Debug, Clone, Default)]
pub struct MessageParser;

impl MessageParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one raw message. Returns `None` only when the bytes are not a
    /// MIME message at all; the caller leaves such a fetch unseen for retry.
    ///
    /// `now` stamps synthetic attachment names for parts without a filename.
    pub fn parse(&self, raw: &[u8], now: DateTime<Utc>) -> Option<ParsedMessage> {
        let message = MimeParser::default().parse(raw)?;

        let mut headers = BTreeMap::new();
        for header in message.headers() {
            let name = header.name.as_str().to_lowercase();
            if CONTENT_RELATED.contains(&name.as_str()) {
                continue;
            }
            let value = render_header_value(&header.value);
            if !value.is_empty() {
                headers.insert(name, value);
            }
        }
        // Bytes with no parseable header at all are not a message; the
        // caller leaves the fetch unseen and retries later.
        if headers.is_empty() {
            return None;
        }

        // First text/plain part in document order wins; an HTML-only message
        // falls back to a text conversion of its first HTML part.
        let body = match message.body_text(0) {
            Some(text) => text.into_owned(),
            None => message
                .body_html(0)
                .map(|html| {
                    html2text::from_read(html.as_bytes(), 80).unwrap_or_else(|e| {
                        debug!(error = %e, "HTML body conversion failed");
                        String::new()
                    })
                })
                .unwrap_or_default(),
        };

        let stamp = now.format("%d-%m-%Y_%H-%M").to_string();
        let mut attachments = Vec::new();
        for part in message.attachments() {
            let content_type = part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.c_type, sub),
                    None => ct.c_type.to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());

            let filename = match part.attachment_name() {
                Some(name) if !name.trim().is_empty() => name.to_string(),
                _ => format!("part_{stamp}{}", guess_extension(&content_type)),
            };

            attachments.push(MailAttachment {
                filename,
                content_type,
                data: part.contents().to_vec(),
            });
        }

        Some(ParsedMessage {
            headers,
            body,
            attachments,
        })
    }
}

/// Render a decoded header value back to a conventional string form.
///
/// Address headers become `Name <addr>` lists so the correlation codec sees
/// the same shapes a mail client would produce.
fn render_header_value(value: &HeaderValue<'_>) -> String {
    match value {
        HeaderValue::Text(text) => text.to_string(),
        HeaderValue::TextList(list) => list.join(", "),
        HeaderValue::Address(address) => render_address(address),
        HeaderValue::DateTime(dt) => dt.to_rfc3339(),
        _ => String::new(),
    }
}

fn render_address(address: &Address<'_>) -> String {
    let render_one = |addr: &mail_parser::Addr<'_>| -> String {
        let email = addr.address().unwrap_or_default();
        match addr.name() {
            Some(name) if !name.is_empty() => format!("{name} <{email}>"),
            _ => email.to_string(),
        }
    };
    match address {
        Address::List(list) => list
            .iter()
            .map(render_one)
            .collect::<Vec<_>>()
            .join(", "),
        Address::Group(groups) => groups
            .iter()
            .flat_map(|group| group.addresses.iter())
            .map(render_one)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Map a content type to a filename extension for synthetic names.
fn guess_extension(content_type: &str) -> &'static str {
    match content_type {
        "application/pdf" => ".pdf",
        "application/zip" => ".zip",
        "application/msword" => ".doc",
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/tiff" => ".tif",
        "text/plain" => ".txt",
        "text/html" => ".html",
        "text/csv" => ".csv",
        // Generic bag-of-bits extension.
        _ => ".bin",
    }
}
