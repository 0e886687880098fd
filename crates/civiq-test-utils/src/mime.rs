// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw MIME fixture builders for ingestion tests.

/// A plain-text reply addressed to `to`.
pub fn plain_reply(from: &str, to: &str, subject: &str, message_id: &str, body: &str) -> String {
    format!(
        "From: {from}\r\n\
         To: {to}\r\n\
         Subject: {subject}\r\n\
         Message-ID: <{message_id}>\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         {body}\r\n"
    )
}

/// A reply with one base64 PDF attachment named `filename`.
pub fn reply_with_attachment(
    from: &str,
    to: &str,
    subject: &str,
    message_id: &str,
    body: &str,
    filename: &str,
) -> String {
    format!(
        "From: {from}\r\n\
         To: {to}\r\n\
         Subject: {subject}\r\n\
         Message-ID: <{message_id}>\r\n\
         Content-Type: multipart/mixed; boundary=\"fixture\"\r\n\
         \r\n\
         --fixture\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         {body}\r\n\
         --fixture\r\n\
         Content-Type: application/pdf; name=\"{filename}\"\r\n\
         Content-Disposition: attachment; filename=\"{filename}\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         JVBERi0xLjQ=\r\n\
         --fixture--\r\n"
    )
}
