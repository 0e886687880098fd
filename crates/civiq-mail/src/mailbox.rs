// SPDX-FileCopyrightText: 2026 Civiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mailbox access.
//!
//! [`MailboxClient`] abstracts one remote mailbox: list unseen messages,
//! fetch them, and mark them seen. The IMAP implementation opens a fresh
//! session per call and drops it before returning; nothing is held across
//! runs. Fetches use `BODY.PEEK[]` so a message only becomes seen once the
//! poll loop explicitly stores the flag after processing.

use std::sync::Arc;
use std::time::Duration;

use async_imap::Session;
use async_trait::async_trait;
use futures::TryStreamExt;
use rustls_pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use civiq_config::model::MailboxConfig;
use civiq_core::CiviqError;

/// One unseen message as fetched from a mailbox.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub uid: u32,
    pub raw: Vec<u8>,
}

/// Abstraction over one remote mailbox.
#[async_trait]
pub trait MailboxClient: Send + Sync {
    /// The configured mailbox name, for logging and reports.
    fn name(&self) -> &str;

    /// Fetch all unseen messages, in mailbox order, without marking them.
    async fn fetch_unseen(&self) -> Result<Vec<RawMessage>, CiviqError>;

    /// Mark the given messages seen so they are not fetched again.
    async fn mark_seen(&self, uids: &[u32]) -> Result<(), CiviqError>;
}

/// IMAP mailbox client.
pub struct ImapMailbox {
    name: String,
    config: MailboxConfig,
    timeout: Duration,
}

impl ImapMailbox {
    pub fn new(name: &str, config: MailboxConfig, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            config,
            timeout,
        }
    }

    async fn fetch_inner(&self) -> Result<Vec<RawMessage>, CiviqError> {
        if self.config.use_ssl {
            let stream = tls_connect(&self.config.host, self.config.port).await?;
            let mut session = login(stream, &self.config).await?;
            let result = collect_unseen(&mut session).await;
            let _ = session.logout().await;
            result
        } else {
            let stream = tcp_connect(&self.config.host, self.config.port).await?;
            let mut session = login(stream, &self.config).await?;
            let result = collect_unseen(&mut session).await;
            let _ = session.logout().await;
            result
        }
    }

    async fn mark_inner(&self, uids: &[u32]) -> Result<(), CiviqError> {
        if self.config.use_ssl {
            let stream = tls_connect(&self.config.host, self.config.port).await?;
            let mut session = login(stream, &self.config).await?;
            let result = store_seen(&mut session, uids).await;
            let _ = session.logout().await;
            result
        } else {
            let stream = tcp_connect(&self.config.host, self.config.port).await?;
            let mut session = login(stream, &self.config).await?;
            let result = store_seen(&mut session, uids).await;
            let _ = session.logout().await;
            result
        }
    }
}

#[async_trait]
impl MailboxClient for ImapMailbox {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_unseen(&self) -> Result<Vec<RawMessage>, CiviqError> {
        tokio::time::timeout(self.timeout, self.fetch_inner())
            .await
            .map_err(|_| CiviqError::Timeout {
                duration: self.timeout,
            })?
    }

    async fn mark_seen(&self, uids: &[u32]) -> Result<(), CiviqError> {
        if uids.is_empty() {
            return Ok(());
        }
        tokio::time::timeout(self.timeout, self.mark_inner(uids))
            .await
            .map_err(|_| CiviqError::Timeout {
                duration: self.timeout,
            })?
    }
}

async fn tcp_connect(host: &str, port: u16) -> Result<TcpStream, CiviqError> {
    TcpStream::connect((host, port))
        .await
        .map_err(|e| mailbox_err(format!("cannot reach {host}:{port}"), e))
}

async fn tls_connect(host: &str, port: u16) -> Result<TlsStream<TcpStream>, CiviqError> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(tls_config));
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| mailbox_err(format!("invalid server name `{host}`"), e))?;

    let tcp = tcp_connect(host, port).await?;
    connector
        .connect(server_name, tcp)
        .await
        .map_err(|e| mailbox_err(format!("TLS handshake with {host} failed"), e))
}

async fn login<S>(stream: S, config: &MailboxConfig) -> Result<Session<S>, CiviqError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + std::fmt::Debug,
{
    let client = async_imap::Client::new(stream);
    client
        .login(&config.login, &config.password)
        .await
        .map_err(|(e, _)| mailbox_err(format!("IMAP login as {} failed", config.login), e))
}

async fn collect_unseen<S>(session: &mut Session<S>) -> Result<Vec<RawMessage>, CiviqError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + std::fmt::Debug,
{
    session
        .select("INBOX")
        .await
        .map_err(|e| mailbox_err("cannot select INBOX".to_string(), e))?;

    let uids = session
        .uid_search("UNSEEN")
        .await
        .map_err(|e| mailbox_err("UNSEEN search failed".to_string(), e))?;
    if uids.is_empty() {
        return Ok(Vec::new());
    }

    let mut ordered: Vec<u32> = uids.into_iter().collect();
    ordered.sort_unstable();
    let set = uid_set(&ordered);
    debug!(count = ordered.len(), "fetching unseen messages");

    let mut messages = Vec::new();
    {
        let mut fetches = session
            .uid_fetch(&set, "(UID BODY.PEEK[])")
            .await
            .map_err(|e| mailbox_err("fetch failed".to_string(), e))?;
        while let Some(fetch) = fetches
            .try_next()
            .await
            .map_err(|e| mailbox_err("fetch stream failed".to_string(), e))?
        {
            let Some(uid) = fetch.uid else { continue };
            let Some(body) = fetch.body() else { continue };
            messages.push(RawMessage {
                uid,
                raw: body.to_vec(),
            });
        }
    }
    messages.sort_by_key(|m| m.uid);
    Ok(messages)
}

async fn store_seen<S>(session: &mut Session<S>, uids: &[u32]) -> Result<(), CiviqError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + std::fmt::Debug,
{
    session
        .select("INBOX")
        .await
        .map_err(|e| mailbox_err("cannot select INBOX".to_string(), e))?;

    let set = uid_set(uids);
    let responses = session
        .uid_store(&set, "+FLAGS (\\Seen)")
        .await
        .map_err(|e| mailbox_err("storing \\Seen failed".to_string(), e))?;
    // The store stream must be drained for the command to complete.
    let _updates: Vec<_> = responses
        .try_collect()
        .await
        .map_err(|e| mailbox_err("storing \\Seen failed".to_string(), e))?;
    Ok(())
}

fn uid_set(uids: &[u32]) -> String {
    uids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn mailbox_err(
    message: String,
    source: impl std::error::Error + Send + Sync + 'static,
) -> CiviqError {
    CiviqError::Mailbox {
        message,
        source: Some(Box::new(source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_set_formats_comma_separated() {
        assert_eq!(uid_set(&[3, 1, 9]), "3,1,9");
        assert_eq!(uid_set(&[42]), "42");
    }

    #[tokio::test]
    async fn mark_seen_with_no_uids_is_a_no_op() {
        let mailbox = ImapMailbox::new(
            "default",
            MailboxConfig {
                host: "imap.invalid".to_string(),
                port: 993,
                login: "x".to_string(),
                password: "y".to_string(),
                use_ssl: true,
            },
            Duration::from_secs(5),
        );
        // Must not even attempt to connect.
        mailbox.mark_seen(&[]).await.unwrap();
    }
}
