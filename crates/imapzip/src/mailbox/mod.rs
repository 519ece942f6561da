//! Mail-store boundary.
//!
//! [`MailConnector`] opens a [`MailStore`] (connect, authenticate, select the
//! folder read-write); the store then answers the handful of operations the
//! extractor needs. [`imap::ImapConnector`] is the production implementation.

pub mod imap;
pub mod ntlm;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use secrecy::SecretString;

use crate::config::ExtractorConfig;
use crate::error::Result;
use crate::secrets::resolve_password;

pub use imap::{ImapConnector, ImapMailbox};
pub use ntlm::{NtlmAuthenticator, NTLM_DEFAULT_FLAGS};

/// How the connector authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// IMAP `LOGIN` with username and password.
    Plain,
    /// SASL `AUTHENTICATE NTLM`; plain login is never attempted.
    Ntlm { domain: String, flags: u32 },
}

/// Resolved connection parameters for one mailbox folder.
#[derive(Debug)]
pub struct MailboxSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub folder: String,
    pub auth: AuthMode,
}

impl MailboxSettings {
    /// Builds settings from a configuration, resolving the password source.
    pub fn from_config(config: &ExtractorConfig) -> Result<Self> {
        let password = resolve_password(&config.auth)?;

        let auth = match &config.ntlm {
            Some(ntlm) if ntlm.flags != 0 => AuthMode::Ntlm {
                domain: ntlm.domain.clone(),
                flags: ntlm.flags,
            },
            _ => AuthMode::Plain,
        };

        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            password,
            folder: config.folder.clone(),
            auth,
        })
    }
}

/// One message as returned by the store.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    pub uid: u32,
    /// Server-side received timestamp (IMAP INTERNALDATE).
    pub internal_date: Option<DateTime<FixedOffset>>,
    /// Full RFC 5322 source.
    pub raw: Vec<u8>,
}

impl FetchedMessage {
    /// Text form of the received date that the message digest is computed from.
    ///
    /// Falls back to the given Date header, then to the UID, when the server
    /// reported no INTERNALDATE.
    pub fn received_date_text(&self, date_header: Option<&str>) -> String {
        match (&self.internal_date, date_header) {
            (Some(date), _) => date.to_rfc2822(),
            (None, Some(header)) => header.to_string(),
            (None, None) => format!("uid:{}", self.uid),
        }
    }
}

/// An opened, read-write mailbox folder.
#[async_trait]
pub trait MailStore: Send {
    /// UIDs of messages without the `\Seen` flag, ascending.
    async fn search_unseen(&mut self) -> Result<Vec<u32>>;

    /// Fetches a message without altering its flags. `None` if the UID vanished.
    async fn fetch(&mut self, uid: u32) -> Result<Option<FetchedMessage>>;

    /// Sets the `\Seen` flag.
    async fn mark_seen(&mut self, uid: u32) -> Result<()>;

    /// Ends the session.
    async fn logout(&mut self) -> Result<()>;
}

/// Opens [`MailStore`] sessions.
#[async_trait]
pub trait MailConnector: Send + Sync {
    type Store: MailStore;

    /// Connects, authenticates and selects `settings.folder` read-write.
    ///
    /// With `debug` set, every protocol command and its outcome is logged.
    async fn open(&self, settings: &MailboxSettings, debug: bool) -> Result<Self::Store>;
}
