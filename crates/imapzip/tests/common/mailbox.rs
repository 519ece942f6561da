//! In-memory mailbox used in place of a live IMAP server.
//!
//! The connector and every store it opens share one `MockMailbox`, so tests
//! can inspect flags and the command log after the extractor has run.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use secrecy::ExposeSecret;

use imapzip::{ExtractorError, FetchedMessage, MailConnector, MailStore, MailboxSettings, Result};

/// A message held by the mock server.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub uid: u32,
    pub raw: Vec<u8>,
    pub internal_date: Option<DateTime<FixedOffset>>,
    pub seen: bool,
}

#[derive(Debug, Default)]
struct MailboxState {
    folder: String,
    password: String,
    messages: Vec<StoredMessage>,
    commands: Vec<String>,
    /// UIDs reported by SEARCH but gone by the time they are fetched.
    expunged: Vec<u32>,
    fail_store_for: Option<u32>,
    opened: usize,
    /// Debug flag passed to each `open` call.
    debug_flags: Vec<bool>,
}

/// Shared handle to the mock server state.
#[derive(Debug, Clone, Default)]
pub struct MockMailbox {
    state: Arc<Mutex<MailboxState>>,
}

impl MockMailbox {
    /// Mailbox with a single folder accepting `password`.
    pub fn new(folder: &str, password: &str) -> Self {
        let mailbox = Self::default();
        {
            let mut state = mailbox.lock();
            state.folder = folder.to_string();
            state.password = password.to_string();
        }
        mailbox
    }

    fn lock(&self) -> MutexGuard<'_, MailboxState> {
        self.state.lock().expect("mock mailbox lock poisoned")
    }

    /// Adds an unread message with the next free UID and returns that UID.
    pub fn deliver(&self, raw: Vec<u8>, internal_date: &str) -> u32 {
        let mut state = self.lock();
        let uid = state.messages.iter().map(|m| m.uid).max().unwrap_or(0) + 1;
        state.messages.push(StoredMessage {
            uid,
            raw,
            internal_date: DateTime::parse_from_rfc3339(internal_date).ok(),
            seen: false,
        });
        uid
    }

    pub fn expunge_before_fetch(&self, uid: u32) {
        self.lock().expunged.push(uid);
    }

    pub fn fail_store_for(&self, uid: u32) {
        self.lock().fail_store_for = Some(uid);
    }

    pub fn is_seen(&self, uid: u32) -> bool {
        self.lock()
            .messages
            .iter()
            .any(|m| m.uid == uid && m.seen)
    }

    pub fn unseen_count(&self) -> usize {
        self.lock().messages.iter().filter(|m| !m.seen).count()
    }

    /// Every command received so far, e.g. `"FETCH 3"`.
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    pub fn times_opened(&self) -> usize {
        self.lock().opened
    }

    pub fn debug_flags(&self) -> Vec<bool> {
        self.lock().debug_flags.clone()
    }
}

/// Opens stores over a `MockMailbox`.
#[derive(Debug, Clone)]
pub struct MockConnector {
    pub mailbox: MockMailbox,
}

impl MockConnector {
    pub fn new(mailbox: &MockMailbox) -> Self {
        Self {
            mailbox: mailbox.clone(),
        }
    }
}

#[async_trait]
impl MailConnector for MockConnector {
    type Store = MockStore;

    async fn open(&self, settings: &MailboxSettings, debug: bool) -> Result<MockStore> {
        let mut state = self.mailbox.lock();
        state.opened += 1;
        state.debug_flags.push(debug);
        state.commands.push(format!("LOGIN {}", settings.username));

        if settings.password.expose_secret() != state.password {
            return Err(ExtractorError::Connection(
                "authentication failed: invalid credentials".to_string(),
            ));
        }

        state.commands.push(format!("SELECT {}", settings.folder));
        if settings.folder != state.folder {
            return Err(ExtractorError::Connection(format!(
                "IMAP folder '{}' not found",
                settings.folder
            )));
        }

        Ok(MockStore {
            mailbox: self.mailbox.clone(),
        })
    }
}

/// A selected folder of the mock server.
pub struct MockStore {
    mailbox: MockMailbox,
}

#[async_trait]
impl MailStore for MockStore {
    async fn search_unseen(&mut self) -> Result<Vec<u32>> {
        let mut state = self.mailbox.lock();
        state.commands.push("SEARCH UNSEEN".to_string());
        let mut uids: Vec<u32> = state
            .messages
            .iter()
            .filter(|m| !m.seen)
            .map(|m| m.uid)
            .collect();
        uids.sort_unstable();
        Ok(uids)
    }

    async fn fetch(&mut self, uid: u32) -> Result<Option<FetchedMessage>> {
        let mut state = self.mailbox.lock();
        state.commands.push(format!("FETCH {}", uid));
        if state.expunged.contains(&uid) {
            return Ok(None);
        }
        Ok(state
            .messages
            .iter()
            .find(|m| m.uid == uid)
            .map(|m| FetchedMessage {
                uid: m.uid,
                internal_date: m.internal_date,
                raw: m.raw.clone(),
            }))
    }

    async fn mark_seen(&mut self, uid: u32) -> Result<()> {
        let mut state = self.mailbox.lock();
        state.commands.push(format!("STORE {} +FLAGS (\\Seen)", uid));
        if state.fail_store_for == Some(uid) {
            return Err(ExtractorError::Connection("connection reset by peer".to_string()));
        }
        if let Some(message) = state.messages.iter_mut().find(|m| m.uid == uid) {
            message.seen = true;
        }
        Ok(())
    }

    async fn logout(&mut self) -> Result<()> {
        self.mailbox.lock().commands.push("LOGOUT".to_string());
        Ok(())
    }
}
