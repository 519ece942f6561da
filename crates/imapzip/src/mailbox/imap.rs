//! IMAPS implementation of the mail-store boundary.

use async_imap::Session;
use async_native_tls::TlsConnector;
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use secrecy::ExposeSecret;

use crate::error::{ExtractorError, Result};

use super::ntlm::NtlmAuthenticator;
use super::{AuthMode, FetchedMessage, MailConnector, MailStore, MailboxSettings};

/// Type alias for the underlying async stream (using async-std compatible TcpStream).
type AsyncTcpStream = async_io::Async<std::net::TcpStream>;

/// Type alias for the TLS stream used by the IMAP session.
type TlsStream = async_native_tls::TlsStream<AsyncTcpStream>;

type ImapClient = async_imap::Client<TlsStream>;

const FETCH_ITEMS: &str = "(UID INTERNALDATE BODY.PEEK[])";

/// Opens TLS IMAP sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImapConnector;

#[async_trait]
impl MailConnector for ImapConnector {
    type Store = ImapMailbox;

    async fn open(&self, settings: &MailboxSettings, debug: bool) -> Result<ImapMailbox> {
        let addr = format!("{}:{}", settings.host, settings.port);
        info!("Connecting to IMAP server at {}", addr);

        // Establish TCP connection using std::net and wrap with async-io
        let std_stream = std::net::TcpStream::connect(&addr)
            .map_err(|e| ExtractorError::Connection(format!("{}: {}", addr, e)))?;
        std_stream
            .set_nonblocking(true)
            .map_err(|e| ExtractorError::Connection(e.to_string()))?;
        let tcp_stream = async_io::Async::new(std_stream)
            .map_err(|e| ExtractorError::Connection(e.to_string()))?;

        let tls_stream = TlsConnector::new()
            .connect(&settings.host, tcp_stream)
            .await?;

        let client = async_imap::Client::new(tls_stream);

        let session = match &settings.auth {
            AuthMode::Plain => login(client, settings, debug).await?,
            AuthMode::Ntlm { domain, flags } => {
                authenticate_ntlm(client, settings, domain, *flags, debug).await?
            }
        };
        info!("Successfully authenticated to IMAP server as {}", settings.username);

        let mut mailbox = ImapMailbox {
            session: Some(session),
            folder: settings.folder.clone(),
            debug,
        };
        mailbox.select().await?;
        Ok(mailbox)
    }
}

async fn login(
    client: ImapClient,
    settings: &MailboxSettings,
    debug: bool,
) -> Result<Session<TlsStream>> {
    if debug {
        info!("C: LOGIN {} ****", settings.username);
    }
    client
        .login(&settings.username, settings.password.expose_secret())
        .await
        .map_err(|(e, _)| ExtractorError::Connection(format!("authentication failed: {}", e)))
}

async fn authenticate_ntlm(
    client: ImapClient,
    settings: &MailboxSettings,
    domain: &str,
    flags: u32,
    debug: bool,
) -> Result<Session<TlsStream>> {
    if debug {
        info!("C: AUTHENTICATE NTLM (domain={}, flags={:#010x})", domain, flags);
    }
    let authenticator = NtlmAuthenticator::new(&settings.username, &settings.password, domain, flags);
    client
        .authenticate("NTLM", authenticator)
        .await
        .map_err(|(e, _)| ExtractorError::Connection(format!("NTLM authentication failed: {}", e)))
}

/// A selected, read-write IMAP folder.
pub struct ImapMailbox {
    session: Option<Session<TlsStream>>,
    folder: String,
    debug: bool,
}

impl ImapMailbox {
    fn session(&mut self) -> Result<&mut Session<TlsStream>> {
        self.session
            .as_mut()
            .ok_or_else(|| ExtractorError::Connection("Not connected".to_string()))
    }

    fn trace(&self, line: std::fmt::Arguments<'_>) {
        if self.debug {
            info!("{}", line);
        }
    }

    /// Opens the folder with SELECT (not EXAMINE) so flags can be changed.
    async fn select(&mut self) -> Result<()> {
        self.trace(format_args!("C: SELECT {}", self.folder));
        let folder = self.folder.clone();
        let mailbox = self
            .session()?
            .select(&folder)
            .await
            .map_err(|e| select_error(&folder, e))?;

        self.trace(format_args!(
            "S: {} EXISTS, UIDVALIDITY {:?}",
            mailbox.exists, mailbox.uid_validity
        ));
        debug!("Folder '{}' opened read-write", self.folder);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

/// A tagged NO to SELECT means the folder is missing or not selectable.
fn select_error(folder: &str, err: async_imap::error::Error) -> ExtractorError {
    match err {
        async_imap::error::Error::No(reason) => ExtractorError::Connection(format!(
            "IMAP folder '{}' not found: {}",
            folder, reason
        )),
        other => ExtractorError::Connection(other.to_string()),
    }
}

#[async_trait]
impl MailStore for ImapMailbox {
    async fn search_unseen(&mut self) -> Result<Vec<u32>> {
        self.trace(format_args!("C: UID SEARCH UNSEEN"));
        let uids = self
            .session()?
            .uid_search("UNSEEN")
            .await
            .map_err(|e| ExtractorError::Connection(e.to_string()))?;

        // SEARCH results arrive as a set; UID order follows arrival order
        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();

        self.trace(format_args!("S: SEARCH {:?}", uid_list));
        debug!("Found {} unseen messages", uid_list.len());
        Ok(uid_list)
    }

    async fn fetch(&mut self, uid: u32) -> Result<Option<FetchedMessage>> {
        self.trace(format_args!("C: UID FETCH {} {}", uid, FETCH_ITEMS));

        let mut messages = self
            .session()?
            .uid_fetch(uid.to_string(), FETCH_ITEMS)
            .await
            .map_err(|e| ExtractorError::Connection(e.to_string()))?;

        let mut fetched = None;
        while let Some(message) = messages.next().await {
            let message = message.map_err(|e| ExtractorError::Connection(e.to_string()))?;
            if fetched.is_some() || message.uid != Some(uid) {
                continue;
            }
            if let Some(body) = message.body() {
                fetched = Some(FetchedMessage {
                    uid,
                    internal_date: message.internal_date(),
                    raw: body.to_vec(),
                });
            }
        }
        drop(messages);

        match &fetched {
            Some(message) => self.trace(format_args!(
                "S: FETCH UID {} ({} bytes)",
                uid,
                message.raw.len()
            )),
            None => warn!("Message with UID {} not found", uid),
        }
        Ok(fetched)
    }

    async fn mark_seen(&mut self, uid: u32) -> Result<()> {
        self.trace(format_args!("C: UID STORE {} +FLAGS (\\Seen)", uid));

        let updates: Vec<_> = self
            .session()?
            .uid_store(uid.to_string(), "+FLAGS (\\Seen)")
            .await
            .map_err(|e| ExtractorError::Connection(e.to_string()))?
            .collect()
            .await;

        for update in updates {
            update.map_err(|e| ExtractorError::Connection(e.to_string()))?;
        }

        self.trace(format_args!("S: STORE {} OK", uid));
        Ok(())
    }

    async fn logout(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            info!("Disconnecting from IMAP server");
            session
                .logout()
                .await
                .map_err(|e| ExtractorError::Connection(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for ImapMailbox {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("ImapMailbox dropped without explicit logout - session will be closed");
        }
    }
}
