//! Unread-message scan and zip attachment extraction for one mailbox folder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, info_span, Instrument};

use crate::archive::{ExtractedFile, ZipExtractor};
use crate::config::{validate_config, ExtractorConfig};
use crate::digest::MessageDigestId;
use crate::error::{ExtractorError, Result};
use crate::mailbox::{ImapConnector, MailConnector, MailStore, MailboxSettings};
use crate::message::{parse_message, AttachmentPart};
use crate::observer::{ExtractionObserver, TracingObserver};

/// Scans a mailbox folder for unread messages, extracts their zip attachments
/// into the output directory and flags each processed message as seen.
///
/// Every operation takes `&mut self`, so one instance is driven by one caller
/// at a time; independent instances own independent sessions.
///
/// ```ignore
/// let config = ExtractorConfig::new("imap.example.com", "robot", "INBOX", "/var/spool/reports")
///     .with_password("secret");
/// let mut extractor = MailAttachmentExtractor::new(config)?;
/// extractor.cleanup_working_directory()?;
/// extractor.init().await?;
/// extractor.process().await?;
/// for file in extractor.unzipped_attachments() {
///     println!("{}", file.path.display());
/// }
/// extractor.shutdown().await?;
/// ```
pub struct MailAttachmentExtractor<C: MailConnector = ImapConnector> {
    settings: MailboxSettings,
    connector: C,
    store: Option<C::Store>,
    zip: ZipExtractor,
    observer: Arc<dyn ExtractionObserver>,
    unzipped_attachments: Vec<ExtractedFile>,
    debug: bool,
}

impl MailAttachmentExtractor<ImapConnector> {
    /// Creates an extractor talking IMAPS to the configured server.
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        Self::with_connector(config, ImapConnector)
    }

    /// Creates an extractor using plain authentication.
    pub fn with_credentials(
        host: &str,
        username: &str,
        password: &str,
        folder: &str,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        Self::new(ExtractorConfig::new(host, username, folder, output_dir).with_password(password))
    }

    /// Creates an extractor that authenticates with NTLM when `ntlm_flags` is
    /// non-zero, and with plain authentication otherwise.
    pub fn with_ntlm(
        host: &str,
        username: &str,
        password: &str,
        folder: &str,
        output_dir: impl Into<PathBuf>,
        ntlm_domain: &str,
        ntlm_flags: u32,
    ) -> Result<Self> {
        Self::new(
            ExtractorConfig::new(host, username, folder, output_dir)
                .with_password(password)
                .with_ntlm(ntlm_domain, ntlm_flags),
        )
    }
}

impl<C: MailConnector> MailAttachmentExtractor<C> {
    /// Creates an extractor that opens its mailbox through `connector`.
    ///
    /// Fails with [`ExtractorError::Configuration`] if the configuration is
    /// invalid or the password cannot be resolved. No connection is made.
    pub fn with_connector(config: ExtractorConfig, connector: C) -> Result<Self> {
        validate_config(&config)?;
        let settings = MailboxSettings::from_config(&config)?;

        debug!(
            host = %settings.host,
            folder = %settings.folder,
            auth = ?settings.auth,
            "Extractor configured"
        );

        Ok(Self {
            settings,
            connector,
            store: None,
            zip: ZipExtractor::new(&config.output_directory),
            observer: Arc::new(TracingObserver),
            unzipped_attachments: Vec::new(),
            debug: config.debug,
        })
    }

    /// Replaces the default [`TracingObserver`].
    pub fn with_observer(mut self, observer: Arc<dyn ExtractionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Connects and opens the folder read-write, with protocol tracing as configured.
    pub async fn init(&mut self) -> Result<()> {
        self.init_with_debug(self.debug).await
    }

    /// Connects and opens the folder read-write.
    ///
    /// Meant to be called once. A second call on a live session is a no-op.
    pub async fn init_with_debug(&mut self, debug: bool) -> Result<()> {
        if self.store.is_some() {
            debug!("Extractor already initialized");
            return Ok(());
        }

        self.debug = debug;
        let store = self.connector.open(&self.settings, debug).await?;
        info!(
            host = %self.settings.host,
            folder = %self.settings.folder,
            "Mailbox folder opened"
        );
        self.store = Some(store);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.store.is_some()
    }

    /// Processes every unread message in server order and returns how many
    /// messages were flagged as seen.
    ///
    /// Stops at the first error. Messages handled before the failure stay
    /// flagged as seen; the rest stay unread.
    pub async fn process(&mut self) -> Result<usize> {
        if self.store.is_none() {
            return Err(ExtractorError::NotInitialized);
        }

        let span = info_span!("process", folder = %self.settings.folder);
        async move {
            let uids = self.store_mut()?.search_unseen().await?;
            info!("Found {} unread messages", uids.len());

            let mut processed = 0;
            for uid in uids {
                if self.process_message(uid).await? {
                    processed += 1;
                }
            }

            info!(
                processed,
                total_extracted = self.unzipped_attachments.len(),
                "Processing complete"
            );
            Ok(processed)
        }
        .instrument(span)
        .await
    }

    /// Returns `false` if the message disappeared before it could be fetched.
    async fn process_message(&mut self, uid: u32) -> Result<bool> {
        let Some(fetched) = self.store_mut()?.fetch(uid).await? else {
            return Ok(false);
        };

        let parsed = parse_message(&fetched.raw, uid)?;
        let digest = MessageDigestId::from_received_date(
            &fetched.received_date_text(parsed.summary.sent_date.as_deref()),
        );
        self.observer.message_started(uid, &digest, &parsed.summary);

        let mut extracted = 0;
        for part in parsed.attachments {
            extracted += self.extract_part(&digest, part).await?;
        }

        self.store_mut()?.mark_seen(uid).await?;
        self.observer.message_completed(uid, &digest, extracted);
        Ok(true)
    }

    /// Extracts one attachment part if it is a zip archive. Returns the number
    /// of files written.
    async fn extract_part(&mut self, digest: &MessageDigestId, part: AttachmentPart) -> Result<usize> {
        let filename = match part.filename {
            Some(ref name) if part.is_zip() => name.clone(),
            _ => {
                self.observer
                    .attachment_ignored(digest, part.filename.as_deref());
                return Ok(0);
            }
        };

        let zip = self.zip.clone();
        let observer = Arc::clone(&self.observer);
        let task_digest = digest.clone();
        let content = part.content;

        let files = tokio::task::spawn_blocking(move || {
            zip.extract_attachment(&task_digest, &filename, &content, observer.as_ref())
        })
        .await
        .map_err(|e| ExtractorError::Extraction(format!("extraction task failed: {}", e)))??;

        let count = files.len();
        self.unzipped_attachments.extend(files);
        Ok(count)
    }

    fn store_mut(&mut self) -> Result<&mut C::Store> {
        self.store.as_mut().ok_or(ExtractorError::NotInitialized)
    }

    /// Deletes every file directly inside the output directory, leaving
    /// subdirectories alone. Intended as a reset before a run.
    pub fn cleanup_working_directory(&self) -> Result<usize> {
        self.zip.cleanup_working_directory()
    }

    /// Every file extracted by this instance so far, in extraction order.
    pub fn unzipped_attachments(&self) -> &[ExtractedFile] {
        &self.unzipped_attachments
    }

    pub fn output_dir(&self) -> &Path {
        self.zip.output_dir()
    }

    pub fn folder(&self) -> &str {
        &self.settings.folder
    }

    /// Logs out of the mailbox. Extracted-file records are kept.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(mut store) = self.store.take() {
            store.logout().await?;
        }
        Ok(())
    }
}
