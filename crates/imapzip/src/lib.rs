pub mod archive;
pub mod config;
pub mod digest;
pub mod error;
pub mod extractor;
pub mod mailbox;
pub mod message;
pub mod observer;
pub mod secrets;
pub mod telemetry;

pub use archive::{ExtractedFile, ZipEntryInfo, ZipExtractor};
pub use config::{load_config, load_config_from_str, ExtractorConfig, NtlmSettings, PasswordSettings};
pub use digest::MessageDigestId;
pub use error::{ConfigError, ExtractorError, Result};
pub use extractor::MailAttachmentExtractor;
pub use mailbox::{
    FetchedMessage, ImapConnector, MailConnector, MailStore, MailboxSettings, NTLM_DEFAULT_FLAGS,
};
pub use message::{MessageSummary, ZIP_FILE_EXT};
pub use observer::{ExtractionObserver, TracingObserver};
pub use secrets::SecretError;
pub use telemetry::init_logging;
