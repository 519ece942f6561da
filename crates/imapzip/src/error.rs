//! Error types for the attachment extractor.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Message reported when `process()` runs without a live mailbox session.
pub const NOT_INITIALIZED_MSG: &str = "extractor was not initialized or the mail server \
     connection failed; call init() exactly once before process()";

/// Errors that can occur while connecting to the mailbox or extracting attachments.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Invalid settings, unreadable configuration or unresolvable credentials.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Authentication failure, unreachable host, missing folder or a dropped connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// `process()` was called before a successful `init()`.
    #[error("{}", NOT_INITIALIZED_MSG)]
    NotInitialized,

    /// Parsing a message, writing an attachment or decoding an archive failed.
    #[error("Failed to extract attachment: {0}")]
    Extraction(String),
}

impl ExtractorError {
    pub(crate) fn extraction(path: &Path, reason: impl std::fmt::Display) -> Self {
        ExtractorError::Extraction(format!("'{}': {}", path.display(), reason))
    }
}

impl From<async_native_tls::Error> for ExtractorError {
    fn from(err: async_native_tls::Error) -> Self {
        ExtractorError::Connection(format!("TLS error: {}", err))
    }
}

impl From<ConfigError> for ExtractorError {
    fn from(err: ConfigError) -> Self {
        ExtractorError::Configuration(err.to_string())
    }
}

impl From<crate::secrets::SecretError> for ExtractorError {
    fn from(err: crate::secrets::SecretError) -> Self {
        ExtractorError::Configuration(err.to_string())
    }
}

/// Errors raised while loading or validating an [`ExtractorConfig`](crate::ExtractorConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Result type for extractor operations.
pub type Result<T> = std::result::Result<T, ExtractorError>;
