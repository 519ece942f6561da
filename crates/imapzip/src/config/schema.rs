use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::mailbox::ntlm::NTLM_DEFAULT_FLAGS;

/// Settings for one extractor instance: a single mailbox folder and one output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractorConfig {
    /// IMAP server hostname (e.g., "imap.example.com").
    pub host: String,

    /// IMAP server port (default: 993 for IMAPS).
    #[serde(default = "default_imap_port")]
    pub port: u16,

    /// Whether to use TLS (required).
    #[serde(default = "default_true")]
    pub use_tls: bool,

    /// Mailbox login name.
    pub username: String,

    /// Where the password comes from.
    #[serde(default)]
    pub auth: PasswordSettings,

    /// Folder to scan for unread messages (default: "INBOX").
    #[serde(default = "default_inbox")]
    pub folder: String,

    /// Directory receiving the extracted files.
    pub output_directory: PathBuf,

    /// NTLM authentication. When absent, plain LOGIN is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntlm: Option<NtlmSettings>,

    /// Log every IMAP command and its outcome.
    #[serde(default)]
    pub debug: bool,
}

/// Password sources, checked in field order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env_var: Option<String>,
}

/// NTLM domain and negotiate flag bitmask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NtlmSettings {
    pub domain: String,

    #[serde(default = "default_ntlm_flags")]
    pub flags: u32,
}

fn default_imap_port() -> u16 {
    993
}

fn default_true() -> bool {
    true
}

fn default_inbox() -> String {
    "INBOX".to_string()
}

fn default_ntlm_flags() -> u32 {
    NTLM_DEFAULT_FLAGS
}

impl ExtractorConfig {
    /// Creates a configuration using plain authentication and IMAPS defaults.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        folder: impl Into<String>,
        output_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_imap_port(),
            use_tls: true,
            username: username.into(),
            auth: PasswordSettings::default(),
            folder: folder.into(),
            output_directory: output_directory.into(),
            ntlm: None,
            debug: false,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.auth.password = Some(password.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Switches to NTLM with the given domain and flags. Zero flags keep the
    /// default (non-NTLM) authentication.
    pub fn with_ntlm(mut self, domain: impl Into<String>, flags: u32) -> Self {
        self.ntlm = if flags == 0 {
            None
        } else {
            Some(NtlmSettings {
                domain: domain.into(),
                flags,
            })
        };
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn ntlm_enabled(&self) -> bool {
        self.ntlm.as_ref().is_some_and(|n| n.flags != 0)
    }
}
