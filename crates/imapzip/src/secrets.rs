//! Mailbox password resolution.
//!
//! A password can be supplied in three ways, checked in this order:
//!
//! 1. **Direct value** - `"password": "..."`, convenient for local runs
//! 2. **File reference** - `"passwordFile": "/run/secrets/imap"`, for mounted secrets
//! 3. **Env var reference** - `"passwordEnvVar": "IMAP_PASSWORD"`, for deployments

use secrecy::SecretString;
use std::fs;

use crate::config::PasswordSettings;

/// Error type for password resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No password source configured (need one of: password, passwordFile, passwordEnvVar)")]
    NoSourceProvided,

    #[error("Failed to read password from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves the mailbox password from the configured sources.
///
/// Empty strings count as "not configured" so that a template config with
/// `"password": ""` falls through to the file or environment variable.
pub fn resolve_password(settings: &PasswordSettings) -> Result<SecretString> {
    if let Some(value) = non_empty(settings.password.as_deref()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = non_empty(settings.password_file.as_deref()) {
        let expanded = expand_home(path);
        return match fs::read_to_string(&expanded) {
            Ok(content) => Ok(SecretString::from(content.trim().to_string())),
            Err(e) => Err(SecretError::FileReadError {
                path: expanded,
                source: e,
            }),
        };
    }

    if let Some(var_name) = non_empty(settings.password_env_var.as_deref()) {
        return match std::env::var(var_name) {
            // Trailing newlines are common when the variable is filled from a file
            Ok(value) => Ok(SecretString::from(value.trim().to_string())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: var_name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: var_name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Checks if at least one password source is configured.
pub fn has_password_source(settings: &PasswordSettings) -> bool {
    non_empty(settings.password.as_deref()).is_some()
        || non_empty(settings.password_file.as_deref()).is_some()
        || non_empty(settings.password_env_var.as_deref()).is_some()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Expands a leading `~` to the user's home directory.
///
/// `~user/path` is not supported.
pub(crate) fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
