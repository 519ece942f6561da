use std::path::{Path, PathBuf};

use crate::config::schema::ExtractorConfig;
use crate::error::ConfigError;
use crate::secrets::has_password_source;

const CONFIG_FILE_NAME: &str = "config.json";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExtractorConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ExtractorConfig, ConfigError> {
    let config: ExtractorConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// `<platform config dir>/imapzip/config.json`, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("imapzip").join(CONFIG_FILE_NAME))
}

pub fn validate_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    require_non_empty("host", &config.host)?;
    require_non_empty("username", &config.username)?;
    require_non_empty("folder", &config.folder)?;

    if config.output_directory.as_os_str().is_empty() {
        return Err(validation("outputDirectory must not be empty"));
    }

    if config.port == 0 {
        return Err(validation("port must be between 1 and 65535"));
    }

    if !config.use_tls {
        return Err(validation(
            "TLS is required for secure mailbox connections",
        ));
    }

    if !has_password_source(&config.auth) {
        return Err(validation(
            "auth needs one of password, passwordFile or passwordEnvVar",
        ));
    }

    if let Some(ntlm) = &config.ntlm {
        if ntlm.flags != 0 && ntlm.domain.trim().is_empty() {
            return Err(validation("ntlm.domain must not be empty when NTLM is enabled"));
        }
    }

    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(validation(&format!("{} must not be empty", field)));
    }
    Ok(())
}

fn validation(message: &str) -> ConfigError {
    ConfigError::Validation {
        message: message.to_string(),
    }
}
