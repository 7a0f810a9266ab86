//! TOML configuration for the chat server.
//!
//! The file is optional.  Without it the server listens on all interfaces
//! on [`DEFAULT_PORT`] and accepts the built-in credential table.  Example:
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 5000
//! log_level = "info"
//!
//! [[users]]
//! id = "ken"
//! password = "12345"
//!
//! [[users]]
//! id = "andy"
//! password = "12345"
//! ```
//!
//! When at least one `[[users]]` entry is present, the entries replace the
//! built-in credential table entirely.

use std::path::{Path, PathBuf};

use chat_core::CredentialTable;
use serde::Deserialize;
use thiserror::Error;

/// Port used when neither the command line nor the file names one.
pub const DEFAULT_PORT: u16 = 5000;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A `[[users]]` entry has an identifier the protocol cannot carry.
    #[error("invalid user id {0:?} in config")]
    InvalidUser(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

/// Listener and logging settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerSection {
    /// IP address to bind to.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// One allowed user.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UserEntry {
    pub id: String,
    pub password: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Builds the credential table the server should accept.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUser`] if a configured id is not a
    /// valid protocol identifier.
    pub fn credentials(&self) -> Result<CredentialTable, ConfigError> {
        if self.users.is_empty() {
            return Ok(CredentialTable::default());
        }
        if let Some(bad) = self
            .users
            .iter()
            .find(|u| !chat_core::domain::names::is_valid_identifier(&u.id))
        {
            return Err(ConfigError::InvalidUser(bad.id.clone()));
        }
        Ok(CredentialTable::from_pairs(
            self.users
                .iter()
                .map(|u| (u.id.clone(), u.password.clone())),
        ))
    }

    /// `host:port` string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

/// Parses configuration from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Loads configuration from `path`, or returns the defaults when no path is
/// given.
///
/// An explicitly named file must exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_listens_on_all_interfaces() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.bind_address, "0.0.0.0");
        assert_eq!(cfg.server.port, DEFAULT_PORT);
        assert_eq!(cfg.server.log_level, "info");
        assert_eq!(cfg.bind_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let cfg = parse_config("").expect("parse");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_partial_server_section_fills_missing_fields() {
        // Arrange
        let text = "[server]\nport = 6000\n";

        // Act
        let cfg = parse_config(text).expect("parse");

        // Assert
        assert_eq!(cfg.server.port, 6000);
        assert_eq!(cfg.server.bind_address, "0.0.0.0");
        assert_eq!(cfg.server.log_level, "info");
    }

    #[test]
    fn test_without_users_builtin_credentials_apply() {
        let creds = AppConfig::default().credentials().expect("credentials");
        assert!(creds.verify("ken", "12345"));
        assert!(creds.verify("andy", "12345"));
    }

    #[test]
    fn test_users_replace_builtin_credentials() {
        // Arrange
        let text = r#"
            [[users]]
            id = "alice"
            password = "wonderland"
        "#;

        // Act
        let creds = parse_config(text)
            .expect("parse")
            .credentials()
            .expect("credentials");

        // Assert
        assert!(creds.verify("alice", "wonderland"));
        assert!(!creds.contains("ken"));
        assert_eq!(creds.len(), 1);
    }

    #[test]
    fn test_user_id_with_separator_is_rejected() {
        let text = "[[users]]\nid = \"a:b\"\npassword = \"x\"\n";
        let err = parse_config(text)
            .expect("parse")
            .credentials()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUser(id) if id == "a:b"));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let result = parse_config("[server\nport = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_without_path_returns_defaults() {
        let cfg = load_config(None).expect("defaults");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("relay-chat-config-that-does-not-exist.toml");
        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        // Arrange
        let path = std::env::temp_dir().join(format!(
            "relay-chat-config-{}.toml",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, "[server]\nbind_address = \"127.0.0.1\"\nport = 7000\n")
            .expect("write temp config");

        // Act
        let cfg = load_config(Some(&path));
        let _ = std::fs::remove_file(&path);

        // Assert
        assert_eq!(cfg.expect("load").bind_addr(), "127.0.0.1:7000");
    }
}
