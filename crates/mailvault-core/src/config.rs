//! Runtime configuration.
//!
//! Loaded once from a TOML file at startup and never changed afterwards.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "MAILVAULT_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Mailbox connection and credentials.
    pub imap: ImapConfig,
    /// Store location.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Batch parameters.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Mailbox settings.
#[derive(Clone, Deserialize)]
pub struct ImapConfig {
    /// Server hostname.
    pub host: String,
    /// Server port; defaults to the port of the security mode.
    pub port: Option<u16>,
    /// Connection security.
    #[serde(default)]
    pub security: Security,
    /// Login name.
    pub username: String,
    /// Login password.
    #[serde(default)]
    pub password: String,
    /// Folder to ingest.
    #[serde(default = "default_folder")]
    pub folder: String,
}

// Keep the password out of logs.
impl std::fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.username)
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

impl ImapConfig {
    /// Connection parameters for the IMAP client.
    #[must_use]
    pub fn connection(&self) -> mailvault_imap::Config {
        let security = match self.security {
            Security::Tls => mailvault_imap::Security::Tls,
            Security::None => mailvault_imap::Security::None,
        };
        let builder = mailvault_imap::Config::builder(&self.host).security(security);
        match self.port {
            Some(port) => builder.port(port).build(),
            None => builder.build(),
        }
    }
}

/// Connection security mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Security {
    /// Implicit TLS.
    #[default]
    Tls,
    /// Plain TCP.
    None,
}

/// Store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
    /// Upper bound on open connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Batch settings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IngestConfig {
    /// Number of newest messages to fetch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// A progress line is logged every this many messages.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
    /// Capacity of the queue between the fetch task and the pipeline.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            progress_interval: default_progress_interval(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_folder() -> String {
    "INBOX".to_string()
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailvault")
        .join("mailvault.db")
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_batch_size() -> u32 {
    10_000
}

const fn default_progress_interval() -> usize {
    100
}

const fn default_queue_capacity() -> usize {
    10
}

impl Config {
    /// Parses and validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a required value is empty.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration file.
    ///
    /// The first of these wins: `explicit`, the `MAILVAULT_CONFIG`
    /// environment variable, `./config.toml`, and `config.toml` under the
    /// user configuration directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no file is found, or it cannot be read or parsed.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = locate(explicit)?;
        tracing::info!(path = %path.display(), "loading configuration");

        let text = tokio::fs::read_to_string(&path).await?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.imap.host.trim().is_empty() {
            return Err(Error::Config("imap.host must not be empty".into()));
        }
        if self.imap.username.trim().is_empty() {
            return Err(Error::Config("imap.username must not be empty".into()));
        }
        if self.imap.folder.trim().is_empty() {
            return Err(Error::Config("imap.folder must not be empty".into()));
        }
        if self.ingest.progress_interval == 0 {
            return Err(Error::Config("ingest.progress_interval must be > 0".into()));
        }
        if self.ingest.queue_capacity == 0 {
            return Err(Error::Config("ingest.queue_capacity must be > 0".into()));
        }
        if self.database.max_connections == 0 {
            return Err(Error::Config("database.max_connections must be > 0".into()));
        }
        Ok(())
    }
}

fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let local = PathBuf::from("config.toml");
    if local.exists() {
        return Ok(local);
    }
    if let Some(dir) = dirs::config_dir() {
        let user = dir.join("mailvault").join("config.toml");
        if user.exists() {
            return Ok(user);
        }
    }

    Err(Error::Config(format!(
        "no configuration file found (pass a path or set {CONFIG_ENV})"
    )))
}
