//! Configuration loading.
//!
//! Loads `agenda.toml` (or `$AGENDA_CONFIG_PATH`). Every section uses
//! `#[serde(default)]`, so a missing or empty file is valid.
//!
//! Precedence: env vars > config file > defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::phone::ninjas::DEFAULT_BASE_URL;
use crate::query::DEFAULT_MAX_DEPTH;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgendaConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Contact store.
    pub database: DatabaseConfig,
    /// Remote phone validation / time service.
    pub phone_service: PhoneServiceConfig,
    /// Query execution limits.
    pub query: QueryConfig,
    /// Log output.
    pub logging: LoggingConfig,
    /// Where credentials are read from.
    pub credentials: CredentialsConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 4000)),
        }
    }
}

/// Contact store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL.
    pub url: String,
    /// Pool size.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://agenda.db".to_owned(),
            max_connections: 5,
        }
    }
}

/// Phone service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhoneServiceConfig {
    /// Base URL the endpoint names are appended to.
    pub base_url: String,
    /// Name of the credential holding the access key.
    pub api_key_env: String,
}

impl Default for PhoneServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key_env: "API_KEY".to_owned(),
        }
    }
}

/// Query execution limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum nested `friends` levels in one selection.
    pub max_depth: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for rotated JSON logs; console only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            dir: None,
        }
    }
}

/// Credential source settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Optional `.env` file merged under the process environment.
    pub env_file: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_file: PathBuf::from(".env"),
        }
    }
}

impl AgendaConfig {
    /// Load configuration with precedence env vars > TOML file > defaults.
    ///
    /// `path` overrides `$AGENDA_CONFIG_PATH`, which overrides `./agenda.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed, or the
    /// result fails validation.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`AgendaConfig::load`] with a custom env resolver (for testing).
    ///
    /// # Errors
    ///
    /// Same as [`AgendaConfig::load`].
    pub fn load_with(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => env("AGENDA_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("agenda.toml")),
        };
        let mut config = Self::load_file(&path)?;
        config.apply_overrides(env);
        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Parse a TOML string into config, without env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has wrongly typed values.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Apply environment overrides. Invalid values are ignored with a warning.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("AGENDA_BIND") {
            match v.parse() {
                Ok(addr) => self.server.bind = addr,
                Err(_) => tracing::warn!(var = "AGENDA_BIND", value = %v, "ignoring invalid env override"),
            }
        }
        if let Some(v) = env("AGENDA_DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = env("AGENDA_PHONE_API_URL") {
            self.phone_service.base_url = v;
        }
        if let Some(v) = env("AGENDA_MAX_DEPTH") {
            match v.parse() {
                Ok(n) => self.query.max_depth = n,
                Err(_) => tracing::warn!(
                    var = "AGENDA_MAX_DEPTH",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("AGENDA_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(v));
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.trim().is_empty() {
            anyhow::bail!("database.url must not be empty");
        }
        if self.phone_service.api_key_env.trim().is_empty() {
            anyhow::bail!("phone_service.api_key_env must not be empty");
        }
        Ok(())
    }
}
