use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub negotiation: NegotiationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Tunables of the pre-order negotiation workflow.
#[derive(Clone, Debug)]
pub struct NegotiationConfig {
    /// How long a provider has to respond; also the timeout job delay.
    pub response_window_secs: u64,
    /// Retry budget: a rejection at this instance is terminal (`exhausted`).
    pub max_instance: u32,
    /// Dispatch attempts for the timeout job.
    pub timeout_attempts: u32,
    /// Job worker polling cadence.
    pub worker_poll_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub response_window_secs: Option<u64>,
    pub max_instance: Option<u32>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://abasto.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            negotiation: NegotiationConfig {
                response_window_secs: 3600,
                max_instance: 5,
                timeout_attempts: 1,
                worker_poll_secs: 5,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("abasto.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(negotiation) = patch.negotiation {
            if let Some(response_window_secs) = negotiation.response_window_secs {
                self.negotiation.response_window_secs = response_window_secs;
            }
            if let Some(max_instance) = negotiation.max_instance {
                self.negotiation.max_instance = max_instance;
            }
            if let Some(timeout_attempts) = negotiation.timeout_attempts {
                self.negotiation.timeout_attempts = timeout_attempts;
            }
            if let Some(worker_poll_secs) = negotiation.worker_poll_secs {
                self.negotiation.worker_poll_secs = worker_poll_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ABASTO_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("ABASTO_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("ABASTO_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ABASTO_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("ABASTO_DATABASE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("ABASTO_RESPONSE_WINDOW_SECS") {
            self.negotiation.response_window_secs =
                parse_u64("ABASTO_RESPONSE_WINDOW_SECS", &value)?;
        }
        if let Some(value) = read_env("ABASTO_MAX_INSTANCE") {
            self.negotiation.max_instance = parse_u32("ABASTO_MAX_INSTANCE", &value)?;
        }
        if let Some(value) = read_env("ABASTO_TIMEOUT_ATTEMPTS") {
            self.negotiation.timeout_attempts = parse_u32("ABASTO_TIMEOUT_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("ABASTO_WORKER_POLL_SECS") {
            self.negotiation.worker_poll_secs = parse_u64("ABASTO_WORKER_POLL_SECS", &value)?;
        }
        if let Some(value) = read_env("ABASTO_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("ABASTO_LOG_FORMAT") {
            self.logging.format = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "ABASTO_LOG_FORMAT".to_string(),
                value,
            })?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(secs) = overrides.response_window_secs {
            self.negotiation.response_window_secs = secs;
        }
        if let Some(max_instance) = overrides.max_instance {
            self.negotiation.max_instance = max_instance;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.negotiation.response_window_secs == 0 {
            return Err(ConfigError::Validation(
                "negotiation.response_window_secs must be at least 1".to_string(),
            ));
        }
        if self.negotiation.max_instance == 0 {
            return Err(ConfigError::Validation(
                "negotiation.max_instance must be at least 1".to_string(),
            ));
        }
        if self.negotiation.worker_poll_secs == 0 {
            return Err(ConfigError::Validation(
                "negotiation.worker_poll_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    negotiation: Option<NegotiationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NegotiationPatch {
    response_window_secs: Option<u64>,
    max_instance: Option<u32>,
    timeout_attempts: Option<u32>,
    worker_poll_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) if path.exists() => Some(path.to_path_buf()),
        Some(_) | None => {
            let default = PathBuf::from("abasto.toml");
            default.exists().then_some(default)
        }
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}
