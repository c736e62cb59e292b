use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Paperchat server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Directory under which per-session index directories are created.
    pub storage_root: PathBuf,
    /// Seconds of inactivity before a session becomes eligible for reclamation.
    /// Defaults to 1000 seconds (~16.7 min).
    pub session_ttl_secs: u64,
    /// Seconds between reclamation sweeps.
    pub cleanup_interval_secs: u64,
    /// Base URL of the remote completion service.
    pub completion_base_url: String,
    /// Optional bearer token for the completion service.
    pub completion_api_key: Option<String>,
    /// Model identifier passed to the completion service.
    pub completion_model: String,
    /// Per-request timeout for completion calls, in seconds.
    pub completion_timeout_secs: u64,
    /// Dimensionality of the produced embedding vectors.
    pub embedding_dimension: usize,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub chunk_overlap: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

const DEFAULT_SESSION_TTL_SECS: u64 = 1000;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 600;
const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            storage_root: PathBuf::from(load_env("STORAGE_ROOT")?),
            session_ttl_secs: load_env_parsed("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?,
            cleanup_interval_secs: load_env_parsed(
                "CLEANUP_INTERVAL_SECS",
                DEFAULT_CLEANUP_INTERVAL_SECS,
            )?,
            completion_base_url: load_env("COMPLETION_BASE_URL")?,
            completion_api_key: load_env_optional("COMPLETION_API_KEY"),
            completion_model: load_env("COMPLETION_MODEL")?,
            completion_timeout_secs: load_env_parsed(
                "COMPLETION_TIMEOUT_SECS",
                DEFAULT_COMPLETION_TIMEOUT_SECS,
            )?,
            embedding_dimension: load_env("EMBEDDING_DIMENSION")?.parse().map_err(|_| {
                ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string())
            })?,
            chunk_size: load_env_parsed("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: load_env_parsed("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }

    /// Inactivity window after which a session is reclaimed.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Delay between reclamation sweeps.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        storage_root = %config.storage_root.display(),
        session_ttl_secs = config.session_ttl_secs,
        cleanup_interval_secs = config.cleanup_interval_secs,
        completion_base_url = %config.completion_base_url,
        completion_model = %config.completion_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_defaults_apply_when_unset() {
        assert_eq!(
            load_env_parsed("PAPERCHAT_TEST_UNSET_VAR", 42_u64).expect("default"),
            42
        );
    }
}
