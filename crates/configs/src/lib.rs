//! # configs
//!
//! Layered configuration for the forum client.
//!
//! Later sources win: built-in defaults, `equihealth.toml` (or an explicit
//! file), then `EQUIHEALTH__SECTION__KEY` environment variables. A `.env`
//! file is read into the environment first.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::debug;

pub const ENV_PREFIX: &str = "EQUIHEALTH";
pub const DEFAULT_FILE: &str = "equihealth";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub chat: ChatConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer token of the signed-in user. Never logged.
    #[serde(default)]
    pub token: Option<SecretString>,
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub refresh_after_write: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub history_capacity: usize,
    /// Where the retained chat context is kept between runs.
    #[serde(default)]
    pub history_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub filter: String,
    pub json: bool,
}

impl AppConfig {
    /// Loads `.env`, defaults, the config file and the environment.
    ///
    /// With `path`, that file must exist; otherwise `equihealth.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(dotenv) = dotenvy::dotenv() {
            debug!(path = %dotenv.display(), "loaded .env");
        }

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };
        let builder = Self::defaults()?.add_source(file).add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );
        Self::from_builder(builder)
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("api.base_url", "http://localhost:5000/api")?
            .set_default("api.timeout_secs", 15)?
            .set_default("sync.refresh_after_write", true)?
            .set_default("chat.history_capacity", 4)?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("api.timeout_secs must be positive".into()));
        }
        if self.chat.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "chat.history_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_builder(AppConfig::defaults().unwrap()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:5000/api");
        assert_eq!(config.api.timeout(), Duration::from_secs(15));
        assert!(config.api.token.is_none());
        assert!(config.sync.refresh_after_write);
        assert_eq!(config.chat.history_capacity, 4);
        assert!(config.chat.history_path.is_none());
        assert!(!config.log.json);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let toml = r#"
            [api]
            base_url = "https://portal.example/api"
            token = "abc.def"

            [sync]
            refresh_after_write = false
        "#;
        let builder = AppConfig::defaults()
            .unwrap()
            .add_source(File::from_str(toml, FileFormat::Toml));
        let config = AppConfig::from_builder(builder).unwrap();

        assert_eq!(config.api.base_url, "https://portal.example/api");
        assert_eq!(config.api.token.unwrap().expose_secret(), "abc.def");
        assert!(!config.sync.refresh_after_write);
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let builder = AppConfig::defaults()
            .unwrap()
            .set_override("chat.history_capacity", 0)
            .unwrap();
        assert!(matches!(
            AppConfig::from_builder(builder),
            Err(ConfigError::Invalid(_))
        ));
    }
}
