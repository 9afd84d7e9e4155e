//! Configuration for the fwsync CLI and daemon mode.
//!
//! TOML file + environment overrides via figment, platform paths via
//! `directories`. The `[provider]` table resolves into
//! `fwsync_core::ProviderSettings`; a missing API key means "provider
//! unconfigured", which the engine degrades to `not_applicable` instead of
//! treating as an error.

use std::path::PathBuf;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use fwsync_core::{ProviderSettings, SettingsProvider};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// `[provider]` -- target resources and credentials.
#[derive(Debug, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_region")]
    pub region: String,

    /// Perimeter allow-list target id.
    pub allow_list_id: Option<String>,

    /// Ordered deny-list target id.
    pub ordered_list_id: Option<String>,

    /// API key (plaintext -- prefer `api_key_env`).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Endpoint override (e.g. an on-prem gateway); defaults to the
    /// regional endpoint.
    pub endpoint: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            allow_list_id: None,
            ordered_list_id: None,
            api_key: None,
            api_key_env: None,
            endpoint: None,
        }
    }
}

fn default_region() -> String {
    "us-east-1".into()
}

/// `[store]` -- rule persistence.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Rule file location; defaults to `rules.json` in the platform data dir.
    pub path: Option<PathBuf>,
}

/// `[reconcile]` -- cycle scheduling.
#[derive(Debug, Deserialize, Serialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            initial_delay_secs: default_initial_delay(),
        }
    }
}

fn default_interval() -> u64 {
    300
}

fn default_initial_delay() -> u64 {
    15
}

// ── Paths ───────────────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "fwsync", "fwsync").map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default rule-store path in the platform data dir.
pub fn default_store_path() -> PathBuf {
    ProjectDirs::from("net", "fwsync", "fwsync").map_or_else(
        || dirs_fallback().join("rules.json"),
        |dirs| dirs.data_dir().join("rules.json"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fwsync");
    p
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load configuration from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_from(&config_path())
}

/// Load configuration from an explicit path + environment.
///
/// Environment variables use the `FWSYNC_` prefix with `__` as the table
/// separator (e.g. `FWSYNC_PROVIDER__REGION`).
pub fn load_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FWSYNC_").split("__"))
        .extract()?;
    Ok(config)
}

impl Config {
    /// Rule-store location, configured or platform default.
    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(default_store_path)
    }

    /// Resolve `[provider]` into engine settings.
    ///
    /// Returns `None` when no API key is available: the provider is
    /// unconfigured and the engine classifies rules accordingly.
    pub fn provider_settings(&self) -> Result<Option<ProviderSettings>, ConfigError> {
        let key = match (&self.provider.api_key, &self.provider.api_key_env) {
            (Some(inline), _) => Some(inline.clone()),
            (None, Some(var)) => match std::env::var(var) {
                Ok(value) if !value.is_empty() => Some(value),
                _ => {
                    warn!(var = %var, "api_key_env is set but the variable is empty or unset");
                    None
                }
            },
            (None, None) => None,
        };

        let Some(key) = key else {
            return Ok(None);
        };

        let endpoint = self
            .provider
            .endpoint
            .as_deref()
            .map(|raw| {
                raw.parse().map_err(|e| ConfigError::Validation {
                    field: "provider.endpoint".into(),
                    reason: format!("invalid URL: {e}"),
                })
            })
            .transpose()?;

        Ok(Some(ProviderSettings {
            allow_list_id: self.provider.allow_list_id.clone(),
            ordered_list_id: self.provider.ordered_list_id.clone(),
            region: self.provider.region.clone(),
            api_key: SecretString::from(key),
            endpoint,
        }))
    }

    /// Build the `SettingsProvider` implementation the engine consumes.
    pub fn settings_provider(&self) -> Result<FileSettings, ConfigError> {
        Ok(FileSettings {
            resolved: self.provider_settings()?,
        })
    }
}

// ── SettingsProvider impl ───────────────────────────────────────────

/// Settings resolved once at load time from the config file + environment.
pub struct FileSettings {
    resolved: Option<ProviderSettings>,
}

impl SettingsProvider for FileSettings {
    fn settings(&self) -> Option<ProviderSettings> {
        self.resolved.clone()
    }
}
