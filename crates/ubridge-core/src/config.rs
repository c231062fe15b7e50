//! Configuration types for ubridge.
//!
//! [`Config::load`] layers three sources, later ones winning:
//!
//! 1. the built-in defaults below,
//! 2. a TOML file (`--config`, else `~/.config/ubridge/config.toml` if present),
//! 3. the connector's environment variables (`UMBRELLA_API_KEY`, …).
//!
//! [`Config::defaults`] returns the built-in defaults without touching the
//! filesystem or the environment (useful in tests).

use crate::hec::EnvelopeOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[umbrella]
management_api_url = "https://api.umbrella.com/deployments/v2"
reports_api_url    = "https://reports.api.umbrella.com/v2"
auth_url           = "https://api.umbrella.com/auth/v2/token"
page_limit         = 1000

[hec]
sourcetype_prefix = "cisco:umbrella"
include_time      = true

[schedule]
fetch_interval_minutes          = 60
identity_cache_refresh_minutes  = 240

[logging]
debug = false
"#;

/// Environment variables read on top of the file, with the key each one sets.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("UMBRELLA_API_KEY", "umbrella.api_key"),
    ("UMBRELLA_API_SECRET", "umbrella.api_secret"),
    ("UMBRELLA_ORGANIZATION_ID", "umbrella.organization_id"),
    ("UMBRELLA_MANAGEMENT_API_URL", "umbrella.management_api_url"),
    ("UMBRELLA_REPORTS_API_URL", "umbrella.reports_api_url"),
    ("UMBRELLA_AUTH_URL", "umbrella.auth_url"),
    ("UMBRELLA_CATEGORY_IDS", "umbrella.category_ids"),
    ("HUNTRESS_HEC_URL", "hec.url"),
    ("HUNTRESS_HEC_TOKEN", "hec.token"),
    ("FETCH_INTERVAL_MINUTES", "schedule.fetch_interval_minutes"),
    ("IDENTITY_CACHE_REFRESH_MINUTES", "schedule.identity_cache_refresh_minutes"),
    ("DEBUG_MODE", "logging.debug"),
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting `{key}` (or environment variable {env})")]
    Missing { key: &'static str, env: &'static str },
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
}

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level connector configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub umbrella: UmbrellaConfig,
    pub hec: HecConfig,
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[umbrella]` section: credentials and API locations.
#[derive(Debug, Clone, Deserialize)]
pub struct UmbrellaConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default)]
    pub organization_id: String,
    pub management_api_url: String,
    pub reports_api_url: String,
    pub auth_url: String,
    /// Comma-separated category IDs passed through to the reports API.
    #[serde(default)]
    pub category_ids: Option<String>,
    pub page_limit: u32,
}

/// `[hec]` section: where and how events are delivered.
#[derive(Debug, Clone, Deserialize)]
pub struct HecConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
    pub sourcetype_prefix: String,
    pub include_time: bool,
}

/// `[schedule]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub fetch_interval_minutes: u64,
    pub identity_cache_refresh_minutes: u64,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub debug: bool,
}

impl HecConfig {
    pub fn envelope(&self) -> EnvelopeOptions {
        EnvelopeOptions {
            sourcetype_prefix: self.sourcetype_prefix.clone(),
            include_time: self.include_time,
        }
    }
}

impl ScheduleConfig {
    /// Length of each fetch window and the pause between cycles.
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_minutes * 60)
    }

    pub fn identity_cache_max_age(&self) -> Duration {
        Duration::from_secs(self.identity_cache_refresh_minutes * 60)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load defaults, then `path` (or the default config file if it exists),
    /// then the process environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    /// As [`Config::load`], reading environment variables through `env`.
    pub fn load_with_env(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::from(config_path().as_path()).required(false),
        };

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(file);

        for (var, key) in ENV_OVERRIDES {
            let value = env(var).filter(|v| !v.is_empty());
            builder = builder.set_override_option(*key, value)?;
        }

        builder.build()?.try_deserialize().map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    /// Check that every setting the connector cannot run without is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            (&self.umbrella.api_key, "umbrella.api_key", "UMBRELLA_API_KEY"),
            (&self.umbrella.api_secret, "umbrella.api_secret", "UMBRELLA_API_SECRET"),
            (
                &self.umbrella.organization_id,
                "umbrella.organization_id",
                "UMBRELLA_ORGANIZATION_ID",
            ),
            (&self.hec.url, "hec.url", "HUNTRESS_HEC_URL"),
            (&self.hec.token, "hec.token", "HUNTRESS_HEC_TOKEN"),
        ];
        if let Some(&(_, key, env)) = required.iter().find(|(value, _, _)| value.is_empty()) {
            return Err(ConfigError::Missing { key, env });
        }
        if self.schedule.fetch_interval_minutes == 0 {
            return Err(ConfigError::Zero("schedule.fetch_interval_minutes"));
        }
        if self.umbrella.page_limit == 0 {
            return Err(ConfigError::Zero("umbrella.page_limit"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("ubridge")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
