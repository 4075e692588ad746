//! Configuration types for hawqs-builder
//!
//! Settings are read from an `appsettings.json` file with a single `AppSettings` section:
//!
//! ```json
//! {
//!   "AppSettings": {
//!     "ApiKey": "your-key",
//!     "BaseUrl": "https://dev-api.hawqs.tamu.edu",
//!     "SavePath": "/data/hawqs",
//!     "PollIntervalSecs": 10
//!   }
//! }
//! ```
//!
//! Only `ApiKey`, `BaseUrl` and `SavePath` are required. The loaded [`Config`] is immutable
//! and shared by every step of a workflow.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `ApiKey`
pub const ENV_API_KEY: &str = "HAWQS_API_KEY";
/// Environment variable overriding `BaseUrl`
pub const ENV_BASE_URL: &str = "HAWQS_BASE_URL";
/// Environment variable overriding `SavePath`
pub const ENV_SAVE_PATH: &str = "HAWQS_SAVE_PATH";

/// Default settings file name, resolved against the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";

/// Status polling behavior
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status queries (default: 10 seconds)
    #[serde(
        rename = "PollIntervalSecs",
        default = "default_poll_interval",
        with = "duration_serde"
    )]
    pub interval: Duration,

    /// Give up after this long (default: none, wait indefinitely)
    #[serde(
        rename = "PollDeadlineSecs",
        default,
        with = "optional_duration_serde"
    )]
    pub deadline: Option<Duration>,

    /// Backoff for status queries that fail below the HTTP layer
    #[serde(rename = "PollRetry", default)]
    pub retry: RetryConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            deadline: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Output retrieval behavior
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Number of artifacts downloaded at once (default: 1, strictly sequential)
    #[serde(rename = "MaxConcurrentFetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Also collect outputs of scenarios nested in a project document (default: false)
    #[serde(rename = "FetchScenarioOutputs", default)]
    pub fetch_scenario_outputs: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            fetch_scenario_outputs: false,
        }
    }
}

/// Retry configuration for transient network failures
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(
        rename = "InitialDelaySecs",
        default = "default_initial_delay",
        with = "duration_serde"
    )]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(
        rename = "MaxDelaySecs",
        default = "default_max_delay",
        with = "duration_serde"
    )]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration, the `AppSettings` section of `appsettings.json`
///
/// Sub-configs are flattened, so every key lives directly in the `AppSettings` object.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API key sent as `X-API-Key` on every request
    #[serde(rename = "ApiKey", default)]
    pub api_key: String,

    /// Base URL of the API, such as `https://dev-api.hawqs.tamu.edu`
    #[serde(rename = "BaseUrl", default)]
    pub base_url: String,

    /// Root directory for downloaded project and scenario files
    #[serde(rename = "SavePath", default)]
    pub save_path: PathBuf,

    /// Per-request timeout (default: none)
    #[serde(
        rename = "RequestTimeoutSecs",
        default,
        with = "optional_duration_serde"
    )]
    pub request_timeout: Option<Duration>,

    /// Status polling settings
    #[serde(flatten)]
    pub poll: PollConfig,

    /// Output retrieval settings
    #[serde(flatten)]
    pub fetch: FetchConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("save_path", &self.save_path)
            .field("request_timeout", &self.request_timeout)
            .field("poll", &self.poll)
            .field("fetch", &self.fetch)
            .finish()
    }
}

#[derive(Deserialize)]
struct SettingsFile {
    #[serde(rename = "AppSettings")]
    app_settings: Option<Config>,
}

impl Config {
    /// Create a config with the three required settings and defaults for the rest
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        save_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            save_path: save_path.into(),
            ..Default::default()
        }
    }

    /// Load, apply environment overrides, and validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        tracing::debug!(path = %path.display(), config = ?config, "loaded settings");
        Ok(config)
    }

    /// Parse a settings file without validating it
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("could not read settings file '{}': {}", path.display(), e),
            key: None,
        })?;
        Self::from_json_str(&content)
    }

    /// Parse settings JSON without validating it
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: SettingsFile = serde_json::from_str(content).map_err(|e| Error::Config {
            message: format!("invalid settings JSON: {}", e),
            key: None,
        })?;
        file.app_settings
            .ok_or_else(|| Error::config("AppSettings", "settings file has no AppSettings section"))
    }

    /// Apply `HAWQS_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored
    pub fn apply_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_key) = non_empty(ENV_API_KEY) {
            self.api_key = api_key;
        }
        if let Some(base_url) = non_empty(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(save_path) = non_empty(ENV_SAVE_PATH) {
            self.save_path = PathBuf::from(save_path);
        }
    }

    /// Check required settings and value ranges
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::config("ApiKey", "an API key is required"));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::config("BaseUrl", "an API base URL is required"));
        }
        match url::Url::parse(self.base_url.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(Error::config(
                    "BaseUrl",
                    format!("unsupported scheme '{}', expected http or https", url.scheme()),
                ));
            }
            Err(e) => {
                return Err(Error::config(
                    "BaseUrl",
                    format!("'{}' is not a valid URL: {}", self.base_url, e),
                ));
            }
        }
        if self.save_path.as_os_str().is_empty() {
            return Err(Error::config("SavePath", "a save directory is required"));
        }
        if self.poll.interval.is_zero() {
            return Err(Error::config(
                "PollIntervalSecs",
                "poll interval must be at least one second",
            ));
        }
        if self.fetch.max_concurrent_fetches == 0 {
            return Err(Error::config(
                "MaxConcurrentFetches",
                "at least one concurrent fetch is required",
            ));
        }
        let multiplier = self.poll.retry.backoff_multiplier;
        if !(MIN_BACKOFF_MULTIPLIER..=MAX_BACKOFF_MULTIPLIER).contains(&multiplier) {
            return Err(Error::config(
                "PollRetry.BackoffMultiplier",
                format!(
                    "backoff multiplier must be between {} and {}",
                    MIN_BACKOFF_MULTIPLIER, MAX_BACKOFF_MULTIPLIER
                ),
            ));
        }
        Ok(())
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_max_concurrent_fetches() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

const MIN_BACKOFF_MULTIPLIER: f64 = 1.0;
const MAX_BACKOFF_MULTIPLIER: f64 = 100.0;

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
