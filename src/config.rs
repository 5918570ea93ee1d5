//! Connector configuration.
//!
//! Loaded from a JSON file, the environment, or built in code:
//!
//! ```ignore
//! use cti_connector::config::ConnectorConfig;
//! use cti_connector::tlp::TlpLevel;
//!
//! let config = ConnectorConfig::new("connector-abuse-feed", "https://platform.example")
//!     .with_token("secret")
//!     .with_interval_secs(600)
//!     .with_max_tlp(TlpLevel::Amber);
//! config.validate()?;
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConnectorError, ConnectorResult};
use crate::tlp::TlpLevel;

pub const ENV_URL: &str = "PLATFORM_URL";
pub const ENV_TOKEN: &str = "PLATFORM_TOKEN";
pub const ENV_SSL_VERIFY: &str = "PLATFORM_SSL_VERIFY";
pub const ENV_ID: &str = "CONNECTOR_ID";
pub const ENV_NAME: &str = "CONNECTOR_NAME";
pub const ENV_LOG_LEVEL: &str = "CONNECTOR_LOG_LEVEL";
pub const ENV_INTERVAL: &str = "CONNECTOR_INTERVAL";
pub const ENV_RUN_AND_TERMINATE: &str = "CONNECTOR_RUN_AND_TERMINATE";
pub const ENV_SCOPE: &str = "CONNECTOR_SCOPE";
pub const ENV_MAX_TLP: &str = "CONNECTOR_MAX_TLP";
pub const ENV_VALIDATE_BEFORE_IMPORT: &str = "CONNECTOR_VALIDATE_BEFORE_IMPORT";
pub const ENV_DOWNLOAD_DIR: &str = "CONNECTOR_DOWNLOAD_DIR";
pub const ENV_LIVENESS_TIMEOUT: &str = "CONNECTOR_LIVENESS_TIMEOUT";
pub const ENV_LIVE_STREAM_ID: &str = "CONNECTOR_LIVE_STREAM_ID";
pub const ENV_LIVE_STREAM_START_TIMESTAMP: &str = "CONNECTOR_LIVE_STREAM_START_TIMESTAMP";
pub const ENV_LIVE_STREAM_RECOVER_ISO_DATE: &str = "CONNECTOR_LIVE_STREAM_RECOVER_ISO_DATE";
pub const ENV_LIVE_STREAM_LISTEN_DELETE: &str = "CONNECTOR_LIVE_STREAM_LISTEN_DELETE";
pub const ENV_LIVE_STREAM_NO_DEPENDENCIES: &str = "CONNECTOR_LIVE_STREAM_NO_DEPENDENCIES";
pub const ENV_LIVE_STREAM_WITH_INFERENCES: &str = "CONNECTOR_LIVE_STREAM_WITH_INFERENCES";

const DEFAULT_INTERVAL_SECS: u64 = 3600;
const DEFAULT_LIVENESS_TIMEOUT_SECS: u64 = 300;

/// Live stream connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Named stream; the global stream when unset.
    pub live_stream_id: Option<String>,
    /// Cold-start cursor timestamp (becomes `<ts>-0`).
    pub start_timestamp: Option<i64>,
    /// Cold-start recovery deadline.
    pub recover_iso_date: Option<String>,
    pub listen_delete: bool,
    pub no_dependencies: bool,
    pub with_inferences: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            live_stream_id: None,
            start_timestamp: None,
            recover_iso_date: None,
            listen_delete: true,
            no_dependencies: false,
            with_inferences: false,
        }
    }
}

/// Configuration shared by all connector kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub id: String,
    pub name: String,
    /// Platform base URL, without trailing slash.
    pub url: String,
    pub token: String,
    pub ssl_verify: bool,
    pub log_level: String,
    /// Seconds between poll runs.
    pub interval: u64,
    pub run_and_terminate: bool,
    /// Object types this connector handles. Empty means all.
    pub scope: Vec<String>,
    /// TLP ceiling. Unset means no ceiling.
    pub max_tlp: Option<TlpLevel>,
    pub validate_before_import: bool,
    /// Where import files are downloaded. OS temp dir when unset.
    pub download_dir: Option<PathBuf>,
    /// Seconds without stream traffic before the connector reports not alive.
    pub liveness_timeout: u64,
    pub stream: StreamSettings,
    /// Connector-specific settings.
    pub custom: Map<String, Value>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            url: String::new(),
            token: String::new(),
            ssl_verify: true,
            log_level: "info".to_string(),
            interval: DEFAULT_INTERVAL_SECS,
            run_and_terminate: false,
            scope: Vec::new(),
            max_tlp: None,
            validate_before_import: false,
            download_dir: None,
            liveness_timeout: DEFAULT_LIVENESS_TIMEOUT_SECS,
            stream: StreamSettings::default(),
            custom: Map::new(),
        }
    }
}

impl ConnectorConfig {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = verify;
        self
    }

    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval = secs;
        self
    }

    pub fn with_run_and_terminate(mut self, run_and_terminate: bool) -> Self {
        self.run_and_terminate = run_and_terminate;
        self
    }

    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = scope.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_tlp(mut self, max_tlp: TlpLevel) -> Self {
        self.max_tlp = Some(max_tlp);
        self
    }

    pub fn with_validate_before_import(mut self, validate: bool) -> Self {
        self.validate_before_import = validate;
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    pub fn with_liveness_timeout_secs(mut self, secs: u64) -> Self {
        self.liveness_timeout = secs;
        self
    }

    pub fn with_stream(mut self, stream: StreamSettings) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    /// Read a connector-specific setting.
    pub fn custom_value<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.custom
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> ConnectorResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConnectorError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ConnectorError::Configuration(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Defaults overridden by the environment, then validated.
    pub fn from_env() -> ConnectorResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Optional file, then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> ConnectorResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from any set environment variable.
    pub fn apply_env(&mut self) -> ConnectorResult<()> {
        if let Some(v) = env_string(ENV_URL) {
            self.url = v;
        }
        if let Some(v) = env_string(ENV_TOKEN) {
            self.token = v;
        }
        if let Some(v) = env_parsed::<BoolFlag>(ENV_SSL_VERIFY)? {
            self.ssl_verify = v.0;
        }
        if let Some(v) = env_string(ENV_ID) {
            self.id = v;
        }
        if let Some(v) = env_string(ENV_NAME) {
            self.name = v;
        }
        if let Some(v) = env_string(ENV_LOG_LEVEL) {
            self.log_level = v;
        }
        if let Some(v) = env_parsed(ENV_INTERVAL)? {
            self.interval = v;
        }
        if let Some(v) = env_parsed::<BoolFlag>(ENV_RUN_AND_TERMINATE)? {
            self.run_and_terminate = v.0;
        }
        if let Some(v) = env_string(ENV_SCOPE) {
            self.scope = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = env_parsed(ENV_MAX_TLP)? {
            self.max_tlp = Some(v);
        }
        if let Some(v) = env_parsed::<BoolFlag>(ENV_VALIDATE_BEFORE_IMPORT)? {
            self.validate_before_import = v.0;
        }
        if let Some(v) = env_string(ENV_DOWNLOAD_DIR) {
            self.download_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = env_parsed(ENV_LIVENESS_TIMEOUT)? {
            self.liveness_timeout = v;
        }
        if let Some(v) = env_string(ENV_LIVE_STREAM_ID) {
            self.stream.live_stream_id = Some(v);
        }
        if let Some(v) = env_parsed(ENV_LIVE_STREAM_START_TIMESTAMP)? {
            self.stream.start_timestamp = Some(v);
        }
        if let Some(v) = env_string(ENV_LIVE_STREAM_RECOVER_ISO_DATE) {
            self.stream.recover_iso_date = Some(v);
        }
        if let Some(v) = env_parsed::<BoolFlag>(ENV_LIVE_STREAM_LISTEN_DELETE)? {
            self.stream.listen_delete = v.0;
        }
        if let Some(v) = env_parsed::<BoolFlag>(ENV_LIVE_STREAM_NO_DEPENDENCIES)? {
            self.stream.no_dependencies = v.0;
        }
        if let Some(v) = env_parsed::<BoolFlag>(ENV_LIVE_STREAM_WITH_INFERENCES)? {
            self.stream.with_inferences = v.0;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConnectorResult<()> {
        if self.id.trim().is_empty() {
            return Err(ConnectorError::Configuration(
                "connector id must not be empty".to_string(),
            ));
        }
        if self.url.trim().is_empty() {
            return Err(ConnectorError::Configuration(
                "platform url must not be empty".to_string(),
            ));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConnectorError::Configuration(format!(
                "platform url must be http(s): {}",
                self.url
            )));
        }
        if self.interval == 0 {
            return Err(ConnectorError::Configuration(
                "interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Platform URL without trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn liveness_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout)
    }

    /// Scope for bundle submission, `None` when unrestricted.
    pub fn scope_filter(&self) -> Option<&[String]> {
        if self.scope.is_empty() {
            None
        } else {
            Some(&self.scope)
        }
    }

    /// Directory for import file downloads.
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Boolean accepting `true/false`, `1/0` and `yes/no`.
struct BoolFlag(bool);

impl FromStr for BoolFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(BoolFlag(true)),
            "false" | "0" | "no" => Ok(BoolFlag(false)),
            other => Err(format!("not a boolean: {}", other)),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T>(name: &str) -> ConnectorResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| ConnectorError::Configuration(format!("{}: {}", name, e)))
        })
        .transpose()
}
