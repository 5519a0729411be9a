//! Widget configuration
//!
//! The host supplies the backend endpoint, the storage key for the cached
//! conversation and the welcome text. Everything else has defaults.

use crate::orchestrator::DEFAULT_RESET_COMMAND;
use crate::prober::DEFAULT_PROBE_TIMEOUT;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_STORAGE_KEY: &str = "bob";
const DEFAULT_WELCOME_MESSAGE: &str = "👋 Hi! I'm Bob, an AI assistant. How can I help?";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration consumed once when a widget is constructed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    /// Base URL of the assistant backend, without trailing slash
    pub endpoint_url: String,
    /// Key under which the conversation snapshot is persisted
    #[serde(alias = "bobStorageKey")]
    pub storage_key: String,
    /// Raw (unformatted) text of the synthesized welcome message
    pub welcome_message: String,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Deadline for `/speak`; `None` waits indefinitely
    #[serde(default)]
    pub speak_timeout_ms: Option<u64>,
    #[serde(default = "default_reset_command")]
    pub reset_command: String,
}

fn default_probe_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_PROBE_TIMEOUT.as_millis()).unwrap_or(u64::MAX)
}

fn default_reset_command() -> String {
    DEFAULT_RESET_COMMAND.to_string()
}

impl WidgetConfig {
    pub fn new(
        endpoint_url: impl Into<String>,
        storage_key: impl Into<String>,
        welcome_message: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_url: normalize_endpoint(&endpoint_url.into()),
            storage_key: storage_key.into(),
            welcome_message: welcome_message.into(),
            probe_timeout_ms: default_probe_timeout_ms(),
            speak_timeout_ms: None,
            reset_command: default_reset_command(),
        }
    }

    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_speak_timeout(mut self, timeout: Duration) -> Self {
        self.speak_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn with_reset_command(mut self, command: impl Into<String>) -> Self {
        self.reset_command = command.into();
        self
    }

    /// Parse the host-facing JSON shape (`endpointUrl`, `storageKey`, `welcomeMessage`)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(json)?;
        config.endpoint_url = normalize_endpoint(&config.endpoint_url);
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let endpoint_url = lookup("BOB_ENDPOINT_URL").ok_or(ConfigError::Missing("BOB_ENDPOINT_URL"))?;
        let storage_key =
            lookup("BOB_STORAGE_KEY").unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string());
        let welcome_message =
            lookup("BOB_WELCOME_MESSAGE").unwrap_or_else(|| DEFAULT_WELCOME_MESSAGE.to_string());

        let mut config = Self::new(endpoint_url, storage_key, welcome_message);

        if let Some(raw) = lookup("BOB_PROBE_TIMEOUT_MS") {
            config.probe_timeout_ms = parse_millis("BOB_PROBE_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("BOB_SPEAK_TIMEOUT_MS") {
            config.speak_timeout_ms = Some(parse_millis("BOB_SPEAK_TIMEOUT_MS", &raw)?);
        }
        if let Some(command) = lookup("BOB_RESET_COMMAND") {
            config.reset_command = command;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.endpoint_url.starts_with("http://") || self.endpoint_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid {
                name: "endpoint_url",
                value: self.endpoint_url.clone(),
            });
        }
        if self.storage_key.is_empty() {
            return Err(ConfigError::Invalid {
                name: "storage_key",
                value: String::new(),
            });
        }
        if self.reset_command.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "reset_command",
                value: self.reset_command.clone(),
            });
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn speak_timeout(&self) -> Option<Duration> {
        self.speak_timeout_ms.map(Duration::from_millis)
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}

fn parse_millis(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}
