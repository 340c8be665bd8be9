//! Engine configuration
//!
//! Timing knobs for the probe and the writer. User configuration (rules,
//! live override, preferences) lives in the store snapshot instead.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use vb_core::probe::{DEFAULT_PROBE_ATTEMPTS, DEFAULT_REPLY_TIMEOUT_MS, DEFAULT_RETRY_DELAY_MS};

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Live probe timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProbeConfig {
    /// Replies accepted before giving up on a content id match.
    pub attempts: u32,
    /// Pause between a stale reply and the next request.
    pub retry_delay_ms: u64,
    /// Hard limit for one request/reply round trip.
    pub reply_timeout_ms: u64,
}

impl ProbeConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_PROBE_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            reply_timeout_ms: DEFAULT_REPLY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WriterConfig {
    pub debounce_ms: u64,
}

impl WriterConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub probe: ProbeConfig,
    pub writer: WriterConfig,
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_json(&text)
    }
}
