//! Settings for the suggestion provider.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::transport::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT};

/// The `[ai]` section of the application config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
    /// One API key per line. Without it the provider is disabled.
    pub credentials_file: Option<PathBuf>,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            credentials_file: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            cache_capacity: DEFAULT_CAPACITY,
            cache_ttl_secs: DEFAULT_TTL.as_secs(),
        }
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
