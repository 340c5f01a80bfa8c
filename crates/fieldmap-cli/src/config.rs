//! Application configuration loaded from TOML.
//!
//! Lookup order: an explicit `--config` path (which must exist), then
//! `fieldmap.toml` in the working directory, then built-in defaults.
//!
//! ```toml
//! [store]
//! path = "rules/fieldmap_rules.json"
//!
//! [resolver]
//! coverage_threshold = 0.3
//! ai_min_confidence = 0.5
//!
//! [resolver.floors]
//! semantic = 0.75
//!
//! [ai]
//! credentials_file = "api_keys.txt"
//! model = "gemini-1.5-flash"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use fieldmap_ai::AiConfig;
use fieldmap_map::{EngineConfig, StrategyFloors};

/// File name looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "fieldmap.toml";

/// Default location of the rule catalogue.
pub const DEFAULT_STORE_PATH: &str = "fieldmap_rules.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreSection,
    pub resolver: ResolverSection,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSection {
    pub coverage_threshold: f64,
    pub ai_min_confidence: f64,
    pub floors: StrategyFloors,
}

impl Default for ResolverSection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            coverage_threshold: engine.coverage_threshold,
            ai_min_confidence: engine.ai_min_confidence,
            floors: engine.floors,
        }
    }
}

impl AppConfig {
    /// Loads the config following the lookup order.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::from_file(local);
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config =
            Self::parse(&text).with_context(|| format!("parse config {}", path.display()))?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Engine settings; `ai_enabled` also honours the `[ai]` switch.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_coverage_threshold(self.resolver.coverage_threshold)
            .with_floors(self.resolver.floors)
            .with_ai_min_confidence(self.resolver.ai_min_confidence)
            .with_ai_enabled(self.ai.enabled)
    }
}
