//! Rule store for persisting the mapping rule catalogue.
//!
//! The engine only sees the [`RuleStore`] trait. [`RuleRepository`] is the
//! file-backed implementation: the whole catalogue lives in one JSON file
//! that is read once on [`RuleRepository::open`] and rewritten after every
//! mutation.
//!
//! # Storage Format
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "saved_at": "2025-01-01T00:00:00+00:00",
//!   "rules": [
//!     { "strategy": "exact", "source_path": "payload.name.legal_name",
//!       "target_path": "CD_Legal_Name", "priority": 10, ... }
//!   ]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use fieldmap_model::{MappingRule, ModelError, RuleKey};

use crate::candidates::compile_pattern;
use crate::defaults::default_rules;
use crate::error::StoreError;

/// CRUD over the rule catalogue.
///
/// Implementations must be safe for concurrent readers; the engine reads
/// the catalogue once per run through [`RuleStore::list`].
pub trait RuleStore: Send + Sync {
    /// Active rules ordered by priority ascending.
    fn list(&self) -> Result<Vec<MappingRule>, StoreError>;

    /// Every stored rule, active or not, in storage order.
    fn list_all(&self) -> Result<Vec<MappingRule>, StoreError>;

    /// Upserts rules by key. Returns how many rules were written.
    fn add_rules(&self, rules: Vec<MappingRule>) -> Result<usize, StoreError>;

    /// Removes a rule. Returns `false` when no rule had the key.
    fn remove_rule(&self, key: &RuleKey) -> Result<bool, StoreError>;

    /// Changes the confidence and priority of a stored rule.
    fn update_rule(&self, key: &RuleKey, confidence: f64, priority: u32)
    -> Result<bool, StoreError>;

    fn set_active(&self, key: &RuleKey, active: bool) -> Result<bool, StoreError>;

    fn add_rule(&self, rule: MappingRule) -> Result<(), StoreError> {
        self.add_rules(vec![rule]).map(|_| ())
    }

    /// Upserts the curated default catalogue.
    fn seed_defaults(&self) -> Result<usize, StoreError> {
        self.add_rules(default_rules())
    }
}

/// On-disk catalogue with repository metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredRuleCatalogue {
    /// Version of the catalogue format.
    #[serde(default = "default_version")]
    pub version: String,
    /// Timestamp of the last write (RFC 3339).
    #[serde(default)]
    pub saved_at: Option<String>,
    #[serde(default)]
    pub rules: Vec<MappingRule>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl StoredRuleCatalogue {
    fn upsert(&mut self, rule: MappingRule) {
        let key = rule.key();
        match self.rules.iter_mut().find(|existing| existing.key() == key) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    fn find_mut(&mut self, key: &RuleKey) -> Option<&mut MappingRule> {
        self.rules.iter_mut().find(|rule| &rule.key() == key)
    }
}

/// JSON-file rule store with an explicit open/close lifecycle.
#[derive(Debug)]
pub struct RuleRepository {
    path: PathBuf,
    catalogue: RwLock<StoredRuleCatalogue>,
}

impl RuleRepository {
    /// Opens the catalogue at `path`.
    ///
    /// A missing file opens as an empty catalogue; it is created on the
    /// first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let catalogue = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
            let mut stored: StoredRuleCatalogue =
                serde_json::from_str(&contents).map_err(|e| StoreError::parse(&path, e))?;
            if stored.version.is_empty() {
                stored.version = default_version();
            }
            stored
        } else {
            StoredRuleCatalogue {
                version: default_version(),
                ..StoredRuleCatalogue::default()
            }
        };
        debug!(path = %path.display(), rules = catalogue.rules.len(), "rule catalogue opened");
        Ok(Self {
            path,
            catalogue: RwLock::new(catalogue),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes the catalogue and releases the handle.
    pub fn close(self) -> Result<(), StoreError> {
        let catalogue = self
            .catalogue
            .into_inner()
            .map_err(|_| StoreError::Poisoned)?;
        if !catalogue.rules.is_empty() || self.path.exists() {
            write_catalogue(&self.path, &catalogue)?;
        }
        Ok(())
    }

    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut StoredRuleCatalogue) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut catalogue = self.catalogue.write().map_err(|_| StoreError::Poisoned)?;
        let mut draft = catalogue.clone();
        let outcome = apply(&mut draft)?;
        draft.saved_at = Some(chrono::Utc::now().to_rfc3339());
        write_catalogue(&self.path, &draft)?;
        *catalogue = draft;
        Ok(outcome)
    }
}

fn write_catalogue(path: &Path, catalogue: &StoredRuleCatalogue) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(catalogue).map_err(StoreError::Serialize)?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, json).map_err(|e| StoreError::io(&staging, e))?;
    fs::rename(&staging, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

fn check_rule(rule: &MappingRule) -> Result<(), StoreError> {
    rule.validate()?;
    compile_pattern(rule)?;
    Ok(())
}

impl RuleStore for RuleRepository {
    fn list(&self) -> Result<Vec<MappingRule>, StoreError> {
        let catalogue = self.catalogue.read().map_err(|_| StoreError::Poisoned)?;
        let mut rules: Vec<MappingRule> = catalogue
            .rules
            .iter()
            .filter(|rule| rule.is_active)
            .cloned()
            .collect();
        rules.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.strategy().cmp(&b.strategy()))
                .then_with(|| a.key().cmp(&b.key()))
        });
        Ok(rules)
    }

    fn list_all(&self) -> Result<Vec<MappingRule>, StoreError> {
        let catalogue = self.catalogue.read().map_err(|_| StoreError::Poisoned)?;
        Ok(catalogue.rules.clone())
    }

    fn add_rules(&self, rules: Vec<MappingRule>) -> Result<usize, StoreError> {
        for rule in &rules {
            check_rule(rule)?;
        }
        let count = rules.len();
        self.mutate(|catalogue| {
            for rule in rules {
                catalogue.upsert(rule);
            }
            Ok(count)
        })
    }

    fn remove_rule(&self, key: &RuleKey) -> Result<bool, StoreError> {
        let present = {
            let catalogue = self.catalogue.read().map_err(|_| StoreError::Poisoned)?;
            catalogue.rules.iter().any(|rule| &rule.key() == key)
        };
        if !present {
            return Ok(false);
        }
        self.mutate(|catalogue| {
            let before = catalogue.rules.len();
            catalogue.rules.retain(|rule| &rule.key() != key);
            Ok(catalogue.rules.len() != before)
        })
    }

    fn update_rule(
        &self,
        key: &RuleKey,
        confidence: f64,
        priority: u32,
    ) -> Result<bool, StoreError> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(ModelError::InvalidConfidence {
                key: key.to_string(),
                value: confidence,
            }
            .into());
        }
        self.mutate(|catalogue| match catalogue.find_mut(key) {
            Some(rule) => {
                rule.confidence = confidence;
                rule.priority = priority;
                Ok(true)
            }
            None => Ok(false),
        })
    }

    fn set_active(&self, key: &RuleKey, active: bool) -> Result<bool, StoreError> {
        self.mutate(|catalogue| match catalogue.find_mut(key) {
            Some(rule) => {
                rule.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        })
    }
}
