//! Rule stores shared by the integration tests.

#![allow(dead_code)]

use fieldmap_map::{RuleStore, StoreError};
use fieldmap_model::{MappingRule, RuleKey};

/// Fixed rule set held in memory.
pub struct MemoryStore(pub Vec<MappingRule>);

impl RuleStore for MemoryStore {
    fn list(&self) -> Result<Vec<MappingRule>, StoreError> {
        Ok(self.0.clone())
    }

    fn list_all(&self) -> Result<Vec<MappingRule>, StoreError> {
        Ok(self.0.clone())
    }

    fn add_rules(&self, _rules: Vec<MappingRule>) -> Result<usize, StoreError> {
        Ok(0)
    }

    fn remove_rule(&self, _key: &RuleKey) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn update_rule(
        &self,
        _key: &RuleKey,
        _confidence: f64,
        _priority: u32,
    ) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn set_active(&self, _key: &RuleKey, _active: bool) -> Result<bool, StoreError> {
        Ok(false)
    }
}

/// A store whose every call fails.
pub struct BrokenStore;

impl RuleStore for BrokenStore {
    fn list(&self) -> Result<Vec<MappingRule>, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn list_all(&self) -> Result<Vec<MappingRule>, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn add_rules(&self, _rules: Vec<MappingRule>) -> Result<usize, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn remove_rule(&self, _key: &RuleKey) -> Result<bool, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn update_rule(
        &self,
        _key: &RuleKey,
        _confidence: f64,
        _priority: u32,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Poisoned)
    }

    fn set_active(&self, _key: &RuleKey, _active: bool) -> Result<bool, StoreError> {
        Err(StoreError::Poisoned)
    }
}
