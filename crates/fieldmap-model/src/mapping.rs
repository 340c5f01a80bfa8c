use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rule::Strategy;

/// A proposed source-to-target assignment produced by one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMapping {
    pub source_path: String,
    pub target_path: String,
    pub confidence: f64,
    pub strategy: Strategy,
    /// Priority of the rule that produced the candidate; heuristic
    /// strategies use the lowest precedence.
    pub priority: u32,
    pub reasoning: String,
}

/// An accepted assignment and the value it applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMapping {
    pub source_path: String,
    pub target_path: String,
    pub strategy: Strategy,
    pub applied_value: Value,
    pub confidence: f64,
}

/// Coverage and provenance statistics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingReport {
    pub total_source_fields: usize,
    pub total_target_fields: usize,
    /// Number of resolved mappings; fan-out counts every target.
    pub mapped_count: usize,
    /// Number of distinct source fields with at least one resolved mapping.
    pub mapped_source_count: usize,
    /// `mapped_source_count / total_source_fields`, or 0 with no source fields.
    pub accuracy: f64,
    pub mappings: Vec<ResolvedMapping>,
    pub unmapped_source: Vec<String>,
    pub unmapped_target: Vec<String>,
    pub by_strategy: BTreeMap<Strategy, usize>,
}

impl MappingReport {
    pub fn count_for(&self, strategy: Strategy) -> usize {
        self.by_strategy.get(&strategy).copied().unwrap_or(0)
    }

    pub fn is_complete(&self) -> bool {
        self.unmapped_target.is_empty()
    }
}
