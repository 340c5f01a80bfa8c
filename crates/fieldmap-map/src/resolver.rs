//! Conflict reconciliation.
//!
//! Candidates are accepted in one global order: strategy rank, rule
//! priority, confidence (descending), source document order, target name.
//! A target takes the first candidate that reaches it and is never
//! overwritten afterwards.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fieldmap_model::{
    CandidateMapping, ResolvedMapping, SourcePath, Strategy, Suggestion, TargetField,
};

use crate::candidates::{HEURISTIC_PRIORITY, TargetIndex};
use crate::naming::path_key;

/// Minimum confidence a candidate needs for its strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyFloors {
    pub exact: f64,
    pub pattern: f64,
    pub context: f64,
    pub semantic: f64,
    pub ai: f64,
}

impl Default for StrategyFloors {
    fn default() -> Self {
        Self {
            exact: 0.5,
            pattern: 0.5,
            context: 0.5,
            semantic: 0.7,
            ai: 0.5,
        }
    }
}

impl StrategyFloors {
    pub fn floor(&self, strategy: Strategy) -> f64 {
        match strategy {
            Strategy::Exact => self.exact,
            Strategy::Pattern => self.pattern,
            Strategy::Context => self.context,
            Strategy::Semantic => self.semantic,
            Strategy::Ai => self.ai,
        }
    }
}

/// Accepted mappings of one run plus the bookkeeping needed to extend them.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    mappings: Vec<ResolvedMapping>,
    filled: BTreeSet<String>,
    sources: BTreeMap<String, Strategy>,
}

impl Resolution {
    pub fn mappings(&self) -> &[ResolvedMapping] {
        &self.mappings
    }

    pub fn into_mappings(self) -> Vec<ResolvedMapping> {
        self.mappings
    }

    pub fn is_filled(&self, target: &str) -> bool {
        self.filled.contains(target)
    }

    /// Strategy that first resolved `source`, if any.
    pub fn source_strategy(&self, source: &str) -> Option<Strategy> {
        self.sources.get(source).copied()
    }

    /// Distinct source fields with at least one accepted mapping.
    pub fn mapped_sources(&self) -> usize {
        self.sources.len()
    }

    /// Fraction of `total` source fields that are mapped.
    pub fn coverage(&self, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        self.sources.len() as f64 / total as f64
    }

    fn accept(&mut self, leaf: &SourcePath, target: &str, strategy: Strategy, confidence: f64) {
        self.mappings.push(ResolvedMapping {
            source_path: leaf.path.clone(),
            target_path: target.to_string(),
            strategy,
            applied_value: leaf.value.clone(),
            confidence,
        });
        self.filled.insert(target.to_string());
        self.sources.entry(leaf.path.clone()).or_insert(strategy);
    }
}

struct Ranked<'a> {
    candidate: CandidateMapping,
    ordinal: usize,
    leaf: &'a SourcePath,
}

fn compare(a: &Ranked<'_>, b: &Ranked<'_>) -> Ordering {
    a.candidate
        .strategy
        .rank()
        .cmp(&b.candidate.strategy.rank())
        .then_with(|| a.candidate.priority.cmp(&b.candidate.priority))
        .then_with(|| b.candidate.confidence.total_cmp(&a.candidate.confidence))
        .then_with(|| a.ordinal.cmp(&b.ordinal))
        .then_with(|| a.candidate.target_path.cmp(&b.candidate.target_path))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    floors: StrategyFloors,
}

impl Resolver {
    pub fn new(floors: StrategyFloors) -> Self {
        Self { floors }
    }

    pub fn floors(&self) -> &StrategyFloors {
        &self.floors
    }

    /// Turns candidates into accepted mappings.
    ///
    /// A candidate is accepted when its target is still empty, its confidence
    /// clears its strategy floor, and its source value is non-empty. Once a
    /// source is resolved by one strategy, later strategies skip it; further
    /// candidates from the same strategy still fan out to other targets.
    pub fn resolve(
        &self,
        candidates: Vec<CandidateMapping>,
        leaves: &[SourcePath],
        targets: &[TargetField],
    ) -> Resolution {
        let by_path: BTreeMap<&str, (usize, &SourcePath)> = leaves
            .iter()
            .enumerate()
            .map(|(ordinal, leaf)| (leaf.path.as_str(), (ordinal, leaf)))
            .collect();
        let mut ranked: Vec<Ranked<'_>> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let (ordinal, leaf) = *by_path.get(candidate.source_path.as_str())?;
                Some(Ranked {
                    candidate,
                    ordinal,
                    leaf,
                })
            })
            .collect();
        ranked.sort_by(compare);

        let mut resolution = Resolution {
            filled: targets
                .iter()
                .filter(|target| target.prefilled)
                .map(|target| target.path.clone())
                .collect(),
            ..Resolution::default()
        };
        for Ranked {
            candidate, leaf, ..
        } in ranked
        {
            if !leaf.is_meaningful() || resolution.is_filled(&candidate.target_path) {
                continue;
            }
            let floor = self.floors.floor(candidate.strategy);
            if !candidate.confidence.is_finite() || candidate.confidence < floor {
                continue;
            }
            if resolution
                .source_strategy(&leaf.path)
                .is_some_and(|strategy| strategy != candidate.strategy)
            {
                continue;
            }
            debug!(
                source = %candidate.source_path,
                target = %candidate.target_path,
                strategy = %candidate.strategy,
                confidence = candidate.confidence,
                reasoning = %candidate.reasoning,
                "mapping accepted"
            );
            resolution.accept(
                leaf,
                &candidate.target_path,
                candidate.strategy,
                candidate.confidence,
            );
        }
        resolution
    }

    /// Merges AI suggestions into a resolution without overriding anything.
    ///
    /// Suggestions are discarded when the confidence is outside
    /// `[min_confidence, 1]`, the target is unknown or already filled, or the
    /// source is unknown, empty, or already resolved. Returns the number of
    /// suggestions accepted.
    pub fn merge_suggestions(
        &self,
        resolution: &mut Resolution,
        suggestions: Vec<Suggestion>,
        leaves: &[SourcePath],
        targets: &TargetIndex,
        min_confidence: f64,
    ) -> usize {
        let floor = min_confidence.max(self.floors.ai);
        let by_path: BTreeMap<&str, (usize, &SourcePath)> = leaves
            .iter()
            .enumerate()
            .map(|(ordinal, leaf)| (leaf.path.as_str(), (ordinal, leaf)))
            .collect();
        let by_key: BTreeMap<String, (usize, &SourcePath)> = leaves
            .iter()
            .enumerate()
            .map(|(ordinal, leaf)| (path_key(&leaf.path), (ordinal, leaf)))
            .collect();

        let mut ranked: Vec<Ranked<'_>> = Vec::new();
        for suggestion in suggestions {
            let found = by_path
                .get(suggestion.source.trim())
                .copied()
                .or_else(|| by_key.get(&path_key(suggestion.source.trim())).copied());
            let Some((ordinal, leaf)) = found else {
                warn!(source = %suggestion.source, "discarding suggestion for unknown source");
                continue;
            };
            let Some(target) = targets.resolve(suggestion.target.trim()) else {
                warn!(target = %suggestion.target, "discarding suggestion for unknown target");
                continue;
            };
            if !suggestion.confidence.is_finite()
                || suggestion.confidence < floor
                || suggestion.confidence > 1.0
            {
                warn!(
                    source = %suggestion.source,
                    target = %suggestion.target,
                    confidence = suggestion.confidence,
                    "discarding suggestion with out-of-range confidence"
                );
                continue;
            }
            ranked.push(Ranked {
                candidate: CandidateMapping {
                    source_path: leaf.path.clone(),
                    target_path: target.to_string(),
                    confidence: suggestion.confidence,
                    strategy: Strategy::Ai,
                    priority: HEURISTIC_PRIORITY,
                    reasoning: suggestion.reasoning,
                },
                ordinal,
                leaf,
            });
        }
        ranked.sort_by(compare);

        let mut accepted = 0;
        for Ranked {
            candidate, leaf, ..
        } in ranked
        {
            if !leaf.is_meaningful() || resolution.is_filled(&candidate.target_path) {
                continue;
            }
            if resolution
                .source_strategy(&leaf.path)
                .is_some_and(|strategy| strategy != Strategy::Ai)
            {
                continue;
            }
            resolution.accept(leaf, &candidate.target_path, Strategy::Ai, candidate.confidence);
            accepted += 1;
        }
        accepted
    }
}
