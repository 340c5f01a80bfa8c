//! Field mapping engine.
//!
//! One run flattens the source document, loads the rule catalogue once,
//! generates candidates from every strategy, reconciles them, escalates to
//! the AI fallback when coverage is low, and builds the report.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, info_span, warn};

use fieldmap_model::{
    FieldDescriptor, MappingReport, ResolvedMapping, SuggestionProvider, TargetField,
};

use crate::candidates::{CandidateGenerator, TargetIndex};
use crate::error::Result;
use crate::fallback::{AiFallback, DEFAULT_AI_MIN_CONFIDENCE};
use crate::paths::{flatten, materialize_segments, target_fields};
use crate::report::build_report;
use crate::repository::RuleStore;
use crate::resolver::{Resolver, StrategyFloors};

/// Tuning knobs for a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Source coverage below which the AI fallback runs (default: 0.30).
    pub coverage_threshold: f64,
    pub floors: StrategyFloors,
    /// Suggestions below this confidence are discarded (default: 0.5).
    pub ai_min_confidence: f64,
    pub ai_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            coverage_threshold: 0.3,
            floors: StrategyFloors::default(),
            ai_min_confidence: DEFAULT_AI_MIN_CONFIDENCE,
            ai_enabled: true,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_coverage_threshold(mut self, threshold: f64) -> Self {
        self.coverage_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_floors(mut self, floors: StrategyFloors) -> Self {
        self.floors = floors;
        self
    }

    #[must_use]
    pub fn with_ai_min_confidence(mut self, confidence: f64) -> Self {
        self.ai_min_confidence = confidence;
        self
    }

    #[must_use]
    pub fn with_ai_enabled(mut self, enabled: bool) -> Self {
        self.ai_enabled = enabled;
        self
    }
}

/// What happened to the collaborators during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunDiagnostics {
    pub store_available: bool,
    pub rules_loaded: usize,
    pub ai_invoked: bool,
    pub ai_accepted: usize,
}

/// Outcome of one run over an arbitrary target set.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub mappings: Vec<ResolvedMapping>,
    pub report: MappingReport,
    pub diagnostics: RunDiagnostics,
}

/// A populated copy of the target skeleton.
#[derive(Debug, Clone)]
pub struct DocumentResolution {
    pub document: Value,
    pub mappings: Vec<ResolvedMapping>,
    pub report: MappingReport,
    pub diagnostics: RunDiagnostics,
}

/// A flat value for every supplied descriptor; unmapped keys hold `""`.
#[derive(Debug, Clone)]
pub struct FieldResolution {
    pub fields: BTreeMap<String, String>,
    pub mappings: Vec<ResolvedMapping>,
    pub report: MappingReport,
    pub diagnostics: RunDiagnostics,
}

/// Resolves source documents onto target schemas.
///
/// The rule store and the suggestion provider are injected; without a store
/// the engine runs on the static vocabulary alone.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use fieldmap_map::{FieldMappingEngine, RuleRepository, RuleStore};
///
/// let store = Arc::new(RuleRepository::open("rules.json")?);
/// store.seed_defaults()?;
/// let engine = FieldMappingEngine::new(store);
/// let resolved = engine.resolve_document(&source, &skeleton)?;
/// ```
#[derive(Clone)]
pub struct FieldMappingEngine {
    store: Option<Arc<dyn RuleStore>>,
    fallback: Option<AiFallback>,
    config: EngineConfig,
}

impl std::fmt::Debug for FieldMappingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldMappingEngine")
            .field("has_store", &self.store.is_some())
            .field("has_fallback", &self.fallback.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl FieldMappingEngine {
    pub fn new(store: Arc<dyn RuleStore>) -> Self {
        Self {
            store: Some(store),
            fallback: None,
            config: EngineConfig::default(),
        }
    }

    /// An engine with no rule store, limited to the semantic strategy.
    pub fn without_store() -> Self {
        Self {
            store: None,
            fallback: None,
            config: EngineConfig::default(),
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn SuggestionProvider>) -> Self {
        self.fallback = Some(AiFallback::new(provider));
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolves `source` onto a copy of `skeleton`.
    ///
    /// # Errors
    ///
    /// Fails only when the source is not an object or array, or the skeleton
    /// is not an object.
    pub fn resolve_document(&self, source: &Value, skeleton: &Value) -> Result<DocumentResolution> {
        let targets = target_fields(skeleton)?;
        let outcome = self.resolve_targets(source, &targets)?;
        let keys_by_path: BTreeMap<&str, Vec<&str>> = targets
            .iter()
            .map(|target| (target.path.as_str(), target.path_segments()))
            .collect();
        let mut document = skeleton.clone();
        for mapping in &outcome.mappings {
            let Some(keys) = keys_by_path.get(mapping.target_path.as_str()) else {
                warn!(target = %mapping.target_path, "mapping names an unknown target");
                continue;
            };
            let value = mapping.applied_value.clone();
            if !materialize_segments(&mut document, keys.as_slice(), value) {
                warn!(target = %mapping.target_path, "target path is blocked by a scalar");
            }
        }
        Ok(DocumentResolution {
            document,
            mappings: outcome.mappings,
            report: outcome.report,
            diagnostics: outcome.diagnostics,
        })
    }

    /// Resolves `source` onto a list of PDF field descriptors.
    ///
    /// Duplicate descriptor keys are resolved once.
    pub fn resolve_fields(
        &self,
        source: &Value,
        descriptors: &[FieldDescriptor],
    ) -> Result<FieldResolution> {
        let mut targets: Vec<TargetField> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if !targets.iter().any(|target| target.path == descriptor.key) {
                targets.push(TargetField::from(descriptor));
            }
        }
        let outcome = self.resolve_targets(source, &targets)?;
        let mut fields: BTreeMap<String, String> = targets
            .iter()
            .map(|target| (target.path.clone(), String::new()))
            .collect();
        for mapping in &outcome.mappings {
            fields.insert(mapping.target_path.clone(), value_text(&mapping.applied_value));
        }
        Ok(FieldResolution {
            fields,
            mappings: outcome.mappings,
            report: outcome.report,
            diagnostics: outcome.diagnostics,
        })
    }

    /// Resolves without materializing and returns only the report.
    pub fn report(&self, source: &Value, skeleton: &Value) -> Result<MappingReport> {
        let targets = target_fields(skeleton)?;
        Ok(self.resolve_targets(source, &targets)?.report)
    }

    /// One full run against an explicit target list.
    pub fn resolve_targets(&self, source: &Value, targets: &[TargetField]) -> Result<RunOutcome> {
        let start = Instant::now();
        let leaves = flatten(source)?;
        let span = info_span!(
            "resolve",
            source_fields = leaves.len(),
            target_fields = targets.len()
        );
        let _guard = span.enter();

        let mut diagnostics = RunDiagnostics::default();
        let generator = self.load_generator(&mut diagnostics);
        let index = TargetIndex::new(targets);
        let candidates = generator.generate(&leaves, &index);
        debug!(candidates = candidates.len(), "candidates generated");

        let resolver = Resolver::new(self.config.floors);
        let mut resolution = resolver.resolve(candidates, &leaves, targets);
        let coverage = resolution.coverage(leaves.len());
        info!(
            mapped = resolution.mappings().len(),
            coverage,
            duration_ms = start.elapsed().as_millis(),
            "deterministic resolution complete"
        );

        if let Some(fallback) = self.fallback.as_ref().filter(|_| self.config.ai_enabled)
            && coverage < self.config.coverage_threshold
        {
            let request = AiFallback::build_request(&resolution, &leaves, targets);
            if !request.is_empty() {
                diagnostics.ai_invoked = true;
                let suggestions = fallback.suggest(&request);
                diagnostics.ai_accepted = resolver.merge_suggestions(
                    &mut resolution,
                    suggestions,
                    &leaves,
                    &index,
                    self.config.ai_min_confidence,
                );
            }
        }

        let mappings = resolution.into_mappings();
        let report = build_report(&leaves, targets, &mappings);
        info!(
            mapped = report.mapped_count,
            accuracy = report.accuracy,
            unmapped_targets = report.unmapped_target.len(),
            ai_accepted = diagnostics.ai_accepted,
            duration_ms = start.elapsed().as_millis(),
            "resolution complete"
        );
        Ok(RunOutcome {
            mappings,
            report,
            diagnostics,
        })
    }

    fn load_generator(&self, diagnostics: &mut RunDiagnostics) -> CandidateGenerator {
        let Some(store) = &self.store else {
            return CandidateGenerator::empty();
        };
        match store.list() {
            Ok(rules) => {
                diagnostics.store_available = true;
                let generator = CandidateGenerator::new(rules);
                diagnostics.rules_loaded = generator.rule_count();
                debug!(rules = diagnostics.rules_loaded, "rule catalogue loaded");
                generator
            }
            Err(error) => {
                warn!(%error, "rule store unavailable, continuing with semantic vocabulary only");
                CandidateGenerator::empty()
            }
        }
    }
}

/// Flattened text of a source leaf for form fields.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

