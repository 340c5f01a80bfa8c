//! Candidate generation across the exact, pattern, context, and semantic
//! strategies.
//!
//! Every strategy runs for every source leaf and every candidate is handed
//! to the resolver unfiltered; precedence is the resolver's job.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::warn;

use fieldmap_model::{
    CandidateMapping, FIELD_PLACEHOLDER, MappingRule, RuleKind, SourcePath, Strategy, TargetField,
};

use crate::error::StoreError;
use crate::naming::{compact, label_case, path_key, strip_envelope};
use crate::vocabulary::{self, SemanticMatch, Section};

pub const EXACT_BAND: f64 = 1.0;
pub const PATTERN_BAND: f64 = 0.9;
pub const CONTEXT_BAND: f64 = 0.85;

/// Priority given to candidates that no rule produced.
pub const HEURISTIC_PRIORITY: u32 = u32::MAX;

/// Vocabulary matches whose source sits in the target's own section outrank
/// unscoped sources for that target.
pub const SCOPED_PRIORITY: u32 = HEURISTIC_PRIORITY - 1;

/// Compiles the source pattern of a pattern rule.
///
/// The pattern is matched case-insensitively against the whole tail of a
/// source path, starting at a segment boundary, so `State\.(\w+)` matches
/// `payload.State.name` but not `payload.State.countryMaster.name`.
pub(crate) fn compile_pattern(rule: &MappingRule) -> Result<Option<Regex>, StoreError> {
    let RuleKind::Pattern { source_pattern, .. } = &rule.kind else {
        return Ok(None);
    };
    let regex = Regex::new(&format!(r"(?i)(?:^|\.)(?:{source_pattern})$")).map_err(|source| {
        StoreError::InvalidPattern {
            key: rule.key().to_string(),
            source,
        }
    })?;
    let groups = regex.captures_len() - 1;
    if groups != 1 {
        return Err(StoreError::CaptureCount {
            key: rule.key().to_string(),
            found: groups,
        });
    }
    Ok(Some(regex))
}

/// Lookup from generated target names to the targets of the current run.
///
/// Names resolve by exact spelling, then by [`compact`] form. Undotted names
/// also resolve against the terminal segment of nested targets when exactly
/// one target has it. Anything else is not a target and is discarded.
#[derive(Debug, Clone)]
pub struct TargetIndex {
    targets: Vec<TargetField>,
    exact: BTreeMap<String, usize>,
    compact: BTreeMap<String, usize>,
    terminal: BTreeMap<String, Vec<usize>>,
    tags: Vec<Option<SemanticMatch>>,
}

impl TargetIndex {
    pub fn new(targets: &[TargetField]) -> Self {
        let mut exact = BTreeMap::new();
        let mut compact_index = BTreeMap::new();
        let mut terminal: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut tags = Vec::with_capacity(targets.len());
        for (idx, target) in targets.iter().enumerate() {
            exact.entry(target.path.clone()).or_insert(idx);
            compact_index.entry(compact(&target.path)).or_insert(idx);
            let segments = target.path_segments();
            let last = segments.last().copied().unwrap_or(target.path.as_str());
            if segments.len() > 1 {
                terminal.entry(compact(last)).or_default().push(idx);
            }
            tags.push(vocabulary::classify(last));
        }
        Self {
            targets: targets.to_vec(),
            exact,
            compact: compact_index,
            terminal,
            tags,
        }
    }

    pub fn targets(&self) -> &[TargetField] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Resolves a generated name to the path of an existing target.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.position(name)
            .map(|idx| self.targets[idx].path.as_str())
    }

    fn position(&self, name: &str) -> Option<usize> {
        if let Some(idx) = self.exact.get(name) {
            return Some(*idx);
        }
        let key = compact(name);
        if key.is_empty() {
            return None;
        }
        if let Some(idx) = self.compact.get(&key) {
            return Some(*idx);
        }
        if name.contains('.') {
            return None;
        }
        match self.terminal.get(&key).map(Vec::as_slice) {
            Some([only]) => Some(*only),
            _ => None,
        }
    }

    fn tagged(&self) -> impl Iterator<Item = (&TargetField, SemanticMatch)> {
        self.targets
            .iter()
            .zip(&self.tags)
            .filter_map(|(target, tag)| tag.map(|tag| (target, tag)))
    }
}

struct ContextRule {
    bucket: String,
    depth: usize,
    template: String,
    rule: MappingRule,
}

struct PatternRule {
    regex: Regex,
    template: String,
    rule: MappingRule,
}

/// Compiled view of one run's rule set.
pub struct CandidateGenerator {
    exact: BTreeMap<String, Vec<MappingRule>>,
    promoted: BTreeMap<String, Vec<MappingRule>>,
    patterns: Vec<PatternRule>,
    contexts: Vec<ContextRule>,
}

impl CandidateGenerator {
    /// Compiles the active rules. Rules that fail to compile are skipped.
    pub fn new(rules: Vec<MappingRule>) -> Self {
        let mut generator = Self::empty();
        for rule in rules {
            if let Err(error) = rule.validate() {
                warn!(rule = %rule.key(), %error, "skipping invalid rule");
                continue;
            }
            match &rule.kind {
                RuleKind::Exact { source_path, .. } => generator
                    .exact
                    .entry(path_key(source_path))
                    .or_default()
                    .push(rule),
                RuleKind::Ai { source_path, .. } => generator
                    .promoted
                    .entry(path_key(source_path))
                    .or_default()
                    .push(rule),
                RuleKind::Pattern {
                    target_template, ..
                } => match compile_pattern(&rule) {
                    Ok(Some(regex)) => generator.patterns.push(PatternRule {
                        regex,
                        template: target_template.clone(),
                        rule,
                    }),
                    Ok(None) => {}
                    Err(error) => warn!(rule = %rule.key(), %error, "skipping invalid rule"),
                },
                RuleKind::Context {
                    bucket,
                    target_template,
                } => {
                    let bucket = path_key(bucket);
                    generator.contexts.push(ContextRule {
                        depth: bucket.split('.').count(),
                        bucket,
                        template: target_template.clone(),
                        rule,
                    });
                }
            }
        }
        generator
    }

    /// A generator with no rules; only the semantic strategy produces candidates.
    pub fn empty() -> Self {
        Self {
            exact: BTreeMap::new(),
            promoted: BTreeMap::new(),
            patterns: Vec::new(),
            contexts: Vec::new(),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.exact.values().map(Vec::len).sum::<usize>()
            + self.promoted.values().map(Vec::len).sum::<usize>()
            + self.patterns.len()
            + self.contexts.len()
    }

    pub fn generate(&self, leaves: &[SourcePath], targets: &TargetIndex) -> Vec<CandidateMapping> {
        let mut candidates = Vec::new();
        for leaf in leaves {
            let key = path_key(&leaf.path);
            self.exact_candidates(leaf, &key, targets, &mut candidates);
            self.pattern_candidates(leaf, targets, &mut candidates);
            self.context_candidates(leaf, &key, targets, &mut candidates);
            semantic_candidates(leaf, &key, targets, &mut candidates);
            self.promoted_candidates(leaf, &key, targets, &mut candidates);
        }
        candidates
    }

    fn exact_candidates(
        &self,
        leaf: &SourcePath,
        key: &str,
        targets: &TargetIndex,
        out: &mut Vec<CandidateMapping>,
    ) {
        for rule in self.exact.get(key).into_iter().flatten() {
            if let Some(target) = targets.resolve(rule.kind.target()) {
                out.push(CandidateMapping {
                    source_path: leaf.path.clone(),
                    target_path: target.to_string(),
                    confidence: EXACT_BAND * rule.confidence,
                    strategy: Strategy::Exact,
                    priority: rule.priority,
                    reasoning: format!("exact rule {}", rule.key()),
                });
            }
        }
    }

    fn promoted_candidates(
        &self,
        leaf: &SourcePath,
        key: &str,
        targets: &TargetIndex,
        out: &mut Vec<CandidateMapping>,
    ) {
        for rule in self.promoted.get(key).into_iter().flatten() {
            if let Some(target) = targets.resolve(rule.kind.target()) {
                out.push(CandidateMapping {
                    source_path: leaf.path.clone(),
                    target_path: target.to_string(),
                    confidence: rule.confidence,
                    strategy: Strategy::Ai,
                    priority: rule.priority,
                    reasoning: format!("stored ai rule {}", rule.key()),
                });
            }
        }
    }

    fn pattern_candidates(
        &self,
        leaf: &SourcePath,
        targets: &TargetIndex,
        out: &mut Vec<CandidateMapping>,
    ) {
        let path = strip_envelope(&leaf.path);
        for pattern in &self.patterns {
            let Some(field) = pattern
                .regex
                .captures(path)
                .and_then(|captures| captures.get(1))
                .map(|capture| capture.as_str())
            else {
                continue;
            };
            let generated = pattern.template.replace(FIELD_PLACEHOLDER, field);
            if let Some(target) = targets.resolve(&generated) {
                out.push(CandidateMapping {
                    source_path: leaf.path.clone(),
                    target_path: target.to_string(),
                    confidence: PATTERN_BAND * pattern.rule.confidence,
                    strategy: Strategy::Pattern,
                    priority: pattern.rule.priority,
                    reasoning: format!("pattern {} captured '{field}'", pattern.rule.key().source),
                });
            }
        }
    }

    fn context_candidates(
        &self,
        leaf: &SourcePath,
        key: &str,
        targets: &TargetIndex,
        out: &mut Vec<CandidateMapping>,
    ) {
        let Some((parent, terminal)) = key.rsplit_once('.') else {
            return;
        };
        let matching: Vec<&ContextRule> = self
            .contexts
            .iter()
            .filter(|context| is_segment_suffix(parent, &context.bucket))
            .collect();
        let Some(depth) = matching.iter().map(|context| context.depth).max() else {
            return;
        };
        let attribute = vocabulary::classify(terminal).map(|hit| hit.tag.attribute);
        let fallback = label_case(terminal);
        for context in matching.into_iter().filter(|context| context.depth == depth) {
            let resolved = attribute
                .and_then(|attribute| {
                    targets.resolve(&context.template.replace(FIELD_PLACEHOLDER, attribute))
                })
                .or_else(|| targets.resolve(&context.template.replace(FIELD_PLACEHOLDER, &fallback)));
            if let Some(target) = resolved {
                out.push(CandidateMapping {
                    source_path: leaf.path.clone(),
                    target_path: target.to_string(),
                    confidence: CONTEXT_BAND * context.rule.confidence,
                    strategy: Strategy::Context,
                    priority: context.rule.priority,
                    reasoning: format!("context bucket {}", context.bucket),
                });
            }
        }
    }
}

fn is_segment_suffix(path: &str, suffix: &str) -> bool {
    path == suffix
        || path
            .strip_suffix(suffix)
            .is_some_and(|head| head.ends_with('.'))
}

/// Vocabulary candidates for one leaf.
///
/// A target scoped to a section (`PA_City`) is only proposed when the leaf is
/// unscoped or scoped to the same section. A same-section leaf wins over an
/// unscoped one regardless of document order.
fn semantic_candidates(
    leaf: &SourcePath,
    key: &str,
    targets: &TargetIndex,
    out: &mut Vec<CandidateMapping>,
) {
    let Some(source_hit) = vocabulary::classify(leaf.terminal()) else {
        return;
    };
    let scope = key
        .rsplit_once('.')
        .and_then(|(parent, _)| Section::from_path(parent));
    for (target, target_hit) in targets.tagged() {
        if target_hit.tag.tag != source_hit.tag.tag {
            continue;
        }
        let target_section = target_hit.prefix.and_then(Section::from_prefix);
        let priority = match (target_section, scope) {
            (Some(target_section), Some(scope)) if target_section != scope => continue,
            (Some(_), Some(_)) => SCOPED_PRIORITY,
            _ => HEURISTIC_PRIORITY,
        };
        let confidence = source_hit.score.min(target_hit.score);
        let reasoning = if source_hit.is_synonym() && target_hit.is_synonym() {
            format!("synonym of {}", source_hit.tag.tag)
        } else {
            format!("similar to {} ({confidence:.2})", source_hit.tag.tag)
        };
        out.push(CandidateMapping {
            source_path: leaf.path.clone(),
            target_path: target.path.clone(),
            confidence,
            strategy: Strategy::Semantic,
            priority,
            reasoning,
        });
    }
}
