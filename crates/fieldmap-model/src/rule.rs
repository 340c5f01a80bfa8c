//! Durable mapping rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::source::InferredType;

/// Placeholder substituted into pattern and context target templates.
pub const FIELD_PLACEHOLDER: &str = "{field}";

/// Resolution strategy, in the order the resolver runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Exact,
    Pattern,
    Context,
    Semantic,
    Ai,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Self::Exact,
        Self::Pattern,
        Self::Context,
        Self::Semantic,
        Self::Ai,
    ];

    /// Position in the fixed run order (exact first, ai last).
    pub fn rank(self) -> u8 {
        match self {
            Self::Exact => 0,
            Self::Pattern => 1,
            Self::Context => 2,
            Self::Semantic => 3,
            Self::Ai => 4,
        }
    }

    /// Strategies driven by the rule catalogue rather than heuristics.
    pub fn is_deterministic(self) -> bool {
        matches!(self, Self::Exact | Self::Pattern | Self::Context)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Pattern => "pattern",
            Self::Context => "context",
            Self::Semantic => "semantic",
            Self::Ai => "ai",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The strategy-specific shape of a rule.
///
/// Each variant carries only the fields its strategy reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum RuleKind {
    /// Literal source path to literal target field.
    Exact {
        source_path: String,
        target_path: String,
    },
    /// Anchored regex with one capture group; the capture fills `{field}`.
    Pattern {
        source_pattern: String,
        target_template: String,
    },
    /// Parent-path bucket whose leaves map through `{field}` into a prefixed target.
    Context {
        bucket: String,
        target_template: String,
    },
    /// A suggestion from the AI capability promoted to a durable rule.
    Ai {
        source_path: String,
        target_path: String,
    },
}

impl RuleKind {
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::Exact { .. } => Strategy::Exact,
            Self::Pattern { .. } => Strategy::Pattern,
            Self::Context { .. } => Strategy::Context,
            Self::Ai { .. } => Strategy::Ai,
        }
    }

    /// The source side of the rule: a path, pattern, or bucket.
    pub fn source(&self) -> &str {
        match self {
            Self::Exact { source_path, .. } | Self::Ai { source_path, .. } => source_path,
            Self::Pattern { source_pattern, .. } => source_pattern,
            Self::Context { bucket, .. } => bucket,
        }
    }

    /// The target side of the rule: a field name or a `{field}` template.
    pub fn target(&self) -> &str {
        match self {
            Self::Exact { target_path, .. } | Self::Ai { target_path, .. } => target_path,
            Self::Pattern {
                target_template, ..
            }
            | Self::Context {
                target_template, ..
            } => target_template,
        }
    }
}

/// Uniqueness key of a rule in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleKey {
    pub source: String,
    pub target: String,
}

impl RuleKey {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// A persisted mapping rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    #[serde(flatten)]
    pub kind: RuleKind,
    #[serde(default)]
    pub semantic_meaning: String,
    #[serde(default)]
    pub field_type: Option<InferredType>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Lower runs first.
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default)]
    pub is_required: bool,
    /// Informational only; values are never validated against these.
    #[serde(default)]
    pub validation_patterns: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_confidence() -> f64 {
    1.0
}

fn default_priority() -> u32 {
    100
}

fn default_active() -> bool {
    true
}

impl MappingRule {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            semantic_meaning: String::new(),
            field_type: None,
            confidence: default_confidence(),
            priority: default_priority(),
            is_required: false,
            validation_patterns: Vec::new(),
            is_active: true,
        }
    }

    pub fn exact(source_path: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self::new(RuleKind::Exact {
            source_path: source_path.into(),
            target_path: target_path.into(),
        })
    }

    pub fn pattern(source_pattern: impl Into<String>, target_template: impl Into<String>) -> Self {
        Self::new(RuleKind::Pattern {
            source_pattern: source_pattern.into(),
            target_template: target_template.into(),
        })
    }

    pub fn context(bucket: impl Into<String>, target_template: impl Into<String>) -> Self {
        Self::new(RuleKind::Context {
            bucket: bucket.into(),
            target_template: target_template.into(),
        })
    }

    pub fn ai(source_path: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self::new(RuleKind::Ai {
            source_path: source_path.into(),
            target_path: target_path.into(),
        })
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    #[must_use]
    pub fn with_meaning(mut self, meaning: impl Into<String>) -> Self {
        self.semantic_meaning = meaning.into();
        self
    }

    #[must_use]
    pub fn with_field_type(mut self, field_type: InferredType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    #[must_use]
    pub fn with_validation(mut self, pattern: impl Into<String>) -> Self {
        self.validation_patterns.push(pattern.into());
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.kind.strategy()
    }

    pub fn key(&self) -> RuleKey {
        RuleKey::new(self.kind.source(), self.kind.target())
    }

    /// Checks the structural invariants every stored rule must satisfy.
    ///
    /// Regex syntax of pattern rules is checked by the engine when it
    /// compiles the rule set.
    pub fn validate(&self) -> Result<()> {
        let key = self.key();
        if key.source.trim().is_empty() || key.target.trim().is_empty() {
            return Err(ModelError::EmptyPath {
                key: key.to_string(),
            });
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ModelError::InvalidConfidence {
                key: key.to_string(),
                value: self.confidence,
            });
        }
        if matches!(
            self.kind,
            RuleKind::Pattern { .. } | RuleKind::Context { .. }
        ) && !key.target.contains(FIELD_PLACEHOLDER)
        {
            return Err(ModelError::MissingPlaceholder {
                key: key.to_string(),
            });
        }
        Ok(())
    }
}
