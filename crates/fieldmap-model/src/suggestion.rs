//! Contract between the engine and a generative suggestion capability.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::source::InferredType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmappedField {
    pub path: String,
    pub value: Value,
    pub inferred_type: InferredType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfilledTarget {
    pub path: String,
    #[serde(default)]
    pub hints: Vec<String>,
}

/// One batched request for the fields the deterministic strategies left behind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub unmapped_fields: Vec<UnmappedField>,
    pub unfilled_targets: Vec<UnfilledTarget>,
}

impl SuggestionRequest {
    pub fn is_empty(&self) -> bool {
        self.unmapped_fields.is_empty() || self.unfilled_targets.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub source: String,
    pub target: String,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// Why a provider produced no suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unavailable {
    #[error("suggestion capability is disabled")]
    Disabled,
    #[error("no credentials left in the pool")]
    CredentialsExhausted,
    #[error("suggestion request timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed suggestion response: {0}")]
    Malformed(String),
}

/// Produces mapping suggestions for unresolved fields.
///
/// Implementations signal failure through [`Unavailable`] and never panic.
pub trait SuggestionProvider: Send + Sync {
    fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<Suggestion>, Unavailable>;
}
