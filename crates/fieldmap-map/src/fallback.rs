//! Escalation of unresolved fields to a suggestion provider.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use fieldmap_model::{
    SourcePath, Suggestion, SuggestionProvider, SuggestionRequest, TargetField, Unavailable,
    UnfilledTarget, UnmappedField,
};

use crate::resolver::Resolution;

/// Suggestions below this confidence are discarded.
pub const DEFAULT_AI_MIN_CONFIDENCE: f64 = 0.5;

/// Wraps a [`SuggestionProvider`] so that unavailability is never fatal.
#[derive(Clone)]
pub struct AiFallback {
    provider: Arc<dyn SuggestionProvider>,
}

impl std::fmt::Debug for AiFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiFallback").finish_non_exhaustive()
    }
}

impl AiFallback {
    pub fn new(provider: Arc<dyn SuggestionProvider>) -> Self {
        Self { provider }
    }

    /// Collects the unmapped, non-empty source fields and the unfilled targets.
    pub fn build_request(
        resolution: &Resolution,
        leaves: &[SourcePath],
        targets: &[TargetField],
    ) -> SuggestionRequest {
        let unmapped_fields = leaves
            .iter()
            .filter(|leaf| leaf.is_meaningful() && resolution.source_strategy(&leaf.path).is_none())
            .map(|leaf| UnmappedField {
                path: leaf.path.clone(),
                value: leaf.value.clone(),
                inferred_type: leaf.inferred_type,
            })
            .collect();
        let unfilled_targets = targets
            .iter()
            .filter(|target| !resolution.is_filled(&target.path))
            .map(|target| UnfilledTarget {
                path: target.path.clone(),
                hints: target.hints.clone(),
            })
            .collect();
        SuggestionRequest {
            unmapped_fields,
            unfilled_targets,
        }
    }

    /// Issues one batched request. Any unavailability yields no suggestions.
    pub fn suggest(&self, request: &SuggestionRequest) -> Vec<Suggestion> {
        if request.is_empty() {
            return Vec::new();
        }
        let start = Instant::now();
        match self.provider.suggest(request) {
            Ok(suggestions) => {
                info!(
                    unmapped = request.unmapped_fields.len(),
                    unfilled = request.unfilled_targets.len(),
                    suggestions = suggestions.len(),
                    duration_ms = start.elapsed().as_millis(),
                    "ai suggestions received"
                );
                suggestions
            }
            Err(Unavailable::Disabled) => Vec::new(),
            Err(reason) => {
                warn!(
                    %reason,
                    duration_ms = start.elapsed().as_millis(),
                    "ai fallback unavailable, continuing with deterministic mappings"
                );
                Vec::new()
            }
        }
    }
}
