pub mod error;
pub mod mapping;
pub mod rule;
pub mod source;
pub mod suggestion;
pub mod target;

pub use error::{ModelError, Result};
pub use mapping::{CandidateMapping, MappingReport, ResolvedMapping};
pub use rule::{FIELD_PLACEHOLDER, MappingRule, RuleKey, RuleKind, Strategy};
pub use source::{InferredType, SourcePath, is_meaningful_value, terminal_segment};
pub use suggestion::{
    Suggestion, SuggestionProvider, SuggestionRequest, Unavailable, UnfilledTarget, UnmappedField,
};
pub use target::{FieldDescriptor, TargetField};
