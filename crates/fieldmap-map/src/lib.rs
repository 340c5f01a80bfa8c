//! Field mapping resolution.
//!
//! This crate resolves the leaves of an arbitrary JSON source document onto
//! a target schema (a JSON skeleton or a list of PDF form fields):
//!
//! - **Rules**: exact, pattern, and context rules from a [`RuleStore`]
//! - **Semantic**: the built-in tag vocabulary with fuzzy matching
//! - **AI fallback**: a [`fieldmap_model::SuggestionProvider`] consulted when
//!   deterministic coverage is low
//!
//! # Example
//!
//! ```ignore
//! use fieldmap_map::FieldMappingEngine;
//!
//! let engine = FieldMappingEngine::without_store();
//! let resolved = engine.resolve_document(&source, &skeleton)?;
//! println!("accuracy: {:.2}", resolved.report.accuracy);
//! ```

pub mod candidates;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod naming;
pub mod paths;
pub mod report;
pub mod repository;
pub mod resolver;
pub mod vocabulary;

pub use candidates::{CandidateGenerator, TargetIndex};
pub use defaults::default_rules;
pub use engine::{
    DocumentResolution, EngineConfig, FieldMappingEngine, FieldResolution, RunDiagnostics,
    RunOutcome, value_text,
};
pub use error::{MappingError, Result, StoreError};
pub use fallback::{AiFallback, DEFAULT_AI_MIN_CONFIDENCE};
pub use paths::{flatten, lookup, materialize, materialize_segments, target_fields, target_paths};
pub use report::{build_report, strategy_breakdown};
pub use repository::{RuleRepository, RuleStore, StoredRuleCatalogue};
pub use resolver::{Resolution, Resolver, StrategyFloors};
