//! Error types for mapping operations.

use std::path::{Path, PathBuf};

use fieldmap_model::ModelError;
use thiserror::Error;

/// Errors that abort a resolution run.
///
/// Everything else (store outages, AI outages, unusable suggestions)
/// degrades the run instead of failing it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("source document is not traversable: expected an object or array, found {found}")]
    MalformedSource { found: &'static str },
    #[error("target skeleton must be an object, found {found}")]
    MalformedTarget { found: &'static str },
}

/// Errors from the rule store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access rule catalogue {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rule catalogue {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize rule catalogue")]
    Serialize(#[source] serde_json::Error),
    #[error(transparent)]
    InvalidRule(#[from] ModelError),
    #[error("rule {key} has an invalid source pattern")]
    InvalidPattern {
        key: String,
        #[source]
        source: regex::Error,
    },
    #[error("rule {key} pattern must have exactly one capture group, found {found}")]
    CaptureCount { key: String, found: usize },
    #[error("rule store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(path: &Path, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MappingError>;
