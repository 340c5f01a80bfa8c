//! Error types for the suggestion provider.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while setting up the provider.
///
/// Per-request failures are reported as [`fieldmap_model::Unavailable`]
/// instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AiError {
    /// Reading or rewriting the credentials file failed.
    #[error("failed to access credentials file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be built.
    #[error("failed to build http client")]
    Client(#[source] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AiError>;
