//! Generative-model suggestion provider.
//!
//! Implements [`fieldmap_model::SuggestionProvider`] on top of a blocking
//! HTTP transport:
//!
//! - **Credential pool**: keys tried in order, rejected keys evicted and
//!   the eviction written back to the credentials file
//! - **Response cache**: bounded LRU keyed by the SHA-256 of the request,
//!   with a time-to-live
//! - **Prompt / parser**: one batched prompt, tolerant JSON extraction

pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod transport;

pub use cache::ResponseCache;
pub use config::AiConfig;
pub use credentials::CredentialPool;
pub use error::{AiError, Result};
pub use prompt::{build_prompt, parse_suggestions};
pub use provider::PooledSuggestionProvider;
pub use transport::{HttpTransport, Transport, TransportError, classify_failure};
