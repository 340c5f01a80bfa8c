//! Credential-pooled, cached [`SuggestionProvider`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use fieldmap_model::{Suggestion, SuggestionProvider, SuggestionRequest, Unavailable};

use crate::cache::ResponseCache;
use crate::config::AiConfig;
use crate::credentials::{CredentialPool, fingerprint};
use crate::error::Result;
use crate::prompt::{build_prompt, parse_suggestions};
use crate::transport::{HttpTransport, Transport, TransportError};

/// Suggestion provider backed by a pool of model credentials.
///
/// Identical requests within the cache lifetime are answered from the
/// cache. A credential the model rejects is evicted and the next one is
/// tried; timeouts and other failures end the attempt without eviction.
pub struct PooledSuggestionProvider {
    transport: Arc<dyn Transport>,
    pool: Arc<CredentialPool>,
    cache: Arc<ResponseCache>,
}

impl std::fmt::Debug for PooledSuggestionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledSuggestionProvider")
            .field("credentials", &self.pool.len())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl PooledSuggestionProvider {
    pub fn new(
        transport: Arc<dyn Transport>,
        pool: Arc<CredentialPool>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            transport,
            pool,
            cache,
        }
    }

    /// Builds the HTTP-backed provider from config.
    ///
    /// Returns `Ok(None)` when the provider is disabled or no credentials
    /// file is configured.
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let Some(path) = &config.credentials_file else {
            debug!("no credentials file configured, ai fallback disabled");
            return Ok(None);
        };
        let pool = CredentialPool::from_file(path)?;
        let transport = HttpTransport::new(&config.endpoint, &config.model, config.timeout())?;
        Ok(Some(Self::new(
            Arc::new(transport),
            Arc::new(pool),
            Arc::new(ResponseCache::new(config.cache_capacity, config.cache_ttl())),
        )))
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    fn call_with_pool(&self, prompt: &str) -> std::result::Result<String, Unavailable> {
        while let Some(credential) = self.pool.current() {
            let start = Instant::now();
            match self.transport.complete(&credential, prompt) {
                Ok(text) => {
                    debug!(
                        credential = %fingerprint(&credential),
                        duration_ms = start.elapsed().as_millis(),
                        "completion received"
                    );
                    return Ok(text);
                }
                Err(TransportError::Credential(reason)) => {
                    warn!(
                        credential = %fingerprint(&credential),
                        %reason,
                        "credential rejected, trying next"
                    );
                    if let Err(error) = self.pool.evict(&credential) {
                        warn!(%error, "failed to persist credential eviction");
                    }
                }
                Err(TransportError::Timeout) => return Err(Unavailable::Timeout),
                Err(TransportError::Other(reason)) => return Err(Unavailable::Transport(reason)),
            }
        }
        Err(Unavailable::CredentialsExhausted)
    }
}

impl SuggestionProvider for PooledSuggestionProvider {
    fn suggest(
        &self,
        request: &SuggestionRequest,
    ) -> std::result::Result<Vec<Suggestion>, Unavailable> {
        if request.is_empty() {
            return Ok(Vec::new());
        }
        let key = ResponseCache::key_for(request);
        if let Some(cached) = key.as_deref().and_then(|key| self.cache.get(key)) {
            debug!(suggestions = cached.len(), "ai response served from cache");
            return Ok(cached);
        }

        let prompt = build_prompt(request);
        let text = self.call_with_pool(&prompt)?;
        let suggestions = parse_suggestions(&text)?;
        info!(suggestions = suggestions.len(), "ai response parsed");
        if let Some(key) = key {
            self.cache.insert(key, suggestions.clone());
        }
        Ok(suggestions)
    }
}
