//! Pool of API credentials with persisted eviction.
//!
//! Credentials are tried in order. A credential the model rejects is
//! evicted; when the pool was loaded from a file, the file is rewritten
//! without it so the next process does not try it again.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{AiError, Result};

/// Thread-safe credential pool. All reads and evictions share one lock.
#[derive(Debug)]
pub struct CredentialPool {
    keys: Mutex<Vec<String>>,
    file: Option<PathBuf>,
}

impl CredentialPool {
    /// An in-memory pool; evictions are not persisted.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: Mutex::new(clean(keys.into_iter().map(Into::into))),
            file: None,
        }
    }

    /// Loads one credential per line; blank lines are ignored.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = fs::read_to_string(&path).map_err(|source| AiError::Io {
            path: path.clone(),
            source,
        })?;
        let keys = clean(contents.lines().map(str::to_string));
        debug!(path = %path.display(), credentials = keys.len(), "credential pool loaded");
        Ok(Self {
            keys: Mutex::new(keys),
            file: Some(path),
        })
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The credential to try next.
    pub fn current(&self) -> Option<String> {
        self.lock().first().cloned()
    }

    /// Removes `key` and persists the smaller pool.
    ///
    /// The key is dropped from memory even when the file cannot be
    /// rewritten. Returns `Ok(false)` when the key was already gone.
    pub fn evict(&self, key: &str) -> Result<bool> {
        let mut keys = self.lock();
        let before = keys.len();
        keys.retain(|candidate| candidate != key);
        if keys.len() == before {
            return Ok(false);
        }
        warn!(
            credential = %fingerprint(key),
            remaining = keys.len(),
            "credential evicted"
        );
        if let Some(path) = &self.file {
            persist(path, &keys)?;
        }
        Ok(true)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        // Every mutation is a single retain, so a poisoned pool is still consistent.
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn clean(keys: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for key in keys {
        let key = key.trim();
        if !key.is_empty() && !out.iter().any(|existing| existing == key) {
            out.push(key.to_string());
        }
    }
    out
}

fn persist(path: &Path, keys: &[String]) -> Result<()> {
    let mut contents = keys.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    let staging = path.with_extension("tmp");
    fs::write(&staging, contents).map_err(|source| AiError::Io {
        path: staging.clone(),
        source,
    })?;
    fs::rename(&staging, path).map_err(|source| AiError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Short, non-reversible label for a credential in logs.
pub fn fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_pool_trims_and_dedupes() {
        let pool = CredentialPool::from_keys(["  a ", "", "b", "a"]);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.current().as_deref(), Some("a"));
    }

    #[test]
    fn eviction_advances_the_pool() {
        let pool = CredentialPool::from_keys(["a", "b"]);
        assert!(pool.evict("a").expect("evict"));
        assert!(!pool.evict("a").expect("evict again"));
        assert_eq!(pool.current().as_deref(), Some("b"));
        assert!(pool.evict("b").expect("evict last"));
        assert!(pool.is_empty());
        assert_eq!(pool.current(), None);
    }

    #[test]
    fn fingerprint_hides_the_key() {
        let label = fingerprint("secret-key");
        assert_eq!(label.len(), 8);
        assert!(!label.contains("secret"));
        assert_eq!(label, fingerprint("secret-key"));
    }
}
