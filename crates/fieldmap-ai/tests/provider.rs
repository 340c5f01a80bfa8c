use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

use serde_json::json;

use fieldmap_ai::{CredentialPool, PooledSuggestionProvider, ResponseCache, Transport, TransportError};
use fieldmap_model::{
    InferredType, SuggestionProvider, SuggestionRequest, Unavailable, UnfilledTarget,
    UnmappedField,
};

const RESPONSE: &str = r#"{"mappings": [
    {"source": "payload.agent.phone", "target": "RA Phone", "confidence": 0.82, "reasoning": "phone"}
]}"#;

/// Answers per credential and records which credentials were used.
struct ScriptedTransport {
    answers: BTreeMap<String, Result<String, TransportError>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(answers: &[(&str, Result<&str, TransportError>)]) -> Arc<Self> {
        Arc::new(Self {
            answers: answers
                .iter()
                .map(|(key, answer)| {
                    (
                        (*key).to_string(),
                        answer.clone().map(str::to_string),
                    )
                })
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl Transport for ScriptedTransport {
    fn complete(&self, credential: &str, _prompt: &str) -> Result<String, TransportError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(credential.to_string());
        self.answers
            .get(credential)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::Credential("unknown key".to_string())))
    }
}

fn temp_credentials(name: &str, contents: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("fieldmap_ai_{name}_{stamp}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("api_keys.txt");
    fs::write(&path, contents).expect("write credentials");
    path
}

fn cleanup(path: &PathBuf) {
    if let Some(dir) = path.parent() {
        let _ = fs::remove_dir_all(dir);
    }
}

fn request() -> SuggestionRequest {
    request_with("555-0100")
}

fn request_with(phone: &str) -> SuggestionRequest {
    SuggestionRequest {
        unmapped_fields: vec![UnmappedField {
            path: "payload.agent.phone".to_string(),
            value: json!(phone),
            inferred_type: InferredType::Phone,
        }],
        unfilled_targets: vec![UnfilledTarget {
            path: "RA Phone".to_string(),
            hints: Vec::new(),
        }],
    }
}

fn provider(transport: Arc<ScriptedTransport>, pool: CredentialPool) -> PooledSuggestionProvider {
    PooledSuggestionProvider::new(
        transport,
        Arc::new(pool),
        Arc::new(ResponseCache::new(10, Duration::from_secs(60))),
    )
}

#[test]
fn rejected_credential_is_evicted_and_persisted() {
    let path = temp_credentials("evict", "key-a\n\nkey-b\n");
    let transport = ScriptedTransport::new(&[
        ("key-a", Err(TransportError::Credential("status 429".to_string()))),
        ("key-b", Ok(RESPONSE)),
    ]);
    let first = provider(
        transport.clone(),
        CredentialPool::from_file(&path).expect("load pool"),
    );

    let suggestions = first.suggest(&request()).expect("suggestions");
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].target, "RA Phone");
    assert_eq!(transport.calls(), vec!["key-a", "key-b"]);
    assert_eq!(first.pool().len(), 1);

    let persisted = fs::read_to_string(&path).expect("read credentials");
    assert_eq!(persisted.lines().collect::<Vec<_>>(), vec!["key-b"]);

    let next_run = CredentialPool::from_file(&path).expect("reload pool");
    assert_eq!(next_run.len(), 1);
    assert_eq!(next_run.current().as_deref(), Some("key-b"));

    cleanup(&path);
}

#[test]
fn concurrent_rejections_evict_a_credential_once() {
    const THREADS: usize = 8;
    let path = temp_credentials("concurrent", "key-a\nkey-b\nkey-c\n");
    let transport = ScriptedTransport::new(&[
        ("key-a", Err(TransportError::Credential("status 401".to_string()))),
        ("key-b", Ok(RESPONSE)),
        ("key-c", Ok(RESPONSE)),
    ]);
    let provider = provider(
        transport.clone(),
        CredentialPool::from_file(&path).expect("load pool"),
    );
    let barrier = Barrier::new(THREADS);

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|idx| {
                let provider = &provider;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    provider.suggest(&request_with(&format!("555-01{idx:02}")))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("worker thread"))
            .collect()
    });

    for result in &results {
        let suggestions = result.as_ref().expect("suggestions");
        assert_eq!(suggestions.len(), 1);
    }
    assert_eq!(provider.pool().len(), 2);
    assert_eq!(provider.pool().current().as_deref(), Some("key-b"));

    let calls = transport.calls();
    assert!(!calls.iter().any(|key| key == "key-c"));
    assert_eq!(calls.iter().filter(|key| *key == "key-b").count(), THREADS);

    let persisted = fs::read_to_string(&path).expect("read credentials");
    assert_eq!(persisted.lines().collect::<Vec<_>>(), vec!["key-b", "key-c"]);
    assert!(!path.with_extension("tmp").exists());

    cleanup(&path);
}

#[test]
fn identical_requests_are_served_from_cache() {
    let transport = ScriptedTransport::new(&[("key-a", Ok(RESPONSE))]);
    let provider = provider(transport.clone(), CredentialPool::from_keys(["key-a"]));

    let first = provider.suggest(&request()).expect("first call");
    let second = provider.suggest(&request()).expect("second call");

    assert_eq!(first, second);
    assert_eq!(transport.calls().len(), 1);
    assert_eq!(provider.cache().len(), 1);
}

#[test]
fn exhausted_pool_is_unavailable() {
    let transport = ScriptedTransport::new(&[(
        "key-a",
        Err(TransportError::Credential("status 403".to_string())),
    )]);
    let provider = provider(transport.clone(), CredentialPool::from_keys(["key-a"]));

    assert_eq!(
        provider.suggest(&request()),
        Err(Unavailable::CredentialsExhausted)
    );
    assert!(provider.pool().is_empty());

    assert_eq!(
        provider.suggest(&request()),
        Err(Unavailable::CredentialsExhausted)
    );
    assert_eq!(transport.calls().len(), 1);
}

#[test]
fn timeouts_keep_the_credential() {
    let transport = ScriptedTransport::new(&[("key-a", Err(TransportError::Timeout))]);
    let provider = provider(transport.clone(), CredentialPool::from_keys(["key-a", "key-b"]));

    assert_eq!(provider.suggest(&request()), Err(Unavailable::Timeout));
    assert_eq!(provider.pool().len(), 2);
    assert_eq!(transport.calls(), vec!["key-a"]);
}

#[test]
fn malformed_responses_are_not_cached() {
    let transport = ScriptedTransport::new(&[("key-a", Ok("Sorry, I can't do that."))]);
    let provider = provider(transport.clone(), CredentialPool::from_keys(["key-a"]));

    assert!(matches!(
        provider.suggest(&request()),
        Err(Unavailable::Malformed(_))
    ));
    assert!(provider.cache().is_empty());
    assert!(provider.suggest(&request()).is_err());
    assert_eq!(transport.calls().len(), 2);
    assert_eq!(provider.pool().len(), 1);
}

#[test]
fn empty_requests_skip_the_model() {
    let transport = ScriptedTransport::new(&[("key-a", Ok(RESPONSE))]);
    let provider = provider(transport.clone(), CredentialPool::from_keys(["key-a"]));

    let suggestions = provider
        .suggest(&SuggestionRequest::default())
        .expect("empty request");
    assert!(suggestions.is_empty());
    assert!(transport.calls().is_empty());
}

#[test]
fn missing_credentials_file_is_an_error() {
    let path = std::env::temp_dir().join("fieldmap_ai_missing_dir").join("keys.txt");
    assert!(CredentialPool::from_file(&path).is_err());
}

#[test]
fn provider_is_disabled_without_credentials() {
    let mut config = fieldmap_ai::AiConfig::default();
    assert!(
        PooledSuggestionProvider::from_config(&config)
            .expect("no credentials")
            .is_none()
    );

    let path = temp_credentials("disabled", "key-a\n");
    config.credentials_file = Some(path.clone());
    config.enabled = false;
    assert!(
        PooledSuggestionProvider::from_config(&config)
            .expect("disabled")
            .is_none()
    );

    cleanup(&path);
}
