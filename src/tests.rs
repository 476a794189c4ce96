//! Unit tests for TriageEngine and the HTTP layer

use crate::*;
use crate::server::{AppState, ErrorResponse, HealthResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::assert_err;

/// Helper to create a KB entry
pub(crate) fn kb_entry(id: &str, title: &str, symptoms: &[&str]) -> KbEntry {
    KbEntry {
        id: id.to_string(),
        title: title.to_string(),
        category: "Bug".to_string(),
        symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
        recommended_action: String::new(),
    }
}

/// Four-entry KB used across module tests
pub(crate) fn sample_kb() -> SharedKnowledgeBase {
    let entries = vec![
        KbEntry {
            id: "KB-1".to_string(),
            title: "Checkout error 500 on mobile".to_string(),
            category: "Bug".to_string(),
            symptoms: vec!["checkout".into(), "error 500".into(), "mobile".into(), "payment".into()],
            recommended_action: "Clear cache and retry".to_string(),
        },
        KbEntry {
            id: "KB-2".to_string(),
            title: "Password reset email not received".to_string(),
            category: "Login".to_string(),
            symptoms: vec!["password reset".into(), "email".into(), "spam folder".into()],
            recommended_action: "Check spam folder and resend the reset link".to_string(),
        },
        KbEntry {
            id: "KB-3".to_string(),
            title: "Duplicate charge on invoice".to_string(),
            category: "Billing".to_string(),
            symptoms: vec!["charged twice".into(), "invoice".into(), "refund".into()],
            recommended_action: "Verify the transaction in the billing console and issue a refund".to_string(),
        },
        KbEntry {
            id: "KB-4".to_string(),
            title: "Dashboard loads slowly".to_string(),
            category: "Performance".to_string(),
            symptoms: vec!["slow".into(), "dashboard".into(), "timeout".into()],
            recommended_action: "Check the status page for ongoing incidents".to_string(),
        },
    ];
    Arc::new(KnowledgeBase::from_entries(entries).unwrap())
}

/// Provider double that replays scripted responses in order and counts calls
pub(crate) struct ScriptedProvider {
    completions: Mutex<VecDeque<Result<String, ProviderError>>>,
    embeddings: Mutex<VecDeque<Result<Vec<f32>, ProviderError>>>,
    completion_calls: AtomicUsize,
    embedding_calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(
        completions: Vec<Result<String, ProviderError>>,
        embeddings: Vec<Result<Vec<f32>, ProviderError>>,
    ) -> Self {
        Self {
            completions: Mutex::new(completions.into()),
            embeddings: Mutex::new(embeddings.into()),
            completion_calls: AtomicUsize::new(0),
            embedding_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_completions(completions: Vec<Result<String, ProviderError>>) -> Self {
        Self::new(completions, vec![])
    }

    pub(crate) fn with_embeddings(embeddings: Vec<Result<Vec<f32>, ProviderError>>) -> Self {
        Self::new(vec![], embeddings)
    }

    pub(crate) fn completion_calls(&self) -> usize {
        self.completion_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn embedding_calls(&self) -> usize {
        self.embedding_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete_json(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, ProviderError> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::InvalidResponse("script exhausted".to_string())))
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        self.embedding_calls.fetch_add(1, Ordering::SeqCst);
        self.embeddings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::InvalidResponse("script exhausted".to_string())))
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
        max_elapsed: None,
    }
}

fn lexical_engine(kb: SharedKnowledgeBase, threshold: f32) -> SharedTriageEngine {
    TriageEngine::new(
        Arc::new(RuleClassifier),
        Arc::new(LexicalIndex::new(kb)),
        DecisionPolicy::new(threshold),
    )
}

const CHECKOUT_TICKET: &str = "Checkout keeps failing with error 500 on mobile when I try to pay.";

#[tokio::test]
async fn test_end_to_end_known_issue() {
    let engine = lexical_engine(sample_kb(), 0.3);
    let result = engine.triage(CHECKOUT_TICKET).await.unwrap();

    assert_eq!(result.summary, CHECKOUT_TICKET);
    assert_eq!(result.category, Category::Bug);
    assert_eq!(result.severity, Severity::High);
    assert!(result.known_issue);
    assert!(result.related_issues.len() <= triage_engine::RELATED_ISSUES_TOP_N);
    assert_eq!(result.related_issues[0].id, "KB-1");
    assert!((result.related_issues[0].match_score - 0.833).abs() < 1e-6);
    for pair in result.related_issues.windows(2) {
        assert!(pair[0].match_score >= pair[1].match_score);
    }
    assert!(result.next_action.contains("KB-1"));
    assert!(result.next_action.contains("Clear cache and retry"));
}

#[tokio::test]
async fn test_empty_kb_yields_new_issue() {
    let engine = lexical_engine(Arc::new(KnowledgeBase::default()), 0.3);
    let result = engine.triage(CHECKOUT_TICKET).await.unwrap();

    assert!(!result.known_issue);
    assert!(result.related_issues.is_empty());
    assert!(result.next_action.starts_with("Likely new Bug issue with High severity. Escalate"));
}

#[tokio::test]
async fn test_unreachable_threshold_forces_new_issue() {
    let engine = lexical_engine(sample_kb(), 1.01);
    let result = engine.triage(CHECKOUT_TICKET).await.unwrap();

    assert!(!result.known_issue);
    assert_eq!(result.related_issues[0].id, "KB-1");
    assert!(!result.next_action.contains("Clear cache and retry"));
}

#[tokio::test]
async fn test_empty_description_rejected() {
    let engine = lexical_engine(sample_kb(), 0.3);
    let err = assert_err!(engine.triage("   ").await);
    assert!(matches!(err, TriageError::EmptyDescription));
}

#[tokio::test]
async fn test_related_issues_hide_internal_fields() {
    let engine = lexical_engine(sample_kb(), 0.3);
    let result = engine.triage(CHECKOUT_TICKET).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    let first = json["related_issues"][0].as_object().unwrap();
    let mut keys: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    keys.sort();
    assert_eq!(keys, vec!["category", "id", "match_score", "title"]);
    assert_eq!(json["category"], "Bug");
    assert_eq!(json["severity"], "High");
    assert_eq!(json["known_issue"], true);
}

#[tokio::test]
async fn test_remote_parse_failure_matches_rule_classification() {
    let provider = Arc::new(ScriptedProvider::with_completions(vec![
        Ok("{not json".to_string()),
        Ok("{not json".to_string()),
        Ok("{not json".to_string()),
    ]));
    let engine = TriageEngine::new(
        Arc::new(LlmClassifier::new(provider, fast_retry())),
        Arc::new(LexicalIndex::new(sample_kb())),
        DecisionPolicy::default(),
    );

    let result = engine.triage(CHECKOUT_TICKET).await.unwrap();
    let expected = classify_by_rules(CHECKOUT_TICKET);
    assert_eq!(result.summary, expected.summary);
    assert_eq!(result.category, expected.category);
    assert_eq!(result.severity, expected.severity);
}

#[tokio::test]
async fn test_embedding_failure_surfaces() {
    let kb = sample_kb();
    let store = EmbeddingStore::from_embeddings(
        &kb,
        vec![PrecomputedEmbedding { id: "KB-1".to_string(), vector: vec![1.0, 0.0] }],
    );
    let provider = Arc::new(ScriptedProvider::with_embeddings(vec![
        Err(ProviderError::Server { status: 500 }),
        Err(ProviderError::Server { status: 502 }),
        Err(ProviderError::Server { status: 503 }),
    ]));
    let engine = TriageEngine::new(
        Arc::new(RuleClassifier),
        Arc::new(EmbeddingIndex::new(kb, Arc::new(store), provider.clone(), fast_retry())),
        DecisionPolicy::default(),
    );

    let err = assert_err!(engine.triage(CHECKOUT_TICKET).await);
    assert!(matches!(
        err,
        TriageError::Search(SearchError::Embedding(ProviderError::Server { status: 503 }))
    ));
    assert_eq!(provider.embedding_calls(), 3);
}

#[tokio::test]
async fn test_engine_shared_across_tasks() {
    let engine = lexical_engine(sample_kb(), 0.3);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.triage(CHECKOUT_TICKET).await })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.related_issues[0].id, "KB-1");
    }
}

// HTTP layer

async fn spawn_server(engine: SharedTriageEngine, requests_per_window: u32) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState {
        engine,
        limiter: Arc::new(RateLimiter::new(requests_per_window, Duration::from_secs(60))),
        request_timeout: Duration::from_secs(10),
    };
    tokio::spawn(async move {
        server::serve(listener, state).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_http_triage_and_health() {
    let base = spawn_server(lexical_engine(sample_kb(), 0.3), 10).await;
    let client = reqwest::Client::new();

    let health: HealthResponse = client.get(format!("{}/health", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.search_strategy, "lexical");
    assert_eq!(health.classifier, "rules");

    let response = client
        .post(format!("{}/triage", base))
        .json(&serde_json::json!({ "description": format!("  {}  ", CHECKOUT_TICKET) }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let result: TriageResult = response.json().await.unwrap();
    assert_eq!(result.summary, CHECKOUT_TICKET);
    assert!(result.known_issue);
    assert_eq!(result.related_issues[0].id, "KB-1");
}

#[tokio::test]
async fn test_http_validation() {
    let base = spawn_server(lexical_engine(sample_kb(), 0.3), 100).await;
    let client = reqwest::Client::new();
    let url = format!("{}/triage", base);

    let status = |body: serde_json::Value| {
        let client = client.clone();
        let url = url.clone();
        async move { client.post(url).json(&body).send().await.unwrap().status() }
    };

    assert_eq!(status(serde_json::json!({ "description": "" })).await, reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        status(serde_json::json!({ "description": "x".repeat(4001) })).await,
        reqwest::StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(status(serde_json::json!({ "ticket": "hello" })).await, reqwest::StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(status(serde_json::json!({ "description": "   " })).await, reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(status(serde_json::json!({ "description": "x".repeat(4000) })).await, reqwest::StatusCode::OK);
}

#[tokio::test]
async fn test_http_rate_limit() {
    let base = spawn_server(lexical_engine(sample_kb(), 0.3), 2).await;
    let client = reqwest::Client::new();
    let url = format!("{}/triage", base);
    let body = serde_json::json!({ "description": "How do I export my data?" });

    for _ in 0..2 {
        let response = client.post(&url).json(&body).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
    }

    let response = client.post(&url).json(&body).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(reqwest::header::RETRY_AFTER));
}

#[tokio::test]
async fn test_http_embedding_failure_is_bad_gateway() {
    let kb = sample_kb();
    let store = EmbeddingStore::from_embeddings(
        &kb,
        vec![PrecomputedEmbedding { id: "KB-1".to_string(), vector: vec![1.0, 0.0] }],
    );
    let provider = Arc::new(ScriptedProvider::with_embeddings(vec![Err(ProviderError::Api {
        status: 401,
        body: "invalid api key".to_string(),
    })]));
    let engine = TriageEngine::new(
        Arc::new(RuleClassifier),
        Arc::new(EmbeddingIndex::new(kb, Arc::new(store), provider, fast_retry())),
        DecisionPolicy::default(),
    );
    let base = spawn_server(engine, 10).await;

    let response = reqwest::Client::new()
        .post(format!("{}/triage", base))
        .json(&serde_json::json!({ "description": CHECKOUT_TICKET }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);

    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.error, "Triage failed");
}
