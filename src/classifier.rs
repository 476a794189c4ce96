//! Ticket classification: deterministic keyword rules and a remote model with fallback

use crate::provider::{ModelProvider, ProviderError};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::{Category, Severity, TicketClassification};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub const MAX_SUMMARY_CHARS: usize = 120;
const ELLIPSIS: &str = "...";

/// Keyword rules, checked in order; the first rule with a matching keyword wins.
const CATEGORY_RULES: &[(Category, &[&str])] = &[
    (Category::Billing, &["charge", "billing", "invoice", "payment"]),
    (Category::Login, &["login", "signin", "sign-in", "password", "authentication"]),
    (Category::Performance, &["slow", "lag", "performance", "timeout"]),
    (Category::QuestionHowTo, &["how do i", "how to", "can i", "is it possible"]),
    (Category::Bug, &["crash", "error", "bug", "exception", "500", "404", "429"]),
];

const SEVERITY_RULES: &[(Severity, &[&str])] = &[
    (Severity::Critical, &["data loss", "security", "breach", "cannot access", "down", "unavailable"]),
    (Severity::High, &["crash", "500", "not working", "fails", "error"]),
    (Severity::Medium, &["slow", "sometimes", "intermittent", "occasionally"]),
];

const SYSTEM_PROMPT: &str = "You are a support ticket triage assistant. \
Read the customer's ticket and respond with a single JSON object with exactly these keys: \
\"summary\" (one sentence, at most 120 characters), \
\"category\" (one of: Billing, Login, Performance, Bug, Question/How-To, Other), \
\"severity\" (one of: Low, Medium, High, Critical). \
Respond with the JSON object only.";

/// Trait for pluggable ticket classifiers. Classification never fails.
#[async_trait]
pub trait TicketClassifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify(&self, description: &str) -> TicketClassification;
}

/// Trimmed input, cut at a word boundary with a trailing ellipsis when longer
/// than [`MAX_SUMMARY_CHARS`].
pub fn summarize(description: &str) -> String {
    let trimmed = description.trim();
    if trimmed.chars().count() <= MAX_SUMMARY_CHARS {
        return trimmed.to_string();
    }

    let keep = MAX_SUMMARY_CHARS - ELLIPSIS.len();
    let cut = trimmed
        .char_indices()
        .nth(keep)
        .map(|(idx, _)| idx)
        .unwrap_or(trimmed.len());
    let head = &trimmed[..cut];
    let head = match head.rfind(' ') {
        Some(space) => &head[..space],
        None => head,
    };
    format!("{}{}", head, ELLIPSIS)
}

fn first_match<T: Copy>(text: &str, rules: &[(T, &[&str])]) -> Option<T> {
    rules
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(label, _)| *label)
}

/// Pure keyword classification
pub fn classify_by_rules(description: &str) -> TicketClassification {
    let text = description.to_lowercase();

    TicketClassification {
        summary: summarize(description),
        category: first_match(&text, CATEGORY_RULES).unwrap_or(Category::Other),
        severity: first_match(&text, SEVERITY_RULES).unwrap_or(Severity::Low),
    }
}

/// Deterministic rule-based classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleClassifier;

#[async_trait]
impl TicketClassifier for RuleClassifier {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn classify(&self, description: &str) -> TicketClassification {
        classify_by_rules(description)
    }
}

/// Why the remote path did not produce a classification
#[derive(Debug, thiserror::Error)]
enum ClassifyError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("unparseable classification: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    summary: String,
    category: String,
    severity: String,
}

fn parse_classification(content: &str) -> Result<TicketClassification, ClassifyError> {
    let raw: RawClassification = serde_json::from_str(content)
        .map_err(|e| ClassifyError::Parse(e.to_string()))?;

    let category = raw.category.parse::<Category>().map_err(ClassifyError::Parse)?;
    let severity = raw.severity.parse::<Severity>().map_err(ClassifyError::Parse)?;
    let summary = summarize(&raw.summary);
    if summary.is_empty() {
        return Err(ClassifyError::Parse("empty summary".to_string()));
    }

    Ok(TicketClassification { summary, category, severity })
}

/// Remote classifier with bounded retries, falling back to the keyword rules
pub struct LlmClassifier {
    provider: Arc<dyn ModelProvider>,
    retry: RetryPolicy,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn ModelProvider>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    async fn classify_remote(&self, description: &str) -> Result<TicketClassification, ClassifyError> {
        let content = retry_with_backoff(
            &self.retry,
            "classification",
            ProviderError::is_transient,
            || self.provider.complete_json(SYSTEM_PROMPT, description),
        )
        .await?;

        parse_classification(&content)
    }
}

#[async_trait]
impl TicketClassifier for LlmClassifier {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn classify(&self, description: &str) -> TicketClassification {
        match self.classify_remote(description).await {
            Ok(classification) => {
                debug!("Remote classification via {}: {:?}", self.provider.name(), classification);
                classification
            }
            Err(e) => {
                warn!("Remote classification failed, using keyword rules: {}", e);
                classify_by_rules(description)
            }
        }
    }
}
