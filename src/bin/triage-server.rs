//! Ticket triage HTTP server binary

use std::sync::Arc;
use ticket_triage::server::{run_server, AppState};
use ticket_triage::*;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    info!("Ticket Triage v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::from_env()?;
    let kb: SharedKnowledgeBase = Arc::new(KnowledgeBase::from_json_file(&settings.kb_path)?);
    let retry = settings.retry_policy();

    let provider: Option<Arc<dyn ModelProvider>> = match settings.provider_config() {
        Some(config) => {
            info!("Model provider: {} (chat={}, embeddings={})", config.base_url, config.chat_model, config.embedding_model);
            let provider: Arc<dyn ModelProvider> = Arc::new(HttpModelProvider::new(config)?);
            Some(provider)
        }
        None => None,
    };

    // Classifier
    let classifier: Arc<dyn TicketClassifier> = match (&provider, settings.mock_llm) {
        (Some(provider), false) => {
            info!("Classifier: remote model with keyword fallback");
            Arc::new(LlmClassifier::new(provider.clone(), retry.clone()))
        }
        (None, false) => {
            warn!("MOCK_LLM=false but OPENAI_API_KEY is not set; using keyword rules");
            Arc::new(RuleClassifier)
        }
        (_, true) => {
            info!("Classifier: keyword rules (MOCK_LLM)");
            Arc::new(RuleClassifier)
        }
    };

    // Search strategy, fixed for the process lifetime
    let index = select_index(settings.search_strategy, &settings.embeddings_path, kb.clone(), provider, retry);
    info!("Search strategy: {}", index.name());
    info!("Known-issue threshold: {}", settings.known_issue_threshold);

    let engine = TriageEngine::new(classifier, index, DecisionPolicy::new(settings.known_issue_threshold));

    let state = AppState {
        engine,
        limiter: Arc::new(RateLimiter::new(settings.rate_limit_requests, settings.rate_limit_window)),
        request_timeout: settings.request_timeout,
    };

    run_server(state, settings.port).await?;

    Ok(())
}
