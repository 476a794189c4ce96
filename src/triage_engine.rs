//! Core TriageEngine: classify, search, decide

use crate::classifier::TicketClassifier;
use crate::decision::DecisionPolicy;
use crate::search::{SearchError, SimilarityIndex};
use crate::types::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Number of KB matches reported per ticket
pub const RELATED_ISSUES_TOP_N: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("ticket description is empty")]
    EmptyDescription,

    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Main triage engine (thread-safe via Arc)
pub struct TriageEngine {
    classifier: Arc<dyn TicketClassifier>,
    index: Arc<dyn SimilarityIndex>,
    policy: DecisionPolicy,
}

pub type SharedTriageEngine = Arc<TriageEngine>;

impl TriageEngine {
    /// Create an engine; the search strategy is fixed for its lifetime
    pub fn new(
        classifier: Arc<dyn TicketClassifier>,
        index: Arc<dyn SimilarityIndex>,
        policy: DecisionPolicy,
    ) -> SharedTriageEngine {
        Arc::new(Self { classifier, index, policy })
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    pub fn search_strategy(&self) -> &'static str {
        self.index.name()
    }

    /// Main entry point: triage one ticket description
    pub async fn triage(&self, description: &str) -> Result<TriageResult, TriageError> {
        if description.trim().is_empty() {
            return Err(TriageError::EmptyDescription);
        }

        let start = Instant::now();

        // Step 1: classification and KB search are independent, run them together
        let (classification, matches) = tokio::join!(
            self.classifier.classify(description),
            self.index.search(description, RELATED_ISSUES_TOP_N),
        );
        let matches = matches?;

        // Step 2: verdict and next action
        let decision = self.policy.decide(&classification, &matches);

        // Step 3: project matches to the public shape
        let related_issues: Vec<RelatedIssue> = matches.iter().map(RelatedIssue::from).collect();

        info!(
            "Triage complete: category={}, severity={}, known_issue={}, top_score={:?}, classifier={}, strategy={}, {:.1}ms",
            classification.category,
            classification.severity,
            decision.known_issue,
            related_issues.first().map(|r| r.match_score),
            self.classifier.name(),
            self.index.name(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(TriageResult {
            summary: classification.summary,
            category: classification.category,
            severity: classification.severity,
            known_issue: decision.known_issue,
            related_issues,
            next_action: decision.next_action,
        })
    }
}
