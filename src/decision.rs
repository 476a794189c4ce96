//! Known/new verdict and next-action recommendation

use crate::types::{Category, ScoredKbEntry, Severity, TicketClassification};

pub const DEFAULT_KNOWN_ISSUE_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub known_issue: bool,
    pub next_action: String,
}

#[derive(Debug, Clone)]
pub struct DecisionPolicy {
    /// Minimum top-match score for a ticket to count as a known issue
    pub threshold: f32,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self { threshold: DEFAULT_KNOWN_ISSUE_THRESHOLD }
    }
}

impl DecisionPolicy {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn decide(&self, classification: &TicketClassification, matches: &[ScoredKbEntry]) -> Decision {
        if let Some(top) = matches.first().filter(|m| m.match_score >= self.threshold) {
            return Decision {
                known_issue: true,
                next_action: format!(
                    "Likely known issue ({}: {}). Attach this KB entry and respond to the user. \
                     Recommended internal action: {}",
                    top.entry.id, top.entry.title, top.entry.recommended_action
                ),
            };
        }

        Decision {
            known_issue: false,
            next_action: new_issue_action(classification),
        }
    }
}

// Escalation is checked before the how-to branch: a critical question still escalates.
fn new_issue_action(classification: &TicketClassification) -> String {
    let category = classification.category;
    let severity = classification.severity;

    if matches!(severity, Severity::High | Severity::Critical) {
        format!(
            "Likely new {} issue with {} severity. Escalate to the appropriate product/engineering \
             team and gather logs, screenshots, and reproduction steps from the customer.",
            category, severity
        )
    } else if category == Category::QuestionHowTo {
        "Likely new question/how-to. Search help center; if no article exists, answer directly \
         and consider creating a new KB article."
            .to_string()
    } else {
        format!(
            "Likely new {} issue with {} severity. Ask customer for more details (screenshots, \
             timestamps, steps to reproduce) and create a new ticket for engineering if impact is confirmed.",
            category, severity
        )
    }
}
