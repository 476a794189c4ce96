//! Core type definitions for ticket triage

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Previously known issue write-up, loaded once from the KB data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbEntry {
    pub id: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub recommended_action: String,
}

impl KbEntry {
    /// Text used for both lexical matching and offline embedding
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.symptoms.join(" "))
    }
}

/// Vector produced offline for a single KB entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecomputedEmbedding {
    pub id: String,
    #[serde(rename = "embedding")]
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Billing,
    Login,
    Performance,
    Bug,
    #[serde(rename = "Question/How-To")]
    QuestionHowTo,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Billing,
        Category::Login,
        Category::Performance,
        Category::Bug,
        Category::QuestionHowTo,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Billing => "Billing",
            Self::Login => "Login",
            Self::Performance => "Performance",
            Self::Bug => "Bug",
            Self::QuestionHowTo => "Question/How-To",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown severity '{}'", s))
    }
}

/// Classifier output for one ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketClassification {
    pub summary: String,
    pub category: Category,
    pub severity: Severity,
}

/// KB entry paired with its similarity to the current query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredKbEntry {
    pub entry: KbEntry,
    pub match_score: f32, // 0.0-1.0, rounded to 3 decimals
}

/// Public projection of a scored KB entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedIssue {
    pub id: String,
    pub title: String,
    pub category: String,
    pub match_score: f32,
}

impl From<&ScoredKbEntry> for RelatedIssue {
    fn from(scored: &ScoredKbEntry) -> Self {
        Self {
            id: scored.entry.id.clone(),
            title: scored.entry.title.clone(),
            category: scored.entry.category.clone(),
            match_score: scored.match_score,
        }
    }
}

/// Response for a triaged ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub summary: String,
    pub category: Category,
    pub severity: Severity,
    pub known_issue: bool,
    pub related_issues: Vec<RelatedIssue>,
    pub next_action: String,
}
