//! Core domain types for vendor risk assessment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

/// A single scraped search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    /// Heuristic source confidence, assigned during verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_score: Option<f64>,
}

impl Finding {
    pub fn new(title: impl Into<String>, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            trust_score: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Criticality
// ---------------------------------------------------------------------------

/// How critical the vendor relationship is to the assessing company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    High,
    #[default]
    Medium,
    Low,
}

impl Criticality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Criticality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Criticality {
    type Err = crate::VendorRiskError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(crate::VendorRiskError::validation(format!(
                "unknown criticality '{other}': expected high, medium, or low"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Vector store records
// ---------------------------------------------------------------------------

/// Metadata stored alongside each embedded text block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub trust_score: f64,
}

/// A single hit returned from a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub doc: String,
    /// Cosine distance to the query (lower is closer).
    pub score: f64,
    pub metadata: ChunkMetadata,
}

/// The text block embedded for a verified finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanDoc {
    pub text: String,
    pub source_url: String,
}

// ---------------------------------------------------------------------------
// Chat messages
// ---------------------------------------------------------------------------

/// One turn of a conversation, in OpenAI chat-completion shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// RiskReport
// ---------------------------------------------------------------------------

/// The model's structured assessment, or the reason scoring did not happen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RiskReport {
    Assessed {
        company: String,
        generated_at: DateTime<Utc>,
        /// Loosely-typed model output (scores, recommendation, rationale).
        assessment: serde_json::Value,
    },
    Failed {
        error: String,
    },
}

impl RiskReport {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    pub fn is_assessed(&self) -> bool {
        matches!(self, Self::Assessed { .. })
    }
}

// ---------------------------------------------------------------------------
// StoredReport
// ---------------------------------------------------------------------------

/// A risk report persisted in the report history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReport {
    /// UUID v7, time-sortable.
    pub id: Uuid,
    pub company: String,
    pub criticality: Criticality,
    pub report: RiskReport,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criticality_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Criticality>().unwrap(), Criticality::High);
        assert_eq!(" low ".parse::<Criticality>().unwrap(), Criticality::Low);
        assert!("urgent".parse::<Criticality>().is_err());
        assert_eq!(Criticality::default(), Criticality::Medium);
    }

    #[test]
    fn finding_omits_unset_trust_score() {
        let finding = Finding::new("Acme fined", "https://reuters.com/acme", "");
        let json = serde_json::to_value(&finding).unwrap();
        assert!(json.get("trust_score").is_none());
        assert_eq!(json["snippet"], "");
    }

    #[test]
    fn risk_report_shapes() {
        let failed = RiskReport::failed("No context found for scoring");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json, serde_json::json!({"error": "No context found for scoring"}));

        let assessed: RiskReport = serde_json::from_value(serde_json::json!({
            "company": "Acme",
            "generated_at": "2025-01-01T00:00:00Z",
            "assessment": {"financial_risk": 2}
        }))
        .unwrap();
        assert!(assessed.is_assessed());

        let back: RiskReport = serde_json::from_value(json).unwrap();
        assert!(!back.is_assessed());
    }
}
