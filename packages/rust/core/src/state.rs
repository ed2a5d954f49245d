//! The request-scoped record threaded through every pipeline step.

use serde::{Deserialize, Serialize};

use vendorrisk_shared::{ChatMessage, CleanDoc, Criticality, Finding, RetrievedChunk, RiskReport};

use crate::verify::data_confidence;

/// What the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Risk,
    Other,
}

impl Intent {
    /// Classifier labels other than `risk` fall back to general chat.
    pub fn from_label(label: &str) -> Self {
        if label.trim().to_lowercase() == "risk" {
            Self::Risk
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Risk => "risk",
            Self::Other => "other",
        }
    }
}

/// Where the conversation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    New,
    Classified,
    RiskAnalysis,
    AwaitingInput,
    Completed,
}

/// State for one pipeline run. Discarded when the request finishes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineState {
    pub user_id: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criticality: Option<Criticality>,
    #[serde(default)]
    pub assistant_reply: String,
    #[serde(default)]
    pub raw_findings: Vec<Finding>,
    #[serde(default)]
    pub verified_findings: Vec<Finding>,
    #[serde(default)]
    pub unverified_findings: Vec<Finding>,
    #[serde(default)]
    pub clean_docs: Vec<CleanDoc>,
    #[serde(default)]
    pub document_ids: Vec<String>,
    #[serde(default)]
    pub retrieved_context: Vec<RetrievedChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_report: Option<RiskReport>,
}

impl PipelineState {
    /// State for a chat turn.
    pub fn for_message(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            messages: vec![ChatMessage::user(message)],
            ..Self::default()
        }
    }

    /// State for a direct analysis with inputs already known.
    pub fn for_company(company: impl Into<String>, criticality: Criticality) -> Self {
        Self {
            company_name: Some(company.into()),
            criticality: Some(criticality),
            stage: Stage::RiskAnalysis,
            ..Self::default()
        }
    }

    /// Content of the most recent user message, or `""`.
    pub fn last_user_message(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map_or("", |m| m.content.as_str())
    }

    /// Whether the analysis branch has everything it needs.
    pub fn inputs_ready(&self) -> bool {
        self.stage == Stage::RiskAnalysis
            && self.company_name.as_deref().is_some_and(|c| !c.trim().is_empty())
            && self.criticality.is_some()
    }

    pub fn company(&self) -> &str {
        self.company_name.as_deref().unwrap_or_default()
    }

    /// Share of verified findings among all findings.
    pub fn data_confidence(&self) -> f64 {
        data_confidence(self.verified_findings.len(), self.unverified_findings.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_labels() {
        assert_eq!(Intent::from_label(" Risk\n"), Intent::Risk);
        assert_eq!(Intent::from_label("other"), Intent::Other);
        assert_eq!(Intent::from_label("risk analysis"), Intent::Other);
    }

    #[test]
    fn direct_analysis_is_ready() {
        let state = PipelineState::for_company("Acme", Criticality::Low);
        assert!(state.inputs_ready());

        let state = PipelineState::for_company("  ", Criticality::Low);
        assert!(!state.inputs_ready());
    }

    #[test]
    fn chat_state_serializes_snake_case() {
        let mut state = PipelineState::for_message("u1", "analyze Acme");
        state.stage = Stage::AwaitingInput;
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["stage"], "awaiting_input");
        assert_eq!(json["messages"][0]["content"], "analyze Acme");
        assert!(json.get("risk_report").is_none());
        assert_eq!(state.last_user_message(), "analyze Acme");
    }
}
