//! Test doubles for the pipeline seams.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use vendorrisk_llm::{ChatModel, Embedder};
use vendorrisk_search::FindingSource;
use vendorrisk_shared::{ChatMessage, Finding, Result, VendorRiskError};

/// Three findings: two on trusted domains, one blog.
pub(crate) fn sample_findings() -> Vec<Finding> {
    vec![
        Finding::new(
            "Acme fined over data breach",
            "https://www.reuters.com/acme-breach",
            "Regulators fined Acme after a lawsuit over a breach.",
        ),
        Finding::new(
            "Acme earns compliance certification",
            "https://www.sec.gov/acme-filing",
            "Acme disclosed a new compliance certification and partnership.",
        ),
        Finding::new(
            "My take on Acme",
            "https://acme-fan.blogspot.com/post",
            "",
        ),
    ]
}

// ---------------------------------------------------------------------------
// FindingSource
// ---------------------------------------------------------------------------

pub(crate) struct StubSource {
    findings: Vec<Finding>,
    fail: bool,
}

impl StubSource {
    pub fn with(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            fail: false,
        }
    }

    pub fn empty() -> Self {
        Self::with(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            findings: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl FindingSource for StubSource {
    async fn fetch_findings(&self, _company: &str) -> Result<Vec<Finding>> {
        if self.fail {
            return Err(VendorRiskError::Network("proxy unreachable".into()));
        }
        Ok(self.findings.clone())
    }
}

// ---------------------------------------------------------------------------
// ChatModel
// ---------------------------------------------------------------------------

/// Answers each prompt kind with a canned reply and records which kinds
/// were asked, in order.
pub(crate) struct StubModel {
    label: &'static str,
    extraction: String,
    analysis: Mutex<VecDeque<String>>,
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl StubModel {
    pub const CHAT_REPLY: &'static str = "I assess contracting risk for companies you name.";

    const ASSESSMENT: &'static str = r#"```json
{
  "financial_risk": 3,
  "security_risk": 3,
  "reputation_risk": 2,
  "resilience_strength": 3,
  "overall_recommendation": "contract_with_protections",
  "rationale_with_citations": ["Breach fine reported [Source 1]"]
}
```"#;

    fn build(label: &'static str, extraction: &str) -> Self {
        Self {
            label,
            extraction: extraction.to_string(),
            analysis: Mutex::new(VecDeque::from([Self::ASSESSMENT.to_string()])),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Classifies everything as general chat.
    pub fn chat() -> Self {
        Self::build("other", "{}")
    }

    /// Classifies everything as a risk request and extracts `extraction`.
    pub fn risk(extraction: &str) -> Self {
        Self::build("risk", extraction)
    }

    /// Every call fails as if the API were down.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::chat()
        }
    }

    /// Replace the scripted assessment replies.
    pub fn with_analysis(self, replies: Vec<&str>) -> Self {
        *self.analysis.lock().unwrap() = replies.into_iter().map(String::from).collect();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for StubModel {
    async fn complete(&self, messages: &[ChatMessage], _temperature: f32) -> Result<String> {
        if self.fail {
            return Err(VendorRiskError::Llm("model unavailable".into()));
        }

        let prompt = &messages.last().expect("at least one message").content;
        let kind = if prompt.contains("Respond with only one word") {
            "classify"
        } else if prompt.contains("Extract company name and criticality") {
            "extraction"
        } else if prompt.contains("senior vendor risk analyst")
            || prompt.starts_with("The previous response was invalid JSON")
        {
            "analysis"
        } else {
            "chatbot"
        };
        self.calls.lock().unwrap().push(kind.to_string());

        Ok(match kind {
            "classify" => format!(" {}\n", self.label.to_uppercase()),
            "extraction" => self.extraction.clone(),
            "analysis" => self
                .analysis
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "no more replies".into()),
            _ => Self::CHAT_REPLY.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Embedder
// ---------------------------------------------------------------------------

/// Embeds text by counting risk-themed and resilience-themed keywords.
pub(crate) struct KeywordEmbedder;

const RISK_WORDS: &[&str] = &["lawsuit", "breach", "fine", "incident"];
const RESILIENCE_WORDS: &[&str] = &["award", "compliance", "certification", "partnership"];

fn keyword_hits(text: &str, words: &[&str]) -> f32 {
    words.iter().filter(|w| text.contains(*w)).count() as f32
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(inputs
            .iter()
            .map(|text| {
                let text = text.to_lowercase();
                vec![
                    keyword_hits(&text, RISK_WORDS),
                    keyword_hits(&text, RESILIENCE_WORDS),
                    0.1,
                ]
            })
            .collect())
    }
}
