//! Contracting decision rules.
//!
//! The model is asked to apply these rules itself; [`expected_recommendation`]
//! re-derives the answer from its scores so divergence can be logged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Below this data confidence no decision is made.
pub const MIN_CONFIDENCE: f64 = 0.6;

/// The model's overall recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    SafeToContract,
    ContractWithProtections,
    DoNotContract,
    InsufficientData,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SafeToContract => "safe_to_contract",
            Self::ContractWithProtections => "contract_with_protections",
            Self::DoNotContract => "do_not_contract",
            Self::InsufficientData => "insufficient_data",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "safe_to_contract" => Some(Self::SafeToContract),
            "contract_with_protections" => Some(Self::ContractWithProtections),
            "do_not_contract" => Some(Self::DoNotContract),
            "insufficient_data" => Some(Self::InsufficientData),
            _ => None,
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four 1-5 scores of an assessment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskScores {
    pub financial: f64,
    pub security: f64,
    pub reputation: f64,
    pub resilience: f64,
}

impl RiskScores {
    /// Read scores from a model assessment. Numbers given as strings are
    /// accepted; any missing score yields `None`.
    pub fn from_assessment(assessment: &Value) -> Option<Self> {
        Some(Self {
            financial: score_field(assessment, "financial_risk")?,
            security: score_field(assessment, "security_risk")?,
            reputation: score_field(assessment, "reputation_risk")?,
            resilience: score_field(assessment, "resilience_strength")?,
        })
    }

    pub fn average_risk(&self) -> f64 {
        (self.financial + self.security + self.reputation) / 3.0
    }
}

fn score_field(assessment: &Value, key: &str) -> Option<f64> {
    match assessment.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The recommendation the decision rules give for these scores.
pub fn expected_recommendation(scores: &RiskScores, confidence: f64) -> Recommendation {
    let avg = scores.average_risk();

    if confidence < MIN_CONFIDENCE {
        Recommendation::InsufficientData
    } else if avg >= 3.9 || scores.resilience <= 2.0 {
        Recommendation::DoNotContract
    } else if avg <= 2.5 && scores.resilience >= 4.0 {
        Recommendation::SafeToContract
    } else {
        Recommendation::ContractWithProtections
    }
}

/// Compare the model's recommendation against the rules and warn when they
/// disagree. The assessment is never modified.
pub fn review_assessment(company: &str, assessment: &Value, confidence: f64) {
    let stated = assessment
        .get("overall_recommendation")
        .and_then(Value::as_str)
        .and_then(Recommendation::parse);

    let expected = if confidence < MIN_CONFIDENCE {
        Some(Recommendation::InsufficientData)
    } else {
        RiskScores::from_assessment(assessment).map(|s| expected_recommendation(&s, confidence))
    };

    match (stated, expected) {
        (Some(stated), Some(expected)) if stated != expected => {
            warn!(company, %stated, %expected, confidence, "model recommendation diverges from decision rules");
        }
        (None, _) => warn!(company, "assessment has no recognizable overall_recommendation"),
        _ => debug!(company, "assessment consistent with decision rules"),
    }
}
