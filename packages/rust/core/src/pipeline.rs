//! The risk-analysis state machine.
//!
//! Two entry points share one graph:
//!
//! ```text
//! classify_question ─┬─ risk ──> init_risk ─┬─ ready ──> fetch_external_data
//!                    │                      └─ else ──> end (clarification)
//!                    └─ other ─> regular_chatbot ──> end
//!
//! fetch_external_data -> verify_sources -> store_in_vector_db
//!     -> retrieve_relevant_context -> generate_final_analysis -> end
//! ```
//!
//! Chat turns enter at `classify_question`; direct analyses with known inputs
//! enter at `fetch_external_data`.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use vendorrisk_shared::Result;

use crate::engine::RiskEngine;
use crate::events::{FinalMode, PipelineEvent, ProgressReporter, StageDetail};
use crate::state::{Intent, PipelineState};

/// A pipeline step, named as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ClassifyQuestion,
    RegularChatbot,
    InitRisk,
    FetchExternalData,
    VerifySources,
    StoreInVectorDb,
    RetrieveRelevantContext,
    GenerateFinalAnalysis,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassifyQuestion => "classify_question",
            Self::RegularChatbot => "regular_chatbot",
            Self::InitRisk => "init_risk",
            Self::FetchExternalData => "fetch_external_data",
            Self::VerifySources => "verify_sources",
            Self::StoreInVectorDb => "store_in_vector_db",
            Self::RetrieveRelevantContext => "retrieve_relevant_context",
            Self::GenerateFinalAnalysis => "generate_final_analysis",
        }
    }

    /// The step that follows this one given the state it produced, or
    /// `None` when the run ends.
    pub fn next(&self, state: &PipelineState) -> Option<Step> {
        match self {
            Self::ClassifyQuestion => match state.intent {
                Some(Intent::Risk) => Some(Self::InitRisk),
                _ => Some(Self::RegularChatbot),
            },
            Self::RegularChatbot => None,
            Self::InitRisk => state.inputs_ready().then_some(Self::FetchExternalData),
            Self::FetchExternalData => Some(Self::VerifySources),
            Self::VerifySources => Some(Self::StoreInVectorDb),
            Self::StoreInVectorDb => Some(Self::RetrieveRelevantContext),
            Self::RetrieveRelevantContext => Some(Self::GenerateFinalAnalysis),
            Self::GenerateFinalAnalysis => None,
        }
    }

    /// Status line announced before the step runs.
    pub fn start_message(&self, state: &PipelineState) -> String {
        match self {
            Self::ClassifyQuestion => "Classifying your request...".into(),
            Self::RegularChatbot => "Processing your query...".into(),
            Self::InitRisk => "Extracting company details...".into(),
            Self::FetchExternalData => {
                format!("Searching for information about {}...", state.company())
            }
            Self::VerifySources => "Verifying source credibility...".into(),
            Self::StoreInVectorDb => "Storing verified sources in database...".into(),
            Self::RetrieveRelevantContext => "Analyzing relevant information...".into(),
            Self::GenerateFinalAnalysis => "Generating comprehensive risk analysis...".into(),
        }
    }

    /// Status line and detail reported once the step has run.
    pub fn completion(&self, state: &PipelineState) -> (String, StageDetail) {
        let mut detail = StageDetail::default();
        let message = match self {
            Self::ClassifyQuestion => {
                detail.intent = state.intent;
                format!(
                    "Intent detected: {}",
                    state.intent.map_or("unknown", |i| i.as_str())
                )
            }
            Self::RegularChatbot => "Response generated".into(),
            Self::InitRisk => {
                detail.company_name = state.company_name.clone();
                detail.criticality = state.criticality;
                match (&state.company_name, state.criticality) {
                    (Some(company), Some(criticality)) => {
                        format!("Analyzing {company} with {criticality} criticality")
                    }
                    _ => "Company details incomplete".into(),
                }
            }
            Self::FetchExternalData => {
                let count = state.raw_findings.len();
                detail.raw_count = Some(count);
                format!("Found {count} sources")
            }
            Self::VerifySources => {
                let verified = state.verified_findings.len();
                let unverified = state.unverified_findings.len();
                detail.verified_count = Some(verified);
                detail.unverified_count = Some(unverified);
                format!(
                    "Verified {verified} high-trust sources, flagged {unverified} as lower credibility"
                )
            }
            Self::StoreInVectorDb => {
                let count = state.document_ids.len();
                detail.stored_count = Some(count);
                format!("Stored {count} documents in vector database")
            }
            Self::RetrieveRelevantContext => {
                let count = state.retrieved_context.len();
                detail.context_count = Some(count);
                format!("Retrieved {count} relevant context chunks")
            }
            Self::GenerateFinalAnalysis => "Analysis complete".into(),
        };
        (message, detail)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closing event for a run that ended after `last`.
fn final_event(last: Step, state: &PipelineState) -> PipelineEvent {
    let mode = match last {
        Step::RegularChatbot => FinalMode::Chat,
        Step::InitRisk => FinalMode::ClarificationNeeded,
        _ => FinalMode::RiskReport,
    };

    let risk_branch = mode == FinalMode::RiskReport;
    PipelineEvent::Final {
        mode,
        assistant_reply: state.assistant_reply.clone(),
        risk_report: if risk_branch { state.risk_report.clone() } else { None },
        company_name: if risk_branch { state.company_name.clone() } else { None },
        criticality: if risk_branch { state.criticality } else { None },
    }
}

impl RiskEngine {
    /// Walk the graph from `entry`, reporting each transition.
    ///
    /// A step error aborts the run and is returned as-is; no `final` event
    /// is reported in that case.
    #[instrument(skip_all, fields(entry = %entry, user_id = %state.user_id))]
    pub(crate) async fn run(
        &self,
        entry: Step,
        mut state: PipelineState,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineState> {
        let mut step = entry;
        loop {
            progress.report(PipelineEvent::StageStart {
                stage: step,
                message: step.start_message(&state),
            });

            self.execute(step, &mut state).await?;

            let (message, detail) = step.completion(&state);
            info!(step = %step, %message, "step complete");
            progress.report(PipelineEvent::StageComplete {
                stage: step,
                message,
                detail,
            });

            match step.next(&state) {
                Some(next) => step = next,
                None => break,
            }
        }

        progress.report(final_event(step, &state));
        Ok(state)
    }
}
