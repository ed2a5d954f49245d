//! Step implementations.
//!
//! Model failures in the conversational steps abort the run. The data steps
//! degrade instead: a failed fetch, upsert or query leaves an empty result
//! and the run carries on.

use std::collections::HashSet;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use vendorrisk_llm::{complete_json, extract_json_block};
use vendorrisk_shared::{
    ChatMessage, ChunkMetadata, CleanDoc, Criticality, Result, RetrievedChunk, RiskReport,
    StoredReport,
};

use crate::decision;
use crate::engine::RiskEngine;
use crate::pipeline::Step;
use crate::prompts;
use crate::state::{Intent, PipelineState, Stage};

const MISSING_INPUTS_REPLY: &str = "Could not extract company name or criticality. \
    Please provide both, e.g., 'Analyze Tesla with high criticality'";

const UNPARSEABLE_INPUTS_REPLY: &str = "Could not parse your request. \
    Please specify company name and criticality (high/medium/low).";

/// Shape of the extraction reply. Either field may be null.
#[derive(Debug, Deserialize)]
struct Extraction {
    #[serde(rename = "companyName", default)]
    company_name: Option<String>,
    #[serde(default)]
    criticality: Option<String>,
}

impl Extraction {
    /// Both values, when present and valid. An unknown criticality counts
    /// as missing.
    fn into_inputs(self) -> Option<(String, Criticality)> {
        let company = self.company_name?.trim().to_string();
        let criticality = self.criticality?.parse::<Criticality>().ok()?;
        (!company.is_empty()).then_some((company, criticality))
    }
}

/// Round-robin merge of two ranked lists, keeping the first copy of each id.
pub(crate) fn interleave_unique(
    first: Vec<RetrievedChunk>,
    second: Vec<RetrievedChunk>,
) -> Vec<RetrievedChunk> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(first.len() + second.len());
    let mut first = first.into_iter();
    let mut second = second.into_iter();

    loop {
        let (a, b) = (first.next(), second.next());
        if a.is_none() && b.is_none() {
            break;
        }
        for chunk in [a, b].into_iter().flatten() {
            if seen.insert(chunk.id.clone()) {
                merged.push(chunk);
            }
        }
    }
    merged
}

impl RiskEngine {
    pub(crate) async fn execute(&self, step: Step, state: &mut PipelineState) -> Result<()> {
        match step {
            Step::ClassifyQuestion => self.classify_question(state).await,
            Step::RegularChatbot => self.regular_chatbot(state).await,
            Step::InitRisk => self.init_risk(state).await,
            Step::FetchExternalData => {
                self.fetch_external_data(state).await;
                Ok(())
            }
            Step::VerifySources => {
                self.verify_sources(state);
                Ok(())
            }
            Step::StoreInVectorDb => {
                self.store_in_vector_db(state).await;
                Ok(())
            }
            Step::RetrieveRelevantContext => {
                self.retrieve_relevant_context(state).await;
                Ok(())
            }
            Step::GenerateFinalAnalysis => {
                self.generate_final_analysis(state).await;
                Ok(())
            }
        }
    }

    async fn ask(&self, prompt: String) -> Result<String> {
        self.model.complete(&[ChatMessage::user(prompt)], 0.0).await
    }

    // -----------------------------------------------------------------------
    // Conversation
    // -----------------------------------------------------------------------

    async fn classify_question(&self, state: &mut PipelineState) -> Result<()> {
        let label = self.ask(prompts::classify(state.last_user_message())).await?;
        let intent = Intent::from_label(&label);
        info!(intent = intent.as_str(), "request classified");

        state.intent = Some(intent);
        state.stage = Stage::Classified;
        Ok(())
    }

    async fn regular_chatbot(&self, state: &mut PipelineState) -> Result<()> {
        let reply = self.ask(prompts::chatbot(state.last_user_message())).await?;
        state.assistant_reply = reply;
        state.stage = Stage::Completed;
        Ok(())
    }

    async fn init_risk(&self, state: &mut PipelineState) -> Result<()> {
        let raw = self.ask(prompts::extraction(state.last_user_message())).await?;

        match serde_json::from_str::<Extraction>(extract_json_block(&raw)) {
            Ok(extraction) => match extraction.into_inputs() {
                Some((company, criticality)) => {
                    state.assistant_reply =
                        format!("Analyzing {company} with {criticality} criticality...");
                    state.company_name = Some(company);
                    state.criticality = Some(criticality);
                    state.stage = Stage::RiskAnalysis;
                }
                None => {
                    state.assistant_reply = MISSING_INPUTS_REPLY.into();
                    state.stage = Stage::AwaitingInput;
                }
            },
            Err(e) => {
                warn!(error = %e, "could not parse extraction output");
                state.assistant_reply = UNPARSEABLE_INPUTS_REPLY.into();
                state.stage = Stage::AwaitingInput;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Evidence
    // -----------------------------------------------------------------------

    async fn fetch_external_data(&self, state: &mut PipelineState) {
        let company = state.company().to_string();
        match self.source.fetch_findings(&company).await {
            Ok(findings) => {
                info!(count = findings.len(), "findings fetched");
                state.raw_findings = findings;
            }
            Err(e) => {
                warn!(error = %e, "fetch failed");
                state.raw_findings = Vec::new();
                state.assistant_reply = format!("Could not fetch data for {company}. Error: {e}");
            }
        }
    }

    fn verify_sources(&self, state: &mut PipelineState) {
        if state.raw_findings.is_empty() {
            state.assistant_reply = "No findings to verify.".into();
            state.verified_findings.clear();
            state.unverified_findings.clear();
            return;
        }

        let verification = self.trust.verify(&state.raw_findings);
        state.verified_findings = verification.verified;
        state.unverified_findings = verification.unverified;
    }

    #[instrument(skip_all, fields(count = state.verified_findings.len()))]
    async fn store_in_vector_db(&self, state: &mut PipelineState) {
        let company = state.company().to_string();
        let mut clean_docs = Vec::new();
        let mut document_ids = Vec::new();

        for finding in &state.verified_findings {
            let text = prompts::document_text(&company, finding);
            let metadata = ChunkMetadata {
                url: finding.url.clone(),
                trust_score: finding.trust_score.unwrap_or(0.0),
            };

            match self.index.upsert(&company, &text, &metadata).await {
                Ok(id) => {
                    clean_docs.push(CleanDoc {
                        text,
                        source_url: finding.url.clone(),
                    });
                    document_ids.push(id);
                }
                Err(e) => warn!(url = %finding.url, error = %e, "failed to store document"),
            }
        }

        state.clean_docs = clean_docs;
        state.document_ids = document_ids;
    }

    async fn retrieve_relevant_context(&self, state: &mut PipelineState) {
        let company = state.company().to_string();
        let risk = self.query_or_empty(&company, &prompts::risk_query(&company)).await;
        let resilience = self
            .query_or_empty(&company, &prompts::resilience_query(&company))
            .await;
        state.retrieved_context = interleave_unique(risk, resilience);
    }

    async fn query_or_empty(&self, company: &str, query: &str) -> Vec<RetrievedChunk> {
        match self.index.query(company, query, self.top_k).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(query, error = %e, "retrieval failed");
                Vec::new()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Scoring
    // -----------------------------------------------------------------------

    async fn generate_final_analysis(&self, state: &mut PipelineState) {
        if state.retrieved_context.is_empty() {
            state.risk_report = Some(RiskReport::failed("No context found for scoring"));
            return;
        }

        let company = state.company().to_string();
        let criticality = state.criticality.unwrap_or_default();
        let confidence = state.data_confidence();
        let prompt = prompts::analysis(
            &company,
            criticality,
            confidence,
            &prompts::evidence(&state.retrieved_context),
        );

        let report = match complete_json(self.model.as_ref(), &prompt, self.json).await {
            Ok(assessment) => {
                decision::review_assessment(&company, &assessment, confidence);
                RiskReport::Assessed {
                    company: company.clone(),
                    generated_at: Utc::now(),
                    assessment,
                }
            }
            Err(e) => {
                warn!(error = %e, "assessment failed");
                RiskReport::failed(format!("Failed to generate LLM assessment: {e}"))
            }
        };

        if let RiskReport::Assessed { generated_at, .. } = &report {
            let stored = StoredReport {
                id: Uuid::now_v7(),
                company,
                criticality,
                report: report.clone(),
                created_at: *generated_at,
            };
            if let Err(e) = self.storage.insert_report(&stored).await {
                warn!(error = %e, "failed to save report");
            }
        }

        state.risk_report = Some(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str) -> RetrievedChunk {
        RetrievedChunk {
            id: id.into(),
            doc: id.into(),
            score: 0.0,
            metadata: ChunkMetadata::default(),
        }
    }

    fn ids(chunks: &[RetrievedChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn interleave_alternates_and_dedupes() {
        let merged = interleave_unique(
            vec![chunk("a"), chunk("b"), chunk("c")],
            vec![chunk("b"), chunk("d")],
        );
        assert_eq!(ids(&merged), ["a", "b", "d", "c"]);
    }

    #[test]
    fn interleave_handles_empty_side() {
        assert_eq!(ids(&interleave_unique(vec![], vec![chunk("x")])), ["x"]);
        assert!(interleave_unique(vec![], vec![]).is_empty());
    }

    #[test]
    fn extraction_requires_both_valid_values() {
        let parse = |raw: &str| {
            serde_json::from_str::<Extraction>(extract_json_block(raw))
                .ok()
                .and_then(Extraction::into_inputs)
        };

        assert_eq!(
            parse("```json\n{\"companyName\": \"Tesla\", \"criticality\": \"HIGH\"}\n```"),
            Some(("Tesla".to_string(), Criticality::High))
        );
        assert_eq!(parse(r#"{"companyName": "Tesla", "criticality": null}"#), None);
        assert_eq!(parse(r#"{"companyName": " ", "criticality": "low"}"#), None);
        assert_eq!(parse(r#"{"companyName": "Tesla", "criticality": "urgent"}"#), None);
    }
}
