//! [`RiskEngine`]: the process-wide entry point to the pipeline.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, instrument};

use vendorrisk_llm::{ChatModel, Embedder, JsonOptions, OpenAiChat, OpenAiEmbedder};
use vendorrisk_search::{FindingSource, SearchClient};
use vendorrisk_shared::{
    AppConfig, Criticality, Finding, Result, StoredReport, VendorRiskError,
};
use vendorrisk_storage::Storage;

use crate::events::{ChannelProgress, PipelineEvent, ProgressReporter};
use crate::pipeline::Step;
use crate::state::PipelineState;
use crate::vector::VectorIndex;
use crate::verify::TrustPolicy;

/// Shared handles for running pipelines. Cheap to share behind an `Arc`;
/// each run gets its own [`PipelineState`].
pub struct RiskEngine {
    pub(crate) source: Arc<dyn FindingSource>,
    pub(crate) model: Arc<dyn ChatModel>,
    pub(crate) index: VectorIndex,
    pub(crate) storage: Arc<Storage>,
    pub(crate) trust: TrustPolicy,
    pub(crate) json: JsonOptions,
    pub(crate) top_k: usize,
}

impl RiskEngine {
    pub fn new(
        source: Arc<dyn FindingSource>,
        model: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        storage: Arc<Storage>,
        config: &AppConfig,
    ) -> Self {
        Self {
            source,
            model,
            index: VectorIndex::new(Arc::clone(&storage), embedder),
            storage,
            trust: TrustPolicy::new(&config.trust),
            json: JsonOptions::from(&config.llm),
            top_k: config.retrieval.top_k,
        }
    }

    /// Build the production engine: SERP proxy, OpenAI-compatible models and
    /// the configured database.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let storage = if config.storage.is_in_memory() {
            Storage::open_in_memory().await?
        } else {
            Storage::open(&config.storage.resolved_path()?).await?
        };
        info!(path = %config.storage.path, "storage ready");

        Ok(Self::new(
            Arc::new(SearchClient::new(&config.search)?),
            Arc::new(OpenAiChat::new(&config.llm)?),
            Arc::new(OpenAiEmbedder::new(&config.embedding)?),
            Arc::new(storage),
            config,
        ))
    }

    /// Run one chat turn through the full graph.
    #[instrument(skip(self, message, progress))]
    pub async fn handle_message(
        &self,
        user_id: &str,
        message: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineState> {
        if message.trim().is_empty() {
            return Err(VendorRiskError::validation("userMessage must not be empty"));
        }
        let state = PipelineState::for_message(user_id, message);
        self.run(Step::ClassifyQuestion, state, progress).await
    }

    /// Analyze a known company, skipping classification and extraction.
    #[instrument(skip(self, progress))]
    pub async fn analyze_company(
        &self,
        company: &str,
        criticality: Criticality,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineState> {
        let company = company.trim();
        if company.is_empty() {
            return Err(VendorRiskError::validation("companyName must not be empty"));
        }
        let state = PipelineState::for_company(company, criticality);
        self.run(Step::FetchExternalData, state, progress).await
    }

    /// Run a chat turn on a background task, streaming its events.
    ///
    /// The channel closes after the `final` event, or after an `error`
    /// event if the run fails.
    pub fn stream_message(
        self: Arc<Self>,
        user_id: String,
        message: String,
    ) -> mpsc::UnboundedReceiver<PipelineEvent> {
        let (progress, rx) = ChannelProgress::new();
        tokio::spawn(async move {
            if let Err(e) = self.handle_message(&user_id, &message, &progress).await {
                progress.report(PipelineEvent::Error {
                    message: e.to_string(),
                });
            }
        });
        rx
    }

    /// Raw search findings for `company`, without verification.
    pub async fn search(&self, company: &str) -> Result<Vec<Finding>> {
        let company = company.trim();
        if company.is_empty() {
            return Err(VendorRiskError::validation("companyName must not be empty"));
        }
        self.source.fetch_findings(company).await
    }

    /// Saved reports for `company`, newest first.
    pub async fn reports(&self, company: &str, limit: usize) -> Result<Vec<StoredReport>> {
        self.storage.list_reports(company.trim(), limit).await
    }
}
