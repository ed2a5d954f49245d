//! Route handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, Sse};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use vendorrisk_core::{PipelineEvent, PipelineState, RiskEngine, SilentProgress};
use vendorrisk_shared::{Criticality, Finding, StoredReport, VendorRiskError};

use crate::error::ApiError;

const DEFAULT_REPORT_LIMIT: usize = 20;
const ANONYMOUS_USER: &str = "anonymous";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RiskEngine>,
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub criticality: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub company_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_message: String,
}

impl ChatRequest {
    fn user_id(&self) -> String {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(ANONYMOUS_USER)
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

fn parse_criticality(raw: Option<&str>) -> Result<Criticality, ApiError> {
    match raw.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => Ok(c.parse()?),
        None => Ok(Criticality::default()),
    }
}

fn require_message(message: &str) -> Result<(), ApiError> {
    if message.trim().is_empty() {
        return Err(VendorRiskError::validation("userMessage must not be empty").into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Direct risk analysis, JSON body.
pub async fn risk_analysis(
    State(state): State<AppState>,
    Json(req): Json<AnalysisRequest>,
) -> Result<Json<PipelineState>, ApiError> {
    run_analysis(&state, req).await
}

/// Direct risk analysis, query string.
pub async fn risk_analysis_query(
    State(state): State<AppState>,
    Query(req): Query<AnalysisRequest>,
) -> Result<Json<PipelineState>, ApiError> {
    run_analysis(&state, req).await
}

async fn run_analysis(state: &AppState, req: AnalysisRequest) -> Result<Json<PipelineState>, ApiError> {
    let criticality = parse_criticality(req.criticality.as_deref())?;
    info!(company = %req.company_name, %criticality, "risk analysis requested");

    let result = state
        .engine
        .analyze_company(&req.company_name, criticality, &SilentProgress)
        .await?;
    Ok(Json(result))
}

/// Raw findings, JSON body.
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Vec<Finding>>, ApiError> {
    Ok(Json(state.engine.search(&req.company_name).await?))
}

/// Raw findings, query string.
pub async fn search_query(
    State(state): State<AppState>,
    Query(req): Query<SearchRequest>,
) -> Result<Json<Vec<Finding>>, ApiError> {
    Ok(Json(state.engine.search(&req.company_name).await?))
}

/// Streaming chat: one SSE `data:` frame per pipeline event, then `done`.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    require_message(&req.user_message)?;
    let user_id = req.user_id();
    debug!(%user_id, "chat stream opened");

    let rx = Arc::clone(&state.engine).stream_message(user_id, req.user_message);
    let events = UnboundedReceiverStream::new(rx)
        .chain(tokio_stream::once(PipelineEvent::Done))
        .map(|event| Ok(sse_frame(&event)));

    Ok(Sse::new(events))
}

fn sse_frame(event: &PipelineEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            warn!(error = %e, "failed to encode pipeline event");
            Event::default().data(r#"{"type":"error","message":"failed to encode event"}"#)
        }
    }
}

/// Non-streaming chat: runs the same pipeline and returns the final state.
pub async fn chat_message(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<PipelineState>, ApiError> {
    require_message(&req.user_message)?;
    let result = state
        .engine
        .handle_message(&req.user_id(), &req.user_message, &SilentProgress)
        .await?;
    Ok(Json(result))
}

/// Saved report history for a company, newest first.
pub async fn list_reports(
    State(state): State<AppState>,
    Path(company): Path<String>,
    Query(query): Query<ReportsQuery>,
) -> Result<Json<Vec<StoredReport>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_REPORT_LIMIT);
    Ok(Json(state.engine.reports(&company, limit).await?))
}
