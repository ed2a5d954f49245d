//! REST and server-sent-events layer over [`RiskEngine`].
//!
//! Request bodies use camelCase keys. Errors are returned as
//! `{"error": "..."}` with a status derived from the error kind.

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::{Method, header};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use vendorrisk_core::RiskEngine;
use vendorrisk_shared::{Result, VendorRiskError};

pub use error::{ApiError, ErrorResponse};
pub use handlers::AppState;

/// Build the application router.
pub fn router(engine: Arc<RiskEngine>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/riskanalysis",
            post(handlers::risk_analysis).get(handlers::risk_analysis_query),
        )
        .route(
            "/search",
            post(handlers::search).get(handlers::search_query),
        )
        .route("/chat", post(handlers::chat_stream))
        .route("/chat/message", post(handlers::chat_message))
        .route("/reports/{company}", get(handlers::list_reports))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { engine })
}

/// Bind `host:port` and serve until the process is stopped.
pub async fn serve(engine: Arc<RiskEngine>, host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| VendorRiskError::config(format!("invalid listen address {host}:{port}: {e}")))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| VendorRiskError::Network(format!("failed to bind {addr}: {e}")))?;
    info!(%addr, "server listening");

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("server shutting down");
        })
        .await
        .map_err(|e| VendorRiskError::Network(format!("server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use vendorrisk_llm::{ChatModel, Embedder};
    use vendorrisk_search::FindingSource;
    use vendorrisk_shared::{AppConfig, ChatMessage, Finding};
    use vendorrisk_storage::Storage;

    struct FixedSource;

    #[async_trait]
    impl FindingSource for FixedSource {
        async fn fetch_findings(&self, company: &str) -> Result<Vec<Finding>> {
            Ok(vec![Finding::new(
                format!("{company} settles lawsuit"),
                "https://www.reuters.com/settlement",
                "Settlement reached.",
            )])
        }
    }

    /// Labels everything as general chat and answers with a fixed line,
    /// except the assessment prompt, which gets a valid JSON report.
    struct CannedModel;

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, messages: &[ChatMessage], _temperature: f32) -> Result<String> {
            let prompt = &messages[messages.len() - 1].content;
            Ok(if prompt.contains("Respond with only one word") {
                "other".into()
            } else if prompt.contains("senior vendor risk analyst") {
                json!({
                    "financial_risk": 2,
                    "security_risk": 2,
                    "reputation_risk": 2,
                    "resilience_strength": 4,
                    "overall_recommendation": "safe_to_contract",
                    "rationale_with_citations": ["[Source 1] settlement"]
                })
                .to_string()
            } else {
                "I help assess vendor risk.".into()
            })
        }
    }

    struct FlatEmbedder;

    #[async_trait]
    impl Embedder for FlatEmbedder {
        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    async fn app() -> Router {
        let storage = Storage::open_in_memory().await.unwrap();
        let engine = RiskEngine::new(
            Arc::new(FixedSource),
            Arc::new(CannedModel),
            Arc::new(FlatEmbedder),
            Arc::new(storage),
            &AppConfig::default(),
        );
        router(Arc::new(engine))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn healthz_ok() {
        let response = app()
            .await
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn empty_company_is_bad_request() {
        let response = app()
            .await
            .oneshot(post_json("/riskanalysis", json!({"companyName": ""})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["error"].as_str().unwrap().contains("companyName"));
    }

    #[tokio::test]
    async fn invalid_criticality_is_bad_request() {
        let response = app()
            .await
            .oneshot(post_json(
                "/riskanalysis",
                json!({"companyName": "Acme", "criticality": "urgent"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analysis_returns_state_and_saves_report() {
        let app = app().await;
        let response = app
            .clone()
            .oneshot(post_json(
                "/riskanalysis",
                json!({"companyName": "Acme", "criticality": "High"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let state: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(state["company_name"], "Acme");
        assert_eq!(state["criticality"], "high");
        assert_eq!(state["verified_findings"].as_array().unwrap().len(), 1);
        assert_eq!(
            state["risk_report"]["assessment"]["overall_recommendation"],
            "safe_to_contract"
        );

        let response = app
            .oneshot(Request::get("/reports/acme?limit=5").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let reports: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(reports.as_array().unwrap().len(), 1);
        assert_eq!(reports[0]["company"], "Acme");
    }

    #[tokio::test]
    async fn analysis_accepts_query_string() {
        let app = app().await;
        let response = app
            .clone()
            .oneshot(
                Request::get("/riskanalysis?companyName=Acme&criticality=low")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let state: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(state["company_name"], "Acme");
        assert_eq!(state["criticality"], "low");
        assert_eq!(state["stage"], "risk_analysis");
        assert!(state["risk_report"]["assessment"].is_object());

        let response = app
            .oneshot(
                Request::get("/riskanalysis?companyName=Acme&criticality=urgent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn search_accepts_query_string() {
        let response = app()
            .await
            .oneshot(
                Request::get("/search?companyName=Acme")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let findings: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(findings[0]["title"], "Acme settles lawsuit");
    }

    #[tokio::test]
    async fn chat_streams_events_then_done() {
        let response = app()
            .await
            .oneshot(post_json(
                "/chat",
                json!({"userId": "u1", "userMessage": "what can you do?"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );

        let text = body_text(response).await;
        let events: Vec<Value> = text
            .lines()
            .filter_map(|line| line.strip_prefix("data: "))
            .map(|data| serde_json::from_str(data).unwrap())
            .collect();

        let types: Vec<&str> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            ["stage_start", "stage_complete", "stage_start", "stage_complete", "final", "done"]
        );
        assert_eq!(events[1]["intent"], "other");
        assert_eq!(events[4]["mode"], "chat");
        assert_eq!(events[4]["assistant_reply"], "I help assess vendor risk.");
    }

    #[tokio::test]
    async fn chat_message_requires_text() {
        let response = app()
            .await
            .oneshot(post_json("/chat/message", json!({"userId": "u1", "userMessage": " "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_message_returns_final_state() {
        let response = app()
            .await
            .oneshot(post_json("/chat/message", json!({"userMessage": "hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let state: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(state["user_id"], "anonymous");
        assert_eq!(state["intent"], "other");
        assert_eq!(state["stage"], "completed");
    }
}
