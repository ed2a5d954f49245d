//! Mapping of [`VendorRiskError`] onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use vendorrisk_shared::VendorRiskError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error wrapper.
#[derive(Debug)]
pub struct ApiError(pub VendorRiskError);

impl From<VendorRiskError> for ApiError {
    fn from(e: VendorRiskError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            VendorRiskError::Validation { .. } => StatusCode::BAD_REQUEST,
            VendorRiskError::Network(_) | VendorRiskError::Llm(_) => StatusCode::BAD_GATEWAY,
            VendorRiskError::Config { .. }
            | VendorRiskError::Parse { .. }
            | VendorRiskError::Storage(_)
            | VendorRiskError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, %status, "request failed");
        } else {
            warn!(error = %self.0, %status, "request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let status = |e: VendorRiskError| ApiError(e).status();
        assert_eq!(status(VendorRiskError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status(VendorRiskError::config("x")), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status(VendorRiskError::Network("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status(VendorRiskError::Llm("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status(VendorRiskError::Storage("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
