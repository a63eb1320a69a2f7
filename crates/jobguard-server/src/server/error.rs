//! Conversion of request failures into JSON error responses

use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jobguard_core::Error;
use serde_json::json;

/// Errors surfaced by the HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No input text")]
    EmptyInput,

    #[error("Malformed JSON body")]
    MalformedJson(String),

    #[error("Prediction timed out")]
    Timeout,

    #[error("Prediction failed")]
    PredictionFailed(Error),

    #[error(transparent)]
    Body(#[from] BytesRejection),

    #[error("Failed to render page")]
    Render(#[from] tera::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmptyInput | Self::MalformedJson(_) => StatusCode::BAD_REQUEST,
            Self::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            Self::PredictionFailed(_) | Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Body(rejection) => rejection.status(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::MalformedJson(_) => "malformed_json",
            Self::Timeout => "timeout",
            Self::PredictionFailed(e) => e.kind(),
            Self::Body(_) => "body",
            Self::Render(_) => "render",
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::EmptyInput => Self::EmptyInput,
            Error::Timeout => Self::Timeout,
            other => Self::PredictionFailed(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        metrics::counter!("jobguard_errors_total", "kind" => self.kind()).increment(1);

        match &self {
            Self::PredictionFailed(e) => tracing::error!(kind = e.kind(), "Prediction failed: {}", e),
            Self::MalformedJson(detail) => tracing::debug!("Rejected JSON body: {}", detail),
            Self::Timeout => tracing::warn!("Prediction timed out"),
            Self::Render(e) => tracing::error!("Failed to render result page: {}", e),
            Self::EmptyInput | Self::Body(_) => {}
        }

        let status = self.status();
        let message = match self {
            Self::Body(rejection) => rejection.body_text(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
