//! HTTP routes and handlers

use crate::server::error::ApiError;
use crate::server::render;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{rejection::FormRejection, FromRequest, Request, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use jobguard_core::{Error, InputText};
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;

/// How the caller wants the result back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Html,
}

impl ResponseFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PredictPayload {
    #[serde(default)]
    text: Option<String>,
}

/// `POST /predict` body: a JSON document for JSON content types, form
/// fields otherwise.
#[derive(Debug)]
pub struct PredictRequest {
    pub text: Option<String>,
    pub format: ResponseFormat,
}

#[async_trait]
impl<S> FromRequest<S> for PredictRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_json_request(req.headers()) {
            let body = Bytes::from_request(req, state).await?;
            let payload: PredictPayload = serde_json::from_slice(&body)
                .map_err(|e| ApiError::MalformedJson(e.to_string()))?;

            return Ok(Self {
                text: payload.text,
                format: ResponseFormat::Json,
            });
        }

        // A body that is not a form carries no text; one that cannot be read is an error
        let text = match Form::<PredictPayload>::from_request(req, state).await {
            Ok(Form(payload)) => payload.text,
            Err(FormRejection::BytesRejection(rejection)) => return Err(rejection.into()),
            Err(rejection) => {
                tracing::debug!("No form body: {}", rejection);
                None
            }
        };

        Ok(Self {
            text,
            format: ResponseFormat::Html,
        })
    }
}

fn is_json_request(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

// ============================================================================
// Pages
// ============================================================================

pub async fn index() -> Html<&'static str> {
    Html(render::index_page())
}

// ============================================================================
// Prediction
// ============================================================================

pub async fn predict(
    State(state): State<AppState>,
    request: PredictRequest,
) -> Result<Response, ApiError> {
    let format = request.format;
    metrics::counter!("jobguard_requests_total", "format" => format.as_str()).increment(1);

    let text = InputText::parse(request.text.as_deref())?;
    tracing::debug!(chars = text.as_str().chars().count(), format = format.as_str(), "Predict request");

    let start = Instant::now();
    let result = tokio::time::timeout(state.timeout, state.predictor.predict(text))
        .await
        .map_err(|_| Error::Timeout)??;

    metrics::histogram!("jobguard_inference_latency_us").record(start.elapsed().as_micros() as f64);
    metrics::counter!("jobguard_predictions_total", "label" => result.prediction().as_str())
        .increment(1);

    let response = match format {
        ResponseFormat::Json => Json(result).into_response(),
        ResponseFormat::Html => Html(render::result_page(&result)?).into_response(),
    };
    Ok(response)
}

// ============================================================================
// Operational endpoints
// ============================================================================

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model": state.predictor.model_name(),
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}
