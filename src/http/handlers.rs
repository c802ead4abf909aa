use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::response::{pdf_response, request_id_from};
use super::{AppState, ENDPOINTS};
use crate::correlation::LogRecord;
use crate::error::{ConversionError, ErrorPayload};
use crate::options::RenderOptionsPatch;
use crate::types::ConversionTarget;

/// Records returned by `/logs` when no limit is given.
pub const DEFAULT_LOGS_LIMIT: usize = 100;

const URL_DISPOSITION: &str = "attachment; filename=\"webpage.pdf\"";
const HTML_DISPOSITION: &str = "attachment; filename=\"document.pdf\"";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UrlConversionRequest {
    pub url: String,
    #[serde(default)]
    pub options: Option<RenderOptionsPatch>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HtmlConversionRequest {
    pub html: String,
    #[serde(default)]
    pub options: Option<RenderOptionsPatch>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: Vec<LogRecord>,
    pub total: usize,
    pub limit: usize,
    pub request_id_filter: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfoResponse {
    pub service: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<String>,
}

pub async fn convert_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = request_id_from(&headers);
    let conversion = match parse_body::<UrlConversionRequest>(&body) {
        Ok(request) => {
            state
                .service
                .convert(ConversionTarget::Url(request.url), request.options, request_id)
                .await
        }
        Err(err) => state.service.reject(request_id, err),
    };
    pdf_response(conversion, URL_DISPOSITION)
}

pub async fn convert_html(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = request_id_from(&headers);
    let conversion = match parse_body::<HtmlConversionRequest>(&body) {
        Ok(request) => {
            state
                .service
                .convert(ConversionTarget::Html(request.html), request.options, request_id)
                .await
        }
        Err(err) => state.service.reject(request_id, err),
    };
    pdf_response(conversion, HTML_DISPOSITION)
}

pub async fn logs(
    State(state): State<AppState>,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            let error = ConversionError::invalid_options(rejection.body_text());
            let payload = ErrorPayload {
                error_kind: error.kind(),
                detail: error.detail().to_string(),
                request_id: None,
            };
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    let tracker = state.tracker();
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LOGS_LIMIT)
        .min(tracker.capacity());
    let filter = query.request_id.filter(|id| !id.trim().is_empty());

    let logs = tracker.query(filter.as_deref(), limit);
    Json(LogsResponse {
        total: logs.len(),
        logs,
        limit,
        request_id_filter: filter,
    })
    .into_response()
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.info.name.clone(),
        version: state.info.version.clone(),
        description: state.info.description.clone(),
        timestamp: Utc::now(),
    })
}

pub async fn root(State(state): State<AppState>) -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        service: state.info.name.clone(),
        version: state.info.version.clone(),
        description: state.info.description.clone(),
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    })
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ConversionError> {
    serde_json::from_slice(body)
        .map_err(|err| ConversionError::invalid_options(format!("invalid request body: {err}")))
}
