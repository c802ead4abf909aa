use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::{ConversionError, ErrorKind};
use crate::types::Conversion;

/// Header carrying the correlation id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidOptions => StatusCode::BAD_REQUEST,
        ErrorKind::RenderTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::RenderEngineError => StatusCode::BAD_GATEWAY,
    }
}

/// A failed conversion rendered as a JSON error body.
#[derive(Debug)]
pub struct FailureResponse {
    pub error: ConversionError,
    pub request_id: String,
}

impl IntoResponse for FailureResponse {
    fn into_response(self) -> Response {
        let status = status_for(self.error.kind());
        let mut response = (status, Json(self.error.to_payload(&self.request_id))).into_response();
        attach_request_id(response.headers_mut(), &self.request_id);
        response
    }
}

pub(crate) fn request_id_from(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// PDF bytes on success, the JSON error body otherwise.
pub(crate) fn pdf_response(conversion: Conversion, disposition: &'static str) -> Response {
    let Conversion { context, outcome } = conversion;

    match outcome.into_result() {
        Ok(bytes) => {
            let mut response = (StatusCode::OK, bytes).into_response();
            let headers = response.headers_mut();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
            headers.insert(CONTENT_DISPOSITION, HeaderValue::from_static(disposition));
            attach_request_id(headers, &context.request_id);
            response
        }
        Err(error) => FailureResponse {
            error,
            request_id: context.request_id,
        }
        .into_response(),
    }
}

fn attach_request_id(headers: &mut HeaderMap, request_id: &str) {
    match HeaderValue::from_str(request_id) {
        Ok(value) => {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        Err(err) => {
            tracing::debug!(request_id, error = %err, "request id is not a valid header value")
        }
    }
}
