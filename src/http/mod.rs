//! HTTP surface: conversion endpoints, log queries and service metadata.

mod handlers;
mod response;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::correlation::CorrelationTracker;
use crate::orchestrator::ConversionService;
use crate::{SERVICE_DESCRIPTION, SERVICE_NAME, VERSION};

pub use handlers::{
    HealthResponse, HtmlConversionRequest, LogsQuery, LogsResponse, ServiceInfoResponse,
    UrlConversionRequest, DEFAULT_LOGS_LIMIT,
};
pub use response::{status_for, FailureResponse, REQUEST_ID_HEADER};

/// Prefix under which the versioned aliases are mounted.
pub const API_PREFIX: &str = "/api/v1";

/// Static metadata reported by `/` and `/health`.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            name: SERVICE_NAME.to_string(),
            version: VERSION.to_string(),
            description: SERVICE_DESCRIPTION.to_string(),
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: ConversionService,
    pub info: Arc<ServiceInfo>,
}

impl AppState {
    pub fn new(service: ConversionService, info: ServiceInfo) -> Self {
        Self {
            service,
            info: Arc::new(info),
        }
    }

    pub fn tracker(&self) -> &Arc<CorrelationTracker> {
        self.service.tracker()
    }
}

/// Every route the service answers, as listed by `/`.
pub const ENDPOINTS: [&str; 9] = [
    "/",
    "/convert/url",
    "/convert/html",
    "/logs",
    "/health",
    "/api/v1/pdf/url",
    "/api/v1/pdf/html",
    "/api/v1/system/logs",
    "/api/v1/system/health",
];

pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    let api_routes = Router::new()
        .route("/pdf/url", post(handlers::convert_url))
        .route("/pdf/html", post(handlers::convert_html))
        .route("/system/logs", get(handlers::logs))
        .route("/system/health", get(handlers::health));

    Router::new()
        .route("/", get(handlers::root))
        .route("/convert/url", post(handlers::convert_url))
        .route("/convert/html", post(handlers::convert_html))
        .route("/logs", get(handlers::logs))
        .route("/health", get(handlers::health))
        .nest(API_PREFIX, api_routes)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
