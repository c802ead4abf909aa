//! UtilityHub Library
//!
//! Converts web pages and HTML markup to PDF with a shared headless Chromium
//! session, tagging every step of every conversion with a request id so the
//! full story of one request can be read back from the log buffer.
//!
//! # Module Overview
//!
//! - [`options`] - Render options, page formats and margin parsing
//! - [`correlation`] - Request ids and the bounded log buffer
//! - [`browser`] - The render engine seam and its Chromium implementation
//! - [`orchestrator`] - Validate, render and record one conversion
//! - [`http`] - Axum routes for conversion, logs and health
//! - [`config`] - Configuration file support
//! - [`telemetry`] - Tracing subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use utilityhub_lib::{BrowserOptions, ChromiumRenderer, ConversionService, ConversionTarget};
//! use utilityhub_lib::CorrelationTracker;
//!
//! # async fn example() {
//! let tracker = Arc::new(CorrelationTracker::default());
//! let engine = Arc::new(ChromiumRenderer::new(BrowserOptions::default()));
//! let service = ConversionService::new(tracker.clone(), engine);
//!
//! let conversion = service
//!     .convert(ConversionTarget::Html("<h1>Hi</h1>".into()), None, Some("t1"))
//!     .await;
//! for record in tracker.query(Some("t1"), 10) {
//!     println!("{} {}", record.level, record.message);
//! }
//! # let _ = conversion;
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod correlation;
pub mod error;
pub mod http;
pub mod options;
pub mod orchestrator;
pub mod telemetry;
pub mod types;

pub use browser::{print_params, BrowserOptions, ChromiumRenderer, RenderEngine};
pub use config::Config;
pub use correlation::{CorrelationTracker, LogLevel, LogRecord, LogSink};
pub use error::{ConversionError, ErrorKind, ErrorPayload, HubError, Result};
pub use http::{build_router, AppState, ServiceInfo};
pub use options::{
    resolve_options, Margins, MarginsPatch, PageFormat, RenderOptions, RenderOptionsPatch,
};
pub use orchestrator::ConversionService;
pub use types::{Conversion, ConversionOutcome, ConversionTarget, RequestContext};

/// Name reported by the service metadata endpoints.
pub const SERVICE_NAME: &str = "UtilityHub";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const SERVICE_DESCRIPTION: &str = "HTML to PDF Converter with request tracking";
