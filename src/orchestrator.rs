//! Conversion orchestration: validate, render, record.
//!
//! Every request moves through `Received → Validated → Rendering` and ends in
//! exactly one of `Succeeded` or `Failed`. The tracker sees one `Received`
//! record and exactly one terminal record per request id, whichever way the
//! request ends.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use crate::browser::RenderEngine;
use crate::correlation::{CorrelationTracker, LogLevel};
use crate::error::ConversionError;
use crate::options::{resolve_options, RenderOptions, RenderOptionsPatch};
use crate::types::{Conversion, ConversionOutcome, ConversionTarget, RequestContext};

/// Drives conversions against a render engine and records their outcome.
#[derive(Clone)]
pub struct ConversionService {
    tracker: Arc<CorrelationTracker>,
    engine: Arc<dyn RenderEngine>,
}

impl ConversionService {
    pub fn new(tracker: Arc<CorrelationTracker>, engine: Arc<dyn RenderEngine>) -> Self {
        Self { tracker, engine }
    }

    pub fn tracker(&self) -> &Arc<CorrelationTracker> {
        &self.tracker
    }

    /// Converts `target` to PDF.
    ///
    /// Invalid targets or options fail with `InvalidOptions` without reaching
    /// the engine. The render and its terminal record run on their own task,
    /// so dropping the returned future (a disconnected caller) neither aborts
    /// the render nor loses its outcome.
    pub async fn convert(
        &self,
        target: ConversionTarget,
        options: Option<RenderOptionsPatch>,
        request_id: Option<&str>,
    ) -> Conversion {
        let context = RequestContext::new(CorrelationTracker::resolve_request_id(request_id));
        self.tracker.record_with_details(
            &context.request_id,
            LogLevel::Received,
            format!("Starting {} to PDF conversion", target.kind().to_uppercase()),
            received_details(&target, options.as_ref()),
        );

        let resolved = match validate(&target, options.as_ref()) {
            Ok(resolved) => resolved,
            Err(err) => return self.finish(context, Err(err), None),
        };
        tracing::debug!(request_id = %context.request_id, "conversion validated");

        let started = Instant::now();
        let service = self.clone();
        let fallback = context.clone();
        let task = tokio::spawn(async move {
            tracing::debug!(request_id = %context.request_id, "rendering");
            let result = match service.engine.render(&target, &resolved).await {
                Ok(bytes) if bytes.is_empty() => Err(ConversionError::engine(
                    "render engine returned an empty document",
                )),
                result => result,
            };
            service.finish(context, result, Some(started))
        });

        match task.await {
            Ok(conversion) => conversion,
            Err(err) => self.finish(
                fallback,
                Err(ConversionError::engine(format!("render task failed: {err}"))),
                Some(started),
            ),
        }
    }

    /// Records a request that was rejected before a target could be read,
    /// such as a malformed body, and returns its failure.
    pub fn reject(&self, request_id: Option<&str>, error: ConversionError) -> Conversion {
        let context = RequestContext::new(CorrelationTracker::resolve_request_id(request_id));
        self.tracker.record(
            &context.request_id,
            LogLevel::Received,
            "Received unreadable conversion request",
        );
        self.finish(context, Err(error), None)
    }

    fn finish(
        &self,
        context: RequestContext,
        result: Result<Vec<u8>, ConversionError>,
        started: Option<Instant>,
    ) -> Conversion {
        let elapsed_ms = started.map(|s| s.elapsed().as_millis() as u64);

        let outcome = match result {
            Ok(bytes) => {
                self.tracker.record_with_details(
                    &context.request_id,
                    LogLevel::Succeeded,
                    "PDF generation completed successfully",
                    json!({ "pdf_size": bytes.len(), "elapsed_ms": elapsed_ms }),
                );
                ConversionOutcome::Success(bytes)
            }
            Err(err) => {
                self.tracker.record_with_details(
                    &context.request_id,
                    LogLevel::Failed,
                    "PDF conversion failed",
                    json!({
                        "error_kind": err.kind(),
                        "detail": err.detail(),
                        "elapsed_ms": elapsed_ms,
                    }),
                );
                ConversionOutcome::from(err)
            }
        };

        Conversion { context, outcome }
    }
}

fn validate(
    target: &ConversionTarget,
    options: Option<&RenderOptionsPatch>,
) -> Result<RenderOptions, ConversionError> {
    target.validate()?;
    resolve_options(options)
}

fn received_details(
    target: &ConversionTarget,
    options: Option<&RenderOptionsPatch>,
) -> serde_json::Value {
    let options = options
        .and_then(|patch| serde_json::to_value(patch).ok())
        .unwrap_or(serde_json::Value::Null);

    match target {
        ConversionTarget::Url(url) => json!({ "target": "url", "url": url, "options": options }),
        ConversionTarget::Html(html) => {
            json!({ "target": "html", "html_length": html.len(), "options": options })
        }
    }
}
