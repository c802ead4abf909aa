#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use utilityhub_lib::{
    ConversionError, ConversionService, ConversionTarget, CorrelationTracker, RenderEngine,
    RenderOptions,
};

/// Host name the stub treats as unresolvable.
pub const UNRESOLVABLE_HOST: &str = "nonexistent.invalid";

/// Engine that answers without a browser.
///
/// The PDF it returns embeds the target and the page format, so tests can
/// tell which request a document belongs to.
#[derive(Default)]
pub struct StubEngine {
    pub calls: AtomicUsize,
    pub delay: Option<Duration>,
}

impl StubEngine {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderEngine for StubEngine {
    async fn render(
        &self,
        target: &ConversionTarget,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let ConversionTarget::Url(url) = target {
            if url::Url::parse(url).is_err() {
                return Err(ConversionError::engine(format!(
                    "invalid navigation target '{url}'"
                )));
            }
            if url.contains(UNRESOLVABLE_HOST) {
                return Err(ConversionError::engine(format!(
                    "navigation failed: net::ERR_NAME_NOT_RESOLVED at {url}"
                )));
            }
            if url.contains("/slow") {
                return Err(ConversionError::RenderTimeout(
                    "page did not finish loading within 30s".to_string(),
                ));
            }
        }

        Ok(format!(
            "%PDF-1.4\n% {} {}\n%%EOF\n",
            options.page_format.as_str(),
            target.as_str()
        )
        .into_bytes())
    }

    async fn shutdown(&self) {}
}

pub fn service_with(engine: Arc<StubEngine>, capacity: usize) -> ConversionService {
    ConversionService::new(Arc::new(CorrelationTracker::new(capacity)), engine)
}
