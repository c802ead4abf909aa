//! Browser manager for the shared headless Chromium session.
//!
//! One browser process serves every request. It is launched on first use,
//! each render gets its own page, and a session whose DevTools connection
//! has dropped is replaced on the next request.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::print::{map_cdp_error, parse_target_url, print_params};
use super::RenderEngine;
use crate::error::ConversionError;
use crate::options::RenderOptions;
use crate::types::ConversionTarget;

/// Default timeout for a page to finish loading.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for the browser process to come up.
pub const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Headroom given to individual DevTools requests beyond the load timeout.
const REQUEST_GRACE: Duration = Duration::from_secs(5);

/// Configuration options for the browser session.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Chromium binary to launch; auto-detected when unset.
    pub executable: Option<PathBuf>,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Whether to keep Chromium's sandbox enabled.
    pub sandbox: bool,
    /// Extra command-line switches passed to Chromium.
    pub args: Vec<String>,
    /// Timeout for the browser process to start.
    pub launch_timeout: Duration,
    /// Timeout for page navigation or content loading.
    pub navigation_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            sandbox: true,
            args: Vec::new(),
            launch_timeout: DEFAULT_LAUNCH_TIMEOUT,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
        }
    }
}

impl BrowserOptions {
    fn browser_config(&self) -> Result<BrowserConfig, String> {
        let mut builder = BrowserConfig::builder()
            .launch_timeout(self.launch_timeout)
            .request_timeout(self.navigation_timeout + REQUEST_GRACE);

        if !self.headless {
            builder = builder.with_head();
        }
        if !self.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        for arg in &self.args {
            builder = builder.arg(arg.as_str());
        }

        builder.build()
    }
}

/// One running browser process plus the task pumping its DevTools events.
struct RenderSession {
    id: u64,
    browser: Browser,
    handler: JoinHandle<()>,
    alive: Arc<AtomicBool>,
}

impl RenderSession {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire) && !self.handler.is_finished()
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Renders targets to PDF on a shared, lazily started Chromium session.
pub struct ChromiumRenderer {
    options: BrowserOptions,
    session: RwLock<Option<Arc<RenderSession>>>,
    launches: AtomicU64,
}

impl ChromiumRenderer {
    /// Creates a renderer; the browser is not started until first use.
    pub fn new(options: BrowserOptions) -> Self {
        Self {
            options,
            session: RwLock::new(None),
            launches: AtomicU64::new(0),
        }
    }

    /// Number of browser processes started so far.
    pub fn launch_count(&self) -> u64 {
        self.launches.load(Ordering::Acquire)
    }

    /// Starts the browser up front instead of on the first request.
    pub async fn warm_up(&self) -> Result<(), ConversionError> {
        self.ensure_session().await.map(|_| ())
    }

    /// Returns the live session, starting one if needed.
    ///
    /// Readers share the fast path; only the launch itself runs under the
    /// write lock, so concurrent first use starts exactly one process.
    async fn ensure_session(&self) -> Result<Arc<RenderSession>, ConversionError> {
        {
            let slot = self.session.read().await;
            if let Some(session) = slot.as_ref().filter(|s| s.is_alive()) {
                return Ok(Arc::clone(session));
            }
        }

        let mut slot = self.session.write().await;
        if let Some(session) = slot.as_ref() {
            if session.is_alive() {
                return Ok(Arc::clone(session));
            }
            tracing::warn!(session = session.id, "browser session is gone; relaunching");
        }

        let session = Arc::new(self.launch().await?);
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    async fn launch(&self) -> Result<RenderSession, ConversionError> {
        let config = self.options.browser_config().map_err(|err| {
            ConversionError::engine(format!("invalid browser configuration: {err}"))
        })?;

        let start = Instant::now();
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| map_cdp_error("failed to launch browser", err))?;

        let alive = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&alive);
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    if matches!(err, CdpError::Ws(_)) {
                        tracing::warn!(error = %err, "browser connection lost");
                        break;
                    }
                    tracing::debug!(error = %err, "browser handler error");
                }
            }
            flag.store(false, Ordering::Release);
        });

        let id = self.launches.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(
            session = id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "browser session started"
        );

        Ok(RenderSession {
            id,
            browser,
            handler,
            alive,
        })
    }

    /// Drops `session` from the slot unless it has already been replaced.
    async fn discard(&self, session: &Arc<RenderSession>) {
        let mut slot = self.session.write().await;
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, session)) {
            tracing::warn!(session = session.id, "discarding unusable browser session");
            *slot = None;
        }
    }

    async fn render_on(
        &self,
        session: &RenderSession,
        load: &LoadTarget<'_>,
        params: PrintToPdfParams,
    ) -> Result<Vec<u8>, ConversionError> {
        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|err| map_cdp_error("failed to open page", err))?;

        let result = async {
            self.load(&page, load).await?;
            page.pdf(params)
                .await
                .map_err(|err| map_cdp_error("PDF generation failed", err))
        }
        .await;

        if let Err(err) = page.close().await {
            tracing::debug!(session = session.id, error = %err, "failed to close page");
        }

        result
    }

    async fn load(&self, page: &Page, load: &LoadTarget<'_>) -> Result<(), ConversionError> {
        let limit = self.options.navigation_timeout;
        let loading = async {
            match load {
                LoadTarget::Navigate(url) => page.goto(url.as_str()).await.map(|_| ()),
                LoadTarget::Content(html) => page.set_content(*html).await.map(|_| ()),
            }
        };

        match timeout(limit, loading).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(map_cdp_error("navigation failed", err)),
            Err(_) => Err(ConversionError::RenderTimeout(format!(
                "page did not finish loading within {}s",
                limit.as_secs()
            ))),
        }
    }
}

/// What a fresh page should load before printing.
enum LoadTarget<'a> {
    Navigate(url::Url),
    Content(&'a str),
}

impl<'a> LoadTarget<'a> {
    fn from_target(target: &'a ConversionTarget) -> Result<Self, ConversionError> {
        match target {
            ConversionTarget::Url(raw) => parse_target_url(raw).map(LoadTarget::Navigate),
            ConversionTarget::Html(html) => Ok(LoadTarget::Content(html)),
        }
    }
}

#[async_trait]
impl RenderEngine for ChromiumRenderer {
    async fn render(
        &self,
        target: &ConversionTarget,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        let params = print_params(options)?;
        let load = LoadTarget::from_target(target)?;

        let session = self.ensure_session().await?;
        let result = self.render_on(&session, &load, params).await;

        if let Err(ConversionError::RenderEngine(_)) = &result {
            if !session.is_alive() {
                self.discard(&session).await;
            }
        }

        result
    }

    async fn shutdown(&self) {
        let Some(session) = self.session.write().await.take() else {
            return;
        };

        match Arc::try_unwrap(session) {
            Ok(mut session) => {
                if let Err(err) = session.browser.close().await {
                    tracing::debug!(session = session.id, error = %err, "browser close failed");
                }
                if let Err(err) = session.browser.wait().await {
                    tracing::debug!(session = session.id, error = %err, "browser wait failed");
                }
                tracing::info!(session = session.id, "browser session closed");
            }
            Err(shared) => {
                tracing::info!(
                    session = shared.id,
                    "browser session released; closes after in-flight renders finish"
                );
            }
        }
    }
}
