//! Headless browser rendering of URLs and HTML into PDF bytes.
//!
//! # Module Structure
//!
//! - [`manager`] - Shared Chromium session with lazy start and self-healing
//! - [`print`] - Mapping of [`RenderOptions`] onto the DevTools print call
//!
//! # Example
//!
//! ```no_run
//! use utilityhub_lib::{BrowserOptions, ChromiumRenderer, ConversionTarget, RenderEngine, RenderOptions};
//!
//! # async fn example() -> Result<(), utilityhub_lib::ConversionError> {
//! let renderer = ChromiumRenderer::new(BrowserOptions::default());
//! let target = ConversionTarget::Html("<h1>Hi</h1>".to_string());
//! let pdf = renderer.render(&target, &RenderOptions::default()).await?;
//! assert!(pdf.starts_with(b"%PDF"));
//! renderer.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod manager;
mod print;

use async_trait::async_trait;

use crate::error::ConversionError;
use crate::options::RenderOptions;
use crate::types::ConversionTarget;

pub use manager::{
    BrowserOptions, ChromiumRenderer, DEFAULT_LAUNCH_TIMEOUT, DEFAULT_NAVIGATION_TIMEOUT,
};
pub use print::print_params;

/// Something that turns a target into PDF bytes.
///
/// Implementations must tolerate concurrent `render` calls.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    async fn render(
        &self,
        target: &ConversionTarget,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, ConversionError>;

    /// Releases engine resources. Safe to call more than once.
    async fn shutdown(&self);
}
