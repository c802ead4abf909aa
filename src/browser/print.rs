//! DevTools `Page.printToPDF` parameters and engine error mapping.

use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::error::CdpError;

use crate::error::ConversionError;
use crate::options::RenderOptions;

/// Builds print parameters for `options`, rejecting unsupported values.
pub fn print_params(options: &RenderOptions) -> Result<PrintToPdfParams, ConversionError> {
    options.validate()?;
    let margins = options.margins.to_inches()?;
    let (paper_width, paper_height) = options.page_format.dimensions_in();

    Ok(PrintToPdfParams {
        landscape: Some(options.landscape),
        print_background: Some(options.print_background),
        scale: Some(options.scale),
        paper_width: Some(paper_width),
        paper_height: Some(paper_height),
        margin_top: Some(margins.top),
        margin_right: Some(margins.right),
        margin_bottom: Some(margins.bottom),
        margin_left: Some(margins.left),
        prefer_css_page_size: Some(options.prefer_css_page_size),
        ..PrintToPdfParams::default()
    })
}

/// Maps a DevTools failure during `stage` to a render engine error.
pub(crate) fn map_cdp_error(stage: &str, err: CdpError) -> ConversionError {
    ConversionError::engine(format!("{stage}: {err}"))
}

/// Checks that a URL target is navigable before a page is opened for it.
pub(crate) fn parse_target_url(raw: &str) -> Result<url::Url, ConversionError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|err| ConversionError::engine(format!("cannot navigate to '{raw}': {err}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ConversionError::engine(format!(
            "cannot navigate to '{raw}': unsupported scheme '{other}'"
        ))),
    }
}
