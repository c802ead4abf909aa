//! Rendering options and their field-by-field merge over defaults.
//!
//! Callers send a [`RenderOptionsPatch`] where every field is optional. The
//! patch is merged over [`RenderOptions::default`] one field at a time (one
//! margin side at a time, too), so `{}` and an absent options object produce
//! identical options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::ConversionError;

/// Default length applied to every margin side.
pub const DEFAULT_MARGIN: &str = "0.75in";

/// Accepted range for the print scale factor.
pub const SCALE_RANGE: std::ops::RangeInclusive<f64> = 0.1..=2.0;

const PX_PER_INCH: f64 = 96.0;
const PT_PER_INCH: f64 = 72.0;
const CM_PER_INCH: f64 = 2.54;
const MM_PER_INCH: f64 = 25.4;

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageFormat {
    Letter,
    Legal,
    Tabloid,
    Ledger,
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
    A6,
}

impl PageFormat {
    pub const ALL: [PageFormat; 11] = [
        PageFormat::Letter,
        PageFormat::Legal,
        PageFormat::Tabloid,
        PageFormat::Ledger,
        PageFormat::A0,
        PageFormat::A1,
        PageFormat::A2,
        PageFormat::A3,
        PageFormat::A4,
        PageFormat::A5,
        PageFormat::A6,
    ];

    /// Paper width and height in inches, portrait orientation.
    pub fn dimensions_in(&self) -> (f64, f64) {
        match self {
            PageFormat::Letter => (8.5, 11.0),
            PageFormat::Legal => (8.5, 14.0),
            PageFormat::Tabloid => (11.0, 17.0),
            PageFormat::Ledger => (17.0, 11.0),
            PageFormat::A0 => (33.1, 46.8),
            PageFormat::A1 => (23.4, 33.1),
            PageFormat::A2 => (16.54, 23.4),
            PageFormat::A3 => (11.7, 16.54),
            PageFormat::A4 => (8.27, 11.7),
            PageFormat::A5 => (5.83, 8.27),
            PageFormat::A6 => (4.13, 5.83),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PageFormat::Letter => "Letter",
            PageFormat::Legal => "Legal",
            PageFormat::Tabloid => "Tabloid",
            PageFormat::Ledger => "Ledger",
            PageFormat::A0 => "A0",
            PageFormat::A1 => "A1",
            PageFormat::A2 => "A2",
            PageFormat::A3 => "A3",
            PageFormat::A4 => "A4",
            PageFormat::A5 => "A5",
            PageFormat::A6 => "A6",
        }
    }
}

impl fmt::Display for PageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum OptionsParseError {
    #[error("unsupported page format '{0}' (expected one of Letter, Legal, Tabloid, Ledger, A0-A6)")]
    UnknownFormat(String),
    #[error("invalid {side} margin '{value}': expected a length such as 0.75in, 2cm, 10mm, 12pt or 20px")]
    InvalidLength { side: &'static str, value: String },
    #[error("{side} margin must not be negative: '{value}'")]
    NegativeLength { side: &'static str, value: String },
    #[error("scale {0} is outside the supported range 0.1-2.0")]
    ScaleOutOfRange(f64),
    #[error("margins leave no printable area on a {orientation} {format} page ({width}in x {height}in)")]
    MarginsExceedPage {
        format: PageFormat,
        orientation: &'static str,
        width: f64,
        height: f64,
    },
}

impl From<OptionsParseError> for ConversionError {
    fn from(err: OptionsParseError) -> Self {
        ConversionError::InvalidOptions(err.to_string())
    }
}

impl FromStr for PageFormat {
    type Err = OptionsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PageFormat::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OptionsParseError::UnknownFormat(s.to_string()))
    }
}

/// Parses a CSS-like length into inches.
///
/// A bare number is read as pixels, matching how browsers treat unitless
/// print margins.
pub fn parse_length(side: &'static str, value: &str) -> Result<f64, OptionsParseError> {
    let invalid = || OptionsParseError::InvalidLength {
        side,
        value: value.to_string(),
    };

    let lower = value.trim().to_ascii_lowercase();
    let split = lower
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(lower.len());
    let (number, unit) = lower.split_at(split);

    let amount: f64 = number.trim().parse().map_err(|_| invalid())?;
    if !amount.is_finite() {
        return Err(invalid());
    }
    if amount < 0.0 {
        return Err(OptionsParseError::NegativeLength {
            side,
            value: value.to_string(),
        });
    }

    let inches = match unit {
        "in" => amount,
        "cm" => amount / CM_PER_INCH,
        "mm" => amount / MM_PER_INCH,
        "pt" => amount / PT_PER_INCH,
        "px" | "" => amount / PX_PER_INCH,
        _ => return Err(invalid()),
    };
    Ok(inches)
}

/// Page margins as length strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: String,
    pub right: String,
    pub bottom: String,
    pub left: String,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: DEFAULT_MARGIN.to_string(),
            right: DEFAULT_MARGIN.to_string(),
            bottom: DEFAULT_MARGIN.to_string(),
            left: DEFAULT_MARGIN.to_string(),
        }
    }
}

/// Margins resolved to inches, in CSS order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginsInches {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub fn to_inches(&self) -> Result<MarginsInches, OptionsParseError> {
        Ok(MarginsInches {
            top: parse_length("top", &self.top)?,
            right: parse_length("right", &self.right)?,
            bottom: parse_length("bottom", &self.bottom)?,
            left: parse_length("left", &self.left)?,
        })
    }
}

/// Fully-resolved options for a single render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub page_format: PageFormat,
    pub margins: Margins,
    pub print_background: bool,
    pub prefer_css_page_size: bool,
    pub landscape: bool,
    pub scale: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page_format: PageFormat::default(),
            margins: Margins::default(),
            print_background: true,
            prefer_css_page_size: true,
            landscape: false,
            scale: 1.0,
        }
    }
}

impl RenderOptions {
    /// Checks every value against what the print backend supports.
    pub fn validate(&self) -> Result<(), OptionsParseError> {
        let margins = self.margins.to_inches()?;
        if !self.scale.is_finite() || !SCALE_RANGE.contains(&self.scale) {
            return Err(OptionsParseError::ScaleOutOfRange(self.scale));
        }

        let (width, height) = self.paper_size_in();
        if margins.left + margins.right >= width || margins.top + margins.bottom >= height {
            return Err(OptionsParseError::MarginsExceedPage {
                format: self.page_format,
                orientation: if self.landscape { "landscape" } else { "portrait" },
                width,
                height,
            });
        }
        Ok(())
    }

    /// Paper width and height in inches with orientation applied.
    pub fn paper_size_in(&self) -> (f64, f64) {
        let (width, height) = self.page_format.dimensions_in();
        if self.landscape {
            (height, width)
        } else {
            (width, height)
        }
    }
}

/// Per-side margin overrides.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MarginsPatch {
    pub top: Option<String>,
    pub right: Option<String>,
    pub bottom: Option<String>,
    pub left: Option<String>,
}

/// Options as received from a caller; unset fields fall back to the base.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RenderOptionsPatch {
    #[serde(default, alias = "format")]
    pub page_format: Option<String>,
    #[serde(default, alias = "margin")]
    pub margins: Option<MarginsPatch>,
    #[serde(default)]
    pub print_background: Option<bool>,
    #[serde(default)]
    pub prefer_css_page_size: Option<bool>,
    #[serde(default)]
    pub landscape: Option<bool>,
    #[serde(default)]
    pub scale: Option<f64>,
}

impl RenderOptionsPatch {
    /// Merges this patch over `base` field by field and validates the result.
    pub fn merge(&self, base: &RenderOptions) -> Result<RenderOptions, ConversionError> {
        let page_format = match &self.page_format {
            Some(raw) => raw.parse::<PageFormat>()?,
            None => base.page_format,
        };

        let mut margins = base.margins.clone();
        if let Some(patch) = &self.margins {
            if let Some(top) = &patch.top {
                margins.top = top.clone();
            }
            if let Some(right) = &patch.right {
                margins.right = right.clone();
            }
            if let Some(bottom) = &patch.bottom {
                margins.bottom = bottom.clone();
            }
            if let Some(left) = &patch.left {
                margins.left = left.clone();
            }
        }

        let merged = RenderOptions {
            page_format,
            margins,
            print_background: self.print_background.unwrap_or(base.print_background),
            prefer_css_page_size: self
                .prefer_css_page_size
                .unwrap_or(base.prefer_css_page_size),
            landscape: self.landscape.unwrap_or(base.landscape),
            scale: self.scale.unwrap_or(base.scale),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Resolves optional caller options against the defaults.
pub fn resolve_options(
    patch: Option<&RenderOptionsPatch>,
) -> Result<RenderOptions, ConversionError> {
    let defaults = RenderOptions::default();
    match patch {
        Some(patch) => patch.merge(&defaults),
        None => {
            defaults.validate()?;
            Ok(defaults)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn defaults_match_documented_values() {
        let opts = RenderOptions::default();
        assert_eq!(opts.page_format, PageFormat::A4);
        assert_eq!(opts.margins.top, "0.75in");
        assert_eq!(opts.margins.left, "0.75in");
        assert!(opts.print_background);
        assert!(opts.prefer_css_page_size);
        assert!(!opts.landscape);
        assert!(close(opts.scale, 1.0));
    }

    #[test]
    fn empty_patch_equals_absent_options() {
        let from_empty = resolve_options(Some(&RenderOptionsPatch::default())).unwrap();
        let from_none = resolve_options(None).unwrap();
        assert_eq!(from_empty, from_none);
    }

    #[test]
    fn empty_json_object_deserializes_to_empty_patch() {
        let patch: RenderOptionsPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch, RenderOptionsPatch::default());
    }

    #[test]
    fn merge_is_field_by_field() {
        let patch = RenderOptionsPatch {
            margins: Some(MarginsPatch {
                top: Some("2cm".to_string()),
                ..MarginsPatch::default()
            }),
            landscape: Some(true),
            ..RenderOptionsPatch::default()
        };

        let merged = patch.merge(&RenderOptions::default()).unwrap();
        assert_eq!(merged.margins.top, "2cm");
        assert_eq!(merged.margins.right, "0.75in");
        assert_eq!(merged.margins.bottom, "0.75in");
        assert!(merged.landscape);
        assert!(merged.print_background);
        assert_eq!(merged.page_format, PageFormat::A4);
    }

    #[test]
    fn accepts_legacy_key_names() {
        let patch: RenderOptionsPatch = serde_json::from_str(
            r#"{"format": "letter", "margin": {"left": "1cm"}, "print_background": false}"#,
        )
        .unwrap();
        let merged = patch.merge(&RenderOptions::default()).unwrap();
        assert_eq!(merged.page_format, PageFormat::Letter);
        assert_eq!(merged.margins.left, "1cm");
        assert!(!merged.print_background);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = serde_json::from_str::<RenderOptionsPatch>(r#"{"colour": "red"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_format_is_invalid_options() {
        let patch = RenderOptionsPatch {
            page_format: Some("B9".to_string()),
            ..RenderOptionsPatch::default()
        };
        match patch.merge(&RenderOptions::default()) {
            Err(ConversionError::InvalidOptions(msg)) => assert!(msg.contains("B9")),
            other => panic!("expected invalid options, got {other:?}"),
        }
    }

    #[test]
    fn format_parsing_is_case_insensitive() {
        assert_eq!("a3".parse::<PageFormat>().unwrap(), PageFormat::A3);
        assert_eq!(" LEDGER ".parse::<PageFormat>().unwrap(), PageFormat::Ledger);
    }

    #[test]
    fn lengths_convert_to_inches() {
        assert!(close(parse_length("top", "0.75in").unwrap(), 0.75));
        assert!(close(parse_length("top", "2.54cm").unwrap(), 1.0));
        assert!(close(parse_length("top", "25.4mm").unwrap(), 1.0));
        assert!(close(parse_length("top", "72pt").unwrap(), 1.0));
        assert!(close(parse_length("top", "96px").unwrap(), 1.0));
        assert!(close(parse_length("top", "48").unwrap(), 0.5));
        assert!(close(parse_length("top", "0").unwrap(), 0.0));
    }

    #[test]
    fn bad_lengths_are_rejected() {
        assert!(matches!(
            parse_length("left", "wide"),
            Err(OptionsParseError::InvalidLength { side: "left", .. })
        ));
        assert!(matches!(
            parse_length("left", "3furlongs"),
            Err(OptionsParseError::InvalidLength { .. })
        ));
        assert!(matches!(
            parse_length("left", "-1cm"),
            Err(OptionsParseError::NegativeLength { .. })
        ));
    }

    #[test]
    fn scale_outside_range_is_invalid() {
        let patch = RenderOptionsPatch {
            scale: Some(5.0),
            ..RenderOptionsPatch::default()
        };
        assert!(matches!(
            patch.merge(&RenderOptions::default()),
            Err(ConversionError::InvalidOptions(_))
        ));
    }

    #[test]
    fn a4_dimensions() {
        let (w, h) = PageFormat::A4.dimensions_in();
        assert!(close(w, 8.27));
        assert!(close(h, 11.7));
    }

    #[test]
    fn margins_wider_than_the_page_are_invalid() {
        let patch = RenderOptionsPatch {
            margins: Some(MarginsPatch {
                left: Some("1000in".to_string()),
                ..MarginsPatch::default()
            }),
            ..RenderOptionsPatch::default()
        };

        match patch.merge(&RenderOptions::default()) {
            Err(ConversionError::InvalidOptions(msg)) => assert!(msg.contains("A4"), "{msg}"),
            other => panic!("expected invalid options, got {other:?}"),
        }
    }

    #[test]
    fn margin_fit_follows_orientation() {
        let tall_margins = Margins {
            top: "4.25in".to_string(),
            bottom: "4.25in".to_string(),
            ..Margins::default()
        };
        let portrait = RenderOptions {
            page_format: PageFormat::Letter,
            margins: tall_margins,
            ..RenderOptions::default()
        };
        assert!(portrait.validate().is_ok());

        let landscape = RenderOptions {
            landscape: true,
            ..portrait
        };
        assert_eq!(landscape.paper_size_in(), (11.0, 8.5));
        assert!(matches!(
            landscape.validate(),
            Err(OptionsParseError::MarginsExceedPage {
                orientation: "landscape",
                ..
            })
        ));
    }
}
