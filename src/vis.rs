//! Charts rendered to SVG.
//!
//! Every chart draws onto a caller-supplied [DrawingArea], so the same code renders to a file
//! through [render_svg] or to an in-memory string through [render_svg_string].

use std::error::Error as StdError;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;
use tracing::info;

use crate::dataset::DatasetError;
use crate::preprocess::PreprocessError;
use crate::record::RecordError;

pub mod chart;
pub mod radar;

pub const DEFAULT_SIZE: (u32, u32) = (1000, 800);

/// Fill colours of the radar background rings, the subject record and its comparison.
pub const RADAR_COLOURS: [RGBColor; 4] = [
    RGBColor(0xFF, 0xFF, 0xFF),
    RGBColor(0xC5, 0xBF, 0xBF),
    RGBColor(0xDF, 0x14, 0x14),
    RGBColor(0x14, 0x4F, 0xDF),
];

#[derive(Debug, Error)]
pub enum VisError {
    #[error("drawing failed: {0}")]
    Drawing(String),

    #[error("colour grouping by {0:?} requires a palette")]
    MissingPalette(String),

    #[error("invalid colour {0:?}, expected #RRGGBB")]
    InvalidColour(String),

    #[error("trend line for {series:?}: {reason}")]
    Trend { series: String, reason: String },

    #[error("no series {index} to shade, {available} series drawn")]
    NoSuchSeries { index: usize, available: usize },

    #[error("nothing to plot")]
    Empty,

    #[error("{0}")]
    Dataset(#[from] DatasetError),

    #[error("{0}")]
    Record(#[from] RecordError),

    #[error("{0}")]
    Preprocess(#[from] PreprocessError),
}

impl<E: StdError + Send + Sync> From<DrawingAreaErrorKind<E>> for VisError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        VisError::Drawing(err.to_string())
    }
}

/// Parses a `#RRGGBB` colour. The leading `#` is optional.
pub fn parse_colour(hex: &str) -> Result<RGBColor, VisError> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(VisError::InvalidColour(hex.to_string()));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| VisError::InvalidColour(hex.to_string()))
    };
    Ok(RGBColor(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

pub fn parse_palette(hexes: &[impl AsRef<str>]) -> Result<Vec<RGBColor>, VisError> {
    hexes.iter().map(|hex| parse_colour(hex.as_ref())).collect()
}

/// Draws onto a fresh SVG file of the given size.
pub fn render_svg(
    path: impl AsRef<Path>,
    size: (u32, u32),
    draw: impl FnOnce(&DrawingArea<SVGBackend, Shift>) -> Result<(), VisError>,
) -> Result<(), VisError> {
    let path = path.as_ref();
    {
        let root = SVGBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }
    info!("wrote {}", path.display());
    Ok(())
}

/// Draws into an SVG document held in memory.
pub fn render_svg_string(
    size: (u32, u32),
    draw: impl FnOnce(&DrawingArea<SVGBackend, Shift>) -> Result<(), VisError>,
) -> Result<String, VisError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }
    Ok(svg)
}

/// Smallest and largest non-`NaN` values, widened by a margin so that points at the extremes
/// are not drawn on the axes. A degenerate range is widened by one unit each way.
pub(crate) fn padded_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<(f64, f64)> {
    let (low, high) = values
        .into_iter()
        .filter(|value| !value.is_nan())
        .fold(None, |range, &value| match range {
            None => Some((value, value)),
            Some((low, high)) => Some((f64::min(low, value), f64::max(high, value))),
        })?;
    let margin = if high > low { (high - low) / 20.0 } else { 1.0 };
    Some((low - margin, high + margin))
}
