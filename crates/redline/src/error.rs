use crate::color::ColorMetric;
use crate::page::PixelLayout;
use thiserror::Error;

/// The page could not be interpreted as an RGB(A) pixel grid.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormatError {
    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("unsupported color encoding {0}, expected RGB or RGBA")]
    UnsupportedEncoding(String),

    #[error("pixel buffer holds {actual} bytes but a {width}x{height} {layout} image needs {expected}")]
    BufferSize {
        width: u32,
        height: u32,
        layout: PixelLayout,
        expected: usize,
        actual: usize,
    },
}

/// A filter option is out of its valid range. Raised before any scan starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("color tolerance {value} is outside [0, {max:.2}] for the {metric} metric")]
    Tolerance {
        value: f64,
        max: f64,
        metric: ColorMetric,
    },

    #[error("match threshold {0} is outside [0, 1]")]
    Threshold(f64),

    #[error("invalid region of interest: {0}")]
    Region(String),

    #[error("minimum blob size must be at least 1 pixel")]
    MinBlobSize,

    #[error("top row count must be at least 1")]
    TopRows,
}
