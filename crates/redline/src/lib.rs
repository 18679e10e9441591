//! Detection of a marker color ("redline") on rasterized chart pages.
//!
//! A [`RedlineFilter`] is built once from a [`FilterConfig`], which is validated up
//! front, and then classifies any number of [`RenderedPage`]s into [`FilterVerdict`]s.
//! Scanning never touches the filesystem; [`RedlineFilter::scan_file`] is a thin
//! decode-then-scan helper.

mod blob;
mod color;
mod config;
mod error;
mod page;
mod region;
mod scan;
mod verdict;

pub use blob::Blob;
pub use color::{ColorMetric, Rgb};
pub use config::FilterConfig;
pub use error::{ConfigError, FormatError};
pub use page::{PixelLayout, RenderedPage};
pub use region::{PixelBounds, RegionOfInterest};
pub use scan::{partition_rows, MatchCount, RedlineFilter};
pub use verdict::FilterVerdict;
