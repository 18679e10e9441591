use crate::blob::Blob;
use serde::{Deserialize, Serialize};

/// Outcome of scanning one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterVerdict {
    pub flagged: bool,
    /// Marker pixels over scanned pixels, in `[0, 1]`.
    pub match_fraction: f64,
    pub matched_pixels: u64,
    pub scanned_pixels: u64,
    /// Set only when the filter restricts matches to the top rows of the region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touches_top: Option<bool>,
    /// Marker blobs that survived the size filter, when one is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<Blob>>,
}

impl FilterVerdict {
    pub fn match_percent(&self) -> f64 {
        self.match_fraction * 100.0
    }
}
