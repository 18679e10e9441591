use crate::{
    blob::{label_blobs, Blob},
    config::FilterConfig,
    error::{ConfigError, FormatError},
    page::RenderedPage,
    region::PixelBounds,
    verdict::FilterVerdict,
};
use rayon::prelude::*;
use std::{ops::Range, path::Path};

const ROWS_PER_PARTITION: u32 = 64;

/// Partial result of scanning a range of rows. Merging is associative and
/// commutative, so partitions can be combined in any order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MatchCount {
    pub matched: u64,
    pub scanned: u64,
    /// First row of the region (0 = region top) holding a match
    pub first_row: Option<u32>,
}

impl MatchCount {
    pub fn merge(self, other: MatchCount) -> MatchCount {
        MatchCount {
            matched: self.matched + other.matched,
            scanned: self.scanned + other.scanned,
            first_row: match (self.first_row, other.first_row) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
        }
    }
}

/// Splits `0..rows` into consecutive ranges of at most `rows_per_partition` rows.
pub fn partition_rows(rows: u32, rows_per_partition: u32) -> Vec<Range<u32>> {
    let step = rows_per_partition.max(1);
    (0..rows)
        .step_by(step as usize)
        .map(|start| start..(start + step).min(rows))
        .collect()
}

/// Redline detector built from a validated [`FilterConfig`].
///
/// Scanning is a pure function of the page and the configuration: the filter holds no
/// mutable state and can be shared across threads.
#[derive(Debug, Clone)]
pub struct RedlineFilter {
    config: FilterConfig,
}

impl RedlineFilter {
    pub fn new(config: FilterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn bounds(&self, page: &RenderedPage) -> PixelBounds {
        self.config.region.bounds(page.width(), page.height())
    }

    #[inline]
    fn is_marker(&self, px: &[u8]) -> bool {
        self.config
            .metric
            .distance(self.config.marker_color, [px[0], px[1], px[2]])
            <= self.config.color_tolerance
    }

    fn region_span<'a>(&self, page: &'a RenderedPage, b: &PixelBounds, row: u32) -> &'a [u8] {
        let channels = page.layout().channels();
        &page.row(b.top + row)[b.left as usize * channels..b.right as usize * channels]
    }

    /// Counts marker pixels in `rows`, given relative to the region top. Rows beyond the
    /// region are ignored.
    pub fn count_rows(&self, page: &RenderedPage, rows: Range<u32>) -> MatchCount {
        let b = self.bounds(page);
        let end = rows.end.min(b.height());
        let start = rows.start.min(end);
        let channels = page.layout().channels();

        let mut count = MatchCount::default();
        for row in start..end {
            let hits = self
                .region_span(page, &b, row)
                .chunks_exact(channels)
                .filter(|px| self.is_marker(px))
                .count() as u64;
            count.scanned += b.width() as u64;
            if hits > 0 {
                count.matched += hits;
                if count.first_row.is_none() {
                    count.first_row = Some(row);
                }
            }
        }
        count
    }

    /// Full-region count, partitioned by row ranges across the current rayon pool.
    pub fn count(&self, page: &RenderedPage) -> MatchCount {
        let b = self.bounds(page);
        partition_rows(b.height(), ROWS_PER_PARTITION)
            .into_par_iter()
            .map(|rows| self.count_rows(page, rows))
            .reduce(MatchCount::default, MatchCount::merge)
    }

    fn marker_mask(&self, page: &RenderedPage, b: &PixelBounds) -> Vec<bool> {
        let width = b.width() as usize;
        let mut mask = vec![false; width * b.height() as usize];
        if width == 0 {
            return mask;
        }
        let channels = page.layout().channels();
        mask.par_chunks_mut(width)
            .enumerate()
            .for_each(|(row, out)| {
                let span = self.region_span(page, b, row as u32);
                for (slot, px) in out.iter_mut().zip(span.chunks_exact(channels)) {
                    *slot = self.is_marker(px);
                }
            });
        mask
    }

    fn count_blobs(&self, page: &RenderedPage, min_blob_size: u64) -> (MatchCount, Vec<Blob>) {
        let b = self.bounds(page);
        let mask = self.marker_mask(page, &b);
        let blobs: Vec<Blob> = label_blobs(&mask, b.width() as usize, b.height() as usize)
            .into_iter()
            .filter(|blob| blob.pixels >= min_blob_size)
            .collect();
        let count = MatchCount {
            matched: blobs.iter().map(|blob| blob.pixels).sum(),
            scanned: b.area(),
            first_row: blobs.iter().map(|blob| blob.y_min).min(),
        };
        let regions = blobs
            .into_iter()
            .map(|blob| blob.offset(b.left, b.top))
            .collect();
        (count, regions)
    }

    pub fn scan(&self, page: &RenderedPage) -> FilterVerdict {
        match self.config.min_blob_size {
            None => self.verdict(self.count(page), None),
            Some(min_blob_size) => {
                let (count, regions) = self.count_blobs(page, min_blob_size);
                self.verdict(count, Some(regions))
            }
        }
    }

    pub fn scan_file(&self, path: &Path) -> Result<FilterVerdict, FormatError> {
        let page = RenderedPage::open(path)?;
        Ok(self.scan(&page))
    }

    /// Classifies a (possibly merged) count. A page without a single marker pixel is never
    /// flagged, whatever the threshold.
    pub fn verdict(&self, count: MatchCount, regions: Option<Vec<Blob>>) -> FilterVerdict {
        let match_fraction = if count.scanned == 0 {
            0.0
        } else {
            count.matched as f64 / count.scanned as f64
        };
        let touches_top = self
            .config
            .top_rows
            .map(|n| count.first_row.is_some_and(|row| row < n));
        let flagged = count.matched > 0
            && match_fraction >= self.config.match_threshold
            && touches_top.unwrap_or(true);

        FilterVerdict {
            flagged,
            match_fraction,
            matched_pixels: count.matched,
            scanned_pixels: count.scanned,
            touches_top,
            regions,
        }
    }
}
