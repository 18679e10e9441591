//! The per-file scoring pipeline: external stages, artifact naming and the batch driver.

mod artifacts;
mod assemble;
mod batch;
mod dependencies;
mod external;
mod summary;

pub use artifacts::{list_pages, remove_pages, ArtifactPaths, PipelineLayout};
pub use assemble::write_page_pdf;
pub use batch::BatchDriver;
pub use dependencies::{Dependency, DependencyKind, DependencyReport};
pub use external::{PdftoppmRasterizer, PlaacScorer, RscriptPlotter, ToolSettings};
pub use summary::{BatchSummary, FileOutcome, FileReport, PageOutcome, PageReport, Stage};

use crate::utils::Result;
use std::path::{Path, PathBuf};

/// Text report written by the scorer for one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreReport {
    pub path: PathBuf,
}

/// Computes per-residue prion-like scores for a FASTA file.
pub trait Scorer: Send + Sync {
    fn score(&self, input: &Path, report: &Path) -> Result<ScoreReport>;
}

/// Renders a score report into a multi-page PDF chart.
pub trait Plotter: Send + Sync {
    fn plot(&self, report: &ScoreReport, pdf: &Path) -> Result<()>;
}

/// Splits a PDF into one image per page, named `<prefix>-<N>.png`.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, pdf: &Path, prefix: &Path) -> Result<Vec<PathBuf>>;
}
