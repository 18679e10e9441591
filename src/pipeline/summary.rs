use crate::utils::Result;
use redline::FilterVerdict;
use serde::Serialize;
use std::{
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Step of the per-file pipeline that a skipped file stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Setup,
    ReadInput,
    Score,
    Plot,
    Rasterize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::ReadInput => "read input",
            Stage::Score => "score",
            Stage::Plot => "plot",
            Stage::Rasterize => "rasterize",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum PageOutcome {
    Scanned { verdict: FilterVerdict },
    Unscannable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    pub page: PathBuf,
    #[serde(flatten)]
    pub outcome: PageOutcome,
}

impl PageReport {
    pub fn is_flagged(&self) -> bool {
        matches!(&self.outcome, PageOutcome::Scanned { verdict } if verdict.flagged)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum FileOutcome {
    Processed {
        sequences: usize,
        pages: Vec<PageReport>,
        /// Filtered PDF, present when at least one page was flagged and routing succeeded.
        #[serde(skip_serializing_if = "Option::is_none")]
        filtered_pdf: Option<PathBuf>,
        /// Why the filtered output could not be written; verdicts are kept regardless.
        #[serde(skip_serializing_if = "Option::is_none")]
        route_error: Option<String>,
    },
    Skipped {
        stage: Stage,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

impl FileReport {
    pub fn is_flagged(&self) -> bool {
        matches!(
            &self.outcome,
            FileOutcome::Processed { pages, .. } if pages.iter().any(PageReport::is_flagged)
        )
    }

    pub fn route_error(&self) -> Option<&str> {
        match &self.outcome {
            FileOutcome::Processed { route_error, .. } => route_error.as_deref(),
            FileOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, FileOutcome::Skipped { .. })
    }
}

/// Per-file outcomes of a batch plus totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub files_processed: usize,
    pub files_flagged: usize,
    pub files_skipped: usize,
    pub files_route_failed: usize,
    pub pages_scanned: usize,
    pub pages_flagged: usize,
    pub pages_unscannable: usize,
    pub files: Vec<FileReport>,
}

impl BatchSummary {
    pub fn push(&mut self, report: FileReport) {
        match &report.outcome {
            FileOutcome::Processed { pages, .. } => {
                self.files_processed += 1;
                if report.is_flagged() {
                    self.files_flagged += 1;
                }
                if report.route_error().is_some() {
                    self.files_route_failed += 1;
                }
                for page in pages {
                    match &page.outcome {
                        PageOutcome::Scanned { verdict } => {
                            self.pages_scanned += 1;
                            if verdict.flagged {
                                self.pages_flagged += 1;
                            }
                        }
                        PageOutcome::Unscannable { .. } => self.pages_unscannable += 1,
                    }
                }
            }
            FileOutcome::Skipped { .. } => self.files_skipped += 1,
        }
        self.files.push(report);
    }

    pub fn log(&self) {
        for file in &self.files {
            match &file.outcome {
                FileOutcome::Skipped { stage, reason } => {
                    log::warn!("Skipped {} at {}: {}", file.input.display(), stage, reason)
                }
                FileOutcome::Processed {
                    route_error: Some(reason),
                    ..
                } => log::warn!(
                    "Flagged output of {} not written: {}",
                    file.input.display(),
                    reason
                ),
                FileOutcome::Processed { .. } => {}
            }
        }
        if self.pages_unscannable > 0 {
            log::warn!("{} page images could not be scanned", self.pages_unscannable);
        }
        log::info!(
            "{} FASTA files processed, {} had prion-like hits",
            self.files_processed,
            self.files_flagged
        );
        if self.files_skipped > 0 {
            log::warn!("{} FASTA files skipped", self.files_skipped);
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| format!("Failed to create summary {}: {}", path.display(), e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| format!("Failed to write summary {}: {}", path.display(), e))?;
        writeln!(writer)
            .and_then(|_| writer.flush())
            .map_err(|e| format!("Failed to write summary {}: {}", path.display(), e))
    }
}
