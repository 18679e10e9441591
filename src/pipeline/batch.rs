use super::{
    remove_pages, write_page_pdf, ArtifactPaths, FileOutcome, FileReport, PageOutcome,
    PageReport, PipelineLayout, Plotter, Rasterizer, Scorer, Stage,
};
use crate::{pipeline::BatchSummary, utils::read_fasta};
use rayon::prelude::*;
use redline::RedlineFilter;
use std::{
    fs,
    path::{Path, PathBuf},
};

type StageResult<T> = std::result::Result<T, (Stage, String)>;

fn at(stage: Stage) -> impl FnOnce(String) -> (Stage, String) {
    move |reason| (stage, reason)
}

/// Runs every input through score, plot, rasterize and scan, then routes flagged plots.
pub struct BatchDriver<'a> {
    layout: &'a PipelineLayout,
    scorer: &'a dyn Scorer,
    plotter: &'a dyn Plotter,
    rasterizer: &'a dyn Rasterizer,
    filter: &'a RedlineFilter,
    keep_flagged_pages: bool,
    flagged_pages_only: bool,
}

impl<'a> BatchDriver<'a> {
    pub fn new(
        layout: &'a PipelineLayout,
        scorer: &'a dyn Scorer,
        plotter: &'a dyn Plotter,
        rasterizer: &'a dyn Rasterizer,
        filter: &'a RedlineFilter,
    ) -> Self {
        Self {
            layout,
            scorer,
            plotter,
            rasterizer,
            filter,
            keep_flagged_pages: false,
            flagged_pages_only: false,
        }
    }

    pub fn keep_flagged_pages(mut self, keep: bool) -> Self {
        self.keep_flagged_pages = keep;
        self
    }

    /// Builds the filtered PDF from the flagged page images instead of copying the plot.
    pub fn flagged_pages_only(mut self, only: bool) -> Self {
        self.flagged_pages_only = only;
        self
    }

    /// Processes the inputs in order. Page scans run on the current rayon pool.
    pub fn run(&self, inputs: &[PathBuf]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for (i, input) in inputs.iter().enumerate() {
            log::info!("[{}/{}] {}", i + 1, inputs.len(), input.display());
            summary.push(self.process_file(input));
        }
        summary
    }

    pub fn process_file(&self, input: &Path) -> FileReport {
        let outcome = self
            .layout
            .artifacts(input)
            .map_err(at(Stage::Setup))
            .and_then(|paths| self.process(&paths))
            .unwrap_or_else(|(stage, reason)| {
                log::warn!("Skipping {} at {}: {}", input.display(), stage, reason);
                FileOutcome::Skipped { stage, reason }
            });
        FileReport {
            input: input.to_path_buf(),
            outcome,
        }
    }

    fn process(&self, paths: &ArtifactPaths) -> StageResult<FileOutcome> {
        let records = read_fasta(&paths.input).map_err(at(Stage::ReadInput))?;
        if records.is_empty() {
            return Err((Stage::ReadInput, "no sequence records".to_string()));
        }
        log::debug!("{}: {} sequences", paths.stem, records.len());

        let report = self
            .scorer
            .score(&paths.input, &paths.report)
            .map_err(at(Stage::Score))?;
        self.plotter
            .plot(&report, &paths.pdf)
            .map_err(at(Stage::Plot))?;

        let stale = remove_pages(&paths.page_prefix).map_err(at(Stage::Rasterize))?;
        if stale > 0 {
            log::debug!("Removed {} stale page images for {}", stale, paths.stem);
        }
        let pages = self
            .rasterizer
            .rasterize(&paths.pdf, &paths.page_prefix)
            .map_err(at(Stage::Rasterize))?;

        let mut pages = self.scan_pages(&pages);
        let (filtered_pdf, route_error) = match self.route(paths, &mut pages) {
            Ok(filtered_pdf) => (filtered_pdf, None),
            Err(e) => {
                log::warn!("Failed to route flagged output of {}: {}", paths.stem, e);
                (None, Some(e))
            }
        };
        if let Err(e) = remove_pages(&paths.page_prefix) {
            log::warn!("Failed to clean up page images for {}: {}", paths.stem, e);
        }

        Ok(FileOutcome::Processed {
            sequences: records.len(),
            pages,
            filtered_pdf,
            route_error,
        })
    }

    fn scan_pages(&self, pages: &[PathBuf]) -> Vec<PageReport> {
        pages
            .par_iter()
            .map(|page| {
                let outcome = match self.filter.scan_file(page) {
                    Ok(verdict) => {
                        log::info!(
                            "{}: {:.3}% marker pixels{}",
                            page.display(),
                            verdict.match_percent(),
                            if verdict.flagged { ", flagged" } else { "" }
                        );
                        PageOutcome::Scanned { verdict }
                    }
                    Err(e) => {
                        log::warn!("Could not scan {}: {}", page.display(), e);
                        PageOutcome::Unscannable {
                            reason: e.to_string(),
                        }
                    }
                };
                PageReport {
                    page: page.clone(),
                    outcome,
                }
            })
            .collect()
    }

    /// Moves flagged pages into the filtered dir when keeping them, then writes the
    /// filtered PDF. A partially written PDF is removed on failure, so the file on disk
    /// only exists when routing succeeded.
    fn route(
        &self,
        paths: &ArtifactPaths,
        pages: &mut [PageReport],
    ) -> crate::utils::Result<Option<PathBuf>> {
        if !pages.iter().any(PageReport::is_flagged) {
            return Ok(None);
        }
        if self.keep_flagged_pages {
            for page in pages.iter_mut().filter(|p| p.is_flagged()) {
                page.page = move_file(&page.page, &self.layout.filtered_dir)?;
            }
        }

        let written = if self.flagged_pages_only {
            let flagged: Vec<PathBuf> = pages
                .iter()
                .filter(|p| p.is_flagged())
                .map(|p| p.page.clone())
                .collect();
            write_page_pdf(&flagged, &paths.filtered_pdf)
        } else {
            fs::copy(&paths.pdf, &paths.filtered_pdf)
                .map(|_| ())
                .map_err(|e| {
                    format!(
                        "Failed to copy {} to {}: {}",
                        paths.pdf.display(),
                        paths.filtered_pdf.display(),
                        e
                    )
                })
        };
        if let Err(e) = written {
            if paths.filtered_pdf.exists() {
                if let Err(rm) = fs::remove_file(&paths.filtered_pdf) {
                    log::warn!(
                        "Failed to remove partial {}: {}",
                        paths.filtered_pdf.display(),
                        rm
                    );
                }
            }
            return Err(e);
        }
        log::info!("Redline detected in {}", paths.filtered_pdf.display());
        Ok(Some(paths.filtered_pdf.clone()))
    }
}

fn move_file(file: &Path, dir: &Path) -> crate::utils::Result<PathBuf> {
    let name = file
        .file_name()
        .ok_or_else(|| format!("Invalid page path {}", file.display()))?;
    let target = dir.join(name);
    if fs::rename(file, &target).is_err() {
        fs::copy(file, &target)
            .and_then(|_| fs::remove_file(file))
            .map_err(|e| format!("Failed to move {} to {}: {}", file.display(), dir.display(), e))?;
    }
    Ok(target)
}
