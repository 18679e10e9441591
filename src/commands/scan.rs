use crate::cli::ScanArgs;
use crate::utils::{initialize_thread_pool, Result};
use rayon::prelude::*;
use redline::{FilterVerdict, RedlineFilter};
use serde::Serialize;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, Serialize)]
struct ImageVerdict {
    image: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<FilterVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn scan_image(filter: &RedlineFilter, image: &Path) -> ImageVerdict {
    match filter.scan_file(image) {
        Ok(verdict) => {
            log::info!(
                "{}: {:.3}% marker pixels{}",
                image.display(),
                verdict.match_percent(),
                if verdict.flagged { ", flagged" } else { "" }
            );
            ImageVerdict {
                image: image.to_path_buf(),
                verdict: Some(verdict),
                error: None,
            }
        }
        Err(e) => {
            log::warn!("Could not scan {}: {}", image.display(), e);
            ImageVerdict {
                image: image.to_path_buf(),
                verdict: None,
                error: Some(e.to_string()),
            }
        }
    }
}

pub fn scan(args: ScanArgs) -> Result<()> {
    let filter = args.filter.build_filter()?;
    let pool = initialize_thread_pool(args.num_threads)?;
    let results: Vec<ImageVerdict> = pool.install(|| {
        args.images
            .par_iter()
            .map(|image| scan_image(&filter, image))
            .collect()
    });

    let flagged = results
        .iter()
        .filter(|r| r.verdict.as_ref().is_some_and(|v| v.flagged))
        .count();
    log::info!("{} of {} images flagged", flagged, results.len());

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
            write_results(BufWriter::new(file), &results)
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
        }
        None => write_results(io::stdout().lock(), &results)
            .map_err(|e| format!("Failed to write verdicts: {}", e)),
    }
}

fn write_results<W: Write>(mut writer: W, results: &[ImageVerdict]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, results)?;
    writeln!(writer)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use redline::FilterConfig;

    #[test]
    fn verdicts_and_errors_are_serialized_per_image() {
        let dir = tempfile::tempdir().unwrap();
        let marked = dir.path().join("marked.png");
        RgbImage::from_pixel(8, 8, Rgb([255, 0, 0]))
            .save(&marked)
            .unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"garbage").unwrap();

        let filter = RedlineFilter::new(FilterConfig::density()).unwrap();
        let results = vec![scan_image(&filter, &marked), scan_image(&filter, &broken)];
        let mut buf = Vec::new();
        write_results(&mut buf, &results).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["verdict"]["flagged"], true);
        assert_eq!(value[0]["verdict"]["match_fraction"], 1.0);
        assert!(value[0].get("error").is_none());
        assert!(value[1].get("verdict").is_none());
        assert!(value[1]["error"].as_str().unwrap().contains("broken.png"));
    }
}
