use crate::utils::Result;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Directories used by a batch run.
#[derive(Debug, Clone)]
pub struct PipelineLayout {
    pub tools_dir: PathBuf,
    pub output_dir: PathBuf,
    pub filtered_dir: PathBuf,
    pub temp_dir: PathBuf,
}

impl PipelineLayout {
    /// Creates the output directories and resolves every directory to an absolute path,
    /// since the external tools run with the tools directory as working directory.
    pub fn prepare(self) -> Result<Self> {
        for dir in [&self.output_dir, &self.filtered_dir, &self.temp_dir] {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create directory {}: {}", dir.display(), e))?;
        }
        Ok(Self {
            tools_dir: resolve(&self.tools_dir)?,
            output_dir: resolve(&self.output_dir)?,
            filtered_dir: resolve(&self.filtered_dir)?,
            temp_dir: resolve(&self.temp_dir)?,
        })
    }

    pub fn artifacts(&self, input: &Path) -> Result<ArtifactPaths> {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("Cannot derive a file stem from {}", input.display()))?;
        Ok(ArtifactPaths {
            stem: stem.to_string(),
            input: input.to_path_buf(),
            report: self.output_dir.join(format!("{stem}_output.txt")),
            pdf: self.output_dir.join(format!("{stem}_plot.pdf")),
            page_prefix: self.temp_dir.join(format!("{stem}_plot")),
            filtered_pdf: self.filtered_dir.join(format!("{stem}_filtered.pdf")),
        })
    }
}

fn resolve(dir: &Path) -> Result<PathBuf> {
    dir.canonicalize()
        .map_err(|e| format!("Failed to resolve directory {}: {}", dir.display(), e))
}

/// Every file derived from one input, all named after the input's stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub stem: String,
    pub input: PathBuf,
    pub report: PathBuf,
    pub pdf: PathBuf,
    pub page_prefix: PathBuf,
    pub filtered_pdf: PathBuf,
}

/// Page number of `<prefix>-<N>.png`, where `prefix` is the file name of the prefix path.
fn page_number(file_name: &str, prefix: &str) -> Option<u32> {
    file_name
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

/// Page images produced for `prefix`, in page order.
pub fn list_pages(prefix: &Path) -> Result<Vec<PathBuf>> {
    let (dir, name) = split_prefix(prefix)?;
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(format!("Failed to read directory {}: {}", dir.display(), e)),
    };

    let mut pages = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("Failed to read directory {}: {}", dir.display(), e))?;
        let file_name = entry.file_name();
        let Some(number) = file_name.to_str().and_then(|f| page_number(f, name)) else {
            continue;
        };
        pages.push((number, entry.path()));
    }
    pages.sort();
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// Deletes every page image for `prefix`, returning how many were removed.
pub fn remove_pages(prefix: &Path) -> Result<usize> {
    let pages = list_pages(prefix)?;
    for page in &pages {
        fs::remove_file(page)
            .map_err(|e| format!("Failed to remove {}: {}", page.display(), e))?;
    }
    Ok(pages.len())
}

fn split_prefix(prefix: &Path) -> Result<(&Path, &str)> {
    let name = prefix
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("Invalid page prefix {}", prefix.display()))?;
    let dir = prefix.parent().unwrap_or_else(|| Path::new("."));
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    Ok((dir, name))
}
