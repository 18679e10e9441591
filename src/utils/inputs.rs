use crate::utils::Result;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Resolves `--input` into the sorted list of FASTA files to process.
///
/// A file is taken as is, whatever its extension. A directory is scanned one level
/// deep for files whose extension is exactly `extension`. Matching is case-sensitive so
/// that `a.fasta` and `a.FASTA` can never both be selected and share artifact names.
pub fn collect_inputs(input: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let extension = extension.trim_start_matches('.');
    if input.is_file() {
        let path = canonicalize(input)?;
        return Ok(vec![path]);
    }
    if !input.is_dir() {
        return Err(format!("Input does not exist: {}", input.display()));
    }

    let entries = fs::read_dir(input)
        .map_err(|e| format!("Failed to read directory {}: {}", input.display(), e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| format!("Failed to read directory {}: {}", input.display(), e))?;
        let path = entry.path();
        if path.is_file() && has_extension(&path, extension) {
            paths.push(canonicalize(&path)?);
        }
    }
    if paths.is_empty() {
        return Err(format!(
            "No .{} files found in {}",
            extension,
            input.display()
        ));
    }
    paths.sort();
    Ok(paths)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == extension)
}

fn canonicalize(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .map_err(|e| format!("Failed to resolve {}: {}", path.display(), e))
}
