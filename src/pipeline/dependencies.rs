use super::ToolSettings;
use crate::utils::{find_executable, Result};
use std::{fmt, path::PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyKind {
    Executable,
    File,
}

/// One external requirement and where it was found, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub purpose: &'static str,
    pub kind: DependencyKind,
    pub location: Option<PathBuf>,
}

impl Dependency {
    fn executable(name: &str, purpose: &'static str) -> Self {
        Self {
            name: name.to_string(),
            purpose,
            kind: DependencyKind::Executable,
            location: find_executable(name),
        }
    }

    fn file(path: PathBuf, purpose: &'static str) -> Self {
        let location = path.is_file().then(|| path.clone());
        Self {
            name: path.display().to_string(),
            purpose,
            kind: DependencyKind::File,
            location,
        }
    }

    pub fn is_available(&self) -> bool {
        self.location.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct DependencyReport {
    pub dependencies: Vec<Dependency>,
}

impl DependencyReport {
    pub fn check(settings: &ToolSettings) -> Self {
        Self {
            dependencies: vec![
                Dependency::executable(&settings.java, "Java (to run plaac.jar)"),
                Dependency::executable(&settings.rscript, "R (to run plaac_plot.r)"),
                Dependency::executable(&settings.pdftoppm, "Poppler (to split PDFs into PNGs)"),
                Dependency::file(settings.jar_path(), "PLAAC scorer"),
                Dependency::file(settings.plot_script_path(), "PLAAC plot script"),
            ],
        }
    }

    pub fn missing(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter().filter(|d| !d.is_available())
    }

    pub fn ensure_complete(&self) -> Result<()> {
        let missing: Vec<_> = self.missing().map(|d| d.name.as_str()).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("Missing dependencies: {}", missing.join(", ")))
        }
    }
}

impl fmt::Display for DependencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for dep in &self.dependencies {
            match &dep.location {
                Some(path) if dep.kind == DependencyKind::Executable => {
                    writeln!(f, "[ok]      {} - {} ({})", dep.name, dep.purpose, path.display())?
                }
                Some(_) => writeln!(f, "[ok]      {} - {}", dep.name, dep.purpose)?,
                None => writeln!(f, "[missing] {} - {}", dep.name, dep.purpose)?,
            }
        }
        Ok(())
    }
}
