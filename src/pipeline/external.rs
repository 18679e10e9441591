use super::{list_pages, Plotter, Rasterizer, ScoreReport, Scorer};
use crate::utils::Result;
use std::{
    ffi::OsString,
    fs::File,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

pub const PLAAC_JAR: &str = "plaac.jar";
pub const PLOT_SCRIPT: &str = "plaac_plot.r";

/// How much of a failing tool's stderr ends up in the error message.
const STDERR_TAIL_LINES: usize = 5;

/// Executables and resources for the external stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    pub tools_dir: PathBuf,
    pub java: String,
    pub rscript: String,
    pub pdftoppm: String,
    pub resolution: Option<u32>,
}

impl ToolSettings {
    pub fn jar_path(&self) -> PathBuf {
        self.tools_dir.join(PLAAC_JAR)
    }

    pub fn plot_script_path(&self) -> PathBuf {
        self.tools_dir.join(PLOT_SCRIPT)
    }
}

/// Runs `executable` with `args`. When `stdout` is given the tool's standard output is
/// written there, otherwise it is discarded.
fn run_tool(
    executable: &str,
    args: &[OsString],
    cwd: Option<&Path>,
    stdout: Option<&Path>,
) -> Result<()> {
    let mut command = Command::new(executable);
    command.args(args).stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    match stdout {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
            command.stdout(file);
        }
        None => {
            command.stdout(Stdio::null());
        }
    }

    let command_line = render_command(executable, args);
    log::debug!("Running: {}", command_line);
    let output = command.output().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            format!("Executable '{}' not found", executable)
        } else {
            format!("Could not run '{}': {}", command_line, e)
        }
    })?;

    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail = stderr_tail(&stderr);
    let status = output
        .status
        .code()
        .map_or_else(|| "a signal".to_string(), |code| format!("exit code {code}"));
    if tail.is_empty() {
        Err(format!("'{}' failed with {}", command_line, status))
    } else {
        Err(format!("'{}' failed with {}: {}", command_line, status, tail))
    }
}

fn render_command(executable: &str, args: &[OsString]) -> String {
    std::iter::once(executable.to_string())
        .chain(args.iter().map(|a| a.to_string_lossy().into_owned()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}

/// PLAAC scorer: `java -jar plaac.jar -i <fasta> -p all`, run from the tools directory.
#[derive(Debug, Clone)]
pub struct PlaacScorer {
    settings: ToolSettings,
}

impl PlaacScorer {
    pub fn new(settings: ToolSettings) -> Self {
        Self { settings }
    }
}

impl Scorer for PlaacScorer {
    fn score(&self, input: &Path, report: &Path) -> Result<ScoreReport> {
        let args: Vec<OsString> = vec![
            "-jar".into(),
            PLAAC_JAR.into(),
            "-i".into(),
            input.into(),
            "-p".into(),
            "all".into(),
        ];
        run_tool(
            &self.settings.java,
            &args,
            Some(&self.settings.tools_dir),
            Some(report),
        )?;
        Ok(ScoreReport {
            path: report.to_path_buf(),
        })
    }
}

/// Plot renderer: `Rscript plaac_plot.r <report> <pdf>`, run from the tools directory.
#[derive(Debug, Clone)]
pub struct RscriptPlotter {
    settings: ToolSettings,
}

impl RscriptPlotter {
    pub fn new(settings: ToolSettings) -> Self {
        Self { settings }
    }
}

impl Plotter for RscriptPlotter {
    fn plot(&self, report: &ScoreReport, pdf: &Path) -> Result<()> {
        let args: Vec<OsString> = vec![PLOT_SCRIPT.into(), (&report.path).into(), pdf.into()];
        run_tool(
            &self.settings.rscript,
            &args,
            Some(&self.settings.tools_dir),
            None,
        )?;
        if !pdf.is_file() {
            return Err(format!("Plotter did not produce {}", pdf.display()));
        }
        Ok(())
    }
}

/// Page rasterizer: `pdftoppm -png [-r <dpi>] <pdf> <prefix>`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    settings: ToolSettings,
}

impl PdftoppmRasterizer {
    pub fn new(settings: ToolSettings) -> Self {
        Self { settings }
    }

    fn arguments(&self, pdf: &Path, prefix: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-png".into()];
        if let Some(dpi) = self.settings.resolution {
            args.push("-r".into());
            args.push(dpi.to_string().into());
        }
        args.push(pdf.into());
        args.push(prefix.into());
        args
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf: &Path, prefix: &Path) -> Result<Vec<PathBuf>> {
        let args = self.arguments(pdf, prefix);
        run_tool(&self.settings.pdftoppm, &args, None, None)?;
        let pages = list_pages(prefix)?;
        if pages.is_empty() {
            return Err(format!("No page images produced for {}", pdf.display()));
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(tools_dir: &Path) -> ToolSettings {
        ToolSettings {
            tools_dir: tools_dir.to_path_buf(),
            java: "java".into(),
            rscript: "Rscript".into(),
            pdftoppm: "pdftoppm".into(),
            resolution: None,
        }
    }

    #[test]
    fn resource_paths_live_in_tools_dir() {
        let settings = settings(Path::new("/opt/plaac"));
        assert_eq!(settings.jar_path(), PathBuf::from("/opt/plaac/plaac.jar"));
        assert_eq!(
            settings.plot_script_path(),
            PathBuf::from("/opt/plaac/plaac_plot.r")
        );
    }

    #[test]
    fn rasterizer_resolution_is_optional() {
        let mut settings = settings(Path::new("plaac"));
        let pdf = Path::new("out/a_plot.pdf");
        let prefix = Path::new("tmp/a_plot");

        let args = PdftoppmRasterizer::new(settings.clone()).arguments(pdf, prefix);
        assert_eq!(args, vec!["-png", "out/a_plot.pdf", "tmp/a_plot"]);

        settings.resolution = Some(150);
        let args = PdftoppmRasterizer::new(settings).arguments(pdf, prefix);
        assert_eq!(args, vec!["-png", "-r", "150", "out/a_plot.pdf", "tmp/a_plot"]);
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let stderr = "one\n\ntwo\nthree\nfour\nfive\nsix\n";
        assert_eq!(stderr_tail(stderr), "two | three | four | five | six");
        assert_eq!(stderr_tail(""), "");
    }

    #[test]
    fn missing_executable_is_reported() {
        let err = run_tool("prionscan-no-such-tool", &[], None, None).unwrap_err();
        assert_eq!(err, "Executable 'prionscan-no-such-tool' not found");
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_reports_status_and_stderr() {
        let args: Vec<OsString> = vec!["-c".into(), "echo boom >&2; exit 3".into()];
        let err = run_tool("sh", &args, None, None).unwrap_err();
        assert!(err.contains("failed with exit code 3: boom"), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn stdout_is_redirected_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.txt");
        let args: Vec<OsString> = vec!["-c".into(), "echo scored".into()];
        run_tool("sh", &args, Some(dir.path()), Some(&out)).unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "scored\n");
    }
}
