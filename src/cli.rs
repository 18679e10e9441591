use crate::{
    pipeline::ToolSettings,
    utils::{find_executable, Result},
};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use log::{Level, LevelFilter};
use owo_colors::{
    colors::{Blue, Green, Magenta, Red, Yellow},
    OwoColorize, Stream, Style,
};
use redline::{ColorMetric, FilterConfig, RedlineFilter, RegionOfInterest, Rgb};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

pub const FULL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "prionscan",
          version = FULL_VERSION,
          about = "Batch PLAAC scoring with redline detection on the rendered plots",
          long_about = None,
          disable_help_subcommand = true,
          after_help = "External tools: java (plaac.jar), Rscript (plaac_plot.r) and pdftoppm.\nRun 'prionscan check' to verify them.",
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    /// Enable or disable color output in logging
    #[arg(long, value_enum, default_value_t = Color::Auto, global = true, help_heading = "Advanced")]
    color: Color,

    /// Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true
    )]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Score, plot and filter a batch of FASTA files")]
    Run(RunArgs),
    #[clap(about = "Run redline detection on existing page images")]
    Scan(ScanArgs),
    #[clap(about = "Check that the external tools are available")]
    Check(CheckArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Run(_) => "run",
            Command::Scan(_) => "scan",
            Command::Check(_) => "check",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Share of marker-colored pixels on the whole page
    Density,
    /// Red score line reaching the ceiling of the chart
    TouchTop,
}

/// Redline detection options shared by `run` and `scan`.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Detection preset, sets the defaults of the options below
    #[arg(
        long = "preset",
        value_name = "PRESET",
        value_enum,
        default_value_t = Preset::Density,
        help_heading = "Detection"
    )]
    pub preset: Preset,

    /// Marker color as #RRGGBB or R,G,B
    #[arg(
        long = "marker-color",
        value_name = "COLOR",
        default_value = "#FF0000",
        value_parser = parse_color,
        help_heading = "Detection"
    )]
    pub marker_color: Rgb,

    /// Color distance metric (euclidean, chebyshev or dominance)
    #[arg(
        long = "metric",
        value_name = "METRIC",
        default_value = "chebyshev",
        default_value_if("preset", "touch-top", Some("dominance")),
        value_parser = parse_metric,
        help_heading = "Detection"
    )]
    pub metric: ColorMetric,

    /// Maximum color distance for a pixel to count as marker
    #[arg(
        long = "tolerance",
        value_name = "DISTANCE",
        default_value = "96",
        default_value_if("preset", "touch-top", Some("224")),
        value_parser = ensure_non_negative_float,
        help_heading = "Detection"
    )]
    pub color_tolerance: f64,

    /// Minimum fraction of marker pixels to flag a page
    #[arg(
        long = "threshold",
        value_name = "FRACTION",
        default_value = "0.001",
        default_value_if("preset", "touch-top", Some("0")),
        value_parser = ensure_unit_float,
        help_heading = "Detection"
    )]
    pub match_threshold: f64,

    /// Ignore connected marker patches smaller than this many pixels
    #[arg(
        long = "min-blob-size",
        value_name = "PIXELS",
        value_parser = clap::value_parser!(u64).range(1..),
        help_heading = "Detection"
    )]
    pub min_blob_size: Option<u64>,

    /// Region to scan as LEFT,TOP,RIGHT,BOTTOM page fractions
    #[arg(
        long = "region",
        value_name = "REGION",
        default_value = "0,0,1,1",
        default_value_if("preset", "touch-top", Some("0.05,0,0.95,0.25")),
        value_parser = parse_region,
        help_heading = "Detection"
    )]
    pub region: RegionOfInterest,

    /// Only flag pages with a marker pixel within this many rows of the region top
    #[arg(
        long = "top-rows",
        value_name = "ROWS",
        default_value_if("preset", "touch-top", Some("6")),
        value_parser = clap::value_parser!(u32).range(1..),
        help_heading = "Detection"
    )]
    pub top_rows: Option<u32>,

    /// JSON file with calibrated detection options, replaces the options above
    #[arg(
        long = "filter-config",
        value_name = "JSON",
        value_parser = check_file_exists,
        help_heading = "Detection"
    )]
    pub filter_config: Option<PathBuf>,
}

impl FilterArgs {
    pub fn to_config(&self) -> Result<FilterConfig> {
        if let Some(path) = &self.filter_config {
            return read_filter_config(path);
        }
        Ok(FilterConfig {
            marker_color: self.marker_color,
            metric: self.metric,
            color_tolerance: self.color_tolerance,
            match_threshold: self.match_threshold,
            min_blob_size: self.min_blob_size,
            region: self.region,
            top_rows: self.top_rows,
        })
    }

    pub fn build_filter(&self) -> Result<RedlineFilter> {
        let config = self.to_config()?;
        RedlineFilter::new(config).map_err(|e| format!("Invalid detection options: {}", e))
    }
}

fn read_filter_config(path: &Path) -> Result<FilterConfig> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open filter config {}: {}", path.display(), e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("Failed to parse filter config {}: {}", path.display(), e))
}

/// Locations of the external tools.
#[derive(Args, Debug, Clone)]
pub struct ToolArgs {
    /// Directory holding plaac.jar and plaac_plot.r
    #[arg(
        long = "tools-dir",
        value_name = "DIR",
        default_value = "plaac",
        help_heading = "Tools"
    )]
    pub tools_dir: PathBuf,

    /// Java executable used to run plaac.jar
    #[arg(
        long = "java",
        value_name = "EXE",
        default_value = "java",
        help_heading = "Tools"
    )]
    pub java: String,

    /// Rscript executable used to run plaac_plot.r
    #[arg(
        long = "rscript",
        value_name = "EXE",
        default_value = "Rscript",
        help_heading = "Tools"
    )]
    pub rscript: String,

    /// pdftoppm executable used to split plots into page images
    #[arg(
        long = "pdftoppm",
        value_name = "EXE",
        default_value = "pdftoppm",
        help_heading = "Tools"
    )]
    pub pdftoppm: String,

    /// Rasterization resolution in DPI [pdftoppm default]
    #[arg(
        long = "resolution",
        value_name = "DPI",
        value_parser = clap::value_parser!(u32).range(1..),
        help_heading = "Tools"
    )]
    pub resolution: Option<u32>,
}

impl ToolArgs {
    pub fn settings(&self) -> ToolSettings {
        ToolSettings {
            tools_dir: self.tools_dir.clone(),
            java: self.java.clone(),
            rscript: self.rscript.clone(),
            pdftoppm: self.pdftoppm.clone(),
            resolution: self.resolution,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// FASTA file or directory of FASTA files
    #[arg(
        short = 'i',
        long = "input",
        value_name = "PATH",
        default_value = "inputs"
    )]
    pub input: PathBuf,

    /// File extension selecting inputs when --input is a directory
    #[arg(long = "extension", value_name = "EXT", default_value = "fasta")]
    pub extension: String,

    /// Directory for PLAAC reports and plots
    #[arg(
        short = 'o',
        long = "output-dir",
        value_name = "DIR",
        default_value = "outputs"
    )]
    pub output_dir: PathBuf,

    /// Directory receiving plots with a detected redline
    #[arg(
        short = 'f',
        long = "filtered-dir",
        value_name = "DIR",
        default_value = "redline_max_detected"
    )]
    pub filtered_dir: PathBuf,

    /// Directory for temporary page images
    #[arg(long = "temp-dir", value_name = "DIR", default_value = "temp_pdf_pages")]
    pub temp_dir: PathBuf,

    /// Write a JSON summary of all verdicts to this file
    #[arg(
        long = "summary",
        value_name = "JSON",
        value_parser = check_prefix_path
    )]
    pub summary: Option<PathBuf>,

    /// Move flagged page images to the filtered directory instead of deleting them
    #[arg(long = "keep-flagged-pages")]
    pub keep_flagged_pages: bool,

    /// Build the filtered PDF from the flagged pages only instead of copying the whole plot
    #[arg(long = "flagged-pages-only")]
    pub flagged_pages_only: bool,

    /// Number of threads used to scan pages
    #[arg(
        short = 't',
        long = "threads",
        value_name = "THREADS",
        default_value = "1",
        value_parser = threads_in_range
    )]
    pub num_threads: usize,

    #[command(flatten)]
    pub tools: ToolArgs,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl RunArgs {
    pub fn preflight(&self) -> Result<()> {
        if !self.input.exists() {
            return Err(format!("Input does not exist: {}", self.input.display()));
        }
        let extension = self.extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err("Input extension cannot be empty".to_string());
        }
        self.filter.build_filter()?;
        check_tools(&self.tools.settings())
    }
}

#[derive(Parser, Debug, Clone)]
#[command(arg_required_else_help(true))]
pub struct ScanArgs {
    /// Page images to scan (PNG or PPM)
    #[arg(
        value_name = "IMAGE",
        num_args = 1..,
        required = true,
        value_parser = check_file_exists
    )]
    pub images: Vec<PathBuf>,

    /// Write verdicts to a JSON file [standard output]
    #[arg(
        short = 'o',
        long = "output",
        value_name = "JSON",
        value_parser = check_prefix_path
    )]
    pub output: Option<PathBuf>,

    /// Number of threads used to scan images
    #[arg(
        short = 't',
        long = "threads",
        value_name = "THREADS",
        default_value = "1",
        value_parser = threads_in_range
    )]
    pub num_threads: usize,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl ScanArgs {
    pub fn preflight(&self) -> Result<()> {
        self.filter.build_filter().map(|_| ())
    }
}

#[derive(Parser, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub tools: ToolArgs,
}

impl CheckArgs {
    pub fn preflight(&self) -> Result<()> {
        if !self.tools.tools_dir.is_dir() {
            log::warn!(
                "Tools directory does not exist: {}",
                self.tools.tools_dir.display()
            );
        }
        Ok(())
    }
}

fn check_tools(settings: &ToolSettings) -> Result<()> {
    for exe in [&settings.java, &settings.rscript, &settings.pdftoppm] {
        if find_executable(exe).is_none() {
            return Err(format!(
                "Executable '{}' not found. Run 'prionscan check' for details",
                exe
            ));
        }
    }
    for file in [settings.jar_path(), settings.plot_script_path()] {
        if !file.is_file() {
            return Err(format!("Required file does not exist: {}", file.display()));
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Color {
    Always,
    Auto,
    Never,
}

impl Color {
    fn apply(self) {
        match self {
            Color::Always => owo_colors::set_override(true),
            Color::Auto => {}
            Color::Never => owo_colors::set_override(false),
        }
    }
}

pub fn init_verbose(args: &Cli) {
    args.color.apply();

    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(format_log)
        .filter_level(filter_level)
        .init();
}

#[inline(always)]
fn level_style(level: Level) -> (&'static str, Style) {
    match level {
        Level::Error => ("ERROR", Style::new().fg::<Red>().bold()),
        Level::Warn => ("WARN", Style::new().fg::<Yellow>()),
        Level::Info => ("INFO", Style::new().fg::<Green>()),
        Level::Debug => ("DEBUG", Style::new().fg::<Blue>()),
        Level::Trace => ("TRACE", Style::new().fg::<Magenta>()),
    }
}

fn format_log(buf: &mut env_logger::fmt::Formatter, record: &log::Record) -> std::io::Result<()> {
    let (label, style) = level_style(record.level());
    let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let painted_label = label.if_supports_color(Stream::Stderr, |t| style.style(t));
    writeln!(buf, "{ts} [{}] - {}", painted_label, record.args())
}

fn check_prefix_path(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(PathBuf::from(s))
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.is_file() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn ensure_unit_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !(0.0..=1.0).contains(&value) {
        Err(format!(
            "The value must be between 0.0 and 1.0, got: {}",
            value
        ))
    } else {
        Ok(value)
    }
}

fn ensure_non_negative_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !value.is_finite() || value < 0.0 {
        Err(format!("The value must be a non-negative number, got: {}", s))
    } else {
        Ok(value)
    }
}

fn parse_color(s: &str) -> Result<Rgb> {
    s.parse()
}

fn parse_metric(s: &str) -> Result<ColorMetric> {
    s.parse()
}

fn parse_region(s: &str) -> Result<RegionOfInterest> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("prionscan").chain(args.iter().copied()))
    }

    fn scan_filter(extra: &[&str]) -> FilterArgs {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("page-1.png");
        std::fs::write(&image, b"").unwrap();
        let mut args = vec!["scan", image.to_str().unwrap()];
        args.extend_from_slice(extra);
        match parse(&args).unwrap().command {
            Command::Scan(scan) => scan.filter,
            _ => unreachable!(),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn help_points_to_dependency_check() {
        use clap::CommandFactory;
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("Run 'prionscan check' to verify them."), "{help}");
        assert!(!help.contains("WARRANTY"));
    }

    #[test]
    fn density_preset_defaults() {
        let config = scan_filter(&[]).to_config().unwrap();
        assert_eq!(config, FilterConfig::density());
    }

    #[test]
    fn touch_top_preset_defaults() {
        let config = scan_filter(&["--preset", "touch-top"]).to_config().unwrap();
        assert_eq!(config, FilterConfig::touch_top());
    }

    #[test]
    fn explicit_options_override_preset() {
        let config = scan_filter(&["--preset", "touch-top", "--tolerance", "200", "--top-rows", "3"])
            .to_config()
            .unwrap();
        assert_eq!(config.color_tolerance, 200.0);
        assert_eq!(config.top_rows, Some(3));
        assert_eq!(config.metric, ColorMetric::Dominance);
    }

    #[test]
    fn invalid_detection_options_are_rejected_at_parse_time() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("page-1.png");
        std::fs::write(&image, b"").unwrap();
        let image = image.to_str().unwrap();
        assert!(parse(&["scan", image, "--threshold", "1.5"]).is_err());
        assert!(parse(&["scan", image, "--tolerance", "-3"]).is_err());
        assert!(parse(&["scan", image, "--marker-color", "red"]).is_err());
        assert!(parse(&["scan", image, "--region", "0.5,0,0.2,1"]).is_err());
        assert!(parse(&["scan", image, "--min-blob-size", "0"]).is_err());
    }

    #[test]
    fn tolerance_beyond_metric_range_fails_build() {
        let filter = scan_filter(&["--tolerance", "300"]);
        let err = filter.build_filter().unwrap_err();
        assert!(err.starts_with("Invalid detection options"), "{err}");
    }

    #[test]
    fn filter_config_file_replaces_flags() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("calibrated.json");
        std::fs::write(
            &config_path,
            r#"{"marker_color": "200,30,30", "color_tolerance": 40, "match_threshold": 0.01}"#,
        )
        .unwrap();
        let filter = scan_filter(&["--filter-config", config_path.to_str().unwrap()]);
        let config = filter.to_config().unwrap();
        assert_eq!(config.marker_color, Rgb::new(200, 30, 30));
        assert_eq!(config.color_tolerance, 40.0);
        assert_eq!(config.match_threshold, 0.01);
    }

    #[test]
    fn broken_filter_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("broken.json");
        std::fs::write(&config_path, "{ not json").unwrap();
        let filter = scan_filter(&["--filter-config", config_path.to_str().unwrap()]);
        let err = filter.to_config().unwrap_err();
        assert!(err.contains("Failed to parse filter config"), "{err}");
    }

    #[test]
    fn run_defaults_follow_directory_layout() {
        let cli = parse(&["run"]).unwrap();
        let Command::Run(args) = cli.command else {
            unreachable!()
        };
        assert_eq!(args.input, PathBuf::from("inputs"));
        assert_eq!(args.output_dir, PathBuf::from("outputs"));
        assert_eq!(args.filtered_dir, PathBuf::from("redline_max_detected"));
        assert_eq!(args.temp_dir, PathBuf::from("temp_pdf_pages"));
        assert_eq!(args.tools.tools_dir, PathBuf::from("plaac"));
        assert_eq!(args.extension, "fasta");
        assert_eq!(args.num_threads, 1);
        assert!(!args.flagged_pages_only);
        assert!(!args.keep_flagged_pages);
    }

    #[test]
    fn flagged_pages_only_flag() {
        let cli = parse(&["run", "--flagged-pages-only"]).unwrap();
        let Command::Run(args) = cli.command else {
            unreachable!()
        };
        assert!(args.flagged_pages_only);
    }

    #[test]
    fn run_preflight_reports_missing_input() {
        let cli = parse(&["run", "--input", "/definitely/not/here"]).unwrap();
        let Command::Run(args) = cli.command else {
            unreachable!()
        };
        let err = args.preflight().unwrap_err();
        assert!(err.starts_with("Input does not exist"), "{err}");
    }

    #[test]
    fn thread_count_must_be_positive() {
        assert!(threads_in_range("0").is_err());
        assert!(threads_in_range("x").is_err());
        assert_eq!(threads_in_range("4"), Ok(4));
    }
}
