//! CLI argument definitions.

use super::validators::{parse_confidence, parse_overlap, parse_utilization, parse_zoom};
use crate::geo::GeometryType;
use crate::output::OutputFormat;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Sliding-window object detection over georeferenced imagery.
#[derive(Debug, Parser)]
#[command(name = "openskynet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Detect objects with overlapping sliding windows.
    Detect(RunArgs),
    /// Classify every window of a non-overlapping grid.
    Landcover(RunArgs),
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create a configuration file populated with defaults.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Arguments shared by `detect` and `landcover`.
#[derive(Debug, Default, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Local georeferenced image.
    #[arg(short, long, env = "OSN_IMAGE", conflicts_with = "service_url")]
    pub image: Option<PathBuf>,

    /// Tile service URL template containing {z}, {x} and {y}.
    #[arg(long, env = "OSN_SERVICE_URL")]
    pub service_url: Option<String>,

    /// Tile zoom level.
    #[arg(short, long, env = "OSN_ZOOM", value_parser = parse_zoom)]
    pub zoom: Option<u8>,

    /// Maximum concurrent tile downloads.
    #[arg(long, env = "OSN_NUM_DOWNLOADS")]
    pub num_downloads: Option<usize>,

    /// Region of interest in WGS84 degrees.
    #[arg(
        long,
        num_args = 4,
        value_names = ["WEST", "SOUTH", "EAST", "NORTH"],
        allow_negative_numbers = true
    )]
    pub bbox: Option<Vec<f64>>,

    /// ONNX model file.
    #[arg(short, long, env = "OSN_MODEL")]
    pub model: Option<PathBuf>,

    /// Labels file, one label per line (default: model path with .txt).
    #[arg(long, env = "OSN_LABELS")]
    pub labels: Option<PathBuf>,

    /// Window size: one value for a square, or width and height.
    #[arg(long, num_args = 1..=2, value_names = ["WIDTH", "HEIGHT"])]
    pub window_size: Option<Vec<u32>>,

    /// Step between windows: one value for both axes, or x and y.
    #[arg(long, num_args = 1..=2, value_names = ["X", "Y"])]
    pub step_size: Option<Vec<u32>>,

    /// Also scan coarser pyramid levels.
    #[arg(long)]
    pub pyramid: bool,

    /// Minimum confidence of a reported detection (0.0-1.0).
    #[arg(short = 't', long, env = "OSN_CONFIDENCE", value_parser = parse_confidence)]
    pub confidence: Option<f32>,

    /// Enable non-maximum suppression, optionally with an overlap threshold.
    #[arg(long, num_args = 0..=1, value_name = "OVERLAP", value_parser = parse_overlap)]
    pub nms: Option<Option<f32>>,

    /// Process windows one at a time.
    #[arg(long)]
    pub serial: bool,

    /// Run inference on the CPU.
    #[arg(long)]
    pub cpu: bool,

    /// Fraction of GPU capacity to use (0.05-1.0).
    #[arg(long, env = "OSN_MAX_UTILIZATION", value_parser = parse_utilization)]
    pub max_utilization: Option<f32>,

    /// Output file.
    #[arg(short, long, env = "OSN_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, env = "OSN_FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output layer name.
    #[arg(long, env = "OSN_OUTPUT_LAYER")]
    pub output_layer: Option<String>,

    /// Feature geometry.
    #[arg(long = "type", value_enum)]
    pub geometry: Option<GeometryType>,

    /// Attach user, application and version attributes.
    #[arg(long)]
    pub producer_info: bool,

    /// Write a log file: `--log [LEVEL] PATH` (default level: debug).
    #[arg(long, num_args = 1..=2, value_names = ["LEVEL", "PATH"])]
    pub log: Option<Vec<String>>,

    /// Only warnings on the console (nothing when --log is set).
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase console verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file; may be repeated, later files win.
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Vec<PathBuf>,

    /// Disable the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}
