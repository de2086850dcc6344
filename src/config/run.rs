//! Resolved run settings.

use crate::constants::{
    DEFAULT_CONFIDENCE, DEFAULT_MAX_DOWNLOADS, DEFAULT_MAX_UTILIZATION, DEFAULT_WINDOW_SIZE,
};
use crate::geo::{GeoBounds, GeometryType, Size};
use crate::inference::InferenceDevice;
use crate::logging::LogOptions;
use crate::output::OutputFormat;
use std::path::PathBuf;

/// What a run does with the windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Action {
    /// Sliding-window object detection.
    #[default]
    Detect,
    /// Classify every non-overlapping tile once.
    Landcover,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detect => write!(f, "detect"),
            Self::Landcover => write!(f, "landcover"),
        }
    }
}

/// How windows are dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// One window at a time, in plan order.
    Serial,
    /// Bounded worker pool.
    #[default]
    Concurrent,
}

/// Everything the orchestrator needs besides its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Region of interest; `None` processes the whole image.
    pub bbox: Option<GeoBounds>,
    /// Base window size in source pixels.
    pub window_size: Size,
    /// Window step; `None` uses the default step.
    pub step_size: Option<Size>,
    /// Scan coarser pyramid levels.
    pub pyramid: bool,
    /// Minimum confidence of a kept detection.
    pub confidence: f32,
    /// NMS overlap threshold; `None` disables suppression.
    pub nms_overlap: Option<f32>,
    /// Serial or concurrent dispatch.
    pub dispatch: DispatchMode,
    /// Fraction of GPU capacity to use.
    pub max_utilization: f32,
    /// Maximum concurrent tile downloads.
    pub max_downloads: usize,
    /// Inference device, used for pool sizing.
    pub device: InferenceDevice,
    /// Geometry written for every feature.
    pub geometry_type: GeometryType,
    /// Attach producer attributes.
    pub producer_info: bool,
    /// Show a progress bar.
    pub progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            bbox: None,
            window_size: Size::square(DEFAULT_WINDOW_SIZE),
            step_size: None,
            pyramid: false,
            confidence: DEFAULT_CONFIDENCE,
            nms_overlap: None,
            dispatch: DispatchMode::default(),
            max_utilization: DEFAULT_MAX_UTILIZATION,
            max_downloads: DEFAULT_MAX_DOWNLOADS,
            device: InferenceDevice::default(),
            geometry_type: GeometryType::default(),
            producer_info: false,
            progress: false,
        }
    }
}

/// Where pixels come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    /// Local georeferenced image file.
    Image(PathBuf),
    /// XYZ tile service.
    TileService {
        /// URL template.
        url: String,
        /// Zoom level.
        zoom: u8,
    },
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Selected action.
    pub action: Action,
    /// Image source.
    pub input: InputSpec,
    /// ONNX model.
    pub model: PathBuf,
    /// Labels file.
    pub labels: PathBuf,
    /// Output file.
    pub output: PathBuf,
    /// Output format.
    pub format: OutputFormat,
    /// Output layer name.
    pub layer: String,
    /// Logging setup.
    pub log: LogOptions,
    /// Window size from the command line or config file.
    pub window_size: Option<Size>,
    /// Orchestrator configuration; the window size is fixed by
    /// [`Settings::run_config`].
    pub run: RunConfig,
}

impl Settings {
    /// Orchestrator configuration once the model is loaded.
    ///
    /// The window size comes from the command line or config file, else the
    /// model's fixed input size, else the built-in default. Landcover steps
    /// by whole windows.
    pub fn run_config(&self, model_input: Option<Size>) -> RunConfig {
        let window_size = self
            .window_size
            .or(model_input)
            .unwrap_or(Size::square(DEFAULT_WINDOW_SIZE));
        let mut run = self.run.clone();
        run.window_size = window_size;
        if self.action == Action::Landcover {
            run.step_size = Some(window_size);
        }
        run
    }
}
