//! Resolution of command-line arguments and config files into [`Settings`].
//!
//! Precedence: command line (and `OSN_*` environment variables) over config
//! files over built-in defaults.

use crate::cli::RunArgs;
use crate::cli::validators::parse_log_spec;
use crate::config::{Action, Config, DispatchMode, InputSpec, RunConfig, Settings};
use crate::constants::{
    DEFAULT_CONFIDENCE, DEFAULT_LAYER_NAME, DEFAULT_MAX_DOWNLOADS, DEFAULT_MAX_UTILIZATION,
    DEFAULT_NMS_OVERLAP, DEFAULT_WINDOW_SIZE, DEFAULT_ZOOM,
};
use crate::error::{Error, Result};
use crate::geo::{GeoBounds, GeometryType, Size};
use crate::inference::InferenceDevice;
use crate::logging::{LogFile, LogOptions};
use std::path::PathBuf;

/// Settings plus warnings about ignored options, to be logged once logging
/// is up.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The resolved settings.
    pub settings: Settings,
    /// Options that were overridden or ignored.
    pub warnings: Vec<String>,
}

/// Combine `args` with the layered file configuration.
pub fn resolve_settings(action: Action, args: &RunArgs, file: &Config) -> Result<Resolved> {
    let mut warnings = Vec::new();

    let bbox = match &args.bbox {
        Some(values) => Some(parse_bbox(values)?),
        None => file.input.bbox,
    };

    let input = resolve_input(args, file)?;
    if matches!(input, InputSpec::TileService { .. }) && bbox.is_none() {
        return Err(Error::config("a tile service requires --bbox"));
    }

    let model = args
        .model
        .clone()
        .or_else(|| file.processing.model.clone())
        .ok_or_else(|| {
            Error::config("no model specified (use --model or set processing.model in config)")
        })?;
    let labels = args
        .labels
        .clone()
        .or_else(|| file.processing.labels.clone())
        .unwrap_or_else(|| model.with_extension("txt"));

    let window_size = match args
        .window_size
        .clone()
        .or_else(|| file.processing.window_size.clone())
    {
        Some(dims) => Some(parse_size(&dims, "window size")?),
        None => None,
    };

    let mut step_size = match args
        .step_size
        .clone()
        .or_else(|| file.processing.step_size.clone())
    {
        Some(dims) => Some(parse_size(&dims, "step size")?),
        None => None,
    };

    let mut pyramid = args.pyramid || file.processing.pyramid.unwrap_or(false);

    let overlap = file.detection.overlap.unwrap_or(DEFAULT_NMS_OVERLAP);
    let mut nms_overlap = match args.nms {
        Some(Some(value)) => Some(value),
        Some(None) => Some(overlap),
        None if file.detection.nms.unwrap_or(false) => Some(overlap),
        None => None,
    };

    let mut geometry_type = args
        .geometry
        .or(file.output.geometry)
        .unwrap_or_default();

    if action == Action::Landcover {
        if step_size.is_some_and(|s| Some(s) != window_size) {
            warnings.push("landcover ignores the step size; windows do not overlap".to_string());
        }
        if pyramid {
            warnings.push("landcover ignores --pyramid".to_string());
        }
        if nms_overlap.is_some() {
            warnings.push("landcover ignores non-maximum suppression".to_string());
        }
        if geometry_type != GeometryType::Polygon {
            warnings.push("landcover always writes polygon geometry".to_string());
        }
        // The step follows the window once the model has fixed its size.
        step_size = None;
        pyramid = false;
        nms_overlap = None;
        geometry_type = GeometryType::Polygon;
    }

    let dispatch = if args.serial || file.processing.serial.unwrap_or(false) {
        DispatchMode::Serial
    } else {
        DispatchMode::Concurrent
    };
    let device = if args.cpu || file.processing.cpu.unwrap_or(false) {
        InferenceDevice::Cpu
    } else {
        InferenceDevice::Gpu
    };

    let format = args.format.or(file.output.format).unwrap_or_default();
    let layer = args
        .output_layer
        .clone()
        .or_else(|| file.output.layer.clone())
        .unwrap_or_else(|| DEFAULT_LAYER_NAME.to_string());
    let output = args
        .output
        .clone()
        .or_else(|| file.output.path.clone())
        .unwrap_or_else(|| PathBuf::from(format!("{layer}.{}", format.extension())));

    let log_file = match &args.log {
        Some(values) => Some(parse_log_spec(values).map_err(Error::config)?),
        None => file.logging.file.clone().map(|path| LogFile {
            path,
            level: file.logging.level.unwrap_or_default(),
        }),
    };
    let log = LogOptions {
        verbose: args.verbose,
        quiet: args.quiet,
        file: log_file,
    };

    let run = RunConfig {
        bbox,
        window_size: Size::square(DEFAULT_WINDOW_SIZE),
        step_size,
        pyramid,
        confidence: args
            .confidence
            .or(file.detection.confidence)
            .unwrap_or(DEFAULT_CONFIDENCE),
        nms_overlap,
        dispatch,
        max_utilization: args
            .max_utilization
            .or(file.processing.max_utilization)
            .unwrap_or(DEFAULT_MAX_UTILIZATION),
        max_downloads: args
            .num_downloads
            .or(file.input.max_downloads)
            .unwrap_or(DEFAULT_MAX_DOWNLOADS),
        device,
        geometry_type,
        producer_info: args.producer_info || file.output.producer_info.unwrap_or(false),
        progress: !(args.quiet || args.no_progress),
    };

    Ok(Resolved {
        settings: Settings {
            action,
            input,
            model,
            labels,
            output,
            format,
            layer,
            log,
            window_size,
            run,
        },
        warnings,
    })
}

/// Command-line input options replace the file's input choice as a whole,
/// so `--image` overrides a configured tile service and vice versa.
fn resolve_input(args: &RunArgs, file: &Config) -> Result<InputSpec> {
    let (image, service_url) = if args.image.is_some() || args.service_url.is_some() {
        (args.image.clone(), args.service_url.clone())
    } else {
        (file.input.image.clone(), file.input.service_url.clone())
    };

    match (image, service_url) {
        (Some(path), None) => Ok(InputSpec::Image(path)),
        (None, Some(url)) => Ok(InputSpec::TileService {
            url,
            zoom: args.zoom.or(file.input.zoom).unwrap_or(DEFAULT_ZOOM),
        }),
        (Some(_), Some(_)) => Err(Error::config(
            "specify either an image or a tile service, not both",
        )),
        (None, None) => Err(Error::config(
            "no input specified (use --image or --service-url)",
        )),
    }
}

fn parse_bbox(values: &[f64]) -> Result<GeoBounds> {
    match values {
        [west, south, east, north] => {
            GeoBounds::new(*west, *south, *east, *north).map_err(Error::config)
        }
        _ => Err(Error::config("bounding box takes four values")),
    }
}

fn parse_size(dims: &[u32], name: &str) -> Result<Size> {
    Size::from_dims(dims)
        .ok_or_else(|| Error::config(format!("{name} takes one or two values, got {}", dims.len())))
}
