//! Configuration file type definitions.
//!
//! Every field is optional so that several files can be layered: a later
//! file only overrides the values it sets.

use crate::constants::{
    DEFAULT_CONFIDENCE, DEFAULT_LAYER_NAME, DEFAULT_MAX_DOWNLOADS, DEFAULT_MAX_UTILIZATION,
    DEFAULT_NMS_OVERLAP, DEFAULT_ZOOM,
};
use crate::geo::{GeoBounds, GeometryType};
use crate::logging::LogLevel;
use crate::output::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Image source settings.
    pub input: InputConfig,
    /// Window and model settings.
    pub processing: ProcessingConfig,
    /// Thresholds.
    pub detection: DetectionConfig,
    /// Output settings.
    pub output: OutputConfig,
    /// Log file settings.
    pub logging: LoggingConfig,
}

/// `[input]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Local georeferenced image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    /// Tile service URL template with `{z}`, `{x}`, `{y}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    /// Tile zoom level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<u8>,
    /// Maximum concurrent tile downloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_downloads: Option<usize>,
    /// Region of interest as `[west, south, east, north]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<GeoBounds>,
}

/// `[processing]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// ONNX model file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<PathBuf>,
    /// Labels file, one label per line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<PathBuf>,
    /// Window size: one value (square) or width and height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<Vec<u32>>,
    /// Step size: one value (square) or width and height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_size: Option<Vec<u32>>,
    /// Scan coarser pyramid levels too.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pyramid: Option<bool>,
    /// Run inference on the CPU.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<bool>,
    /// Fraction of GPU capacity to use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_utilization: Option<f32>,
    /// Process one window at a time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<bool>,
}

/// `[detection]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    /// Minimum confidence of a kept detection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Enable non-maximum suppression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nms: Option<bool>,
    /// IoU above which the weaker of two detections is suppressed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlap: Option<f32>,
}

/// `[output]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Output file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Output format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    /// Layer name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    /// Feature geometry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryType>,
    /// Attach producer attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer_info: Option<bool>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Minimum level written to the log file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
}

impl Config {
    /// Layer `other` on top of `self`; values set in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            input: InputConfig {
                image: other.input.image.or(self.input.image),
                service_url: other.input.service_url.or(self.input.service_url),
                zoom: other.input.zoom.or(self.input.zoom),
                max_downloads: other.input.max_downloads.or(self.input.max_downloads),
                bbox: other.input.bbox.or(self.input.bbox),
            },
            processing: ProcessingConfig {
                model: other.processing.model.or(self.processing.model),
                labels: other.processing.labels.or(self.processing.labels),
                window_size: other.processing.window_size.or(self.processing.window_size),
                step_size: other.processing.step_size.or(self.processing.step_size),
                pyramid: other.processing.pyramid.or(self.processing.pyramid),
                cpu: other.processing.cpu.or(self.processing.cpu),
                max_utilization: other
                    .processing
                    .max_utilization
                    .or(self.processing.max_utilization),
                serial: other.processing.serial.or(self.processing.serial),
            },
            detection: DetectionConfig {
                confidence: other.detection.confidence.or(self.detection.confidence),
                nms: other.detection.nms.or(self.detection.nms),
                overlap: other.detection.overlap.or(self.detection.overlap),
            },
            output: OutputConfig {
                path: other.output.path.or(self.output.path),
                format: other.output.format.or(self.output.format),
                layer: other.output.layer.or(self.output.layer),
                geometry: other.output.geometry.or(self.output.geometry),
                producer_info: other.output.producer_info.or(self.output.producer_info),
            },
            logging: LoggingConfig {
                file: other.logging.file.or(self.logging.file),
                level: other.logging.level.or(self.logging.level),
            },
        }
    }

    /// Configuration populated with every default, written by `config init`.
    pub fn template() -> Self {
        Self {
            input: InputConfig {
                image: None,
                service_url: None,
                zoom: Some(DEFAULT_ZOOM),
                max_downloads: Some(DEFAULT_MAX_DOWNLOADS),
                bbox: None,
            },
            processing: ProcessingConfig {
                model: None,
                labels: None,
                // Unset so the model's own input size applies.
                window_size: None,
                step_size: None,
                pyramid: Some(false),
                cpu: Some(false),
                max_utilization: Some(DEFAULT_MAX_UTILIZATION),
                serial: Some(false),
            },
            detection: DetectionConfig {
                confidence: Some(DEFAULT_CONFIDENCE),
                nms: Some(false),
                overlap: Some(DEFAULT_NMS_OVERLAP),
            },
            output: OutputConfig {
                path: None,
                format: Some(OutputFormat::default()),
                layer: Some(DEFAULT_LAYER_NAME.to_string()),
                geometry: Some(GeometryType::default()),
                producer_info: Some(false),
            },
            logging: LoggingConfig {
                file: None,
                level: Some(LogLevel::default()),
            },
        }
    }
}
