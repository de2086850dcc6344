//! Conversion of window detections into geo-referenced features.

use crate::geo::{GeoTransform, Geometry, GeometryType};
use crate::inference::Prediction;
use crate::output::{Attributes, GeoFeature, ProducerInfo};
use crate::window::Window;
use chrono::{DateTime, Utc};

/// A window whose top prediction passed the confidence threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// The window that was classified.
    pub window: Window,
    /// Top label.
    pub label: String,
    /// Confidence of the top label.
    pub confidence: f32,
    /// Ranked predictions, best first.
    pub predictions: Vec<Prediction>,
}

/// Attributes shared by every feature of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunAttributes {
    /// Run start time.
    pub date: DateTime<Utc>,
    /// Producer metadata, when enabled.
    pub producer: Option<ProducerInfo>,
}

impl RunAttributes {
    /// Attributes for a run starting now.
    pub fn now(producer_info: bool) -> Self {
        Self {
            date: Utc::now(),
            producer: producer_info.then(ProducerInfo::current),
        }
    }
}

/// Map a detection through the source transform.
///
/// Points sit at the window center. Polygons map each corner of the window
/// on its own, so non-affine transforms give the true footprint.
pub fn aggregate(
    detection: &Detection,
    transform: &GeoTransform,
    geometry_type: GeometryType,
    run: &RunAttributes,
) -> GeoFeature {
    let rect = detection.window.rect;
    let geometry = match geometry_type {
        GeometryType::Point => Geometry::Point(transform.pixel_to_geo(rect.center())),
        GeometryType::Polygon => Geometry::polygon(
            rect.corners()
                .into_iter()
                .map(|corner| transform.pixel_to_geo(corner)),
        ),
    };

    GeoFeature {
        geometry,
        footprint: rect,
        attributes: Attributes {
            label: detection.label.clone(),
            confidence: detection.confidence,
            date: run.date,
            top_predictions: detection.predictions.clone(),
            producer: run.producer.clone(),
        },
    }
}
