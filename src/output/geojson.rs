//! GeoJSON output format writer.

use crate::error::Result;
use crate::geo::Geometry;
use crate::output::writer::write_atomically;
use crate::output::{Attributes, FeatureSink};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes features as a single GeoJSON `FeatureCollection`.
///
/// Features are buffered and the file is written on [`FeatureSink::finalize`].
pub struct GeoJsonSink {
    output_path: PathBuf,
    layer: String,
    features: Vec<Value>,
}

impl GeoJsonSink {
    /// Create a sink writing to `output_path`; `layer` becomes the
    /// collection's `name` member.
    pub fn new(output_path: &Path, layer: &str) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            layer: layer.to_string(),
            features: Vec::new(),
        }
    }
}

impl FeatureSink for GeoJsonSink {
    fn add(&mut self, geometry: &Geometry, attributes: &Attributes) -> Result<()> {
        self.features.push(json!({
            "type": "Feature",
            "geometry": geometry.to_geojson(),
            "properties": attributes.to_properties(),
        }));
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let collection = json!({
            "type": "FeatureCollection",
            "name": self.layer,
            "features": self.features,
        });

        write_atomically(&self.output_path, |writer| {
            serde_json::to_writer_pretty(writer, &collection)?;
            Ok(())
        })?;

        debug!(
            "Wrote {} features to {}",
            self.features.len(),
            self.output_path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn test_geojson_sink_writes_collection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("detects.geojson");
        let mut sink = GeoJsonSink::new(&path, "skynetdetects");

        let attributes = Attributes {
            label: "ship".to_string(),
            confidence: 0.75,
            date: Utc::now(),
            top_predictions: Vec::new(),
            producer: None,
        };
        sink.add(&Geometry::Point(GeoPoint::new(10.0, 20.0)), &attributes)
            .unwrap();
        sink.finalize().unwrap();

        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["name"], "skynetdetects");
        assert_eq!(value["features"][0]["properties"]["top_cat"], "ship");
        assert_eq!(value["features"][0]["geometry"]["coordinates"][0], 10.0);
    }

    #[test]
    fn test_empty_collection_is_valid_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.geojson");
        let mut sink = GeoJsonSink::new(&path, "layer");
        sink.finalize().unwrap();

        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["features"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn test_unwritable_destination() {
        let mut sink = GeoJsonSink::new(Path::new("/nonexistent/dir/out.geojson"), "layer");
        assert!(sink.finalize().is_err());
    }
}
