//! Feature sinks and run progress.

mod csv;
mod geojson;
mod progress;
mod types;
mod writer;

pub use csv::CsvSink;
pub use geojson::GeoJsonSink;
pub use progress::{abandon_progress, create_window_progress, finish_progress, inc_progress};
pub use types::{Attributes, GeoFeature, OutputFormat, ProducerInfo};
pub use writer::FeatureSink;

use std::path::Path;

/// Create the sink for `format` writing to `path`.
pub fn create_sink(format: OutputFormat, path: &Path, layer: &str) -> Box<dyn FeatureSink> {
    match format {
        OutputFormat::Geojson => Box::new(GeoJsonSink::new(path, layer)),
        OutputFormat::Csv => Box::new(CsvSink::new(path)),
    }
}
