//! CSV output format writer.

use crate::error::Result;
use crate::geo::Geometry;
use crate::output::writer::write_atomically;
use crate::output::{Attributes, FeatureSink};
use std::path::{Path, PathBuf};
use tracing::debug;

const GEOMETRY_COLUMN: &str = "WKT";

/// Writes one CSV row per feature, geometry as WKT in the first column.
///
/// The header is taken from the first feature's attribute columns; an empty
/// collection gets the base header.
pub struct CsvSink {
    output_path: PathBuf,
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl CsvSink {
    /// Create a sink writing to `output_path`.
    pub fn new(output_path: &Path) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            header: None,
            rows: Vec::new(),
        }
    }

    fn base_header() -> Vec<String> {
        use crate::constants::attributes::{DATE, TOP_CATEGORY, TOP_FIVE, TOP_SCORE};
        [GEOMETRY_COLUMN, TOP_CATEGORY, TOP_SCORE, DATE, TOP_FIVE]
            .map(String::from)
            .to_vec()
    }
}

impl FeatureSink for CsvSink {
    fn add(&mut self, geometry: &Geometry, attributes: &Attributes) -> Result<()> {
        let columns = attributes.columns();
        if self.header.is_none() {
            let mut header = vec![GEOMETRY_COLUMN.to_string()];
            header.extend(columns.iter().map(|(name, _)| (*name).to_string()));
            self.header = Some(header);
        }

        let mut row = vec![geometry.to_wkt()];
        row.extend(columns.into_iter().map(|(_, value)| value));
        self.rows.push(row);
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let header = self.header.clone().unwrap_or_else(Self::base_header);
        let rows = &self.rows;

        write_atomically(&self.output_path, |writer| {
            let mut csv = ::csv::Writer::from_writer(writer);
            csv.write_record(&header)?;
            for row in rows {
                csv.write_record(row)?;
            }
            csv.flush()?;
            Ok(())
        })?;

        debug!(
            "Wrote {} rows to {}",
            self.rows.len(),
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
    use crate::inference::Prediction;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn test_csv_sink_writes_wkt_and_attributes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("detects.csv");
        let mut sink = CsvSink::new(&path);

        let attributes = Attributes {
            label: "storage_tank".to_string(),
            confidence: 0.5,
            date: Utc::now(),
            top_predictions: vec![Prediction::new("storage_tank", 0.5)],
            producer: None,
        };
        let square = Geometry::polygon([
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(1.0, 0.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(0.0, 1.0),
        ]);
        sink.add(&square, &attributes).unwrap();
        sink.finalize().unwrap();

        let mut reader = ::csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "WKT");
        assert_eq!(&headers[1], "top_cat");

        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))");
        assert_eq!(&record[1], "storage_tank");
        assert_eq!(&record[2], "0.5");
        assert!(record[4].contains("\"label\":\"storage_tank\""));
    }

    #[test]
    fn test_empty_csv_has_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let mut sink = CsvSink::new(&path);
        sink.finalize().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), "WKT,top_cat,top_score,date,top_five");
    }
}
