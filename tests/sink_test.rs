//! Output sink integration tests.

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use openskynet::geo::{GeoPoint, Geometry};
use openskynet::inference::Prediction;
use openskynet::output::{Attributes, OutputFormat, ProducerInfo, create_sink};
use tempfile::TempDir;

fn attributes(label: &str, confidence: f32, producer: Option<ProducerInfo>) -> Attributes {
    Attributes {
        label: label.to_string(),
        confidence,
        date: Utc.with_ymd_and_hms(2024, 3, 9, 8, 15, 0).unwrap(),
        top_predictions: vec![Prediction::new(label, confidence)],
        producer,
    }
}

fn square() -> Geometry {
    Geometry::polygon([
        GeoPoint::new(10.0, 50.0),
        GeoPoint::new(11.0, 50.0),
        GeoPoint::new(11.0, 49.0),
        GeoPoint::new(10.0, 49.0),
    ])
}

#[test]
fn test_geojson_feature_collection() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("detections.geojson");

    let mut sink = create_sink(OutputFormat::Geojson, &path, "harbor");
    sink.add(&Geometry::Point(GeoPoint::new(10.5, 49.5)), &attributes("ship", 0.99, None))
        .unwrap();
    sink.add(&square(), &attributes("dock", 0.97, None)).unwrap();
    sink.finalize().unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["type"], "FeatureCollection");
    assert_eq!(json["name"], "harbor");

    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0]["geometry"]["type"], "Point");
    assert_eq!(features[0]["properties"]["top_cat"], "ship");
    assert_eq!(features[0]["properties"]["date"], "2024-03-09T08:15:00Z");
    assert_eq!(features[1]["geometry"]["type"], "Polygon");
    assert_eq!(
        features[1]["geometry"]["coordinates"][0]
            .as_array()
            .unwrap()
            .len(),
        5
    );
}

#[test]
fn test_csv_rows_with_producer_info() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("detections.csv");
    let producer = ProducerInfo {
        user_name: "analyst".to_string(),
        app: "OpenSkyNet".to_string(),
        app_version: "0.4.0".to_string(),
    };

    let mut sink = create_sink(OutputFormat::Csv, &path, "ignored");
    sink.add(
        &Geometry::Point(GeoPoint::new(10.5, 49.5)),
        &attributes("ship", 0.5, Some(producer)),
    )
    .unwrap();
    sink.finalize().unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "WKT");
    assert!(headers.iter().any(|h| h == "user_name"));
    assert!(headers.iter().any(|h| h == "app_ver"));

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][0], "POINT (10.5 49.5)");
    assert_eq!(&rows[0][1], "ship");
}

#[test]
fn test_empty_collections_are_valid_files() {
    let dir = TempDir::new().unwrap();

    let geojson = dir.path().join("empty.geojson");
    let mut sink = create_sink(OutputFormat::Geojson, &geojson, "empty");
    sink.finalize().unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&geojson).unwrap()).unwrap();
    assert!(json["features"].as_array().unwrap().is_empty());

    let csv_path = dir.path().join("empty.csv");
    let mut sink = create_sink(OutputFormat::Csv, &csv_path, "empty");
    sink.finalize().unwrap();
    let contents = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(contents.trim_end(), "WKT,top_cat,top_score,date,top_five");
}

#[test]
fn test_failed_write_leaves_no_artifact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("out.geojson");

    let mut sink = create_sink(OutputFormat::Geojson, &path, "layer");
    sink.add(&square(), &attributes("dock", 0.97, None)).unwrap();
    assert!(sink.finalize().is_err());
    assert!(!path.exists());
    assert!(!dir.path().join("missing").exists());
}
