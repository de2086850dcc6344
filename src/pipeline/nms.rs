//! Per-label non-maximum suppression.

use crate::output::GeoFeature;
use std::collections::BTreeMap;

/// Greedy non-maximum suppression over window footprints.
///
/// Features are grouped by label. Within a group the highest-confidence
/// feature is kept and every remaining feature whose footprint IoU with it
/// exceeds `overlap_threshold` is dropped, until the group is exhausted.
/// Equal confidences keep their input order. Output is grouped by label in
/// lexical order, descending confidence within a label.
pub fn suppress(features: Vec<GeoFeature>, overlap_threshold: f32) -> Vec<GeoFeature> {
    let threshold = f64::from(overlap_threshold);

    let mut groups: BTreeMap<String, Vec<GeoFeature>> = BTreeMap::new();
    for feature in features {
        groups
            .entry(feature.attributes.label.clone())
            .or_default()
            .push(feature);
    }

    let mut kept = Vec::new();
    for group in groups.into_values() {
        kept.extend(suppress_group(group, threshold));
    }
    kept
}

fn suppress_group(mut candidates: Vec<GeoFeature>, threshold: f64) -> Vec<GeoFeature> {
    candidates.sort_by(|a, b| b.attributes.confidence.total_cmp(&a.attributes.confidence));
    if candidates.len() <= 1 {
        return candidates;
    }

    let mut kept: Vec<GeoFeature> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let overlaps = kept
            .iter()
            .any(|k| k.footprint.iou(&candidate.footprint) > threshold);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::geo::{GeoPoint, Geometry, PixelRect};
    use crate::output::Attributes;
    use chrono::Utc;

    fn feature(label: &str, confidence: f32, rect: PixelRect) -> GeoFeature {
        GeoFeature {
            geometry: Geometry::Point(GeoPoint::new(0.0, 0.0)),
            footprint: rect,
            attributes: Attributes {
                label: label.to_string(),
                confidence,
                date: Utc::now(),
                top_predictions: Vec::new(),
                producer: None,
            },
        }
    }

    fn confidences(features: &[GeoFeature]) -> Vec<f32> {
        features.iter().map(|f| f.attributes.confidence).collect()
    }

    #[test]
    fn test_lower_overlapping_detection_removed() {
        // 100x100 windows offset by 25 px: intersection 7500, union 12500, IoU 0.6
        let a = feature("plane", 0.9, PixelRect::new(0, 0, 100, 100));
        let b = feature("plane", 0.6, PixelRect::new(25, 0, 100, 100));
        assert!((a.footprint.iou(&b.footprint) - 0.6).abs() < 1e-12);

        let kept = suppress(vec![b, a], 0.5);
        assert_eq!(confidences(&kept), vec![0.9]);
    }

    #[test]
    fn test_overlap_at_threshold_is_kept() {
        let a = feature("plane", 0.9, PixelRect::new(0, 0, 100, 100));
        let b = feature("plane", 0.6, PixelRect::new(25, 0, 100, 100));
        let kept = suppress(vec![a, b], 0.6);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_labels_suppressed_independently() {
        let rect = PixelRect::new(0, 0, 10, 10);
        let kept = suppress(
            vec![
                feature("ship", 0.8, rect),
                feature("plane", 0.7, rect),
                feature("ship", 0.95, rect),
            ],
            0.3,
        );
        let labels: Vec<&str> = kept.iter().map(|f| f.attributes.label.as_str()).collect();
        assert_eq!(labels, vec!["plane", "ship"]);
        assert_eq!(confidences(&kept), vec![0.7, 0.95]);
    }

    #[test]
    fn test_single_member_group_is_identity() {
        let only = feature("tank", 0.42, PixelRect::new(5, 5, 3, 3));
        assert_eq!(suppress(vec![only.clone()], 0.1), vec![only]);
        assert!(suppress(Vec::new(), 0.5).is_empty());
    }

    #[test]
    fn test_idempotent_and_keeps_best() {
        let features: Vec<GeoFeature> = (0..12)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let confidence = 0.5 + (i % 5) as f32 * 0.1;
                feature(
                    if i % 2 == 0 { "car" } else { "truck" },
                    confidence,
                    PixelRect::new(i * 7, (i % 3) * 5, 20, 20),
                )
            })
            .collect();

        let once = suppress(features.clone(), 0.3);
        let twice = suppress(once.clone(), 0.3);
        assert_eq!(once, twice);
        assert!(once.len() <= features.len());

        for label in ["car", "truck"] {
            let best = features
                .iter()
                .filter(|f| f.attributes.label == label)
                .map(|f| f.attributes.confidence)
                .fold(f32::MIN, f32::max);
            assert!(
                once.iter()
                    .any(|f| f.attributes.label == label && f.attributes.confidence == best)
            );
        }
    }

    #[test]
    fn test_ties_keep_input_order() {
        let first = feature("boat", 0.8, PixelRect::new(0, 0, 10, 10));
        let second = feature("boat", 0.8, PixelRect::new(1, 0, 10, 10));
        let kept = suppress(vec![first.clone(), second], 0.5);
        assert_eq!(kept, vec![first]);
    }
}
