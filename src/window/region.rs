//! Region of interest resolution.

use crate::error::{Error, Result};
use crate::geo::{GeoBounds, GeoTransform, PixelRect, Reprojection};

/// Resolve a WGS84 region of interest to the pixel region it covers within
/// `extent`.
///
/// Without a bounding box the whole extent is the region. The box corners are
/// projected into `spatial_reference` and mapped individually through the
/// inverse transform, so rotated, projected or non-affine rasters produce
/// the enclosing pixel rectangle.
pub fn region_of_interest(
    extent: PixelRect,
    bbox: Option<&GeoBounds>,
    transform: &GeoTransform,
    spatial_reference: &str,
) -> Result<PixelRect> {
    let Some(bbox) = bbox else {
        return Ok(extent);
    };
    let reprojection =
        Reprojection::from_wgs84(spatial_reference).map_err(|reason| Error::SourceAccess {
            reason: format!("cannot map the bounding box onto the image: {reason}"),
        })?;

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for corner in bbox.corners() {
        let corner = reprojection
            .project(corner)
            .map_err(|reason| Error::SourceAccess { reason })?;
        let p = transform
            .geo_to_pixel(corner)
            .ok_or_else(|| Error::SourceAccess {
                reason: "image transform is not invertible".to_string(),
            })?;
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    #[allow(clippy::cast_precision_loss)]
    let clamp_x = |v: f64| v.clamp(extent.x as f64, extent.right() as f64);
    #[allow(clippy::cast_precision_loss)]
    let clamp_y = |v: f64| v.clamp(extent.y as f64, extent.bottom() as f64);

    #[allow(clippy::cast_possible_truncation)]
    let (x0, y0, x1, y1) = (
        clamp_x(min_x.floor()) as i64,
        clamp_y(min_y.floor()) as i64,
        clamp_x(max_x.ceil()) as i64,
        clamp_y(max_y.ceil()) as i64,
    );

    if x1 <= x0 || y1 <= y0 {
        return Err(Error::EmptyRegion {
            region: bbox.to_string(),
        });
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(PixelRect::new(x0, y0, (x1 - x0) as u32, (y1 - y0) as u32))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::geo::AffineTransform;

    const GEOGRAPHIC: &str = "EPSG:4326";

    /// 1000x1000 image, 0.25 degrees per pixel, top-left at (0, 100).
    fn transform() -> GeoTransform {
        GeoTransform::Affine(AffineTransform::new([0.0, 0.25, 0.0, 100.0, 0.0, -0.25]))
    }

    fn extent() -> PixelRect {
        PixelRect::new(0, 0, 1000, 1000)
    }

    #[test]
    fn test_no_bbox_is_whole_extent() {
        assert_eq!(region_of_interest(extent(), None, &transform(), GEOGRAPHIC).unwrap(), extent());
    }

    #[test]
    fn test_bbox_inside_image() {
        let bbox = GeoBounds::new(25.0, 0.0, 75.0, 75.0).unwrap();
        let r = region_of_interest(extent(), Some(&bbox), &transform(), GEOGRAPHIC).unwrap();
        assert_eq!(r, PixelRect::new(100, 100, 200, 300));
    }

    #[test]
    fn test_bbox_partially_outside_is_clipped() {
        let bbox = GeoBounds::new(-10.0, 0.0, 75.0, 200.0).unwrap();
        let r = region_of_interest(extent(), Some(&bbox), &transform(), GEOGRAPHIC).unwrap();
        assert_eq!(r, PixelRect::new(0, 0, 300, 400));
    }

    #[test]
    fn test_bbox_outside_image_is_configuration_error() {
        let bbox = GeoBounds::new(500.0, 0.0, 600.0, 10.0).unwrap();
        let err = region_of_interest(extent(), Some(&bbox), &transform(), GEOGRAPHIC).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    /// 1000x1000 metre pixels in UTM zone 33N, north-west corner near
    /// 15.0E 42.0N.
    fn utm_transform() -> GeoTransform {
        GeoTransform::Affine(AffineTransform::new([
            500_000.0,
            1.0,
            0.0,
            4_650_000.0,
            0.0,
            -1.0,
        ]))
    }

    #[test]
    fn test_wgs84_bbox_on_projected_image() {
        let bbox = GeoBounds::new(15.0, 41.996, 15.005, 41.9999).unwrap();
        let r = region_of_interest(extent(), Some(&bbox), &utm_transform(), "EPSG:32633").unwrap();

        // Northings 4649765..4649332 and eastings 500000..500414.
        assert_eq!(r.x, 0);
        assert!((233..=236).contains(&r.y), "{r}");
        assert!((414..=416).contains(&r.width), "{r}");
        assert!((432..=436).contains(&r.height), "{r}");
    }

    #[test]
    fn test_wgs84_bbox_outside_projected_image() {
        let bbox = GeoBounds::new(15.1, 41.0, 15.2, 41.1).unwrap();
        let err = region_of_interest(extent(), Some(&bbox), &utm_transform(), "EPSG:32633")
            .unwrap_err();
        assert!(matches!(err, Error::EmptyRegion { .. }));
    }

    #[test]
    fn test_unsupported_reference_is_source_error() {
        let bbox = GeoBounds::new(7.0, 46.0, 7.1, 46.1).unwrap();
        let err = region_of_interest(extent(), Some(&bbox), &utm_transform(), "EPSG:2056")
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::SourceAccess);

        // Without a box the reference is never consulted.
        let whole = region_of_interest(extent(), None, &utm_transform(), "EPSG:2056").unwrap();
        assert_eq!(whole, extent());
    }
}
