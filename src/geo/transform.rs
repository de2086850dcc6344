//! Pixel to geographic coordinate transforms.
//!
//! A transform is fixed for the lifetime of a run once its source is opened.
//! Local rasters use an affine geotransform; web tile sources use the Web
//! Mercator tile grid, which is not affine in latitude.

use crate::geo::{GeoPoint, PixelPoint};
use std::f64::consts::PI;

/// Six-coefficient affine geotransform in GDAL order:
/// `x = c[0] + col * c[1] + row * c[2]`, `y = c[3] + col * c[4] + row * c[5]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    coefficients: [f64; 6],
}

impl AffineTransform {
    /// Create from GDAL-ordered coefficients.
    pub const fn new(coefficients: [f64; 6]) -> Self {
        Self { coefficients }
    }

    /// Build from the six lines of an ESRI world file
    /// (`A, D, B, E, C, F`, where `C, F` address the center of the top-left
    /// pixel).
    pub fn from_world_file(values: [f64; 6]) -> Self {
        let [a, d, b, e, c, f] = values;
        Self::new([c - a / 2.0 - b / 2.0, a, b, f - d / 2.0 - e / 2.0, d, e])
    }

    /// GDAL-ordered coefficients.
    pub const fn coefficients(&self) -> [f64; 6] {
        self.coefficients
    }

    fn forward(&self, p: PixelPoint) -> GeoPoint {
        let c = &self.coefficients;
        GeoPoint::new(
            c[0] + p.x * c[1] + p.y * c[2],
            c[3] + p.x * c[4] + p.y * c[5],
        )
    }

    fn inverse(&self, g: GeoPoint) -> Option<PixelPoint> {
        let c = &self.coefficients;
        let det = c[1] * c[5] - c[2] * c[4];
        if det.abs() < f64::EPSILON {
            return None;
        }
        let dx = g.x - c[0];
        let dy = g.y - c[3];
        Some(PixelPoint::new(
            (dx * c[5] - dy * c[2]) / det,
            (dy * c[1] - dx * c[4]) / det,
        ))
    }
}

/// Web Mercator tile-grid transform at a fixed zoom level.
///
/// Pixel coordinates are local to a raster whose top-left corner sits at
/// `origin` in global zoom-level pixel space. Output is WGS84 longitude and
/// latitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebMercatorTransform {
    zoom: u8,
    tile_size: u32,
    origin: PixelPoint,
}

impl WebMercatorTransform {
    /// Create a transform for `zoom` with the raster's top-left at `origin`.
    pub const fn new(zoom: u8, tile_size: u32, origin: PixelPoint) -> Self {
        Self {
            zoom,
            tile_size,
            origin,
        }
    }

    /// Edge of the whole world in pixels at this zoom.
    pub fn world_size(&self) -> f64 {
        f64::from(self.tile_size) * f64::from(1_u32 << self.zoom)
    }

    /// Global pixel position of a longitude/latitude.
    pub fn global_pixel(&self, g: GeoPoint) -> PixelPoint {
        let world = self.world_size();
        let lat = g.y.to_radians();
        PixelPoint::new(
            (g.x + 180.0) / 360.0 * world,
            (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * world,
        )
    }

    fn forward(&self, p: PixelPoint) -> GeoPoint {
        let world = self.world_size();
        let gx = self.origin.x + p.x;
        let gy = self.origin.y + p.y;
        let lon = gx / world * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * gy / world)).sinh().atan().to_degrees();
        GeoPoint::new(lon, lat)
    }

    fn inverse(&self, g: GeoPoint) -> PixelPoint {
        let global = self.global_pixel(g);
        PixelPoint::new(global.x - self.origin.x, global.y - self.origin.y)
    }
}

/// The pixel to geographic transform of an image source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoTransform {
    /// Affine geotransform of a local raster.
    Affine(AffineTransform),
    /// Web Mercator tile grid of a tile service.
    WebMercator(WebMercatorTransform),
}

impl GeoTransform {
    /// Map a pixel position to the source's spatial reference.
    pub fn pixel_to_geo(&self, p: PixelPoint) -> GeoPoint {
        match self {
            Self::Affine(t) => t.forward(p),
            Self::WebMercator(t) => t.forward(p),
        }
    }

    /// Map a geographic position back to pixels, `None` when the transform
    /// is not invertible.
    pub fn geo_to_pixel(&self, g: GeoPoint) -> Option<PixelPoint> {
        match self {
            Self::Affine(t) => t.inverse(g),
            Self::WebMercator(t) => Some(t.inverse(g)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn close(a: PixelPoint, b: PixelPoint) -> bool {
        (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS
    }

    #[test]
    fn test_affine_forward_north_up() {
        let t = GeoTransform::Affine(AffineTransform::new([10.0, 0.5, 0.0, 50.0, 0.0, -0.5]));
        let g = t.pixel_to_geo(PixelPoint::new(2.0, 4.0));
        assert_eq!(g, GeoPoint::new(11.0, 48.0));
    }

    #[test]
    fn test_affine_round_trip_with_rotation() {
        let t = GeoTransform::Affine(AffineTransform::new([
            500_000.0, 0.3, 0.05, 4_000_000.0, -0.02, -0.3,
        ]));
        let p = PixelPoint::new(1234.5, 678.25);
        let back = t.geo_to_pixel(t.pixel_to_geo(p));
        assert!(back.is_some_and(|b| close(b, p)));
    }

    #[test]
    fn test_affine_singular_has_no_inverse() {
        let t = GeoTransform::Affine(AffineTransform::new([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
        assert!(t.geo_to_pixel(GeoPoint::new(1.0, 1.0)).is_none());
    }

    #[test]
    fn test_world_file_shifts_to_pixel_corner() {
        let t = AffineTransform::from_world_file([2.0, 0.0, 0.0, -2.0, 101.0, 199.0]);
        assert_eq!(t.coefficients(), [100.0, 2.0, 0.0, 200.0, 0.0, -2.0]);
    }

    #[test]
    fn test_web_mercator_world_corners() {
        let t = WebMercatorTransform::new(0, 256, PixelPoint::new(0.0, 0.0));
        let nw = GeoTransform::WebMercator(t).pixel_to_geo(PixelPoint::new(0.0, 0.0));
        assert!((nw.x + 180.0).abs() < EPS);
        assert!((nw.y - 85.051_128_779_806_59).abs() < 1e-9);

        let center = GeoTransform::WebMercator(t).pixel_to_geo(PixelPoint::new(128.0, 128.0));
        assert!(center.x.abs() < EPS && center.y.abs() < EPS);
    }

    #[test]
    fn test_web_mercator_round_trip_with_origin() {
        let t = GeoTransform::WebMercator(WebMercatorTransform::new(
            18,
            256,
            PixelPoint::new(34_000_000.0, 22_000_000.0),
        ));
        let p = PixelPoint::new(640.5, 128.25);
        let back = t.geo_to_pixel(t.pixel_to_geo(p));
        assert!(back.is_some_and(|b| (b.x - p.x).abs() < 1e-4 && (b.y - p.y).abs() < 1e-4));
    }

    #[test]
    fn test_web_mercator_is_not_affine_in_latitude() {
        let t = GeoTransform::WebMercator(WebMercatorTransform::new(
            2,
            256,
            PixelPoint::new(0.0, 0.0),
        ));
        let a = t.pixel_to_geo(PixelPoint::new(0.0, 100.0)).y;
        let b = t.pixel_to_geo(PixelPoint::new(0.0, 200.0)).y;
        let c = t.pixel_to_geo(PixelPoint::new(0.0, 300.0)).y;
        assert!(((a - b) - (b - c)).abs() > 1e-3);
    }
}
