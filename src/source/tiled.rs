//! Web tile service source.

use super::compose_window;
use crate::constants::web_mercator::{MAX_LATITUDE, SPATIAL_REFERENCE};
use crate::constants::MAX_ZOOM;
use crate::error::{BoxError, Error, Result};
use crate::geo::{GeoBounds, GeoPoint, GeoTransform, PixelPoint, PixelRect, Size, WebMercatorTransform};
use crate::window::Window;
use image::RgbImage;
use image::imageops;
use std::sync::Arc;
use tracing::debug;

/// Address of one tile in the XYZ scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    /// Zoom level.
    pub zoom: u8,
    /// Column.
    pub x: u32,
    /// Row, counted from the north.
    pub y: u32,
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// A remote XYZ tile service.
///
/// Implementations bound their own concurrency; the orchestrator sizes its
/// pool to the service's download limit.
pub trait TileService: Send + Sync {
    /// Edge of a square tile in pixels.
    fn tile_size(&self) -> u32;

    /// Fetch tiles, returned in the order requested.
    fn fetch_tiles(&self, tiles: &[TileId]) -> std::result::Result<Vec<RgbImage>, BoxError>;
}

/// The raster covered by a bounding box at one zoom level of a tile service.
pub struct TiledImage {
    service: Arc<dyn TileService>,
    zoom: u8,
    /// Top-left of the raster in global pixel space.
    origin_x: i64,
    origin_y: i64,
    extent: PixelRect,
    transform: GeoTransform,
}

impl TiledImage {
    /// Open the region `bbox` (WGS84 degrees) at `zoom`.
    pub fn open(service: Arc<dyn TileService>, bbox: &GeoBounds, zoom: u8) -> Result<Self> {
        if zoom > MAX_ZOOM {
            return Err(Error::config(format!(
                "zoom level {zoom} exceeds maximum {MAX_ZOOM}"
            )));
        }
        bbox.check_wgs84(MAX_LATITUDE).map_err(Error::config)?;

        let tile_size = service.tile_size();
        if tile_size == 0 {
            return Err(Error::SourceAccess {
                reason: "tile service reports zero tile size".to_string(),
            });
        }

        let grid = WebMercatorTransform::new(zoom, tile_size, PixelPoint::new(0.0, 0.0));
        let nw = grid.global_pixel(GeoPoint::new(bbox.west, bbox.north));
        let se = grid.global_pixel(GeoPoint::new(bbox.east, bbox.south));

        #[allow(clippy::cast_possible_truncation)]
        let (x0, y0, x1, y1) = (
            nw.x.floor() as i64,
            nw.y.floor() as i64,
            se.x.ceil() as i64,
            se.y.ceil() as i64,
        );
        if x1 <= x0 || y1 <= y0 {
            return Err(Error::EmptyRegion {
                region: bbox.to_string(),
            });
        }
        let width = u32::try_from(x1 - x0).map_err(|_| Error::config("bounding box too large"))?;
        let height = u32::try_from(y1 - y0).map_err(|_| Error::config("bounding box too large"))?;

        #[allow(clippy::cast_precision_loss)]
        let origin = PixelPoint::new(x0 as f64, y0 as f64);
        debug!(
            "Tiled raster at zoom {}: {}x{} pixels from global ({}, {})",
            zoom, width, height, x0, y0
        );

        Ok(Self {
            service,
            zoom,
            origin_x: x0,
            origin_y: y0,
            extent: PixelRect::new(0, 0, width, height),
            transform: GeoTransform::WebMercator(WebMercatorTransform::new(
                zoom, tile_size, origin,
            )),
        })
    }

    /// Pixel extent.
    pub fn extent(&self) -> PixelRect {
        self.extent
    }

    /// Spatial reference of transformed coordinates.
    pub fn spatial_reference(&self) -> &str {
        SPATIAL_REFERENCE
    }

    /// Pixel to geographic transform.
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Download the tiles under a window, mosaic them, and resample.
    pub fn fetch(&self, window: &Window, output: Size) -> std::result::Result<RgbImage, BoxError> {
        let visible = self
            .extent
            .intersection(&window.rect)
            .ok_or_else(|| format!("window {window} lies outside the tiled region"))?;

        let tile_size = self.service.tile_size();
        let ts = i64::from(tile_size);
        let max_index = (1_i64 << self.zoom) - 1;

        let gx0 = self.origin_x + visible.x;
        let gy0 = self.origin_y + visible.y;
        let gx1 = self.origin_x + visible.right();
        let gy1 = self.origin_y + visible.bottom();

        let tx0 = (gx0 / ts).clamp(0, max_index);
        let ty0 = (gy0 / ts).clamp(0, max_index);
        let tx1 = ((gx1 - 1) / ts).clamp(0, max_index);
        let ty1 = ((gy1 - 1) / ts).clamp(0, max_index);

        let mut ids = Vec::new();
        for ty in ty0..=ty1 {
            for tx in tx0..=tx1 {
                ids.push(TileId {
                    zoom: self.zoom,
                    x: u32::try_from(tx)?,
                    y: u32::try_from(ty)?,
                });
            }
        }

        let tiles = self.service.fetch_tiles(&ids)?;
        if tiles.len() != ids.len() {
            return Err(format!(
                "tile service returned {} tiles, expected {}",
                tiles.len(),
                ids.len()
            )
            .into());
        }

        let columns = u32::try_from(tx1 - tx0 + 1)?;
        let rows = u32::try_from(ty1 - ty0 + 1)?;
        let mut mosaic = RgbImage::new(columns * tile_size, rows * tile_size);
        for (id, tile) in ids.iter().zip(&tiles) {
            let ox = (i64::from(id.x) - tx0) * ts;
            let oy = (i64::from(id.y) - ty0) * ts;
            imageops::overlay(&mut mosaic, tile, ox, oy);
        }

        let crop_x = u32::try_from(gx0 - tx0 * ts)?;
        let crop_y = u32::try_from(gy0 - ty0 * ts)?;
        let pixels =
            imageops::crop_imm(&mosaic, crop_x, crop_y, visible.width, visible.height).to_image();
        Ok(compose_window(window, visible, &pixels, output))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use image::Rgb;
    use std::sync::Mutex;

    /// Tiles filled with a color derived from their column and row.
    struct ColoredTiles {
        requested: Mutex<Vec<TileId>>,
    }

    impl ColoredTiles {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                requested: Mutex::new(Vec::new()),
            })
        }
    }

    impl TileService for ColoredTiles {
        fn tile_size(&self) -> u32 {
            256
        }

        #[allow(clippy::cast_possible_truncation)]
        fn fetch_tiles(&self, tiles: &[TileId]) -> std::result::Result<Vec<RgbImage>, BoxError> {
            self.requested.lock().unwrap().extend_from_slice(tiles);
            Ok(tiles
                .iter()
                .map(|t| RgbImage::from_pixel(256, 256, Rgb([t.x as u8, t.y as u8, 1])))
                .collect())
        }
    }

    #[test]
    fn test_open_computes_extent_from_bbox() {
        let bbox = GeoBounds::new(-180.0, -85.0, 180.0, 85.0).unwrap();
        let image = TiledImage::open(ColoredTiles::new(), &bbox, 1).unwrap();
        let extent = image.extent();
        assert_eq!(extent.width, 512);
        assert!(extent.height <= 512 && extent.height > 500);
        assert_eq!(image.spatial_reference(), "EPSG:4326");
    }

    #[test]
    fn test_open_rejects_polar_bbox() {
        let bbox = GeoBounds::new(0.0, 80.0, 10.0, 89.0).unwrap();
        let err = TiledImage::open(ColoredTiles::new(), &bbox, 5).err().unwrap();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_open_rejects_excessive_zoom() {
        let bbox = GeoBounds::new(0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(TiledImage::open(ColoredTiles::new(), &bbox, 23).is_err());
    }

    #[test]
    fn test_fetch_mosaics_tiles_under_window() {
        let service = ColoredTiles::new();
        let bbox = GeoBounds::new(-180.0, -85.0, 180.0, 85.0).unwrap();
        let image = TiledImage::open(service.clone(), &bbox, 1).unwrap();

        // Straddles the boundary between tile columns 0 and 1.
        let window = Window::new(200, 10, 100, 100, 1.0);
        let block = image.fetch(&window, Size::square(100)).unwrap();
        assert_eq!(block.dimensions(), (100, 100));

        let origin_y = image.origin_y;
        let left = block.get_pixel(0, 0);
        let right = block.get_pixel(99, 0);
        assert_eq!(left[0], 0);
        assert_eq!(right[0], 1);
        assert_eq!(i64::from(left[1]), (origin_y + 10) / 256);
        assert_eq!(service.requested.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_transform_maps_region_corner_to_bbox() {
        let bbox = GeoBounds::new(10.0, 40.0, 11.0, 41.0).unwrap();
        let image = TiledImage::open(ColoredTiles::new(), &bbox, 12).unwrap();
        let nw = image.transform().pixel_to_geo(PixelPoint::new(0.0, 0.0));
        // Origin is floored, so the corner lies at most one pixel outside.
        assert!(nw.x <= 10.0 && nw.x > 9.99);
        assert!(nw.y >= 41.0 && nw.y < 41.01);
    }
}
