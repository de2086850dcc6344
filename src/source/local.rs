//! Local raster source.

use super::compose_window;
use crate::error::{BoxError, Error, Result};
use crate::geo::{AffineTransform, GeoTransform, PixelRect, Size};
use crate::window::Window;
use image::RgbImage;

/// Access to a locally readable, georeferenced raster.
///
/// Decoding and pixel access belong to the implementation; the source only
/// asks for rectangles that lie inside [`RasterReader::size`].
pub trait RasterReader: Send + Sync {
    /// Raster dimensions.
    fn size(&self) -> Size;

    /// Affine geotransform, `None` when the raster is not georeferenced.
    fn geo_transform(&self) -> Option<AffineTransform>;

    /// Spatial reference (WKT or authority code), if known.
    fn spatial_reference(&self) -> Option<String>;

    /// Read the pixels of `rect`.
    fn read(&self, rect: PixelRect) -> std::result::Result<RgbImage, BoxError>;
}

/// A local raster opened for a run.
pub struct LocalImage {
    reader: Box<dyn RasterReader>,
    extent: PixelRect,
    transform: GeoTransform,
    spatial_reference: String,
}

impl LocalImage {
    /// Open a raster, failing when it is empty or lacks georeferencing.
    pub fn open(reader: Box<dyn RasterReader>) -> Result<Self> {
        let size = reader.size();
        if !size.is_positive() {
            return Err(Error::SourceAccess {
                reason: format!("image has no pixels ({size})"),
            });
        }
        let transform = reader.geo_transform().ok_or_else(|| Error::SourceAccess {
            reason: "image is not georeferenced".to_string(),
        })?;
        let spatial_reference = reader
            .spatial_reference()
            .ok_or_else(|| Error::SourceAccess {
                reason: "spatial reference unavailable".to_string(),
            })?;

        Ok(Self {
            reader,
            extent: PixelRect::from_size(size),
            transform: GeoTransform::Affine(transform),
            spatial_reference,
        })
    }

    /// Pixel extent.
    pub fn extent(&self) -> PixelRect {
        self.extent
    }

    /// Spatial reference.
    pub fn spatial_reference(&self) -> &str {
        &self.spatial_reference
    }

    /// Pixel to geographic transform.
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Crop and resample a window.
    pub fn fetch(&self, window: &Window, output: Size) -> std::result::Result<RgbImage, BoxError> {
        let visible = self
            .extent
            .intersection(&window.rect)
            .ok_or_else(|| format!("window {window} lies outside the image"))?;
        let pixels = self.reader.read(visible)?;
        Ok(compose_window(window, visible, &pixels, output))
    }
}
