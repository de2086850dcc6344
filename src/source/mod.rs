//! Image sources: where window pixels come from.
//!
//! A run reads from exactly one [`ImageSource`]. Both variants expose the
//! same four operations; only the orchestrator's pool sizing looks at which
//! variant is active.

mod http;
mod local;
mod raster;
mod tiled;

pub use http::HttpTileService;
pub use local::{LocalImage, RasterReader};
pub use raster::ImageFileRaster;
pub use tiled::{TileId, TileService, TiledImage};

use crate::error::BoxError;
use crate::geo::{GeoTransform, PixelRect, Size};
use crate::window::Window;
use image::RgbImage;
use image::imageops::{self, FilterType};

/// Which kind of source backs a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Locally readable raster.
    Local,
    /// Remote tile service.
    WebTiled,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local image"),
            Self::WebTiled => write!(f, "web tile service"),
        }
    }
}

/// The georeferenced raster a run is processing.
pub enum ImageSource {
    /// Local raster file.
    Local(LocalImage),
    /// Web tile service.
    WebTiled(TiledImage),
}

impl ImageSource {
    /// Variant of this source.
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Local(_) => SourceKind::Local,
            Self::WebTiled(_) => SourceKind::WebTiled,
        }
    }

    /// Pixel extent of the image.
    pub fn extent(&self) -> PixelRect {
        match self {
            Self::Local(s) => s.extent(),
            Self::WebTiled(s) => s.extent(),
        }
    }

    /// Spatial reference of the transform's output coordinates.
    pub fn spatial_reference(&self) -> &str {
        match self {
            Self::Local(s) => s.spatial_reference(),
            Self::WebTiled(s) => s.spatial_reference(),
        }
    }

    /// Pixel to geographic transform, fixed once the source is opened.
    pub fn transform(&self) -> &GeoTransform {
        match self {
            Self::Local(s) => s.transform(),
            Self::WebTiled(s) => s.transform(),
        }
    }

    /// Pixels of `window`, resampled to `output`. Parts of the window beyond
    /// the image extent are zero-filled.
    pub fn fetch(&self, window: &Window, output: Size) -> Result<RgbImage, BoxError> {
        match self {
            Self::Local(s) => s.fetch(window, output),
            Self::WebTiled(s) => s.fetch(window, output),
        }
    }
}

/// Place the `visible` part of a window onto a window-sized canvas and
/// resample it to the model input size.
fn compose_window(window: &Window, visible: PixelRect, pixels: &RgbImage, output: Size) -> RgbImage {
    let rect = window.rect;
    let canvas = if visible == rect && pixels.dimensions() == (rect.width, rect.height) {
        pixels.clone()
    } else {
        let mut canvas = RgbImage::new(rect.width, rect.height);
        imageops::replace(&mut canvas, pixels, visible.x - rect.x, visible.y - rect.y);
        canvas
    };

    if canvas.dimensions() == (output.width, output.height) {
        canvas
    } else {
        imageops::resize(&canvas, output.width, output.height, FilterType::Triangle)
    }
}
