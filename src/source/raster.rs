//! File-backed raster reader with world-file georeferencing.

use super::RasterReader;
use crate::constants::raster::{
    DEFAULT_SPATIAL_REFERENCE, PROJECTION_EXTENSION, WORLD_FILE_EXTENSION,
};
use crate::error::{BoxError, Error, Result};
use crate::geo::{AffineTransform, PixelRect, Size};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A raster decoded into memory with the `image` crate and georeferenced
/// from ESRI world-file and `.prj` sidecars.
pub struct ImageFileRaster {
    pixels: RgbImage,
    transform: Option<AffineTransform>,
    spatial_reference: Option<String>,
}

impl ImageFileRaster {
    /// Decode `path` and read its sidecars.
    pub fn open(path: &Path) -> Result<Self> {
        let pixels = image::open(path)
            .map_err(|e| Error::ImageOpen {
                path: path.to_path_buf(),
                source: Box::new(e),
            })?
            .to_rgb8();

        let transform = match find_world_file(path) {
            Some(world) => {
                debug!("Reading world file: {}", world.display());
                Some(read_world_file(&world)?)
            }
            None => None,
        };

        let prj = path.with_extension(PROJECTION_EXTENSION);
        let spatial_reference = if prj.is_file() {
            let wkt = std::fs::read_to_string(&prj)?;
            Some(wkt.trim().to_string())
        } else {
            warn!(
                "No projection file for {}, assuming {}",
                path.display(),
                DEFAULT_SPATIAL_REFERENCE
            );
            Some(DEFAULT_SPATIAL_REFERENCE.to_string())
        };

        Ok(Self {
            pixels,
            transform,
            spatial_reference,
        })
    }
}

impl RasterReader for ImageFileRaster {
    fn size(&self) -> Size {
        let (width, height) = self.pixels.dimensions();
        Size::new(width, height)
    }

    fn geo_transform(&self) -> Option<AffineTransform> {
        self.transform
    }

    fn spatial_reference(&self) -> Option<String> {
        self.spatial_reference.clone()
    }

    fn read(&self, rect: PixelRect) -> std::result::Result<RgbImage, BoxError> {
        let (x, y) = (u32::try_from(rect.x)?, u32::try_from(rect.y)?);
        let (width, height) = self.pixels.dimensions();
        if x.saturating_add(rect.width) > width || y.saturating_add(rect.height) > height {
            return Err(format!("region {rect} exceeds raster size {width}x{height}").into());
        }
        Ok(image::imageops::crop_imm(&self.pixels, x, y, rect.width, rect.height).to_image())
    }
}

/// Candidate world-file paths for a raster, in lookup order:
/// `scene.pgw` (first and last extension letter + `w`), `scene.pngw`,
/// then `scene.wld`.
fn world_file_candidates(path: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let mut chars = ext.chars();
        if let (Some(first), Some(last)) = (chars.next(), ext.chars().last()) {
            candidates.push(path.with_extension(format!("{first}{last}w")));
        }
        candidates.push(path.with_extension(format!("{ext}w")));
    }
    candidates.push(path.with_extension(WORLD_FILE_EXTENSION));
    candidates
}

fn find_world_file(path: &Path) -> Option<PathBuf> {
    world_file_candidates(path).into_iter().find(|p| p.is_file())
}

/// Parse the six coefficients of a world file.
fn read_world_file(path: &Path) -> Result<AffineTransform> {
    let contents = std::fs::read_to_string(path)?;
    let values = contents
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::SourceAccess {
            reason: format!("invalid world file '{}': {e}", path.display()),
        })?;

    let values: [f64; 6] = values.try_into().map_err(|v: Vec<f64>| Error::SourceAccess {
        reason: format!(
            "world file '{}' must contain 6 values, found {}",
            path.display(),
            v.len()
        ),
    })?;
    Ok(AffineTransform::from_world_file(values))
}
