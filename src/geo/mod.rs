//! Pixel and geographic coordinate types.

mod bounds;
mod crs;
mod geometry;
mod pixel;
mod transform;

pub use bounds::{GeoBounds, GeoPoint};
pub use crs::Reprojection;
pub use geometry::{Geometry, GeometryType};
pub use pixel::{PixelPoint, PixelRect, Size};
pub use transform::{AffineTransform, GeoTransform, WebMercatorTransform};
