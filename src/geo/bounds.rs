//! Geographic bounding boxes.

use serde::{Deserialize, Serialize};

/// A position in the image's spatial reference (longitude/latitude for
/// geographic references, easting/northing for projected ones).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Longitude or easting.
    pub x: f64,
    /// Latitude or northing.
    pub y: f64,
}

impl GeoPoint {
    /// Create a geographic point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box given as west, south, east, north.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct GeoBounds {
    /// Western edge (minimum x).
    pub west: f64,
    /// Southern edge (minimum y).
    pub south: f64,
    /// Eastern edge (maximum x).
    pub east: f64,
    /// Northern edge (maximum y).
    pub north: f64,
}

impl GeoBounds {
    /// Create a bounding box, checking that it is well ordered and finite.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, String> {
        let bounds = Self {
            west,
            south,
            east,
            north,
        };
        bounds.check()?;
        Ok(bounds)
    }

    fn check(&self) -> Result<(), String> {
        if ![self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(format!("bounding box {self} has non-finite coordinates"));
        }
        if self.west >= self.east {
            return Err(format!("bounding box {self}: west must be less than east"));
        }
        if self.south >= self.north {
            return Err(format!("bounding box {self}: south must be less than north"));
        }
        Ok(())
    }

    /// Check that the box lies within WGS84 longitude/latitude limits.
    pub fn check_wgs84(&self, max_latitude: f64) -> Result<(), String> {
        if self.west < -180.0 || self.east > 180.0 {
            return Err(format!(
                "bounding box {self}: longitude must be between -180 and 180"
            ));
        }
        if self.south < -max_latitude || self.north > max_latitude {
            return Err(format!(
                "bounding box {self}: latitude must be between -{max_latitude} and {max_latitude}"
            ));
        }
        Ok(())
    }

    /// Corners in order: north-west, north-east, south-east, south-west.
    pub fn corners(&self) -> [GeoPoint; 4] {
        [
            GeoPoint::new(self.west, self.north),
            GeoPoint::new(self.east, self.north),
            GeoPoint::new(self.east, self.south),
            GeoPoint::new(self.west, self.south),
        ]
    }
}

impl TryFrom<[f64; 4]> for GeoBounds {
    type Error = String;

    fn try_from(v: [f64; 4]) -> Result<Self, Self::Error> {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<GeoBounds> for [f64; 4] {
    fn from(b: GeoBounds) -> Self {
        [b.west, b.south, b.east, b.north]
    }
}

impl std::fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.west, self.south, self.east, self.north
        )
    }
}
