//! Output feature geometries.

use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};

/// Geometry shape written for every feature of a run.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum GeometryType {
    /// Center of the window.
    Point,
    /// Footprint of the window.
    #[default]
    Polygon,
}

impl std::fmt::Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Point => write!(f, "point"),
            Self::Polygon => write!(f, "polygon"),
        }
    }
}

impl std::str::FromStr for GeometryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "point" => Ok(Self::Point),
            "polygon" => Ok(Self::Polygon),
            other => Err(format!("invalid geometry type: {other}")),
        }
    }
}

/// A feature geometry in the source's spatial reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A single position.
    Point(GeoPoint),
    /// A closed exterior ring (first vertex repeated at the end).
    Polygon(Vec<GeoPoint>),
}

impl Geometry {
    /// Build a closed polygon from its vertices.
    pub fn polygon(vertices: impl IntoIterator<Item = GeoPoint>) -> Self {
        let mut ring: Vec<GeoPoint> = vertices.into_iter().collect();
        if let Some(&first) = ring.first()
            && ring.last() != Some(&first)
        {
            ring.push(first);
        }
        Self::Polygon(ring)
    }

    /// Shape of this geometry.
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Point(_) => GeometryType::Point,
            Self::Polygon(_) => GeometryType::Polygon,
        }
    }

    /// Well-known text representation.
    pub fn to_wkt(&self) -> String {
        match self {
            Self::Point(p) => format!("POINT ({} {})", p.x, p.y),
            Self::Polygon(ring) => {
                let coords = ring
                    .iter()
                    .map(|p| format!("{} {}", p.x, p.y))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("POLYGON (({coords}))")
            }
        }
    }

    /// GeoJSON geometry object.
    pub fn to_geojson(&self) -> serde_json::Value {
        match self {
            Self::Point(p) => serde_json::json!({
                "type": "Point",
                "coordinates": [p.x, p.y],
            }),
            Self::Polygon(ring) => serde_json::json!({
                "type": "Polygon",
                "coordinates": [ring.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>()],
            }),
        }
    }
}
