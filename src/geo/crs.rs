//! Reprojection of WGS84 longitude/latitude into a raster's spatial
//! reference.
//!
//! Spatial references arrive as `EPSG:<code>`, PROJ strings, or the WKT of a
//! `.prj` sidecar. Geographic references pass coordinates through, Web
//! Mercator is computed inline, and other projections go through `proj4rs`.

use super::GeoPoint;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use std::f64::consts::FRAC_PI_4;

const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Radius of the Web Mercator sphere in metres.
const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Conversion from WGS84 degrees to the coordinates of one spatial reference.
pub enum Reprojection {
    /// Geographic reference; coordinates are already longitude/latitude.
    Identity,
    /// Spherical Web Mercator metres (EPSG:3857).
    WebMercator,
    /// Any other supported projection.
    Projected {
        /// WGS84 geographic definition.
        wgs84: Proj,
        /// Target projection.
        target: Proj,
    },
}

impl Reprojection {
    /// Reprojection into `spatial_reference`.
    ///
    /// Fails when the reference is not recognized or cannot be initialized.
    pub fn from_wgs84(spatial_reference: &str) -> Result<Self, String> {
        match target_for(spatial_reference) {
            Some(Target::Geographic) => Ok(Self::Identity),
            Some(Target::WebMercator) => Ok(Self::WebMercator),
            Some(Target::Proj(definition)) => {
                let wgs84 = Proj::from_proj_string(WGS84_PROJ)
                    .map_err(|e| format!("invalid WGS84 definition: {e:?}"))?;
                let target = Proj::from_proj_string(&definition)
                    .map_err(|e| format!("invalid projection '{definition}': {e:?}"))?;
                Ok(Self::Projected { wgs84, target })
            }
            None => Err(format!(
                "unsupported spatial reference '{}'",
                abbreviate(spatial_reference)
            )),
        }
    }

    /// Whether coordinates pass through unchanged.
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Project a WGS84 point (degrees).
    pub fn project(&self, p: GeoPoint) -> Result<GeoPoint, String> {
        let projected = match self {
            Self::Identity => p,
            Self::WebMercator if p.y.abs() >= 90.0 => {
                return Err(format!("latitude {} has no Web Mercator position", p.y));
            }
            Self::WebMercator => GeoPoint::new(
                WEB_MERCATOR_RADIUS * p.x.to_radians(),
                WEB_MERCATOR_RADIUS * (FRAC_PI_4 + p.y.to_radians() / 2.0).tan().ln(),
            ),
            Self::Projected { wgs84, target } => {
                let mut point = (p.x.to_radians(), p.y.to_radians(), 0.0);
                transform(wgs84, target, &mut point)
                    .map_err(|e| format!("cannot project ({}, {}): {e:?}", p.x, p.y))?;
                GeoPoint::new(point.0, point.1)
            }
        };
        if projected.x.is_finite() && projected.y.is_finite() {
            Ok(projected)
        } else {
            Err(format!("({}, {}) has no projected position", p.x, p.y))
        }
    }
}

enum Target {
    Geographic,
    WebMercator,
    Proj(String),
}

fn target_for(spatial_reference: &str) -> Option<Target> {
    let reference = spatial_reference.trim();
    if reference.starts_with('+') {
        return Some(if is_longlat(reference) {
            Target::Geographic
        } else {
            Target::Proj(reference.to_string())
        });
    }
    match epsg_code(reference) {
        Some(code) => target_for_epsg(code),
        None => esri_target(reference),
    }
}

fn is_longlat(proj: &str) -> bool {
    proj.split_whitespace()
        .any(|p| p == "+proj=longlat" || p == "+proj=latlong")
}

fn target_for_epsg(code: u32) -> Option<Target> {
    match code {
        4326 | 4258 | 4269 => Some(Target::Geographic),
        3857 | 3785 | 900_913 | 102_100 => Some(Target::WebMercator),
        32601..=32660 => Some(Target::Proj(utm(code - 32600, false))),
        32701..=32760 => Some(Target::Proj(utm(code - 32700, true))),
        _ => None,
    }
}

fn utm(zone: u32, south: bool) -> String {
    let hemisphere = if south { " +south" } else { "" };
    format!("+proj=utm +zone={zone}{hemisphere} +datum=WGS84 +units=m +no_defs")
}

/// EPSG code of an authority string or WKT. WKT1 closes the CRS with its
/// `AUTHORITY`, WKT2 with its `ID`, so the last occurrence wins.
fn epsg_code(reference: &str) -> Option<u32> {
    let upper = reference.to_ascii_uppercase();
    if let Some(code) = upper.strip_prefix("EPSG:") {
        return code.trim().parse().ok();
    }
    for marker in ["AUTHORITY[\"EPSG\",", "ID[\"EPSG\","] {
        if let Some(pos) = upper.rfind(marker) {
            let digits: String = upper[pos + marker.len()..]
                .trim_start_matches([' ', '"'])
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            return digits.parse().ok();
        }
    }
    None
}

/// ESRI-style WKT carries no authority; recognize it by name.
fn esri_target(wkt: &str) -> Option<Target> {
    let upper = wkt.to_ascii_uppercase();
    if upper.starts_with("GEOGCS") || upper.starts_with("GEOGCRS") {
        return Some(Target::Geographic);
    }
    if upper.contains("WEB_MERCATOR") || upper.contains("PSEUDO-MERCATOR") {
        return Some(Target::WebMercator);
    }

    let start = upper.find("UTM_ZONE_").or_else(|| upper.find("UTM ZONE "))? + 9;
    let rest = &upper[start..];
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let zone: u32 = digits.parse().ok().filter(|z| (1..=60).contains(z))?;
    let south = rest[digits.len()..].starts_with('S');
    Some(Target::Proj(utm(zone, south)))
}

fn abbreviate(reference: &str) -> String {
    const MAX: usize = 60;
    let reference = reference.trim();
    match reference.char_indices().nth(MAX) {
        Some((end, _)) => format!("{}...", &reference[..end]),
        None => reference.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    const UTM_33N_WKT: &str = r#"PROJCS["WGS 84 / UTM zone 33N",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4326"]],PROJECTION["Transverse_Mercator"],PARAMETER["latitude_of_origin",0],PARAMETER["central_meridian",15],PARAMETER["scale_factor",0.9996],PARAMETER["false_easting",500000],PARAMETER["false_northing",0],UNIT["metre",1],AUTHORITY["EPSG","32633"]]"#;

    #[test]
    fn test_epsg_code_from_authority_and_wkt() {
        assert_eq!(epsg_code("EPSG:4326"), Some(4326));
        assert_eq!(epsg_code("epsg:32633"), Some(32633));
        assert_eq!(epsg_code(UTM_33N_WKT), Some(32633));
        assert_eq!(epsg_code(r#"PROJCRS["x",ID["EPSG",3857]]"#), Some(3857));
        assert_eq!(epsg_code("GEOGCS[\"GCS_WGS_1984\"]"), None);
    }

    #[test]
    fn test_geographic_references_pass_through() {
        for reference in ["EPSG:4326", "+proj=longlat +datum=WGS84", "GEOGCS[\"GCS_WGS_1984\"]"] {
            let r = Reprojection::from_wgs84(reference).unwrap();
            assert!(r.is_identity(), "{reference}");
            assert_eq!(
                r.project(GeoPoint::new(10.5, 59.9)).unwrap(),
                GeoPoint::new(10.5, 59.9)
            );
        }
    }

    #[test]
    fn test_web_mercator() {
        let r = Reprojection::from_wgs84("EPSG:3857").unwrap();
        let p = r.project(GeoPoint::new(180.0, 0.0)).unwrap();
        assert!((p.x - 20_037_508.342_789_244).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!(r.project(GeoPoint::new(0.0, 90.0)).is_err());
    }

    #[test]
    fn test_utm_from_wkt() {
        let r = Reprojection::from_wgs84(UTM_33N_WKT).unwrap();
        let p = r.project(GeoPoint::new(15.0, 42.0)).unwrap();
        assert!((p.x - 500_000.0).abs() < 0.01);
        assert!((p.y - 4_649_776.2).abs() < 1.0);
    }

    #[test]
    fn test_esri_utm_name() {
        let r = Reprojection::from_wgs84("PROJCS[\"WGS_1984_UTM_Zone_33N\",GEOGCS[\"GCS_WGS_1984\"]]")
            .unwrap();
        let p = r.project(GeoPoint::new(15.0, 42.0)).unwrap();
        assert!((p.x - 500_000.0).abs() < 0.01);

        assert!(matches!(
            esri_target("PROJCS[\"WGS_1984_UTM_Zone_19S\"]"),
            Some(Target::Proj(def)) if def.contains("+zone=19 +south")
        ));
    }

    #[test]
    fn test_unsupported_reference() {
        let err = Reprojection::from_wgs84("EPSG:2056").err().unwrap();
        assert!(err.contains("unsupported spatial reference"));
    }
}
