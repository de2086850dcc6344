//! CLI argument validators.
//!
//! Shared validation functions for CLI argument parsing.

use crate::constants::{MAX_ZOOM, utilization};
use crate::logging::{LogFile, LogLevel};
use std::path::PathBuf;

/// Parse and validate confidence value (0.0-1.0).
pub fn parse_confidence(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(0.0..=1.0).contains(&value) {
        return Err(format!(
            "confidence must be between 0.0 and 1.0, got {value}"
        ));
    }

    Ok(value)
}

/// Parse and validate an NMS overlap threshold, in (0.0, 1.0].
pub fn parse_overlap(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(value > 0.0 && value <= 1.0) {
        return Err(format!(
            "overlap must be greater than 0.0 and at most 1.0, got {value}"
        ));
    }

    Ok(value)
}

/// Parse and validate a GPU utilization fraction.
pub fn parse_utilization(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(utilization::MIN..=utilization::MAX).contains(&value) {
        return Err(format!(
            "max utilization must be between {} and {}, got {value}",
            utilization::MIN,
            utilization::MAX
        ));
    }

    Ok(value)
}

/// Parse and validate a tile zoom level.
pub fn parse_zoom(s: &str) -> Result<u8, String> {
    let value: u8 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid zoom level"))?;

    if value > MAX_ZOOM {
        return Err(format!("zoom must be at most {MAX_ZOOM}, got {value}"));
    }

    Ok(value)
}

/// Interpret the values of `--log [LEVEL] PATH`.
pub fn parse_log_spec(values: &[String]) -> Result<LogFile, String> {
    match values {
        [path] => Ok(LogFile {
            path: PathBuf::from(path),
            level: LogLevel::default(),
        }),
        [level, path] => Ok(LogFile {
            path: PathBuf::from(path),
            level: level.parse()?,
        }),
        _ => Err("--log takes an optional level and a path".to_string()),
    }
}
