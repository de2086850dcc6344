//! Run configuration validation.

use crate::config::RunConfig;
use crate::constants::{confidence, utilization, web_mercator};
use crate::error::{Error, Result};
use crate::source::SourceKind;

/// Validate a run configuration for a source of the given kind.
///
/// Called once, before planning; every violation is a configuration error.
pub fn validate_run_config(config: &RunConfig, kind: SourceKind) -> Result<()> {
    if !config.window_size.is_positive() {
        return Err(Error::config(format!(
            "window size must be positive in both dimensions, got {}",
            config.window_size
        )));
    }

    if let Some(step) = config.step_size
        && !step.is_positive()
    {
        return Err(Error::config(format!(
            "step size must be positive in both dimensions, got {step}"
        )));
    }

    if !(confidence::MIN..=confidence::MAX).contains(&config.confidence) {
        return Err(Error::config(format!(
            "confidence must be between {} and {}, got {}",
            confidence::MIN,
            confidence::MAX,
            config.confidence
        )));
    }

    if let Some(overlap) = config.nms_overlap
        && !(overlap > 0.0 && overlap <= 1.0)
    {
        return Err(Error::config(format!(
            "NMS overlap threshold must be in (0, 1], got {overlap}"
        )));
    }

    if !(utilization::MIN..=utilization::MAX).contains(&config.max_utilization) {
        return Err(Error::config(format!(
            "max utilization must be between {} and {}, got {}",
            utilization::MIN,
            utilization::MAX,
            config.max_utilization
        )));
    }

    if config.max_downloads == 0 {
        return Err(Error::config("maximum downloads must be at least 1"));
    }

    if kind == SourceKind::WebTiled
        && let Some(bbox) = &config.bbox
    {
        bbox.check_wgs84(web_mercator::MAX_LATITUDE)
            .map_err(Error::config)?;
    }

    Ok(())
}
