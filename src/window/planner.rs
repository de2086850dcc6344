//! Window grid generation across pyramid levels.

use crate::constants::PYRAMID_SCALE_FACTOR;
use crate::error::{Error, Result};
use crate::geo::{PixelRect, Size};
use tracing::{debug, warn};

/// A rectangular pixel region presented to the model for one inference call.
///
/// Coordinates are in native image pixels; `scale` is the pyramid factor the
/// window is downsampled by before inference (1.0 = native resolution).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    /// Pixel rectangle in native image coordinates.
    pub rect: PixelRect,
    /// Pyramid scale factor.
    pub scale: f64,
}

impl Window {
    /// Create a window.
    pub const fn new(x: i64, y: i64, width: u32, height: u32, scale: f64) -> Self {
        Self {
            rect: PixelRect::new(x, y, width, height),
            scale,
        }
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}x", self.rect, self.scale)
    }
}

/// One scale of the window pyramid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PyramidLevel {
    /// Level index, 0 is the finest.
    pub index: usize,
    /// Scale factor relative to native resolution.
    pub scale: f64,
    /// Window size in native pixels at this level.
    pub window_size: Size,
    /// Step between windows in native pixels at this level.
    pub step_size: Size,
}

#[derive(Debug, Clone)]
struct LevelGrid {
    level: PyramidLevel,
    columns: Vec<u32>,
    rows: Vec<u32>,
}

impl LevelGrid {
    fn len(&self) -> usize {
        self.columns.len() * self.rows.len()
    }
}

/// Step size used when none is configured: `log2` of the window's largest
/// dimension, in both directions.
pub fn default_step(window: Size) -> Size {
    Size::square(window.max_dim().max(2).ilog2())
}

/// Offsets along one axis: start at 0, advance by `step` until a window
/// reaches the end of the axis. A window never starts past the end.
fn axis_offsets(len: u32, window: u32, step: u32) -> Vec<u32> {
    let mut offsets = Vec::new();
    let mut pos: u64 = 0;
    loop {
        #[allow(clippy::cast_possible_truncation)]
        offsets.push(pos as u32);
        if pos + u64::from(window) >= u64::from(len) {
            break;
        }
        pos += u64::from(step);
        if pos >= u64::from(len) {
            break;
        }
    }
    offsets
}

/// Deterministic plan of windows covering a pixel region of interest.
///
/// The plan holds only per-level axis offsets; windows are produced lazily by
/// [`WindowPlanner::iter`], finest level first, row-major within a level.
/// Iterating twice yields the same sequence.
#[derive(Debug, Clone)]
pub struct WindowPlanner {
    region: PixelRect,
    grids: Vec<LevelGrid>,
}

impl WindowPlanner {
    /// Plan windows over `region`, which must lie within `extent`.
    ///
    /// `step` defaults to [`default_step`]. With `pyramid` enabled, coarser
    /// levels double the window and step size while the window still fits in
    /// the region.
    pub fn new(
        extent: PixelRect,
        region: PixelRect,
        window: Size,
        step: Option<Size>,
        pyramid: bool,
    ) -> Result<Self> {
        if !window.is_positive() {
            return Err(Error::config(format!(
                "window size must be positive, got {window}"
            )));
        }
        let step = step.unwrap_or_else(|| default_step(window));
        if !step.is_positive() {
            return Err(Error::config(format!(
                "step size must be positive, got {step}"
            )));
        }
        if step.width > window.width || step.height > window.height {
            warn!(
                "Step size {} exceeds window size {}; the region will not be fully covered",
                step, window
            );
        }

        let region = extent
            .intersection(&region)
            .ok_or_else(|| Error::EmptyRegion {
                region: region.to_string(),
            })?;

        let mut grids = Vec::new();
        let mut factor = 1_u32;
        loop {
            let window_size = window.scaled(factor);
            let step_size = step.scaled(factor);
            let fits = window_size.width <= region.width && window_size.height <= region.height;
            if !grids.is_empty() && !fits {
                break;
            }

            let level = PyramidLevel {
                index: grids.len(),
                scale: f64::from(factor),
                window_size,
                step_size,
            };
            let grid = LevelGrid {
                level,
                columns: axis_offsets(region.width, window_size.width, step_size.width),
                rows: axis_offsets(region.height, window_size.height, step_size.height),
            };
            debug!(
                "Pyramid level {}: window {}, step {}, {} windows",
                level.index,
                window_size,
                step_size,
                grid.len()
            );
            grids.push(grid);

            if !pyramid {
                break;
            }
            match factor.checked_mul(PYRAMID_SCALE_FACTOR) {
                Some(next) if window.width.checked_mul(next).is_some()
                    && window.height.checked_mul(next).is_some() =>
                {
                    factor = next;
                }
                _ => break,
            }
        }

        Ok(Self { region, grids })
    }

    /// Region covered by the plan, clipped to the image extent.
    pub fn region(&self) -> PixelRect {
        self.region
    }

    /// Pyramid levels, finest first.
    pub fn levels(&self) -> impl Iterator<Item = &PyramidLevel> {
        self.grids.iter().map(|g| &g.level)
    }

    /// Total number of windows across all levels.
    pub fn len(&self) -> usize {
        self.grids.iter().map(LevelGrid::len).sum()
    }

    /// The plan has no windows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over every window with its pyramid level.
    pub fn iter(&self) -> WindowIter<'_> {
        WindowIter {
            region: self.region,
            grids: &self.grids,
            level: 0,
            position: 0,
        }
    }
}

impl<'a> IntoIterator for &'a WindowPlanner {
    type Item = (Window, PyramidLevel);
    type IntoIter = WindowIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over a [`WindowPlanner`].
#[derive(Debug, Clone)]
pub struct WindowIter<'a> {
    region: PixelRect,
    grids: &'a [LevelGrid],
    level: usize,
    position: usize,
}

impl WindowIter<'_> {
    fn remaining(&self) -> usize {
        self.grids
            .iter()
            .skip(self.level)
            .map(LevelGrid::len)
            .sum::<usize>()
            .saturating_sub(self.position)
    }
}

impl Iterator for WindowIter<'_> {
    type Item = (Window, PyramidLevel);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let grid = self.grids.get(self.level)?;
            if self.position >= grid.len() {
                self.level += 1;
                self.position = 0;
                continue;
            }

            let row = self.position / grid.columns.len();
            let col = self.position % grid.columns.len();
            self.position += 1;

            let level = grid.level;
            let window = Window::new(
                self.region.x + i64::from(grid.columns[col]),
                self.region.y + i64::from(grid.rows[row]),
                level.window_size.width,
                level.window_size.height,
                level.scale,
            );
            return Some((window, level));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WindowIter<'_> {}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::geo::PixelPoint;

    fn image(w: u32, h: u32) -> PixelRect {
        PixelRect::new(0, 0, w, h)
    }

    #[test]
    fn test_grid_of_49_windows() {
        let plan = WindowPlanner::new(
            image(1024, 1024),
            image(1024, 1024),
            Size::square(256),
            Some(Size::square(128)),
            false,
        )
        .unwrap();
        assert_eq!(plan.len(), 49);
        let windows: Vec<_> = plan.iter().map(|(w, _)| w).collect();
        assert_eq!(windows.len(), 49);
        assert_eq!(windows[0].rect, PixelRect::new(0, 0, 256, 256));
        assert_eq!(windows[48].rect, PixelRect::new(768, 768, 256, 256));
    }

    #[test]
    fn test_plan_is_restartable() {
        let plan = WindowPlanner::new(
            image(500, 300),
            image(500, 300),
            Size::new(64, 32),
            Some(Size::new(48, 16)),
            true,
        )
        .unwrap();
        let first: Vec<_> = plan.iter().collect();
        let second: Vec<_> = plan.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), plan.len());
    }

    #[test]
    fn test_region_offset_is_applied() {
        let plan = WindowPlanner::new(
            image(1000, 1000),
            PixelRect::new(100, 200, 300, 300),
            Size::square(100),
            Some(Size::square(100)),
            false,
        )
        .unwrap();
        let first = plan.iter().next().unwrap().0;
        assert_eq!((first.rect.x, first.rect.y), (100, 200));
        assert_eq!(plan.len(), 9);
    }

    #[test]
    fn test_coverage_when_step_not_larger_than_window() {
        let region = PixelRect::new(0, 0, 1001, 517);
        let plan = WindowPlanner::new(
            image(1001, 517),
            region,
            Size::new(256, 128),
            Some(Size::new(200, 100)),
            false,
        )
        .unwrap();
        let windows: Vec<_> = plan.iter().map(|(w, _)| w.rect).collect();
        for y in (0..517).step_by(7) {
            for x in (0..1001).step_by(7) {
                let p = PixelPoint::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                assert!(windows.iter().any(|w| w.contains(p)), "gap at {x},{y}");
            }
        }
        let corner = PixelPoint::new(1000.5, 516.5);
        assert!(windows.iter().any(|w| w.contains(corner)));
    }

    #[test]
    fn test_windows_start_inside_region_when_step_exceeds_window() {
        let plan = WindowPlanner::new(
            image(100, 100),
            image(100, 100),
            Size::square(10),
            Some(Size::square(200)),
            false,
        )
        .unwrap();
        assert_eq!(plan.len(), 1);

        let plan = WindowPlanner::new(
            image(1000, 10),
            image(1000, 10),
            Size::square(10),
            Some(Size::new(300, 10)),
            false,
        )
        .unwrap();
        let xs: Vec<_> = plan.iter().map(|(w, _)| w.rect.x).collect();
        assert_eq!(xs, vec![0, 300, 600, 900]);
    }

    #[test]
    fn test_small_region_gets_single_partial_window() {
        let plan = WindowPlanner::new(
            image(50, 40),
            image(50, 40),
            Size::square(256),
            Some(Size::square(8)),
            true,
        )
        .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.levels().count(), 1);
    }

    #[test]
    fn test_pyramid_levels_double_until_window_exceeds_region() {
        let plan = WindowPlanner::new(
            image(1024, 1024),
            image(1024, 1024),
            Size::square(256),
            Some(Size::square(128)),
            true,
        )
        .unwrap();
        let levels: Vec<_> = plan.levels().copied().collect();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[1].scale, 2.0);
        assert_eq!(levels[1].window_size, Size::square(512));
        assert_eq!(levels[2].window_size, Size::square(1024));
        assert_eq!(levels[2].step_size, Size::square(512));
        // 49 + 3x3 + 1
        assert_eq!(plan.len(), 59);

        let scales: Vec<f64> = plan.iter().map(|(w, _)| w.scale).collect();
        assert!(scales.windows(2).all(|s| s[0] <= s[1]), "finest level first");
    }

    #[test]
    fn test_default_step_is_log2_of_largest_dimension() {
        assert_eq!(default_step(Size::square(256)), Size::square(8));
        assert_eq!(default_step(Size::new(100, 300)), Size::square(8));
        assert_eq!(default_step(Size::square(1)), Size::square(1));
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        let err = WindowPlanner::new(image(10, 10), image(10, 10), Size::new(0, 5), None, false)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);

        let err = WindowPlanner::new(
            image(10, 10),
            image(10, 10),
            Size::square(5),
            Some(Size::new(1, 0)),
            false,
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_region_outside_extent_is_empty() {
        let err = WindowPlanner::new(
            image(100, 100),
            PixelRect::new(200, 200, 50, 50),
            Size::square(10),
            None,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyRegion { .. }));
    }
}
