//! Integer pixel geometry.

use serde::{Deserialize, Serialize};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Square size.
    pub const fn square(edge: u32) -> Self {
        Self::new(edge, edge)
    }

    /// Build from one value (square) or two values (width, height).
    ///
    /// Returns `None` for any other number of values.
    pub fn from_dims(dims: &[u32]) -> Option<Self> {
        match dims {
            [edge] => Some(Self::square(*edge)),
            [width, height] => Some(Self::new(*width, *height)),
            _ => None,
        }
    }

    /// Both dimensions are non-zero.
    pub const fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Largest dimension.
    pub fn max_dim(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Multiply both dimensions.
    pub const fn scaled(&self, factor: u32) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A sub-pixel position in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    /// Column.
    pub x: f64,
    /// Row.
    pub y: f64,
}

impl PixelPoint {
    /// Create a pixel point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned pixel rectangle. May extend past the image edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left column.
    pub x: i64,
    /// Top row.
    pub y: i64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Create a rectangle.
    pub const fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin.
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        self.x + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.y + i64::from(self.height)
    }

    /// Zero width or height.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Area in square pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Dimensions.
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Overlapping part of two rectangles, `None` when they do not overlap.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(Self::new(x0, y0, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    /// Intersection-over-union of two rectangles, in `[0, 1]`.
    pub fn iou(&self, other: &Self) -> f64 {
        let Some(overlap) = self.intersection(other) else {
            return 0.0;
        };
        #[allow(clippy::cast_precision_loss)]
        let inter = overlap.area() as f64;
        #[allow(clippy::cast_precision_loss)]
        let union = self.area() as f64 + other.area() as f64 - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }

    /// Whether a pixel position lies inside the rectangle.
    pub fn contains(&self, point: PixelPoint) -> bool {
        #[allow(clippy::cast_precision_loss)]
        let inside_x = point.x >= self.x as f64 && point.x < self.right() as f64;
        #[allow(clippy::cast_precision_loss)]
        let inside_y = point.y >= self.y as f64 && point.y < self.bottom() as f64;
        inside_x && inside_y
    }

    /// Center position.
    pub fn center(&self) -> PixelPoint {
        #[allow(clippy::cast_precision_loss)]
        PixelPoint::new(
            self.x as f64 + f64::from(self.width) / 2.0,
            self.y as f64 + f64::from(self.height) / 2.0,
        )
    }

    /// Corners in order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [PixelPoint; 4] {
        #[allow(clippy::cast_precision_loss)]
        let (x0, y0, x1, y1) = (
            self.x as f64,
            self.y as f64,
            self.right() as f64,
            self.bottom() as f64,
        );
        [
            PixelPoint::new(x0, y0),
            PixelPoint::new(x1, y0),
            PixelPoint::new(x1, y1),
            PixelPoint::new(x0, y1),
        ]
    }
}

impl std::fmt::Display for PixelRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}x{}]",
            self.x, self.y, self.width, self.height
        )
    }
}
