//! Viewport and page geometry shared by the locator, positioner and surfaces.

use serde::{Deserialize, Serialize};

/// A point in viewport (client) coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Page scroll offset, added to viewport coordinates to get page coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub x: f64,
    pub y: f64,
}

impl ScrollOffset {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle with inclusive edges, like a DOMRect.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    #[must_use]
    pub fn from_origin_size(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// A collapsed rect has no area; measuring one aborts UI placement.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 && self.height() <= 0.0
    }

    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    /// Euclidean distance from `point` to the closest edge; zero inside.
    #[must_use]
    pub fn distance_to(&self, point: Point) -> f64 {
        let dx = (self.left - point.x).max(0.0).max(point.x - self.right);
        let dy = (self.top - point.y).max(0.0).max(point.y - self.bottom);
        (dx * dx + dy * dy).sqrt()
    }

    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    /// Bounding box of a list of client rects, `None` when the list is empty.
    #[must_use]
    pub fn bounding(rects: &[Rect]) -> Option<Rect> {
        let (first, rest) = rects.split_first()?;
        Some(rest.iter().fold(*first, |acc, r| acc.union(r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_zero_inside_and_on_edges() {
        let rect = Rect::new(10.0, 10.0, 50.0, 30.0);
        assert_eq!(rect.distance_to(Point::new(20.0, 20.0)), 0.0);
        assert_eq!(rect.distance_to(Point::new(10.0, 30.0)), 0.0);
    }

    #[test]
    fn distance_uses_nearest_edge_or_corner() {
        let rect = Rect::new(10.0, 10.0, 50.0, 30.0);
        assert_eq!(rect.distance_to(Point::new(60.0, 20.0)), 10.0);
        assert_eq!(rect.distance_to(Point::new(20.0, 0.0)), 10.0);
        assert_eq!(rect.distance_to(Point::new(53.0, 34.0)), 5.0);
    }

    #[test]
    fn bounding_of_line_fragments() {
        let rects = [
            Rect::new(100.0, 0.0, 200.0, 20.0),
            Rect::new(0.0, 20.0, 40.0, 40.0),
        ];
        assert_eq!(
            Rect::bounding(&rects),
            Some(Rect::new(0.0, 0.0, 200.0, 40.0))
        );
        assert_eq!(Rect::bounding(&[]), None);
    }
}
