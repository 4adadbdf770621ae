//! Stroke and point definitions.

mod style;

pub use style::{StyleOptions, parse_color};

use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pressure used when the input device does not report one.
pub const DEFAULT_PRESSURE: f64 = 0.5;

/// Opaque stroke identifier.
pub type StrokeId = String;

/// Generate a fresh stroke identifier.
pub fn new_stroke_id() -> StrokeId {
    Uuid::new_v4().to_string()
}

/// One sampled input point in surface pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InkPoint {
    pub x: f64,
    pub y: f64,
    /// Normalized pressure in `0.0..=1.0`.
    pub pressure: f64,
    pub timestamp_ms: i64,
}

impl InkPoint {
    /// Create a point, clamping pressure into range.
    ///
    /// A missing or non-finite pressure becomes [`DEFAULT_PRESSURE`].
    pub fn new(x: f64, y: f64, pressure: Option<f64>, timestamp_ms: i64) -> Self {
        let pressure = pressure
            .filter(|p| p.is_finite())
            .map_or(DEFAULT_PRESSURE, |p| p.clamp(0.0, 1.0));
        Self {
            x,
            y,
            pressure,
            timestamp_ms,
        }
    }

    /// Position as a kurbo point.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Euclidean distance between the positions of two points.
    pub fn distance(&self, other: &InkPoint) -> f64 {
        self.position().distance(other.position())
    }
}

/// One freehand drawing action: ordered points plus a frozen style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: StrokeId,
    /// Points in input order. Never empty once committed.
    pub points: Vec<InkPoint>,
    pub style: StyleOptions,
    pub created_at_ms: i64,
}

impl Stroke {
    /// Create a stroke starting at `first`.
    pub fn new(first: InkPoint, style: StyleOptions) -> Self {
        Self {
            id: new_stroke_id(),
            points: vec![first],
            style,
            created_at_ms: first.timestamp_ms,
        }
    }

    /// Create from existing points with a given identifier.
    pub fn from_points(
        id: StrokeId,
        points: Vec<InkPoint>,
        style: StyleOptions,
        created_at_ms: i64,
    ) -> Self {
        Self {
            id,
            points,
            style,
            created_at_ms,
        }
    }

    /// Add a point to the stroke.
    pub fn add_point(&mut self, point: InkPoint) {
        self.points.push(point);
    }

    /// Get the number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the stroke has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A stroke with a single point renders as a filled disk.
    pub fn is_dot(&self) -> bool {
        self.points.len() == 1
    }

    /// The last recorded point.
    pub fn last_point(&self) -> Option<&InkPoint> {
        self.points.last()
    }

    /// Bounding box of the centerline, not including the stroke width.
    pub fn bounds(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::ZERO;
        };

        self.points
            .iter()
            .skip(1)
            .fold(Rect::from_points(first.position(), first.position()), |rect, p| {
                rect.union_pt(p.position())
            })
    }

    /// Apply a transform to every point position.
    pub fn transform(&mut self, affine: Affine) {
        for point in &mut self.points {
            let moved = affine * point.position();
            point.x = moved.x;
            point.y = moved.y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> InkPoint {
        InkPoint::new(x, y, Some(0.5), 0)
    }

    #[test]
    fn test_pressure_defaults_and_clamps() {
        assert_eq!(InkPoint::new(0.0, 0.0, None, 0).pressure, DEFAULT_PRESSURE);
        assert_eq!(InkPoint::new(0.0, 0.0, Some(3.0), 0).pressure, 1.0);
        assert_eq!(InkPoint::new(0.0, 0.0, Some(f64::NAN), 0).pressure, DEFAULT_PRESSURE);
    }

    #[test]
    fn test_stroke_starts_with_one_point() {
        let stroke = Stroke::new(pt(1.0, 2.0), StyleOptions::default());
        assert_eq!(stroke.len(), 1);
        assert!(stroke.is_dot());
        assert!(!stroke.id.is_empty());
    }

    #[test]
    fn test_bounds() {
        let mut stroke = Stroke::new(pt(0.0, 0.0), StyleOptions::default());
        stroke.add_point(pt(100.0, 50.0));
        stroke.add_point(pt(50.0, 100.0));

        let bounds = stroke.bounds();
        assert!((bounds.x0).abs() < f64::EPSILON);
        assert!((bounds.y0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 100.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_transform_scales_positions_only() {
        let mut stroke = Stroke::new(InkPoint::new(10.0, 20.0, Some(0.8), 7), StyleOptions::default());
        stroke.transform(Affine::scale_non_uniform(2.0, 0.5));

        let p = stroke.points[0];
        assert_eq!((p.x, p.y), (20.0, 10.0));
        assert_eq!(p.pressure, 0.8);
        assert_eq!(p.timestamp_ms, 7);
    }
}
