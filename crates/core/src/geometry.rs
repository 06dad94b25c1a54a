//! Point-in-zone containment.

use crate::model::Zone;

/// A position in frame-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// True iff `confidence > threshold` and the point lies inside the zone (bounds inclusive).
#[must_use]
pub fn contains(point: Point, zone: &Zone, confidence: f32, threshold: f32) -> bool {
    if confidence <= threshold {
        return false;
    }
    let rect = zone.rect();
    (rect.x_min..=rect.x_max).contains(&point.x) && (rect.y_min..=rect.y_max).contains(&point.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rect, Rgb, ZoneId};

    fn zone() -> Zone {
        Zone::new(
            ZoneId::new(1),
            "Bin",
            Rect::new(100.0, 100.0, 250.0, 250.0),
            Rgb::default(),
        )
        .unwrap()
    }

    #[test]
    fn inside_point_with_confidence_is_contained() {
        assert!(contains(Point::new(150.0, 200.0), &zone(), 0.9, 0.5));
    }

    #[test]
    fn edges_are_inclusive() {
        let zone = zone();
        assert!(contains(Point::new(100.0, 100.0), &zone, 0.9, 0.5));
        assert!(contains(Point::new(250.0, 250.0), &zone, 0.9, 0.5));
        assert!(!contains(Point::new(250.1, 250.0), &zone, 0.9, 0.5));
        assert!(!contains(Point::new(99.9, 150.0), &zone, 0.9, 0.5));
    }

    #[test]
    fn confidence_must_strictly_exceed_threshold() {
        let zone = zone();
        assert!(!contains(Point::new(150.0, 150.0), &zone, 0.5, 0.5));
        assert!(!contains(Point::new(150.0, 150.0), &zone, 0.1, 0.5));
    }
}
