// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Area, bound and overlap queries on contours and polygons.

use serde::{Deserialize, Serialize};

use crate::bool2d::{intersection, BooleanOptions, Polygon2d};
use crate::curve::Point2d;

/// Compute the signed area of a 2D contour
/// Positive = counter-clockwise, Negative = clockwise
pub fn signed_area(contour: &[Point2d]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = contour.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i].x * contour[j].y;
        area -= contour[j].x * contour[i].y;
    }

    area * 0.5
}

/// Net area of a polygon: outer area minus the area of its holes.
pub fn area(polygon: &Polygon2d) -> f64 {
    let outer = signed_area(&polygon.outer).abs();
    let holes: f64 = polygon.holes.iter().map(|h| signed_area(h).abs()).sum();
    (outer - holes).max(0.0)
}

/// Total net area of a polygon set.
pub fn total_area(polygons: &[Polygon2d]) -> f64 {
    polygons.iter().map(area).sum()
}

/// Area shared by two polygons.
pub fn overlap_area(a: &Polygon2d, b: &Polygon2d) -> f64 {
    let shared = intersection(
        std::slice::from_ref(a),
        std::slice::from_ref(b),
        &BooleanOptions::default(),
    );
    total_area(&shared)
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound2d {
    pub min: Point2d,
    pub max: Point2d,
}

impl Bound2d {
    /// An inverted bound that any point expands.
    pub fn empty() -> Self {
        Self {
            min: Point2d::new(f64::INFINITY, f64::INFINITY),
            max: Point2d::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: &[Point2d]) -> Self {
        let mut bound = Self::empty();
        for p in points {
            bound.expand(p);
        }
        bound
    }

    pub fn expand(&mut self, p: &Point2d) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point2d {
        nalgebra::center(&self.min, &self.max)
    }

    /// Check if two bounding boxes overlap
    pub fn overlaps(&self, other: &Bound2d) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// Bounding box of a polygon's outer boundary.
pub fn bound(polygon: &Polygon2d) -> Bound2d {
    Bound2d::from_points(&polygon.outer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point2d> {
        vec![
            Point2d::new(x0, y0),
            Point2d::new(x1, y0),
            Point2d::new(x1, y1),
            Point2d::new(x0, y1),
        ]
    }

    #[test]
    fn signed_area_follows_winding() {
        let ccw = rect(0.0, 0.0, 1.0, 1.0);
        let cw: Vec<_> = ccw.iter().rev().cloned().collect();
        assert_relative_eq!(signed_area(&ccw), 1.0);
        assert_relative_eq!(signed_area(&cw), -1.0);
    }

    #[test]
    fn area_subtracts_holes() {
        let mut p = Polygon2d::new(rect(0.0, 0.0, 10.0, 10.0));
        p.add_hole(rect(2.0, 2.0, 4.0, 4.0));
        assert_relative_eq!(area(&p), 96.0);
    }

    #[test]
    fn bound_has_center() {
        let b = bound(&Polygon2d::new(rect(-2.0, 0.0, 4.0, 2.0)));
        assert_relative_eq!(b.center().x, 1.0);
        assert_relative_eq!(b.center().y, 1.0);
        assert_relative_eq!(b.width(), 6.0);
        assert!(Bound2d::empty().is_empty());
    }

    #[test]
    fn overlap_of_shifted_squares() {
        let a = Polygon2d::new(rect(0.0, 0.0, 2.0, 2.0));
        let b = Polygon2d::new(rect(1.0, 1.0, 3.0, 3.0));
        assert_relative_eq!(overlap_area(&a, &b), 1.0, epsilon = 1e-9);
        let far = Polygon2d::new(rect(5.0, 5.0, 6.0, 6.0));
        assert_relative_eq!(overlap_area(&a, &far), 0.0);
    }
}
