// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Polygon Boolean Operations
//!
//! Stateless union / difference / intersection / xor over polygons with
//! holes, backed by the i_overlay crate. Inputs are never mutated; outputs
//! are normalized so that outer boundaries run counter-clockwise and holes
//! run clockwise. A result with no area is an empty vector, not an error.

use i_overlay::core::fill_rule::FillRule as OverlayFillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use serde::{Deserialize, Serialize};

use crate::curve::{Line2d, Point2d};
use crate::measure::signed_area;

/// Minimum area threshold - polygons smaller than this are considered degenerate
const MIN_AREA_THRESHOLD: f64 = 1e-10;

/// i_overlay path format
type Path = Vec<[f64; 2]>;

/// Polygon with optional holes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon2d {
    /// Outer boundary
    pub outer: Vec<Point2d>,
    /// Holes
    pub holes: Vec<Vec<Point2d>>,
}

impl Polygon2d {
    pub fn new(outer: Vec<Point2d>) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    pub fn with_holes(outer: Vec<Point2d>, holes: Vec<Vec<Point2d>>) -> Self {
        Self { outer, holes }
    }

    pub fn add_hole(&mut self, hole: Vec<Point2d>) {
        self.holes.push(hole);
    }

    /// Outer boundary followed by the holes.
    pub fn contours(&self) -> impl Iterator<Item = &Vec<Point2d>> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }
}

/// Rule deciding which parts of a self-overlapping path set are filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillRule {
    #[default]
    EvenOdd,
    NonZero,
    Positive,
    Negative,
}

impl From<FillRule> for OverlayFillRule {
    fn from(rule: FillRule) -> Self {
        match rule {
            FillRule::EvenOdd => OverlayFillRule::EvenOdd,
            FillRule::NonZero => OverlayFillRule::NonZero,
            FillRule::Positive => OverlayFillRule::Positive,
            FillRule::Negative => OverlayFillRule::Negative,
        }
    }
}

/// Fill rules applied to the subject and clip sets independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BooleanOptions {
    pub subject_fill: FillRule,
    pub clip_fill: FillRule,
}

impl BooleanOptions {
    pub fn new(subject_fill: FillRule, clip_fill: FillRule) -> Self {
        Self {
            subject_fill,
            clip_fill,
        }
    }

    /// Same fill rule for both sets.
    pub fn uniform(fill: FillRule) -> Self {
        Self::new(fill, fill)
    }
}

/// Boolean operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOp {
    Union,
    Difference,
    Intersection,
    Xor,
}

impl From<BooleanOp> for OverlayRule {
    fn from(op: BooleanOp) -> Self {
        match op {
            BooleanOp::Union => OverlayRule::Union,
            BooleanOp::Difference => OverlayRule::Difference,
            BooleanOp::Intersection => OverlayRule::Intersect,
            BooleanOp::Xor => OverlayRule::Xor,
        }
    }
}

/// Runs a boolean operation between two polygon sets.
///
/// Each set is first resolved on its own with its fill rule, so that the
/// subject's and the clip's self-overlaps are interpreted independently.
pub fn boolean(
    op: BooleanOp,
    subject: &[Polygon2d],
    clip: &[Polygon2d],
    options: &BooleanOptions,
) -> Vec<Polygon2d> {
    let subject = resolve_paths(polygons_to_paths(subject), options.subject_fill);
    let clip = resolve_paths(polygons_to_paths(clip), options.clip_fill);

    if subject.is_empty() && clip.is_empty() {
        return Vec::new();
    }

    // Both sets are now free of self-overlap, so even-odd is exact for them.
    let result = subject.overlay(&clip, op.into(), OverlayFillRule::EvenOdd);
    shapes_to_polygons(&result)
}

pub fn union(subject: &[Polygon2d], clip: &[Polygon2d], options: &BooleanOptions) -> Vec<Polygon2d> {
    boolean(BooleanOp::Union, subject, clip, options)
}

pub fn difference(
    subject: &[Polygon2d],
    clip: &[Polygon2d],
    options: &BooleanOptions,
) -> Vec<Polygon2d> {
    boolean(BooleanOp::Difference, subject, clip, options)
}

pub fn intersection(
    subject: &[Polygon2d],
    clip: &[Polygon2d],
    options: &BooleanOptions,
) -> Vec<Polygon2d> {
    boolean(BooleanOp::Intersection, subject, clip, options)
}

pub fn xor(subject: &[Polygon2d], clip: &[Polygon2d], options: &BooleanOptions) -> Vec<Polygon2d> {
    boolean(BooleanOp::Xor, subject, clip, options)
}

/// Merges a single polygon set into non-overlapping polygons.
pub fn union_all(polygons: &[Polygon2d], fill: FillRule) -> Vec<Polygon2d> {
    boolean(BooleanOp::Union, polygons, &[], &BooleanOptions::uniform(fill))
}

/// Removes near-duplicate and collinear vertices closer than `tolerance`,
/// dropping contours that collapse below three points or `tolerance²` area.
/// A polygon whose outer boundary collapses is dropped entirely.
pub fn clean(polygons: &[Polygon2d], tolerance: f64) -> Vec<Polygon2d> {
    polygons
        .iter()
        .filter_map(|p| {
            let outer = clean_contour(&p.outer, tolerance)?;
            let holes = p
                .holes
                .iter()
                .filter_map(|h| clean_contour(h, tolerance))
                .collect();
            Some(Polygon2d { outer, holes })
        })
        .collect()
}

/// Cleans a single contour; `None` if it degenerates.
pub fn clean_contour(contour: &[Point2d], tolerance: f64) -> Option<Vec<Point2d>> {
    let tolerance = tolerance.max(0.0);
    let mut points: Vec<Point2d> = Vec::with_capacity(contour.len());
    for p in contour {
        if points.last().map_or(true, |q| (p - q).norm() > tolerance) {
            points.push(*p);
        }
    }
    while points.len() > 1 && (points[0] - points[points.len() - 1]).norm() <= tolerance {
        points.pop();
    }

    loop {
        let before = points.len();
        let mut i = 0;
        while points.len() >= 3 && i < points.len() {
            let n = points.len();
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            if Line2d::new(prev, next).distance_to(&points[i]) <= tolerance {
                points.remove(i);
            } else {
                i += 1;
            }
        }
        if points.len() == before {
            break;
        }
    }

    if points.len() < 3 || signed_area(&points).abs() <= tolerance * tolerance {
        return None;
    }
    Some(points)
}

/// Check if a contour is valid (has area, not degenerate)
pub fn is_valid_contour(contour: &[Point2d]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    signed_area(contour).abs() > MIN_AREA_THRESHOLD
}

/// Ensure contour has counter-clockwise winding (positive area)
pub fn ensure_ccw(contour: &[Point2d]) -> Vec<Point2d> {
    if signed_area(contour) < 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Ensure contour has clockwise winding (for holes)
pub fn ensure_cw(contour: &[Point2d]) -> Vec<Point2d> {
    if signed_area(contour) > 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Check if a point is inside a contour using ray casting
pub fn point_in_contour(point: &Point2d, contour: &[Point2d]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = contour.len();

    let mut j = n - 1;
    for i in 0..n {
        let pi = &contour[i];
        let pj = &contour[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Check if a point lies on a contour's boundary within `tolerance`
pub fn point_on_contour(point: &Point2d, contour: &[Point2d], tolerance: f64) -> bool {
    let n = contour.len();
    (0..n).any(|i| Line2d::new(contour[i], contour[(i + 1) % n]).distance_to(point) <= tolerance)
}

// ============================================================================
// Internal Helper Functions
// ============================================================================

fn contour_to_path(contour: &[Point2d]) -> Option<Path> {
    if contour.len() < 3 {
        return None;
    }
    if contour.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        tracing::warn!(points = contour.len(), "Dropping contour with non-finite coordinates");
        return None;
    }
    Some(contour.iter().map(|p| [p.x, p.y]).collect())
}

fn polygons_to_paths(polygons: &[Polygon2d]) -> Vec<Path> {
    polygons
        .iter()
        .flat_map(|p| p.contours())
        .filter_map(|c| contour_to_path(c))
        .collect()
}

/// Resolves a path set against its own fill rule, returning flat paths.
fn resolve_paths(paths: Vec<Path>, fill: FillRule) -> Vec<Path> {
    if paths.is_empty() {
        return paths;
    }
    let empty: Vec<Path> = Vec::new();
    paths
        .overlay(&empty, OverlayRule::Union, fill.into())
        .into_iter()
        .flatten()
        .collect()
}

fn path_to_contour(path: &[[f64; 2]]) -> Vec<Point2d> {
    path.iter().map(|p| Point2d::new(p[0], p[1])).collect()
}

/// Convert i_overlay result shapes back to polygons
///
/// i_overlay returns Vec<Vec<Vec<[f64; 2]>>> where:
/// - Outer Vec: list of shapes
/// - Middle Vec: list of contours per shape (first is outer, rest are holes)
/// - Inner Vec: list of points per contour
fn shapes_to_polygons(shapes: &[Vec<Vec<[f64; 2]>>]) -> Vec<Polygon2d> {
    let mut polygons = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let Some(first) = shape.first() else {
            continue;
        };
        let outer = path_to_contour(first);
        if !is_valid_contour(&outer) {
            continue;
        }
        let holes = shape
            .iter()
            .skip(1)
            .map(|c| path_to_contour(c))
            .filter(|h| is_valid_contour(h))
            .map(|h| ensure_cw(&h))
            .collect();
        polygons.push(Polygon2d {
            outer: ensure_ccw(&outer),
            holes,
        });
    }
    polygons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{area, total_area};
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon2d {
        Polygon2d::new(vec![
            Point2d::new(x0, y0),
            Point2d::new(x1, y0),
            Point2d::new(x1, y1),
            Point2d::new(x0, y1),
        ])
    }

    #[test]
    fn test_union_intersection_area_identity() {
        let a = [rect(0.0, 0.0, 4.0, 3.0)];
        let b = [rect(2.0, 1.0, 6.0, 5.0)];
        let opts = BooleanOptions::default();
        let u = total_area(&union(&a, &b, &opts));
        let i = total_area(&intersection(&a, &b, &opts));
        assert_relative_eq!(u + i, area(&a[0]) + area(&b[0]), epsilon = 1e-9);
    }

    #[test]
    fn test_difference_plus_intersection_is_subject() {
        let a = [rect(0.0, 0.0, 4.0, 3.0)];
        let b = [rect(2.0, 1.0, 6.0, 5.0)];
        let opts = BooleanOptions::default();
        let d = difference(&a, &b, &opts);
        let i = intersection(&a, &b, &opts);
        let rebuilt = union(&d, &i, &opts);
        assert_eq!(rebuilt.len(), 1);
        let xor_with_a = xor(&rebuilt, &a, &opts);
        assert!(total_area(&xor_with_a) < 1e-9);
    }

    #[test]
    fn test_difference_inside_creates_hole() {
        let outer = [rect(0.0, 0.0, 10.0, 10.0)];
        let hole = [rect(4.0, 4.0, 6.0, 6.0)];
        let result = difference(&outer, &hole, &BooleanOptions::default());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes.len(), 1);
        assert!(signed_area(&result[0].outer) > 0.0);
        assert!(signed_area(&result[0].holes[0]) < 0.0);
        assert_relative_eq!(area(&result[0]), 96.0, epsilon = 1e-9);
    }

    #[test]
    fn test_disjoint_intersection_is_empty() {
        let result = intersection(
            &[rect(0.0, 0.0, 1.0, 1.0)],
            &[rect(2.0, 2.0, 3.0, 3.0)],
            &BooleanOptions::default(),
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_fill_rules_are_independent() {
        // Two overlapping copies in the subject: even-odd cancels the overlap,
        // non-zero keeps it.
        let subject = [rect(0.0, 0.0, 2.0, 2.0), rect(1.0, 0.0, 3.0, 2.0)];
        let clip = [rect(0.0, 0.0, 3.0, 2.0)];
        let even_odd = intersection(&subject, &clip, &BooleanOptions::new(FillRule::EvenOdd, FillRule::EvenOdd));
        let non_zero = intersection(&subject, &clip, &BooleanOptions::new(FillRule::NonZero, FillRule::EvenOdd));
        assert_relative_eq!(total_area(&even_odd), 4.0, epsilon = 1e-9);
        assert_relative_eq!(total_area(&non_zero), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let a = vec![rect(0.0, 0.0, 1.0, 1.0)];
        let b = vec![rect(0.5, 0.5, 2.0, 2.0)];
        let a_copy = a.clone();
        let _ = union(&a, &b, &BooleanOptions::default());
        assert_eq!(a, a_copy);
    }

    #[test]
    fn test_degenerate_input_yields_empty() {
        let sliver = Polygon2d::new(vec![
            Point2d::new(0.0, 0.0),
            Point2d::new(1.0, 0.0),
            Point2d::new(2.0, 0.0),
        ]);
        assert!(union_all(&[sliver], FillRule::NonZero).is_empty());
    }

    #[test]
    fn test_clean_removes_collinear_and_duplicates() {
        let contour = vec![
            Point2d::new(0.0, 0.0),
            Point2d::new(5.0, 0.0),
            Point2d::new(5.0, 0.0),
            Point2d::new(10.0, 0.0),
            Point2d::new(10.0, 10.0),
            Point2d::new(0.0, 10.0),
        ];
        let cleaned = clean(&[Polygon2d::new(contour)], 1e-6);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].outer.len(), 4);
    }

    #[test]
    fn test_point_in_contour() {
        let contour = rect(0.0, 0.0, 10.0, 10.0).outer;
        assert!(point_in_contour(&Point2d::new(5.0, 5.0), &contour));
        assert!(!point_in_contour(&Point2d::new(15.0, 5.0), &contour));
        assert!(point_on_contour(&Point2d::new(10.0, 5.0), &contour, 1e-9));
    }
}
