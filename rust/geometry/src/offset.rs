// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon and polyline offsetting.
//!
//! An offset is built as a Minkowski-style sweep: every boundary edge
//! contributes a rectangle of width `|distance|` on the offset side and every
//! vertex whose turn opens a gap on that side contributes a join piece. The
//! pieces are then unioned with (growing) or subtracted from (shrinking) the
//! input using the boolean engine.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::bool2d::{difference, ensure_ccw, ensure_cw, union, union_all, BooleanOptions, FillRule, Polygon2d};
use crate::curve::{Point2d, DEFAULT_DISCRETE_TOLERANCE, MAX_DISCRETE_SEGMENTS};

const EPSILON: f64 = 1e-12;

/// Corner treatment where two offset edges meet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    /// Sharp corner, squared off beyond `miter_limit`
    #[default]
    Miter,
    /// Corner cut perpendicular to the bisector at the offset distance
    Square,
    /// Circular arc approximated within `arc_tolerance`
    Round,
}

/// Treatment of path ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndType {
    /// Path is a closed polygon; the area is offset
    #[default]
    Polygon,
    /// Path is closed and offset as a band on both sides
    Joined,
    /// Flat end at the path endpoint
    Butt,
    /// Flat end extended by the offset distance
    Square,
    /// Semicircular end
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OffsetOptions {
    pub join: JoinType,
    pub end: EndType,
    /// Maximum miter length as a multiple of the offset distance
    pub miter_limit: f64,
    /// Maximum deviation of round joins from the true arc
    pub arc_tolerance: f64,
}

impl Default for OffsetOptions {
    fn default() -> Self {
        Self {
            join: JoinType::Miter,
            end: EndType::Polygon,
            miter_limit: 2.0,
            arc_tolerance: DEFAULT_DISCRETE_TOLERANCE,
        }
    }
}

impl OffsetOptions {
    pub fn with_join(mut self, join: JoinType) -> Self {
        self.join = join;
        self
    }

    pub fn with_end(mut self, end: EndType) -> Self {
        self.end = end;
        self
    }
}

/// Offsets closed polygons outward (`distance > 0`) or inward (`distance < 0`).
pub fn offset(polygons: &[Polygon2d], distance: f64, options: &OffsetOptions) -> Vec<Polygon2d> {
    let normalized: Vec<Polygon2d> = polygons
        .iter()
        .map(|p| Polygon2d {
            outer: ensure_ccw(&p.outer),
            holes: p.holes.iter().map(|h| ensure_cw(h)).collect(),
        })
        .collect();
    let base = union_all(&normalized, FillRule::NonZero);
    if base.is_empty() || !distance.is_finite() || distance.abs() < EPSILON {
        return base;
    }

    let side = distance.signum();
    let radius = distance.abs();
    let mut pieces = Vec::new();
    for polygon in &base {
        for contour in polygon.contours() {
            ring_pieces(contour, side, radius, options, &mut pieces);
        }
    }
    let pieces: Vec<Polygon2d> = pieces.into_iter().map(Polygon2d::new).collect();

    let opts = BooleanOptions::uniform(FillRule::NonZero);
    if side > 0.0 {
        union(&base, &pieces, &opts)
    } else {
        difference(&base, &pieces, &opts)
    }
}

/// Offsets open polylines into closed areas `|distance|` wide on each side.
///
/// With [`EndType::Polygon`] each path is treated as a closed polygon and
/// offset as an area instead.
pub fn offset_paths(paths: &[Vec<Point2d>], distance: f64, options: &OffsetOptions) -> Vec<Polygon2d> {
    if options.end == EndType::Polygon {
        let polygons: Vec<Polygon2d> = paths.iter().map(|p| Polygon2d::new(p.clone())).collect();
        return offset(&polygons, distance, options);
    }
    let radius = distance.abs();
    if !radius.is_finite() || radius < EPSILON {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    for path in paths {
        let points = dedup(path);
        match points.len() {
            0 => {}
            1 => match options.end {
                EndType::Round => pieces.push(disc(points[0], radius, options.arc_tolerance)),
                EndType::Square => {
                    let c = points[0];
                    pieces.push(ensure_ccw(&[
                        Point2d::new(c.x - radius, c.y - radius),
                        Point2d::new(c.x + radius, c.y - radius),
                        Point2d::new(c.x + radius, c.y + radius),
                        Point2d::new(c.x - radius, c.y + radius),
                    ]));
                }
                _ => {}
            },
            _ if options.end == EndType::Joined => {
                ring_pieces(&points, 1.0, radius, options, &mut pieces);
                ring_pieces(&points, -1.0, radius, options, &mut pieces);
            }
            _ => open_path_pieces(&points, radius, options, &mut pieces),
        }
    }

    let pieces: Vec<Polygon2d> = pieces.into_iter().map(Polygon2d::new).collect();
    union_all(&pieces, FillRule::NonZero)
}

/// Removes small protrusions narrower than `2 * distance`.
pub fn morphological_open(polygons: &[Polygon2d], distance: f64, options: &OffsetOptions) -> Vec<Polygon2d> {
    let d = distance.abs();
    offset(&offset(polygons, -d, options), d, options)
}

/// Closes gaps and notches narrower than `2 * distance`.
pub fn morphological_close(polygons: &[Polygon2d], distance: f64, options: &OffsetOptions) -> Vec<Polygon2d> {
    let d = distance.abs();
    offset(&offset(polygons, d, options), -d, options)
}

fn dedup(path: &[Point2d]) -> Vec<Point2d> {
    let mut points: Vec<Point2d> = Vec::with_capacity(path.len());
    for p in path {
        if !p.x.is_finite() || !p.y.is_finite() {
            continue;
        }
        if points.last().map_or(true, |q| (p - q).norm() > EPSILON) {
            points.push(*p);
        }
    }
    points
}

fn right_normal(u: &Vector2<f64>) -> Vector2<f64> {
    Vector2::new(u.y, -u.x)
}

fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

fn rotate(v: &Vector2<f64>, angle: f64) -> Vector2<f64> {
    let (s, c) = angle.sin_cos();
    Vector2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

fn edge_band(p: Point2d, q: Point2d, n: &Vector2<f64>, radius: f64) -> Vec<Point2d> {
    ensure_ccw(&[p, q, q + n * radius, p + n * radius])
}

/// Edge bands and joins for a closed ring on one side.
///
/// `side > 0` is the right-hand side of the traversal direction, which is
/// the outside for anticlockwise outers and clockwise holes.
fn ring_pieces(
    contour: &[Point2d],
    side: f64,
    radius: f64,
    options: &OffsetOptions,
    pieces: &mut Vec<Vec<Point2d>>,
) {
    let mut points = dedup(contour);
    while points.len() > 1 && (points[0] - points[points.len() - 1]).norm() <= EPSILON {
        points.pop();
    }
    let n = points.len();
    if n < 2 {
        return;
    }
    let directions: Vec<Vector2<f64>> = (0..n)
        .map(|i| (points[(i + 1) % n] - points[i]).normalize())
        .collect();

    for i in 0..n {
        let normal = right_normal(&directions[i]) * side;
        pieces.push(edge_band(points[i], points[(i + 1) % n], &normal, radius));
    }
    for i in 0..n {
        let u1 = directions[(i + n - 1) % n];
        let u2 = directions[i];
        if let Some(join) = join_piece(points[i], &u1, &u2, side, radius, options) {
            pieces.push(join);
        }
    }
}

fn open_path_pieces(points: &[Point2d], radius: f64, options: &OffsetOptions, pieces: &mut Vec<Vec<Point2d>>) {
    let n = points.len();
    let directions: Vec<Vector2<f64>> = points.windows(2).map(|w| (w[1] - w[0]).normalize()).collect();

    for (i, u) in directions.iter().enumerate() {
        let normal = right_normal(u);
        let (p, q) = (points[i], points[i + 1]);
        pieces.push(ensure_ccw(&[p - normal * radius, q - normal * radius, q + normal * radius, p + normal * radius]));
    }
    for i in 1..n - 1 {
        let (u1, u2) = (directions[i - 1], directions[i]);
        // The gap opens on the outside of the turn.
        let side = if cross(&u1, &u2) >= 0.0 { 1.0 } else { -1.0 };
        if let Some(join) = join_piece(points[i], &u1, &u2, side, radius, options) {
            pieces.push(join);
        }
    }

    let first = directions[0];
    let last = directions[directions.len() - 1];
    match options.end {
        EndType::Square => {
            pieces.push(end_extension(points[0], &(-first), radius));
            pieces.push(end_extension(points[n - 1], &last, radius));
        }
        EndType::Round => {
            pieces.push(disc(points[0], radius, options.arc_tolerance));
            pieces.push(disc(points[n - 1], radius, options.arc_tolerance));
        }
        _ => {}
    }
}

fn end_extension(end: Point2d, outward: &Vector2<f64>, radius: f64) -> Vec<Point2d> {
    let normal = right_normal(outward);
    let tip = end + outward * radius;
    ensure_ccw(&[end - normal * radius, tip - normal * radius, tip + normal * radius, end + normal * radius])
}

fn arc_steps(angle: f64, radius: f64, tolerance: f64) -> usize {
    let tolerance = if tolerance > 0.0 { tolerance } else { DEFAULT_DISCRETE_TOLERANCE };
    let step = if tolerance >= radius {
        std::f64::consts::FRAC_PI_2
    } else {
        2.0 * (1.0 - tolerance / radius).acos()
    };
    ((angle.abs() / step).ceil() as usize).clamp(1, MAX_DISCRETE_SEGMENTS)
}

fn disc(center: Point2d, radius: f64, tolerance: f64) -> Vec<Point2d> {
    let steps = arc_steps(std::f64::consts::TAU, radius, tolerance).max(8);
    (0..steps)
        .map(|k| {
            let a = std::f64::consts::TAU * k as f64 / steps as f64;
            Point2d::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect()
}

/// Join polygon at `v` between incoming direction `u1` and outgoing `u2`,
/// or `None` when the offset side has no gap at this vertex.
fn join_piece(
    v: Point2d,
    u1: &Vector2<f64>,
    u2: &Vector2<f64>,
    side: f64,
    radius: f64,
    options: &OffsetOptions,
) -> Option<Vec<Point2d>> {
    let turn = cross(u1, u2);
    let reversal = turn.abs() <= EPSILON && u1.dot(u2) < 0.0;
    if turn * side <= EPSILON && !reversal {
        return None;
    }

    let n1 = right_normal(u1) * side;
    let n2 = right_normal(u2) * side;
    let sum = n1 + n2;
    let bisector = if sum.norm() <= EPSILON { *u1 } else { sum.normalize() };

    let mut points: SmallVec<[Point2d; 8]> = SmallVec::new();
    points.push(v);
    points.push(v + n1 * radius);
    match options.join {
        JoinType::Round => {
            let angle = if reversal {
                std::f64::consts::PI * side
            } else {
                cross(&n1, &n2).atan2(n1.dot(&n2))
            };
            let steps = arc_steps(angle, radius, options.arc_tolerance);
            for k in 1..steps {
                let dir = rotate(&n1, angle * k as f64 / steps as f64);
                points.push(v + dir * radius);
            }
        }
        JoinType::Miter => {
            let cos_half = n1.dot(&bisector);
            if cos_half > EPSILON && 1.0 / cos_half <= options.miter_limit {
                points.push(v + bisector * (radius / cos_half));
            } else {
                push_square_corner(&mut points, v, u1, u2, &n1, &n2, &bisector, radius);
            }
        }
        JoinType::Square => {
            push_square_corner(&mut points, v, u1, u2, &n1, &n2, &bisector, radius);
        }
    }
    points.push(v + n2 * radius);

    Some(ensure_ccw(&points))
}

#[allow(clippy::too_many_arguments)]
fn push_square_corner(
    points: &mut SmallVec<[Point2d; 8]>,
    v: Point2d,
    u1: &Vector2<f64>,
    u2: &Vector2<f64>,
    n1: &Vector2<f64>,
    n2: &Vector2<f64>,
    bisector: &Vector2<f64>,
    radius: f64,
) {
    // Intersect both offset edges with the cut line {x : (x - v)·b = radius}.
    let along1 = u1.dot(bisector).max(EPSILON);
    let along2 = (-u2.dot(bisector)).max(EPSILON);
    let s1 = radius * (1.0 - n1.dot(bisector)) / along1;
    let s2 = radius * (1.0 - n2.dot(bisector)) / along2;
    points.push(v + n1 * radius + u1 * s1);
    points.push(v + n2 * radius - u2 * s2);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::total_area;
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
    fn test_miter_grow_keeps_square_corners() {
        let grown = offset(&[rect(0.0, 0.0, 10.0, 10.0)], 1.0, &OffsetOptions::default());
        assert_eq!(grown.len(), 1);
        assert_relative_eq!(total_area(&grown), 144.0, epsilon = 1e-6);
    }

    #[test]
    fn test_round_grow_adds_quarter_discs() {
        let opts = OffsetOptions::default().with_join(JoinType::Round);
        let grown = offset(&[rect(0.0, 0.0, 10.0, 10.0)], 1.0, &opts);
        let expected = 100.0 + 40.0 + std::f64::consts::PI;
        assert_relative_eq!(total_area(&grown), expected, epsilon = 0.05);
    }

    #[test]
    fn test_square_join_chamfers_corners() {
        let opts = OffsetOptions::default().with_join(JoinType::Square);
        let grown = offset(&[rect(0.0, 0.0, 10.0, 10.0)], 1.0, &opts);
        let chamfer = (2f64.sqrt() - 1.0).powi(2);
        assert_relative_eq!(total_area(&grown), 144.0 - 4.0 * chamfer, epsilon = 1e-6);
    }

    #[test]
    fn test_shrink_and_vanish() {
        let square = [rect(0.0, 0.0, 10.0, 10.0)];
        let shrunk = offset(&square, -1.0, &OffsetOptions::default());
        assert_relative_eq!(total_area(&shrunk), 64.0, epsilon = 1e-6);
        assert!(offset(&square, -6.0, &OffsetOptions::default()).is_empty());
    }

    #[test]
    fn test_grow_shrinks_holes() {
        let mut ring = rect(0.0, 0.0, 10.0, 10.0);
        ring.add_hole(vec![
            Point2d::new(3.0, 3.0),
            Point2d::new(3.0, 7.0),
            Point2d::new(7.0, 7.0),
            Point2d::new(7.0, 3.0),
        ]);
        let grown = offset(&[ring], 1.0, &OffsetOptions::default());
        // 12x12 outside, 2x2 hole left
        assert_relative_eq!(total_area(&grown), 140.0, epsilon = 1e-6);
    }

    #[test]
    fn test_open_path_end_types() {
        let path = vec![vec![Point2d::new(0.0, 0.0), Point2d::new(10.0, 0.0)]];
        let butt = offset_paths(&path, 0.5, &OffsetOptions::default().with_end(EndType::Butt));
        assert_relative_eq!(total_area(&butt), 10.0, epsilon = 1e-6);
        let square = offset_paths(&path, 0.5, &OffsetOptions::default().with_end(EndType::Square));
        assert_relative_eq!(total_area(&square), 11.0, epsilon = 1e-6);
        let round = offset_paths(&path, 0.5, &OffsetOptions::default().with_end(EndType::Round));
        assert_relative_eq!(total_area(&round), 10.0 + std::f64::consts::FRAC_PI_4, epsilon = 0.01);
    }

    #[test]
    fn test_open_path_corner_is_mitered() {
        let path = vec![vec![
            Point2d::new(0.0, 0.0),
            Point2d::new(10.0, 0.0),
            Point2d::new(10.0, 10.0),
        ]];
        let band = offset_paths(&path, 0.5, &OffsetOptions::default().with_end(EndType::Butt));
        assert_eq!(band.len(), 1);
        assert_relative_eq!(total_area(&band), 20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_close_bridges_gap() {
        let pieces = [rect(0.0, 0.0, 1.0, 1.0), rect(1.5, 0.0, 2.5, 1.0)];
        let closed = morphological_close(&pieces, 0.5, &OffsetOptions::default());
        assert_eq!(closed.len(), 1);
        assert_relative_eq!(total_area(&closed), 2.5, epsilon = 1e-6);
    }

    #[test]
    fn test_open_removes_sliver() {
        let body = union_all(
            &[rect(0.0, 0.0, 10.0, 10.0), rect(10.0, 5.0, 15.0, 5.1)],
            FillRule::NonZero,
        );
        assert_eq!(body.len(), 1);
        let opened = morphological_open(&body, 0.5, &OffsetOptions::default());
        assert_relative_eq!(total_area(&opened), 100.0, epsilon = 1e-6);
    }
}
