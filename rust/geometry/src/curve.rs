// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curve primitives for sketch geometry.
//!
//! Curves are small value types: they are cloned and replaced, never edited
//! in place by consumers. Parameters run from `0.0` at the start point to
//! `1.0` at the end point, and both endpoints are returned exactly at those
//! parameters so loops built from curves stay closed without drift.

use std::f64::consts::TAU;

use nalgebra::{Matrix3, Point2, Point3, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A point in the sketch plane.
pub type Point2d = Point2<f64>;

/// A point in world space.
pub type Point3d = Point3<f64>;

/// Default length tolerance used when callers have no configured value.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default maximum chord deviation for arc discretization.
pub const DEFAULT_DISCRETE_TOLERANCE: f64 = 1e-3;

/// Upper bound on the number of segments a single curve is split into.
pub const MAX_DISCRETE_SEGMENTS: usize = 1024;

/// Slack allowed on curve parameters when testing the `[0, 1]` range.
const PARAM_EPS: f64 = 1e-9;

/// Angles closer than this are treated as identical.
const ANGLE_EPS: f64 = 1e-12;

/// Returns `true` if two points coincide within `tolerance`.
#[inline]
pub fn points_equal(a: &Point2d, b: &Point2d, tolerance: f64) -> bool {
    (a - b).norm() <= tolerance
}

fn check_finite(p: &Point2d, what: &str) -> Result<()> {
    if p.x.is_finite() && p.y.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidCurve(format!("{} is not finite: ({}, {})", what, p.x, p.y)))
    }
}

/// Options controlling curve discretization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiscreteOptions {
    /// Fixed number of segments. Takes precedence over `tolerance`.
    pub segments: Option<usize>,
    /// Maximum chord deviation from the true curve.
    pub tolerance: Option<f64>,
}

impl DiscreteOptions {
    pub fn with_segments(segments: usize) -> Self {
        Self {
            segments: Some(segments),
            tolerance: None,
        }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            segments: None,
            tolerance: Some(tolerance),
        }
    }
}

/// A straight segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line2d {
    start: Point2d,
    end: Point2d,
}

impl Line2d {
    /// Creates a line, rejecting non-finite endpoints.
    pub fn create(start: Point2d, end: Point2d) -> Result<Self> {
        check_finite(&start, "line start")?;
        check_finite(&end, "line end")?;
        Ok(Self { start, end })
    }

    /// Creates a line from endpoints that are already known to be finite.
    pub fn new(start: Point2d, end: Point2d) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> Point2d {
        self.start
    }

    pub fn end(&self) -> Point2d {
        self.end
    }

    pub fn direction(&self) -> Vector2<f64> {
        self.end - self.start
    }

    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    pub fn get_point(&self, t: f64) -> Point2d {
        if t == 0.0 {
            return self.start;
        }
        if t == 1.0 {
            return self.end;
        }
        self.start + self.direction() * t
    }

    /// Parameter of the projection of `point` onto the infinite line.
    pub fn param_at(&self, point: &Point2d) -> f64 {
        let d = self.direction();
        let len_sq = d.norm_squared();
        if len_sq < ANGLE_EPS {
            return 0.0;
        }
        (point - self.start).dot(&d) / len_sq
    }

    pub fn distance_to(&self, point: &Point2d) -> f64 {
        let t = self.param_at(point).clamp(0.0, 1.0);
        (point - self.get_point(t)).norm()
    }

    pub fn is_point_on_curve(&self, point: &Point2d, tolerance: f64) -> bool {
        self.distance_to(point) <= tolerance
    }

    fn h_line_intersections(&self, y: f64) -> Vec<Point2d> {
        let dy = self.end.y - self.start.y;
        if dy.abs() < ANGLE_EPS {
            // Horizontal segments are parallel to the scanline.
            return Vec::new();
        }
        let t = (y - self.start.y) / dy;
        if !(-PARAM_EPS..=1.0 + PARAM_EPS).contains(&t) {
            return Vec::new();
        }
        let t = t.clamp(0.0, 1.0);
        let p = self.get_point(t);
        vec![Point2d::new(p.x, y)]
    }

    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }

    pub fn is_same_curve(&self, other: &Line2d, tolerance: f64) -> bool {
        (points_equal(&self.start, &other.start, tolerance)
            && points_equal(&self.end, &other.end, tolerance))
            || (points_equal(&self.start, &other.end, tolerance)
                && points_equal(&self.end, &other.start, tolerance))
    }
}

/// A circular arc between two points on a circle.
///
/// The arc sweeps from `start` to `end` around `center`, anticlockwise
/// unless `clockwise` is set. Coincident endpoints describe a full circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arc2d {
    center: Point2d,
    radius: f64,
    start: Point2d,
    end: Point2d,
    clockwise: bool,
}

impl Arc2d {
    /// Creates an arc, validating radius and endpoint placement.
    pub fn create(
        center: Point2d,
        radius: f64,
        start: Point2d,
        end: Point2d,
        clockwise: bool,
        tolerance: f64,
    ) -> Result<Self> {
        check_finite(&center, "arc center")?;
        check_finite(&start, "arc start")?;
        check_finite(&end, "arc end")?;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(Error::InvalidCurve(format!("arc radius must be positive, got {}", radius)));
        }
        for (name, p) in [("start", &start), ("end", &end)] {
            let off = ((p - center).norm() - radius).abs();
            if off > tolerance {
                return Err(Error::InvalidCurve(format!(
                    "arc {} point is {:.3e} off the circle",
                    name, off
                )));
            }
        }
        Ok(Self {
            center,
            radius,
            start,
            end,
            clockwise,
        })
    }

    /// Creates an arc from a center, radius and start/end angles (radians).
    pub fn from_angles(
        center: Point2d,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        clockwise: bool,
    ) -> Result<Self> {
        if !start_angle.is_finite() || !end_angle.is_finite() {
            return Err(Error::InvalidCurve("arc angles must be finite".to_string()));
        }
        let start = center + Vector2::new(start_angle.cos(), start_angle.sin()) * radius;
        let end = center + Vector2::new(end_angle.cos(), end_angle.sin()) * radius;
        Self::create(center, radius, start, end, clockwise, DEFAULT_TOLERANCE.max(radius * 1e-12))
    }

    pub fn center(&self) -> Point2d {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn start(&self) -> Point2d {
        self.start
    }

    pub fn end(&self) -> Point2d {
        self.end
    }

    pub fn is_clockwise(&self) -> bool {
        self.clockwise
    }

    fn angle_of(&self, p: &Point2d) -> f64 {
        (p.y - self.center.y).atan2(p.x - self.center.x)
    }

    pub fn start_angle(&self) -> f64 {
        self.angle_of(&self.start)
    }

    pub fn end_angle(&self) -> f64 {
        self.angle_of(&self.end)
    }

    /// Unsigned angle swept from start to end, in `(0, 2π]`.
    pub fn sweep(&self) -> f64 {
        let raw = if self.clockwise {
            self.start_angle() - self.end_angle()
        } else {
            self.end_angle() - self.start_angle()
        };
        let sweep = raw.rem_euclid(TAU);
        if sweep <= ANGLE_EPS {
            TAU
        } else {
            sweep
        }
    }

    pub fn length(&self) -> f64 {
        self.radius * self.sweep()
    }

    pub fn get_point(&self, t: f64) -> Point2d {
        if t == 0.0 {
            return self.start;
        }
        if t == 1.0 {
            return self.end;
        }
        let sign = if self.clockwise { -1.0 } else { 1.0 };
        let angle = self.start_angle() + sign * t * self.sweep();
        self.center + Vector2::new(angle.cos(), angle.sin()) * self.radius
    }

    /// Parameter of the angular position of `point`, measured from the
    /// start in the sweep direction. Values above `1.0` lie off the arc.
    pub fn param_at(&self, point: &Point2d) -> f64 {
        let angle = self.angle_of(point);
        let raw = if self.clockwise {
            self.start_angle() - angle
        } else {
            angle - self.start_angle()
        };
        let mut delta = raw.rem_euclid(TAU);
        if delta > TAU - ANGLE_EPS {
            delta = 0.0;
        }
        delta / self.sweep()
    }

    pub fn is_point_on_curve(&self, point: &Point2d, tolerance: f64) -> bool {
        if ((point - self.center).norm() - self.radius).abs() > tolerance {
            return false;
        }
        if points_equal(point, &self.start, tolerance) || points_equal(point, &self.end, tolerance) {
            return true;
        }
        self.param_at(point) <= 1.0 + PARAM_EPS
    }

    fn h_line_intersections(&self, y: f64) -> Vec<Point2d> {
        let dy = y - self.center.y;
        if dy.abs() > self.radius {
            return Vec::new();
        }
        let dx = (self.radius * self.radius - dy * dy).max(0.0).sqrt();
        let candidates = if dx <= ANGLE_EPS * self.radius.max(1.0) {
            vec![Point2d::new(self.center.x, y)]
        } else {
            vec![
                Point2d::new(self.center.x + dx, y),
                Point2d::new(self.center.x - dx, y),
            ]
        };
        candidates
            .into_iter()
            .filter(|p| {
                let t = self.param_at(p);
                (-PARAM_EPS..=1.0 + PARAM_EPS).contains(&t)
            })
            .collect()
    }

    pub fn reversed(&self) -> Self {
        Self {
            center: self.center,
            radius: self.radius,
            start: self.end,
            end: self.start,
            clockwise: !self.clockwise,
        }
    }

    /// Direction-insensitive comparison: two arcs are the same if they share
    /// center and radius and describe the same point set. With matching
    /// `clockwise` flags the endpoints must match in order, otherwise swapped.
    pub fn is_same_curve(&self, other: &Arc2d, tolerance: f64) -> bool {
        if !points_equal(&self.center, &other.center, tolerance)
            || (self.radius - other.radius).abs() > tolerance
        {
            return false;
        }
        if self.clockwise == other.clockwise {
            points_equal(&self.start, &other.start, tolerance)
                && points_equal(&self.end, &other.end, tolerance)
        } else {
            points_equal(&self.start, &other.end, tolerance)
                && points_equal(&self.end, &other.start, tolerance)
        }
    }

    fn segment_count(&self, options: &DiscreteOptions) -> Result<usize> {
        if let Some(segments) = options.segments {
            if segments == 0 {
                return Err(Error::InvalidInput("segment count must be positive".to_string()));
            }
            return Ok(segments.min(MAX_DISCRETE_SEGMENTS));
        }
        let tolerance = options.tolerance.unwrap_or(DEFAULT_DISCRETE_TOLERANCE);
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "discretization tolerance must be positive, got {}",
                tolerance
            )));
        }
        if tolerance >= self.radius {
            return Ok(((self.sweep() / std::f64::consts::FRAC_PI_2).ceil() as usize).max(1));
        }
        // Sagitta rule: a chord spanning `step` radians deviates by
        // r * (1 - cos(step / 2)) from the arc.
        let step = 2.0 * (1.0 - tolerance / self.radius).acos();
        let count = (self.sweep() / step).ceil() as usize;
        Ok(count.clamp(1, MAX_DISCRETE_SEGMENTS))
    }
}

/// Any sketch curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Curve2d {
    Line(Line2d),
    Arc(Arc2d),
}

impl From<Line2d> for Curve2d {
    fn from(line: Line2d) -> Self {
        Curve2d::Line(line)
    }
}

impl From<Arc2d> for Curve2d {
    fn from(arc: Arc2d) -> Self {
        Curve2d::Arc(arc)
    }
}

impl Curve2d {
    /// Shorthand for an unchecked line between two points.
    pub fn line(start: Point2d, end: Point2d) -> Self {
        Curve2d::Line(Line2d::new(start, end))
    }

    /// Re-runs constructor validation on a curve that bypassed it, such as
    /// one read from a document.
    pub fn validated(&self, tolerance: f64) -> Result<Self> {
        match self {
            Curve2d::Line(l) => Line2d::create(l.start, l.end).map(Curve2d::Line),
            Curve2d::Arc(a) => Arc2d::create(
                a.center,
                a.radius,
                a.start,
                a.end,
                a.clockwise,
                tolerance.max(a.radius.abs() * 1e-12),
            )
            .map(Curve2d::Arc),
        }
    }

    pub fn start(&self) -> Point2d {
        match self {
            Curve2d::Line(l) => l.start(),
            Curve2d::Arc(a) => a.start(),
        }
    }

    pub fn end(&self) -> Point2d {
        match self {
            Curve2d::Line(l) => l.end(),
            Curve2d::Arc(a) => a.end(),
        }
    }

    pub fn is_line(&self) -> bool {
        matches!(self, Curve2d::Line(_))
    }

    pub fn length(&self) -> f64 {
        match self {
            Curve2d::Line(l) => l.length(),
            Curve2d::Arc(a) => a.length(),
        }
    }

    /// Replaces this curve with a copy of `other`.
    pub fn assign(&mut self, other: &Curve2d) {
        *self = *other;
    }

    /// Point at parameter `t` in `[0, 1]`; endpoints are exact.
    pub fn get_point(&self, t: f64) -> Point2d {
        match self {
            Curve2d::Line(l) => l.get_point(t),
            Curve2d::Arc(a) => a.get_point(t),
        }
    }

    pub fn param_at(&self, point: &Point2d) -> f64 {
        match self {
            Curve2d::Line(l) => l.param_at(point),
            Curve2d::Arc(a) => a.param_at(point),
        }
    }

    pub fn is_same_curve(&self, other: &Curve2d, tolerance: f64) -> bool {
        match (self, other) {
            (Curve2d::Line(a), Curve2d::Line(b)) => a.is_same_curve(b, tolerance),
            (Curve2d::Arc(a), Curve2d::Arc(b)) => a.is_same_curve(b, tolerance),
            _ => false,
        }
    }

    pub fn is_point_on_curve(&self, point: &Point2d, tolerance: f64) -> bool {
        match self {
            Curve2d::Line(l) => l.is_point_on_curve(point, tolerance),
            Curve2d::Arc(a) => a.is_point_on_curve(point, tolerance),
        }
    }

    /// Intersections with the horizontal line at `y` whose curve parameter
    /// lies in `[0, 1]`.
    pub fn h_line_intersections(&self, y: f64) -> Result<Vec<Point2d>> {
        if !y.is_finite() {
            return Err(Error::InvalidInput(format!("scanline y must be finite, got {}", y)));
        }
        Ok(match self {
            Curve2d::Line(l) => l.h_line_intersections(y),
            Curve2d::Arc(a) => a.h_line_intersections(y),
        })
    }

    pub fn reversed(&self) -> Self {
        match self {
            Curve2d::Line(l) => Curve2d::Line(l.reversed()),
            Curve2d::Arc(a) => Curve2d::Arc(a.reversed()),
        }
    }

    /// Number of segments the curve is split into for `options`.
    pub fn segment_count(&self, options: &DiscreteOptions) -> Result<usize> {
        match self {
            Curve2d::Line(_) => Ok(1),
            Curve2d::Arc(a) => a.segment_count(options),
        }
    }

    /// Lazily evaluated discretization from start to end, both included.
    ///
    /// The iterator borrows the curve and recomputes every point from the
    /// curve parameters; calling this again restarts from the start point.
    pub fn discrete_iter(&self, options: &DiscreteOptions) -> Result<DiscreteIter<'_>> {
        let count = self.segment_count(options)?;
        Ok(DiscreteIter {
            curve: self,
            index: 0,
            count,
        })
    }

    pub fn discrete_points(&self, options: &DiscreteOptions) -> Result<Vec<Point2d>> {
        Ok(self.discrete_iter(options)?.collect())
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        self.transformed(&Matrix3::new(1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0))
    }

    /// Applies a homogeneous 2D similarity transform.
    ///
    /// Arc radii scale by the square root of the determinant's magnitude and
    /// mirroring transforms flip the arc direction.
    pub fn transformed(&self, m: &Matrix3<f64>) -> Self {
        let apply = |p: &Point2d| m.transform_point(p);
        match self {
            Curve2d::Line(l) => Curve2d::Line(Line2d::new(apply(&l.start), apply(&l.end))),
            Curve2d::Arc(a) => {
                let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
                Curve2d::Arc(Arc2d {
                    center: apply(&a.center),
                    radius: a.radius * det.abs().sqrt(),
                    start: apply(&a.start),
                    end: apply(&a.end),
                    clockwise: if det < 0.0 { !a.clockwise } else { a.clockwise },
                })
            }
        }
    }
}

/// Iterator over the discretization points of a curve.
#[derive(Debug, Clone)]
pub struct DiscreteIter<'a> {
    curve: &'a Curve2d,
    index: usize,
    count: usize,
}

impl Iterator for DiscreteIter<'_> {
    type Item = Point2d;

    fn next(&mut self) -> Option<Point2d> {
        if self.index > self.count {
            return None;
        }
        let t = if self.index == self.count {
            1.0
        } else {
            self.index as f64 / self.count as f64
        };
        self.index += 1;
        Some(self.curve.get_point(t))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count + 1).saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DiscreteIter<'_> {}
