// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed loops of curves.
//!
//! A [`Loop`] is an ordered, closed chain of curves. Winding is never cached:
//! it is recomputed from the discretized boundary whenever it is asked for,
//! so in-place reversal and re-ordering cannot leave stale state behind.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::curve::{points_equal, Curve2d, DiscreteOptions, Line2d, Point2d};
use crate::error::{Error, Result};
use crate::measure::{signed_area, Bound2d};

/// An ordered, closed sequence of curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loop {
    curves: Vec<Curve2d>,
}

impl Loop {
    /// Creates a loop, checking that consecutive curves connect within
    /// `tolerance` (the last curve must end where the first begins).
    pub fn new(curves: Vec<Curve2d>, tolerance: f64) -> Result<Self> {
        if curves.is_empty() {
            return Err(Error::DegenerateLoop("loop has no curves".to_string()));
        }
        let n = curves.len();
        for i in 0..n {
            let j = (i + 1) % n;
            if !points_equal(&curves[i].end(), &curves[j].start(), tolerance) {
                return Err(Error::OpenLoop(i, j));
            }
        }
        Ok(Self { curves })
    }

    /// Creates a polyline loop through `points`, skipping repeated points.
    /// The closing segment back to the first point is implicit.
    pub fn from_points(points: &[Point2d], tolerance: f64) -> Result<Self> {
        let mut unique: Vec<Point2d> = Vec::with_capacity(points.len());
        for p in points {
            if unique.last().map_or(true, |q| !points_equal(p, q, tolerance)) {
                unique.push(*p);
            }
        }
        while unique.len() > 1 && points_equal(&unique[0], &unique[unique.len() - 1], tolerance) {
            unique.pop();
        }
        if unique.len() < 3 {
            return Err(Error::DegenerateLoop(format!(
                "polyline loop needs 3 distinct points, got {}",
                unique.len()
            )));
        }
        let n = unique.len();
        let curves = (0..n)
            .map(|i| Line2d::create(unique[i], unique[(i + 1) % n]).map(Curve2d::Line))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { curves })
    }

    /// Axis-aligned rectangle, anticlockwise from `min`.
    pub fn rectangle(min: Point2d, max: Point2d) -> Result<Self> {
        Self::from_points(
            &[
                min,
                Point2d::new(max.x, min.y),
                max,
                Point2d::new(min.x, max.y),
            ],
            0.0,
        )
    }

    pub fn curves(&self) -> &[Curve2d] {
        &self.curves
    }

    pub fn into_curves(self) -> Vec<Curve2d> {
        self.curves
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn is_closed(&self, tolerance: f64) -> bool {
        let n = self.curves.len();
        n > 0
            && (0..n).all(|i| {
                points_equal(&self.curves[i].end(), &self.curves[(i + 1) % n].start(), tolerance)
            })
    }

    /// Discretized boundary without the repeated closing point.
    pub fn to_polygon_with(&self, options: &DiscreteOptions) -> Result<Vec<Point2d>> {
        let mut points = Vec::with_capacity(self.curves.len() * 2);
        for curve in &self.curves {
            let pts = curve.discrete_points(options)?;
            points.extend_from_slice(&pts[..pts.len() - 1]);
        }
        Ok(points)
    }

    /// Discretized boundary using the default discretization tolerance.
    pub fn to_polygon(&self) -> Vec<Point2d> {
        let options = DiscreteOptions::default();
        let mut points = Vec::with_capacity(self.curves.len() * 2);
        for curve in &self.curves {
            match curve.discrete_points(&options) {
                Ok(pts) => points.extend_from_slice(&pts[..pts.len() - 1]),
                Err(_) => points.push(curve.start()),
            }
        }
        points
    }

    /// Signed area of the discretized boundary; positive when anticlockwise.
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.to_polygon())
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn perimeter(&self) -> f64 {
        self.curves.iter().map(Curve2d::length).sum()
    }

    pub fn is_anticlockwise(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Reverses traversal direction in place.
    pub fn reverse(&mut self) {
        self.curves.reverse();
        for curve in &mut self.curves {
            *curve = curve.reversed();
        }
    }

    pub fn reversed(&self) -> Self {
        let mut copy = self.clone();
        copy.reverse();
        copy
    }

    /// Makes the loop anticlockwise, returning `true` if it was reversed.
    pub fn ensure_anticlockwise(&mut self) -> bool {
        if self.is_anticlockwise() {
            false
        } else {
            self.reverse();
            true
        }
    }

    /// Makes the loop clockwise, returning `true` if it was reversed.
    pub fn ensure_clockwise(&mut self) -> bool {
        if self.is_anticlockwise() {
            self.reverse();
            true
        } else {
            false
        }
    }

    /// Re-orders the loop so that the curve at `index` comes first.
    pub fn rotate_start(&mut self, index: usize) -> Result<()> {
        if index >= self.curves.len() {
            return Err(Error::InvalidInput(format!(
                "start index {} out of range for loop of {} curves",
                index,
                self.curves.len()
            )));
        }
        self.curves.rotate_left(index);
        Ok(())
    }

    /// Index of the first curve matching `curve` (direction-insensitive).
    pub fn find_curve(&self, curve: &Curve2d, tolerance: f64) -> Option<usize> {
        self.curves.iter().position(|c| c.is_same_curve(curve, tolerance))
    }

    /// Compares two loops curve by curve, ignoring start index and direction.
    pub fn is_same_loop(&self, other: &Loop, tolerance: f64) -> bool {
        let n = self.curves.len();
        if n != other.curves.len() {
            return false;
        }
        (0..n).any(|k| {
            let forward = (0..n).all(|i| {
                self.curves[i].is_same_curve(&other.curves[(i + k) % n], tolerance)
            });
            forward
                || (0..n).all(|i| {
                    self.curves[i].is_same_curve(&other.curves[(k + n - i) % n], tolerance)
                })
        })
    }

    pub fn bound(&self) -> Bound2d {
        Bound2d::from_points(&self.to_polygon())
    }

    pub fn transformed(&self, m: &Matrix3<f64>) -> Self {
        Self {
            curves: self.curves.iter().map(|c| c.transformed(m)).collect(),
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            curves: self.curves.iter().map(|c| c.translated(dx, dy)).collect(),
        }
    }
}
