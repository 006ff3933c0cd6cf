// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use crate::bool2d::{ensure_ccw, ensure_cw, Polygon2d};
use crate::curve::DiscreteOptions;
use crate::error::Result;
use crate::loops::Loop;

/// An outer loop with zero or more hole loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub outer: Loop,
    #[serde(default)]
    pub holes: Vec<Loop>,
}

impl Region {
    pub fn new(outer: Loop) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    pub fn with_holes(outer: Loop, holes: Vec<Loop>) -> Self {
        Self { outer, holes }
    }

    /// Discretizes to a polygon with an anticlockwise outer and clockwise holes.
    pub fn to_polygon(&self) -> Polygon2d {
        Polygon2d {
            outer: ensure_ccw(&self.outer.to_polygon()),
            holes: self.holes.iter().map(|h| ensure_cw(&h.to_polygon())).collect(),
        }
    }

    pub fn to_polygon_with(&self, options: &DiscreteOptions) -> Result<Polygon2d> {
        let holes = self
            .holes
            .iter()
            .map(|h| h.to_polygon_with(options).map(|p| ensure_cw(&p)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Polygon2d {
            outer: ensure_ccw(&self.outer.to_polygon_with(options)?),
            holes,
        })
    }

    /// Builds a line-only region from a polygon.
    pub fn from_polygon(polygon: &Polygon2d, tolerance: f64) -> Result<Self> {
        let outer = Loop::from_points(&polygon.outer, tolerance)?;
        let holes = polygon
            .holes
            .iter()
            .map(|h| Loop::from_points(h, tolerance))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { outer, holes })
    }

    /// Converts every polygon, skipping those that degenerate under `tolerance`.
    pub fn from_polygons(polygons: &[Polygon2d], tolerance: f64) -> Vec<Self> {
        polygons
            .iter()
            .filter_map(|p| match Self::from_polygon(p, tolerance) {
                Ok(region) => Some(region),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping degenerate region");
                    None
                }
            })
            .collect()
    }

    /// Net area: outer minus holes.
    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(Loop::area).sum();
        (self.outer.area() - holes).max(0.0)
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            outer: self.outer.translated(dx, dy),
            holes: self.holes.iter().map(|h| h.translated(dx, dy)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Point2d;
    use crate::measure::{area, signed_area};
    use approx::assert_relative_eq;

    #[test]
    fn polygon_conversion_normalizes_winding() {
        let outer = Loop::rectangle(Point2d::new(0.0, 0.0), Point2d::new(10.0, 10.0)).unwrap();
        let hole = Loop::rectangle(Point2d::new(2.0, 2.0), Point2d::new(4.0, 4.0)).unwrap();
        let region = Region::with_holes(outer.reversed(), vec![hole]);
        let polygon = region.to_polygon();
        assert!(signed_area(&polygon.outer) > 0.0);
        assert!(signed_area(&polygon.holes[0]) < 0.0);
        assert_relative_eq!(area(&polygon), 96.0);
        assert_relative_eq!(region.area(), 96.0);

        let back = Region::from_polygon(&polygon, 1e-9).unwrap();
        assert_eq!(back.holes.len(), 1);
        assert_relative_eq!(back.area(), 96.0);
    }
}
