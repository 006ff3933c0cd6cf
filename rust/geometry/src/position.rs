// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relative position of points and loops.

use serde::{Deserialize, Serialize};

use crate::bool2d::{ensure_ccw, point_in_contour, Polygon2d};
use crate::curve::Point2d;
use crate::loops::Loop;
use crate::measure::{overlap_area, signed_area};

/// Position of a point relative to a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointLoopPosition {
    In,
    On,
    Out,
}

/// Position of a candidate loop relative to a host loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopLoopPosition {
    /// Both loops bound the same area
    Equal,
    /// The candidate lies inside the host
    In,
    /// The loops share no area
    Out,
    /// The loops partially overlap
    Overlap,
    /// The candidate contains the host
    Contain,
}

impl LoopLoopPosition {
    /// `Equal` or `In`: the candidate fits within the host.
    pub fn is_within(self) -> bool {
        matches!(self, LoopLoopPosition::Equal | LoopLoopPosition::In)
    }
}

pub struct PositionJudge;

impl PositionJudge {
    pub fn point_to_loop(point: &Point2d, lp: &Loop, tolerance: f64) -> PointLoopPosition {
        if lp.curves().iter().any(|c| c.is_point_on_curve(point, tolerance)) {
            return PointLoopPosition::On;
        }
        if point_in_contour(point, &lp.to_polygon()) {
            PointLoopPosition::In
        } else {
            PointLoopPosition::Out
        }
    }

    /// Classifies `candidate` against `host` by shared area.
    ///
    /// Areas are compared with a slack of `tolerance` times the summed
    /// perimeters, so boundaries that coincide within `tolerance` count as
    /// touching rather than overlapping.
    pub fn loop_to_loop(host: &Loop, candidate: &Loop, tolerance: f64) -> LoopLoopPosition {
        if host.is_same_loop(candidate, tolerance) {
            return LoopLoopPosition::Equal;
        }

        let a = Polygon2d::new(ensure_ccw(&host.to_polygon()));
        let b = Polygon2d::new(ensure_ccw(&candidate.to_polygon()));
        let area_a = signed_area(&a.outer);
        let area_b = signed_area(&b.outer);
        let shared = overlap_area(&a, &b);
        let slack = (tolerance * (host.perimeter() + candidate.perimeter())).max(tolerance * tolerance);

        let host_covered = (area_a - shared).abs() <= slack;
        let candidate_covered = (area_b - shared).abs() <= slack;
        match (shared <= slack, host_covered, candidate_covered) {
            (true, _, _) => LoopLoopPosition::Out,
            (false, true, true) => LoopLoopPosition::Equal,
            (false, false, true) => LoopLoopPosition::In,
            (false, true, false) => LoopLoopPosition::Contain,
            (false, false, false) => LoopLoopPosition::Overlap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Loop {
        Loop::rectangle(Point2d::new(x0, y0), Point2d::new(x0 + size, y0 + size)).unwrap()
    }

    #[test]
    fn point_positions() {
        let l = square(0.0, 0.0, 4.0);
        assert_eq!(PositionJudge::point_to_loop(&Point2d::new(2.0, 2.0), &l, 1e-6), PointLoopPosition::In);
        assert_eq!(PositionJudge::point_to_loop(&Point2d::new(4.0, 2.0), &l, 1e-6), PointLoopPosition::On);
        assert_eq!(PositionJudge::point_to_loop(&Point2d::new(5.0, 2.0), &l, 1e-6), PointLoopPosition::Out);
    }

    #[test]
    fn loop_positions() {
        let host = square(0.0, 0.0, 10.0);
        let tol = 1e-6;
        assert_eq!(PositionJudge::loop_to_loop(&host, &square(2.0, 2.0, 2.0), tol), LoopLoopPosition::In);
        assert_eq!(PositionJudge::loop_to_loop(&square(2.0, 2.0, 2.0), &host, tol), LoopLoopPosition::Contain);
        assert_eq!(PositionJudge::loop_to_loop(&host, &square(8.0, 8.0, 4.0), tol), LoopLoopPosition::Overlap);
        assert_eq!(PositionJudge::loop_to_loop(&host, &square(20.0, 0.0, 2.0), tol), LoopLoopPosition::Out);
        assert_eq!(PositionJudge::loop_to_loop(&host, &square(10.0, 0.0, 2.0), tol), LoopLoopPosition::Out);
    }

    #[test]
    fn equal_ignores_direction_and_start() {
        let host = square(0.0, 0.0, 10.0);
        let mut other = host.reversed();
        other.rotate_start(2).unwrap();
        assert_eq!(PositionJudge::loop_to_loop(&host, &other, 1e-6), LoopLoopPosition::Equal);

        // Same area, split edge: equal by area rather than curve by curve.
        let split = Loop::from_points(
            &[
                Point2d::new(0.0, 0.0),
                Point2d::new(5.0, 0.0),
                Point2d::new(10.0, 0.0),
                Point2d::new(10.0, 10.0),
                Point2d::new(0.0, 10.0),
            ],
            1e-9,
        )
        .unwrap();
        assert!(PositionJudge::loop_to_loop(&host, &split, 1e-6).is_within());
    }
}
