// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Area identities of the boolean engine on loops built from curves.

use approx::assert_relative_eq;
use floorkit_geometry::{
    difference, intersection, total_area, union, xor, Arc2d, BooleanOptions, Curve2d, Loop,
    Point2d, Polygon2d, Region,
};

fn rect_region(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon2d {
    Region::new(Loop::rectangle(Point2d::new(x0, y0), Point2d::new(x1, y1)).unwrap()).to_polygon()
}

/// Rectangle with its right side bulging out as a half disc.
fn rounded_region() -> Polygon2d {
    let bulge = Arc2d::create(
        Point2d::new(4.0, 1.0),
        1.0,
        Point2d::new(4.0, 0.0),
        Point2d::new(4.0, 2.0),
        false,
        1e-9,
    )
    .unwrap();
    let curves = vec![
        Curve2d::line(Point2d::new(0.0, 0.0), Point2d::new(4.0, 0.0)),
        bulge.into(),
        Curve2d::line(Point2d::new(4.0, 2.0), Point2d::new(0.0, 2.0)),
        Curve2d::line(Point2d::new(0.0, 2.0), Point2d::new(0.0, 0.0)),
    ];
    Region::new(Loop::new(curves, 1e-9).unwrap()).to_polygon()
}

fn pairs() -> Vec<(Polygon2d, Polygon2d)> {
    vec![
        (rect_region(0.0, 0.0, 4.0, 3.0), rect_region(2.0, 1.0, 6.0, 5.0)),
        (rect_region(0.0, 0.0, 10.0, 10.0), rect_region(2.0, 2.0, 4.0, 4.0)),
        (rect_region(0.0, 0.0, 1.0, 1.0), rect_region(3.0, 3.0, 4.0, 4.0)),
        (rounded_region(), rect_region(3.0, -1.0, 6.0, 1.0)),
    ]
}

#[test]
fn union_plus_intersection_equals_sum_of_areas() {
    let opts = BooleanOptions::default();
    for (a, b) in pairs() {
        let (a, b) = ([a], [b]);
        let lhs = total_area(&union(&a, &b, &opts)) + total_area(&intersection(&a, &b, &opts));
        let rhs = total_area(&a) + total_area(&b);
        assert_relative_eq!(lhs, rhs, epsilon = 1e-6);
    }
}

#[test]
fn difference_union_intersection_rebuilds_subject() {
    let opts = BooleanOptions::default();
    for (a, b) in pairs() {
        let (a, b) = ([a], [b]);
        let rebuilt = union(
            &difference(&a, &b, &opts),
            &intersection(&a, &b, &opts),
            &opts,
        );
        assert_relative_eq!(total_area(&rebuilt), total_area(&a), epsilon = 1e-6);
        assert!(total_area(&xor(&rebuilt, &a, &opts)) < 1e-6);
    }
}

#[test]
fn outputs_are_normalized() {
    let opts = BooleanOptions::default();
    let (a, b) = (rect_region(0.0, 0.0, 10.0, 10.0), rect_region(2.0, 2.0, 4.0, 4.0));
    let mut cw = a.clone();
    cw.outer.reverse();
    for polygon in difference(&[cw], &[b], &opts) {
        assert!(floorkit_geometry::signed_area(&polygon.outer) > 0.0);
        for hole in &polygon.holes {
            assert!(floorkit_geometry::signed_area(hole) < 0.0);
        }
    }
}
