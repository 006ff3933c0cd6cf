// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Floorkit Geometry
//!
//! Planar geometry for floor-plan sketches: line and arc curves, closed
//! loops, regions with holes, and a polygon boolean engine (union,
//! difference, intersection, xor, offsetting and morphology) built on
//! `i_overlay`. Every operation is a pure function of its inputs.

pub mod bool2d;
pub mod curve;
pub mod error;
pub mod loops;
pub mod measure;
pub mod offset;
pub mod position;
pub mod region;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix3, Matrix4, Vector2};

pub use bool2d::{
    clean, difference, intersection, union, union_all, xor, BooleanOp, BooleanOptions, FillRule,
    Polygon2d,
};
pub use curve::{
    points_equal, Arc2d, Curve2d, DiscreteOptions, Line2d, Point2d, Point3d, DEFAULT_TOLERANCE,
};
pub use error::{Error, Result};
pub use loops::Loop;
pub use measure::{area, bound, overlap_area, signed_area, total_area, Bound2d};
pub use offset::{
    morphological_close, morphological_open, offset, offset_paths, EndType, JoinType,
    OffsetOptions,
};
pub use position::{LoopLoopPosition, PointLoopPosition, PositionJudge};
pub use region::Region;
