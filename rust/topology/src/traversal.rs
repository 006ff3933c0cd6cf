// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Downward traversal: deriving curves, loops and paths from wires.
//!
//! Loops are never stored. They are rebuilt from the current edge curves on
//! every call, so they always reflect the latest vertex positions.

use floorkit_geometry::{Curve2d, Loop, Matrix3, Matrix4, Polygon2d, Region};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;

/// Curves of a face in world coordinates, as consumed by renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPath2d {
    pub outer: Vec<Curve2d>,
    pub holes: Vec<Vec<Curve2d>>,
}

/// Planar part of a 3D affine transform.
pub fn planar_transform(m: &Matrix4<f64>) -> Matrix3<f64> {
    Matrix3::new(
        m[(0, 0)], m[(0, 1)], m[(0, 3)],
        m[(1, 0)], m[(1, 1)], m[(1, 3)],
        0.0, 0.0, 1.0,
    )
}

impl TopologyGraph {
    /// Curves of a wire in traversal order, reversed where the wire runs an
    /// edge backwards.
    pub fn wire_curves(&self, wire: &Wire) -> Result<Vec<Curve2d>> {
        wire.iter()
            .map(|(key, forward)| {
                let edge = self.edges.get(key).ok_or(Error::EdgeNotFound(key))?;
                Ok(if forward { edge.curve } else { edge.curve.reversed() })
            })
            .collect()
    }

    pub fn wire_loop(&self, wire: &Wire, tolerance: f64) -> Result<Loop> {
        Ok(Loop::new(self.wire_curves(wire)?, tolerance)?)
    }

    /// Vertices of a wire in traversal order.
    pub fn wire_vertices_ordered(&self, wire: &Wire) -> Option<Vec<VertexKey>> {
        wire.iter()
            .map(|(key, forward)| {
                let edge = self.edges.get(key)?;
                Some(if forward { edge.start } else { edge.end })
            })
            .collect()
    }

    pub fn face_outer_loop(&self, face: FaceKey, tolerance: f64) -> Result<Loop> {
        let data = self.faces.get(face).ok_or(Error::FaceNotFound(face))?;
        self.wire_loop(&data.outer, tolerance)
    }

    pub fn face_hole_loops(&self, face: FaceKey, tolerance: f64) -> Result<Vec<Loop>> {
        let data = self.faces.get(face).ok_or(Error::FaceNotFound(face))?;
        data.holes.iter().map(|w| self.wire_loop(w, tolerance)).collect()
    }

    pub fn face_region(&self, face: FaceKey, tolerance: f64) -> Result<Region> {
        Ok(Region::with_holes(
            self.face_outer_loop(face, tolerance)?,
            self.face_hole_loops(face, tolerance)?,
        ))
    }

    /// Discretized face with an anticlockwise outer and clockwise holes.
    pub fn face_polygon(&self, face: FaceKey, tolerance: f64) -> Result<Polygon2d> {
        Ok(self.face_region(face, tolerance)?.to_polygon())
    }

    /// Net face area (outer minus holes).
    pub fn face_area(&self, face: FaceKey, tolerance: f64) -> Result<f64> {
        Ok(self.face_region(face, tolerance)?.area())
    }

    /// Vertices of the outer boundary in traversal order.
    pub fn face_vertices(&self, face: FaceKey) -> Option<Vec<VertexKey>> {
        self.wire_vertices_ordered(&self.faces.get(face)?.outer)
    }

    /// All edges of a face, holes included.
    pub fn face_edges(&self, face: FaceKey) -> Option<FxHashSet<EdgeKey>> {
        let data = self.faces.get(face)?;
        Some(data.wires().flat_map(|w| w.edges.iter().copied()).collect())
    }

    /// Outer and hole curves of a face mapped through its sketch transform.
    /// Faces not owned by a sketch are already in world coordinates.
    pub fn face_world_raw_path2d(&self, face: FaceKey) -> Result<RawPath2d> {
        let data = self.faces.get(face).ok_or(Error::FaceNotFound(face))?;
        let transform = match data.owner {
            FaceOwner::Sketch(sketch) => self
                .sketches
                .get(sketch)
                .map(|s| planar_transform(&s.transform))
                .unwrap_or_else(Matrix3::identity),
            _ => Matrix3::identity(),
        };
        let map = |wire: &Wire| -> Result<Vec<Curve2d>> {
            Ok(self
                .wire_curves(wire)?
                .iter()
                .map(|c| c.transformed(&transform))
                .collect())
        };
        Ok(RawPath2d {
            outer: map(&data.outer)?,
            holes: data.holes.iter().map(&map).collect::<Result<_>>()?,
        })
    }
}
