// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face construction and hole management.
//!
//! A face owns its wires: the edges and vertices built for a face are
//! released with it. Hole candidates are classified against the outer loop
//! and the existing holes; anything that is not strictly inside the face and
//! disjoint from the other holes is refused rather than reported as an error.

use floorkit_geometry::{Loop, LoopLoopPosition, PositionJudge, Region};
use tracing::debug;

use crate::arena::*;
use crate::context::KernelContext;
use crate::dirty::DirtyFlags;
use crate::error::{Error, Result};
use crate::keys::*;

/// Attributes of a face being created.
#[derive(Debug, Clone, Default)]
pub struct FaceSpec {
    pub tags: Vec<String>,
    pub elevation: f64,
    pub owner: FaceOwner,
}

impl FaceSpec {
    pub fn tagged(tag: &str) -> Self {
        Self {
            tags: vec![tag.to_string()],
            ..Self::default()
        }
    }

    pub fn with_owner(mut self, owner: FaceOwner) -> Self {
        self.owner = owner;
        self
    }

    pub fn at_elevation(mut self, elevation: f64) -> Self {
        self.elevation = elevation;
        self
    }
}

impl TopologyGraph {
    /// Creates a face from a region.
    ///
    /// The outer loop is stored anticlockwise. Region holes go through
    /// [`add_face_hole`](Self::add_face_hole); rejected holes are dropped.
    /// The caller is responsible for registering the face with its owner.
    pub fn create_face(&mut self, ctx: &mut KernelContext, region: &Region, spec: FaceSpec) -> Result<FaceKey> {
        let tol = ctx.tolerance();
        let mut outer = region.outer.clone();
        if outer.area() <= tol * tol {
            return Err(Error::DegenerateFace);
        }
        outer.ensure_anticlockwise();
        let wire = self.build_wire(ctx, &outer, spec.elevation)?;

        let id = ctx.next_id();
        let key = self.faces.insert(FaceData {
            id,
            outer: Wire::default(),
            holes: Vec::new(),
            tags: spec.tags.into_iter().collect(),
            owner: spec.owner,
            elevation: spec.elevation,
            dirty: DirtyFlags::NONE,
        });
        self.attach_outer(key, wire);

        for hole in &region.holes {
            if !self.add_face_hole(ctx, key, hole) {
                debug!(face = %id, "Dropped region hole during face construction");
            }
        }
        Ok(key)
    }

    /// Adds a hole to a face.
    ///
    /// The candidate is accepted only if it classifies as equal to or inside
    /// the outer loop and lies outside every existing hole. Accepted holes are
    /// stored anticlockwise. Returns whether the hole was added.
    pub fn add_face_hole(&mut self, ctx: &mut KernelContext, face: FaceKey, candidate: &Loop) -> bool {
        let tol = ctx.tolerance();
        let (outer, holes) = match (self.face_outer_loop(face, tol), self.face_hole_loops(face, tol)) {
            (Ok(outer), Ok(holes)) => (outer, holes),
            (Err(e), _) | (_, Err(e)) => {
                debug!(?face, error = %e, "Cannot classify hole against face");
                return false;
            }
        };
        let id = self.faces[face].id;

        let position = PositionJudge::loop_to_loop(&outer, candidate, tol);
        if !position.is_within() {
            debug!(face = %id, ?position, "Rejected hole not inside face");
            return false;
        }
        if let Some(clash) = holes
            .iter()
            .map(|h| PositionJudge::loop_to_loop(h, candidate, tol))
            .find(|p| *p != LoopLoopPosition::Out)
        {
            debug!(face = %id, position = ?clash, "Rejected hole touching an existing hole");
            return false;
        }

        let mut hole = candidate.clone();
        hole.ensure_anticlockwise();
        let elevation = self.faces[face].elevation;
        let wire = match self.build_wire(ctx, &hole, elevation) {
            Ok(wire) => wire,
            Err(e) => {
                debug!(face = %id, error = %e, "Cannot build hole wire");
                return false;
            }
        };
        for &edge in &wire.edges {
            self.link_edge_face(edge, face);
        }
        self.faces[face].holes.push(wire);
        self.mark_dirty(EntityKey::Face(face), DirtyFlags::GEOMETRY);
        true
    }

    pub fn clear_face_holes(&mut self, face: FaceKey) -> Result<()> {
        let data = self.faces.get_mut(face).ok_or(Error::FaceNotFound(face))?;
        let holes = std::mem::take(&mut data.holes);
        if holes.is_empty() {
            return Ok(());
        }
        for wire in &holes {
            self.release_wire(face, wire);
        }
        self.mark_dirty(EntityKey::Face(face), DirtyFlags::GEOMETRY);
        Ok(())
    }

    /// Replaces the boundary of a face with a region, keeping id, tags and
    /// owner.
    pub fn set_face_region(&mut self, ctx: &mut KernelContext, face: FaceKey, region: &Region) -> Result<()> {
        let tol = ctx.tolerance();
        let elevation = self.faces.get(face).ok_or(Error::FaceNotFound(face))?.elevation;
        let mut outer = region.outer.clone();
        if outer.area() <= tol * tol {
            return Err(Error::DegenerateFace);
        }
        outer.ensure_anticlockwise();
        let wire = self.build_wire(ctx, &outer, elevation)?;

        let data = &mut self.faces[face];
        let old_outer = std::mem::take(&mut data.outer);
        let old_holes = std::mem::take(&mut data.holes);
        for old in std::iter::once(&old_outer).chain(old_holes.iter()) {
            self.release_wire(face, old);
        }
        self.attach_outer(face, wire);
        for hole in &region.holes {
            self.add_face_hole(ctx, face, hole);
        }
        self.mark_dirty(EntityKey::Face(face), DirtyFlags::GEOMETRY);
        Ok(())
    }

    pub fn add_face_tag(&mut self, face: FaceKey, tag: &str) -> bool {
        self.faces
            .get_mut(face)
            .is_some_and(|f| f.tags.insert(tag.to_string()))
    }

    pub fn remove_face_tag(&mut self, face: FaceKey, tag: &str) -> bool {
        self.faces.get_mut(face).is_some_and(|f| f.tags.remove(tag))
    }

    /// Removes a face, detaching it from its owner and releasing its
    /// boundary edges and vertices.
    pub fn remove_face(&mut self, face: FaceKey) -> Result<()> {
        let data = self.faces.remove(face).ok_or(Error::FaceNotFound(face))?;
        match data.owner {
            FaceOwner::Sketch(sketch) => {
                if let Some(s) = self.sketches.get_mut(sketch) {
                    s.faces.retain(|f| *f != face);
                    s.extrusion_values.remove(&data.id);
                }
            }
            FaceOwner::Slab(slab) => {
                if let Some(s) = self.slabs.get_mut(slab) {
                    s.top_faces.retain(|f| *f != face);
                    s.bottom_faces.retain(|f| *f != face);
                }
            }
            FaceOwner::None => {}
        }
        for layer in self.layers.values_mut() {
            layer.floor_faces.retain(|f| *f != face);
            layer.ceiling_faces.retain(|f| *f != face);
        }
        for wire in data.wires() {
            self.release_wire(face, wire);
        }
        Ok(())
    }

    /// Creates fresh vertices and edges for a loop.
    pub(crate) fn build_wire(&mut self, ctx: &mut KernelContext, lp: &Loop, z: f64) -> Result<Wire> {
        let curves = lp.curves();
        let n = curves.len();
        let mut vertices = Vec::with_capacity(n);
        for curve in curves {
            let p = curve.start();
            match self.create_vertex(ctx, p.x, p.y, z) {
                Ok(v) => vertices.push(v),
                Err(e) => {
                    for v in vertices {
                        self.vertices.remove(v);
                    }
                    return Err(e);
                }
            }
        }
        let edges = curves
            .iter()
            .enumerate()
            .map(|(i, curve)| {
                let id = ctx.next_id();
                self.insert_edge(id, vertices[i], vertices[(i + 1) % n], *curve)
            })
            .collect();
        Ok(Wire {
            edges,
            orientations: vec![true; n],
        })
    }

    fn attach_outer(&mut self, face: FaceKey, wire: Wire) {
        for &edge in &wire.edges {
            self.link_edge_face(edge, face);
        }
        self.faces[face].outer = wire;
    }

    /// Detaches a wire from a face, destroying edges no other face uses.
    pub(crate) fn release_wire(&mut self, face: FaceKey, wire: &Wire) {
        for &edge in &wire.edges {
            self.unlink_edge_face(edge, face);
            if !self.edge_to_faces.contains_key(&edge) {
                self.destroy_edge(edge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use floorkit_geometry::Point2d;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Loop {
        Loop::rectangle(Point2d::new(x0, y0), Point2d::new(x1, y1)).unwrap()
    }

    fn square_face(graph: &mut TopologyGraph, ctx: &mut KernelContext) -> FaceKey {
        graph
            .create_face(ctx, &Region::new(rect(0.0, 0.0, 10.0, 10.0)), FaceSpec::default())
            .unwrap()
    }

    #[test]
    fn face_owns_its_boundary() {
        let mut ctx = KernelContext::default();
        let mut graph = TopologyGraph::new();
        let face = square_face(&mut graph, &mut ctx);
        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert_relative_eq!(graph.face_area(face, 1e-6).unwrap(), 100.0);

        graph.remove_face(face).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.vertex_count(), 0);
    }

    #[test]
    fn clockwise_outer_is_normalized() {
        let mut ctx = KernelContext::default();
        let mut graph = TopologyGraph::new();
        let region = Region::new(rect(0.0, 0.0, 2.0, 2.0).reversed());
        let face = graph.create_face(&mut ctx, &region, FaceSpec::default()).unwrap();
        assert!(graph.face_outer_loop(face, 1e-6).unwrap().is_anticlockwise());
    }

    #[test]
    fn hole_acceptance_rules() {
        let mut ctx = KernelContext::default();
        let mut graph = TopologyGraph::new();
        let face = square_face(&mut graph, &mut ctx);

        // clockwise input is stored anticlockwise
        assert!(graph.add_face_hole(&mut ctx, face, &rect(2.0, 2.0, 4.0, 4.0).reversed()));
        let holes = graph.face_hole_loops(face, 1e-6).unwrap();
        assert!(holes[0].is_anticlockwise());

        // overlapping the outer boundary
        assert!(!graph.add_face_hole(&mut ctx, face, &rect(8.0, 8.0, 12.0, 12.0)));
        // outside
        assert!(!graph.add_face_hole(&mut ctx, face, &rect(20.0, 0.0, 22.0, 2.0)));
        // overlapping an existing hole
        assert!(!graph.add_face_hole(&mut ctx, face, &rect(3.0, 3.0, 5.0, 5.0)));
        // disjoint from the existing hole
        assert!(graph.add_face_hole(&mut ctx, face, &rect(6.0, 6.0, 7.0, 7.0)));

        assert_eq!(graph.face(face).unwrap().holes.len(), 2);
        assert_relative_eq!(graph.face_area(face, 1e-6).unwrap(), 95.0);

        graph.clear_face_holes(face).unwrap();
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn region_holes_pass_through_classification() {
        let mut ctx = KernelContext::default();
        let mut graph = TopologyGraph::new();
        let region = Region::with_holes(
            rect(0.0, 0.0, 10.0, 10.0),
            vec![rect(1.0, 1.0, 2.0, 2.0), rect(9.0, 9.0, 11.0, 11.0)],
        );
        let face = graph.create_face(&mut ctx, &region, FaceSpec::default()).unwrap();
        assert_eq!(graph.face(face).unwrap().holes.len(), 1);
    }

    #[test]
    fn degenerate_outer_is_an_error() {
        let mut ctx = KernelContext::default();
        let mut graph = TopologyGraph::new();
        let sliver = Loop::from_points(
            &[Point2d::new(0.0, 0.0), Point2d::new(1.0, 0.0), Point2d::new(2.0, 0.0)],
            1e-9,
        )
        .unwrap();
        assert!(matches!(
            graph.create_face(&mut ctx, &Region::new(sliver), FaceSpec::default()),
            Err(Error::DegenerateFace)
        ));
        assert_eq!(graph.vertex_count(), 0);
    }

    #[test]
    fn moving_a_vertex_dirties_its_face() {
        let mut ctx = KernelContext::default();
        let mut graph = TopologyGraph::new();
        let face = square_face(&mut graph, &mut ctx);
        graph.take_dirty();
        let v = graph.face_vertices(face).unwrap()[2];
        assert!(graph.offset_vertex(&ctx, v, 1.0, 1.0, 0.0));
        assert!(graph.dirty_flags(EntityKey::Face(face)).geometry);
        assert_relative_eq!(graph.face_area(face, 1e-6).unwrap(), 110.0);
    }
}
