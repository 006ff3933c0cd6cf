// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction and mutation of vertices and edges.
//!
//! Every entity is created through the graph, which checks that referenced
//! sub-entities exist and maintains the upward adjacency index. Vertex
//! edits are validated at this boundary: invalid input is logged and
//! rejected without touching the graph.

use floorkit_geometry::{points_equal, Curve2d};
use tracing::error;

use crate::arena::*;
use crate::context::KernelContext;
use crate::dirty::DirtyFlags;
use crate::error::{Error, Result};
use crate::id::EntityId;
use crate::keys::*;

fn coords_valid(ctx: &KernelContext, x: f64, y: f64, z: f64) -> bool {
    let max = ctx.config.max_vertex_value;
    [x, y, z].iter().all(|c| c.is_finite() && c.abs() <= max)
}

impl TopologyGraph {
    /// Adds a vertex at the given coordinates.
    ///
    /// Returns an error if a coordinate is not finite or exceeds the
    /// configured maximum magnitude.
    pub fn create_vertex(&mut self, ctx: &mut KernelContext, x: f64, y: f64, z: f64) -> Result<VertexKey> {
        if !coords_valid(ctx, x, y, z) {
            return Err(Error::InvalidVertex(x, y, z));
        }
        let id = ctx.next_id();
        Ok(self.insert_vertex(id, x, y, z))
    }

    pub(crate) fn insert_vertex(&mut self, id: EntityId, x: f64, y: f64, z: f64) -> VertexKey {
        self.vertices.insert(VertexData {
            id,
            x,
            y,
            z,
            dirty: DirtyFlags::NONE,
        })
    }

    /// Moves a vertex.
    ///
    /// Returns `false` without mutating anything when the vertex is missing,
    /// a coordinate is invalid, or the position is unchanged within the
    /// length tolerance. Otherwise only the coordinates that actually changed
    /// are written, the vertex and its dependents are marked
    /// geometry-dirty when `dirty_geometry` is set, and every parent edge
    /// whose curve is a line is rebuilt from its end vertices. Arc curves are
    /// left as they are.
    pub fn set_vertex(
        &mut self,
        ctx: &KernelContext,
        key: VertexKey,
        x: f64,
        y: f64,
        z: f64,
        dirty_geometry: bool,
    ) -> bool {
        let Some(vertex) = self.vertices.get_mut(key) else {
            error!(?key, "Cannot set missing vertex");
            return false;
        };
        if !coords_valid(ctx, x, y, z) {
            error!(
                id = %vertex.id,
                x, y, z,
                max = ctx.config.max_vertex_value,
                "Rejected vertex coordinates"
            );
            return false;
        }

        let tol = ctx.config.length_tolerance;
        let changed = [(vertex.x - x).abs() > tol, (vertex.y - y).abs() > tol, (vertex.z - z).abs() > tol];
        if !changed.iter().any(|c| *c) {
            return false;
        }
        if changed[0] {
            vertex.x = x;
        }
        if changed[1] {
            vertex.y = y;
        }
        if changed[2] {
            vertex.z = z;
        }

        if dirty_geometry {
            self.mark_dirty(EntityKey::Vertex(key), DirtyFlags::GEOMETRY);
        }
        for edge in self.vertex_edges(key) {
            self.rebuild_line_curve(edge);
        }
        true
    }

    /// Moves a vertex by a displacement; see [`set_vertex`](Self::set_vertex).
    pub fn offset_vertex(&mut self, ctx: &KernelContext, key: VertexKey, dx: f64, dy: f64, dz: f64) -> bool {
        let Some([x, y, z]) = self.vertex_coords(key) else {
            return false;
        };
        self.set_vertex(ctx, key, x + dx, y + dy, z + dz, true)
    }

    /// Mirrors a vertex across the line `x = axis` (vertical) or `y = axis`.
    pub fn mirror_vertex(&mut self, ctx: &KernelContext, key: VertexKey, axis: f64, is_vertical: bool) -> bool {
        let Some([x, y, z]) = self.vertex_coords(key) else {
            return false;
        };
        if is_vertical {
            self.set_vertex(ctx, key, 2.0 * axis - x, y, z, true)
        } else {
            self.set_vertex(ctx, key, x, 2.0 * axis - y, z, true)
        }
    }

    fn rebuild_line_curve(&mut self, key: EdgeKey) {
        let Some(edge) = self.edges.get(key) else {
            return;
        };
        if !edge.curve.is_line() {
            return;
        }
        let (Some(start), Some(end)) = (self.vertices.get(edge.start), self.vertices.get(edge.end)) else {
            return;
        };
        let curve = Curve2d::line(start.point(), end.point());
        self.edges[key].curve = curve;
    }

    // --- Edges ---

    /// Creates an edge between two existing vertices carrying `curve`.
    ///
    /// The curve must start at `start` and end at `end` within the length
    /// tolerance.
    pub fn add_edge(
        &mut self,
        ctx: &mut KernelContext,
        start: VertexKey,
        end: VertexKey,
        curve: Curve2d,
    ) -> Result<EdgeKey> {
        let s = self.vertices.get(start).ok_or(Error::VertexNotFound(start))?.point();
        let e = self.vertices.get(end).ok_or(Error::VertexNotFound(end))?.point();
        let tol = ctx.config.length_tolerance;
        if !points_equal(&s, &curve.start(), tol) || !points_equal(&e, &curve.end(), tol) {
            return Err(Error::CurveMismatch);
        }
        let id = ctx.next_id();
        Ok(self.insert_edge(id, start, end, curve))
    }

    /// Creates a straight edge between two existing vertices.
    pub fn add_line_edge(&mut self, ctx: &mut KernelContext, start: VertexKey, end: VertexKey) -> Result<EdgeKey> {
        let s = self.vertices.get(start).ok_or(Error::VertexNotFound(start))?.point();
        let e = self.vertices.get(end).ok_or(Error::VertexNotFound(end))?.point();
        self.add_edge(ctx, start, end, Curve2d::line(s, e))
    }

    pub(crate) fn insert_edge(&mut self, id: EntityId, start: VertexKey, end: VertexKey, curve: Curve2d) -> EdgeKey {
        let key = self.edges.insert(EdgeData {
            id,
            start,
            end,
            curve,
            dirty: DirtyFlags::NONE,
        });
        self.link_vertex_edge(start, key);
        self.link_vertex_edge(end, key);
        key
    }

    /// Removes an edge no face uses any more, destroying vertices left
    /// without edges.
    pub fn remove_edge(&mut self, key: EdgeKey) -> Result<()> {
        if !self.edges.contains_key(key) {
            return Err(Error::EdgeNotFound(key));
        }
        if self.edge_to_faces.get(&key).is_some_and(|faces| !faces.is_empty()) {
            return Err(Error::EdgeInUse(key));
        }
        self.destroy_edge(key);
        Ok(())
    }

    pub(crate) fn destroy_edge(&mut self, key: EdgeKey) {
        let Some(edge) = self.edges.remove(key) else {
            return;
        };
        self.edge_to_faces.remove(&key);
        for vertex in [edge.start, edge.end] {
            self.unlink_vertex_edge(vertex, key);
            if !self.vertex_to_edges.contains_key(&vertex) {
                self.vertices.remove(vertex);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use floorkit_geometry::{Arc2d, Point2d};

    fn setup() -> (TopologyGraph, KernelContext) {
        (TopologyGraph::new(), KernelContext::default())
    }

    #[test]
    fn set_then_read_back() {
        let (mut graph, mut ctx) = setup();
        let v = graph.create_vertex(&mut ctx, 0.0, 0.0, 0.0).unwrap();
        assert!(graph.set_vertex(&ctx, v, 1.5, -2.0, 3.0, true));
        let [x, y, z] = graph.vertex_coords(v).unwrap();
        assert_relative_eq!(x, 1.5);
        assert_relative_eq!(y, -2.0);
        assert_relative_eq!(z, 3.0);
    }

    #[test]
    fn unchanged_set_is_rejected_and_keeps_dirty_state() {
        let (mut graph, mut ctx) = setup();
        let v = graph.create_vertex(&mut ctx, 1.0, 1.0, 0.0).unwrap();
        assert!(!graph.set_vertex(&ctx, v, 1.0, 1.0 + 1e-9, 0.0, true));
        assert!(graph.dirty_flags(EntityKey::Vertex(v)).is_empty());

        assert!(graph.set_vertex(&ctx, v, 2.0, 1.0, 0.0, true));
        graph.take_dirty();
        assert!(!graph.set_vertex(&ctx, v, 2.0, 1.0, 0.0, true));
        assert!(graph.dirty_flags(EntityKey::Vertex(v)).is_empty());
    }

    #[test]
    fn invalid_coordinates_are_rejected() {
        let (mut graph, mut ctx) = setup();
        let v = graph.create_vertex(&mut ctx, 0.0, 0.0, 0.0).unwrap();
        assert!(!graph.set_vertex(&ctx, v, f64::NAN, 0.0, 0.0, true));
        assert!(!graph.set_vertex(&ctx, v, 2e7, 0.0, 0.0, true));
        assert_eq!(graph.vertex_coords(v), Some([0.0, 0.0, 0.0]));
        assert!(graph.create_vertex(&mut ctx, f64::INFINITY, 0.0, 0.0).is_err());
    }

    #[test]
    fn moving_a_vertex_rebuilds_lines_but_not_arcs() {
        let (mut graph, mut ctx) = setup();
        let a = graph.create_vertex(&mut ctx, 1.0, 0.0, 0.0).unwrap();
        let b = graph.create_vertex(&mut ctx, 0.0, 1.0, 0.0).unwrap();
        let c = graph.create_vertex(&mut ctx, 0.0, 0.0, 0.0).unwrap();
        let arc = Arc2d::create(Point2d::origin(), 1.0, Point2d::new(1.0, 0.0), Point2d::new(0.0, 1.0), false, 1e-9)
            .unwrap();
        let arc_edge = graph.add_edge(&mut ctx, a, b, arc.into()).unwrap();
        let line_edge = graph.add_line_edge(&mut ctx, c, a).unwrap();

        assert!(graph.offset_vertex(&ctx, a, 1.0, 0.0, 0.0));
        let line = graph.edge(line_edge).unwrap().curve;
        assert_relative_eq!(line.end().x, 2.0);
        let arc_curve = graph.edge(arc_edge).unwrap().curve;
        assert_relative_eq!(arc_curve.start().x, 1.0);

        let flags = graph.dirty_flags(EntityKey::Edge(line_edge));
        assert!(flags.geometry);
    }

    #[test]
    fn mirror_across_axis() {
        let (mut graph, mut ctx) = setup();
        let v = graph.create_vertex(&mut ctx, 1.0, 4.0, 0.0).unwrap();
        assert!(graph.mirror_vertex(&ctx, v, 3.0, true));
        assert_eq!(graph.vertex_coords(v), Some([5.0, 4.0, 0.0]));
        assert!(graph.mirror_vertex(&ctx, v, 0.0, false));
        assert_eq!(graph.vertex_coords(v), Some([5.0, -4.0, 0.0]));
    }

    #[test]
    fn removing_last_edge_destroys_vertices() {
        let (mut graph, mut ctx) = setup();
        let a = graph.create_vertex(&mut ctx, 0.0, 0.0, 0.0).unwrap();
        let b = graph.create_vertex(&mut ctx, 1.0, 0.0, 0.0).unwrap();
        let c = graph.create_vertex(&mut ctx, 1.0, 1.0, 0.0).unwrap();
        let ab = graph.add_line_edge(&mut ctx, a, b).unwrap();
        let bc = graph.add_line_edge(&mut ctx, b, c).unwrap();

        graph.remove_edge(ab).unwrap();
        assert!(graph.vertex(a).is_none());
        assert!(graph.vertex(b).is_some());
        graph.remove_edge(bc).unwrap();
        assert_eq!(graph.vertex_count(), 0);
    }

    #[test]
    fn edge_curve_must_match_vertices() {
        let (mut graph, mut ctx) = setup();
        let a = graph.create_vertex(&mut ctx, 0.0, 0.0, 0.0).unwrap();
        let b = graph.create_vertex(&mut ctx, 1.0, 0.0, 0.0).unwrap();
        let wrong = Curve2d::line(Point2d::new(0.0, 0.0), Point2d::new(2.0, 0.0));
        assert!(matches!(graph.add_edge(&mut ctx, a, b, wrong), Err(Error::CurveMismatch)));
    }
}
