// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use floorkit_geometry::{Curve2d, Loop, Region};
use floorkit_topology::{
    DirtyFlags, EntityId, EntityKey, FaceKey, HoleRegion, KernelContext, LayerKey, RoofData,
    RoofGeneration, RoofKey, RoofSpec, SketchKey, TopologyGraph, VertexKey,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::StateRequest;
use crate::builders::RoomBuilder;
use crate::error::{Error, Result};

/// Creates a roof over a boundary loop on a layer.
///
/// Commit and redo both attach the roof the same way and rebuild the rooms
/// under it; redo keeps the roof's id, so later requests that captured it
/// still find the roof.
pub struct AddRoofRequest {
    pub layer: LayerKey,
    pub boundary: Loop,
    pub room_height: f64,
    pub linked_walls: Vec<EntityId>,
    pub generation: RoofGeneration,
    roof: Option<RoofKey>,
    roof_id: Option<EntityId>,
    removed: Option<RoofData>,
}

impl AddRoofRequest {
    pub fn new(
        layer: LayerKey,
        boundary: Loop,
        room_height: f64,
        linked_walls: Vec<EntityId>,
        generation: RoofGeneration,
    ) -> Self {
        Self {
            layer,
            boundary,
            room_height,
            linked_walls,
            generation,
            roof: None,
            roof_id: None,
            removed: None,
        }
    }

    fn install(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext, data: RoofData) -> Result<()> {
        let id = data.id;
        let roof = graph.attach_roof(data)?;
        refresh_roof(graph, ctx, roof);
        self.roof = Some(roof);
        self.roof_id = Some(id);
        Ok(())
    }
}

impl StateRequest for AddRoofRequest {
    fn on_commit(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        if graph.layer(self.layer).is_none() {
            return Err(floorkit_topology::Error::LayerNotFound(self.layer).into());
        }
        let spec = RoofSpec {
            boundary: self.boundary.clone(),
            room_height: self.room_height,
            linked_walls: self.linked_walls.clone(),
            generation: self.generation,
        };
        let data = RoofData::new(ctx.next_id(), self.layer, spec);
        self.install(graph, ctx, data)
    }

    fn on_undo(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        let id = self
            .roof_id
            .ok_or_else(|| Error::InvalidParameter("roof was never created".into()))?;
        let roof = graph.find_roof(id).ok_or(Error::EntityGone(id))?;
        let data = graph.remove_roof(roof)?;
        rebuild_rooms(graph, ctx, self.layer);
        self.removed = Some(data);
        self.roof = None;
        Ok(())
    }

    fn on_redo(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        let data = self
            .removed
            .clone()
            .ok_or_else(|| Error::InvalidParameter("no removed roof to restore".into()))?;
        self.install(graph, ctx, data)?;
        self.removed = None;
        Ok(())
    }

    fn result(&self) -> Option<EntityKey> {
        self.roof.map(EntityKey::Roof)
    }

    fn description(&self) -> &str {
        "add roof"
    }
}

/// Which boundary curve becomes the roof's first curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionTarget {
    Index(usize),
    /// Matched against the boundary ignoring direction.
    Curve(Curve2d),
}

/// Re-orders a roof boundary so a chosen curve leads.
///
/// Openings are removed on every commit or redo and are not restored by
/// undo; only the boundary order is reversible. The roof is tracked by id
/// after the commit, so undoing and redoing the request that created it
/// does not strand this one.
pub struct UpdateRoofDirectionRequest {
    pub roof: RoofKey,
    pub target: DirectionTarget,
    roof_id: Option<EntityId>,
    original: Option<Loop>,
    updated: Option<Loop>,
}

impl UpdateRoofDirectionRequest {
    pub fn new(roof: RoofKey, target: DirectionTarget) -> Self {
        Self {
            roof,
            target,
            roof_id: None,
            original: None,
            updated: None,
        }
    }

    fn start_index(&self, boundary: &Loop, tolerance: f64) -> Result<usize> {
        match &self.target {
            DirectionTarget::Index(index) if *index < boundary.len() => Ok(*index),
            DirectionTarget::Index(index) => Err(Error::InvalidParameter(format!(
                "curve index {index} out of range for a boundary of {} curves",
                boundary.len()
            ))),
            DirectionTarget::Curve(curve) => boundary
                .find_curve(curve, tolerance)
                .ok_or_else(|| Error::InvalidParameter("curve is not part of the roof boundary".into())),
        }
    }

    /// Current key of the roof captured at commit.
    fn resolve(&mut self, graph: &TopologyGraph) -> Result<RoofKey> {
        let id = self
            .roof_id
            .ok_or_else(|| Error::InvalidParameter("roof direction was never changed".into()))?;
        self.roof = graph.find_roof(id).ok_or(Error::EntityGone(id))?;
        Ok(self.roof)
    }

    fn apply(graph: &mut TopologyGraph, ctx: &mut KernelContext, roof: RoofKey, boundary: Loop) -> Result<()> {
        let removed = graph.remove_all_openings(roof)?;
        if removed > 0 {
            debug!(?roof, removed, "Removed roof openings");
        }
        graph.set_roof_boundary(roof, boundary)?;
        refresh_roof(graph, ctx, roof);
        Ok(())
    }
}

impl StateRequest for UpdateRoofDirectionRequest {
    fn on_commit(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        let data = graph
            .roof(self.roof)
            .ok_or(floorkit_topology::Error::RoofNotFound(self.roof))?;
        let (id, original) = (data.id, data.boundary.clone());
        let index = self.start_index(&original, ctx.tolerance())?;
        let mut updated = original.clone();
        updated.rotate_start(index)?;

        Self::apply(graph, ctx, self.roof, updated.clone())?;
        self.roof_id = Some(id);
        self.original = Some(original);
        self.updated = Some(updated);
        Ok(())
    }

    fn on_undo(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        let original = self
            .original
            .clone()
            .ok_or_else(|| Error::InvalidParameter("roof direction was never changed".into()))?;
        let roof = self.resolve(graph)?;
        graph.set_roof_boundary(roof, original)?;
        refresh_roof(graph, ctx, roof);
        Ok(())
    }

    fn on_redo(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        let updated = self
            .updated
            .clone()
            .ok_or_else(|| Error::InvalidParameter("roof direction was never changed".into()))?;
        let roof = self.resolve(graph)?;
        Self::apply(graph, ctx, roof, updated)
    }

    fn result(&self) -> Option<EntityKey> {
        Some(EntityKey::Roof(self.roof))
    }

    fn description(&self) -> &str {
        "update roof direction"
    }
}

/// Flags a roof for re-clipping and rebuilds the rooms under it.
fn refresh_roof(graph: &mut TopologyGraph, ctx: &mut KernelContext, roof: RoofKey) {
    graph.mark_dirty(
        EntityKey::Roof(roof),
        DirtyFlags::CLIP_GEOMETRY | DirtyFlags::FACE_MATERIALS,
    );
    if let Some(layer) = graph.roof(roof).and_then(|r| r.layer) {
        rebuild_rooms(graph, ctx, layer);
    }
}

/// A failed rebuild is logged; the roof edit itself stands.
fn rebuild_rooms(graph: &mut TopologyGraph, ctx: &mut KernelContext, layer: LayerKey) {
    if let Err(e) = RoomBuilder::build(graph, ctx, layer) {
        warn!(?layer, error = %e, "Room rebuild after roof edit failed");
    }
}

/// Adds an externally supplied hole region to a layer and rebuilds it.
pub struct AddSlabHoleRequest {
    pub layer: LayerKey,
    pub region: Region,
    hole: Option<HoleRegion>,
}

impl AddSlabHoleRequest {
    pub fn new(layer: LayerKey, region: Region) -> Self {
        Self {
            layer,
            region,
            hole: None,
        }
    }

    /// Id given to the hole region by the last commit.
    pub fn hole_id(&self) -> Option<EntityId> {
        self.hole.as_ref().map(|h| h.id)
    }

    fn captured(&self) -> Result<HoleRegion> {
        self.hole
            .clone()
            .ok_or_else(|| Error::InvalidParameter("slab hole was never added".into()))
    }

    fn insert_and_build(&self, graph: &mut TopologyGraph, ctx: &mut KernelContext, hole: HoleRegion) -> Result<()> {
        let id = hole.id;
        graph.insert_hole_region(self.layer, hole)?;
        if let Err(e) = RoomBuilder::build(graph, ctx, self.layer) {
            graph.remove_hole_region(self.layer, id)?;
            return Err(e);
        }
        Ok(())
    }
}

impl StateRequest for AddSlabHoleRequest {
    fn on_commit(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        let hole = HoleRegion {
            id: ctx.next_id(),
            region: self.region.clone(),
        };
        self.insert_and_build(graph, ctx, hole.clone())?;
        self.hole = Some(hole);
        Ok(())
    }

    fn on_undo(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        let hole = self.captured()?;
        graph.remove_hole_region(self.layer, hole.id)?;
        if let Err(e) = RoomBuilder::build(graph, ctx, self.layer) {
            graph.insert_hole_region(self.layer, hole)?;
            return Err(e);
        }
        Ok(())
    }

    fn on_redo(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        let hole = self.captured()?;
        self.insert_and_build(graph, ctx, hole)
    }

    fn result(&self) -> Option<EntityKey> {
        Some(EntityKey::Layer(self.layer))
    }

    fn description(&self) -> &str {
        "add slab hole"
    }
}

/// Moves a vertex by a displacement.
///
/// The vertex is tracked by id after the commit. A layer rebuild replaces
/// the vertices of the layer's sketch, so undoing or redoing a move of one
/// of them after a rebuild fails with [`Error::EntityGone`].
pub struct MoveVertexRequest {
    pub vertex: VertexKey,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    vertex_id: Option<EntityId>,
    before: Option<[f64; 3]>,
    after: Option<[f64; 3]>,
}

impl MoveVertexRequest {
    pub fn new(vertex: VertexKey, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            vertex,
            dx,
            dy,
            dz,
            vertex_id: None,
            before: None,
            after: None,
        }
    }

    fn resolve(&mut self, graph: &TopologyGraph) -> Result<VertexKey> {
        let id = self
            .vertex_id
            .ok_or_else(|| Error::InvalidParameter("vertex was never moved".into()))?;
        self.vertex = graph.find_vertex(id).ok_or(Error::EntityGone(id))?;
        Ok(self.vertex)
    }

    fn place(graph: &mut TopologyGraph, ctx: &KernelContext, vertex: VertexKey, [x, y, z]: [f64; 3]) -> Result<()> {
        if graph.set_vertex(ctx, vertex, x, y, z, true) {
            Ok(())
        } else {
            Err(Error::InvalidParameter(format!(
                "vertex cannot be moved to ({x}, {y}, {z})"
            )))
        }
    }
}

impl StateRequest for MoveVertexRequest {
    fn on_commit(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        let data = graph
            .vertex(self.vertex)
            .ok_or(floorkit_topology::Error::VertexNotFound(self.vertex))?;
        let id = data.id;
        let before = graph
            .vertex_coords(self.vertex)
            .ok_or(floorkit_topology::Error::VertexNotFound(self.vertex))?;
        let after = [before[0] + self.dx, before[1] + self.dy, before[2] + self.dz];
        Self::place(graph, ctx, self.vertex, after)?;
        self.vertex_id = Some(id);
        self.before = Some(before);
        self.after = Some(after);
        Ok(())
    }

    fn on_undo(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        let before = self
            .before
            .ok_or_else(|| Error::InvalidParameter("vertex was never moved".into()))?;
        let vertex = self.resolve(graph)?;
        Self::place(graph, ctx, vertex, before)
    }

    fn on_redo(&mut self, graph: &mut TopologyGraph, ctx: &mut KernelContext) -> Result<()> {
        let after = self
            .after
            .ok_or_else(|| Error::InvalidParameter("vertex was never moved".into()))?;
        let vertex = self.resolve(graph)?;
        Self::place(graph, ctx, vertex, after)
    }

    fn result(&self) -> Option<EntityKey> {
        Some(EntityKey::Vertex(self.vertex))
    }

    fn description(&self) -> &str {
        "move vertex"
    }
}

/// Sets the extrusion value of a sketch face.
pub struct SetExtrusionValueRequest {
    pub sketch: SketchKey,
    pub face: FaceKey,
    pub value: f64,
    previous: Option<Option<f64>>,
}

impl SetExtrusionValueRequest {
    pub fn new(sketch: SketchKey, face: FaceKey, value: f64) -> Self {
        Self {
            sketch,
            face,
            value,
            previous: None,
        }
    }

    fn store(&self, graph: &mut TopologyGraph) -> Result<()> {
        if !self.value.is_finite() {
            return Err(Error::InvalidParameter(format!("extrusion value {} is not finite", self.value)));
        }
        if graph.set_extrusion_value(self.sketch, self.face, self.value) {
            Ok(())
        } else {
            Err(floorkit_topology::Error::NotOwned(self.face, self.sketch).into())
        }
    }
}

impl StateRequest for SetExtrusionValueRequest {
    fn on_commit(&mut self, graph: &mut TopologyGraph, _ctx: &mut KernelContext) -> Result<()> {
        let previous = graph.extrusion_value(self.sketch, self.face);
        self.store(graph)?;
        self.previous = Some(previous);
        Ok(())
    }

    fn on_undo(&mut self, graph: &mut TopologyGraph, _ctx: &mut KernelContext) -> Result<()> {
        match self.previous {
            Some(Some(value)) => {
                if !graph.set_extrusion_value(self.sketch, self.face, value) {
                    return Err(floorkit_topology::Error::NotOwned(self.face, self.sketch).into());
                }
            }
            Some(None) => {
                graph.clear_extrusion_value(self.sketch, self.face);
            }
            None => return Err(Error::InvalidParameter("extrusion value was never set".into())),
        }
        Ok(())
    }

    fn on_redo(&mut self, graph: &mut TopologyGraph, _ctx: &mut KernelContext) -> Result<()> {
        self.store(graph)
    }

    fn result(&self) -> Option<EntityKey> {
        Some(EntityKey::Face(self.face))
    }

    fn description(&self) -> &str {
        "set extrusion value"
    }
}
