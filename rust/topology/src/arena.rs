// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for the floor-plan topology graph.
//!
//! The [`TopologyGraph`] is the central owner of all entities. Each one lives
//! in a slot map with a stable, generational key; references between
//! entities are keys, never pointers. Upward adjacency indices
//! (vertex → edges, edge → faces) let a vertex edit reach every curve and
//! face built on it without ownership cycles.
//!
//! ## Ownership
//!
//! A vertex is shared by the edges that use it and is destroyed with the
//! last of them. Faces own their wires. A sketch owns its faces, a slab its
//! top and bottom faces, and a layer its sketch, slabs and roofs.

use std::collections::{BTreeMap, BTreeSet};

use floorkit_geometry::{Curve2d, Loop, Matrix4, Point2d, Region};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::dirty::{DirtyFlags, DirtyQueue};
use crate::id::EntityId;
use crate::keys::*;

/// Tag carried by faces that cut holes through the layer's slabs.
pub const SLAB_HOLE_TAG: &str = "slabhole";

/// Data stored for a vertex: a point shared by edges.
#[derive(Debug, Clone)]
pub struct VertexData {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub dirty: DirtyFlags,
}

impl VertexData {
    pub fn point(&self) -> Point2d {
        Point2d::new(self.x, self.y)
    }
}

/// Data stored for an edge: a curve running from `start` to `end`.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub id: EntityId,
    pub start: VertexKey,
    pub end: VertexKey,
    pub curve: Curve2d,
    pub dirty: DirtyFlags,
}

/// An ordered closed chain of edges bounding a face.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wire {
    pub edges: Vec<EdgeKey>,
    /// `true` if edge[i] is traversed forward (start→end), `false` if reversed.
    pub orientations: Vec<bool>,
}

impl Wire {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EdgeKey, bool)> + '_ {
        self.edges.iter().copied().zip(self.orientations.iter().copied())
    }
}

/// The entity a face belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaceOwner {
    #[default]
    None,
    Sketch(SketchKey),
    Slab(SlabKey),
}

/// Data stored for a face: one outer wire and zero or more hole wires.
#[derive(Debug, Clone)]
pub struct FaceData {
    pub id: EntityId,
    pub outer: Wire,
    pub holes: Vec<Wire>,
    pub tags: BTreeSet<String>,
    pub owner: FaceOwner,
    pub elevation: f64,
    pub dirty: DirtyFlags,
}

impl FaceData {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_slab_hole(&self) -> bool {
        self.has_tag(SLAB_HOLE_TAG)
    }

    pub(crate) fn wires(&self) -> impl Iterator<Item = &Wire> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }
}

/// Background of a sketch: the merged regions covered by the layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Background {
    pub regions: Vec<Region>,
}

/// Data stored for a 2D sketch.
#[derive(Debug, Clone)]
pub struct SketchData {
    pub id: EntityId,
    pub layer: Option<LayerKey>,
    pub faces: Vec<FaceKey>,
    pub background: Background,
    pub guidelines: Vec<Curve2d>,
    /// Extrusion value per face, keyed by face id.
    pub extrusion_values: BTreeMap<EntityId, f64>,
    pub transform: Matrix4<f64>,
    pub dirty: DirtyFlags,
}

/// A wall given by its centerline and full width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub id: EntityId,
    pub path: Vec<Point2d>,
    pub width: f64,
}

/// An externally supplied region to cut out of a layer's slabs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoleRegion {
    pub id: EntityId,
    pub region: Region,
}

/// Data stored for a building layer.
#[derive(Debug, Clone)]
pub struct LayerData {
    pub id: EntityId,
    pub name: String,
    pub elevation: f64,
    pub height: f64,
    pub slab_thickness: f64,
    pub room_loops: Vec<Loop>,
    pub walls: Vec<Wall>,
    pub hole_regions: Vec<HoleRegion>,
    pub sketch: Option<SketchKey>,
    pub slabs: Vec<SlabKey>,
    pub roofs: Vec<RoofKey>,
    /// Top faces of the layer's floor slabs.
    pub floor_faces: Vec<FaceKey>,
    /// Bottom faces of the layer's ceiling slabs.
    pub ceiling_faces: Vec<FaceKey>,
    pub dirty: DirtyFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlabKind {
    Floor,
    Ceiling,
}

/// A hole through a slab with the id of the input it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabHole {
    pub id: EntityId,
    pub profile: Loop,
}

/// Data stored for a floor or ceiling slab.
#[derive(Debug, Clone)]
pub struct SlabData {
    pub id: EntityId,
    pub kind: SlabKind,
    pub layer: Option<LayerKey>,
    /// Outline regions the slab covers.
    pub profile: Vec<Region>,
    pub thickness: f64,
    pub top_faces: Vec<FaceKey>,
    pub bottom_faces: Vec<FaceKey>,
    pub holes: Vec<SlabHole>,
    pub dirty: DirtyFlags,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoofGeneration {
    #[default]
    Flat,
    Shed,
    Gable,
    Hip,
}

/// Data stored for a roof over a boundary loop.
///
/// The first boundary curve is the roof's reference direction.
#[derive(Debug, Clone)]
pub struct RoofData {
    pub id: EntityId,
    pub layer: Option<LayerKey>,
    pub boundary: Loop,
    pub room_height: f64,
    pub linked_walls: Vec<EntityId>,
    pub generation: RoofGeneration,
    pub openings: Vec<OpeningKey>,
    pub dirty: DirtyFlags,
}

/// Data stored for an opening cut into a roof.
#[derive(Debug, Clone)]
pub struct OpeningData {
    pub id: EntityId,
    pub host: Option<RoofKey>,
    pub profile: Loop,
    pub dirty: DirtyFlags,
}

/// The central graph that owns all entities and their adjacency indices.
///
/// # Example
///
/// ```
/// use floorkit_topology::{KernelContext, TopologyGraph};
///
/// let mut ctx = KernelContext::default();
/// let mut graph = TopologyGraph::new();
/// let a = graph.create_vertex(&mut ctx, 0.0, 0.0, 0.0).unwrap();
/// let b = graph.create_vertex(&mut ctx, 1.0, 0.0, 0.0).unwrap();
/// graph.add_line_edge(&mut ctx, a, b).unwrap();
///
/// assert_eq!(graph.vertex_count(), 2);
/// assert_eq!(graph.vertex_edges(a).len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct TopologyGraph {
    // Entity storage
    pub(crate) vertices: SlotMap<VertexKey, VertexData>,
    pub(crate) edges: SlotMap<EdgeKey, EdgeData>,
    pub(crate) faces: SlotMap<FaceKey, FaceData>,
    pub(crate) sketches: SlotMap<SketchKey, SketchData>,
    pub(crate) layers: SlotMap<LayerKey, LayerData>,
    pub(crate) slabs: SlotMap<SlabKey, SlabData>,
    pub(crate) roofs: SlotMap<RoofKey, RoofData>,
    pub(crate) openings: SlotMap<OpeningKey, OpeningData>,

    // Upward adjacency: child → parents
    pub(crate) vertex_to_edges: FxHashMap<VertexKey, FxHashSet<EdgeKey>>,
    pub(crate) edge_to_faces: FxHashMap<EdgeKey, FxHashSet<FaceKey>>,

    /// Layers bottom to top.
    pub(crate) layer_order: Vec<LayerKey>,

    pub(crate) dirty_queue: DirtyQueue,
}

macro_rules! entity_accessors {
    ($($map:ident: $key:ty => $data:ty, $get:ident, $get_mut:ident, $count:ident;)*) => {
        $(
            pub fn $get(&self, key: $key) -> Option<&$data> {
                self.$map.get(key)
            }

            pub fn $get_mut(&mut self, key: $key) -> Option<&mut $data> {
                self.$map.get_mut(key)
            }

            pub fn $count(&self) -> usize {
                self.$map.len()
            }
        )*
    };
}

impl TopologyGraph {
    /// Creates a new, empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    entity_accessors! {
        vertices: VertexKey => VertexData, vertex, vertex_mut, vertex_count;
        edges: EdgeKey => EdgeData, edge, edge_mut, edge_count;
        faces: FaceKey => FaceData, face, face_mut, face_count;
        sketches: SketchKey => SketchData, sketch, sketch_mut, sketch_count;
        layers: LayerKey => LayerData, layer, layer_mut, layer_count;
        slabs: SlabKey => SlabData, slab, slab_mut, slab_count;
        roofs: RoofKey => RoofData, roof, roof_mut, roof_count;
        openings: OpeningKey => OpeningData, opening, opening_mut, opening_count;
    }

    /// Returns the coordinates of a vertex as `[x, y, z]`.
    pub fn vertex_coords(&self, key: VertexKey) -> Option<[f64; 3]> {
        self.vertices.get(key).map(|v| [v.x, v.y, v.z])
    }

    /// Returns `true` if the given key references a live entity.
    pub fn contains(&self, key: EntityKey) -> bool {
        match key {
            EntityKey::Vertex(k) => self.vertices.contains_key(k),
            EntityKey::Edge(k) => self.edges.contains_key(k),
            EntityKey::Face(k) => self.faces.contains_key(k),
            EntityKey::Sketch(k) => self.sketches.contains_key(k),
            EntityKey::Layer(k) => self.layers.contains_key(k),
            EntityKey::Slab(k) => self.slabs.contains_key(k),
            EntityKey::Roof(k) => self.roofs.contains_key(k),
            EntityKey::Opening(k) => self.openings.contains_key(k),
        }
    }

    pub fn entity_id(&self, key: EntityKey) -> Option<EntityId> {
        match key {
            EntityKey::Vertex(k) => self.vertices.get(k).map(|e| e.id),
            EntityKey::Edge(k) => self.edges.get(k).map(|e| e.id),
            EntityKey::Face(k) => self.faces.get(k).map(|e| e.id),
            EntityKey::Sketch(k) => self.sketches.get(k).map(|e| e.id),
            EntityKey::Layer(k) => self.layers.get(k).map(|e| e.id),
            EntityKey::Slab(k) => self.slabs.get(k).map(|e| e.id),
            EntityKey::Roof(k) => self.roofs.get(k).map(|e| e.id),
            EntityKey::Opening(k) => self.openings.get(k).map(|e| e.id),
        }
    }

    /// Looks a face up by its persistent id.
    pub fn find_face(&self, id: EntityId) -> Option<FaceKey> {
        self.faces.iter().find(|(_, f)| f.id == id).map(|(k, _)| k)
    }

    pub fn find_vertex(&self, id: EntityId) -> Option<VertexKey> {
        self.vertices.iter().find(|(_, v)| v.id == id).map(|(k, _)| k)
    }

    /// Looks a roof up by its persistent id. A roof restored after removal
    /// keeps its id but not its key.
    pub fn find_roof(&self, id: EntityId) -> Option<RoofKey> {
        self.roofs.iter().find(|(_, r)| r.id == id).map(|(k, _)| k)
    }

    /// Drops a single entity and its adjacency entries without touching the
    /// entities it refers to. Callers discard dependents first.
    pub(crate) fn discard(&mut self, key: EntityKey) {
        match key {
            EntityKey::Vertex(k) => {
                self.vertices.remove(k);
                self.vertex_to_edges.remove(&k);
            }
            EntityKey::Edge(k) => {
                if let Some(edge) = self.edges.remove(k) {
                    self.unlink_vertex_edge(edge.start, k);
                    self.unlink_vertex_edge(edge.end, k);
                }
                self.edge_to_faces.remove(&k);
            }
            EntityKey::Face(k) => {
                if let Some(face) = self.faces.remove(k) {
                    for edge in face.wires().flat_map(|w| w.edges.iter().copied()) {
                        self.unlink_edge_face(edge, k);
                    }
                }
            }
            EntityKey::Sketch(k) => {
                self.sketches.remove(k);
            }
            EntityKey::Layer(k) => {
                self.layers.remove(k);
                self.layer_order.retain(|l| *l != k);
            }
            EntityKey::Slab(k) => {
                self.slabs.remove(k);
            }
            EntityKey::Roof(k) => {
                self.roofs.remove(k);
            }
            EntityKey::Opening(k) => {
                self.openings.remove(k);
            }
        }
    }

    /// Edges that use a vertex.
    pub fn vertex_edges(&self, key: VertexKey) -> Vec<EdgeKey> {
        self.vertex_to_edges
            .get(&key)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Faces whose wires use an edge.
    pub fn edge_faces(&self, key: EdgeKey) -> Vec<FaceKey> {
        self.edge_to_faces
            .get(&key)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    // --- Dirty tracking ---

    /// Flags `key` and everything derived from it.
    pub fn mark_dirty(&mut self, key: EntityKey, flags: DirtyFlags) {
        if flags.is_empty() || !self.set_dirty(key, flags) {
            return;
        }
        match key {
            EntityKey::Vertex(k) => {
                for edge in self.vertex_edges(k) {
                    self.mark_dirty(EntityKey::Edge(edge), flags);
                }
            }
            EntityKey::Edge(k) => {
                for face in self.edge_faces(k) {
                    self.mark_dirty(EntityKey::Face(face), flags);
                }
            }
            EntityKey::Face(k) => match self.faces[k].owner {
                FaceOwner::Sketch(sketch) => self.mark_dirty(EntityKey::Sketch(sketch), flags),
                FaceOwner::Slab(slab) => self.mark_dirty(EntityKey::Slab(slab), flags),
                FaceOwner::None => {}
            },
            _ => {}
        }
    }

    fn set_dirty(&mut self, key: EntityKey, flags: DirtyFlags) -> bool {
        let slot = match key {
            EntityKey::Vertex(k) => self.vertices.get_mut(k).map(|e| &mut e.dirty),
            EntityKey::Edge(k) => self.edges.get_mut(k).map(|e| &mut e.dirty),
            EntityKey::Face(k) => self.faces.get_mut(k).map(|e| &mut e.dirty),
            EntityKey::Sketch(k) => self.sketches.get_mut(k).map(|e| &mut e.dirty),
            EntityKey::Layer(k) => self.layers.get_mut(k).map(|e| &mut e.dirty),
            EntityKey::Slab(k) => self.slabs.get_mut(k).map(|e| &mut e.dirty),
            EntityKey::Roof(k) => self.roofs.get_mut(k).map(|e| &mut e.dirty),
            EntityKey::Opening(k) => self.openings.get_mut(k).map(|e| &mut e.dirty),
        };
        match slot {
            Some(dirty) => {
                *dirty |= flags;
                self.dirty_queue.push(key);
                true
            }
            None => false,
        }
    }

    /// Pending flags of an entity (empty if clean or missing).
    pub fn dirty_flags(&self, key: EntityKey) -> DirtyFlags {
        match key {
            EntityKey::Vertex(k) => self.vertices.get(k).map(|e| e.dirty),
            EntityKey::Edge(k) => self.edges.get(k).map(|e| e.dirty),
            EntityKey::Face(k) => self.faces.get(k).map(|e| e.dirty),
            EntityKey::Sketch(k) => self.sketches.get(k).map(|e| e.dirty),
            EntityKey::Layer(k) => self.layers.get(k).map(|e| e.dirty),
            EntityKey::Slab(k) => self.slabs.get(k).map(|e| e.dirty),
            EntityKey::Roof(k) => self.roofs.get(k).map(|e| e.dirty),
            EntityKey::Opening(k) => self.openings.get(k).map(|e| e.dirty),
        }
        .unwrap_or_default()
    }

    /// Drains pending notifications in the order entities were first flagged,
    /// clearing their flags. Entities removed since being flagged are skipped.
    pub fn take_dirty(&mut self) -> Vec<(EntityKey, DirtyFlags)> {
        let keys = self.dirty_queue.drain();
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let flags = self.dirty_flags(key);
            if flags.is_empty() {
                continue;
            }
            self.set_clean(key);
            out.push((key, flags));
        }
        out
    }

    pub fn pending_dirty_count(&self) -> usize {
        self.dirty_queue.len()
    }

    fn set_clean(&mut self, key: EntityKey) {
        let clean = DirtyFlags::NONE;
        match key {
            EntityKey::Vertex(k) => self.vertices[k].dirty = clean,
            EntityKey::Edge(k) => self.edges[k].dirty = clean,
            EntityKey::Face(k) => self.faces[k].dirty = clean,
            EntityKey::Sketch(k) => self.sketches[k].dirty = clean,
            EntityKey::Layer(k) => self.layers[k].dirty = clean,
            EntityKey::Slab(k) => self.slabs[k].dirty = clean,
            EntityKey::Roof(k) => self.roofs[k].dirty = clean,
            EntityKey::Opening(k) => self.openings[k].dirty = clean,
        }
    }

    // --- Adjacency index helpers ---

    /// Register that an edge uses a vertex (upward adjacency).
    pub(crate) fn link_vertex_edge(&mut self, vertex: VertexKey, edge: EdgeKey) {
        self.vertex_to_edges.entry(vertex).or_default().insert(edge);
    }

    pub(crate) fn unlink_vertex_edge(&mut self, vertex: VertexKey, edge: EdgeKey) {
        if let Some(set) = self.vertex_to_edges.get_mut(&vertex) {
            set.remove(&edge);
            if set.is_empty() {
                self.vertex_to_edges.remove(&vertex);
            }
        }
    }

    /// Register that a face uses an edge (upward adjacency).
    pub(crate) fn link_edge_face(&mut self, edge: EdgeKey, face: FaceKey) {
        self.edge_to_faces.entry(edge).or_default().insert(face);
    }

    pub(crate) fn unlink_edge_face(&mut self, edge: EdgeKey, face: FaceKey) {
        if let Some(set) = self.edge_to_faces.get_mut(&edge) {
            set.remove(&face);
            if set.is_empty() {
                self.edge_to_faces.remove(&edge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_graph_is_empty() {
        let graph = TopologyGraph::new();
        assert_eq!(graph.vertex_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.face_count(), 0);
        assert_eq!(graph.sketch_count(), 0);
        assert_eq!(graph.layer_count(), 0);
        assert_eq!(graph.pending_dirty_count(), 0);
    }

    #[test]
    fn wire_iterates_pairs() {
        let mut edges: SlotMap<EdgeKey, ()> = SlotMap::with_key();
        let (a, b) = (edges.insert(()), edges.insert(()));
        let wire = Wire {
            edges: vec![a, b],
            orientations: vec![true, false],
        };
        assert_eq!(wire.iter().collect::<Vec<_>>(), vec![(a, true), (b, false)]);
    }
}
