// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON dump/load of graph entities.
//!
//! An entity dumps to a flat list of records, children before parents, so a
//! loader can resolve every reference from records it has already seen.
//! References between records are persistent [`EntityId`]s, never arena keys.
//!
//! Encoding rules:
//! - per-face maps (extrusion values) are written as ordered `[id, value]`
//!   pair arrays; objects keyed by id are accepted on load, as is the legacy
//!   `_extrusionValueMap` key;
//! - matrices are written as `{"elements": [..16 numbers, column-major..]}`;
//!   a bare 16-element array is accepted on load;
//! - ids can be remapped through [`LoadContext::id_map`] when importing into
//!   a document that already uses them.

use std::collections::{BTreeMap, BTreeSet};

use floorkit_geometry::{points_equal, Curve2d, Loop, Matrix4, Region};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

use crate::arena::*;
use crate::context::KernelContext;
use crate::dirty::DirtyFlags;
use crate::error::{Error, Result};
use crate::id::EntityId;
use crate::keys::*;

// ============================================================================
// Records
// ============================================================================

/// One serialized entity, tagged by its class name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Class")]
pub enum EntityRecord {
    Vertex(VertexRecord),
    Edge(EdgeRecord),
    Face(FaceRecord),
    #[serde(rename = "Sketch2d")]
    Sketch(SketchRecord),
    Layer(LayerRecord),
    Slab(SlabRecord),
    Roof(RoofRecord),
    Opening(OpeningRecord),
}

impl EntityRecord {
    pub fn id(&self) -> EntityId {
        match self {
            EntityRecord::Vertex(r) => r.id,
            EntityRecord::Edge(r) => r.id,
            EntityRecord::Face(r) => r.id,
            EntityRecord::Sketch(r) => r.id,
            EntityRecord::Layer(r) => r.id,
            EntityRecord::Slab(r) => r.id,
            EntityRecord::Roof(r) => r.id,
            EntityRecord::Opening(r) => r.id,
        }
    }

    pub fn class(&self) -> EntityClass {
        match self {
            EntityRecord::Vertex(_) => EntityClass::Vertex,
            EntityRecord::Edge(_) => EntityClass::Edge,
            EntityRecord::Face(_) => EntityClass::Face,
            EntityRecord::Sketch(_) => EntityClass::Sketch,
            EntityRecord::Layer(_) => EntityClass::Layer,
            EntityRecord::Slab(_) => EntityClass::Slab,
            EntityRecord::Roof(_) => EntityClass::Roof,
            EntityRecord::Opening(_) => EntityClass::Opening,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: EntityId,
    pub start: EntityId,
    pub end: EntityId,
    pub curve: Curve2d,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    pub edges: Vec<EntityId>,
    pub orientations: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRecord {
    pub id: EntityId,
    pub outer: WireRecord,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<WireRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SketchRecord {
    pub id: EntityId,
    pub faces: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidelines: Option<Vec<Curve2d>>,
    #[serde(
        rename = "extrusionValueMap",
        alias = "_extrusionValueMap",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "value_map"
    )]
    pub extrusion_values: Option<Vec<(EntityId, f64)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<MatrixRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRecord {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    pub elevation: f64,
    pub height: f64,
    pub slab_thickness: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub room_loops: Vec<Loop>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub walls: Vec<Wall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hole_regions: Vec<HoleRegion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sketch: Option<EntityId>,
    #[serde(default)]
    pub slabs: Vec<EntityId>,
    #[serde(default)]
    pub roofs: Vec<EntityId>,
    #[serde(default)]
    pub floor_faces: Vec<EntityId>,
    #[serde(default)]
    pub ceiling_faces: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlabRecord {
    pub id: EntityId,
    pub kind: SlabKind,
    pub profile: Vec<Region>,
    pub thickness: f64,
    #[serde(default)]
    pub top_faces: Vec<EntityId>,
    #[serde(default)]
    pub bottom_faces: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holes: Option<Vec<SlabHole>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoofRecord {
    pub id: EntityId,
    pub boundary: Loop,
    pub room_height: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_walls: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<RoofGeneration>,
    #[serde(default)]
    pub openings: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningRecord {
    pub id: EntityId,
    pub profile: Loop,
}

/// A 4×4 transform, serialized as `{"elements": [..]}` in column-major order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixRecord(pub Matrix4<f64>);

impl Serialize for MatrixRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Elements<'a> {
            elements: &'a [f64],
        }
        Elements {
            elements: self.0.as_slice(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MatrixRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Object { elements: Vec<f64> },
            Bare(Vec<f64>),
        }
        let elements = match Repr::deserialize(deserializer)? {
            Repr::Object { elements } | Repr::Bare(elements) => elements,
        };
        if elements.len() != 16 {
            return Err(de::Error::invalid_length(elements.len(), &"16 matrix elements"));
        }
        Ok(MatrixRecord(Matrix4::from_column_slice(&elements)))
    }
}

fn value_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Vec<(EntityId, f64)>>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Pairs(Vec<(EntityId, f64)>),
        Object(BTreeMap<String, f64>),
    }
    let pairs = match Repr::deserialize(deserializer)? {
        Repr::Pairs(pairs) => pairs,
        Repr::Object(map) => map
            .into_iter()
            .map(|(key, value)| {
                key.trim()
                    .parse::<u64>()
                    .map(|id| (EntityId(id), value))
                    .map_err(|_| de::Error::custom(format!("invalid entity id key `{key}`")))
            })
            .collect::<std::result::Result<_, _>>()?,
    };
    Ok(Some(pairs))
}

// ============================================================================
// Class registry
// ============================================================================

/// Serializable entity classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityClass {
    Vertex,
    Edge,
    Face,
    Sketch,
    Layer,
    Slab,
    Roof,
    Opening,
}

type DumpFn = fn(&TopologyGraph, EntityKey, bool) -> Result<EntityRecord>;
type LoadFn = fn(&mut TopologyGraph, &mut KernelContext, &EntityRecord, &mut LoadContext) -> Result<EntityKey>;

/// The dump and load functions of one class.
#[derive(Clone, Copy)]
pub struct ClassIo {
    pub dump: DumpFn,
    pub load: LoadFn,
}

impl EntityClass {
    pub const ALL: [EntityClass; 8] = [
        EntityClass::Vertex,
        EntityClass::Edge,
        EntityClass::Face,
        EntityClass::Sketch,
        EntityClass::Layer,
        EntityClass::Slab,
        EntityClass::Roof,
        EntityClass::Opening,
    ];

    /// The `Class` tag written for this class.
    pub fn tag(self) -> &'static str {
        match self {
            EntityClass::Vertex => "Vertex",
            EntityClass::Edge => "Edge",
            EntityClass::Face => "Face",
            EntityClass::Sketch => "Sketch2d",
            EntityClass::Layer => "Layer",
            EntityClass::Slab => "Slab",
            EntityClass::Roof => "Roof",
            EntityClass::Opening => "Opening",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tag() == tag)
    }

    pub fn of(key: EntityKey) -> Self {
        match key {
            EntityKey::Vertex(_) => EntityClass::Vertex,
            EntityKey::Edge(_) => EntityClass::Edge,
            EntityKey::Face(_) => EntityClass::Face,
            EntityKey::Sketch(_) => EntityClass::Sketch,
            EntityKey::Layer(_) => EntityClass::Layer,
            EntityKey::Slab(_) => EntityClass::Slab,
            EntityKey::Roof(_) => EntityClass::Roof,
            EntityKey::Opening(_) => EntityClass::Opening,
        }
    }

    pub fn io(self) -> ClassIo {
        match self {
            EntityClass::Vertex => ClassIo { dump: dump_vertex, load: load_vertex },
            EntityClass::Edge => ClassIo { dump: dump_edge, load: load_edge },
            EntityClass::Face => ClassIo { dump: dump_face, load: load_face },
            EntityClass::Sketch => ClassIo { dump: dump_sketch, load: load_sketch },
            EntityClass::Layer => ClassIo { dump: dump_layer, load: load_layer },
            EntityClass::Slab => ClassIo { dump: dump_slab, load: load_slab },
            EntityClass::Roof => ClassIo { dump: dump_roof, load: load_roof },
            EntityClass::Opening => ClassIo { dump: dump_opening, load: load_opening },
        }
    }
}

/// Maps `Class` tags found in documents to entity classes.
///
/// Seeded with the canonical tags; [`register`](Self::register) adds aliases
/// for tags written by older documents.
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    classes: FxHashMap<String, EntityClass>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        let mut classes = FxHashMap::default();
        for class in EntityClass::ALL {
            classes.insert(class.tag().to_string(), class);
        }
        classes.insert("Sketch2D".to_string(), EntityClass::Sketch);
        Self { classes }
    }

    pub fn register(&mut self, tag: impl Into<String>, class: EntityClass) {
        self.classes.insert(tag.into(), class);
    }

    pub fn resolve(&self, tag: &str) -> Result<EntityClass> {
        self.classes
            .get(tag)
            .copied()
            .ok_or_else(|| Error::UnknownClass(tag.to_string()))
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Dump
// ============================================================================

/// Options for [`dump`].
#[derive(Default)]
pub struct DumpOptions<'a> {
    /// Write fields that hold their default value.
    pub include_defaults: bool,
    /// Called on every record before it is emitted.
    pub callback: Option<Box<dyn FnMut(EntityKey, &mut EntityRecord) + 'a>>,
}

impl DumpOptions<'_> {
    pub fn with_defaults() -> Self {
        Self {
            include_defaults: true,
            callback: None,
        }
    }
}

/// Dumps an entity and everything it owns, children first.
pub fn dump(graph: &TopologyGraph, key: EntityKey, options: &mut DumpOptions<'_>) -> Result<Vec<EntityRecord>> {
    let mut dumper = Dumper::new(graph, options);
    dumper.visit(key)?;
    Ok(dumper.out)
}

/// Dumps every entity of the graph: layers bottom to top, then anything not
/// reachable from a layer.
pub fn dump_all(graph: &TopologyGraph, options: &mut DumpOptions<'_>) -> Result<Vec<EntityRecord>> {
    let mut dumper = Dumper::new(graph, options);
    for &layer in graph.layers() {
        dumper.visit(EntityKey::Layer(layer))?;
    }
    let rest: Vec<EntityKey> = graph
        .sketches
        .keys()
        .map(EntityKey::Sketch)
        .chain(graph.slabs.keys().map(EntityKey::Slab))
        .chain(graph.roofs.keys().map(EntityKey::Roof))
        .chain(graph.openings.keys().map(EntityKey::Opening))
        .chain(graph.faces.keys().map(EntityKey::Face))
        .chain(graph.edges.keys().map(EntityKey::Edge))
        .chain(graph.vertices.keys().map(EntityKey::Vertex))
        .collect();
    for key in rest {
        dumper.visit(key)?;
    }
    Ok(dumper.out)
}

pub fn to_json(graph: &TopologyGraph, key: EntityKey, options: &mut DumpOptions<'_>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&dump(graph, key, options)?)?)
}

struct Dumper<'g, 'o, 'a> {
    graph: &'g TopologyGraph,
    options: &'o mut DumpOptions<'a>,
    visited: FxHashSet<EntityKey>,
    out: Vec<EntityRecord>,
}

impl<'g, 'o, 'a> Dumper<'g, 'o, 'a> {
    fn new(graph: &'g TopologyGraph, options: &'o mut DumpOptions<'a>) -> Self {
        Self {
            graph,
            options,
            visited: FxHashSet::default(),
            out: Vec::new(),
        }
    }

    fn visit(&mut self, key: EntityKey) -> Result<()> {
        if !self.visited.insert(key) {
            return Ok(());
        }
        for child in children(self.graph, key) {
            self.visit(child)?;
        }
        let mut record = (EntityClass::of(key).io().dump)(self.graph, key, self.options.include_defaults)?;
        if let Some(callback) = self.options.callback.as_mut() {
            callback(key, &mut record);
        }
        self.out.push(record);
        Ok(())
    }
}

/// Entities owned by `key` that must be dumped before it.
fn children(graph: &TopologyGraph, key: EntityKey) -> Vec<EntityKey> {
    match key {
        EntityKey::Vertex(_) | EntityKey::Opening(_) => Vec::new(),
        EntityKey::Edge(k) => graph
            .edges
            .get(k)
            .map(|e| vec![EntityKey::Vertex(e.start), EntityKey::Vertex(e.end)])
            .unwrap_or_default(),
        EntityKey::Face(k) => graph
            .faces
            .get(k)
            .map(|f| f.wires().flat_map(|w| w.edges.iter().map(|e| EntityKey::Edge(*e))).collect())
            .unwrap_or_default(),
        EntityKey::Sketch(k) => graph.sketch_faces(k).iter().map(|f| EntityKey::Face(*f)).collect(),
        EntityKey::Slab(k) => graph
            .slabs
            .get(k)
            .map(|s| s.top_faces.iter().chain(s.bottom_faces.iter()).map(|f| EntityKey::Face(*f)).collect())
            .unwrap_or_default(),
        EntityKey::Roof(k) => graph
            .roofs
            .get(k)
            .map(|r| r.openings.iter().map(|o| EntityKey::Opening(*o)).collect())
            .unwrap_or_default(),
        EntityKey::Layer(k) => graph
            .layers
            .get(k)
            .map(|l| {
                l.sketch
                    .map(EntityKey::Sketch)
                    .into_iter()
                    .chain(l.slabs.iter().map(|s| EntityKey::Slab(*s)))
                    .chain(l.roofs.iter().map(|r| EntityKey::Roof(*r)))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn unless_default<T: PartialEq>(value: T, default: T, include_defaults: bool) -> Option<T> {
    (include_defaults || value != default).then_some(value)
}

fn ids<K: Copy>(keys: &[K], id_of: impl Fn(K) -> Option<EntityId>) -> Vec<EntityId> {
    keys.iter().filter_map(|k| id_of(*k)).collect()
}

fn dump_vertex(graph: &TopologyGraph, key: EntityKey, include_defaults: bool) -> Result<EntityRecord> {
    let EntityKey::Vertex(k) = key else {
        return Err(Error::Serialization(format!("expected a vertex, got {}", key.entity_type())));
    };
    let v = graph.vertices.get(k).ok_or(Error::VertexNotFound(k))?;
    Ok(EntityRecord::Vertex(VertexRecord {
        id: v.id,
        x: v.x,
        y: v.y,
        z: unless_default(v.z, 0.0, include_defaults),
    }))
}

fn dump_edge(graph: &TopologyGraph, key: EntityKey, _include_defaults: bool) -> Result<EntityRecord> {
    let EntityKey::Edge(k) = key else {
        return Err(Error::Serialization(format!("expected an edge, got {}", key.entity_type())));
    };
    let e = graph.edges.get(k).ok_or(Error::EdgeNotFound(k))?;
    let vertex_id = |v: VertexKey| graph.vertices.get(v).map(|d| d.id).ok_or(Error::VertexNotFound(v));
    Ok(EntityRecord::Edge(EdgeRecord {
        id: e.id,
        start: vertex_id(e.start)?,
        end: vertex_id(e.end)?,
        curve: e.curve,
    }))
}

fn wire_record(graph: &TopologyGraph, wire: &Wire) -> Result<WireRecord> {
    Ok(WireRecord {
        edges: wire
            .edges
            .iter()
            .map(|e| graph.edges.get(*e).map(|d| d.id).ok_or(Error::EdgeNotFound(*e)))
            .collect::<Result<_>>()?,
        orientations: wire.orientations.clone(),
    })
}

fn dump_face(graph: &TopologyGraph, key: EntityKey, include_defaults: bool) -> Result<EntityRecord> {
    let EntityKey::Face(k) = key else {
        return Err(Error::Serialization(format!("expected a face, got {}", key.entity_type())));
    };
    let f = graph.faces.get(k).ok_or(Error::FaceNotFound(k))?;
    let tags: Vec<String> = f.tags.iter().cloned().collect();
    Ok(EntityRecord::Face(FaceRecord {
        id: f.id,
        outer: wire_record(graph, &f.outer)?,
        holes: f.holes.iter().map(|w| wire_record(graph, w)).collect::<Result<_>>()?,
        tags: unless_default(tags, Vec::new(), include_defaults),
        elevation: unless_default(f.elevation, 0.0, include_defaults),
    }))
}

fn dump_sketch(graph: &TopologyGraph, key: EntityKey, include_defaults: bool) -> Result<EntityRecord> {
    let EntityKey::Sketch(k) = key else {
        return Err(Error::Serialization(format!("expected a sketch, got {}", key.entity_type())));
    };
    let s = graph.sketches.get(k).ok_or(Error::SketchNotFound(k))?;
    let values: Vec<(EntityId, f64)> = s.extrusion_values.iter().map(|(id, v)| (*id, *v)).collect();
    Ok(EntityRecord::Sketch(SketchRecord {
        id: s.id,
        faces: ids(&s.faces, |f| graph.faces.get(f).map(|d| d.id)),
        background: unless_default(s.background.clone(), Background::default(), include_defaults),
        guidelines: unless_default(s.guidelines.clone(), Vec::new(), include_defaults),
        extrusion_values: unless_default(values, Vec::new(), include_defaults),
        transform: unless_default(MatrixRecord(s.transform), MatrixRecord(Matrix4::identity()), include_defaults),
    }))
}

fn dump_layer(graph: &TopologyGraph, key: EntityKey, _include_defaults: bool) -> Result<EntityRecord> {
    let EntityKey::Layer(k) = key else {
        return Err(Error::Serialization(format!("expected a layer, got {}", key.entity_type())));
    };
    let l = graph.layers.get(k).ok_or(Error::LayerNotFound(k))?;
    let face_id = |f: FaceKey| graph.faces.get(f).map(|d| d.id);
    Ok(EntityRecord::Layer(LayerRecord {
        id: l.id,
        name: l.name.clone(),
        elevation: l.elevation,
        height: l.height,
        slab_thickness: l.slab_thickness,
        room_loops: l.room_loops.clone(),
        walls: l.walls.clone(),
        hole_regions: l.hole_regions.clone(),
        sketch: l.sketch.and_then(|s| graph.sketches.get(s)).map(|d| d.id),
        slabs: ids(&l.slabs, |s| graph.slabs.get(s).map(|d| d.id)),
        roofs: ids(&l.roofs, |r| graph.roofs.get(r).map(|d| d.id)),
        floor_faces: ids(&l.floor_faces, face_id),
        ceiling_faces: ids(&l.ceiling_faces, face_id),
    }))
}

fn dump_slab(graph: &TopologyGraph, key: EntityKey, include_defaults: bool) -> Result<EntityRecord> {
    let EntityKey::Slab(k) = key else {
        return Err(Error::Serialization(format!("expected a slab, got {}", key.entity_type())));
    };
    let s = graph.slabs.get(k).ok_or(Error::SlabNotFound(k))?;
    let face_id = |f: FaceKey| graph.faces.get(f).map(|d| d.id);
    Ok(EntityRecord::Slab(SlabRecord {
        id: s.id,
        kind: s.kind,
        profile: s.profile.clone(),
        thickness: s.thickness,
        top_faces: ids(&s.top_faces, face_id),
        bottom_faces: ids(&s.bottom_faces, face_id),
        holes: unless_default(s.holes.clone(), Vec::new(), include_defaults),
    }))
}

fn dump_roof(graph: &TopologyGraph, key: EntityKey, include_defaults: bool) -> Result<EntityRecord> {
    let EntityKey::Roof(k) = key else {
        return Err(Error::Serialization(format!("expected a roof, got {}", key.entity_type())));
    };
    let r = graph.roofs.get(k).ok_or(Error::RoofNotFound(k))?;
    Ok(EntityRecord::Roof(RoofRecord {
        id: r.id,
        boundary: r.boundary.clone(),
        room_height: r.room_height,
        linked_walls: r.linked_walls.clone(),
        generation: unless_default(r.generation, RoofGeneration::default(), include_defaults),
        openings: ids(&r.openings, |o| graph.openings.get(o).map(|d| d.id)),
    }))
}

fn dump_opening(graph: &TopologyGraph, key: EntityKey, _include_defaults: bool) -> Result<EntityRecord> {
    let EntityKey::Opening(k) = key else {
        return Err(Error::Serialization(format!("expected an opening, got {}", key.entity_type())));
    };
    let o = graph.openings.get(k).ok_or(Error::OpeningNotFound(k))?;
    Ok(EntityRecord::Opening(OpeningRecord {
        id: o.id,
        profile: o.profile.clone(),
    }))
}

// ============================================================================
// Load
// ============================================================================

/// State carried across the records of one load.
#[derive(Debug, Default)]
pub struct LoadContext {
    /// Stored id → id to use in this document.
    pub id_map: FxHashMap<EntityId, EntityId>,
    /// Remap stored ids through `id_map`, generating fresh ids for ids the
    /// map does not know. Only applies while `id_map` is non-empty.
    pub remap_ids: bool,
    loaded: FxHashMap<EntityId, EntityKey>,
    journal: Vec<LoadStep>,
}

/// A graph change made by the load in progress.
#[derive(Debug, Clone, Copy)]
enum LoadStep {
    Inserted(EntityKey),
    FaceOwner(FaceKey, FaceOwner),
    OpeningHost(OpeningKey, Option<RoofKey>),
    Parent(EntityKey, Option<LayerKey>),
}

impl LoadContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that imports records under the ids given by `id_map`.
    pub fn remapping(id_map: FxHashMap<EntityId, EntityId>) -> Self {
        Self {
            id_map,
            remap_ids: true,
            ..Self::default()
        }
    }

    fn remapping_active(&self) -> bool {
        self.remap_ids && !self.id_map.is_empty()
    }

    /// The id a stored id takes in this document.
    pub fn map_id(&mut self, ctx: &mut KernelContext, stored: EntityId) -> Result<EntityId> {
        let id = if self.remapping_active() {
            *self.id_map.entry(stored).or_insert_with(|| ctx.ids.generate())
        } else {
            stored
        };
        ctx.ids.observe(id)?;
        Ok(id)
    }

    /// The key of an already loaded entity referenced by its stored id.
    pub fn key_of(&self, stored: EntityId) -> Option<EntityKey> {
        let id = if self.remapping_active() {
            *self.id_map.get(&stored)?
        } else {
            stored
        };
        self.loaded.get(&id).copied()
    }

    fn resolve<K>(&self, stored: EntityId, pick: impl Fn(EntityKey) -> Option<K>) -> Result<K> {
        self.key_of(stored)
            .and_then(pick)
            .ok_or(Error::UnresolvedReference(stored))
    }

    fn record(&mut self, id: EntityId, key: EntityKey) {
        self.loaded.insert(id, key);
        self.journal.push(LoadStep::Inserted(key));
    }

    fn set_face_owner(&mut self, graph: &mut TopologyGraph, face: FaceKey, owner: FaceOwner) {
        let data = &mut graph.faces[face];
        self.journal.push(LoadStep::FaceOwner(face, data.owner));
        data.owner = owner;
    }

    fn set_opening_host(&mut self, graph: &mut TopologyGraph, opening: OpeningKey, roof: RoofKey) {
        let data = &mut graph.openings[opening];
        self.journal.push(LoadStep::OpeningHost(opening, data.host));
        data.host = Some(roof);
    }

    fn set_parent(&mut self, graph: &mut TopologyGraph, child: EntityKey, layer: LayerKey) {
        let slot = match child {
            EntityKey::Sketch(k) => &mut graph.sketches[k].layer,
            EntityKey::Slab(k) => &mut graph.slabs[k].layer,
            EntityKey::Roof(k) => &mut graph.roofs[k].layer,
            _ => return,
        };
        self.journal.push(LoadStep::Parent(child, *slot));
        *slot = Some(layer);
    }
}

/// Undoes the journaled changes of a failed load, newest first.
fn roll_back(graph: &mut TopologyGraph, journal: Vec<LoadStep>) {
    for step in journal.into_iter().rev() {
        match step {
            LoadStep::Inserted(key) => graph.discard(key),
            LoadStep::FaceOwner(face, owner) => {
                if let Some(data) = graph.faces.get_mut(face) {
                    data.owner = owner;
                }
            }
            LoadStep::OpeningHost(opening, host) => {
                if let Some(data) = graph.openings.get_mut(opening) {
                    data.host = host;
                }
            }
            LoadStep::Parent(child, layer) => {
                let slot = match child {
                    EntityKey::Sketch(k) => graph.sketches.get_mut(k).map(|d| &mut d.layer),
                    EntityKey::Slab(k) => graph.slabs.get_mut(k).map(|d| &mut d.layer),
                    EntityKey::Roof(k) => graph.roofs.get_mut(k).map(|d| &mut d.layer),
                    _ => None,
                };
                if let Some(slot) = slot {
                    *slot = layer;
                }
            }
        }
    }
}

fn as_vertex(key: EntityKey) -> Option<VertexKey> {
    match key {
        EntityKey::Vertex(k) => Some(k),
        _ => None,
    }
}

fn as_edge(key: EntityKey) -> Option<EdgeKey> {
    match key {
        EntityKey::Edge(k) => Some(k),
        _ => None,
    }
}

fn as_face(key: EntityKey) -> Option<FaceKey> {
    match key {
        EntityKey::Face(k) => Some(k),
        _ => None,
    }
}

fn as_sketch(key: EntityKey) -> Option<SketchKey> {
    match key {
        EntityKey::Sketch(k) => Some(k),
        _ => None,
    }
}

fn as_slab(key: EntityKey) -> Option<SlabKey> {
    match key {
        EntityKey::Slab(k) => Some(k),
        _ => None,
    }
}

fn as_roof(key: EntityKey) -> Option<RoofKey> {
    match key {
        EntityKey::Roof(k) => Some(k),
        _ => None,
    }
}

fn as_opening(key: EntityKey) -> Option<OpeningKey> {
    match key {
        EntityKey::Opening(k) => Some(k),
        _ => None,
    }
}

/// Loads records in order, returning the key created for each.
///
/// Either every record is loaded or the graph and `lctx` are left as they
/// were. Ids observed by the context's generator before a failure stay
/// reserved.
pub fn load(
    graph: &mut TopologyGraph,
    ctx: &mut KernelContext,
    records: &[EntityRecord],
    lctx: &mut LoadContext,
) -> Result<Vec<EntityKey>> {
    let id_map = lctx.id_map.clone();
    let loaded = lctx.loaded.clone();
    lctx.journal.clear();

    let mut keys = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        match (record.class().io().load)(graph, ctx, record, lctx) {
            Ok(key) => keys.push(key),
            Err(e) => {
                let undone = lctx.journal.len();
                roll_back(graph, std::mem::take(&mut lctx.journal));
                lctx.id_map = id_map;
                lctx.loaded = loaded;
                warn!(index, id = %record.id(), undone, error = %e, "Load failed, changes rolled back");
                return Err(e);
            }
        }
    }
    lctx.journal.clear();
    debug!(records = keys.len(), "Loaded entity records");
    Ok(keys)
}

/// Loads a JSON array of records, resolving `Class` tags through the
/// context's registry.
pub fn load_json(
    graph: &mut TopologyGraph,
    ctx: &mut KernelContext,
    value: serde_json::Value,
    lctx: &mut LoadContext,
) -> Result<Vec<EntityKey>> {
    let serde_json::Value::Array(items) = value else {
        return Err(Error::Serialization("expected an array of entity records".to_string()));
    };
    let mut records = Vec::with_capacity(items.len());
    for mut item in items {
        let tag = item
            .get("Class")
            .and_then(|c| c.as_str())
            .ok_or_else(|| Error::Serialization("record without a Class tag".to_string()))?;
        let class = ctx.registry.resolve(tag)?;
        if let Some(object) = item.as_object_mut() {
            object.insert("Class".to_string(), serde_json::Value::from(class.tag()));
        }
        records.push(serde_json::from_value::<EntityRecord>(item)?);
    }
    load(graph, ctx, &records, lctx)
}

pub fn from_json(
    graph: &mut TopologyGraph,
    ctx: &mut KernelContext,
    json: &str,
    lctx: &mut LoadContext,
) -> Result<Vec<EntityKey>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    load_json(graph, ctx, value, lctx)
}

fn mismatch(expected: EntityClass, record: &EntityRecord) -> Error {
    Error::Serialization(format!(
        "{} loader given a {} record",
        expected.tag(),
        record.class().tag()
    ))
}

fn closed_loop(lp: &Loop, ctx: &KernelContext, what: &str) -> Result<()> {
    if !lp.is_closed(ctx.tolerance()) {
        return Err(Error::Serialization(format!("{what} is not a closed loop")));
    }
    Ok(())
}

/// Loads a vertex, rejecting coordinates `set_vertex` would refuse.
fn load_vertex(
    graph: &mut TopologyGraph,
    ctx: &mut KernelContext,
    record: &EntityRecord,
    lctx: &mut LoadContext,
) -> Result<EntityKey> {
    let EntityRecord::Vertex(r) = record else {
        return Err(mismatch(EntityClass::Vertex, record));
    };
    let z = r.z.unwrap_or(0.0);
    let max = ctx.config.max_vertex_value;
    if ![r.x, r.y, z].iter().all(|c| c.is_finite() && c.abs() <= max) {
        return Err(Error::InvalidVertex(r.x, r.y, z));
    }
    let id = lctx.map_id(ctx, r.id)?;
    let key = EntityKey::Vertex(graph.insert_vertex(id, r.x, r.y, z));
    lctx.record(id, key);
    Ok(key)
}

/// Loads an edge. The curve is revalidated and must end on its vertices,
/// as for [`TopologyGraph::add_edge`].
fn load_edge(
    graph: &mut TopologyGraph,
    ctx: &mut KernelContext,
    record: &EntityRecord,
    lctx: &mut LoadContext,
) -> Result<EntityKey> {
    let EntityRecord::Edge(r) = record else {
        return Err(mismatch(EntityClass::Edge, record));
    };
    let start = lctx.resolve(r.start, as_vertex)?;
    let end = lctx.resolve(r.end, as_vertex)?;
    let tol = ctx.tolerance();
    let curve = r.curve.validated(tol)?;
    let (s, e) = (graph.vertices[start].point(), graph.vertices[end].point());
    if !points_equal(&s, &curve.start(), tol) || !points_equal(&e, &curve.end(), tol) {
        return Err(Error::CurveMismatch);
    }
    let id = lctx.map_id(ctx, r.id)?;
    let key = EntityKey::Edge(graph.insert_edge(id, start, end, curve));
    lctx.record(id, key);
    Ok(key)
}

/// Resolves a wire and checks that its curves close up.
fn load_wire(graph: &TopologyGraph, ctx: &KernelContext, lctx: &LoadContext, record: &WireRecord) -> Result<Wire> {
    if record.edges.len() != record.orientations.len() {
        return Err(Error::Serialization(format!(
            "wire has {} edges but {} orientations",
            record.edges.len(),
            record.orientations.len()
        )));
    }
    let wire = Wire {
        edges: record
            .edges
            .iter()
            .map(|e| lctx.resolve(*e, as_edge))
            .collect::<Result<_>>()?,
        orientations: record.orientations.clone(),
    };
    graph.wire_loop(&wire, ctx.tolerance())?;
    Ok(wire)
}

fn load_face(
    graph: &mut TopologyGraph,
    ctx: &mut KernelContext,
    record: &EntityRecord,
    lctx: &mut LoadContext,
) -> Result<EntityKey> {
    let EntityRecord::Face(r) = record else {
        return Err(mismatch(EntityClass::Face, record));
    };
    let outer = load_wire(graph, ctx, lctx, &r.outer)?;
    let holes = r
        .holes
        .iter()
        .map(|w| load_wire(graph, ctx, lctx, w))
        .collect::<Result<Vec<_>>>()?;
    let id = lctx.map_id(ctx, r.id)?;
    let face = graph.faces.insert(FaceData {
        id,
        outer,
        holes,
        tags: r.tags.iter().flatten().cloned().collect::<BTreeSet<_>>(),
        owner: FaceOwner::None,
        elevation: r.elevation.unwrap_or(0.0),
        dirty: DirtyFlags::NONE,
    });
    let edges: Vec<EdgeKey> = graph.faces[face].wires().flat_map(|w| w.edges.iter().copied()).collect();
    for edge in edges {
        graph.link_edge_face(edge, face);
    }
    lctx.record(id, EntityKey::Face(face));
    Ok(EntityKey::Face(face))
}

fn load_sketch(
    graph: &mut TopologyGraph,
    ctx: &mut KernelContext,
    record: &EntityRecord,
    lctx: &mut LoadContext,
) -> Result<EntityKey> {
    let EntityRecord::Sketch(r) = record else {
        return Err(mismatch(EntityClass::Sketch, record));
    };
    let faces = r
        .faces
        .iter()
        .map(|f| lctx.resolve(*f, as_face))
        .collect::<Result<Vec<_>>>()?;
    let mut extrusion_values = BTreeMap::new();
    for (face_id, value) in r.extrusion_values.iter().flatten() {
        extrusion_values.insert(lctx.map_id(ctx, *face_id)?, *value);
    }
    let id = lctx.map_id(ctx, r.id)?;
    let sketch = graph.sketches.insert(SketchData {
        id,
        layer: None,
        faces: faces.clone(),
        background: r.background.clone().unwrap_or_default(),
        guidelines: r.guidelines.clone().unwrap_or_default(),
        extrusion_values,
        transform: r.transform.map(|m| m.0).unwrap_or_else(Matrix4::identity),
        dirty: DirtyFlags::NONE,
    });
    lctx.record(id, EntityKey::Sketch(sketch));
    for face in faces {
        lctx.set_face_owner(graph, face, FaceOwner::Sketch(sketch));
    }
    Ok(EntityKey::Sketch(sketch))
}

fn load_slab(
    graph: &mut TopologyGraph,
    ctx: &mut KernelContext,
    record: &EntityRecord,
    lctx: &mut LoadContext,
) -> Result<EntityKey> {
    let EntityRecord::Slab(r) = record else {
        return Err(mismatch(EntityClass::Slab, record));
    };
    let resolve_faces = |ids: &[EntityId]| -> Result<Vec<FaceKey>> {
        ids.iter().map(|f| lctx.resolve(*f, as_face)).collect()
    };
    let top_faces = resolve_faces(&r.top_faces)?;
    let bottom_faces = resolve_faces(&r.bottom_faces)?;
    let mut holes = Vec::new();
    for hole in r.holes.iter().flatten() {
        closed_loop(&hole.profile, ctx, "slab hole profile")?;
        holes.push(SlabHole {
            id: lctx.map_id(ctx, hole.id)?,
            profile: hole.profile.clone(),
        });
    }
    let id = lctx.map_id(ctx, r.id)?;
    let slab = graph.slabs.insert(SlabData {
        id,
        kind: r.kind,
        layer: None,
        profile: r.profile.clone(),
        thickness: r.thickness,
        top_faces: top_faces.clone(),
        bottom_faces: bottom_faces.clone(),
        holes,
        dirty: DirtyFlags::NONE,
    });
    lctx.record(id, EntityKey::Slab(slab));
    for face in top_faces.into_iter().chain(bottom_faces) {
        lctx.set_face_owner(graph, face, FaceOwner::Slab(slab));
    }
    Ok(EntityKey::Slab(slab))
}

/// Loads an opening. Its host is set when the owning roof loads.
fn load_opening(
    graph: &mut TopologyGraph,
    ctx: &mut KernelContext,
    record: &EntityRecord,
    lctx: &mut LoadContext,
) -> Result<EntityKey> {
    let EntityRecord::Opening(r) = record else {
        return Err(mismatch(EntityClass::Opening, record));
    };
    closed_loop(&r.profile, ctx, "opening profile")?;
    let id = lctx.map_id(ctx, r.id)?;
    let opening = graph.openings.insert(OpeningData {
        id,
        host: None,
        profile: r.profile.clone(),
        dirty: DirtyFlags::NONE,
    });
    lctx.record(id, EntityKey::Opening(opening));
    Ok(EntityKey::Opening(opening))
}

/// Loads a roof and hosts its already loaded openings. The layer is set
/// when the owning layer loads.
fn load_roof(
    graph: &mut TopologyGraph,
    ctx: &mut KernelContext,
    record: &EntityRecord,
    lctx: &mut LoadContext,
) -> Result<EntityKey> {
    let EntityRecord::Roof(r) = record else {
        return Err(mismatch(EntityClass::Roof, record));
    };
    closed_loop(&r.boundary, ctx, "roof boundary")?;
    let openings = r
        .openings
        .iter()
        .map(|o| lctx.resolve(*o, as_opening))
        .collect::<Result<Vec<_>>>()?;
    let linked_walls = r
        .linked_walls
        .iter()
        .map(|w| lctx.map_id(ctx, *w))
        .collect::<Result<Vec<_>>>()?;
    let id = lctx.map_id(ctx, r.id)?;
    let roof = graph.roofs.insert(RoofData {
        id,
        layer: None,
        boundary: r.boundary.clone(),
        room_height: r.room_height,
        linked_walls,
        generation: r.generation.unwrap_or_default(),
        openings: openings.clone(),
        dirty: DirtyFlags::NONE,
    });
    lctx.record(id, EntityKey::Roof(roof));
    for opening in openings {
        lctx.set_opening_host(graph, opening, roof);
    }
    Ok(EntityKey::Roof(roof))
}

/// Loads a layer on top of the existing ones and adopts its already loaded
/// sketch, slabs and roofs.
fn load_layer(
    graph: &mut TopologyGraph,
    ctx: &mut KernelContext,
    record: &EntityRecord,
    lctx: &mut LoadContext,
) -> Result<EntityKey> {
    let EntityRecord::Layer(r) = record else {
        return Err(mismatch(EntityClass::Layer, record));
    };
    for lp in &r.room_loops {
        closed_loop(lp, ctx, "room loop")?;
    }
    let sketch = r.sketch.map(|s| lctx.resolve(s, as_sketch)).transpose()?;
    let slabs = r.slabs.iter().map(|s| lctx.resolve(*s, as_slab)).collect::<Result<Vec<_>>>()?;
    let roofs = r.roofs.iter().map(|s| lctx.resolve(*s, as_roof)).collect::<Result<Vec<_>>>()?;
    let floor_faces = r
        .floor_faces
        .iter()
        .map(|f| lctx.resolve(*f, as_face))
        .collect::<Result<Vec<_>>>()?;
    let ceiling_faces = r
        .ceiling_faces
        .iter()
        .map(|f| lctx.resolve(*f, as_face))
        .collect::<Result<Vec<_>>>()?;
    let mut walls = Vec::with_capacity(r.walls.len());
    for w in &r.walls {
        walls.push(Wall {
            id: lctx.map_id(ctx, w.id)?,
            path: w.path.clone(),
            width: w.width,
        });
    }
    let mut hole_regions = Vec::with_capacity(r.hole_regions.len());
    for h in &r.hole_regions {
        hole_regions.push(HoleRegion {
            id: lctx.map_id(ctx, h.id)?,
            region: h.region.clone(),
        });
    }

    let id = lctx.map_id(ctx, r.id)?;
    let layer = graph.layers.insert(LayerData {
        id,
        name: r.name.clone(),
        elevation: r.elevation,
        height: r.height,
        slab_thickness: r.slab_thickness,
        room_loops: r.room_loops.clone(),
        walls,
        hole_regions,
        sketch,
        slabs: slabs.clone(),
        roofs: roofs.clone(),
        floor_faces,
        ceiling_faces,
        dirty: DirtyFlags::NONE,
    });
    graph.layer_order.push(layer);
    lctx.record(id, EntityKey::Layer(layer));
    let children = sketch
        .map(EntityKey::Sketch)
        .into_iter()
        .chain(slabs.into_iter().map(EntityKey::Slab))
        .chain(roofs.into_iter().map(EntityKey::Roof));
    for child in children {
        lctx.set_parent(graph, child, layer);
    }
    Ok(EntityKey::Layer(layer))
}
