// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for arena-based storage.
//!
//! Each graph entity gets a type-safe generational key for O(1) lookup.
//! Keys are process-local; the persistent identity of an entity is its
//! [`EntityId`](crate::id::EntityId).

use slotmap::new_key_type;

new_key_type! {
    /// Key for a vertex (point shared by edges).
    pub struct VertexKey;

    /// Key for an edge (curve between two vertices).
    pub struct EdgeKey;

    /// Key for a face (outer wire plus hole wires).
    pub struct FaceKey;

    /// Key for a 2D sketch (faces, background and guidelines of a layer).
    pub struct SketchKey;

    /// Key for a building layer.
    pub struct LayerKey;

    /// Key for a floor or ceiling slab.
    pub struct SlabKey;

    /// Key for a roof.
    pub struct RoofKey;

    /// Key for a roof opening.
    pub struct OpeningKey;
}

/// A key that can reference any graph entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Vertex(VertexKey),
    Edge(EdgeKey),
    Face(FaceKey),
    Sketch(SketchKey),
    Layer(LayerKey),
    Slab(SlabKey),
    Roof(RoofKey),
    Opening(OpeningKey),
}

impl EntityKey {
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityKey::Vertex(_) => EntityType::Vertex,
            EntityKey::Edge(_) => EntityType::Edge,
            EntityKey::Face(_) => EntityType::Face,
            EntityKey::Sketch(_) => EntityType::Sketch,
            EntityKey::Layer(_) => EntityType::Layer,
            EntityKey::Slab(_) => EntityType::Slab,
            EntityKey::Roof(_) => EntityType::Roof,
            EntityKey::Opening(_) => EntityType::Opening,
        }
    }
}

/// Discriminant for graph entity types, ordered leaves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Vertex = 0,
    Edge = 1,
    Face = 2,
    Sketch = 3,
    Slab = 4,
    Opening = 5,
    Roof = 6,
    Layer = 7,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Vertex => "Vertex",
            EntityType::Edge => "Edge",
            EntityType::Face => "Face",
            EntityType::Sketch => "Sketch2d",
            EntityType::Slab => "Slab",
            EntityType::Opening => "Opening",
            EntityType::Roof => "Roof",
            EntityType::Layer => "Layer",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! entity_key_from {
    ($($key:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$key> for EntityKey {
                fn from(k: $key) -> Self {
                    EntityKey::$variant(k)
                }
            }
        )*
    };
}

entity_key_from! {
    VertexKey => Vertex,
    EdgeKey => Edge,
    FaceKey => Face,
    SketchKey => Sketch,
    LayerKey => Layer,
    SlabKey => Slab,
    RoofKey => Roof,
    OpeningKey => Opening,
}
