// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Floorkit Topology
//!
//! Topology graph of a floor-plan document: vertices shared by curved edges,
//! faces bounded by wires of edges, sketches grouping the faces of one
//! building layer, and the layers, slabs, roofs and openings derived from
//! them.
//!
//! All entities live in slot-map arenas inside a [`TopologyGraph`] and refer
//! to each other by key. Upward indices (vertex → edges, edge → faces) let a
//! vertex edit rebuild the curves that use it and flag every dependent
//! entity through [`DirtyFlags`]. Per-document state (tolerances, the id
//! generator, the serialization class registry) lives in a
//! [`KernelContext`] passed explicitly to every mutating call.

pub mod arena;
pub mod building;
pub mod config;
pub mod construction;
pub mod context;
pub mod dirty;
pub mod error;
pub mod face;
pub mod id;
pub mod io;
pub mod keys;
pub mod sketch;
pub mod traversal;

pub use arena::{
    Background, EdgeData, FaceData, FaceOwner, HoleRegion, LayerData, OpeningData, RoofData,
    RoofGeneration, SketchData, SlabData, SlabHole, SlabKind, TopologyGraph, VertexData, Wall,
    Wire, SLAB_HOLE_TAG,
};
pub use building::{LayerSpec, RoofSpec};
pub use config::KernelConfig;
pub use context::KernelContext;
pub use dirty::DirtyFlags;
pub use error::{Error, Result};
pub use face::FaceSpec;
pub use id::{EntityId, IdGenerator};
pub use io::{ClassRegistry, DumpOptions, EntityClass, EntityRecord, LoadContext};
pub use keys::{
    EdgeKey, EntityKey, EntityType, FaceKey, LayerKey, OpeningKey, RoofKey, SketchKey, SlabKey,
    VertexKey,
};
pub use traversal::{planar_transform, RawPath2d};
