// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for topology operations.

use crate::id::EntityId;
use crate::keys::*;

/// Result type alias for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during topology operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("vertex not found: {0:?}")]
    VertexNotFound(VertexKey),

    #[error("edge not found: {0:?}")]
    EdgeNotFound(EdgeKey),

    #[error("face not found: {0:?}")]
    FaceNotFound(FaceKey),

    #[error("sketch not found: {0:?}")]
    SketchNotFound(SketchKey),

    #[error("layer not found: {0:?}")]
    LayerNotFound(LayerKey),

    #[error("slab not found: {0:?}")]
    SlabNotFound(SlabKey),

    #[error("roof not found: {0:?}")]
    RoofNotFound(RoofKey),

    #[error("opening not found: {0:?}")]
    OpeningNotFound(OpeningKey),

    /// Coordinates that are not finite or exceed the configured magnitude.
    #[error("invalid vertex coordinates ({0}, {1}, {2})")]
    InvalidVertex(f64, f64, f64),

    /// An edge curve does not start and end at its vertices.
    #[error("edge curve does not match its end vertices")]
    CurveMismatch,

    /// The edge still bounds at least one face.
    #[error("edge {0:?} is still used by a face")]
    EdgeInUse(EdgeKey),

    /// A face outer boundary with no area.
    #[error("face outer boundary is degenerate")]
    DegenerateFace,

    /// The face is not owned by the given sketch.
    #[error("face {0:?} is not owned by sketch {1:?}")]
    NotOwned(FaceKey, SketchKey),

    #[error("unknown entity class: {0}")]
    UnknownClass(String),

    /// A record refers to an entity id that was not loaded.
    #[error("unresolved reference to entity {0}")]
    UnresolvedReference(EntityId),

    /// A stored id too close to the end of the id range.
    #[error("entity id {0} is out of range")]
    IdOutOfRange(EntityId),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Geometry(#[from] floorkit_geometry::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
