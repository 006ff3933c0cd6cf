// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use floorkit_topology::{EntityId, LayerKey};
use thiserror::Error;

use crate::transaction::RequestState;

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a layer rebuild stops before changing anything.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("layer {0:?} does not exist")]
    LayerNotFound(LayerKey),

    #[error("layer {0:?} has no sketch")]
    MissingSketch(LayerKey),

    #[error("layer {0:?} has no background geometry")]
    EmptyBackground(LayerKey),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("rebuild failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Topology(#[from] floorkit_topology::Error),

    #[error(transparent)]
    Geometry(#[from] floorkit_geometry::Error),

    #[error("cannot {action} a request in state {state:?}")]
    InvalidRequestState { state: RequestState, action: &'static str },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    /// An entity a request refers to was replaced or removed since the
    /// request last ran.
    #[error("entity {0} no longer exists")]
    EntityGone(EntityId),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
