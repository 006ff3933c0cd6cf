// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Floorkit Engine
//!
//! Turns the rooms, walls and hole regions of a layer into its derived
//! sketch, floor and ceiling slabs, and wraps every user edit in a
//! reversible request.
//!
//! ```rust,ignore
//! use floorkit_engine::{transaction::{AddSlabHoleRequest, TransactionManager}, RoomBuilder};
//!
//! RoomBuilder::build(&mut graph, &mut ctx, layer)?;
//! let mut manager = TransactionManager::new();
//! manager.commit(&mut graph, &mut ctx, Box::new(AddSlabHoleRequest::new(layer, region)))?;
//! manager.undo(&mut graph, &mut ctx)?;
//! ```

pub mod builders;
pub mod error;
pub mod floor_ceiling;
pub mod logging;
pub mod transaction;

pub use builders::{
    HoleBuilder, LayerSketchBuilder, MergeOutcome, RebuildReport, RoomBuilder, Sketch2dBuilder,
    SlabBuilder,
};
pub use error::{Error, PipelineError, Result};
pub use floor_ceiling::{face_layer, floor_ceiling};
pub use transaction::{RequestState, StateRequest, TransactionManager};
