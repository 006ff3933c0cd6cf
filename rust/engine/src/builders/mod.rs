// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Layer rebuild pipeline.
//!
//! A rebuild regenerates everything derived from a layer's rooms, walls and
//! hole regions, strictly in this order:
//!
//! 1. background from room loops and wall footprints
//! 2. hole regions added to a fresh sketch as `slabhole` faces
//! 3. hole faces merged against the background
//! 4. slab holes extracted from the merged hole faces
//! 5. slab profile taken from the background
//! 6. ceiling of the layer below and floor of this layer rebuilt
//! 7. slab holes re-attached to the floor slab faces
//!
//! Stages 2 to 7 build a detached sketch and new slabs next to the
//! installed ones. They are swapped in only after every stage succeeded, so
//! a failed rebuild leaves the previous derived state in place.

mod hole;
mod layer;
mod room;
mod sketch;
mod slab;

#[cfg(test)]
mod tests;

pub use hole::HoleBuilder;
pub use layer::{LayerSketchBuilder, RebuildReport};
pub use room::RoomBuilder;
pub use sketch::{MergeOutcome, Sketch2dBuilder};
pub use slab::SlabBuilder;

use floorkit_geometry::DiscreteOptions;
use floorkit_topology::KernelContext;

/// Arc discretization used by every pipeline stage.
pub(crate) fn discrete_options(ctx: &KernelContext) -> DiscreteOptions {
    DiscreteOptions::with_tolerance(ctx.config.discrete_tolerance)
}
