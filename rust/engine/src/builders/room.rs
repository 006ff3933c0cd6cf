// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use floorkit_topology::{DirtyFlags, EntityKey, KernelContext, LayerKey, TopologyGraph};
use tracing::info;

use super::{LayerSketchBuilder, RebuildReport};
use crate::error::{PipelineError, Result};

/// Entry point used by edits that change a layer's rooms.
pub struct RoomBuilder;

impl RoomBuilder {
    /// Rebuilds the layer and flags its roofs for re-clipping.
    pub fn build(graph: &mut TopologyGraph, ctx: &mut KernelContext, layer: LayerKey) -> Result<RebuildReport> {
        let report = LayerSketchBuilder::rebuild(graph, ctx, layer)?;
        let roofs = graph
            .layer(layer)
            .ok_or(PipelineError::LayerNotFound(layer))?
            .roofs
            .clone();
        for roof in &roofs {
            graph.mark_dirty(EntityKey::Roof(*roof), DirtyFlags::CLIP_GEOMETRY);
        }
        info!(
            ?layer,
            slab_holes = report.slab_holes.len(),
            roofs = roofs.len(),
            "Rooms rebuilt"
        );
        Ok(report)
    }
}
