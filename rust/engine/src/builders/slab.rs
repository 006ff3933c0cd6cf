// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use floorkit_geometry::Region;
use floorkit_topology::{KernelContext, LayerKey, SlabHole, SlabKey, SlabKind, TopologyGraph};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

/// Builds the floor and ceiling slabs of layers from a sketch profile.
///
/// New slabs are staged next to the layer's current ones and the old ones
/// are retired afterwards, so a failed build leaves the current slabs alone.
pub struct SlabBuilder;

impl SlabBuilder {
    /// Replaces the floor slab of `layer`. Its top faces lie at the layer
    /// elevation.
    pub fn build_floor_from_sketch2d(
        graph: &mut TopologyGraph,
        ctx: &mut KernelContext,
        layer: LayerKey,
        profile: &[Region],
        holes: Vec<SlabHole>,
    ) -> Result<SlabKey> {
        let slab = Self::stage_floor(graph, ctx, layer, profile, holes)?;
        Self::retire_slabs(graph, layer, SlabKind::Floor, slab)?;
        Ok(slab)
    }

    /// Replaces the ceiling slab of `layer`. Its bottom faces lie at the
    /// top of the layer.
    pub fn build_ceiling_from_sketch2d(
        graph: &mut TopologyGraph,
        ctx: &mut KernelContext,
        layer: LayerKey,
        profile: &[Region],
    ) -> Result<SlabKey> {
        let slab = Self::stage_ceiling(graph, ctx, layer, profile)?;
        Self::retire_slabs(graph, layer, SlabKind::Ceiling, slab)?;
        Ok(slab)
    }

    /// Refreshes the layer's floor and ceiling face lists from its slabs.
    pub fn update_layer_slab_faces(graph: &mut TopologyGraph, layer: LayerKey) -> Result<()> {
        let collect = |kind: SlabKind, top: bool| {
            graph
                .layer_slabs(layer, kind)
                .into_iter()
                .filter_map(|s| graph.slab(s))
                .flat_map(|s| if top { s.top_faces.clone() } else { s.bottom_faces.clone() })
                .collect::<Vec<_>>()
        };
        let floor_faces = collect(SlabKind::Floor, true);
        let ceiling_faces = collect(SlabKind::Ceiling, false);
        let data = graph.layer_mut(layer).ok_or(PipelineError::LayerNotFound(layer))?;
        data.floor_faces = floor_faces;
        data.ceiling_faces = ceiling_faces;
        Ok(())
    }

    pub(crate) fn stage_floor(
        graph: &mut TopologyGraph,
        ctx: &mut KernelContext,
        layer: LayerKey,
        profile: &[Region],
        holes: Vec<SlabHole>,
    ) -> Result<SlabKey> {
        let data = graph.layer(layer).ok_or(PipelineError::LayerNotFound(layer))?;
        let top = data.elevation;
        let thickness = data.slab_thickness;
        Self::stage_slab(graph, ctx, layer, SlabKind::Floor, profile, holes, top, thickness)
    }

    pub(crate) fn stage_ceiling(
        graph: &mut TopologyGraph,
        ctx: &mut KernelContext,
        layer: LayerKey,
        profile: &[Region],
    ) -> Result<SlabKey> {
        let data = graph.layer(layer).ok_or(PipelineError::LayerNotFound(layer))?;
        let thickness = data.slab_thickness;
        let top = data.elevation + data.height + thickness;
        Self::stage_slab(graph, ctx, layer, SlabKind::Ceiling, profile, Vec::new(), top, thickness)
    }

    /// Removes the layer's slabs of `kind` other than `keep`.
    pub(crate) fn retire_slabs(graph: &mut TopologyGraph, layer: LayerKey, kind: SlabKind, keep: SlabKey) -> Result<()> {
        for old in graph.layer_slabs(layer, kind) {
            if old != keep {
                graph.remove_slab(old)?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn stage_slab(
        graph: &mut TopologyGraph,
        ctx: &mut KernelContext,
        layer: LayerKey,
        kind: SlabKind,
        profile: &[Region],
        holes: Vec<SlabHole>,
        top: f64,
        thickness: f64,
    ) -> Result<SlabKey> {
        let slab = graph.create_slab(ctx, layer, kind, profile.to_vec(), thickness)?;
        if let Err(e) = Self::add_faces(graph, ctx, slab, profile, top, thickness) {
            if let Err(cleanup) = graph.remove_slab(slab) {
                warn!(?slab, error = %cleanup, "Failed to discard partial slab");
            }
            return Err(e);
        }
        if let Some(data) = graph.slab_mut(slab) {
            data.holes = holes;
        }
        debug!(?layer, ?kind, regions = profile.len(), "Slab built");
        Ok(slab)
    }

    fn add_faces(
        graph: &mut TopologyGraph,
        ctx: &mut KernelContext,
        slab: SlabKey,
        profile: &[Region],
        top: f64,
        thickness: f64,
    ) -> Result<()> {
        for region in profile {
            for (elevation, is_top) in [(top, true), (top - thickness, false)] {
                match graph.add_slab_face(ctx, slab, region, elevation, is_top) {
                    Ok(_) => {}
                    Err(floorkit_topology::Error::DegenerateFace) => {
                        debug!(?slab, "Skipped degenerate slab face");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }
}
