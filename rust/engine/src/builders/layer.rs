// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use floorkit_geometry::{
    clean, morphological_close, offset_paths, union_all, EndType, FillRule, LoopLoopPosition,
    OffsetOptions, PositionJudge, Region,
};
use floorkit_topology::{
    EntityKey, HoleRegion, KernelContext, LayerKey, SketchKey, SlabHole, SlabKey, SlabKind,
    TopologyGraph, SLAB_HOLE_TAG,
};
use tracing::{debug, warn};

use super::{discrete_options, HoleBuilder, Sketch2dBuilder, SlabBuilder};
use crate::error::{PipelineError, Result};

/// What a successful rebuild produced.
#[derive(Debug, Clone)]
pub struct RebuildReport {
    pub layer: LayerKey,
    pub sketch: SketchKey,
    pub background: Vec<Region>,
    pub slab_holes: Vec<SlabHole>,
    pub floor_slab: SlabKey,
    /// Ceiling slab of the layer below, if there is one.
    pub ceiling_slab: Option<SlabKey>,
}

/// Runs the full rebuild of one layer.
pub struct LayerSketchBuilder;

/// Stage 4 to 6 results waiting to be installed.
struct Built {
    slab_holes: Vec<SlabHole>,
    floor_slab: SlabKey,
    /// Layer below and its new ceiling slab.
    ceiling: Option<(LayerKey, SlabKey)>,
}

/// Entities built next to the installed ones during a rebuild.
struct Staged {
    sketch: SketchKey,
    slabs: Vec<SlabKey>,
}

impl Staged {
    /// Drops everything staged, leaving the installed state untouched.
    fn discard(self, graph: &mut TopologyGraph) {
        for slab in self.slabs {
            if let Err(e) = graph.remove_slab(slab) {
                warn!(?slab, error = %e, "Failed to discard staged slab");
            }
        }
        if let Err(e) = graph.remove_sketch(self.sketch) {
            warn!(sketch = ?self.sketch, error = %e, "Failed to discard staged sketch");
        }
    }
}

impl LayerSketchBuilder {
    pub fn rebuild(graph: &mut TopologyGraph, ctx: &mut KernelContext, layer: LayerKey) -> Result<RebuildReport> {
        let data = graph.layer(layer).ok_or(PipelineError::LayerNotFound(layer))?;
        let hole_inputs = data.hole_regions.clone();

        // Stage 1
        let background = Self::generate_background(graph, ctx, layer)?;
        if background.is_empty() {
            warn!(?layer, "Rebuild aborted: layer has no background geometry");
            return Err(PipelineError::EmptyBackground(layer).into());
        }

        let sketch = graph.create_sketch(ctx, Some(layer));
        let mut staged = Staged {
            sketch,
            slabs: Vec::new(),
        };
        let built = match Self::stage(graph, ctx, layer, &background, &hole_inputs, &mut staged)
            .and_then(|built| Self::complete_update(graph, ctx, layer, sketch).map(|()| built))
        {
            Ok(built) => built,
            Err(e) => {
                warn!(?layer, error = %e, "Rebuild aborted, staged entities discarded");
                staged.discard(graph);
                return Err(e);
            }
        };

        // The new sketch is installed; retire the slabs it replaces
        if let Some((below, slab)) = built.ceiling {
            SlabBuilder::retire_slabs(graph, below, SlabKind::Ceiling, slab)?;
            SlabBuilder::update_layer_slab_faces(graph, below)?;
        }
        SlabBuilder::retire_slabs(graph, layer, SlabKind::Floor, built.floor_slab)?;
        SlabBuilder::update_layer_slab_faces(graph, layer)?;

        debug!(
            ?layer,
            regions = background.len(),
            slab_holes = built.slab_holes.len(),
            "Layer rebuilt"
        );
        Ok(RebuildReport {
            layer,
            sketch,
            background,
            slab_holes: built.slab_holes,
            floor_slab: built.floor_slab,
            ceiling_slab: built.ceiling.map(|(_, slab)| slab),
        })
    }

    /// Stages 2 to 7 on the detached sketch and on new slabs that sit next
    /// to the installed ones.
    fn stage(
        graph: &mut TopologyGraph,
        ctx: &mut KernelContext,
        layer: LayerKey,
        background: &[Region],
        hole_inputs: &[HoleRegion],
        staged: &mut Staged,
    ) -> Result<Built> {
        // Stages 2 and 3
        Self::populate(graph, ctx, staged.sketch, background, hole_inputs)?;

        // Stage 4
        let slab_holes = Self::sketch_slab_holes(graph, ctx, staged.sketch, hole_inputs)?;

        // Stages 5 and 6
        let ceiling = match graph.previous_layer(layer) {
            Some(below) => {
                let slab = SlabBuilder::stage_ceiling(graph, ctx, below, background)?;
                staged.slabs.push(slab);
                Some((below, slab))
            }
            None => None,
        };
        let floor_slab = SlabBuilder::stage_floor(graph, ctx, layer, background, slab_holes.clone())?;
        staged.slabs.push(floor_slab);

        // Stage 7
        let faces = graph
            .slab(floor_slab)
            .map(|s| s.top_faces.iter().chain(s.bottom_faces.iter()).copied().collect::<Vec<_>>())
            .unwrap_or_default();
        HoleBuilder::update_slab_hole(graph, ctx, &faces, floor_slab)?;

        Ok(Built {
            slab_holes,
            floor_slab,
            ceiling,
        })
    }

    /// Union of room loops and wall footprints, with hairline gaps closed.
    pub fn generate_background(graph: &TopologyGraph, ctx: &KernelContext, layer: LayerKey) -> Result<Vec<Region>> {
        let data = graph.layer(layer).ok_or(PipelineError::LayerNotFound(layer))?;
        let tol = ctx.tolerance();
        let opts = discrete_options(ctx);

        let mut pieces = Vec::with_capacity(data.room_loops.len() + data.walls.len());
        for lp in &data.room_loops {
            pieces.push(Region::new(lp.clone()).to_polygon_with(&opts)?);
        }
        let wall_options = OffsetOptions::default().with_end(EndType::Butt);
        for wall in &data.walls {
            if wall.path.len() < 2 || wall.width <= tol {
                debug!(wall = %wall.id, "Skipping wall without footprint");
                continue;
            }
            pieces.extend(offset_paths(std::slice::from_ref(&wall.path), wall.width / 2.0, &wall_options));
        }
        if pieces.is_empty() {
            return Ok(Vec::new());
        }

        let mut merged = union_all(&pieces, FillRule::NonZero);
        let gap = ctx.config.gap_close_distance;
        if gap > tol {
            merged = morphological_close(&merged, gap, &OffsetOptions::default());
        }
        Ok(Region::from_polygons(&clean(&merged, tol), tol))
    }

    fn populate(
        graph: &mut TopologyGraph,
        ctx: &mut KernelContext,
        sketch: SketchKey,
        background: &[Region],
        hole_inputs: &[HoleRegion],
    ) -> Result<()> {
        graph.set_sketch_background(sketch, background.to_vec())?;
        for hole in hole_inputs {
            if Sketch2dBuilder::add_face(graph, ctx, sketch, &hole.region, &[SLAB_HOLE_TAG])?.is_none() {
                debug!(hole = %hole.id, "Ignored degenerate hole region");
            }
        }
        Sketch2dBuilder::merge_faces(graph, ctx, sketch)?;
        Ok(())
    }

    /// Installs `sketch` as the layer's sketch, carrying over what belongs to
    /// the layer rather than to the derived faces.
    fn complete_update(
        graph: &mut TopologyGraph,
        ctx: &KernelContext,
        layer: LayerKey,
        sketch: SketchKey,
    ) -> Result<()> {
        let tol = ctx.tolerance();
        let previous = graph.layer(layer).and_then(|l| l.sketch);
        if let Some(old) = previous.and_then(|s| graph.sketch(s)) {
            let (transform, guidelines) = (old.transform, old.guidelines.clone());
            let carried = Self::matching_extrusions(graph, tol, previous, sketch);
            graph.set_sketch_transform(sketch, transform)?;
            for curve in guidelines {
                graph.add_guideline(sketch, curve)?;
            }
            for (face, value) in carried {
                graph.set_extrusion_value(sketch, face, value);
            }
        }

        if let Some(old) = graph.set_layer_sketch(layer, sketch)? {
            graph.remove_sketch(old)?;
        }
        graph.mark_dirty(EntityKey::Layer(layer), floorkit_topology::DirtyFlags::GEOMETRY);
        Ok(())
    }

    /// Extrusion values of old faces whose outer loop is unchanged.
    fn matching_extrusions(
        graph: &TopologyGraph,
        tol: f64,
        previous: Option<SketchKey>,
        sketch: SketchKey,
    ) -> Vec<(floorkit_topology::FaceKey, f64)> {
        let Some(previous) = previous else {
            return Vec::new();
        };
        let mut carried = Vec::new();
        for &old_face in graph.sketch_faces(previous) {
            let Some(value) = graph.extrusion_value(previous, old_face) else {
                continue;
            };
            let Ok(old_outer) = graph.face_outer_loop(old_face, tol) else {
                continue;
            };
            let matched = graph.sketch_faces(sketch).iter().copied().find(|&f| {
                graph
                    .face_outer_loop(f, tol)
                    .is_ok_and(|l| PositionJudge::loop_to_loop(&l, &old_outer, tol) == LoopLoopPosition::Equal)
            });
            if let Some(face) = matched {
                carried.push((face, value));
            }
        }
        carried
    }

    /// Slab holes of the layer's installed sketch.
    pub fn slab_holes(
        graph: &TopologyGraph,
        ctx: &KernelContext,
        layer: LayerKey,
        hole_inputs: &[HoleRegion],
    ) -> Result<Vec<SlabHole>> {
        let sketch = graph
            .layer(layer)
            .ok_or(PipelineError::LayerNotFound(layer))?
            .sketch
            .ok_or(PipelineError::MissingSketch(layer))?;
        Self::sketch_slab_holes(graph, ctx, sketch, hole_inputs)
    }

    /// Each hole face contributes its outer loop, anticlockwise, tagged with
    /// the id of the first input hole region lying within it or, failing
    /// that, with the face's own id.
    fn sketch_slab_holes(
        graph: &TopologyGraph,
        ctx: &KernelContext,
        sketch: SketchKey,
        hole_inputs: &[HoleRegion],
    ) -> Result<Vec<SlabHole>> {
        let tol = ctx.tolerance();
        let mut holes = Vec::new();
        for face in graph.sketch_faces_tagged(sketch, SLAB_HOLE_TAG) {
            let mut profile = graph.face_outer_loop(face, tol)?;
            profile.ensure_anticlockwise();
            let id = hole_inputs
                .iter()
                .find(|h| PositionJudge::loop_to_loop(&profile, &h.region.outer, tol).is_within())
                .map(|h| h.id)
                .or_else(|| graph.face(face).map(|f| f.id));
            if let Some(id) = id {
                holes.push(SlabHole { id, profile });
            }
        }
        Ok(holes)
    }
}
