// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use floorkit_geometry::{
    clean, difference, intersection, union_all, BooleanOptions, FillRule, Polygon2d, Region,
};
use floorkit_topology::{
    FaceKey, KernelContext, SketchKey, TopologyGraph, SLAB_HOLE_TAG,
};
use tracing::debug;

use super::discrete_options;
use crate::error::Result;

/// Faces produced by [`Sketch2dBuilder::merge_faces`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub rooms: Vec<FaceKey>,
    pub holes: Vec<FaceKey>,
}

/// Face-level operations on a whole sketch.
pub struct Sketch2dBuilder;

impl Sketch2dBuilder {
    /// Resolves the sketch's faces against its background.
    ///
    /// Hole faces are unioned and clipped to the background; every other
    /// face is replaced by the background minus the merged holes. The old
    /// faces are removed and the result is written back as fresh faces.
    pub fn merge_faces(graph: &mut TopologyGraph, ctx: &mut KernelContext, sketch: SketchKey) -> Result<MergeOutcome> {
        let tol = ctx.tolerance();
        let opts = discrete_options(ctx);
        let data = graph
            .sketch(sketch)
            .ok_or(floorkit_topology::Error::SketchNotFound(sketch))?;
        let background = data
            .background
            .regions
            .iter()
            .map(|r| r.to_polygon_with(&opts))
            .collect::<floorkit_geometry::Result<Vec<_>>>()?;

        let hole_faces = graph.sketch_faces_tagged(sketch, SLAB_HOLE_TAG);
        let mut hole_polygons = Vec::with_capacity(hole_faces.len());
        for &face in &hole_faces {
            hole_polygons.push(graph.face_region(face, tol)?.to_polygon_with(&opts)?);
        }

        let holes = if hole_polygons.is_empty() {
            Vec::new()
        } else {
            let merged = union_all(&hole_polygons, FillRule::NonZero);
            clean(&intersection(&merged, &background, &BooleanOptions::default()), tol)
        };
        let rooms: Vec<Polygon2d> = if holes.is_empty() {
            clean(&background, tol)
        } else {
            clean(&difference(&background, &holes, &BooleanOptions::default()), tol)
        };

        for face in graph.sketch_faces(sketch).to_vec() {
            graph.remove_face(face)?;
        }

        let mut outcome = MergeOutcome::default();
        for region in Region::from_polygons(&rooms, tol) {
            if let Some(face) = Self::add_face(graph, ctx, sketch, &region, &[])? {
                outcome.rooms.push(face);
            }
        }
        for region in Region::from_polygons(&holes, tol) {
            if let Some(face) = Self::add_face(graph, ctx, sketch, &region, &[SLAB_HOLE_TAG])? {
                outcome.holes.push(face);
            }
        }
        debug!(
            ?sketch,
            input_holes = hole_faces.len(),
            rooms = outcome.rooms.len(),
            holes = outcome.holes.len(),
            "Merged sketch faces"
        );
        Ok(outcome)
    }

    /// Adds a face, skipping regions that degenerate under the tolerance.
    pub(crate) fn add_face(
        graph: &mut TopologyGraph,
        ctx: &mut KernelContext,
        sketch: SketchKey,
        region: &Region,
        tags: &[&str],
    ) -> Result<Option<FaceKey>> {
        match graph.add_sketch_face(ctx, sketch, region, tags) {
            Ok(face) => Ok(Some(face)),
            Err(floorkit_topology::Error::DegenerateFace) => {
                debug!(?sketch, "Skipped degenerate face");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
