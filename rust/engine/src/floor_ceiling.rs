// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pairing floor faces with the ceiling faces above them.

use floorkit_geometry::overlap_area;
use floorkit_topology::{FaceKey, FaceOwner, KernelContext, LayerKey, TopologyGraph};
use tracing::debug;

use crate::builders::discrete_options;

/// Layer whose slabs own `face`.
pub fn face_layer(graph: &TopologyGraph, face: FaceKey) -> Option<LayerKey> {
    match graph.face(face)?.owner {
        FaceOwner::Slab(slab) => graph.slab(slab)?.layer,
        FaceOwner::Sketch(sketch) => graph.sketch(sketch)?.layer,
        FaceOwner::None => None,
    }
}

/// The ceiling face covering the largest part of `floor_face`.
///
/// Candidates are the bottom faces of the ceiling slabs of the floor's
/// layer, in layer order. The first face with the strictly largest overlap
/// wins, so equal overlaps resolve to the earlier face. Returns `None` when
/// no candidate overlaps the floor at all.
pub fn floor_ceiling(graph: &TopologyGraph, ctx: &KernelContext, floor_face: FaceKey) -> Option<FaceKey> {
    let layer = face_layer(graph, floor_face)?;
    let tol = ctx.tolerance();
    let opts = discrete_options(ctx);
    let floor = graph.face_region(floor_face, tol).ok()?.to_polygon_with(&opts).ok()?;

    let mut best: Option<(FaceKey, f64)> = None;
    for &candidate in &graph.layer(layer)?.ceiling_faces {
        let Some(ceiling) = graph
            .face_region(candidate, tol)
            .ok()
            .and_then(|r| r.to_polygon_with(&opts).ok())
        else {
            debug!(?candidate, "Skipping unreadable ceiling face");
            continue;
        };
        let overlap = overlap_area(&floor, &ceiling);
        if overlap > best.map_or(0.0, |(_, area)| area) {
            best = Some((candidate, overlap));
        }
    }
    best.map(|(face, _)| face)
}
