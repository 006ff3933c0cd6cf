// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use floorkit_topology::{FaceKey, KernelContext, SlabKey, TopologyGraph};
use tracing::debug;

use crate::error::Result;

/// Cuts slab holes into slab faces.
pub struct HoleBuilder;

impl HoleBuilder {
    /// Replaces the holes of each face with the slab's holes.
    ///
    /// Holes the face refuses (outside it, or touching another hole) are
    /// skipped. Returns how many holes were attached across all faces.
    pub fn update_slab_hole(
        graph: &mut TopologyGraph,
        ctx: &mut KernelContext,
        faces: &[FaceKey],
        slab: SlabKey,
    ) -> Result<usize> {
        let holes = graph
            .slab(slab)
            .ok_or(floorkit_topology::Error::SlabNotFound(slab))?
            .holes
            .clone();
        let mut attached = 0;
        for &face in faces {
            graph.clear_face_holes(face)?;
            for hole in &holes {
                if graph.add_face_hole(ctx, face, &hole.profile) {
                    attached += 1;
                } else {
                    debug!(?face, hole = %hole.id, "Slab hole not attached");
                }
            }
        }
        Ok(attached)
    }
}
