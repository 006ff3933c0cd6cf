// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dirty tracking.
//!
//! Mutations set flags on the touched entity and on everything derived from
//! it (vertex → edges → faces → sketch). Downstream consumers drain the
//! accumulated notifications with
//! [`TopologyGraph::take_dirty`](crate::arena::TopologyGraph::take_dirty).

use std::ops::{BitOr, BitOrAssign};

use rustc_hash::FxHashSet;

use crate::keys::EntityKey;

/// What needs recomputing for an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DirtyFlags {
    /// Shape changed: paths, areas and derived topology are stale.
    pub geometry: bool,
    /// Clipping against neighbours is stale (roofs, openings).
    pub clip_geometry: bool,
    /// Material assignment per face is stale.
    pub face_materials: bool,
}

impl DirtyFlags {
    pub const NONE: Self = Self {
        geometry: false,
        clip_geometry: false,
        face_materials: false,
    };
    pub const GEOMETRY: Self = Self {
        geometry: true,
        clip_geometry: false,
        face_materials: false,
    };
    pub const CLIP_GEOMETRY: Self = Self {
        geometry: false,
        clip_geometry: true,
        face_materials: false,
    };
    pub const FACE_MATERIALS: Self = Self {
        geometry: false,
        clip_geometry: false,
        face_materials: true,
    };

    pub fn is_empty(&self) -> bool {
        !(self.geometry || self.clip_geometry || self.face_materials)
    }

    /// `true` if every flag set in `other` is also set here.
    pub fn contains(&self, other: DirtyFlags) -> bool {
        (self.geometry || !other.geometry)
            && (self.clip_geometry || !other.clip_geometry)
            && (self.face_materials || !other.face_materials)
    }
}

impl BitOr for DirtyFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            geometry: self.geometry || rhs.geometry,
            clip_geometry: self.clip_geometry || rhs.clip_geometry,
            face_materials: self.face_materials || rhs.face_materials,
        }
    }
}

impl BitOrAssign for DirtyFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// Insertion-ordered set of entities with pending notifications.
#[derive(Debug, Default)]
pub(crate) struct DirtyQueue {
    order: Vec<EntityKey>,
    seen: FxHashSet<EntityKey>,
}

impl DirtyQueue {
    pub(crate) fn push(&mut self, key: EntityKey) {
        if self.seen.insert(key) {
            self.order.push(key);
        }
    }

    pub(crate) fn drain(&mut self) -> Vec<EntityKey> {
        self.seen.clear();
        std::mem::take(&mut self.order)
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine() {
        let mut flags = DirtyFlags::NONE;
        assert!(flags.is_empty());
        flags |= DirtyFlags::CLIP_GEOMETRY;
        flags |= DirtyFlags::FACE_MATERIALS;
        assert!(flags.contains(DirtyFlags::CLIP_GEOMETRY | DirtyFlags::FACE_MATERIALS));
        assert!(!flags.contains(DirtyFlags::GEOMETRY));
    }
}
