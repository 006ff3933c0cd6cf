// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistent entity identifiers.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest id a document may carry; the rest of the range stays free for
/// ids generated after loading it.
pub const MAX_STORED_ID: u64 = u64::MAX - (1 << 32);

/// Stable identity of an entity across dump/load and undo/redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source owned by a [`KernelContext`](crate::context::KernelContext).
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn generate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }

    /// Records an externally supplied id so later ids never collide with it.
    ///
    /// Ids above [`MAX_STORED_ID`] are rejected and leave the generator
    /// unchanged.
    pub fn observe(&mut self, id: EntityId) -> Result<()> {
        if id.0 > MAX_STORED_ID {
            return Err(Error::IdOutOfRange(id));
        }
        if id.0 >= self.next {
            self.next = id.0 + 1;
        }
        Ok(())
    }

    pub fn peek(&self) -> EntityId {
        EntityId(self.next)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
