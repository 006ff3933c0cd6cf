// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-document kernel state passed explicitly to builders and requests.

use crate::config::KernelConfig;
use crate::id::{EntityId, IdGenerator};
use crate::io::ClassRegistry;

/// Configuration, id source and class registry of one document.
#[derive(Debug, Clone)]
pub struct KernelContext {
    pub config: KernelConfig,
    pub ids: IdGenerator,
    pub registry: ClassRegistry,
}

impl KernelContext {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            ids: IdGenerator::new(),
            registry: ClassRegistry::new(),
        }
    }

    /// Context configured from `FLOORKIT_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(KernelConfig::from_env())
    }

    pub fn next_id(&mut self) -> EntityId {
        self.ids.generate()
    }

    pub fn tolerance(&self) -> f64 {
        self.config.length_tolerance
    }
}

impl Default for KernelContext {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}
