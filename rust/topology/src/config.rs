// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel configuration loaded from environment variables.

/// Numeric tolerances and limits shared by the graph, the builders and the
/// transactions of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelConfig {
    /// Distance below which two points are considered equal.
    pub length_tolerance: f64,
    /// Largest accepted absolute vertex coordinate.
    pub max_vertex_value: f64,
    /// Maximum deviation of discretized arcs from the true curve.
    pub discrete_tolerance: f64,
    /// Gaps narrower than twice this distance are closed in layer backgrounds.
    pub gap_close_distance: f64,
    /// Slab thickness used when a layer does not set one.
    pub default_slab_thickness: f64,
}

impl KernelConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            length_tolerance: env_f64("FLOORKIT_LENGTH_TOLERANCE", defaults.length_tolerance),
            max_vertex_value: env_f64("FLOORKIT_MAX_VERTEX_VALUE", defaults.max_vertex_value),
            discrete_tolerance: env_f64("FLOORKIT_DISCRETE_TOLERANCE", defaults.discrete_tolerance),
            gap_close_distance: env_f64("FLOORKIT_GAP_CLOSE_DISTANCE", defaults.gap_close_distance),
            default_slab_thickness: env_f64("FLOORKIT_SLAB_THICKNESS", defaults.default_slab_thickness),
        }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            length_tolerance: 1e-6,
            max_vertex_value: 1e7,
            discrete_tolerance: 1e-3,
            gap_close_distance: 1e-3,
            default_slab_thickness: 0.12,
        }
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparseable_env_falls_back() {
        std::env::set_var("FLOORKIT_TEST_ONLY_VALUE", "not-a-number");
        assert_eq!(env_f64("FLOORKIT_TEST_ONLY_VALUE", 2.5), 2.5);
        std::env::set_var("FLOORKIT_TEST_ONLY_VALUE", "0.25");
        assert_eq!(env_f64("FLOORKIT_TEST_ONLY_VALUE", 2.5), 0.25);
        std::env::remove_var("FLOORKIT_TEST_ONLY_VALUE");
        assert_eq!(env_f64("FLOORKIT_TEST_ONLY_VALUE", 2.5), 2.5);
    }

    #[test]
    fn defaults() {
        let config = KernelConfig::default();
        assert_eq!(config.max_vertex_value, 1e7);
        assert_eq!(config.default_slab_thickness, 0.12);
    }
}
