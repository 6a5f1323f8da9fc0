// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Construction-time configuration of the light manager.

use super::error::LightingError;
use super::light::{LightCategory, LightKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the agent does when a queued shadow update finds no atlas space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExhaustionPolicy {
    /// Return [`LightingError::AtlasExhausted`] to the caller.
    #[default]
    Abort,
    /// Log the error, keep the partial frame and retry on the next one.
    SkipFrame,
}

/// Lighting and shadow configuration. Immutable once the agent is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSettings {
    /// Side length of the shadow atlas in pixels.
    pub shadow_atlas_size: u32,
    /// Side length of one atlas tile in pixels.
    pub shadow_atlas_tile_size: u32,
    /// Depth buffer precision of the atlas target.
    pub shadow_depth_bits: u32,
    /// Maximum number of resident shadow maps (active descriptors).
    pub max_shadow_maps: usize,
    /// Maximum number of shadow maps re-rendered per frame.
    pub max_shadow_updates_per_frame: usize,
    /// Size of the global light table.
    pub max_total_lights: usize,
    /// Visible-light capacity per kind, for lights without shadows.
    pub max_visible_lights: BTreeMap<LightKind, usize>,
    /// Visible-light capacity per kind, for shadow-casting lights.
    pub max_shadowed_lights: BTreeMap<LightKind, usize>,
    /// Request hardware depth comparison on the atlas.
    pub use_hardware_pcf: bool,
    /// Run light parameter updates on the rayon pool.
    pub parallel_light_updates: bool,
    /// Reaction to atlas exhaustion.
    pub exhaustion_policy: ExhaustionPolicy,
    /// Log the per-frame lighting summary at debug level.
    pub display_debug_stats: bool,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            shadow_atlas_size: 4096,
            shadow_atlas_tile_size: 256,
            shadow_depth_bits: 32,
            max_shadow_maps: 24,
            max_shadow_updates_per_frame: 4,
            max_total_lights: 8,
            max_visible_lights: BTreeMap::from([
                (LightKind::Point, 16),
                (LightKind::Directional, 1),
                (LightKind::Spot, 8),
            ]),
            max_shadowed_lights: BTreeMap::from([
                (LightKind::Point, 16),
                (LightKind::Directional, 1),
                (LightKind::Spot, 4),
            ]),
            use_hardware_pcf: false,
            parallel_light_updates: false,
            exhaustion_policy: ExhaustionPolicy::Abort,
            display_debug_stats: false,
        }
    }
}

impl LightingSettings {
    /// Checks the settings for consistency.
    pub fn validate(&self) -> Result<(), LightingError> {
        let invalid = |msg: String| Err(LightingError::InvalidSettings(msg));

        if self.shadow_atlas_tile_size == 0 || self.shadow_atlas_size == 0 {
            return invalid("atlas and tile sizes must be positive".into());
        }
        if self.shadow_atlas_tile_size > self.shadow_atlas_size
            || self.shadow_atlas_size % self.shadow_atlas_tile_size != 0
        {
            return invalid(format!(
                "atlas size {} is not a multiple of the tile size {}",
                self.shadow_atlas_size, self.shadow_atlas_tile_size
            ));
        }
        if !matches!(self.shadow_depth_bits, 16 | 24 | 32) {
            return invalid(format!(
                "unsupported depth precision: {} bits",
                self.shadow_depth_bits
            ));
        }
        if self.max_shadow_updates_per_frame == 0 {
            return invalid("at least one shadow update per frame is required".into());
        }
        if self.max_total_lights == 0 {
            return invalid("the light table needs at least one entry".into());
        }
        Ok(())
    }

    /// Number of tiles along one side of the atlas.
    pub fn tiles_per_side(&self) -> u32 {
        self.shadow_atlas_size / self.shadow_atlas_tile_size.max(1)
    }

    /// Capacity of a category's visible-light array. Unconfigured kinds get 0.
    pub fn category_capacity(&self, category: LightCategory) -> usize {
        let table = if category.shadowed {
            &self.max_shadowed_lights
        } else {
            &self.max_visible_lights
        };
        table.get(&category.kind).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = LightingSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.tiles_per_side(), 16);
        assert_eq!(
            settings.category_capacity(LightCategory::new(LightKind::Directional, true)),
            1
        );
    }

    #[test]
    fn test_rejects_misaligned_atlas() {
        let settings = LightingSettings {
            shadow_atlas_size: 1000,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(LightingError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_rejects_zero_budget() {
        let settings = LightingSettings {
            max_shadow_updates_per_frame: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_unconfigured_kind_has_no_capacity() {
        let mut settings = LightingSettings::default();
        settings.max_visible_lights.remove(&LightKind::Spot);
        assert_eq!(
            settings.category_capacity(LightCategory::new(LightKind::Spot, false)),
            0
        );
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let settings: LightingSettings =
            ron::from_str("(shadow_atlas_size: 2048, max_shadowed_lights: {Point: 2})").unwrap();
        assert_eq!(settings.shadow_atlas_size, 2048);
        assert_eq!(settings.shadow_atlas_tile_size, 256);
        assert_eq!(settings.max_shadowed_lights.get(&LightKind::Point), Some(&2));
        assert_eq!(settings.max_shadowed_lights.get(&LightKind::Directional), None);
    }
}
