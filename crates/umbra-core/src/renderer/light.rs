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

//! The light contract consumed by the light registry.
//!
//! Concrete light types live in `umbra-data`; the registry, the scheduler and
//! the marshaller only ever see `Box<dyn Light>`.

use super::shadow::{GpuLightData, ShadowSource, ShadowSourceId};
use crate::math::Aabb;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The type tag of a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum LightKind {
    /// Omni-directional light with a finite radius.
    Point,
    /// Infinitely distant light (sun-like).
    Directional,
    /// Cone-shaped light.
    Spot,
}

impl LightKind {
    /// Every kind known to this version of the crate.
    pub const ALL: [LightKind; 3] = [LightKind::Point, LightKind::Directional, LightKind::Spot];

    /// The name used to build binding names, e.g. `"PointLight"`.
    pub fn type_name(self) -> &'static str {
        match self {
            LightKind::Point => "PointLight",
            LightKind::Directional => "DirectionalLight",
            LightKind::Spot => "SpotLight",
        }
    }

    /// Numeric tag written into [`GpuLightData::kind`].
    pub fn gpu_tag(self) -> u32 {
        match self {
            LightKind::Point => 0,
            LightKind::Directional => 1,
            LightKind::Spot => 2,
        }
    }
}

impl fmt::Display for LightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A `(kind, shadow-casting)` pairing with its own visible-light array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LightCategory {
    /// The light kind.
    pub kind: LightKind,
    /// Whether the light casts shadows.
    pub shadowed: bool,
}

impl LightCategory {
    /// Creates a category.
    pub const fn new(kind: LightKind, shadowed: bool) -> Self {
        Self { kind, shadowed }
    }
}

/// Formats as the binding-name suffix, e.g. `PointLight` or `PointLightShadow`.
impl fmt::Display for LightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.shadowed {
            write!(f, "{}Shadow", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// Bookkeeping every light carries, independent of its kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LightState {
    /// The light's parameters changed and must be recomputed.
    pub needs_update: bool,
    /// The light's shadow views changed and must be re-rendered.
    pub needs_shadow_update: bool,
    /// Set once the light is registered.
    pub attached: bool,
    /// Index in the global light table, assigned on registration.
    pub global_index: Option<usize>,
}

/// A light source managed by the light registry.
///
/// Implementors provide the kind-specific parts (bounds, parameter and view
/// recomputation, GPU packing) and expose their [`LightState`]. The dirty-flag
/// protocol is implemented once here:
///
/// - [`Light::perform_update`] recomputes parameters and clears `needs_update`.
/// - [`Light::perform_shadow_update`] recomputes the shadow views, invalidates
///   every source and returns their ids, then clears `needs_shadow_update`.
pub trait Light: Send + Sync + fmt::Debug {
    /// The type tag.
    fn kind(&self) -> LightKind;

    /// World-space bounds of the light's influence.
    fn bounds(&self) -> Aabb;

    /// Shared bookkeeping.
    fn state(&self) -> &LightState;

    /// Shared bookkeeping, mutably.
    fn state_mut(&mut self) -> &mut LightState;

    /// The shadow sources owned by this light, in a stable order.
    fn shadow_sources(&self) -> &[ShadowSource];

    /// The shadow sources owned by this light, mutably.
    fn shadow_sources_mut(&mut self) -> &mut [ShadowSource];

    /// Recomputes kind-specific parameters (transform, attenuation...).
    fn update_parameters(&mut self);

    /// Recomputes the view-projection of every shadow source.
    fn update_shadow_views(&mut self);

    /// Packs the light for the global light table.
    fn gpu_data(&self) -> GpuLightData;

    /// Whether the light casts shadows.
    fn has_shadows(&self) -> bool {
        !self.shadow_sources().is_empty()
    }

    /// Whether [`Light::perform_update`] should run this frame.
    fn needs_update(&self) -> bool {
        self.state().needs_update
    }

    /// Whether the shadow maps of this light are stale.
    fn needs_shadow_update(&self) -> bool {
        self.state().needs_shadow_update
    }

    /// Flags the light for a parameter update.
    fn queue_update(&mut self) {
        self.state_mut().needs_update = true;
    }

    /// Flags the light's shadow maps as stale.
    fn queue_shadow_update(&mut self) {
        self.state_mut().needs_shadow_update = true;
    }

    /// Recomputes parameters and clears the update flag.
    fn perform_update(&mut self) {
        self.update_parameters();
        self.state_mut().needs_update = false;
    }

    /// Recomputes the shadow views and returns the sources to re-render.
    fn perform_shadow_update(&mut self) -> Vec<ShadowSourceId> {
        self.update_shadow_views();
        self.state_mut().needs_shadow_update = false;
        self.shadow_sources_mut()
            .iter_mut()
            .map(|source| {
                source.invalidate();
                source.uid()
            })
            .collect()
    }

    /// Whether the light is registered.
    fn is_attached(&self) -> bool {
        self.state().attached
    }

    /// Index in the global light table, if registered.
    fn global_index(&self) -> Option<usize> {
        self.state().global_index
    }

    /// Returns the output category of this light.
    fn category(&self) -> LightCategory {
        LightCategory::new(self.kind(), self.has_shadows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_binding_suffix() {
        assert_eq!(
            LightCategory::new(LightKind::Point, true).to_string(),
            "PointLightShadow"
        );
        assert_eq!(
            LightCategory::new(LightKind::Directional, false).to_string(),
            "DirectionalLight"
        );
    }

    #[test]
    fn test_light_kind_ordering_is_stable() {
        let mut kinds = vec![LightKind::Spot, LightKind::Point, LightKind::Directional];
        kinds.sort();
        assert_eq!(kinds, LightKind::ALL.to_vec());
    }
}
