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

//! Per-frame light update and visibility culling.

use super::registry::LightRegistry;
use crate::shadow_lane::ShadowUpdateQueue;
use rayon::prelude::*;
use umbra_core::math::CullVolume;
use umbra_core::renderer::{LightCategory, LightKind, LightingSettings};
use umbra_data::containers::FixedArray;

/// The global indices of the lights that survived culling, per category.
///
/// Arrays are sized once from the settings and reused every frame.
#[derive(Debug, Clone)]
pub struct VisibleLights {
    categories: Vec<(LightCategory, FixedArray<i32>)>,
    dropped: usize,
}

impl VisibleLights {
    /// Allocates one array per category, sized from `settings`.
    pub fn new(settings: &LightingSettings) -> Self {
        let categories = LightKind::ALL
            .iter()
            .flat_map(|&kind| [false, true].map(|shadowed| LightCategory::new(kind, shadowed)))
            .map(|category| {
                (
                    category,
                    FixedArray::new(settings.category_capacity(category)),
                )
            })
            .collect();
        Self {
            categories,
            dropped: 0,
        }
    }

    /// The visible indices of one category.
    pub fn get(&self, category: LightCategory) -> Option<&FixedArray<i32>> {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, array)| array)
    }

    /// Number of visible lights in one category.
    pub fn count(&self, category: LightCategory) -> usize {
        self.get(category).map_or(0, FixedArray::len)
    }

    /// Number of visible lights over all categories.
    pub fn total(&self) -> usize {
        self.categories.iter().map(|(_, array)| array.len()).sum()
    }

    /// Every category with its array, in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (LightCategory, &FixedArray<i32>)> + '_ {
        self.categories.iter().map(|(c, array)| (*c, array))
    }

    /// Lights dropped last frame because their category was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Overwrites every category with the contents of `other`, reusing the
    /// existing arrays.
    pub fn copy_from(&mut self, other: &VisibleLights) {
        for (category, array) in &mut self.categories {
            let Some(source) = other.get(*category) else {
                array.clear();
                continue;
            };
            if array.copy_from(source) < source.len() {
                log::warn!("Visible array of category {category} is smaller than its source, truncating");
            }
        }
        self.dropped = other.dropped;
    }

    fn get_mut(&mut self, category: LightCategory) -> Option<&mut FixedArray<i32>> {
        self.categories
            .iter_mut()
            .find(|(c, _)| *c == category)
            .map(|(_, array)| array)
    }

    fn clear(&mut self) {
        for (_, array) in &mut self.categories {
            array.clear();
        }
        self.dropped = 0;
    }
}

/// Brings every light up to date and collects the visible ones.
#[derive(Debug, Clone)]
pub struct LightCullLane {
    visible: VisibleLights,
    parallel: bool,
}

impl LightCullLane {
    /// Creates the lane and its output arrays.
    pub fn new(settings: &LightingSettings) -> Self {
        Self {
            visible: VisibleLights::new(settings),
            parallel: settings.parallel_light_updates,
        }
    }

    /// The output of the last pass.
    pub fn visible(&self) -> &VisibleLights {
        &self.visible
    }

    /// Updates stale lights, culls them against `cull`, and queues the shadow
    /// sources of visible lights whose shadows went stale.
    ///
    /// Lights are visited in registration order, so shadow sources are
    /// enqueued in that order too. A culled light, or one whose category is
    /// full this frame, keeps its stale shadow flag for a later frame.
    pub fn update_and_cull(
        &mut self,
        registry: &mut LightRegistry,
        cull: &dyn CullVolume,
        queue: &mut ShadowUpdateQueue,
    ) -> &VisibleLights {
        self.visible.clear();

        if self.parallel {
            registry
                .lights_mut()
                .par_iter_mut()
                .filter(|light| light.needs_update())
                .for_each(|light| light.perform_update());
        }

        for light in registry.lights_mut() {
            if light.needs_update() {
                light.perform_update();
            }
            if !cull.intersects(&light.bounds()) {
                continue;
            }
            let Some(index) = light.global_index() else {
                continue;
            };

            let category = light.category();
            let pushed = match self.visible.get_mut(category) {
                Some(array) => array.try_push(index as i32).is_ok(),
                None => false,
            };
            if !pushed {
                log::warn!("Too many visible lights in category {category}, dropping light #{index} this frame");
                self.visible.dropped += 1;
                continue;
            }

            if light.has_shadows() && light.needs_shadow_update() {
                for uid in light.perform_shadow_update() {
                    queue.push(uid);
                }
            }
        }

        &self.visible
    }
}
