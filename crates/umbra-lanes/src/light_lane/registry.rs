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

//! The global light table and the shadow source index.

use ahash::AHashMap;
use umbra_core::renderer::{
    normalize_resolution, Light, LightingError, LightingSettings, ShadowSource, ShadowSourceId,
};
use umbra_data::allocators::ShadowAtlas;

/// The atlas dimensions shadow resolutions are normalized against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasGeometry {
    /// Atlas side length in pixels.
    pub size: u32,
    /// Tile side length in pixels.
    pub tile_size: u32,
}

impl AtlasGeometry {
    /// Reads the geometry of an existing atlas.
    pub fn of(atlas: &ShadowAtlas) -> Self {
        Self {
            size: atlas.size(),
            tile_size: atlas.tile_size(),
        }
    }
}

/// Where a shadow source lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// Index of the owning light in the light table.
    pub light: usize,
    /// Position in the light's own source list.
    pub local: usize,
    /// Dense index in the active-descriptor array.
    pub descriptor: usize,
}

/// Owns every registered light, in registration order.
///
/// Light indices are dense and never reused: lights can't be removed yet.
/// Shadow sources are indexed by uid for O(1) lookup from the update queue.
#[derive(Debug)]
pub struct LightRegistry {
    lights: Vec<Box<dyn Light>>,
    sources: AHashMap<ShadowSourceId, SourceLocation>,
    descriptor_order: Vec<ShadowSourceId>,
    max_total_lights: usize,
    max_shadow_maps: usize,
    clamped_sources: usize,
}

impl LightRegistry {
    /// Creates an empty registry sized from `settings`.
    pub fn new(settings: &LightingSettings) -> Self {
        Self {
            lights: Vec::with_capacity(settings.max_total_lights),
            sources: AHashMap::with_capacity(settings.max_shadow_maps),
            descriptor_order: Vec::with_capacity(settings.max_shadow_maps),
            max_total_lights: settings.max_total_lights,
            max_shadow_maps: settings.max_shadow_maps,
            clamped_sources: 0,
        }
    }

    /// Registers a light and returns its global index.
    ///
    /// Shadow source resolutions are normalized against `atlas` here, once.
    /// Nothing is modified if the light or its sources don't fit.
    pub fn register(
        &mut self,
        mut light: Box<dyn Light>,
        atlas: AtlasGeometry,
    ) -> Result<usize, LightingError> {
        if self.lights.len() >= self.max_total_lights {
            return Err(LightingError::LightCapacityExceeded {
                capacity: self.max_total_lights,
            });
        }

        let mut incoming: Vec<ShadowSourceId> = Vec::new();
        for source in light.shadow_sources() {
            let uid = source.uid();
            if !self.sources.contains_key(&uid) && !incoming.contains(&uid) {
                incoming.push(uid);
            }
        }
        if self.descriptor_order.len() + incoming.len() > self.max_shadow_maps {
            return Err(LightingError::ShadowCapacityExceeded {
                requested: incoming.len(),
                registered: self.descriptor_order.len(),
                capacity: self.max_shadow_maps,
            });
        }

        let index = self.lights.len();
        for (local, source) in light.shadow_sources_mut().iter_mut().enumerate() {
            if normalize_source(source, atlas) {
                self.clamped_sources += 1;
            }

            let uid = source.uid();
            if let Some(existing) = self.sources.get(&uid) {
                log::warn!(
                    "Shadow source {uid} is already registered (light {}), skipping duplicate",
                    existing.light
                );
                continue;
            }
            let descriptor = self.descriptor_order.len();
            self.descriptor_order.push(uid);
            self.sources.insert(
                uid,
                SourceLocation {
                    light: index,
                    local,
                    descriptor,
                },
            );
            source.set_descriptor_index(descriptor);
            source.set_light_index(index);
        }

        {
            let state = light.state_mut();
            state.attached = true;
            state.global_index = Some(index);
        }
        light.queue_update();
        light.queue_shadow_update();

        log::debug!(
            "Registered {} #{index} with {} shadow source(s)",
            light.kind(),
            light.shadow_sources().len()
        );
        self.lights.push(light);
        Ok(index)
    }

    /// Removing lights is not supported: indices and atlas regions would have
    /// to be reclaimed, and no eviction policy exists.
    pub fn remove(&mut self, index: usize) -> Result<Box<dyn Light>, LightingError> {
        log::error!("Attempted to remove light #{index}, which is not supported");
        Err(LightingError::NotImplemented("light removal"))
    }

    /// Removing individual shadow sources is not supported either.
    pub fn remove_shadow_source(&mut self, uid: ShadowSourceId) -> Result<(), LightingError> {
        log::error!("Attempted to remove shadow source {uid}, which is not supported");
        Err(LightingError::NotImplemented("shadow source removal"))
    }

    /// Number of registered lights.
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Whether no light is registered.
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Size of the light table.
    pub fn capacity(&self) -> usize {
        self.max_total_lights
    }

    /// The light at `index`.
    pub fn light(&self, index: usize) -> Option<&dyn Light> {
        self.lights.get(index).map(|light| light.as_ref())
    }

    /// The light at `index`, mutably.
    pub fn light_mut(&mut self, index: usize) -> Option<&mut (dyn Light + 'static)> {
        self.lights.get_mut(index).map(|light| light.as_mut())
    }

    /// Every light, in registration order.
    pub fn lights(&self) -> &[Box<dyn Light>] {
        &self.lights
    }

    /// Every light, mutably, in registration order.
    pub fn lights_mut(&mut self) -> &mut [Box<dyn Light>] {
        &mut self.lights
    }

    /// Number of registered shadow sources.
    pub fn source_count(&self) -> usize {
        self.descriptor_order.len()
    }

    /// Number of source resolutions adjusted at registration, each with one warning.
    pub fn clamped_source_count(&self) -> usize {
        self.clamped_sources
    }

    /// Where `uid` lives.
    pub fn location(&self, uid: ShadowSourceId) -> Option<SourceLocation> {
        self.sources.get(&uid).copied()
    }

    /// The registered source with this uid.
    pub fn source(&self, uid: ShadowSourceId) -> Option<&ShadowSource> {
        let location = self.sources.get(&uid)?;
        self.lights[location.light]
            .shadow_sources()
            .get(location.local)
    }

    /// The registered source with this uid, mutably.
    pub fn source_mut(&mut self, uid: ShadowSourceId) -> Option<&mut ShadowSource> {
        let location = *self.sources.get(&uid)?;
        self.lights[location.light]
            .shadow_sources_mut()
            .get_mut(location.local)
    }

    /// Registered sources in descriptor order.
    pub fn sources(&self) -> impl Iterator<Item = &ShadowSource> + '_ {
        self.descriptor_order
            .iter()
            .filter_map(move |uid| self.source(*uid))
    }
}

/// Clamps a source resolution to something the atlas can hold. Returns
/// whether it had to be adjusted.
fn normalize_source(source: &mut ShadowSource, atlas: AtlasGeometry) -> bool {
    let requested = source.resolution();
    let (resolution, clamp) = normalize_resolution(requested, atlas.tile_size, atlas.size);
    if let Some(reason) = clamp {
        log::warn!(
            "Shadow source {} resolution {requested}px is {reason} ({}px tiles, {}px atlas), adjusting to {resolution}px",
            source.uid(),
            atlas.tile_size,
            atlas.size
        );
        source.set_resolution(resolution);
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::math::Vec3;
    use umbra_data::lights::{DirectionalLight, PointLight};

    const ATLAS: AtlasGeometry = AtlasGeometry {
        size: 2048,
        tile_size: 256,
    };

    fn settings(max_total_lights: usize, max_shadow_maps: usize) -> LightingSettings {
        LightingSettings {
            max_total_lights,
            max_shadow_maps,
            ..Default::default()
        }
    }

    #[test]
    fn test_register_assigns_dense_indices() {
        let mut registry = LightRegistry::new(&settings(4, 24));
        let a = registry
            .register(Box::new(PointLight::new(Vec3::ZERO, 1.0)), ATLAS)
            .unwrap();
        let b = registry
            .register(
                Box::new(DirectionalLight::new(-Vec3::Y).with_shadows(512, 10.0)),
                ATLAS,
            )
            .unwrap();
        assert_eq!((a, b), (0, 1));

        let light = registry.light(1).unwrap();
        assert!(light.is_attached());
        assert_eq!(light.global_index(), Some(1));
        assert!(light.needs_update());
        assert!(light.needs_shadow_update());

        let uid = light.shadow_sources()[0].uid();
        assert_eq!(
            registry.location(uid),
            Some(SourceLocation {
                light: 1,
                local: 0,
                descriptor: 0
            })
        );
        assert_eq!(registry.source(uid).unwrap().descriptor_index(), Some(0));
        assert_eq!(registry.source(uid).unwrap().light_index(), Some(1));
    }

    #[test]
    fn test_resolution_is_normalized_at_registration() {
        let mut registry = LightRegistry::new(&settings(4, 24));
        registry
            .register(Box::new(DirectionalLight::new(-Vec3::Y).with_shadows(100, 10.0)), ATLAS)
            .unwrap();
        registry
            .register(Box::new(DirectionalLight::new(-Vec3::Y).with_shadows(4096, 10.0)), ATLAS)
            .unwrap();
        registry
            .register(Box::new(DirectionalLight::new(-Vec3::Y).with_shadows(768, 10.0)), ATLAS)
            .unwrap();
        let resolutions: Vec<u32> = registry.sources().map(|s| s.resolution()).collect();
        assert_eq!(resolutions, vec![256, 256, 768]);
        assert_eq!(registry.clamped_source_count(), 2);
    }

    #[test]
    fn test_light_capacity() {
        let mut registry = LightRegistry::new(&settings(1, 24));
        registry
            .register(Box::new(PointLight::new(Vec3::ZERO, 1.0)), ATLAS)
            .unwrap();
        assert_eq!(
            registry
                .register(Box::new(PointLight::new(Vec3::ZERO, 1.0)), ATLAS)
                .unwrap_err(),
            LightingError::LightCapacityExceeded { capacity: 1 }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_shadow_capacity_leaves_registry_untouched() {
        let mut registry = LightRegistry::new(&settings(4, 8));
        registry
            .register(Box::new(PointLight::new(Vec3::ZERO, 1.0).with_shadows(256)), ATLAS)
            .unwrap();
        let err = registry
            .register(Box::new(PointLight::new(Vec3::X, 1.0).with_shadows(256)), ATLAS)
            .unwrap_err();
        assert_eq!(
            err,
            LightingError::ShadowCapacityExceeded {
                requested: 6,
                registered: 6,
                capacity: 8
            }
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.source_count(), 6);
    }

    #[test]
    fn test_removal_is_not_implemented() {
        let mut registry = LightRegistry::new(&settings(4, 24));
        registry
            .register(Box::new(PointLight::new(Vec3::ZERO, 1.0)), ATLAS)
            .unwrap();
        assert!(matches!(
            registry.remove(0),
            Err(LightingError::NotImplemented(_))
        ));
        assert!(matches!(
            registry.remove_shadow_source(ShadowSourceId::from_raw(1)),
            Err(LightingError::NotImplemented(_))
        ));
        assert_eq!(registry.len(), 1);
    }
}
