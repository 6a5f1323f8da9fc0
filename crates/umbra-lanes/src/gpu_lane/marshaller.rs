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

//! Packs the frame's lighting state into fixed-shape GPU buffers.

use crate::light_lane::{LightRegistry, VisibleLights};
use crate::shadow_lane::ShadowFrame;
use umbra_core::renderer::{
    BackendError, GpuLightData, GpuShadowDescriptor, LightCategory, LightingSettings,
    ShadowRenderBackend,
};
use umbra_data::containers::FixedArray;

/// Binding name of the global light table.
pub const LIGHTS_BINDING: &str = "lights";
/// Binding name of the active shadow descriptors.
pub const SHADOW_SOURCES_BINDING: &str = "shadowSources";
/// Binding name of the descriptors re-rendered this frame.
pub const UPDATE_SOURCES_BINDING: &str = "updateSources";
/// Binding name of the re-render count.
pub const NUM_UPDATES_BINDING: &str = "numUpdates";

/// Binding name of a category's visible index array, e.g. `arrayPointLightShadow`.
pub fn array_binding(category: LightCategory) -> String {
    format!("array{category}")
}

/// Binding name of a category's visible count, e.g. `countSpotLight`.
pub fn count_binding(category: LightCategory) -> String {
    format!("count{category}")
}

/// CPU-side mirror of every lighting input the shaders read.
///
/// Every buffer keeps its capacity for the lifetime of the agent, so the
/// bound data never changes shape between frames.
#[derive(Debug, Clone)]
pub struct GpuLightingData {
    visible: VisibleLights,
    lights: FixedArray<GpuLightData>,
    shadow_sources: FixedArray<GpuShadowDescriptor>,
    updated_sources: FixedArray<GpuShadowDescriptor>,
    num_updates: usize,
}

impl GpuLightingData {
    /// Sizes every buffer from `settings`.
    pub fn new(settings: &LightingSettings) -> Self {
        Self {
            visible: VisibleLights::new(settings),
            lights: FixedArray::new(settings.max_total_lights),
            shadow_sources: FixedArray::new(settings.max_shadow_maps),
            updated_sources: FixedArray::new(settings.max_shadow_updates_per_frame),
            num_updates: 0,
        }
    }

    /// Copies the visible arrays and rewrites the light table.
    pub fn update_lights(&mut self, registry: &LightRegistry, visible: &VisibleLights) {
        self.visible.copy_from(visible);
        self.lights.clear();
        for light in registry.lights() {
            if self.lights.try_push(light.gpu_data()).is_err() {
                log::warn!("Light table is full, the remaining lights are not uploaded");
                break;
            }
        }
    }

    /// Stores the descriptors of the shadow maps re-rendered this frame.
    pub fn record_shadow_frame(&mut self, frame: &ShadowFrame) {
        self.updated_sources.clear();
        for (position, update) in frame.updates.iter().enumerate() {
            if !self
                .shadow_sources
                .set(update.descriptor_index, update.descriptor)
            {
                log::warn!(
                    "Descriptor index {} of shadow source {} is out of range",
                    update.descriptor_index,
                    update.uid
                );
            }
            if self.updated_sources.try_push(update.descriptor).is_err() {
                log::warn!(
                    "More shadow updates than the update array holds, {} not uploaded",
                    frame.updates.len() - position
                );
                break;
            }
        }
        self.num_updates = frame.processed;
    }

    /// The light table.
    pub fn lights(&self) -> &FixedArray<GpuLightData> {
        &self.lights
    }

    /// The active shadow descriptors, by descriptor index.
    pub fn shadow_sources(&self) -> &FixedArray<GpuShadowDescriptor> {
        &self.shadow_sources
    }

    /// The descriptors re-rendered this frame, in processing order.
    pub fn updated_sources(&self) -> &FixedArray<GpuShadowDescriptor> {
        &self.updated_sources
    }

    /// Number of shadow maps re-rendered this frame.
    pub fn num_updates(&self) -> usize {
        self.num_updates
    }

    /// The visible arrays as last copied.
    pub fn visible(&self) -> &VisibleLights {
        &self.visible
    }

    /// Writes every buffer to the backend under its binding name.
    pub fn publish(&self, backend: &mut dyn ShadowRenderBackend) -> Result<(), BackendError> {
        for (category, array) in self.visible.iter() {
            backend.write_input(&array_binding(category), array.as_bytes())?;
            let count = array.len() as i32;
            backend.write_input(&count_binding(category), bytemuck::bytes_of(&count))?;
        }
        backend.write_input(LIGHTS_BINDING, self.lights.as_bytes())?;
        backend.write_input(SHADOW_SOURCES_BINDING, self.shadow_sources.as_bytes())?;
        backend.write_input(UPDATE_SOURCES_BINDING, self.updated_sources.as_bytes())?;
        let num_updates = self.num_updates as i32;
        backend.write_input(NUM_UPDATES_BINDING, bytemuck::bytes_of(&num_updates))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light_lane::{AtlasGeometry, LightCullLane};
    use crate::shadow_lane::ShadowUpdateLane;
    use crate::test_support::RecordingBackend;
    use umbra_core::math::{Aabb, Vec3};
    use umbra_core::renderer::LightKind;
    use umbra_data::allocators::ShadowAtlas;
    use umbra_data::lights::{DirectionalLight, PointLight};

    #[test]
    fn test_binding_names() {
        let shadowed = LightCategory::new(LightKind::Point, true);
        assert_eq!(array_binding(shadowed), "arrayPointLightShadow");
        assert_eq!(
            count_binding(LightCategory::new(LightKind::Spot, false)),
            "countSpotLight"
        );
    }

    #[test]
    fn test_publish_writes_full_buffers() {
        let settings = LightingSettings {
            shadow_atlas_size: 2048,
            max_shadow_updates_per_frame: 2,
            ..Default::default()
        };
        let mut atlas = ShadowAtlas::new(2048, 256);
        let geometry = AtlasGeometry::of(&atlas);
        let mut registry = LightRegistry::new(&settings);
        registry
            .register(Box::new(PointLight::new(Vec3::ZERO, 2.0)), geometry)
            .unwrap();
        registry
            .register(
                Box::new(DirectionalLight::new(-Vec3::Y).with_shadows(512, 10.0)),
                geometry,
            )
            .unwrap();

        let mut cull = LightCullLane::new(&settings);
        let mut shadows = ShadowUpdateLane::new();
        let mut backend = RecordingBackend::with_viewports(3);
        let mut data = GpuLightingData::new(&settings);

        let visible = cull.update_and_cull(&mut registry, &Aabb::INFINITE, shadows.queue_mut());
        data.update_lights(&registry, visible);
        let frame = shadows
            .process_frame(2, &mut registry, &mut atlas, &mut backend)
            .unwrap();
        data.record_shadow_frame(frame);
        data.publish(&mut backend).unwrap();

        let lights: Vec<GpuLightData> = backend.recorded().input(LIGHTS_BINDING);
        assert_eq!(lights.len(), settings.max_total_lights);
        assert_eq!(lights[0].kind, LightKind::Point.gpu_tag());
        assert_eq!(lights[1].kind, LightKind::Directional.gpu_tag());

        let sources: Vec<GpuShadowDescriptor> = backend.recorded().input(SHADOW_SOURCES_BINDING);
        assert_eq!(sources.len(), settings.max_shadow_maps);
        assert_eq!(sources[0].resolution, 512);
        assert_eq!(sources[0].atlas_rect, [0.0, 0.0, 0.25, 0.25]);

        let updated: Vec<GpuShadowDescriptor> = backend.recorded().input(UPDATE_SOURCES_BINDING);
        assert_eq!(updated.len(), 2);
        assert_eq!(updated[0], sources[0]);
        assert_eq!(backend.recorded().input::<i32>(NUM_UPDATES_BINDING), vec![1]);

        let point = LightCategory::new(LightKind::Point, false);
        assert_eq!(backend.recorded().input::<i32>(&count_binding(point)), vec![1]);
        let indices: Vec<i32> = backend.recorded().input(&array_binding(point));
        assert_eq!(indices.len(), 16);
        assert_eq!(indices[0], 0);
        let sun = LightCategory::new(LightKind::Directional, true);
        assert_eq!(backend.recorded().input::<i32>(&array_binding(sun)), vec![1]);
    }

    #[test]
    fn test_unchanged_frames_publish_identical_buffers() {
        let settings = LightingSettings {
            shadow_atlas_size: 2048,
            max_shadow_updates_per_frame: 8,
            ..Default::default()
        };
        let mut atlas = ShadowAtlas::new(2048, 256);
        let geometry = AtlasGeometry::of(&atlas);
        let mut registry = LightRegistry::new(&settings);
        registry
            .register(Box::new(PointLight::new(Vec3::ZERO, 2.0).with_shadows(256)), geometry)
            .unwrap();
        registry
            .register(Box::new(PointLight::new(Vec3::new(3.0, 0.0, 0.0), 1.0)), geometry)
            .unwrap();
        registry
            .register(
                Box::new(DirectionalLight::new(-Vec3::Y).with_shadows(512, 10.0)),
                geometry,
            )
            .unwrap();

        let mut cull = LightCullLane::new(&settings);
        let mut shadows = ShadowUpdateLane::new();
        let mut backend = RecordingBackend::with_viewports(9);
        let mut data = GpuLightingData::new(&settings);

        let mut snapshots = Vec::new();
        let mut storage = Vec::new();
        for _ in 0..3 {
            let visible = cull.update_and_cull(&mut registry, &Aabb::INFINITE, shadows.queue_mut());
            data.update_lights(&registry, visible);
            let frame = shadows
                .process_frame(8, &mut registry, &mut atlas, &mut backend)
                .unwrap();
            data.record_shadow_frame(frame);
            data.publish(&mut backend).unwrap();

            let arrays: Vec<(LightCategory, Vec<i32>)> = data
                .visible()
                .iter()
                .map(|(category, array)| (category, array.as_slice().to_vec()))
                .collect();
            snapshots.push((arrays, backend.recorded().inputs.clone()));
            storage.push(
                data.visible()
                    .iter()
                    .map(|(_, array)| array.storage().as_ptr())
                    .collect::<Vec<_>>(),
            );
        }

        assert_eq!(data.num_updates(), 0);
        assert!(registry
            .lights()
            .iter()
            .all(|light| !light.needs_update() && !light.needs_shadow_update()));

        // The first frame re-rendered every shadow map; the next two had nothing to do.
        let (first_arrays, first_inputs) = &snapshots[0];
        assert_eq!(first_inputs[NUM_UPDATES_BINDING], 7i32.to_ne_bytes());
        assert_eq!(first_arrays, &snapshots[1].0);
        assert_eq!(first_inputs[LIGHTS_BINDING], snapshots[1].1[LIGHTS_BINDING]);
        assert_eq!(snapshots[1], snapshots[2]);

        assert_eq!(storage[0], storage[1]);
        assert_eq!(storage[1], storage[2]);
    }

    #[test]
    fn test_stale_updates_are_kept_in_storage() {
        let settings = LightingSettings::default();
        let mut data = GpuLightingData::new(&settings);
        let descriptor = GpuShadowDescriptor {
            resolution: 256,
            ..Default::default()
        };
        let mut frame = ShadowFrame {
            processed: 1,
            has_work: true,
            ..Default::default()
        };
        frame.updates.push(crate::shadow_lane::ShadowUpdate {
            uid: umbra_core::renderer::ShadowSourceId::from_raw(3),
            descriptor_index: 2,
            descriptor,
            rect: umbra_core::renderer::ViewportRect::FULL,
        });
        data.record_shadow_frame(&frame);
        assert_eq!(data.shadow_sources().len(), 3);
        assert_eq!(data.shadow_sources().get(2), Some(&descriptor));

        data.record_shadow_frame(&ShadowFrame::default());
        assert_eq!(data.num_updates(), 0);
        assert!(data.updated_sources().is_empty());
        assert_eq!(data.updated_sources().storage()[0], descriptor);
        assert_eq!(data.shadow_sources().get(2), Some(&descriptor));
    }
}
