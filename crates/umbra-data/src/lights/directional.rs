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

//! A sun-like light with a single orthographic shadow map.

use umbra_core::math::{Aabb, Mat4, Vec3};
use umbra_core::renderer::{GpuLightData, Light, LightKind, LightState, ShadowSource};

/// An infinitely distant light shining along `direction`.
///
/// Its influence is unbounded, so it is never culled. With shadows enabled it
/// owns one source covering a cube of `2 * shadow_extent` around the origin.
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    state: LightState,
    direction: Vec3,
    color: [f32; 3],
    intensity: f32,
    shadow_extent: f32,
    sources: Vec<ShadowSource>,
    gpu: GpuLightData,
}

impl DirectionalLight {
    /// Creates a white light shining along `direction`.
    pub fn new(direction: Vec3) -> Self {
        Self {
            state: LightState::default(),
            direction: direction.normalize(),
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            shadow_extent: 50.0,
            sources: Vec::new(),
            gpu: GpuLightData::default(),
        }
    }

    /// Sets the linear RGB color and intensity.
    pub fn with_color(mut self, color: [f32; 3], intensity: f32) -> Self {
        self.color = color;
        self.intensity = intensity;
        self
    }

    /// Enables a shadow map of `resolution` pixels covering `extent` units
    /// around the origin in every direction.
    pub fn with_shadows(mut self, resolution: u32, extent: f32) -> Self {
        self.shadow_extent = extent.max(f32::EPSILON);
        self.sources = vec![ShadowSource::new(resolution)];
        self
    }

    /// Normalized light direction.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Changes the direction; parameters and the shadow map become stale.
    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction.normalize();
        self.queue_update();
        self.queue_shadow_update();
    }
}

impl Light for DirectionalLight {
    fn kind(&self) -> LightKind {
        LightKind::Directional
    }

    fn bounds(&self) -> Aabb {
        Aabb::INFINITE
    }

    fn state(&self) -> &LightState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LightState {
        &mut self.state
    }

    fn shadow_sources(&self) -> &[ShadowSource] {
        &self.sources
    }

    fn shadow_sources_mut(&mut self) -> &mut [ShadowSource] {
        &mut self.sources
    }

    fn update_parameters(&mut self) {
        let d = self.direction;
        let first_shadow = self
            .sources
            .first()
            .and_then(|s| s.descriptor_index())
            .map_or(-1, |i| i as i32);
        self.gpu = GpuLightData {
            position_or_direction: [d.x, d.y, d.z, 0.0],
            color: [self.color[0], self.color[1], self.color[2], self.intensity],
            params: [self.shadow_extent, 0.0, 0.0, 0.0],
            kind: LightKind::Directional.gpu_tag(),
            first_shadow,
            shadow_count: self.sources.len() as u32,
            _padding: 0,
        };
    }

    fn update_shadow_views(&mut self) {
        let e = self.shadow_extent;
        let eye = -self.direction * (2.0 * e);
        let up = if self.direction.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let Some(view) = Mat4::look_at_rh(eye, Vec3::ZERO, up) else {
            log::warn!("Directional light has a degenerate direction, shadow view not updated");
            return;
        };
        let projection = Mat4::orthographic_rh_zo(-e, e, -e, e, 0.0, 4.0 * e);
        for source in &mut self.sources {
            source.set_view_proj(projection * view);
        }
    }

    fn gpu_data(&self) -> GpuLightData {
        self.gpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::math::Vec4;

    #[test]
    fn test_is_never_bounded() {
        let light = DirectionalLight::new(Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(light.bounds(), Aabb::INFINITE);
        assert_eq!(light.kind(), LightKind::Directional);
    }

    #[test]
    fn test_shadow_view_covers_center() {
        let mut light = DirectionalLight::new(Vec3::new(0.0, -1.0, 0.0)).with_shadows(1024, 10.0);
        light.update_shadow_views();
        let clip = light.shadow_sources()[0].view_proj() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((clip.z - 0.5).abs() < 1e-4);
        assert!(clip.x.abs() < 1e-4 && clip.y.abs() < 1e-4);
    }

    #[test]
    fn test_gpu_data_is_a_direction() {
        let mut light = DirectionalLight::new(Vec3::new(0.0, 0.0, -2.0));
        light.perform_update();
        assert_eq!(light.gpu_data().position_or_direction, [0.0, 0.0, -1.0, 0.0]);
        assert_eq!(light.gpu_data().first_shadow, -1);
    }
}
