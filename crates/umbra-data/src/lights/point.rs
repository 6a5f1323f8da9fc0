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

//! An omni-directional light with a cube of shadow maps.

use umbra_core::math::{Aabb, Mat4, Vec3, FRAC_PI_2};
use umbra_core::renderer::{
    GpuLightData, Light, LightKind, LightState, ShadowSource,
};

/// Near plane of the cube-face projections.
const SHADOW_NEAR: f32 = 0.05;

/// `(direction, up)` of the six cube faces: +X, -X, +Y, -Y, +Z, -Z.
const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, -1.0, 0.0)),
    (Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, -1.0, 0.0)),
    (Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    (Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 0.0, -1.0)),
    (Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, -1.0, 0.0)),
    (Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, -1.0, 0.0)),
];

/// A point light with a spherical area of influence.
///
/// When shadows are enabled the light owns six shadow sources, one per cube
/// face, all at the same resolution.
///
/// # Examples
///
/// ```
/// use umbra_core::math::Vec3;
/// use umbra_core::renderer::Light;
/// use umbra_data::lights::PointLight;
///
/// let lamp = PointLight::new(Vec3::new(0.0, 2.0, 0.0), 10.0).with_shadows(512);
/// assert_eq!(lamp.shadow_sources().len(), 6);
/// assert!(lamp.has_shadows());
/// ```
#[derive(Debug, Clone)]
pub struct PointLight {
    state: LightState,
    position: Vec3,
    radius: f32,
    color: [f32; 3],
    intensity: f32,
    sources: Vec<ShadowSource>,
    gpu: GpuLightData,
}

impl PointLight {
    /// Creates a white light at `position` affecting everything within `radius`.
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self {
            state: LightState::default(),
            position,
            radius: radius.max(0.0),
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
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

    /// Enables cube shadow maps of `resolution` pixels per face.
    ///
    /// Must be called before the light is registered; the resolution is
    /// normalized against the atlas at registration.
    pub fn with_shadows(mut self, resolution: u32) -> Self {
        self.sources = (0..CUBE_FACES.len())
            .map(|_| ShadowSource::new(resolution))
            .collect();
        self
    }

    /// World position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Radius of influence.
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Moves the light; parameters and shadow maps become stale.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.queue_update();
        self.queue_shadow_update();
    }

    /// Changes the radius; parameters and shadow maps become stale.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(0.0);
        self.queue_update();
        self.queue_shadow_update();
    }
}

impl Light for PointLight {
    fn kind(&self) -> LightKind {
        LightKind::Point
    }

    fn bounds(&self) -> Aabb {
        Aabb::from_center_half_extents(self.position, Vec3::splat(self.radius))
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
        let first_shadow = self
            .sources
            .first()
            .and_then(|s| s.descriptor_index())
            .map_or(-1, |i| i as i32);
        self.gpu = GpuLightData {
            position_or_direction: [self.position.x, self.position.y, self.position.z, 1.0],
            color: [self.color[0], self.color[1], self.color[2], self.intensity],
            params: [self.radius, 0.0, 0.0, 0.0],
            kind: LightKind::Point.gpu_tag(),
            first_shadow,
            shadow_count: self.sources.len() as u32,
            _padding: 0,
        };
    }

    fn update_shadow_views(&mut self) {
        let far = self.radius.max(SHADOW_NEAR * 2.0);
        let projection = Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, SHADOW_NEAR, far);
        for (source, (direction, up)) in self.sources.iter_mut().zip(CUBE_FACES) {
            if let Some(view) = Mat4::look_at_rh(self.position, self.position + direction, up) {
                source.set_view_proj(projection * view);
            }
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
    fn test_bounds_follow_radius() {
        let light = PointLight::new(Vec3::new(1.0, 2.0, 3.0), 2.0);
        let bounds = light.bounds();
        assert_eq!(bounds.min, Vec3::new(-1.0, 0.0, 1.0));
        assert_eq!(bounds.max, Vec3::new(3.0, 4.0, 5.0));
        assert!(!light.has_shadows());
    }

    #[test]
    fn test_moving_queues_updates() {
        let mut light = PointLight::new(Vec3::ZERO, 5.0).with_shadows(256);
        assert!(!light.needs_update());
        light.set_position(Vec3::X);
        assert!(light.needs_update());
        assert!(light.needs_shadow_update());

        light.perform_update();
        assert!(!light.needs_update());
        assert_eq!(light.gpu_data().position_or_direction, [1.0, 0.0, 0.0, 1.0]);

        let stale = light.perform_shadow_update();
        assert_eq!(stale.len(), 6);
        assert!(!light.needs_shadow_update());
        assert!(light.shadow_sources().iter().all(|s| !s.is_valid()));
    }

    #[test]
    fn test_cube_faces_look_outwards() {
        let mut light = PointLight::new(Vec3::ZERO, 10.0).with_shadows(256);
        light.update_shadow_views();
        // A point in front of the +X face lands inside its clip volume.
        let clip = light.shadow_sources()[0].view_proj() * Vec4::new(5.0, 0.0, 0.0, 1.0);
        let depth = clip.z / clip.w;
        assert!(clip.w > 0.0);
        assert!((0.0..=1.0).contains(&depth));
        // The same point is behind the -X face.
        let behind = light.shadow_sources()[1].view_proj() * Vec4::new(5.0, 0.0, 0.0, 1.0);
        assert!(behind.w < 0.0);
    }
}
