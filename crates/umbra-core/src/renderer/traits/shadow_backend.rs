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

use crate::renderer::error::BackendError;
use crate::renderer::shadow::{GpuShadowDescriptor, ViewportRect};
use std::fmt::Debug;

/// Describes the render target backing the shadow atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasTargetDescriptor {
    /// Side length in pixels.
    pub size: u32,
    /// Depth buffer precision.
    pub depth_bits: u32,
    /// Enable hardware depth comparison when sampling.
    pub hardware_pcf: bool,
}

/// The narrow slice of a graphics backend the light manager drives.
///
/// The shadow pass renders into one shared depth target. Viewport 0 always
/// covers the full target; viewports `1..=N` receive the shadow maps updated
/// this frame, each paired with a depth clearer (`0..N`) because the shared
/// target can't be cleared as a whole without destroying valid regions.
pub trait ShadowRenderBackend: Debug {
    /// Allocates the atlas render target.
    /// ## Errors
    /// * `BackendError::TargetCreation` - If the target can't be created.
    fn create_atlas_target(&mut self, descriptor: &AtlasTargetDescriptor) -> Result<(), BackendError>;

    /// Creates `count` sub-viewports and `count - 1` depth clearers, all inactive.
    fn create_viewports(&mut self, count: usize) -> Result<(), BackendError>;

    /// Sets the rectangle of render viewport `index`; `None` deactivates it.
    fn set_viewport(&mut self, index: usize, rect: Option<ViewportRect>) -> Result<(), BackendError>;

    /// Sets the rectangle of depth clearer `index`; `None` deactivates it.
    fn set_depth_clear(&mut self, index: usize, rect: Option<ViewportRect>) -> Result<(), BackendError>;

    /// Enables or disables the whole shadow pass for this frame.
    fn set_shadow_pass_active(&mut self, active: bool) -> Result<(), BackendError>;

    /// Schedules the geometry re-render of one shadow map.
    fn trigger_render(&mut self, descriptor: &GpuShadowDescriptor) -> Result<(), BackendError>;

    /// Binds raw bytes as a pipeline-visible input under `name`.
    /// ## Errors
    /// * `BackendError::InputWrite` - If the bytes can't be bound, e.g. because
    ///   their size differs from the buffer already bound under `name`.
    fn write_input(&mut self, name: &str, bytes: &[u8]) -> Result<(), BackendError>;
}
