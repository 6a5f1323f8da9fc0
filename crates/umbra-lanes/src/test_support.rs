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

//! A render backend that records every call, for tests of the lanes and of
//! the agents built on them.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use umbra_core::renderer::{
    AtlasTargetDescriptor, BackendError, GpuShadowDescriptor, ShadowRenderBackend, ViewportRect,
};

/// Everything a [`RecordingBackend`] was asked to do.
#[derive(Debug, Default)]
pub struct Recorded {
    /// The last atlas target created.
    pub target: Option<AtlasTargetDescriptor>,
    /// Viewport rectangles; index 0 is the full-atlas viewport.
    pub viewports: Vec<Option<ViewportRect>>,
    /// Depth clearer rectangles.
    pub clearers: Vec<Option<ViewportRect>>,
    /// Whether the shadow pass is enabled.
    pub pass_active: bool,
    /// Every descriptor rendered, in order.
    pub renders: Vec<GpuShadowDescriptor>,
    /// The last bytes written under each binding name.
    pub inputs: BTreeMap<String, Vec<u8>>,
    /// Fails `trigger_render` once this many renders have been recorded.
    pub fail_render_after: Option<usize>,
}

impl Recorded {
    /// The uids of every rendered descriptor.
    pub fn rendered_uids(&self) -> Vec<u32> {
        self.renders.iter().map(|d| d.uid).collect()
    }

    /// Number of enabled shadow-update viewports.
    pub fn active_viewports(&self) -> usize {
        self.viewports.iter().skip(1).flatten().count()
    }

    /// Decodes the bytes last written under `name`.
    ///
    /// # Panics
    /// If nothing was written under `name`.
    pub fn input<T: bytemuck::Pod>(&self, name: &str) -> Vec<T> {
        self.inputs[name]
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

/// Cloning shares the recording, so a test keeps a handle after boxing one.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    recorded: Arc<Mutex<Recorded>>,
}

impl RecordingBackend {
    /// A backend with nothing created yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend with `count` viewports already created.
    pub fn with_viewports(count: usize) -> Self {
        let mut backend = Self::default();
        backend.allocate_viewports(count);
        backend
    }

    /// Locks the recording.
    pub fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_viewports(&mut self, count: usize) {
        let mut recorded = self.recorded();
        recorded.viewports = vec![None; count];
        if let Some(first) = recorded.viewports.first_mut() {
            *first = Some(ViewportRect::FULL);
        }
        recorded.clearers = vec![None; count.saturating_sub(1)];
    }
}

impl ShadowRenderBackend for RecordingBackend {
    fn create_atlas_target(&mut self, descriptor: &AtlasTargetDescriptor) -> Result<(), BackendError> {
        self.recorded().target = Some(*descriptor);
        Ok(())
    }

    fn create_viewports(&mut self, count: usize) -> Result<(), BackendError> {
        self.allocate_viewports(count);
        Ok(())
    }

    fn set_viewport(&mut self, index: usize, rect: Option<ViewportRect>) -> Result<(), BackendError> {
        let mut recorded = self.recorded();
        let count = recorded.viewports.len();
        let slot = recorded
            .viewports
            .get_mut(index)
            .ok_or(BackendError::InvalidViewport { index, count })?;
        *slot = rect;
        Ok(())
    }

    fn set_depth_clear(&mut self, index: usize, rect: Option<ViewportRect>) -> Result<(), BackendError> {
        let mut recorded = self.recorded();
        let count = recorded.clearers.len();
        let slot = recorded
            .clearers
            .get_mut(index)
            .ok_or(BackendError::InvalidViewport { index, count })?;
        *slot = rect;
        Ok(())
    }

    fn set_shadow_pass_active(&mut self, active: bool) -> Result<(), BackendError> {
        self.recorded().pass_active = active;
        Ok(())
    }

    fn trigger_render(&mut self, descriptor: &GpuShadowDescriptor) -> Result<(), BackendError> {
        let mut recorded = self.recorded();
        if recorded.fail_render_after == Some(recorded.renders.len()) {
            return Err(BackendError::Other("device lost".into()));
        }
        recorded.renders.push(*descriptor);
        Ok(())
    }

    fn write_input(&mut self, name: &str, bytes: &[u8]) -> Result<(), BackendError> {
        self.recorded().inputs.insert(name.to_owned(), bytes.to_vec());
        Ok(())
    }
}
