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

//! A backend that only counts and logs what it is asked to do.

use std::collections::HashMap;
use umbra_core::renderer::{
    AtlasTargetDescriptor, BackendError, GpuShadowDescriptor, ShadowRenderBackend, ViewportRect,
};

/// Largest 2D texture a typical desktop adapter accepts.
const MAX_TEXTURE_SIZE: u32 = 8192;

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    viewports: usize,
    renders: u64,
    uploaded_bytes: u64,
    /// Byte size of each bound input; buffers keep their shape once bound.
    bindings: HashMap<String, usize>,
}

impl HeadlessBackend {
    fn check(&self, index: usize, count: usize) -> Result<(), BackendError> {
        if index < count {
            Ok(())
        } else {
            Err(BackendError::InvalidViewport { index, count })
        }
    }
}

impl ShadowRenderBackend for HeadlessBackend {
    fn create_atlas_target(&mut self, descriptor: &AtlasTargetDescriptor) -> Result<(), BackendError> {
        if descriptor.size > MAX_TEXTURE_SIZE {
            return Err(BackendError::TargetCreation(format!(
                "{0}x{0} exceeds the {MAX_TEXTURE_SIZE}px texture limit",
                descriptor.size
            )));
        }
        log::info!(
            "Atlas target: {0}x{0}, {1}-bit depth, hardware PCF {2}",
            descriptor.size,
            descriptor.depth_bits,
            descriptor.hardware_pcf
        );
        Ok(())
    }

    fn create_viewports(&mut self, count: usize) -> Result<(), BackendError> {
        self.viewports = count;
        Ok(())
    }

    fn set_viewport(&mut self, index: usize, rect: Option<ViewportRect>) -> Result<(), BackendError> {
        self.check(index, self.viewports)?;
        if let Some(rect) = rect {
            log::trace!("Viewport {index} -> {:?}", rect.to_array());
        }
        Ok(())
    }

    fn set_depth_clear(&mut self, index: usize, _rect: Option<ViewportRect>) -> Result<(), BackendError> {
        self.check(index, self.viewports.saturating_sub(1))
    }

    fn set_shadow_pass_active(&mut self, _active: bool) -> Result<(), BackendError> {
        Ok(())
    }

    fn trigger_render(&mut self, descriptor: &GpuShadowDescriptor) -> Result<(), BackendError> {
        self.renders += 1;
        log::trace!(
            "Render #{}: shadow source {} at {}px",
            self.renders,
            descriptor.uid,
            descriptor.resolution
        );
        Ok(())
    }

    fn write_input(&mut self, name: &str, bytes: &[u8]) -> Result<(), BackendError> {
        let bound = *self.bindings.entry(name.to_owned()).or_insert(bytes.len());
        if bound != bytes.len() {
            return Err(BackendError::InputWrite {
                name: name.to_owned(),
                reason: format!("{} bytes written to a {bound}-byte buffer", bytes.len()),
            });
        }
        self.uploaded_bytes += bytes.len() as u64;
        log::trace!("{} bytes uploaded so far", self.uploaded_bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversized_atlas_is_rejected() {
        let mut backend = HeadlessBackend::default();
        let descriptor = AtlasTargetDescriptor {
            size: 16384,
            depth_bits: 32,
            hardware_pcf: true,
        };
        assert!(matches!(
            backend.create_atlas_target(&descriptor),
            Err(BackendError::TargetCreation(_))
        ));
    }

    #[test]
    fn test_inputs_keep_their_size() {
        let mut backend = HeadlessBackend::default();
        backend.write_input("lights", &[0; 64]).unwrap();
        backend.write_input("lights", &[1; 64]).unwrap();
        let err = backend.write_input("lights", &[0; 32]).unwrap_err();
        assert!(matches!(err, BackendError::InputWrite { ref name, .. } if name == "lights"));
        assert_eq!(backend.uploaded_bytes, 128);
    }
}
