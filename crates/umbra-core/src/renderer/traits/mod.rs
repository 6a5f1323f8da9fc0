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

//! Capability traits the lighting core needs from its environment.
//!
//! - [`ShadowRenderBackend`]: the render target, viewports and shader inputs
//!   used by the shadow pass and the shading stage.

mod shadow_backend;

pub use self::shadow_backend::{AtlasTargetDescriptor, ShadowRenderBackend};
