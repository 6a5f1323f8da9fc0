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

//! Backend-agnostic lighting and shadow contracts.
//!
//! This module defines the vocabulary shared by every lighting crate: the
//! [`Light`] trait and its [`ShadowSource`]s, the GPU-facing structs they
//! produce, the [`LightingSettings`] and the errors. The render backend is
//! reached only through [`ShadowRenderBackend`].

pub mod error;
pub mod light;
pub mod settings;
pub mod shadow;
pub mod traits;

pub use self::error::{AtlasError, BackendError, LightingError};
pub use self::light::{Light, LightCategory, LightKind, LightState};
pub use self::settings::{ExhaustionPolicy, LightingSettings};
pub use self::shadow::{
    normalize_resolution, AtlasSlot, GpuLightData, GpuShadowDescriptor, ResolutionClamp,
    ShadowSource, ShadowSourceId, ShadowViewport, ViewportRect,
};
pub use self::traits::{AtlasTargetDescriptor, ShadowRenderBackend};
