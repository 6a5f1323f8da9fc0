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

//! Shadow sources, atlas slots and the GPU-facing structs they produce.

use crate::math::Mat4;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identifier of a shadow source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShadowSourceId(u64);

impl ShadowSourceId {
    /// Allocates a fresh identifier.
    pub fn next() -> Self {
        Self(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps an externally managed identifier. Uniqueness is the caller's problem.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ShadowSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A square region of the shadow atlas, in tile units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtlasSlot {
    /// Column of the top-left tile.
    pub x: u32,
    /// Row of the top-left tile.
    pub y: u32,
    /// Side length in tiles.
    pub tiles: u32,
}

impl AtlasSlot {
    /// Whether two slots share at least one tile.
    pub fn overlaps(&self, other: &AtlasSlot) -> bool {
        self.x < other.x + other.tiles
            && other.x < self.x + self.tiles
            && self.y < other.y + other.tiles
            && other.y < self.y + self.tiles
    }
}

/// A rectangle in normalized `[0, 1]` atlas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportRect {
    /// Left edge.
    pub left: f32,
    /// Right edge.
    pub right: f32,
    /// Bottom edge.
    pub bottom: f32,
    /// Top edge.
    pub top: f32,
}

impl ViewportRect {
    /// The whole render target.
    pub const FULL: Self = Self {
        left: 0.0,
        right: 1.0,
        bottom: 0.0,
        top: 1.0,
    };

    /// Converts a tile-space slot into normalized coordinates.
    pub fn from_slot(slot: AtlasSlot, tile_size: u32, atlas_size: u32) -> Self {
        let atlas = atlas_size as f32;
        let x0 = (slot.x * tile_size) as f32;
        let y0 = (slot.y * tile_size) as f32;
        let extent = (slot.tiles * tile_size) as f32;
        Self {
            left: x0 / atlas,
            right: (x0 + extent) / atlas,
            bottom: y0 / atlas,
            top: (y0 + extent) / atlas,
        }
    }

    /// `[left, bottom, right, top]`.
    pub fn to_array(&self) -> [f32; 4] {
        [self.left, self.bottom, self.right, self.top]
    }
}

/// The viewport a shadow source was rendered into this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowViewport {
    /// The rendered source.
    pub uid: ShadowSourceId,
    /// Its region of the atlas.
    pub rect: ViewportRect,
}

/// Why a requested resolution was replaced by the tile size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionClamp {
    /// Smaller than one tile, or not a whole number of tiles.
    NotTileMultiple,
    /// Larger than the atlas itself.
    ExceedsAtlas,
}

impl fmt::Display for ResolutionClamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionClamp::NotTileMultiple => f.write_str("not a multiple of the tile size"),
            ResolutionClamp::ExceedsAtlas => f.write_str("bigger than the atlas"),
        }
    }
}

/// Normalizes a requested shadow map resolution against the atlas geometry.
///
/// Returns the stored resolution and, if it differs from the request, why.
///
/// ```
/// use umbra_core::renderer::shadow::{normalize_resolution, ResolutionClamp};
/// assert_eq!(normalize_resolution(512, 256, 2048), (512, None));
/// assert_eq!(normalize_resolution(100, 256, 2048), (256, Some(ResolutionClamp::NotTileMultiple)));
/// assert_eq!(normalize_resolution(4096, 256, 2048), (256, Some(ResolutionClamp::ExceedsAtlas)));
/// ```
pub fn normalize_resolution(
    requested: u32,
    tile_size: u32,
    atlas_size: u32,
) -> (u32, Option<ResolutionClamp>) {
    if requested < tile_size || requested % tile_size != 0 {
        (tile_size, Some(ResolutionClamp::NotTileMultiple))
    } else if requested > atlas_size {
        (tile_size, Some(ResolutionClamp::ExceedsAtlas))
    } else {
        (requested, None)
    }
}

/// One shadow-casting view of a light (a cube face, a cascade...).
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowSource {
    uid: ShadowSourceId,
    resolution: u32,
    slot: Option<AtlasSlot>,
    valid: bool,
    light_index: Option<usize>,
    descriptor_index: Option<usize>,
    view_proj: Mat4,
}

impl ShadowSource {
    /// Creates a source requesting `resolution` pixels per side.
    pub fn new(resolution: u32) -> Self {
        Self {
            uid: ShadowSourceId::next(),
            resolution,
            slot: None,
            valid: false,
            light_index: None,
            descriptor_index: None,
            view_proj: Mat4::IDENTITY,
        }
    }

    /// Identifier of this source.
    pub fn uid(&self) -> ShadowSourceId {
        self.uid
    }

    /// Resolution in pixels per side.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Overrides the resolution. Has no effect on an already assigned slot.
    pub fn set_resolution(&mut self, resolution: u32) {
        self.resolution = resolution;
    }

    /// Whether an atlas region was assigned.
    pub fn has_atlas_slot(&self) -> bool {
        self.slot.is_some()
    }

    /// The assigned atlas region.
    pub fn atlas_slot(&self) -> Option<AtlasSlot> {
        self.slot
    }

    /// Assigns the atlas region. Returns `false` and keeps the existing slot
    /// if one was already assigned.
    pub fn assign_atlas_slot(&mut self, slot: AtlasSlot) -> bool {
        if self.slot.is_some() {
            return false;
        }
        self.slot = Some(slot);
        true
    }

    /// Whether the shadow map content is up to date.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Marks the shadow map as up to date.
    pub fn set_valid(&mut self) {
        self.valid = true;
    }

    /// Marks the shadow map as stale.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Index of the owning light in the global light table.
    pub fn light_index(&self) -> Option<usize> {
        self.light_index
    }

    /// Sets the owning light's index.
    pub fn set_light_index(&mut self, index: usize) {
        self.light_index = Some(index);
    }

    /// Dense index in the active-descriptor array.
    pub fn descriptor_index(&self) -> Option<usize> {
        self.descriptor_index
    }

    /// Sets the dense descriptor index.
    pub fn set_descriptor_index(&mut self, index: usize) {
        self.descriptor_index = Some(index);
    }

    /// View-projection used to render this source.
    pub fn view_proj(&self) -> Mat4 {
        self.view_proj
    }

    /// Replaces the view-projection.
    pub fn set_view_proj(&mut self, view_proj: Mat4) {
        self.view_proj = view_proj;
    }

    /// Packs the source for the GPU.
    pub fn descriptor(&self, tile_size: u32, atlas_size: u32) -> GpuShadowDescriptor {
        let atlas_rect = self
            .slot
            .map(|slot| ViewportRect::from_slot(slot, tile_size, atlas_size).to_array())
            .unwrap_or([0.0; 4]);
        GpuShadowDescriptor {
            view_proj: self.view_proj.to_cols_array_2d(),
            atlas_rect,
            uid: self.uid.raw() as u32,
            light_index: self.light_index.map_or(-1, |i| i as i32),
            resolution: self.resolution,
            _padding: 0,
        }
    }
}

/// A shadow source as seen by the shading and shadow passes.
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GpuShadowDescriptor {
    /// Column-major view-projection.
    pub view_proj: [[f32; 4]; 4],
    /// `[left, bottom, right, top]` in normalized atlas coordinates.
    pub atlas_rect: [f32; 4],
    /// Low 32 bits of the source id.
    pub uid: u32,
    /// Owning light, or -1.
    pub light_index: i32,
    /// Resolution in pixels.
    pub resolution: u32,
    /// Keeps the struct 16-byte aligned for uniform/storage layouts.
    pub _padding: u32,
}

/// One entry of the global light table.
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct GpuLightData {
    /// World position (`w = 1`) or direction (`w = 0`).
    pub position_or_direction: [f32; 4],
    /// Linear RGB color, intensity in `w`.
    pub color: [f32; 4],
    /// Kind-specific parameters (radius, cone angles...).
    pub params: [f32; 4],
    /// Light kind tag.
    pub kind: u32,
    /// Descriptor index of the first shadow source, or -1.
    pub first_shadow: i32,
    /// Number of shadow sources.
    pub shadow_count: u32,
    /// Padding.
    pub _padding: u32,
}
