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

//! A fixed-granularity tile allocator for the shared shadow map texture.
//!
//! The atlas is a square grid of equal tiles. Every shadow map occupies a
//! square block of whole tiles, owned by its [`ShadowSourceId`]. Placement is a
//! row-major first-fit scan over tile-aligned origins: simple, deterministic,
//! and exact (a request fails only if no free block of that size exists).

use serde::Serialize;
use std::collections::HashMap;
use umbra_core::renderer::{AtlasError, AtlasSlot, ShadowSourceId};

/// A point-in-time summary of atlas usage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AtlasStats {
    /// Tiles in the whole atlas.
    pub total_tiles: usize,
    /// Tiles not owned by any source.
    pub free_tiles: usize,
    /// Number of live reservations.
    pub reservations: usize,
    /// Fraction of tiles in use, `0.0..=1.0`.
    pub utilization: f32,
}

/// Tile allocator for the shadow atlas.
#[derive(Debug, Clone)]
pub struct ShadowAtlas {
    size: u32,
    tile_size: u32,
    tiles_per_side: u32,
    /// Row-major owner of each tile.
    occupancy: Vec<Option<ShadowSourceId>>,
    free_tiles: usize,
    slots: HashMap<ShadowSourceId, AtlasSlot>,
}

impl ShadowAtlas {
    /// Creates an empty atlas of `size_px` pixels per side split into tiles of
    /// `tile_px` pixels. A partial last row/column of tiles is not usable.
    pub fn new(size_px: u32, tile_px: u32) -> Self {
        let tile_size = tile_px.max(1);
        let tiles_per_side = size_px / tile_size;
        let total = (tiles_per_side * tiles_per_side) as usize;
        log::debug!(
            "Shadow atlas: {size_px}px, {tiles_per_side}x{tiles_per_side} tiles of {tile_size}px"
        );
        Self {
            size: size_px,
            tile_size,
            tiles_per_side,
            occupancy: vec![None; total],
            free_tiles: total,
            slots: HashMap::new(),
        }
    }

    /// Reserves a free `tiles_w` x `tiles_h` block for `uid`.
    ///
    /// The atlas is left untouched on failure.
    pub fn reserve(
        &mut self,
        tiles_w: u32,
        tiles_h: u32,
        uid: ShadowSourceId,
    ) -> Result<AtlasSlot, AtlasError> {
        let invalid = |reason| AtlasError::InvalidRequest {
            tiles_w,
            tiles_h,
            reason,
        };
        if tiles_w == 0 || tiles_h == 0 {
            return Err(invalid("empty region"));
        }
        if tiles_w != tiles_h {
            return Err(invalid("shadow regions must be square"));
        }
        if tiles_w > self.tiles_per_side {
            return Err(invalid("region larger than the atlas"));
        }
        if self.slots.contains_key(&uid) {
            return Err(AtlasError::AlreadyReserved(uid));
        }

        let tiles = tiles_w;
        if (tiles * tiles) as usize > self.free_tiles {
            return Err(AtlasError::NoSpace { tiles });
        }

        let slot = self.find_free_block(tiles).ok_or(AtlasError::NoSpace { tiles })?;
        self.fill(slot, Some(uid));
        self.free_tiles -= (tiles * tiles) as usize;
        self.slots.insert(uid, slot);
        log::trace!(
            "Reserved {tiles}x{tiles} tiles at ({}, {}) for shadow source {uid}",
            slot.x,
            slot.y
        );
        Ok(slot)
    }

    /// Reserves a block for a resolution given in pixels.
    ///
    /// The resolution must be a positive multiple of the tile size.
    pub fn reserve_pixels(
        &mut self,
        resolution: u32,
        uid: ShadowSourceId,
    ) -> Result<AtlasSlot, AtlasError> {
        if resolution == 0 || resolution % self.tile_size != 0 {
            let tiles = resolution / self.tile_size;
            return Err(AtlasError::InvalidRequest {
                tiles_w: tiles,
                tiles_h: tiles,
                reason: "resolution is not a multiple of the tile size",
            });
        }
        let tiles = resolution / self.tile_size;
        self.reserve(tiles, tiles, uid)
    }

    /// Releases the region owned by `uid`. Returns `false` if it owned none.
    pub fn free(&mut self, uid: ShadowSourceId) -> bool {
        let Some(slot) = self.slots.remove(&uid) else {
            return false;
        };
        self.fill(slot, None);
        self.free_tiles += (slot.tiles * slot.tiles) as usize;
        log::trace!("Released atlas region of shadow source {uid}");
        true
    }

    /// The region owned by `uid`, if any.
    pub fn slot_of(&self, uid: ShadowSourceId) -> Option<AtlasSlot> {
        self.slots.get(&uid).copied()
    }

    /// The owner of the tile at column `x`, row `y`.
    pub fn owner_at(&self, x: u32, y: u32) -> Option<ShadowSourceId> {
        if x >= self.tiles_per_side || y >= self.tiles_per_side {
            return None;
        }
        self.occupancy[self.tile_index(x, y)]
    }

    /// Number of unowned tiles.
    pub fn free_tile_count(&self) -> usize {
        self.free_tiles
    }

    /// Number of tiles in the atlas.
    pub fn total_tile_count(&self) -> usize {
        self.occupancy.len()
    }

    /// Number of live reservations.
    pub fn reservation_count(&self) -> usize {
        self.slots.len()
    }

    /// Tile side length in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Atlas side length in pixels.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of tiles along one side.
    pub fn tiles_per_side(&self) -> u32 {
        self.tiles_per_side
    }

    /// Iterates over live reservations in no particular order.
    pub fn reservations(&self) -> impl Iterator<Item = (ShadowSourceId, AtlasSlot)> + '_ {
        self.slots.iter().map(|(uid, slot)| (*uid, *slot))
    }

    /// Usage summary.
    pub fn stats(&self) -> AtlasStats {
        let total = self.total_tile_count();
        AtlasStats {
            total_tiles: total,
            free_tiles: self.free_tiles,
            reservations: self.slots.len(),
            utilization: if total == 0 {
                0.0
            } else {
                (total - self.free_tiles) as f32 / total as f32
            },
        }
    }

    #[inline]
    fn tile_index(&self, x: u32, y: u32) -> usize {
        (y * self.tiles_per_side + x) as usize
    }

    fn find_free_block(&self, tiles: u32) -> Option<AtlasSlot> {
        let last = self.tiles_per_side - tiles;
        for y in 0..=last {
            let mut x = 0;
            while x <= last {
                match self.last_occupied_column(x, y, tiles) {
                    // Any origin up to the blocking column would overlap it too.
                    Some(column) => x = column + 1,
                    None => return Some(AtlasSlot { x, y, tiles }),
                }
            }
        }
        None
    }

    /// Rightmost occupied column inside the block, or `None` if it is free.
    fn last_occupied_column(&self, x: u32, y: u32, tiles: u32) -> Option<u32> {
        (x..x + tiles).rev().find(|&cx| {
            (y..y + tiles).any(|cy| self.occupancy[self.tile_index(cx, cy)].is_some())
        })
    }

    fn fill(&mut self, slot: AtlasSlot, owner: Option<ShadowSourceId>) {
        for y in slot.y..slot.y + slot.tiles {
            for x in slot.x..slot.x + slot.tiles {
                let index = self.tile_index(x, y);
                self.occupancy[index] = owner;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> ShadowSourceId {
        ShadowSourceId::from_raw(raw)
    }

    fn counted_free(atlas: &ShadowAtlas) -> usize {
        atlas.occupancy.iter().filter(|t| t.is_none()).count()
    }

    #[test]
    fn test_geometry() {
        let atlas = ShadowAtlas::new(2048, 256);
        assert_eq!(atlas.tiles_per_side(), 8);
        assert_eq!(atlas.total_tile_count(), 64);
        assert_eq!(atlas.free_tile_count(), 64);
        assert_eq!(atlas.size(), 2048);
        assert_eq!(atlas.tile_size(), 256);
    }

    #[test]
    fn test_first_fit_row_major() {
        let mut atlas = ShadowAtlas::new(2048, 256);
        let a = atlas.reserve(2, 2, id(1)).unwrap();
        let b = atlas.reserve(1, 1, id(2)).unwrap();
        let c = atlas.reserve(1, 1, id(3)).unwrap();
        assert_eq!(a, AtlasSlot { x: 0, y: 0, tiles: 2 });
        assert_eq!(b, AtlasSlot { x: 2, y: 0, tiles: 1 });
        assert_eq!(c, AtlasSlot { x: 3, y: 0, tiles: 1 });
        assert_eq!(atlas.free_tile_count(), 64 - 6);
        assert_eq!(atlas.free_tile_count(), counted_free(&atlas));
        assert_eq!(atlas.owner_at(1, 1), Some(id(1)));
        assert_eq!(atlas.slot_of(id(2)), Some(b));
    }

    #[test]
    fn test_rejects_invalid_requests() {
        let mut atlas = ShadowAtlas::new(1024, 256);
        assert!(matches!(
            atlas.reserve(0, 0, id(1)),
            Err(AtlasError::InvalidRequest { .. })
        ));
        assert!(matches!(
            atlas.reserve(2, 1, id(1)),
            Err(AtlasError::InvalidRequest { .. })
        ));
        assert!(matches!(
            atlas.reserve(5, 5, id(1)),
            Err(AtlasError::InvalidRequest { .. })
        ));
        assert!(matches!(
            atlas.reserve_pixels(300, id(1)),
            Err(AtlasError::InvalidRequest { .. })
        ));
        assert_eq!(atlas.free_tile_count(), 16);
    }

    #[test]
    fn test_already_reserved() {
        let mut atlas = ShadowAtlas::new(1024, 256);
        atlas.reserve(1, 1, id(1)).unwrap();
        assert_eq!(
            atlas.reserve(1, 1, id(1)),
            Err(AtlasError::AlreadyReserved(id(1)))
        );
        assert_eq!(atlas.reservation_count(), 1);
    }

    #[test]
    fn test_fails_without_contiguous_block_and_does_not_mutate() {
        // 4x4 atlas with a checkerboard of 1x1 reservations on the diagonals:
        // 12 free tiles remain but no free 2x2 block exists.
        let mut atlas = ShadowAtlas::new(1024, 256);
        for (i, (x, y)) in [(1, 0), (3, 0), (0, 2), (2, 2)].iter().enumerate() {
            atlas.fill(AtlasSlot { x: *x, y: *y, tiles: 1 }, Some(id(100 + i as u64)));
            atlas.free_tiles -= 1;
        }
        // Columns 1 and 3 are blocked in rows 0..2, columns 0 and 2 in rows 2..4.
        let before = atlas.occupancy.clone();
        assert_eq!(atlas.reserve(2, 2, id(1)), Err(AtlasError::NoSpace { tiles: 2 }));
        assert_eq!(atlas.occupancy, before);
        assert_eq!(atlas.free_tile_count(), 12);
        assert_eq!(atlas.slot_of(id(1)), None);

        // A single tile still fits.
        assert!(atlas.reserve(1, 1, id(2)).is_ok());
    }

    #[test]
    fn test_free_releases_tiles() {
        let mut atlas = ShadowAtlas::new(1024, 256);
        atlas.reserve(4, 4, id(1)).unwrap();
        assert_eq!(atlas.free_tile_count(), 0);
        assert_eq!(atlas.reserve(1, 1, id(2)), Err(AtlasError::NoSpace { tiles: 1 }));

        assert!(atlas.free(id(1)));
        assert!(!atlas.free(id(1)));
        assert_eq!(atlas.free_tile_count(), 16);
        assert_eq!(atlas.free_tile_count(), counted_free(&atlas));
        assert_eq!(
            atlas.reserve(2, 2, id(2)).unwrap(),
            AtlasSlot { x: 0, y: 0, tiles: 2 }
        );
    }

    #[test]
    fn test_skips_past_blocking_tiles() {
        let mut atlas = ShadowAtlas::new(1024, 256);
        atlas.reserve(1, 1, id(1)).unwrap();
        // (0,0) is taken, the first 2x2 origin on row 0 is x = 1.
        assert_eq!(
            atlas.reserve(2, 2, id(2)).unwrap(),
            AtlasSlot { x: 1, y: 0, tiles: 2 }
        );
        // Row 0 has one free tile at x = 3; a 2x2 block needs rows 2..4.
        assert_eq!(
            atlas.reserve(2, 2, id(3)).unwrap(),
            AtlasSlot { x: 0, y: 2, tiles: 2 }
        );
    }

    #[test]
    fn test_stats() {
        let mut atlas = ShadowAtlas::new(1024, 256);
        atlas.reserve_pixels(512, id(1)).unwrap();
        let stats = atlas.stats();
        assert_eq!(stats.total_tiles, 16);
        assert_eq!(stats.free_tiles, 12);
        assert_eq!(stats.reservations, 1);
        assert_eq!(stats.utilization, 0.25);
    }
}
