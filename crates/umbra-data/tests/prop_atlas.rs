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

use proptest::prelude::*;
use umbra_core::renderer::{AtlasError, AtlasSlot, ShadowSourceId};
use umbra_data::allocators::ShadowAtlas;

#[derive(Debug, Clone)]
enum Op {
    Reserve { id: u64, tiles: u32 },
    Free { id: u64 },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u64..24, 1u32..=3).prop_map(|(id, tiles)| Op::Reserve { id, tiles }),
        1 => (0u64..24).prop_map(|id| Op::Free { id }),
    ]
}

fn block_is_free(atlas: &ShadowAtlas, x: u32, y: u32, tiles: u32) -> bool {
    (y..y + tiles).all(|cy| (x..x + tiles).all(|cx| atlas.owner_at(cx, cy).is_none()))
}

fn any_free_block(atlas: &ShadowAtlas, tiles: u32) -> bool {
    let n = atlas.tiles_per_side();
    if tiles > n {
        return false;
    }
    (0..=n - tiles).any(|y| (0..=n - tiles).any(|x| block_is_free(atlas, x, y, tiles)))
}

fn assert_consistent(atlas: &ShadowAtlas) {
    let live: Vec<(ShadowSourceId, AtlasSlot)> = atlas.reservations().collect();
    for (i, (_, a)) in live.iter().enumerate() {
        for (_, b) in &live[i + 1..] {
            assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
        }
    }
    let used: usize = live.iter().map(|(_, s)| (s.tiles * s.tiles) as usize).sum();
    assert_eq!(atlas.free_tile_count(), atlas.total_tile_count() - used);

    for (uid, slot) in &live {
        assert_eq!(atlas.owner_at(slot.x, slot.y), Some(*uid));
        let far = slot.tiles - 1;
        assert_eq!(atlas.owner_at(slot.x + far, slot.y + far), Some(*uid));
    }
}

proptest! {
    #[test]
    fn reservations_never_overlap_and_fail_only_when_full(ops in prop::collection::vec(arb_op(), 1..80)) {
        let mut atlas = ShadowAtlas::new(1536, 256);

        for op in ops {
            match op {
                Op::Reserve { id, tiles } => {
                    let uid = ShadowSourceId::from_raw(id);
                    let owned = atlas.slot_of(uid).is_some();
                    let had_space = any_free_block(&atlas, tiles);
                    let free_before = atlas.free_tile_count();

                    match atlas.reserve(tiles, tiles, uid) {
                        Ok(slot) => {
                            prop_assert!(!owned);
                            prop_assert_eq!(slot.tiles, tiles);
                        }
                        Err(AtlasError::AlreadyReserved(_)) => prop_assert!(owned),
                        Err(AtlasError::NoSpace { .. }) => {
                            prop_assert!(!had_space);
                            prop_assert_eq!(atlas.free_tile_count(), free_before);
                        }
                        Err(other) => prop_assert!(false, "unexpected {other}"),
                    }
                }
                Op::Free { id } => {
                    let uid = ShadowSourceId::from_raw(id);
                    let owned = atlas.slot_of(uid).is_some();
                    prop_assert_eq!(atlas.free(uid), owned);
                }
            }
            assert_consistent(&atlas);
        }
    }
}
