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

//! Per-frame shadow map re-rendering under a fixed budget.

use super::queue::ShadowUpdateQueue;
use crate::light_lane::LightRegistry;
use umbra_core::renderer::{
    AtlasError, AtlasSlot, GpuShadowDescriptor, LightingError, ShadowRenderBackend,
    ShadowSource, ShadowSourceId, ShadowViewport, ViewportRect,
};
use umbra_data::allocators::ShadowAtlas;

/// The debug overlay only lists the processed uids for small budgets.
const MAX_LISTED_UIDS: usize = 8;

/// One shadow map re-rendered this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowUpdate {
    /// The re-rendered source.
    pub uid: ShadowSourceId,
    /// Its index in the active-descriptor array.
    pub descriptor_index: usize,
    /// The descriptor handed to the backend.
    pub descriptor: GpuShadowDescriptor,
    /// Where it was rendered in the atlas.
    pub rect: ViewportRect,
}

/// What the shadow lane did during one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShadowFrame {
    /// Number of sources re-rendered.
    pub processed: usize,
    /// Queue length before processing.
    pub queued_at_start: usize,
    /// Whether the shadow pass was enabled.
    pub has_work: bool,
    /// Atlas viewports rendered, in processing order.
    pub viewports: Vec<ShadowViewport>,
    /// The processed uids, for small budgets only.
    pub last_uids: Vec<ShadowSourceId>,
    /// Everything the GPU marshaller needs about each re-render.
    pub updates: Vec<ShadowUpdate>,
}

impl ShadowFrame {
    fn reset(&mut self, queued: usize) {
        self.processed = 0;
        self.queued_at_start = queued;
        self.has_work = false;
        self.viewports.clear();
        self.last_uids.clear();
        self.updates.clear();
    }
}

/// Drains the shadow update queue a few sources per frame, placing each in
/// the atlas on first use and pointing one render viewport at it.
#[derive(Debug, Default)]
pub struct ShadowUpdateLane {
    queue: ShadowUpdateQueue,
    frame: ShadowFrame,
}

impl ShadowUpdateLane {
    /// Creates a lane with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// The pending sources.
    pub fn queue(&self) -> &ShadowUpdateQueue {
        &self.queue
    }

    /// The pending sources, for the cull pass to append to.
    pub fn queue_mut(&mut self) -> &mut ShadowUpdateQueue {
        &mut self.queue
    }

    /// The result of the last call to [`Self::process_frame`], partial if it
    /// failed midway.
    pub fn frame(&self) -> &ShadowFrame {
        &self.frame
    }

    /// Re-renders up to `max_updates` queued shadow maps, oldest first.
    ///
    /// A failing source stays at the head and blocks the sources behind it,
    /// including ones that already own a slot, until it can be placed.
    ///
    /// Viewports `1..=max_updates` and clearers `0..max_updates` are reset
    /// every frame, then one pair is activated per processed source. Sources
    /// are popped only once fully processed, so a failure leaves the failing
    /// source at the head of the queue.
    ///
    /// ## Errors
    /// * `LightingError::AtlasExhausted` - A source fits nowhere, even at one tile.
    /// * `LightingError::Backend` - The backend rejected a call.
    pub fn process_frame(
        &mut self,
        max_updates: usize,
        registry: &mut LightRegistry,
        atlas: &mut ShadowAtlas,
        backend: &mut dyn ShadowRenderBackend,
    ) -> Result<&ShadowFrame, LightingError> {
        self.frame.reset(self.queue.len());

        for index in 0..max_updates {
            backend.set_depth_clear(index, None)?;
            backend.set_viewport(index + 1, None)?;
        }

        if self.queue.is_empty() {
            backend.set_shadow_pass_active(false)?;
            return Ok(&self.frame);
        }
        self.frame.has_work = true;
        backend.set_shadow_pass_active(true)?;

        let tile_size = atlas.tile_size();
        let atlas_size = atlas.size();

        // Unregistered uids are dropped without counting against the budget.
        while self.frame.processed < max_updates {
            let Some(uid) = self.queue.front() else {
                break;
            };
            let Some(descriptor_index) = registry.location(uid).map(|loc| loc.descriptor) else {
                log::warn!("Shadow source {uid} is queued but not registered, dropping it");
                self.queue.pop_front();
                continue;
            };
            let Some(source) = registry.source_mut(uid) else {
                self.queue.pop_front();
                continue;
            };

            let slot = match source.atlas_slot() {
                Some(slot) => slot,
                None => {
                    let slot = place_in_atlas(source, atlas, self.frame.processed)?;
                    source.assign_atlas_slot(slot);
                    slot
                }
            };

            let descriptor = source.descriptor(tile_size, atlas_size);
            backend.trigger_render(&descriptor)?;

            let rect = ViewportRect::from_slot(slot, tile_size, atlas_size);
            let processed = self.frame.processed;
            backend.set_viewport(processed + 1, Some(rect))?;
            backend.set_depth_clear(processed, Some(rect))?;

            source.set_valid();
            self.queue.pop_front();

            self.frame.viewports.push(ShadowViewport { uid, rect });
            self.frame.updates.push(ShadowUpdate {
                uid,
                descriptor_index,
                descriptor,
                rect,
            });
            if max_updates <= MAX_LISTED_UIDS {
                self.frame.last_uids.push(uid);
            }
            self.frame.processed += 1;
        }

        log::trace!(
            "Shadow lane processed {}/{} queued sources",
            self.frame.processed,
            self.frame.queued_at_start
        );
        Ok(&self.frame)
    }
}

/// Finds a region for a source that has none yet.
///
/// A region already held by the uid is reused. When the requested size no
/// longer fits, the source is degraded to a single tile before giving up.
fn place_in_atlas(
    source: &mut ShadowSource,
    atlas: &mut ShadowAtlas,
    processed: usize,
) -> Result<AtlasSlot, LightingError> {
    let uid = source.uid();
    if let Some(slot) = atlas.slot_of(uid) {
        return Ok(slot);
    }

    let requested = source.resolution();
    match atlas.reserve_pixels(requested, uid) {
        Ok(slot) => Ok(slot),
        Err(AtlasError::NoSpace { .. }) => {
            log::warn!(
                "No atlas space for shadow source {uid} at {requested}px, falling back to a single {}px tile",
                atlas.tile_size()
            );
            source.set_resolution(atlas.tile_size());
            atlas.reserve(1, 1, uid).map_err(|err| {
                log::error!("Shadow atlas exhausted, cannot place shadow source {uid}: {err}");
                LightingError::AtlasExhausted {
                    uid,
                    requested,
                    processed,
                }
            })
        }
        Err(err) => Err(err.into()),
    }
}
