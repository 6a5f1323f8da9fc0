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

//! Defines the LightingAgent, the per-frame orchestrator of lights and shadows.

use super::stats::LightingStats;
use umbra_core::math::CullVolume;
use umbra_core::renderer::{
    AtlasTargetDescriptor, ExhaustionPolicy, Light, LightingError, LightingSettings,
    ShadowRenderBackend,
};
use umbra_core::telemetry::MetricId;
use umbra_data::allocators::ShadowAtlas;
use umbra_lanes::gpu_lane::GpuLightingData;
use umbra_lanes::light_lane::{AtlasGeometry, LightCullLane, LightRegistry};
use umbra_lanes::shadow_lane::ShadowUpdateLane;
use umbra_telemetry::{
    CounterHandle, GaugeHandle, HistogramHandle, MetricsRegistry, ScopedMetricTimer,
};

const METRICS_NAMESPACE: &str = "lighting";
const TIMING_BUCKETS_MS: [f64; 6] = [0.1, 0.5, 1.0, 2.0, 5.0, 16.0];

/// Holds telemetry handles for the lighting subsystem.
#[derive(Debug)]
struct LightingMetrics {
    visible_lights: GaugeHandle,
    dropped_lights: CounterHandle,
    queued_updates: GaugeHandle,
    shadow_updates: CounterHandle,
    free_tiles: GaugeHandle,
    cull_time_ms: HistogramHandle,
    shadow_time_ms: HistogramHandle,
}

impl LightingMetrics {
    fn register(registry: &MetricsRegistry) -> Result<Self, umbra_core::telemetry::MetricsError> {
        let id = |name: &str| MetricId::new(METRICS_NAMESPACE, name);
        let buckets = TIMING_BUCKETS_MS.to_vec();
        Ok(Self {
            visible_lights: registry.register_gauge(
                id("visible_lights"),
                "Lights that passed culling",
                "count",
            )?,
            dropped_lights: registry.register_counter(
                id("dropped_lights"),
                "Visible lights dropped because their category was full",
            )?,
            queued_updates: registry.register_gauge(
                id("queued_shadow_updates"),
                "Shadow maps still waiting after the shadow pass",
                "count",
            )?,
            shadow_updates: registry.register_counter(
                id("shadow_updates"),
                "Shadow maps re-rendered",
            )?,
            free_tiles: registry.register_gauge(
                id("atlas_free_tiles"),
                "Unreserved shadow atlas tiles",
                "tiles",
            )?,
            cull_time_ms: registry.register_histogram(
                id("cull_time_ms"),
                "Time spent updating and culling lights",
                "ms",
                buckets.clone(),
            )?,
            shadow_time_ms: registry.register_histogram(
                id("shadow_time_ms"),
                "Time spent scheduling shadow updates",
                "ms",
                buckets,
            )?,
        })
    }

    fn record(&self, stats: &LightingStats) {
        let results = [
            self.visible_lights.set(stats.total_visible() as f64),
            self.queued_updates.set(stats.queued_remaining as f64),
            self.free_tiles.set(stats.free_tiles as f64),
            self.dropped_lights.increment_by(stats.dropped as u64).map(|_| ()),
            self.shadow_updates.increment_by(stats.processed as u64).map(|_| ()),
        ];
        for err in results.into_iter().filter_map(Result::err) {
            log::warn!("Failed to record lighting metric: {err}");
        }
    }
}

/// The agent responsible for lights and their shadow maps.
///
/// It owns the light table, the shadow atlas, the update queue and the GPU
/// buffers, and drives the render backend through [`ShadowRenderBackend`].
#[derive(Debug)]
pub struct LightingAgent {
    settings: LightingSettings,
    backend: Box<dyn ShadowRenderBackend>,
    atlas: ShadowAtlas,
    registry: LightRegistry,
    cull_lane: LightCullLane,
    shadow_lane: ShadowUpdateLane,
    gpu_data: GpuLightingData,
    metrics: Option<LightingMetrics>,
    frame_count: u64,
}

impl LightingAgent {
    /// Creates the agent and its render targets.
    ///
    /// One render viewport per shadow update is created on top of the
    /// full-target viewport 0.
    ///
    /// ## Errors
    /// * `LightingError::InvalidSettings` - If `settings` don't validate.
    /// * `LightingError::Backend` - If the atlas target or viewports can't be created.
    pub fn new(
        settings: LightingSettings,
        mut backend: Box<dyn ShadowRenderBackend>,
    ) -> Result<Self, LightingError> {
        settings.validate()?;

        let atlas = ShadowAtlas::new(settings.shadow_atlas_size, settings.shadow_atlas_tile_size);
        backend.create_atlas_target(&AtlasTargetDescriptor {
            size: settings.shadow_atlas_size,
            depth_bits: settings.shadow_depth_bits,
            hardware_pcf: settings.use_hardware_pcf,
        })?;
        backend.create_viewports(settings.max_shadow_updates_per_frame + 1)?;

        log::info!(
            "Lighting agent ready: {0}x{0} shadow atlas in {1}px tiles, {2} updates per frame",
            settings.shadow_atlas_size,
            settings.shadow_atlas_tile_size,
            settings.max_shadow_updates_per_frame
        );

        Ok(Self {
            registry: LightRegistry::new(&settings),
            cull_lane: LightCullLane::new(&settings),
            shadow_lane: ShadowUpdateLane::new(),
            gpu_data: GpuLightingData::new(&settings),
            metrics: None,
            frame_count: 0,
            atlas,
            backend,
            settings,
        })
    }

    /// Attaches a metrics registry to the agent for observability.
    ///
    /// The agent keeps running without metrics if registration fails.
    pub fn with_telemetry(mut self, registry: &MetricsRegistry) -> Self {
        match LightingMetrics::register(registry) {
            Ok(metrics) => self.metrics = Some(metrics),
            Err(e) => log::warn!("Lighting metrics unavailable: {e}"),
        }
        self
    }

    /// Registers a light and returns its index in the light table.
    pub fn add_light(&mut self, light: Box<dyn Light>) -> Result<usize, LightingError> {
        self.registry.register(light, AtlasGeometry::of(&self.atlas))
    }

    /// Lights can't be removed.
    pub fn remove_light(&mut self, index: usize) -> Result<Box<dyn Light>, LightingError> {
        self.registry.remove(index)
    }

    /// The light at `index`.
    pub fn light(&self, index: usize) -> Option<&dyn Light> {
        self.registry.light(index)
    }

    /// The light at `index`, to move or reconfigure it.
    pub fn light_mut(&mut self, index: usize) -> Option<&mut (dyn Light + 'static)> {
        self.registry.light_mut(index)
    }

    /// Runs one frame: update and cull against `view`, re-render stale
    /// shadow maps, then publish every buffer.
    ///
    /// Under [`ExhaustionPolicy::SkipFrame`] atlas exhaustion is logged and
    /// the frame completes with whatever was processed; the failing source
    /// stays first in line for the next frame. Until atlas space frees up it
    /// blocks every source queued behind it, even those that already own a
    /// region.
    pub fn update(&mut self, view: &dyn CullVolume) -> Result<LightingStats, LightingError> {
        {
            let _timer = ScopedMetricTimer::maybe(self.metrics.as_ref().map(|m| &m.cull_time_ms));
            let visible =
                self.cull_lane
                    .update_and_cull(&mut self.registry, view, self.shadow_lane.queue_mut());
            self.gpu_data.update_lights(&self.registry, visible);
        }

        let shadow_result = {
            let _timer =
                ScopedMetricTimer::maybe(self.metrics.as_ref().map(|m| &m.shadow_time_ms));
            self.shadow_lane
                .process_frame(
                    self.settings.max_shadow_updates_per_frame,
                    &mut self.registry,
                    &mut self.atlas,
                    self.backend.as_mut(),
                )
                .map(|_| ())
        };
        self.gpu_data.record_shadow_frame(self.shadow_lane.frame());
        let publish_result = self.gpu_data.publish(self.backend.as_mut());

        let stats = self.stats();
        if let Some(metrics) = &self.metrics {
            metrics.record(&stats);
        }
        if self.settings.display_debug_stats {
            log::debug!("{stats}");
        }
        self.frame_count += 1;

        match shadow_result {
            Err(err @ LightingError::AtlasExhausted { .. })
                if self.settings.exhaustion_policy == ExhaustionPolicy::SkipFrame =>
            {
                log::error!("{err}, keeping the partial frame");
            }
            other => other?,
        }
        publish_result?;

        log::trace!(
            "Lighting frame {}: {} visible, {} shadow updates",
            self.frame_count,
            stats.total_visible(),
            stats.processed
        );
        Ok(stats)
    }

    /// Summarizes the last frame.
    pub fn stats(&self) -> LightingStats {
        let frame = self.shadow_lane.frame();
        let visible = self.cull_lane.visible();
        LightingStats {
            visible: visible.iter().map(|(c, array)| (c, array.len())).collect(),
            dropped: visible.dropped(),
            processed: frame.processed,
            queued_at_start: frame.queued_at_start,
            queued_remaining: self.shadow_lane.queue().len(),
            shadow_sources: self.registry.source_count(),
            last_uids: frame.last_uids.clone(),
            free_tiles: self.atlas.free_tile_count(),
            total_tiles: self.atlas.total_tile_count(),
        }
    }

    /// The settings the agent was built with.
    pub fn settings(&self) -> &LightingSettings {
        &self.settings
    }

    /// The light table.
    pub fn registry(&self) -> &LightRegistry {
        &self.registry
    }

    /// The shadow atlas.
    pub fn atlas(&self) -> &ShadowAtlas {
        &self.atlas
    }

    /// The buffers published last frame.
    pub fn gpu_data(&self) -> &GpuLightingData {
        &self.gpu_data
    }

    /// Shadow maps waiting to be re-rendered.
    pub fn queued_updates(&self) -> usize {
        self.shadow_lane.queue().len()
    }

    /// Number of frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
