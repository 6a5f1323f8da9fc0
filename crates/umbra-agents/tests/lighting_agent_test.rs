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

use umbra_agents::lighting_agent::LightingAgent;
use umbra_core::math::{Aabb, Vec3};
use umbra_core::renderer::{
    ExhaustionPolicy, LightCategory, LightKind, LightingError, LightingSettings,
};
use umbra_core::telemetry::MetricId;
use umbra_data::lights::{DirectionalLight, PointLight};
use umbra_lanes::test_support::RecordingBackend;
use umbra_telemetry::MetricsRegistry;

fn settings(atlas_size: u32, max_updates: usize) -> LightingSettings {
    let mut settings = LightingSettings {
        shadow_atlas_size: atlas_size,
        shadow_atlas_tile_size: 256,
        max_shadow_updates_per_frame: max_updates,
        ..Default::default()
    };
    settings.max_shadowed_lights.insert(LightKind::Directional, 4);
    settings
}

fn sun(resolution: u32) -> Box<DirectionalLight> {
    Box::new(DirectionalLight::new(Vec3::new(0.0, -1.0, -0.5)).with_shadows(resolution, 20.0))
}

fn room() -> Aabb {
    Aabb::from_min_max(Vec3::splat(-10.0), Vec3::splat(10.0))
}

#[test]
fn test_agent_creates_render_targets() {
    let backend = RecordingBackend::new();
    let agent = LightingAgent::new(settings(2048, 3), Box::new(backend.clone())).unwrap();

    let recorded = backend.recorded();
    let target = recorded.target.unwrap();
    assert_eq!((target.size, target.depth_bits), (2048, 32));
    assert_eq!(recorded.viewports.len(), 4);
    assert_eq!(recorded.clearers.len(), 3);
    assert_eq!(agent.atlas().total_tile_count(), 64);
}

#[test]
fn test_invalid_settings_are_rejected() {
    let result = LightingAgent::new(settings(1000, 2), Box::new(RecordingBackend::new()));
    assert!(matches!(result, Err(LightingError::InvalidSettings(_))));
}

#[test]
fn test_budget_spreads_updates_over_frames() {
    let backend = RecordingBackend::new();
    let mut agent = LightingAgent::new(settings(2048, 2), Box::new(backend.clone())).unwrap();
    for resolution in [512, 256, 256] {
        agent.add_light(sun(resolution)).unwrap();
    }
    let uid = |i: usize| agent.light(i).unwrap().shadow_sources()[0].uid();
    let (s1, s2, s3) = (uid(0), uid(1), uid(2));

    let stats = agent.update(&room()).unwrap();
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.queued_at_start, 3);
    assert_eq!(stats.queued_remaining, 1);
    assert_eq!(stats.last_uids, vec![s1, s2]);
    assert_eq!(stats.free_tiles, 64 - 4 - 1);
    assert_eq!(backend.recorded().active_viewports(), 2);

    let stats = agent.update(&room()).unwrap();
    assert_eq!(stats.last_uids, vec![s3]);
    assert_eq!(stats.queued_remaining, 0);
    assert_eq!(backend.recorded().active_viewports(), 1);

    let stats = agent.update(&room()).unwrap();
    assert_eq!(stats.processed, 0);
    assert!(!backend.recorded().pass_active);
    assert_eq!(backend.recorded().input::<i32>("numUpdates"), vec![0]);
    assert_eq!(backend.recorded().renders.len(), 3);
    assert_eq!(agent.frame_count(), 3);
}

#[test]
fn test_resolution_below_tile_is_raised() {
    let mut agent =
        LightingAgent::new(settings(2048, 2), Box::new(RecordingBackend::new())).unwrap();
    let index = agent.add_light(sun(100)).unwrap();
    assert_eq!(agent.light(index).unwrap().shadow_sources()[0].resolution(), 256);
    assert_eq!(agent.registry().clamped_source_count(), 1);

    agent.update(&room()).unwrap();
    agent.update(&room()).unwrap();
    let slot = agent.light(index).unwrap().shadow_sources()[0].atlas_slot().unwrap();
    assert_eq!(slot.tiles, 1);
    assert_eq!(agent.registry().clamped_source_count(), 1);
}

#[test]
fn test_culled_light_is_never_queued() {
    let backend = RecordingBackend::new();
    let mut agent = LightingAgent::new(settings(2048, 2), Box::new(backend.clone())).unwrap();
    agent
        .add_light(Box::new(
            PointLight::new(Vec3::new(500.0, 0.0, 0.0), 5.0).with_shadows(256),
        ))
        .unwrap();

    let stats = agent.update(&room()).unwrap();
    assert_eq!(stats.total_visible(), 0);
    assert_eq!(stats.processed, 0);
    assert_eq!(agent.queued_updates(), 0);
    assert!(backend.recorded().renders.is_empty());
    assert_eq!(
        backend.recorded().input::<i32>("countPointLightShadow"),
        vec![0]
    );
}

#[test]
fn test_repeated_invalidation_queues_once() {
    let mut agent =
        LightingAgent::new(settings(2048, 8), Box::new(RecordingBackend::new())).unwrap();
    let index = agent
        .add_light(Box::new(PointLight::new(Vec3::ZERO, 3.0).with_shadows(256)))
        .unwrap();
    let light = agent.light_mut(index).unwrap();
    light.queue_shadow_update();
    light.queue_shadow_update();

    let stats = agent.update(&room()).unwrap();
    assert_eq!(stats.queued_at_start, 6);
    assert_eq!(stats.processed, 6);
    assert_eq!(
        stats.visible_count(LightCategory::new(LightKind::Point, true)),
        1
    );
    assert_eq!(agent.update(&room()).unwrap().processed, 0);
}

#[test]
fn test_exhaustion_aborts_by_default() {
    let mut agent =
        LightingAgent::new(settings(512, 2), Box::new(RecordingBackend::new())).unwrap();
    agent.add_light(sun(512)).unwrap();
    let small = agent.add_light(sun(256)).unwrap();
    let small_uid = agent.light(small).unwrap().shadow_sources()[0].uid();

    let err = agent.update(&room()).unwrap_err();
    assert_eq!(
        err,
        LightingError::AtlasExhausted {
            uid: small_uid,
            requested: 256,
            processed: 1
        }
    );
    let stats = agent.stats();
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.queued_remaining, 1);
    assert_eq!(stats.free_tiles, 0);
}

#[test]
fn test_exhaustion_can_skip_the_frame() {
    let mut config = settings(512, 2);
    config.exhaustion_policy = ExhaustionPolicy::SkipFrame;
    let backend = RecordingBackend::new();
    let mut agent = LightingAgent::new(config, Box::new(backend.clone())).unwrap();
    agent.add_light(sun(512)).unwrap();
    agent.add_light(sun(256)).unwrap();

    let stats = agent.update(&room()).unwrap();
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.queued_remaining, 1);
    assert_eq!(backend.recorded().input::<i32>("numUpdates"), vec![1]);

    // The failing source blocks the head of the queue until space frees up.
    let stats = agent.update(&room()).unwrap();
    assert_eq!(stats.processed, 0);
    assert_eq!(stats.queued_remaining, 1);
}

#[test]
fn test_skipped_head_blocks_sources_that_own_a_region() {
    let mut config = settings(512, 1);
    config.exhaustion_policy = ExhaustionPolicy::SkipFrame;
    let backend = RecordingBackend::new();
    let mut agent = LightingAgent::new(config, Box::new(backend.clone())).unwrap();
    let big = agent.add_light(sun(512)).unwrap();
    agent.add_light(sun(256)).unwrap();

    assert_eq!(agent.update(&room()).unwrap().processed, 1);
    assert!(agent.light(big).unwrap().shadow_sources()[0].atlas_slot().is_some());

    // The placed source is stale again but waits behind the one with no room.
    agent.light_mut(big).unwrap().queue_shadow_update();
    for _ in 0..3 {
        let stats = agent.update(&room()).unwrap();
        assert_eq!(stats.processed, 0);
        assert_eq!(stats.queued_remaining, 2);
    }
    assert_eq!(backend.recorded().renders.len(), 1);
}

#[test]
fn test_removal_is_rejected() {
    let mut agent =
        LightingAgent::new(settings(2048, 2), Box::new(RecordingBackend::new())).unwrap();
    agent.add_light(sun(256)).unwrap();
    assert!(matches!(
        agent.remove_light(0),
        Err(LightingError::NotImplemented(_))
    ));
    assert_eq!(agent.registry().len(), 1);
}

#[test]
fn test_metrics_are_recorded() {
    let registry = MetricsRegistry::new();
    let mut agent = LightingAgent::new(settings(2048, 4), Box::new(RecordingBackend::new()))
        .unwrap()
        .with_telemetry(&registry);
    agent.add_light(sun(512)).unwrap();
    agent
        .add_light(Box::new(PointLight::new(Vec3::ZERO, 2.0)))
        .unwrap();
    agent.update(&room()).unwrap();
    agent.update(&room()).unwrap();

    let metric = |name: &str| registry.get_metric(&MetricId::new("lighting", name)).unwrap();
    assert_eq!(metric("shadow_updates").value.as_counter(), Some(1));
    assert_eq!(metric("visible_lights").value.as_gauge(), Some(2.0));
    assert_eq!(metric("atlas_free_tiles").value.as_gauge(), Some(60.0));
    assert_eq!(metric("cull_time_ms").value.sample_count(), Some(2));
    assert_eq!(metric("shadow_time_ms").value.sample_count(), Some(2));
}
