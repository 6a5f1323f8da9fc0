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

// Umbra Sandbox
// Drives the lighting agent over a scripted scene without a GPU.

mod backend;

use anyhow::{Context, Result};
use backend::HeadlessBackend;
use std::path::PathBuf;
use std::time::Duration;
use umbra_agents::lighting_agent::LightingAgent;
use umbra_core::math::{Frustum, Mat4, Vec3, FRAC_PI_2};
use umbra_core::renderer::LightingSettings;
use umbra_data::lights::{DirectionalLight, PointLight};
use umbra_telemetry::TelemetryService;

const FRAMES: u32 = 240;

fn load_settings() -> Result<LightingSettings> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/lighting.ron"));
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let settings: LightingSettings =
        ron::from_str(&text).with_context(|| format!("Invalid settings in {}", path.display()))?;
    Ok(settings)
}

fn populate(agent: &mut LightingAgent) -> Result<()> {
    agent.add_light(Box::new(
        DirectionalLight::new(Vec3::new(-0.3, -1.0, -0.4))
            .with_color([1.0, 0.95, 0.85], 3.0)
            .with_shadows(1024, 40.0),
    ))?;

    let warm = [1.0, 0.6, 0.3];
    for i in 0..4 {
        let x = -15.0 + 10.0 * i as f32;
        agent.add_light(Box::new(
            PointLight::new(Vec3::new(x, 3.0, -10.0), 8.0)
                .with_color(warm, 2.0)
                .with_shadows(256),
        ))?;
    }
    for i in 0..3 {
        let z = -30.0 - 12.0 * i as f32;
        agent.add_light(Box::new(PointLight::new(Vec3::new(0.0, 2.0, z), 5.0)))?;
    }
    Ok(())
}

/// A camera at the origin slowly turning around the Y axis.
fn camera_frustum(frame: u32) -> Result<Frustum> {
    let angle = frame as f32 * 0.02;
    let target = Vec3::new(angle.sin(), 0.0, -angle.cos());
    let view = Mat4::look_at_rh(Vec3::ZERO, target, Vec3::Y).context("Degenerate camera")?;
    let proj = Mat4::perspective_rh_zo(FRAC_PI_2, 16.0 / 9.0, 0.1, 100.0);
    Ok(Frustum::from_view_proj(&(proj * view)))
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = load_settings()?;
    let mut telemetry = TelemetryService::new(Duration::from_secs(1));
    let mut agent = LightingAgent::new(settings, Box::new(HeadlessBackend::default()))?
        .with_telemetry(telemetry.metrics_registry());
    populate(&mut agent)?;

    for frame in 0..FRAMES {
        // The shadowed lights flicker in turn, invalidating their cube maps.
        if frame % 30 == 0 {
            let index = 1 + (frame / 30) as usize % 4;
            if let Some(light) = agent.light_mut(index) {
                light.queue_shadow_update();
            }
        }

        let stats = agent.update(&camera_frustum(frame)?)?;
        if frame % 60 == 0 {
            log::info!("Frame {frame}\n{stats}");
        }
        telemetry.tick();
    }

    let atlas = ron::ser::to_string_pretty(&agent.atlas().stats(), ron::ser::PrettyConfig::default())?;
    log::info!("Final atlas state: {atlas}");
    for snapshot in telemetry.snapshot() {
        log::info!("{} = {:.3} {}", snapshot.id, snapshot.value, snapshot.unit);
    }
    Ok(())
}
