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

//! A per-frame summary of the lighting pipeline, printable as an overlay.

use std::fmt;
use umbra_core::renderer::{LightCategory, LightKind, ShadowSourceId};

/// What the lighting agent did during one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightingStats {
    /// Visible lights per category.
    pub visible: Vec<(LightCategory, usize)>,
    /// Lights dropped because their category was full.
    pub dropped: usize,
    /// Shadow maps re-rendered.
    pub processed: usize,
    /// Queue length before the shadow pass.
    pub queued_at_start: usize,
    /// Queue length after the shadow pass.
    pub queued_remaining: usize,
    /// Registered shadow sources.
    pub shadow_sources: usize,
    /// The re-rendered uids, empty for budgets above eight.
    pub last_uids: Vec<ShadowSourceId>,
    /// Free atlas tiles.
    pub free_tiles: usize,
    /// Total atlas tiles.
    pub total_tiles: usize,
}

impl LightingStats {
    /// Visible lights of one category.
    pub fn visible_count(&self, category: LightCategory) -> usize {
        self.visible
            .iter()
            .find(|(c, _)| *c == category)
            .map_or(0, |(_, count)| *count)
    }

    /// Visible lights over all categories.
    pub fn total_visible(&self) -> usize {
        self.visible.iter().map(|(_, count)| count).sum()
    }

    fn write_counts(&self, f: &mut fmt::Formatter<'_>, shadowed: bool) -> fmt::Result {
        for (i, kind) in LightKind::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, " / ")?;
            }
            let name = kind.type_name().trim_end_matches("Light");
            let count = self.visible_count(LightCategory::new(*kind, shadowed));
            write!(f, "{name}:{count}")?;
        }
        Ok(())
    }
}

impl fmt::Display for LightingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lights: ")?;
        self.write_counts(f, false)?;
        write!(f, " Shadowed: ")?;
        self.write_counts(f, true)?;
        writeln!(f)?;

        let last: Vec<String> = self.last_uids.iter().map(ToString::to_string).collect();
        write!(
            f,
            "Queued Updates: {}/{}/{}, Last: [{}], Free Tiles: {}/{}",
            self.processed,
            self.queued_at_start,
            self.shadow_sources,
            last.join(" "),
            self.free_tiles,
            self.total_tiles
        )
    }
}
