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

//! Error types of the lighting subsystem.

use super::shadow::ShadowSourceId;
use thiserror::Error;

/// A failed shadow atlas operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtlasError {
    /// The request can never be satisfied by this atlas.
    #[error("invalid atlas request of {tiles_w}x{tiles_h} tiles: {reason}")]
    InvalidRequest {
        /// Requested width in tiles.
        tiles_w: u32,
        /// Requested height in tiles.
        tiles_h: u32,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The source already owns a region.
    #[error("shadow source {0} already owns an atlas region")]
    AlreadyReserved(ShadowSourceId),
    /// No free block of the requested size exists right now.
    #[error("no free {tiles}x{tiles} tile block left in the shadow atlas")]
    NoSpace {
        /// Requested side length in tiles.
        tiles: u32,
    },
}

/// A failure reported by the render backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// The atlas render target could not be created.
    #[error("failed to create the shadow atlas target: {0}")]
    TargetCreation(String),
    /// A viewport or depth clearer index outside of what was created.
    #[error("viewport index {index} out of range (created {count})")]
    InvalidViewport {
        /// Offending index.
        index: usize,
        /// Number of viewports created.
        count: usize,
    },
    /// A shader input could not be written.
    #[error("failed to write shader input '{name}': {reason}")]
    InputWrite {
        /// Binding name.
        name: String,
        /// Backend-specific reason.
        reason: String,
    },
    /// Anything else.
    #[error("render backend error: {0}")]
    Other(String),
}

/// The error type of the light manager.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LightingError {
    /// The global light table is full.
    #[error("cannot register light: the light table is full ({capacity} lights)")]
    LightCapacityExceeded {
        /// Size of the light table.
        capacity: usize,
    },
    /// Registering the light's shadow sources would exceed the descriptor array.
    #[error(
        "cannot register light: {requested} more shadow sources exceed the limit of {capacity} ({registered} registered)"
    )]
    ShadowCapacityExceeded {
        /// Sources the light brings.
        requested: usize,
        /// Sources already registered.
        registered: usize,
        /// Maximum number of shadow maps.
        capacity: usize,
    },
    /// Not even a single tile is left for a queued shadow update.
    #[error(
        "shadow atlas exhausted: no tile left for source {uid} (requested {requested}px, {processed} updates done this frame)"
    )]
    AtlasExhausted {
        /// The source that could not be placed.
        uid: ShadowSourceId,
        /// Its resolution before degradation.
        requested: u32,
        /// Updates completed earlier in the same frame.
        processed: usize,
    },
    /// An atlas request was rejected outright.
    #[error(transparent)]
    Atlas(#[from] AtlasError),
    /// The render backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The settings are inconsistent.
    #[error("invalid lighting settings: {0}")]
    InvalidSettings(String),
    /// The operation is not supported yet.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LightingError::AtlasExhausted {
            uid: ShadowSourceId::from_raw(7),
            requested: 512,
            processed: 1,
        };
        assert!(err.to_string().contains("source 7"));
        assert_eq!(
            LightingError::NotImplemented("light removal").to_string(),
            "light removal is not implemented"
        );
        let wrapped: LightingError = BackendError::Other("lost device".into()).into();
        assert_eq!(wrapped.to_string(), "render backend error: lost device");
    }
}
