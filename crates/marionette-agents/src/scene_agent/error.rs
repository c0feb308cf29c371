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

use marionette_core::{AnimationError, ConfigError, LightId, ObjectId, RenderError, ResourceError};
use marionette_lanes::ModelError;
use thiserror::Error;

/// A draw that was resolved and submitted but rejected by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawFailure {
    /// Model whose draw failed.
    pub model: String,
    /// Material of the failed draw.
    pub material: String,
    /// What the backend reported.
    pub error: RenderError,
}

/// Errors returned by scene operations.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The scene or an object was misconfigured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A GPU resource could not be created, written or released.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// A pass could not be opened, dispatched or closed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// An animator rejected an instance operation.
    #[error(transparent)]
    Animation(#[from] AnimationError),

    /// A model failed validation.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// No object is registered under this id.
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),

    /// No light is registered under this id.
    #[error("unknown light {0}")]
    UnknownLight(LightId),

    /// Some draws failed; the rest of the frame was still recorded.
    #[error("{} draw call(s) failed", .0.len())]
    DrawFailures(Vec<DrawFailure>),
}

impl SceneError {
    /// Returns `false` only for aggregated per-draw failures, which leave the
    /// frame usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SceneError::DrawFailures(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_draw_failures_are_recoverable() {
        let failures = SceneError::DrawFailures(vec![DrawFailure {
            model: "crate".into(),
            material: "wood".into(),
            error: RenderError::DeviceLost,
        }]);
        assert!(!failures.is_fatal());
        assert_eq!(failures.to_string(), "1 draw call(s) failed");

        assert!(SceneError::from(ConfigError::MissingCamera).is_fatal());
        assert!(SceneError::UnknownObject(ObjectId(3)).is_fatal());
    }
}
