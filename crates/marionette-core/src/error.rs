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

//! Defines the hierarchy of error types shared by the workspace.
//!
//! - [`ConfigError`]: a required collaborator is missing. These are programmer
//!   errors surfaced at construction or attach time.
//! - [`ResourceError`]: a GPU buffer, texture or bind group could not be created
//!   or addressed. Fatal for the operation that triggered it.
//! - [`RenderError`]: a frame-level operation failed at the GPU layer.
//! - [`AnimationError`]: an animator operation was rejected.

use crate::renderer::api::{BindingRole, BufferId};
use std::fmt;

/// An error related to the creation or use of a GPU resource (buffers, textures, etc.).
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// A generic resource could not be found.
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
    /// A write fell outside the bounds of the target buffer.
    OutOfBounds {
        /// The buffer that was written.
        buffer: BufferId,
        /// Byte offset of the write.
        offset: u64,
        /// Length of the write in bytes.
        len: u64,
        /// Size of the buffer in bytes.
        size: u64,
    },
    /// A layout entry requires a resource the provider cannot create on its own
    /// (textures and samplers must be supplied by their owner).
    MissingBinding(BindingRole),
    /// No pipeline was registered under the given key.
    PipelineNotRegistered(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds {
                buffer,
                offset,
                len,
                size,
            } => write!(
                f,
                "Write of {len} bytes at offset {offset} exceeds {buffer:?} of {size} bytes."
            ),
            ResourceError::MissingBinding(role) => {
                write!(f, "No resource supplied for binding role {role:?}.")
            }
            ResourceError::PipelineNotRegistered(key) => {
                write!(f, "Pipeline '{key}' is not registered.")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// A high-level error that can occur while recording or submitting a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// An operation was attempted before the backend was initialized.
    NotInitialized,
    /// A draw or dispatch was rejected by the backend.
    RenderingFailed(String),
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// The graphics device was lost and needs to be reinitialized.
    DeviceLost,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotInitialized => {
                write!(f, "The rendering backend is not initialized.")
            }
            RenderError::RenderingFailed(msg) => {
                write!(f, "A rendering operation failed: {msg}")
            }
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::DeviceLost => write!(
                f,
                "The graphics device was lost and needs to be reinitialized."
            ),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

/// A required collaborator or setting is missing or malformed.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The scene was built without a GPU backend.
    MissingBackend,
    /// The scene was built without a camera.
    MissingCamera,
    /// An object was added without a model.
    MissingModel {
        /// The label given to the object, if any.
        label: String,
    },
    /// A model declares no compute program for its animator.
    MissingComputeProgram {
        /// The model name.
        model: String,
    },
    /// A settings document could not be parsed.
    InvalidSettings(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingBackend => write!(f, "Scene has no GPU backend."),
            ConfigError::MissingCamera => write!(f, "Scene has no camera."),
            ConfigError::MissingModel { label } => {
                write!(f, "Object '{label}' was added without a model.")
            }
            ConfigError::MissingComputeProgram { model } => {
                write!(f, "Model '{model}' has no compute program.")
            }
            ConfigError::InvalidSettings(msg) => write!(f, "Invalid settings: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// An error returned by animator operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    /// The backend does not provide this capability.
    Unsupported {
        /// Strategy name of the backend.
        backend: &'static str,
        /// The rejected operation.
        operation: &'static str,
    },
    /// The instance index is not an active slot.
    InstanceOutOfRange {
        /// The requested index.
        index: u32,
        /// The number of active instances.
        count: u32,
    },
    /// The bone index is outside the bone array.
    BoneOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of bones.
        count: usize,
    },
    /// A bone's parent does not precede it.
    BoneOrder {
        /// The bone being set.
        bone: usize,
        /// Its declared parent.
        parent: i32,
    },
    /// The clip index does not name a stored clip.
    UnknownClip {
        /// The requested clip.
        clip: u32,
        /// The number of stored clips.
        count: u32,
    },
}

impl fmt::Display for AnimationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimationError::Unsupported { backend, operation } => {
                write!(f, "'{operation}' is not supported by the {backend} backend")
            }
            AnimationError::InstanceOutOfRange { index, count } => {
                write!(f, "Instance {index} is out of range (count {count})")
            }
            AnimationError::BoneOutOfRange { index, count } => {
                write!(f, "Bone {index} is out of range (count {count})")
            }
            AnimationError::BoneOrder { bone, parent } => {
                write!(f, "Bone {bone} has parent {parent}; parents must precede children")
            }
            AnimationError::UnknownClip { clip, count } => {
                write!(f, "Clip {clip} does not exist ({count} clips stored)")
            }
        }
    }
}

impl std::error::Error for AnimationError {}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn render_error_wraps_resource_error() {
        let res_err = ResourceError::MissingBinding(BindingRole::ShadowMap);
        let render_err: RenderError = res_err.into();
        assert_eq!(
            format!("{render_err}"),
            "Graphics resource operation failed: No resource supplied for binding role ShadowMap."
        );
        assert!(render_err.source().is_some());
    }

    #[test]
    fn unsupported_names_backend_and_operation() {
        let err = AnimationError::Unsupported {
            backend: "SimpleTransform",
            operation: "set_bone",
        };
        assert_eq!(
            err.to_string(),
            "'set_bone' is not supported by the SimpleTransform backend"
        );
    }

    #[test]
    fn out_of_bounds_display() {
        let err = ResourceError::OutOfBounds {
            buffer: BufferId(3),
            offset: 64,
            len: 32,
            size: 80,
        };
        assert_eq!(
            err.to_string(),
            "Write of 32 bytes at offset 64 exceeds BufferId(3) of 80 bytes."
        );
    }
}
