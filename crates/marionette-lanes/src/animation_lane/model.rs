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

//! Model definitions shared by every instance of an animator.
//!
//! Loading models from files is out of scope; a [`Model`] is assembled by the
//! caller from GPU buffers that already exist.

use super::backend::BackendKind;
use super::skeletal::{check_parent, Bone, Clip};
use marionette_core::renderer::api::{
    BindGroupProvider, ComputeProgram, MeshBuffers, PipelineDescriptor, PipelineKey, PipelineKind,
    ShaderLayout,
};
use marionette_core::AnimationError;
use std::ops::Range;
use thiserror::Error;

/// A model that cannot be animated or drawn as described.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    /// The model has nothing to draw.
    #[error("model '{model}' has no materials")]
    NoMaterials {
        /// The model name.
        model: String,
    },
    /// A material draws past the end of the index buffer.
    #[error("material '{material}' draws indices {start}..{end} but the mesh has {index_count}")]
    IndexRange {
        /// The material name.
        material: String,
        /// First index.
        start: u32,
        /// One past the last index.
        end: u32,
        /// Indices in the mesh.
        index_count: u32,
    },
    /// The skeleton or clips were rejected by the backend.
    #[error(transparent)]
    Animation(#[from] AnimationError),
}

/// A draw surface of a model.
#[derive(Debug, Clone)]
pub struct Material {
    /// Material name.
    pub name: String,
    /// Registered render pipeline.
    pub pipeline: PipelineKey,
    /// Binding metadata of the pipeline's shader.
    pub layout: ShaderLayout,
    /// Material parameters, bound under
    /// [`BindingRole::Material`](marionette_core::renderer::api::BindingRole::Material).
    pub provider: BindGroupProvider,
    /// Indices drawn by this material; the whole mesh when `None`.
    pub index_range: Option<Range<u32>>,
}

impl Material {
    /// The indices this material draws from `mesh`.
    pub fn indices(&self, mesh: &MeshBuffers) -> Range<u32> {
        self.index_range.clone().unwrap_or(0..mesh.index_count)
    }
}

/// Everything shared by the instances of one animator.
#[derive(Debug, Clone)]
pub struct Model {
    /// Unique model name; objects with the same model share an animator.
    pub name: String,
    /// Geometry.
    pub mesh: MeshBuffers,
    /// Draw surfaces.
    pub materials: Vec<Material>,
    /// Bones, parents first. Empty for rigid models.
    pub skeleton: Vec<Bone>,
    /// Animation clips.
    pub clips: Vec<Clip>,
    /// Bounding-sphere radius of one instance.
    pub bounding_radius: f32,
    /// The animator compute program.
    pub compute: Option<ComputeProgram>,
    /// Optional per-model effect parameters.
    pub effect: Option<BindGroupProvider>,
}

impl Model {
    /// Skinned models run the skeletal backend.
    pub fn backend_kind(&self) -> BackendKind {
        if self.skeleton.is_empty() && self.clips.is_empty() {
            BackendKind::Simple
        } else {
            BackendKind::Skeletal
        }
    }

    /// Checks materials and skeleton ordering.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.materials.is_empty() {
            return Err(ModelError::NoMaterials {
                model: self.name.clone(),
            });
        }
        for material in &self.materials {
            let range = material.indices(&self.mesh);
            if range.end > self.mesh.index_count || range.start > range.end {
                return Err(ModelError::IndexRange {
                    material: material.name.clone(),
                    start: range.start,
                    end: range.end,
                    index_count: self.mesh.index_count,
                });
            }
        }
        for (index, bone) in self.skeleton.iter().enumerate() {
            check_parent(index, bone.parent)?;
        }
        Ok(())
    }

    /// Descriptors for every pipeline the model draws or dispatches with.
    pub fn pipeline_descriptors(&self) -> Vec<PipelineDescriptor> {
        let mut descriptors: Vec<PipelineDescriptor> = self
            .materials
            .iter()
            .map(|m| {
                PipelineDescriptor::new(m.pipeline.clone(), PipelineKind::Render, m.layout.clone())
            })
            .collect();
        if let Some(compute) = &self.compute {
            descriptors.push(PipelineDescriptor::new(
                compute.pipeline.clone(),
                PipelineKind::Compute,
                compute.layout.clone(),
            ));
        }
        descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marionette_core::renderer::api::BufferId;

    fn model() -> Model {
        Model {
            name: "crate".into(),
            mesh: MeshBuffers {
                vertex: BufferId(0),
                index: BufferId(1),
                index_count: 36,
            },
            materials: vec![Material {
                name: "wood".into(),
                pipeline: PipelineKey::new("lit"),
                layout: ShaderLayout::default(),
                provider: BindGroupProvider::new("wood"),
                index_range: None,
            }],
            skeleton: Vec::new(),
            clips: Vec::new(),
            bounding_radius: 1.0,
            compute: None,
            effect: None,
        }
    }

    #[test]
    fn rigid_model_is_simple() {
        let model = model();
        assert_eq!(model.backend_kind(), BackendKind::Simple);
        assert!(model.validate().is_ok());
        assert_eq!(model.materials[0].indices(&model.mesh), 0..36);
    }

    #[test]
    fn index_range_past_mesh_is_rejected() {
        let mut model = model();
        model.materials[0].index_range = Some(30..40);
        assert!(matches!(
            model.validate(),
            Err(ModelError::IndexRange { end: 40, .. })
        ));
    }

    #[test]
    fn skeleton_order_is_checked() {
        let mut model = model();
        model.skeleton = vec![Bone {
            parent: 0,
            ..Default::default()
        }];
        assert_eq!(model.backend_kind(), BackendKind::Skeletal);
        assert_eq!(
            model.validate(),
            Err(ModelError::Animation(AnimationError::BoneOrder { bone: 0, parent: 0 }))
        );
    }
}
