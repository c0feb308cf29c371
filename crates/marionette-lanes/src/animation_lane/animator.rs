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

use super::backend::{Backend, BackendKind};
use super::model::{Model, ModelError};
use marionette_core::animation::{AnimationBackend, FlushSlots, SwapRemove};
use marionette_core::frustum::Plane;
use marionette_core::renderer::api::{BindGroupProvider, BindingRole, BufferWrite};
use marionette_core::AnimationError;
use std::sync::Arc;

/// Explicit configuration for [`Animator::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatorDesc {
    /// Backend to run.
    pub kind: BackendKind,
    /// Initial slot capacity.
    pub initial_capacity: u32,
    /// Bounding-sphere radius of one instance.
    pub bounding_radius: f32,
}

impl AnimatorDesc {
    /// The description matching `model`.
    pub fn for_model(model: &Model, initial_capacity: u32) -> Self {
        Self {
            kind: model.backend_kind(),
            initial_capacity,
            bounding_radius: model.bounding_radius,
        }
    }
}

/// Binds a [`Backend`] to the [`Model`] its instances draw.
#[derive(Debug)]
pub struct Animator {
    model: Arc<Model>,
    backend: Backend,
}

impl Animator {
    /// Creates an animator and uploads the model's skeleton and clips into its backend.
    pub fn new(model: Arc<Model>, desc: &AnimatorDesc) -> Result<Self, ModelError> {
        model.validate()?;
        let backend = Backend::new(desc.kind, desc.initial_capacity);
        backend.set_bounding_radius(desc.bounding_radius);

        if desc.kind == BackendKind::Skeletal {
            backend.set_bone_count(model.skeleton.len())?;
            for (index, bone) in model.skeleton.iter().enumerate() {
                backend.set_bone(index, *bone)?;
            }
            for clip in &model.clips {
                backend.add_clip(clip)?;
            }
        }

        log::info!(
            "Animator '{}' created with the {} backend ({} slots)",
            model.name,
            backend.strategy_name(),
            desc.initial_capacity
        );
        Ok(Self { model, backend })
    }

    /// The model drawn by every instance.
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// The model name.
    pub fn name(&self) -> &str {
        &self.model.name
    }

    /// The backend, for transform and playback control.
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Claims a new instance slot.
    pub fn add_instance(&self) -> u32 {
        self.backend.add_instance()
    }

    /// Swap-removes an instance slot.
    pub fn remove_instance(&self, index: u32) -> Result<SwapRemove, AnimationError> {
        self.backend.remove_instance(index)
    }

    /// Number of active instances.
    pub fn instance_count(&self) -> u32 {
        self.backend.instance_count()
    }

    /// Per-frame CPU preparation against the animator's compute provider.
    ///
    /// Pushes the frustum planes when given, stages the frame uniform, then
    /// flushes dirty state into the provider's buffers. Returns the number of
    /// writes the flush staged.
    pub fn prepare(
        &self,
        delta_time: f32,
        compute: &BindGroupProvider,
        planes: Option<&[Plane; 6]>,
    ) -> usize {
        if let Some(planes) = planes {
            self.backend.set_frustum_planes(planes);
        }
        self.backend
            .prepare_frame(delta_time, compute.buffer(BindingRole::AnimatorUniform));
        self.backend.flush(&FlushSlots::from_provider(compute))
    }

    /// Stages the indirect-args reset, then drains every staged write.
    pub fn collect_writes(&self, compute: &BindGroupProvider) -> Vec<BufferWrite> {
        self.backend.reset_indirect_args(
            self.model.mesh.index_count,
            compute.buffer(BindingRole::IndirectArgs),
        );
        self.backend.staged_write_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation_lane::model::Material;
    use crate::animation_lane::skeletal::{Bone, Channel, Clip};
    use marionette_core::math::Vec4;
    use marionette_core::renderer::api::{BufferId, MeshBuffers, PipelineKey, ShaderLayout};

    fn model(skinned: bool) -> Arc<Model> {
        Arc::new(Model {
            name: if skinned { "hero" } else { "crate" }.into(),
            mesh: MeshBuffers {
                vertex: BufferId(0),
                index: BufferId(1),
                index_count: 6,
            },
            materials: vec![Material {
                name: "base".into(),
                pipeline: PipelineKey::new("lit"),
                layout: ShaderLayout::default(),
                provider: BindGroupProvider::new("base"),
                index_range: None,
            }],
            skeleton: if skinned {
                vec![Bone::default(), Bone {
                    parent: 0,
                    ..Default::default()
                }]
            } else {
                Vec::new()
            },
            clips: if skinned {
                vec![Clip {
                    name: "idle".into(),
                    duration_ticks: 25.0,
                    ticks_per_second: 25.0,
                    channels: vec![Channel::default()],
                }]
            } else {
                Vec::new()
            },
            bounding_radius: 2.0,
            compute: None,
            effect: None,
        })
    }

    fn compute_provider() -> BindGroupProvider {
        let mut provider = BindGroupProvider::new("compute");
        provider.insert_owned_buffer(0, BindingRole::AnimatorUniform, BufferId(10));
        provider.insert_owned_buffer(1, BindingRole::InstanceData, BufferId(11));
        provider.insert_owned_buffer(2, BindingRole::IndirectArgs, BufferId(12));
        provider
    }

    #[test]
    fn skeletal_model_loads_skeleton_and_clips() {
        let model = model(true);
        let animator = Animator::new(model.clone(), &AnimatorDesc::for_model(&model, 8)).unwrap();
        assert_eq!(animator.backend().kind(), BackendKind::Skeletal);
        assert_eq!(animator.backend().current_clip(0).ok(), None);
        let index = animator.add_instance();
        assert_eq!(animator.backend().current_clip(index), Ok(0));
        assert!(animator.backend().needs_rebuild());
    }

    #[test]
    fn prepare_uses_provider_roles() {
        let model = model(false);
        let animator = Animator::new(model.clone(), &AnimatorDesc::for_model(&model, 8)).unwrap();
        animator.add_instance();
        let provider = compute_provider();

        let planes = [Plane::from_coefficients(Vec4::Y); 6];
        assert_eq!(animator.prepare(0.016, &provider, Some(&planes)), 1);
        let writes = animator.collect_writes(&provider);
        let targets: Vec<BufferId> = writes.iter().map(|w| w.buffer).collect();
        assert_eq!(targets, vec![BufferId(10), BufferId(11), BufferId(12)]);
    }

    #[test]
    fn no_indirect_reset_without_planes() {
        let model = model(false);
        let animator = Animator::new(model.clone(), &AnimatorDesc::for_model(&model, 8)).unwrap();
        animator.add_instance();
        let provider = compute_provider();
        animator.prepare(0.016, &provider, None);
        let writes = animator.collect_writes(&provider);
        assert!(writes.iter().all(|w| w.buffer != BufferId(12)));
    }
}
