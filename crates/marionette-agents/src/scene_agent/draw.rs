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

//! Main-pass draw resolution.

use super::error::{DrawFailure, SceneError};
use super::resources::SceneResources;
use super::scene::{AnimatorSlot, Scene};
use marionette_core::animation::AnimationBackend;
use marionette_core::renderer::api::{
    BindGroupId, BindGroupProvider, BindingRole, DrawCall, ShaderLayout,
};

/// Resolves every group of `layout` to a bound provider, by the role of the
/// group's first entry.
///
/// Returns `Err(role)` with the first role that has no provider, or whose
/// provider does not carry every role the group declares.
pub(super) fn resolve_bind_groups(
    layout: &ShaderLayout,
    resources: &SceneResources,
    slot: &AnimatorSlot,
    material: usize,
) -> Result<Vec<(u32, BindGroupId)>, BindingRole> {
    let mut groups = Vec::with_capacity(layout.groups.len());
    for group in &layout.groups {
        let Some(role) = group.primary_role() else {
            continue;
        };
        let provider: Option<&BindGroupProvider> = match role {
            BindingRole::Material => slot.materials.get(material).map(|m| &m.provider),
            BindingRole::Effect => slot.effect.as_ref().map(|e| &e.provider),
            BindingRole::AnimatorOutput => Some(&slot.instances),
            other => resources.provider_for(other),
        };
        let bind_group = provider
            .filter(|p| p.covers(group))
            .and_then(BindGroupProvider::bind_group)
            .ok_or(role)?;
        groups.push((group.group, bind_group));
    }
    Ok(groups)
}

impl Scene {
    /// Phase 7: one draw per material of every animator with instances,
    /// then end of frame and present.
    ///
    /// A material whose groups cannot all be resolved is skipped with a
    /// warning. Draws the backend rejects are collected into
    /// [`SceneError::DrawFailures`] once the frame has been presented.
    pub fn draw_calls(&self) -> Result<(), SceneError> {
        let state = self.state.read();
        let mut failures = Vec::new();
        let (mut issued, mut skipped) = (0, 0);

        self.backend.begin_frame()?;
        for slot in state.animators.iter().filter(|s| s.animator.instance_count() > 0) {
            let model = slot.animator.model();
            let instance_count = slot.animator.instance_count();
            let indirect = slot
                .animator
                .backend()
                .indirect_buffer(slot.compute.buffer(BindingRole::IndirectArgs));

            for (index, material) in model.materials.iter().enumerate() {
                let bind_groups =
                    match resolve_bind_groups(&material.layout, &state.resources, slot, index) {
                        Ok(groups) => groups,
                        Err(role) => {
                            log::warn!(
                                "Scene: skipping '{}/{}', no provider for {role:?}",
                                model.name,
                                material.name
                            );
                            skipped += 1;
                            continue;
                        }
                    };
                let call = DrawCall {
                    pipeline: material.pipeline.clone(),
                    mesh: model.mesh,
                    index_range: material.indices(&model.mesh),
                    bind_groups,
                    instance_count,
                };
                let result = match indirect {
                    Some(buffer) => self.backend.draw_call_indirect(&call, buffer),
                    None => self.backend.draw_call(&call),
                };
                match result {
                    Ok(()) => issued += 1,
                    Err(error) => {
                        log::error!(
                            "Scene: draw of '{}/{}' failed: {error}",
                            model.name,
                            material.name
                        );
                        failures.push(DrawFailure {
                            model: model.name.clone(),
                            material: material.name.clone(),
                            error,
                        });
                    }
                }
            }
        }
        self.backend.end_frame()?;
        self.backend.present()?;

        {
            let mut stats = self.stats.lock();
            stats.draws_issued = issued;
            stats.draws_skipped = skipped;
            stats.draws_failed = failures.len() as u32;
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(SceneError::DrawFailures(failures))
        }
    }
}
