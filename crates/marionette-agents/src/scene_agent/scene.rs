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

use super::builder::SceneBuilder;
use super::error::SceneError;
use super::handle::ObjectHandle;
use super::layouts;
use super::lighting;
use super::resources::{required_buffer, SceneResources};
use super::stats::FrameStats;
use super::worker_pool::WorkerPool;
use marionette_core::animation::AnimationBackend;
use marionette_core::math::{Quat, Vec3};
use marionette_core::renderer::api::{
    BindGroupLayoutDescriptor, BindGroupProvider, BindingResource, BindingRole, BufferId,
    ComputeProgram,
};
use marionette_core::renderer::light::Light;
use marionette_core::renderer::{GpuBackend, SizeOverrides, UsageOverrides};
use marionette_core::{
    AnimationError, Camera, ConfigError, IdGenerator, LightId, ObjectId, ResourceError,
    SceneSettings,
};
use marionette_lanes::{Animator, AnimatorDesc, Backend, Model};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Key of the depth-only pipeline registered by every scene.
pub const SHADOW_PIPELINE: &str = "shadow_depth";

/// Key of the Forward+ light culling pipeline registered by every scene.
pub const LIGHT_CULL_PIPELINE: &str = "forward_plus_light_cull";

/// Describes an object to add to a [`Scene`].
#[derive(Debug, Clone)]
pub struct ObjectDesc {
    /// Label used in logs and errors.
    pub label: String,
    /// The model to draw. Required.
    pub model: Option<Arc<Model>>,
    /// World position.
    pub position: Vec3,
    /// Orientation.
    pub rotation: Quat,
    /// Scale.
    pub scale: Vec3,
    /// Angular velocity in radians per second, integrated on the GPU. Rigid models only.
    pub rotation_speed: Vec3,
    /// Clip to start looping. Skinned models only.
    pub clip: Option<u32>,
}

impl Default for ObjectDesc {
    fn default() -> Self {
        Self {
            label: String::new(),
            model: None,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            rotation_speed: Vec3::ZERO,
            clip: None,
        }
    }
}

impl ObjectDesc {
    /// An object drawing `model` at the origin.
    pub fn new(label: impl Into<String>, model: Arc<Model>) -> Self {
        Self {
            label: label.into(),
            model: Some(model),
            ..Default::default()
        }
    }

    /// Places the object at `position`.
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Spins the object with angular velocity `speed`.
    pub fn spinning(mut self, speed: Vec3) -> Self {
        self.rotation_speed = speed;
        self
    }

    /// Starts looping `clip`.
    pub fn playing(mut self, clip: u32) -> Self {
        self.clip = Some(clip);
        self
    }
}

/// Where an object currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Name of the model, which is also the animator name.
    pub model: String,
    /// Current instance slot. Changes when another object of the same model is removed.
    pub index: u32,
}

/// A copy of a caller-supplied provider, initialised by the scene if the
/// caller left it unbound. Only what the scene created is released.
#[derive(Debug)]
pub(super) struct LocalProvider {
    pub provider: BindGroupProvider,
    created: Vec<BufferId>,
    bound_here: bool,
}

impl LocalProvider {
    fn init(
        backend: &dyn GpuBackend,
        source: &BindGroupProvider,
        layout: Option<&BindGroupLayoutDescriptor>,
    ) -> Result<Self, ResourceError> {
        let mut provider = source.clone();
        let mut created = Vec::new();
        let mut bound_here = false;

        if let (None, Some(layout)) = (provider.bind_group(), layout) {
            let before: Vec<BindingResource> =
                provider.entries().iter().map(|e| e.resource).collect();
            let result = backend.init_bind_group(
                &mut provider,
                layout,
                &UsageOverrides::new(),
                &SizeOverrides::new(),
            );
            created = provider
                .entries()
                .iter()
                .filter(|e| !before.contains(&e.resource))
                .filter_map(|e| match e.resource {
                    BindingResource::Buffer(id) => Some(id),
                    _ => None,
                })
                .collect();
            if let Err(e) = result {
                // buffers made before the failing entry belong to nobody else
                for buffer in created {
                    backend.destroy_buffer(buffer)?;
                }
                return Err(e);
            }
            bound_here = true;
        }
        Ok(Self {
            provider,
            created,
            bound_here,
        })
    }

    fn release(&mut self, backend: &dyn GpuBackend) -> Result<(), ResourceError> {
        if self.bound_here {
            if let Some(id) = self.provider.take_bind_group() {
                backend.destroy_bind_group(id)?;
            }
        }
        for buffer in self.created.drain(..) {
            backend.destroy_buffer(buffer)?;
        }
        Ok(())
    }
}

/// One animator and the bind groups it draws and dispatches with.
#[derive(Debug)]
pub(super) struct AnimatorSlot {
    pub animator: Animator,
    pub program: ComputeProgram,
    // group 0 of the compute program
    pub compute_layout: BindGroupLayoutDescriptor,
    pub compute: BindGroupProvider,
    // shares the compute output
    pub instances: BindGroupProvider,
    pub materials: Vec<LocalProvider>,
    pub effect: Option<LocalProvider>,
    // owners[i] is the object in instance slot i
    pub owners: Vec<ObjectId>,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct ObjectSlot {
    pub animator: usize,
    pub index: u32,
}

/// Registries guarded by the scene lock.
#[derive(Debug)]
pub(super) struct SceneState {
    pub camera: Camera,
    pub animators: Vec<AnimatorSlot>,
    pub by_model: HashMap<String, usize>,
    pub objects: HashMap<ObjectId, ObjectSlot>,
    pub lights: Vec<(LightId, Light)>,
    pub ambient: Vec3,
    pub resources: SceneResources,
}

/// The frame orchestrator.
///
/// Objects sharing a model share one [`Animator`]. Structural operations
/// (`add`, `remove`, `clear`, lights, camera) take the write lock; the frame
/// phases take the read lock, so instance control through [`Scene::update`]
/// interleaves with a running frame while the backends serialize it.
#[derive(Debug)]
pub struct Scene {
    pub(super) backend: Arc<dyn GpuBackend>,
    pub(super) settings: SceneSettings,
    pub(super) ids: Arc<IdGenerator>,
    pub(super) pool: WorkerPool,
    pub(super) state: RwLock<SceneState>,
    pub(super) stats: Mutex<FrameStats>,
}

impl Scene {
    /// Starts building a scene.
    pub fn builder() -> SceneBuilder {
        SceneBuilder::new()
    }

    pub(super) fn from_parts(
        backend: Arc<dyn GpuBackend>,
        settings: SceneSettings,
        ids: Arc<IdGenerator>,
        camera: Camera,
    ) -> Result<Self, SceneError> {
        let pool = WorkerPool::new(settings.worker_threads)?;
        let resources = SceneResources::create(backend.as_ref(), &settings)?;
        let ambient = Vec3::from_array(settings.ambient);
        log::info!(
            "Scene built: culling {}, shadows {}",
            if settings.culling_enabled { "on" } else { "off" },
            if settings.shadows.enabled { "on" } else { "off" }
        );
        Ok(Self {
            backend,
            settings,
            ids,
            pool,
            state: RwLock::new(SceneState {
                camera,
                animators: Vec::new(),
                by_model: HashMap::new(),
                objects: HashMap::new(),
                lights: Vec::new(),
                ambient,
                resources,
            }),
            stats: Mutex::new(FrameStats::default()),
        })
    }

    /// The settings the scene was built with.
    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    /// The GPU backend.
    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    /// Number of prep workers.
    pub fn worker_threads(&self) -> usize {
        self.pool.threads()
    }

    /// Counters of the last frame.
    pub fn frame_stats(&self) -> FrameStats {
        *self.stats.lock()
    }

    /// Replaces the camera.
    pub fn set_camera(&self, camera: Camera) {
        self.state.write().camera = camera;
    }

    /// A copy of the camera.
    pub fn camera(&self) -> Camera {
        self.state.read().camera
    }

    /// Number of live objects.
    pub fn object_count(&self) -> usize {
        self.state.read().objects.len()
    }

    /// Number of animators, one per distinct model added since the last clear.
    pub fn animator_count(&self) -> usize {
        self.state.read().animators.len()
    }

    /// Adds an object, creating the animator of its model on first use.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingModel`] when `desc` has no model and
    /// [`ConfigError::MissingComputeProgram`] when the model has no compute
    /// program. Both are programming errors.
    pub fn add(&self, desc: ObjectDesc) -> Result<ObjectId, SceneError> {
        let model = desc.model.clone().ok_or_else(|| ConfigError::MissingModel {
            label: desc.label.clone(),
        })?;

        let mut state = self.state.write();
        let slot_index = match state.by_model.get(&model.name) {
            Some(&index) => index,
            None => {
                let slot = self.create_slot(Arc::clone(&model))?;
                state.animators.push(slot);
                let index = state.animators.len() - 1;
                state.by_model.insert(model.name.clone(), index);
                index
            }
        };

        let id = self.ids.next_object();
        let slot = &mut state.animators[slot_index];
        let index = slot.animator.add_instance();
        if let Err(e) = apply_desc(slot.animator.backend(), index, &desc) {
            // the new slot is the last one, so nothing moves
            slot.animator.remove_instance(index)?;
            return Err(e.into());
        }
        slot.owners.push(id);
        state.objects.insert(
            id,
            ObjectSlot {
                animator: slot_index,
                index,
            },
        );
        log::debug!("Scene: object {id} '{}' -> {}[{index}]", desc.label, model.name);
        Ok(id)
    }

    /// Where `id` lives, if it exists.
    pub fn get(&self, id: ObjectId) -> Option<ObjectInfo> {
        let state = self.state.read();
        let object = state.objects.get(&id)?;
        Some(ObjectInfo {
            model: state.animators[object.animator].animator.name().to_owned(),
            index: object.index,
        })
    }

    /// Runs `f` on the object's instance slot.
    ///
    /// Holds the read lock, so `f` must not call back into structural
    /// operations of this scene.
    pub fn update<R>(
        &self,
        id: ObjectId,
        f: impl FnOnce(ObjectHandle<'_>) -> R,
    ) -> Result<R, SceneError> {
        let state = self.state.read();
        let object = state.objects.get(&id).ok_or(SceneError::UnknownObject(id))?;
        let backend = state.animators[object.animator].animator.backend();
        Ok(f(ObjectHandle::new(backend, object.index)))
    }

    /// Removes an object. The object that owned the last slot of the same
    /// animator takes over the freed index.
    pub fn remove(&self, id: ObjectId) -> Result<(), SceneError> {
        let mut state = self.state.write();
        let object = *state.objects.get(&id).ok_or(SceneError::UnknownObject(id))?;

        let slot = &mut state.animators[object.animator];
        let removed = slot.animator.remove_instance(object.index)?;
        let index = object.index as usize;
        if index < slot.owners.len() {
            slot.owners.swap_remove(index);
        }
        let moved = if removed.did_swap {
            slot.owners.get(index).copied()
        } else {
            None
        };

        state.objects.remove(&id);
        if let Some(moved) = moved {
            if let Some(other) = state.objects.get_mut(&moved) {
                other.index = object.index;
            }
            log::trace!(
                "Scene: object {moved} moved from slot {} to {}",
                removed.swapped_from,
                object.index
            );
        }
        Ok(())
    }

    /// Removes every object and releases every animator's GPU resources.
    /// Lights and the camera are kept.
    pub fn clear(&self) -> Result<(), SceneError> {
        let mut state = self.state.write();
        let count = state.objects.len();
        state.objects.clear();
        state.by_model.clear();
        for mut slot in state.animators.drain(..) {
            self.release_slot(&mut slot)?;
        }
        log::info!("Scene cleared: {count} objects released");
        Ok(())
    }

    fn create_slot(&self, model: Arc<Model>) -> Result<AnimatorSlot, SceneError> {
        let missing = || ConfigError::MissingComputeProgram {
            model: model.name.clone(),
        };
        let program = model.compute.clone().ok_or_else(missing)?;
        let compute_layout = program.layout.groups.first().cloned().ok_or_else(missing)?;

        let animator = Animator::new(
            Arc::clone(&model),
            &AnimatorDesc::for_model(&model, self.settings.initial_animator_capacity),
        )?;
        self.backend.register_pipelines(&model.pipeline_descriptors())?;

        let mut slot = AnimatorSlot {
            animator,
            program,
            compute_layout,
            compute: BindGroupProvider::new(format!("{}::compute", model.name)),
            instances: BindGroupProvider::new(format!("{}::instances", model.name)),
            materials: Vec::with_capacity(model.materials.len()),
            effect: None,
            owners: Vec::new(),
        };
        if let Err(e) = self.init_slot(&model, &mut slot) {
            if let Err(release) = self.release_slot(&mut slot) {
                log::warn!("Scene: cleanup of animator '{}' failed: {release}", model.name);
            }
            return Err(e.into());
        }

        // buffers were sized from the backend's current capacities
        slot.animator.backend().clear_rebuild();
        log::info!(
            "Scene: animator '{}' registered ({} backend, {} materials)",
            model.name,
            slot.animator.backend().strategy_name(),
            model.materials.len()
        );
        Ok(slot)
    }

    /// Creates the GPU side of a fresh slot. Whatever was built before a
    /// failure stays recorded in `slot` so [`Self::release_slot`] can undo it.
    fn init_slot(&self, model: &Model, slot: &mut AnimatorSlot) -> Result<(), ResourceError> {
        self.init_compute(&slot.animator, &slot.compute_layout, &mut slot.compute)?;
        self.bind_instances(&slot.compute, &mut slot.instances)?;

        let backend = self.backend.as_ref();
        for material in &model.materials {
            let layout = material.layout.group_for(BindingRole::Material);
            slot.materials
                .push(LocalProvider::init(backend, &material.provider, layout)?);
        }
        let effect_layout = model
            .materials
            .iter()
            .find_map(|m| m.layout.group_for(BindingRole::Effect));
        if let Some(effect) = &model.effect {
            slot.effect = Some(LocalProvider::init(backend, effect, effect_layout)?);
        }
        Ok(())
    }

    fn init_compute(
        &self,
        animator: &Animator,
        layout: &BindGroupLayoutDescriptor,
        provider: &mut BindGroupProvider,
    ) -> Result<(), ResourceError> {
        let backend = animator.backend();
        let sizes: SizeOverrides = layout
            .entries
            .iter()
            .filter_map(|e| backend.buffer_size(e.role).map(|size| (e.role, size)))
            .collect();
        self.backend
            .init_bind_group(provider, layout, &UsageOverrides::new(), &sizes)?;
        Ok(())
    }

    fn bind_instances(
        &self,
        compute: &BindGroupProvider,
        instances: &mut BindGroupProvider,
    ) -> Result<(), ResourceError> {
        let output = required_buffer(compute, BindingRole::AnimatorOutput)?;
        instances.share_buffer(0, BindingRole::AnimatorOutput, output);
        self.backend.init_bind_group(
            instances,
            &layouts::instances(layouts::INSTANCE_GROUP),
            &UsageOverrides::new(),
            &SizeOverrides::new(),
        )?;
        Ok(())
    }

    fn release_slot(&self, slot: &mut AnimatorSlot) -> Result<(), ResourceError> {
        let backend = self.backend.as_ref();
        // the instance group only borrows the compute output
        backend.release_bind_group(&mut slot.instances)?;
        backend.release_bind_group(&mut slot.compute)?;
        for material in &mut slot.materials {
            material.release(backend)?;
        }
        if let Some(effect) = &mut slot.effect {
            effect.release(backend)?;
        }
        Ok(())
    }

    /// Recreates the compute buffers of every animator that outgrew them and
    /// re-points its instance group at the new output. Returns the number of
    /// animators rebuilt.
    fn rebuild_grown(&self) -> Result<u32, SceneError> {
        let pending = self
            .state
            .read()
            .animators
            .iter()
            .any(|s| s.animator.backend().needs_rebuild());
        if !pending {
            return Ok(0);
        }

        let mut state = self.state.write();
        let mut rebuilt = 0;
        for slot in &mut state.animators {
            if !slot.animator.backend().needs_rebuild() {
                continue;
            }
            let mut compute = BindGroupProvider::new(slot.compute.label());
            let mut instances = BindGroupProvider::new(slot.instances.label());
            let built = self
                .init_compute(&slot.animator, &slot.compute_layout, &mut compute)
                .and_then(|()| self.bind_instances(&compute, &mut instances));
            if let Err(e) = built {
                // the slot keeps its old buffers and stays pending
                self.backend.release_bind_group(&mut instances)?;
                self.backend.release_bind_group(&mut compute)?;
                return Err(e.into());
            }

            let mut old_instances = std::mem::replace(&mut slot.instances, instances);
            let mut old_compute = std::mem::replace(&mut slot.compute, compute);
            slot.animator.backend().clear_rebuild();
            self.backend.release_bind_group(&mut old_instances)?;
            self.backend.release_bind_group(&mut old_compute)?;
            log::info!(
                "Scene: rebuilt buffers of animator '{}' for {} instances",
                slot.animator.name(),
                slot.animator.backend().max_instances()
            );
            rebuilt += 1;
        }
        Ok(rebuilt)
    }

    /// Phases 1 to 4 of a frame: camera and light uniforms, parallel animator
    /// prep, one coalesced write submission and one compute dispatch per
    /// animator with instances.
    ///
    /// Animators that grew since the last frame get new buffers first.
    pub fn prepare_compute(&self, delta_time: f32) -> Result<(), SceneError> {
        let rebuilt = self.rebuild_grown()?;
        let state = self.state.read();

        let mut stats = FrameStats {
            frame_index: self.stats.lock().frame_index + 1,
            animators_rebuilt: rebuilt,
            ..Default::default()
        };

        let mut writes = lighting::frame_writes(&state, self.settings.max_lights)?;
        let planes = self
            .settings
            .culling_enabled
            .then(|| state.camera.frustum().planes);

        let active: Vec<&AnimatorSlot> = state
            .animators
            .iter()
            .filter(|s| s.animator.instance_count() > 0)
            .collect();
        let flushed = self.pool.scatter_gather(&active, |slot| {
            slot.animator
                .prepare(delta_time, &slot.compute, planes.as_ref())
        });
        for slot in &active {
            writes.extend(slot.animator.collect_writes(&slot.compute));
        }
        log::trace!(
            "Scene: {} animators prepared, {} flush runs, {} writes",
            active.len(),
            flushed.iter().sum::<usize>(),
            writes.len()
        );

        self.backend.write_buffers(&writes)?;
        stats.animators_prepared = active.len() as u32;
        stats.writes_submitted = writes.len() as u32;

        self.backend.begin_compute_frame()?;
        for slot in &active {
            let workgroups = slot.program.workgroups_for(slot.animator.instance_count());
            self.backend
                .dispatch_compute(&slot.program.pipeline, &slot.compute, workgroups)?;
            stats.dispatches += 1;
        }
        self.backend.end_compute_frame()?;

        *self.stats.lock() = stats;
        Ok(())
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        let animators = std::mem::take(&mut self.state.get_mut().animators);
        for mut slot in animators {
            if let Err(e) = self.release_slot(&mut slot) {
                log::warn!("Scene: failed to release animator '{}': {e}", slot.animator.name());
            }
        }
        let backend = Arc::clone(&self.backend);
        if let Err(e) = self.state.get_mut().resources.release(backend.as_ref()) {
            log::warn!("Scene: failed to release scene resources: {e}");
        }
    }
}

fn apply_desc(backend: &Backend, index: u32, desc: &ObjectDesc) -> Result<(), AnimationError> {
    backend.set_instance_transform(index, desc.position, desc.rotation, desc.scale)?;
    if desc.rotation_speed != Vec3::ZERO {
        backend.set_instance_rotation(index, desc.rotation, desc.rotation_speed)?;
    }
    if let Some(clip) = desc.clip {
        backend.play_animation(index, clip, true)?;
    }
    Ok(())
}
