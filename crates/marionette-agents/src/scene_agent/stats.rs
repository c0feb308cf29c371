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

/// Counters gathered while a frame runs through the scene phases.
///
/// Reset at the start of [`Scene::prepare_compute`](super::Scene::prepare_compute).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames started since the scene was built.
    pub frame_index: u64,
    /// Animators rebuilt after growing past their buffers.
    pub animators_rebuilt: u32,
    /// Animators that ran CPU prep this frame.
    pub animators_prepared: u32,
    /// Buffer writes in the coalesced submission.
    pub writes_submitted: u32,
    /// Compute dispatches, light culling included.
    pub dispatches: u32,
    /// Depth-only draws.
    pub shadow_draws: u32,
    /// Main-pass draws accepted by the backend.
    pub draws_issued: u32,
    /// Materials skipped because a binding role could not be resolved.
    pub draws_skipped: u32,
    /// Draws rejected by the backend.
    pub draws_failed: u32,
}
