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

//! Per-instance playback state machine.
//!
//! ```text
//! Idle/Playing --blend_to(target, d > 0)--> Blending
//! Blending --elapsed >= d--> Playing(target)
//! Blending --cancel--> Playing(current)
//! ```

use bytes::BufMut;
use marionette_core::renderer::layout::{put_padding, GpuRecord};

/// The observable phase of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Speed is zero; time does not advance.
    Idle,
    /// Advancing one clip.
    Playing,
    /// Cross-fading into another clip.
    Blending,
}

/// An in-progress cross-fade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blend {
    /// Clip being faded in.
    pub target: u32,
    /// Playback time of the target clip, in seconds.
    pub target_time: f32,
    /// Fade length in seconds.
    pub duration: f32,
    /// Seconds since the fade started.
    pub elapsed: f32,
}

impl Blend {
    /// Fade progress clamped to `[0, 1]`.
    pub fn progress(&self) -> f32 {
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }
}

/// CPU-side playback state of one instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    /// Current clip.
    pub clip: u32,
    /// Playback time of the current clip, in seconds.
    pub time: f32,
    /// Time multiplier; zero pauses.
    pub speed: f32,
    /// Whether the current clip wraps.
    pub looping: bool,
    /// Active cross-fade, if any.
    pub blend: Option<Blend>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            clip: 0,
            time: 0.0,
            speed: 1.0,
            looping: true,
            blend: None,
        }
    }
}

fn advance_time(time: f32, step: f32, duration: f32, looping: bool) -> f32 {
    if duration <= 0.0 {
        return 0.0;
    }
    let next = time + step;
    if looping {
        next.rem_euclid(duration)
    } else {
        next.clamp(0.0, duration)
    }
}

impl PlaybackState {
    /// The current phase.
    pub fn phase(&self) -> PlaybackPhase {
        if self.blend.is_some() {
            PlaybackPhase::Blending
        } else if self.speed == 0.0 {
            PlaybackPhase::Idle
        } else {
            PlaybackPhase::Playing
        }
    }

    /// Starts `clip` from the beginning, cancelling any fade.
    pub fn play(&mut self, clip: u32, looping: bool) {
        self.clip = clip;
        self.time = 0.0;
        self.looping = looping;
        self.blend = None;
    }

    /// Starts fading into `target` over `duration` seconds.
    ///
    /// A non-positive duration switches immediately.
    pub fn blend_to(&mut self, target: u32, duration: f32) {
        if duration <= 0.0 {
            self.play(target, self.looping);
            return;
        }
        self.blend = Some(Blend {
            target,
            target_time: 0.0,
            duration,
            elapsed: 0.0,
        });
    }

    /// Drops the fade and keeps playing the current clip.
    pub fn cancel_blend(&mut self) {
        self.blend = None;
    }

    /// Fade progress in `[0, 1]`, zero when not blending.
    pub fn blend_progress(&self) -> f32 {
        self.blend.map_or(0.0, |b| b.progress())
    }

    /// Advances by `delta_time` seconds. `duration_of` returns a clip's length in seconds.
    pub fn advance(&mut self, delta_time: f32, duration_of: impl Fn(u32) -> f32) {
        let step = delta_time * self.speed;
        self.time = advance_time(self.time, step, duration_of(self.clip), self.looping);

        let Some(blend) = self.blend.as_mut() else {
            return;
        };
        blend.target_time = advance_time(
            blend.target_time,
            step,
            duration_of(blend.target),
            self.looping,
        );
        blend.elapsed += delta_time;
        if blend.elapsed >= blend.duration {
            self.clip = blend.target;
            self.time = blend.target_time;
            self.blend = None;
        }
    }

    /// The GPU-facing record derived from this state.
    pub fn gpu_record(&self) -> SkeletalInstance {
        match self.blend {
            Some(blend) => SkeletalInstance {
                clip: self.clip,
                time: self.time,
                blend_weight: blend.progress(),
                secondary_clip: blend.target,
                secondary_time: blend.target_time,
            },
            None => SkeletalInstance {
                clip: self.clip,
                time: self.time,
                blend_weight: 0.0,
                secondary_clip: self.clip,
                secondary_time: self.time,
            },
        }
    }
}

/// Per-instance record read by the skeletal compute pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SkeletalInstance {
    /// Primary clip.
    pub clip: u32,
    /// Primary time in seconds.
    pub time: f32,
    /// Weight of the secondary clip, never above 1.
    pub blend_weight: f32,
    /// Clip being faded in.
    pub secondary_clip: u32,
    /// Time of the secondary clip in seconds.
    pub secondary_time: f32,
}

impl GpuRecord for SkeletalInstance {
    const SIZE: usize = 32;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.clip);
        buf.put_f32_le(self.time);
        buf.put_f32_le(self.blend_weight);
        buf.put_u32_le(self.secondary_clip);
        buf.put_f32_le(self.secondary_time);
        put_padding(buf, 3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_seconds(_: u32) -> f32 {
        2.0
    }

    #[test]
    fn looping_wraps() {
        let mut state = PlaybackState::default();
        state.advance(2.5, two_seconds);
        assert_relative_eq!(state.time, 0.5);
    }

    #[test]
    fn one_shot_clamps() {
        let mut state = PlaybackState::default();
        state.play(1, false);
        state.advance(3.0, two_seconds);
        assert_relative_eq!(state.time, 2.0);
    }

    #[test]
    fn zero_speed_is_idle() {
        let mut state = PlaybackState {
            speed: 0.0,
            ..Default::default()
        };
        assert_eq!(state.phase(), PlaybackPhase::Idle);
        state.advance(1.0, two_seconds);
        assert_eq!(state.time, 0.0);
    }

    #[test]
    fn blend_commits_to_target() {
        let mut state = PlaybackState::default();
        state.blend_to(3, 0.5);
        assert_eq!(state.phase(), PlaybackPhase::Blending);
        state.advance(0.25, two_seconds);
        assert_relative_eq!(state.blend_progress(), 0.5);
        let record = state.gpu_record();
        assert_eq!(record.secondary_clip, 3);
        assert_relative_eq!(record.blend_weight, 0.5);

        state.advance(0.25, two_seconds);
        assert_eq!(state.clip, 3);
        assert_relative_eq!(state.time, 0.5);
        assert_eq!(state.gpu_record().blend_weight, 0.0);
    }

    #[test]
    fn cancel_keeps_current_clip() {
        let mut state = PlaybackState::default();
        state.blend_to(2, 1.0);
        state.advance(0.5, two_seconds);
        state.cancel_blend();
        assert_eq!(state.clip, 0);
        assert_eq!(state.phase(), PlaybackPhase::Playing);
    }

    #[test]
    fn non_positive_blend_switches_immediately() {
        let mut state = PlaybackState::default();
        state.advance(0.3, two_seconds);
        state.blend_to(4, 0.0);
        assert_eq!(state.clip, 4);
        assert_eq!(state.time, 0.0);
        assert!(state.blend.is_none());
    }

    #[test]
    fn record_layout() {
        let record = SkeletalInstance {
            clip: 1,
            time: 0.5,
            blend_weight: 0.25,
            secondary_clip: 2,
            secondary_time: 0.75,
        };
        let bytes = record.to_bytes();
        assert_eq!(bytes.len(), 32);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 2);
    }
}
