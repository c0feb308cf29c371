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

//! Animation clips and the packed clip buffer.
//!
//! The GPU reads every clip of a model from one buffer:
//!
//! ```text
//! [header 16B][clip headers 16B each][channel headers 32B each][keyframes 48B each]
//! ```
//!
//! The header stores the clip count and the byte offsets of the channel and
//! keyframe sections. Channel and keyframe offsets inside the records are
//! absolute element indices into their section. Adding a clip appends to all
//! three sections, so earlier offsets never move.

use bytes::BufMut;
use marionette_core::math::{Quat, Vec3, Vec4};
use marionette_core::renderer::layout::{put_padding, put_vec3, put_vec4, GpuRecord};

/// Ticks per second used when a clip declares zero.
pub const DEFAULT_TICKS_PER_SECOND: f32 = 25.0;

/// Keyframes of one bone inside a clip. Times are in ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel {
    /// Bone driven by this channel.
    pub bone: u32,
    /// `(time, translation)` keys.
    pub translations: Vec<(f32, Vec3)>,
    /// `(time, rotation)` keys.
    pub rotations: Vec<(f32, Quat)>,
    /// `(time, scale)` keys.
    pub scales: Vec<(f32, Vec3)>,
}

/// An animation clip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clip {
    /// Clip name.
    pub name: String,
    /// Length in ticks.
    pub duration_ticks: f32,
    /// Tick rate; zero selects [`DEFAULT_TICKS_PER_SECOND`].
    pub ticks_per_second: f32,
    /// Per-bone channels.
    pub channels: Vec<Channel>,
}

impl Clip {
    /// The effective tick rate.
    pub fn ticks_per_second(&self) -> f32 {
        if self.ticks_per_second > 0.0 {
            self.ticks_per_second
        } else {
            DEFAULT_TICKS_PER_SECOND
        }
    }

    /// Length in seconds.
    pub fn duration_seconds(&self) -> f32 {
        self.duration_ticks / self.ticks_per_second()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ClipHeader {
    duration_ticks: f32,
    ticks_per_second: f32,
    channel_offset: u32,
    channel_count: u32,
}

impl GpuRecord for ClipHeader {
    const SIZE: usize = 16;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_f32_le(self.duration_ticks);
        buf.put_f32_le(self.ticks_per_second);
        buf.put_u32_le(self.channel_offset);
        buf.put_u32_le(self.channel_count);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChannelHeader {
    bone: u32,
    translation: (u32, u32),
    rotation: (u32, u32),
    scale: (u32, u32),
}

impl GpuRecord for ChannelHeader {
    const SIZE: usize = 32;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.bone);
        for (offset, count) in [self.translation, self.rotation, self.scale] {
            buf.put_u32_le(offset);
            buf.put_u32_le(count);
        }
        put_padding(buf, 1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Keyframe {
    time: f32,
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
}

impl Keyframe {
    fn at(time: f32) -> Self {
        Self {
            time,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl GpuRecord for Keyframe {
    const SIZE: usize = 48;

    fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_f32_le(self.time);
        put_vec3(buf, self.translation);
        put_vec4(buf, Vec4::from(self.rotation));
        put_vec3(buf, self.scale);
        put_padding(buf, 1);
    }
}

const STORE_HEADER_SIZE: usize = 16;

/// Flattened storage of every clip of a model.
#[derive(Debug, Clone, Default)]
pub struct ClipStore {
    clips: Vec<ClipHeader>,
    channels: Vec<ChannelHeader>,
    keyframes: Vec<Keyframe>,
    durations: Vec<f32>,
}

impl ClipStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `clip` and returns its index.
    pub fn add(&mut self, clip: &Clip) -> u32 {
        let channel_offset = self.channels.len() as u32;
        for channel in &clip.channels {
            let translation = self.push_keys(channel.translations.iter().map(|(t, v)| Keyframe {
                translation: *v,
                ..Keyframe::at(*t)
            }));
            let rotation = self.push_keys(channel.rotations.iter().map(|(t, q)| Keyframe {
                rotation: *q,
                ..Keyframe::at(*t)
            }));
            let scale = self.push_keys(channel.scales.iter().map(|(t, s)| Keyframe {
                scale: *s,
                ..Keyframe::at(*t)
            }));
            self.channels.push(ChannelHeader {
                bone: channel.bone,
                translation,
                rotation,
                scale,
            });
        }
        self.clips.push(ClipHeader {
            duration_ticks: clip.duration_ticks,
            ticks_per_second: clip.ticks_per_second(),
            channel_offset,
            channel_count: clip.channels.len() as u32,
        });
        self.durations.push(clip.duration_seconds());
        (self.clips.len() - 1) as u32
    }

    fn push_keys(&mut self, keys: impl Iterator<Item = Keyframe>) -> (u32, u32) {
        let offset = self.keyframes.len() as u32;
        self.keyframes.extend(keys);
        (offset, self.keyframes.len() as u32 - offset)
    }

    /// Number of stored clips.
    pub fn len(&self) -> u32 {
        self.clips.len() as u32
    }

    /// Returns true if no clip is stored.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Length of a clip in seconds, zero for unknown clips.
    pub fn duration_seconds(&self, clip: u32) -> f32 {
        self.durations.get(clip as usize).copied().unwrap_or(0.0)
    }

    /// Byte offset of the channel section.
    pub fn channel_section_start(&self) -> u32 {
        (STORE_HEADER_SIZE + self.clips.len() * ClipHeader::SIZE) as u32
    }

    /// Byte offset of the keyframe section.
    pub fn keyframe_section_start(&self) -> u32 {
        self.channel_section_start() + (self.channels.len() * ChannelHeader::SIZE) as u32
    }

    /// Encoded length in bytes.
    pub fn byte_len(&self) -> usize {
        self.keyframe_section_start() as usize + self.keyframes.len() * Keyframe::SIZE
    }

    /// Encodes the whole store.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.byte_len());
        buf.put_u32_le(self.len());
        buf.put_u32_le(self.channel_section_start());
        buf.put_u32_le(self.keyframe_section_start());
        put_padding(&mut buf, 1);
        for clip in &self.clips {
            clip.encode(&mut buf);
        }
        for channel in &self.channels {
            channel.encode(&mut buf);
        }
        for key in &self.keyframes {
            key.encode(&mut buf);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn walk_clip(keys: usize) -> Clip {
        Clip {
            name: "walk".into(),
            duration_ticks: 50.0,
            ticks_per_second: 0.0,
            channels: vec![Channel {
                bone: 1,
                translations: (0..keys).map(|i| (i as f32, Vec3::X)).collect(),
                rotations: vec![(0.0, Quat::IDENTITY)],
                scales: Vec::new(),
            }],
        }
    }

    #[test]
    fn zero_tick_rate_falls_back() {
        let clip = walk_clip(1);
        assert_eq!(clip.ticks_per_second(), 25.0);
        assert_eq!(clip.duration_seconds(), 2.0);
    }

    #[test]
    fn sections_are_laid_out_in_order() {
        let mut store = ClipStore::new();
        assert_eq!(store.add(&walk_clip(2)), 0);
        assert_eq!(store.add(&walk_clip(3)), 1);

        let bytes = store.encode();
        assert_eq!(bytes.len(), store.byte_len());
        assert_eq!(u32_at(&bytes, 0), 2);
        assert_eq!(u32_at(&bytes, 4), 16 + 2 * 16);
        assert_eq!(u32_at(&bytes, 8), 16 + 2 * 16 + 2 * 32);
        assert_eq!(bytes.len(), 16 + 2 * 16 + 2 * 32 + (3 + 4) * 48);

        // second clip header: channel offset 1, count 1
        assert_eq!(u32_at(&bytes, 32 + 8), 1);
        assert_eq!(u32_at(&bytes, 32 + 12), 1);

        // second channel: translations start after the first clip's 3 keys
        let channel = 48 + 32;
        assert_eq!(u32_at(&bytes, channel), 1);
        assert_eq!(u32_at(&bytes, channel + 4), 3);
        assert_eq!(u32_at(&bytes, channel + 8), 3);
        assert_eq!(u32_at(&bytes, channel + 12), 6);
        assert_eq!(u32_at(&bytes, channel + 16), 1);
    }

    #[test]
    fn appending_keeps_earlier_offsets() {
        let mut store = ClipStore::new();
        store.add(&walk_clip(2));
        let before = store.encode();
        store.add(&walk_clip(2));
        let after = store.encode();
        // first clip header is unchanged
        assert_eq!(before[16..32], after[16..32]);
        assert_eq!(store.duration_seconds(1), 2.0);
        assert_eq!(store.duration_seconds(9), 0.0);
    }
}
