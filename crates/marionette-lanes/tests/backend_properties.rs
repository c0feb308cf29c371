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

//! Property tests for the instance lifecycle and dirty tracking of both backends.

use marionette_core::animation::{AnimationBackend, FlushSlots};
use marionette_core::math::{Quat, Vec3};
use marionette_core::renderer::api::BufferId;
use marionette_lanes::{Backend, BackendKind, Channel, Clip, SimpleBackend, SkeletalBackend};
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Op {
    Add,
    Remove(u32),
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![3 => Just(Op::Add), 2 => (0u32..64).prop_map(Op::Remove)],
        0..200,
    )
}

fn instance_slots() -> FlushSlots {
    FlushSlots {
        instance: Some(BufferId(1)),
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn count_tracks_adds_minus_removes(ops in ops(), skeletal in any::<bool>()) {
        let kind = if skeletal { BackendKind::Skeletal } else { BackendKind::Simple };
        let backend = Backend::new(kind, 4);
        let mut expected = 0u32;
        for op in ops {
            match op {
                Op::Add => {
                    prop_assert_eq!(backend.add_instance(), expected);
                    expected += 1;
                }
                Op::Remove(i) => {
                    let result = backend.remove_instance(i);
                    if i < expected {
                        let removed = result.unwrap();
                        prop_assert_eq!(removed.swapped_from, expected - 1);
                        prop_assert_eq!(removed.did_swap, i != expected - 1);
                        expected -= 1;
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
            }
            prop_assert_eq!(backend.instance_count(), expected);
            prop_assert!(backend.instance_count() <= backend.max_instances());
        }
    }

    #[test]
    fn swap_remove_moves_last_record(n in 2u32..40, pick in any::<prop::sample::Index>()) {
        let backend = SimpleBackend::with_capacity(8);
        for i in 0..n {
            backend.add_instance();
            backend
                .set_instance_transform(i, Vec3::splat(i as f32), Quat::IDENTITY, Vec3::ONE)
                .unwrap();
        }
        let victim = pick.index(n as usize) as u32;
        let last = backend.instance(n - 1).unwrap();
        backend.remove_instance(victim).unwrap();
        if victim != n - 1 {
            prop_assert_eq!(backend.instance(victim).unwrap(), last);
        }
        prop_assert!(backend.instance(n - 1).is_none());
    }

    #[test]
    fn flush_covers_exactly_the_mutated_slots(
        touched in prop::collection::btree_set(0u32..128, 0..40),
    ) {
        let backend = SimpleBackend::with_capacity(128);
        for _ in 0..128 {
            backend.add_instance();
        }
        backend.flush(&instance_slots());
        backend.staged_write_data();

        for &i in &touched {
            backend
                .set_instance_transform(i, Vec3::X, Quat::IDENTITY, Vec3::ONE)
                .unwrap();
        }
        let emitted = backend.flush(&instance_slots());
        let writes = backend.staged_write_data();
        prop_assert_eq!(emitted, writes.len());

        let mut covered = BTreeSet::new();
        for write in &writes {
            prop_assert_eq!(write.offset % 64, 0);
            prop_assert_eq!(write.data.len() % 64, 0);
            let start = (write.offset / 64) as u32;
            let len = (write.data.len() / 64) as u32;
            for i in start..start + len {
                prop_assert!(covered.insert(i), "slot {} written twice", i);
            }
        }
        prop_assert_eq!(&covered, &touched);

        // runs are maximal: no two writes touch
        let mut ends: Vec<(u64, u64)> =
            writes.iter().map(|w| (w.offset, w.end())).collect();
        ends.sort_unstable();
        for pair in ends.windows(2) {
            prop_assert!(pair[0].1 < pair[1].0);
        }
    }

    #[test]
    fn grow_preserves_records(n in 1u32..16) {
        let backend = SimpleBackend::with_capacity(n);
        for i in 0..n {
            backend.add_instance();
            backend
                .set_instance_transform(i, Vec3::splat(i as f32 + 0.5), Quat::IDENTITY, Vec3::ONE)
                .unwrap();
        }
        let before: Vec<_> = (0..n).map(|i| backend.instance(i).unwrap()).collect();
        backend.grow(2 * n);
        prop_assert!(backend.needs_rebuild());
        prop_assert_eq!(backend.max_instances(), 2 * n);
        let after: Vec<_> = (0..n).map(|i| backend.instance(i).unwrap()).collect();
        prop_assert_eq!(before, after);
        backend.clear_rebuild();
        prop_assert!(!backend.needs_rebuild());
    }
}

#[test]
fn blend_progress_is_monotonic_and_commits() {
    let backend = SkeletalBackend::with_capacity(8);
    for name in ["idle", "run"] {
        backend.add_clip(&Clip {
            name: name.into(),
            duration_ticks: 50.0,
            ticks_per_second: 25.0,
            channels: vec![Channel::default()],
        });
    }
    let index = backend.add_instance();
    backend.clear_rebuild();

    backend.blend_to_animation(index, 1, 1.0).unwrap();
    let mut last = backend.blend_progress(index).unwrap();
    let mut elapsed = 0.0f32;
    while backend.is_blending(index).unwrap() {
        backend.prepare_frame(0.1, None);
        elapsed += 0.1;
        let progress = backend.blend_progress(index).unwrap();
        if backend.is_blending(index).unwrap() {
            assert!(progress >= last, "{progress} < {last}");
            assert!(progress <= 1.0);
            last = progress;
        }
        assert!(elapsed < 2.0, "blend never committed");
    }
    assert!(elapsed >= 1.0 - 1e-4);
    assert_eq!(backend.current_clip(index).unwrap(), 1);
    assert_eq!(backend.blend_progress(index).unwrap(), 0.0);
}
