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

use criterion::{criterion_group, criterion_main, Criterion};
use marionette_core::animation::{AnimationBackend, FlushSlots};
use marionette_core::math::{Quat, Vec3};
use marionette_core::renderer::api::BufferId;
use marionette_lanes::{Channel, Clip, SimpleBackend, SkeletalBackend};
use std::hint::black_box;

const INSTANCES: u32 = 10_000;

fn slots() -> FlushSlots {
    FlushSlots {
        instance: Some(BufferId(1)),
        bone: Some(BufferId(2)),
        model: Some(BufferId(3)),
        clips: Some(BufferId(4)),
    }
}

fn bench_simple_flush(c: &mut Criterion) {
    let backend = SimpleBackend::with_capacity(INSTANCES);
    for _ in 0..INSTANCES {
        backend.add_instance();
    }
    backend.flush(&slots());
    backend.staged_write_data();

    let mut group = c.benchmark_group("Simple flush");

    group.bench_function("Sparse (every 16th slot)", |b| {
        b.iter(|| {
            for i in (0..INSTANCES).step_by(16) {
                let _ = backend.set_instance_transform(i, Vec3::X, Quat::IDENTITY, Vec3::ONE);
            }
            black_box(backend.flush(&slots()));
            black_box(backend.staged_write_data());
        });
    });

    group.bench_function("Dense (all slots)", |b| {
        b.iter(|| {
            for i in 0..INSTANCES {
                let _ = backend.set_instance_transform(i, Vec3::Y, Quat::IDENTITY, Vec3::ONE);
            }
            black_box(backend.flush(&slots()));
            black_box(backend.staged_write_data());
        });
    });

    group.finish();
}

fn bench_skeletal_frame(c: &mut Criterion) {
    let backend = SkeletalBackend::with_capacity(INSTANCES);
    backend.add_clip(&Clip {
        name: "walk".into(),
        duration_ticks: 30.0,
        ticks_per_second: 30.0,
        channels: vec![Channel::default()],
    });
    for _ in 0..INSTANCES {
        backend.add_instance();
    }
    backend.clear_rebuild();

    c.bench_function("Skeletal prepare + flush", |b| {
        b.iter(|| {
            backend.prepare_frame(black_box(0.016), Some(BufferId(0)));
            black_box(backend.flush(&slots()));
            black_box(backend.staged_write_data());
        });
    });
}

criterion_group!(benches, bench_simple_flush, bench_skeletal_frame);
criterion_main!(benches);
