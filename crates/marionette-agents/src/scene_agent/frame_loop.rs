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

use super::error::{DrawFailure, SceneError};
use super::scene::Scene;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What one tick of the [`FrameLoop`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Every phase succeeded.
    Rendered,
    /// The frame was presented but some draws failed.
    Degraded(Vec<DrawFailure>),
    /// The loop is shut down; nothing was rendered.
    Shutdown,
}

/// Drives a [`Scene`] through its phases once per tick.
///
/// A fatal error or a panic anywhere in a frame raises the shutdown signal
/// instead of unwinding into the caller. Once raised, further ticks do nothing.
#[derive(Debug)]
pub struct FrameLoop {
    scene: Arc<Scene>,
    shutdown: Arc<AtomicBool>,
    frames: u64,
}

impl FrameLoop {
    /// Creates a loop over `scene`.
    pub fn new(scene: Arc<Scene>) -> Self {
        Self {
            scene,
            shutdown: Arc::new(AtomicBool::new(false)),
            frames: 0,
        }
    }

    /// The driven scene.
    pub fn scene(&self) -> &Arc<Scene> {
        &self.scene
    }

    /// A handle other threads can use to stop the loop, or to observe that it stopped.
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Returns `true` once the loop has stopped.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Frames rendered so far, degraded ones included.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs one frame.
    pub fn tick(&mut self, delta_time: f32) -> FrameOutcome {
        if self.is_shut_down() {
            return FrameOutcome::Shutdown;
        }

        let scene = &self.scene;
        match panic::catch_unwind(AssertUnwindSafe(|| run_frame(scene, delta_time))) {
            Ok(Ok(failures)) => {
                self.frames += 1;
                if failures.is_empty() {
                    FrameOutcome::Rendered
                } else {
                    log::warn!(
                        "FrameLoop: frame {} presented with {} failed draws",
                        self.frames,
                        failures.len()
                    );
                    FrameOutcome::Degraded(failures)
                }
            }
            Ok(Err(error)) => {
                log::error!("FrameLoop: fatal error, shutting down: {error}");
                self.stop()
            }
            Err(payload) => {
                log::error!(
                    "FrameLoop: frame panicked, shutting down: {}",
                    panic_message(payload.as_ref())
                );
                self.stop()
            }
        }
    }

    /// Ticks at a fixed `delta_time` until `frames` frames ran or the loop
    /// shut down. Returns the number of frames rendered.
    pub fn run(&mut self, frames: u64, delta_time: f32) -> u64 {
        let start = self.frames;
        for _ in 0..frames {
            if self.tick(delta_time) == FrameOutcome::Shutdown {
                break;
            }
        }
        self.frames - start
    }

    fn stop(&self) -> FrameOutcome {
        self.shutdown.store(true, Ordering::Release);
        FrameOutcome::Shutdown
    }
}

/// The fixed phase order. Per-draw failures of the shadow and main passes
/// are collected; anything else aborts the frame.
fn run_frame(scene: &Scene, delta_time: f32) -> Result<Vec<DrawFailure>, SceneError> {
    let mut failures = Vec::new();
    scene.prepare_compute(delta_time)?;
    collect(scene.prepare_shadows(), &mut failures)?;
    scene.prepare_light_culling()?;
    collect(scene.draw_calls(), &mut failures)?;
    Ok(failures)
}

fn collect(
    result: Result<(), SceneError>,
    failures: &mut Vec<DrawFailure>,
) -> Result<(), SceneError> {
    match result {
        Err(SceneError::DrawFailures(more)) => {
            failures.extend(more);
            Ok(())
        }
        other => other,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
