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

use marionette_core::ConfigError;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// A persistent pool of prep workers, reused across frames.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads())
            .finish()
    }
}

impl WorkerPool {
    /// Spawns the workers. `None` sizes the pool to the available parallelism.
    pub fn new(threads: Option<usize>) -> Result<Self, ConfigError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.unwrap_or(0))
            .thread_name(|index| format!("marionette-prep-{index}"))
            .build()
            .map_err(|e| ConfigError::InvalidSettings(format!("worker pool: {e}")))?;
        log::info!("WorkerPool: {} prep workers", pool.current_num_threads());
        Ok(Self { pool })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `task` once per item on the pool and returns the results in item order.
    ///
    /// Returns only after every task has finished; a panicking task is
    /// re-raised on the calling thread once the others are done.
    pub fn scatter_gather<T, R, F>(&self, items: &[T], task: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        let (sender, receiver) = crossbeam_channel::bounded(items.len());
        let task = &task;
        self.pool.scope(|s| {
            for (index, item) in items.iter().enumerate() {
                let sender = sender.clone();
                s.spawn(move |_| {
                    // the receiver outlives the scope
                    let _ = sender.send((index, task(item)));
                });
            }
        });
        drop(sender);

        let mut results: Vec<Option<R>> =
            std::iter::repeat_with(|| None).take(items.len()).collect();
        for (index, result) in receiver.try_iter() {
            results[index] = Some(result);
        }
        results.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[test]
    fn results_keep_item_order() {
        let pool = WorkerPool::new(Some(4)).unwrap();
        let items: Vec<u32> = (0..64).collect();
        let squares = pool.scatter_gather(&items, |x| x * x);
        assert_eq!(squares, items.iter().map(|x| x * x).collect::<Vec<_>>());
    }

    #[test]
    fn tasks_run_on_named_workers() {
        let pool = WorkerPool::new(Some(2)).unwrap();
        assert_eq!(pool.threads(), 2);

        let names = Mutex::new(HashSet::new());
        pool.scatter_gather(&[(); 16], |_| {
            let name = std::thread::current().name().map(str::to_owned);
            names.lock().unwrap().insert(name);
        });
        let names = names.into_inner().unwrap();
        assert!(names
            .iter()
            .all(|n| n.as_deref().is_some_and(|n| n.starts_with("marionette-prep-"))));
    }

    #[test]
    fn empty_input_returns_immediately() {
        let pool = WorkerPool::new(Some(1)).unwrap();
        let out: Vec<u8> = pool.scatter_gather(&[] as &[u8], |x| *x);
        assert!(out.is_empty());
    }
}
