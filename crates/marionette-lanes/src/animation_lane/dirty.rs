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

//! Dirty tracking for instance slots.
//!
//! Two strategies with different upload profiles:
//! - [`DirtySet`] is sparse. Only touched slots are uploaded, coalesced into
//!   contiguous runs at flush time.
//! - [`DirtyRange`] is one contiguous span. Cheap to maintain, but two far-apart
//!   dirty slots upload everything between them.

use std::ops::Range;

/// Sparse set of dirty slot indices.
///
/// An append-only index list gives flush-time iteration proportional to the
/// number of touched slots; a `Vec<u64>` bitset deduplicates in O(1).
#[derive(Debug, Default, Clone)]
pub struct DirtySet {
    indices: Vec<u32>,
    bits: Vec<u64>,
}

impl DirtySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `index` dirty. Returns `false` if it already was.
    pub fn mark(&mut self, index: u32) -> bool {
        let word_idx = (index / 64) as usize;
        let mask = 1u64 << (index % 64);

        if word_idx >= self.bits.len() {
            self.bits.resize(word_idx + 1, 0);
        }
        if self.bits[word_idx] & mask != 0 {
            return false;
        }
        self.bits[word_idx] |= mask;
        self.indices.push(index);
        true
    }

    /// Marks every index in `range` dirty.
    pub fn mark_range(&mut self, range: Range<u32>) {
        for index in range {
            self.mark(index);
        }
    }

    /// Returns true if `index` is dirty.
    pub fn contains(&self, index: u32) -> bool {
        let word_idx = (index / 64) as usize;
        self.bits
            .get(word_idx)
            .is_some_and(|word| word & (1 << (index % 64)) != 0)
    }

    /// Number of dirty indices.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns true if nothing is dirty.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Drains the set into sorted, merged runs of indices below `limit`.
    ///
    /// Indices at or past `limit` (slots removed since they were marked) are
    /// discarded.
    pub fn coalesce(&mut self, limit: u32) -> Vec<Range<u32>> {
        let mut indices = std::mem::take(&mut self.indices);
        self.bits.iter_mut().for_each(|word| *word = 0);

        indices.retain(|&i| i < limit);
        indices.sort_unstable();

        let mut runs: Vec<Range<u32>> = Vec::new();
        for index in indices {
            match runs.last_mut() {
                Some(run) if run.end == index => run.end += 1,
                _ => runs.push(index..index + 1),
            }
        }
        runs
    }

    /// Forgets every dirty index.
    pub fn clear(&mut self) {
        self.indices.clear();
        self.bits.clear();
    }
}

/// A contiguous dirty span `[start, end)`, expanded on each mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyRange {
    span: Option<(u32, u32)>,
}

impl DirtyRange {
    /// Creates an empty range.
    pub const fn new() -> Self {
        Self { span: None }
    }

    /// Expands the span to cover `index`.
    pub fn mark(&mut self, index: u32) {
        self.mark_range(index..index + 1);
    }

    /// Expands the span to cover `range`.
    pub fn mark_range(&mut self, range: Range<u32>) {
        if range.is_empty() {
            return;
        }
        self.span = Some(match self.span {
            Some((start, end)) => (start.min(range.start), end.max(range.end)),
            None => (range.start, range.end),
        });
    }

    /// Returns true if nothing is dirty.
    pub fn is_empty(&self) -> bool {
        self.span.is_none()
    }

    /// The current span, if any.
    pub fn get(&self) -> Option<Range<u32>> {
        self.span.map(|(start, end)| start..end)
    }

    /// Clears and returns the span, clipped to `limit`.
    pub fn take(&mut self, limit: u32) -> Option<Range<u32>> {
        let (start, end) = self.span.take()?;
        let end = end.min(limit);
        (start < end).then_some(start..end)
    }
}
