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

//! Tile grid of the Forward+ light culling pass.
//!
//! The cull pass writes, per screen tile, a `(offset, count)` pair into the
//! light grid and the matching light indices into a flat index buffer. Each
//! tile owns a fixed window of `max_lights_per_tile` indices; lights past that
//! window are dropped.

use serde::Deserialize;

const GRID_ENTRY_BYTES: u64 = 8;
const LIGHT_INDEX_BYTES: u64 = 4;

/// Edge length of a square culling tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum TileSize {
    /// 16 pixels.
    #[default]
    X16,
    /// 32 pixels. Fewer tiles, longer per-tile lists.
    X32,
}

impl TileSize {
    /// Edge length in pixels.
    #[inline]
    pub const fn pixels(&self) -> u32 {
        match self {
            TileSize::X16 => 16,
            TileSize::X32 => 32,
        }
    }

    /// Tiles covering `screen_size` pixels, partial tiles included.
    #[inline]
    pub const fn tile_count(&self, screen_size: u32) -> u32 {
        screen_size.div_ceil(self.pixels())
    }
}

/// Tile size and per-tile light budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ForwardPlusTileConfig {
    /// Tile edge.
    pub tile_size: TileSize,
    /// Light indices reserved per tile.
    pub max_lights_per_tile: u32,
}

impl Default for ForwardPlusTileConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ForwardPlusTileConfig {
    /// 16-pixel tiles with room for 128 lights each.
    pub const fn new() -> Self {
        Self {
            tile_size: TileSize::X16,
            max_lights_per_tile: 128,
        }
    }

    /// `(columns, rows)` of the grid over a `screen_width × screen_height` target.
    #[inline]
    pub const fn tile_dimensions(&self, screen_width: u32, screen_height: u32) -> (u32, u32) {
        (
            self.tile_size.tile_count(screen_width),
            self.tile_size.tile_count(screen_height),
        )
    }

    /// Number of tiles in the grid.
    #[inline]
    pub const fn total_tiles(&self, screen_width: u32, screen_height: u32) -> u32 {
        let (columns, rows) = self.tile_dimensions(screen_width, screen_height);
        columns * rows
    }

    /// Bytes of the flat light index buffer.
    pub const fn light_index_buffer_size(&self, screen_width: u32, screen_height: u32) -> u64 {
        self.total_tiles(screen_width, screen_height) as u64
            * self.max_lights_per_tile as u64
            * LIGHT_INDEX_BYTES
    }

    /// Bytes of the light grid, one `(offset: u32, count: u32)` pair per tile.
    pub const fn light_grid_buffer_size(&self, screen_width: u32, screen_height: u32) -> u64 {
        self.total_tiles(screen_width, screen_height) as u64 * GRID_ENTRY_BYTES
    }
}

/// Grid dimensions with the default 16-pixel tiles.
#[inline]
pub const fn tile_counts(screen_width: u32, screen_height: u32) -> (u32, u32) {
    ForwardPlusTileConfig::new().tile_dimensions(screen_width, screen_height)
}
