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

//! Rendering contracts: resource handles, binding metadata, GPU record
//! encoders, lights, Forward+ tiling, and the [`GpuBackend`] trait.

pub mod api;
pub mod forward_plus;
pub mod layout;
pub mod light;
pub mod traits;

pub use self::api::*;
pub use self::forward_plus::{tile_counts, ForwardPlusTileConfig, TileSize};
pub use self::light::{DirectionalLight, Light, LightType, PointLight, SpotLight};
pub use self::traits::*;
