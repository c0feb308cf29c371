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

//! # Marionette Infra
//!
//! Concrete implementations of the [`GpuBackend`](marionette_core::renderer::GpuBackend)
//! contract.
//!
//! Only a headless device ships today. It keeps every buffer in host memory,
//! records each submitted command, and runs registered compute kernels on the
//! CPU so the whole frame protocol can be exercised without a GPU.

#![warn(missing_docs)]

pub mod headless;

pub use headless::*;
