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

//! In-memory GPU backend.

mod backend;
mod command;
mod kernels;

pub use backend::HeadlessBackend;
pub use command::{DrawRecord, RecordedCommand};
pub use kernels::{frustum_cull_kernel, light_cull_kernel, ComputeKernel, KernelContext};
