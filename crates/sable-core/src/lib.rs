// Copyright 2025 sable contributors
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

//! # Sable Core
//!
//! Foundational crate containing the GPU submission contracts and the
//! queue, fence and descriptor machinery of the Sable engine.
//!
//! The rest of the engine hands this crate an opaque device handle (any
//! [`gpu::GpuDevice`] implementation) and receives back fence-value
//! completion tickets it can test or block on.

#![warn(missing_docs)]

pub mod gpu;
