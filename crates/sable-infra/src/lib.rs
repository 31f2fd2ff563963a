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

//! # Sable Infra
//!
//! Concrete implementations of the contracts defined in `sable-core`.
//! Currently ships the software device: an in-process [`crate::graphics::software::SoftwareDevice`]
//! that models hardware queue timelines and fence completion without any
//! native API, with deterministic control over GPU progress for tests.

pub mod graphics;

pub use graphics::software::SoftwareDevice;
