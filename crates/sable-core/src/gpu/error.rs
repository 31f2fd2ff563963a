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

//! Defines the error types for the submission core.
//!
//! Resource exhaustion and device removal are fatal to the component that
//! hits them and are surfaced as [`GpuError::DeviceLost`] or
//! [`GpuError::OutOfMemory`]; recovery means rebuilding every queue, pool
//! and heap from scratch. Programmer misuse (bundle lists, oversized
//! descriptor requests, unknown fence tags) is handled with debug
//! assertions rather than `Result`s, trading release-build checking for
//! submission latency.

use std::fmt;

/// An error surfaced by the device or the submission machinery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// The logical device was removed or reset. Everything built on it
    /// (queues, pools, heaps) must be rebuilt from scratch.
    DeviceLost {
        /// A backend-supplied description of why the device was lost.
        reason: String,
    },
    /// The device could not allocate a native object.
    OutOfMemory {
        /// What the device was asked to allocate.
        what: String,
    },
    /// An id did not refer to a live object of the expected kind.
    InvalidHandle {
        /// The kind of object the handle was expected to name.
        kind: &'static str,
        /// The raw id value.
        id: u64,
    },
    /// An operation was issued against an object in the wrong state.
    InvalidOperation {
        /// A description of the rejected operation.
        what: String,
    },
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::DeviceLost { reason } => {
                write!(f, "device lost: {reason}")
            }
            GpuError::OutOfMemory { what } => {
                write!(f, "device out of memory while creating {what}")
            }
            GpuError::InvalidHandle { kind, id } => {
                write!(f, "invalid {kind} handle: {id}")
            }
            GpuError::InvalidOperation { what } => {
                write!(f, "invalid operation: {what}")
            }
        }
    }
}

impl std::error::Error for GpuError {}
