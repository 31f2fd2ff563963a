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

//! GPU command submission and synchronization core.
//!
//! This module defines the "common language" of the submission layer. It
//! contains the abstract [`GpuDevice`] trait, the opaque handle types, the
//! fence-value encoding, and the machinery built on top of them:
//!
//! - [`CommandAllocatorPool`]: lends out command allocators and reclaims
//!   them only after the GPU has provably finished with them.
//! - [`CommandQueue`]: wraps one hardware submission queue and turns
//!   "work is queued" into a comparable, waitable ticket.
//! - [`CommandListManager`]: owns the three queues and routes fence values
//!   back to the queue that produced them.
//! - [`DescriptorAllocator`]: append-only bump allocation of descriptor
//!   ranges over fixed-capacity heaps.
//!
//! This module defines the 'what' of submission; the 'how' is handled by a
//! concrete backend in the `sable-infra` crate which implements
//! [`GpuDevice`].

pub mod descriptor;
pub mod error;
pub mod fence;
pub mod handle;
pub mod submission;
pub mod traits;

// Re-export the most important types for easier use.
pub use self::descriptor::{
    DescriptorAllocator, DescriptorHandle, DescriptorHeapInfo, DescriptorHeapType,
    NUM_DESCRIPTORS_PER_HEAP,
};
pub use self::error::GpuError;
pub use self::fence::{CommandListType, FenceValue, QueueType};
pub use self::handle::{
    CommandAllocatorId, CommandListId, CommandQueueDescriptor, DescriptorHeapId, FenceId, QueueId,
    QueuePriority,
};
pub use self::submission::{CommandAllocatorPool, CommandListManager, CommandQueue};
pub use self::traits::GpuDevice;
