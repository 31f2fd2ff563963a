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

//! Opaque handles to native GPU objects, plus construction-time descriptors.
//!
//! Every native object (queue, fence, allocator, list, heap) is represented
//! by an id that only the backend can interpret. Each handle is owned by
//! exactly one component and released through the device on teardown.

use crate::gpu::fence::QueueType;

/// An opaque handle to a hardware submission queue.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct QueueId(pub u64);

/// An opaque handle to a fence object on the device timeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FenceId(pub u64);

/// An opaque handle to a command allocator (the backing memory a command
/// list records into).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CommandAllocatorId(pub u64);

/// An opaque handle to a command list bound to one allocator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CommandListId(pub u64);

/// An opaque handle to a fixed-capacity descriptor heap.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorHeapId(pub u64);

/// Scheduling priority for a hardware queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueuePriority {
    /// The default priority.
    #[default]
    Normal,
    /// Elevated priority, where the backend supports it.
    High,
}

/// Describes the hardware queue to create.
#[derive(Debug, Clone)]
pub struct CommandQueueDescriptor<'a> {
    /// Which queue family to create the queue on.
    pub queue_type: QueueType,
    /// An optional debug label for the native queue object.
    pub label: Option<&'a str>,
    /// Scheduling priority.
    pub priority: QueuePriority,
}

impl<'a> CommandQueueDescriptor<'a> {
    /// A normal-priority queue labeled with the queue type's own name.
    pub fn for_queue_type(queue_type: QueueType) -> Self {
        CommandQueueDescriptor {
            queue_type,
            label: Some(queue_type.label()),
            priority: QueuePriority::Normal,
        }
    }
}
