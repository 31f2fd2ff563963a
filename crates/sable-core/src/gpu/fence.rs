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

//! Fence-value encoding and the queue type enums.
//!
//! A fence value is a tagged 64-bit integer: the high byte identifies the
//! queue that produced it and the low 56 bits are that queue's submission
//! counter. Downstream code decodes the tag purely arithmetically
//! (`value >> 56`) to route cross-queue waits, so the packing is part of
//! the contract, not an implementation detail.

use std::fmt;

/// Number of bits the queue-type tag is shifted into a fence value.
const QUEUE_TYPE_SHIFT: u32 = 56;

/// The hardware submission queue families exposed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    /// The graphics (direct) queue. Accepts graphics, compute and copy work.
    Graphics,
    /// The asynchronous compute queue.
    Compute,
    /// The copy (transfer) queue.
    Copy,
}

impl QueueType {
    /// All queue types, in the order the manager creates and drains them.
    pub const ALL: [QueueType; 3] = [QueueType::Graphics, QueueType::Compute, QueueType::Copy];

    /// The tag stored in the high byte of fence values produced by this queue.
    pub const fn tag(self) -> u64 {
        match self {
            QueueType::Graphics => 0,
            QueueType::Compute => 1,
            QueueType::Copy => 2,
        }
    }

    /// The baseline fence value for this queue: tag in the high byte,
    /// counter at zero. A queue's fence is signaled to this value at
    /// construction, before any work is submitted.
    pub const fn base_fence_value(self) -> u64 {
        self.tag() << QUEUE_TYPE_SHIFT
    }

    /// A human-readable queue name, used to label the native queue object.
    pub const fn label(self) -> &'static str {
        match self {
            QueueType::Graphics => "Graphics Queue",
            QueueType::Compute => "Compute Queue",
            QueueType::Copy => "Copy Queue",
        }
    }
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The kind of command list a caller wants to record.
///
/// Every kind except [`CommandListType::Bundle`] maps onto one queue type.
/// Bundles are explicitly unsupported by the submission core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandListType {
    /// A direct command list, executed on the graphics queue.
    Direct,
    /// A reusable bundle. Not supported; requesting one is caller misuse.
    Bundle,
    /// A compute command list, executed on the compute queue.
    Compute,
    /// A copy command list, executed on the copy queue.
    Copy,
}

impl CommandListType {
    /// The queue this kind of list is submitted to, or `None` for bundles.
    pub const fn queue_type(self) -> Option<QueueType> {
        match self {
            CommandListType::Direct => Some(QueueType::Graphics),
            CommandListType::Bundle => None,
            CommandListType::Compute => Some(QueueType::Compute),
            CommandListType::Copy => Some(QueueType::Copy),
        }
    }
}

/// A completion ticket for work submitted to one queue.
///
/// Encoded as `(queue_tag << 56) | counter`. For a fixed queue, issued
/// values strictly increase in submission order, so comparing two values
/// from the same queue orders their submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FenceValue(u64);

impl FenceValue {
    /// Packs a queue type and counter into a fence value.
    pub const fn new(queue_type: QueueType, counter: u64) -> Self {
        FenceValue(queue_type.base_fence_value() | counter)
    }

    /// Wraps an already-encoded raw value.
    pub const fn from_raw(raw: u64) -> Self {
        FenceValue(raw)
    }

    /// The raw encoded value.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// The low 56 bits: this queue's submission counter.
    pub const fn counter(self) -> u64 {
        self.0 & ((1 << QUEUE_TYPE_SHIFT) - 1)
    }

    /// Decodes the queue that produced this value.
    ///
    /// An out-of-range tag is caller misuse (a fence value that no queue
    /// ever issued). Debug builds assert; release builds fall back to the
    /// graphics queue, matching the manager's default routing.
    pub fn queue_type(self) -> QueueType {
        match self.0 >> QUEUE_TYPE_SHIFT {
            0 => QueueType::Graphics,
            1 => QueueType::Compute,
            2 => QueueType::Copy,
            tag => {
                debug_assert!(false, "fence value {:#018x} has unknown queue tag {}", self.0, tag);
                QueueType::Graphics
            }
        }
    }
}

impl fmt::Display for FenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.queue_type(), self.counter())
    }
}
