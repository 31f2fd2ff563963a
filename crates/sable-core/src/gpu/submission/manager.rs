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

use crate::gpu::error::GpuError;
use crate::gpu::fence::{CommandListType, FenceValue, QueueType};
use crate::gpu::handle::{CommandAllocatorId, CommandListId};
use crate::gpu::submission::CommandQueue;
use crate::gpu::traits::GpuDevice;
use std::sync::Arc;

/// Owns the three command queues and presents a single routing surface.
///
/// Any fence value can be handed to the manager; it decodes the producing
/// queue from the value's high byte and forwards the operation. Beyond
/// queue ownership the manager is stateless.
#[derive(Debug)]
pub struct CommandListManager {
    device: Arc<dyn GpuDevice>,
    graphics: CommandQueue,
    compute: CommandQueue,
    copy: CommandQueue,
}

impl CommandListManager {
    /// Creates the graphics, compute and copy queues on `device`.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` / `GpuError::OutOfMemory` - If any queue or
    ///   fence cannot be created.
    pub fn new(device: Arc<dyn GpuDevice>) -> Result<Self, GpuError> {
        Ok(CommandListManager {
            graphics: CommandQueue::new(device.clone(), QueueType::Graphics)?,
            compute: CommandQueue::new(device.clone(), QueueType::Compute)?,
            copy: CommandQueue::new(device.clone(), QueueType::Copy)?,
            device,
        })
    }

    /// The device the manager was built on.
    pub fn device(&self) -> &Arc<dyn GpuDevice> {
        &self.device
    }

    /// Looks up a queue by type.
    pub fn queue(&self, queue_type: QueueType) -> &CommandQueue {
        match queue_type {
            QueueType::Graphics => &self.graphics,
            QueueType::Compute => &self.compute,
            QueueType::Copy => &self.copy,
        }
    }

    /// The graphics (direct) queue.
    pub fn graphics_queue(&self) -> &CommandQueue {
        &self.graphics
    }

    /// The asynchronous compute queue.
    pub fn compute_queue(&self) -> &CommandQueue {
        &self.compute
    }

    /// The copy queue.
    pub fn copy_queue(&self) -> &CommandQueue {
        &self.copy
    }

    /// Tests a fence value against the queue that produced it.
    pub fn is_fence_complete(&self, fence_value: FenceValue) -> bool {
        self.queue(fence_value.queue_type()).is_fence_complete(fence_value)
    }

    /// Blocks the calling thread until the producing queue has completed
    /// `fence_value`.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` - If the device is lost while waiting.
    pub fn wait_for_fence(&self, fence_value: FenceValue) -> Result<(), GpuError> {
        self.queue(fence_value.queue_type()).wait_for_fence(fence_value)
    }

    /// Brokers a GPU-side cross-queue wait: the `waiting` queue's execution
    /// holds until the queue that produced `fence_value` completes it. No
    /// CPU synchronization is involved.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` - If the wait cannot be enqueued.
    pub fn stall_for_fence(
        &self,
        waiting: QueueType,
        fence_value: FenceValue,
    ) -> Result<(), GpuError> {
        let producer = self.queue(fence_value.queue_type());
        self.queue(waiting).stall_for_fence(producer, fence_value)
    }

    /// Opens a new command list of the given kind, bound to an allocator
    /// lent by the matching queue.
    ///
    /// Bundles are not supported: debug builds assert, release builds fall
    /// through to the graphics queue with undefined results.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` / `GpuError::OutOfMemory` - From allocator
    ///   or list creation.
    pub fn create_new_command_list(
        &self,
        list_type: CommandListType,
    ) -> Result<(CommandListId, CommandAllocatorId), GpuError> {
        debug_assert!(
            list_type != CommandListType::Bundle,
            "bundle command lists are not supported"
        );
        let queue_type = list_type.queue_type().unwrap_or(QueueType::Graphics);

        let allocator = self.queue(queue_type).request_allocator()?;
        let list = self
            .device
            .create_command_list(queue_type, allocator, Some("CommandList"))?;
        Ok((list, allocator))
    }

    /// Drains all three queues in sequence (graphics, compute, copy).
    ///
    /// Each drain is itself a blocking CPU wait, so there is nothing to
    /// gain from parallelizing; ordering does not affect correctness.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` - If any drain fails.
    pub fn wait_idle(&self) -> Result<(), GpuError> {
        self.graphics.wait_for_idle()?;
        self.compute.wait_for_idle()?;
        self.copy.wait_for_idle()?;
        Ok(())
    }
}
