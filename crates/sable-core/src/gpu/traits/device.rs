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

use crate::gpu::descriptor::{DescriptorHeapInfo, DescriptorHeapType};
use crate::gpu::error::GpuError;
use crate::gpu::fence::QueueType;
use crate::gpu::handle::{
    CommandAllocatorId, CommandListId, CommandQueueDescriptor, FenceId, QueueId,
};
use std::fmt::Debug;

/// The logical device the submission core is built on.
///
/// Implementations own the native objects behind every id and are free to
/// map these operations onto whatever platform primitives they like, as
/// long as the fence surface behaves like a monotonically-signaled
/// counter: `create_fence` / `signal_fence` / `fence_completed_value` /
/// `wait_fence` are the cross-platform rendering of "create waitable",
/// "signal-to-value", "query-current-value" and "block-until-value".
///
/// All operations except [`GpuDevice::wait_fence`] must return without
/// blocking the calling thread.
pub trait GpuDevice: Send + Sync + Debug + 'static {
    /// Creates a hardware submission queue.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` / `GpuError::OutOfMemory` - If the native
    ///   queue cannot be created.
    fn create_command_queue(&self, descriptor: &CommandQueueDescriptor)
        -> Result<QueueId, GpuError>;

    /// Releases a hardware queue. The queue must be idle.
    fn destroy_command_queue(&self, queue: QueueId);

    /// Submits a closed command list to a queue for execution.
    ///
    /// Per queue, submissions execute in FIFO order.
    ///
    /// ## Errors
    /// * `GpuError::InvalidOperation` - If the list has not been closed.
    /// * `GpuError::DeviceLost` - If submission fails at the device level.
    fn submit(&self, queue: QueueId, list: CommandListId) -> Result<(), GpuError>;

    /// Enqueues a GPU-side signal: once the queue's execution reaches this
    /// point, `fence` advances to `value`.
    fn queue_signal(&self, queue: QueueId, fence: FenceId, value: u64) -> Result<(), GpuError>;

    /// Enqueues a GPU-side wait: the queue's execution holds until `fence`
    /// has reached `value`. Returns immediately on the CPU.
    fn queue_wait(&self, queue: QueueId, fence: FenceId, value: u64) -> Result<(), GpuError>;

    /// Creates a fence whose completed value starts at `initial_value`.
    fn create_fence(&self, initial_value: u64, label: Option<&str>) -> Result<FenceId, GpuError>;

    /// Releases a fence. No queue may still reference it.
    fn destroy_fence(&self, fence: FenceId);

    /// CPU-side signal: immediately raises the fence's completed value to
    /// at least `value`.
    fn signal_fence(&self, fence: FenceId, value: u64) -> Result<(), GpuError>;

    /// Reads the fence's current completed value from the device.
    fn fence_completed_value(&self, fence: FenceId) -> u64;

    /// Blocks the calling thread until the fence's completed value reaches
    /// `value`. The wait is unbounded.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` - If the device is lost while waiting; the
    ///   caller must treat the whole device as gone.
    fn wait_fence(&self, fence: FenceId, value: u64) -> Result<(), GpuError>;

    /// Creates a command allocator for the given queue family.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` / `GpuError::OutOfMemory` - Allocator
    ///   creation failure is fatal to the requesting pool.
    fn create_command_allocator(
        &self,
        queue_type: QueueType,
        label: Option<&str>,
    ) -> Result<CommandAllocatorId, GpuError>;

    /// Resets an allocator for reuse. Only legal once the GPU has finished
    /// every command list recorded against it.
    fn reset_command_allocator(&self, allocator: CommandAllocatorId) -> Result<(), GpuError>;

    /// Releases a command allocator.
    fn destroy_command_allocator(&self, allocator: CommandAllocatorId);

    /// Opens a new command list bound to `allocator`, ready for recording.
    fn create_command_list(
        &self,
        queue_type: QueueType,
        allocator: CommandAllocatorId,
        label: Option<&str>,
    ) -> Result<CommandListId, GpuError>;

    /// Closes a command list, making it submittable.
    fn close_command_list(&self, list: CommandListId) -> Result<(), GpuError>;

    /// Creates a fixed-capacity descriptor heap and reports its base
    /// addresses.
    fn create_descriptor_heap(
        &self,
        heap_type: DescriptorHeapType,
        capacity: u32,
        label: Option<&str>,
    ) -> Result<DescriptorHeapInfo, GpuError>;

    /// The per-descriptor address stride for a heap type.
    fn descriptor_increment_size(&self, heap_type: DescriptorHeapType) -> u32;
}
