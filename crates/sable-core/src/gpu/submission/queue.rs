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
use crate::gpu::fence::{FenceValue, QueueType};
use crate::gpu::handle::{CommandAllocatorId, CommandListId, CommandQueueDescriptor, FenceId, QueueId};
use crate::gpu::submission::CommandAllocatorPool;
use crate::gpu::traits::GpuDevice;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Wraps one hardware submission queue and its fence.
///
/// Translates "work is queued" into a comparable, waitable ticket: every
/// submission signals the queue's fence with the next value of a strictly
/// increasing counter, and that value is returned to the caller.
///
/// Two independent locks protect the mutable state. The submission lock
/// serializes fence signaling so the strict-monotonic invariant holds; the
/// wait lock serializes CPU-blocking waits. They are deliberately distinct
/// so a thread blocked in [`CommandQueue::wait_for_fence`] never stalls a
/// thread submitting work.
#[derive(Debug)]
pub struct CommandQueue {
    device: Arc<dyn GpuDevice>,
    queue_type: QueueType,
    queue: QueueId,
    fence: FenceId,
    allocator_pool: CommandAllocatorPool,
    /// Next value to signal. The mutex doubles as the submission lock.
    next_fence_value: Mutex<u64>,
    /// Cache of the device's completed value. Raised with fetch-max only,
    /// so a racing refresh can never regress it.
    last_completed_fence_value: AtomicU64,
    /// Serializes CPU-blocking waits; see `wait_for_fence`.
    wait_lock: Mutex<()>,
}

impl CommandQueue {
    /// Creates the hardware queue, its fence and its allocator pool.
    ///
    /// The fence starts at zero and is immediately signaled to the queue's
    /// base value `(type << 56)`, establishing the baseline every later
    /// comparison builds on.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` / `GpuError::OutOfMemory` - If the native
    ///   queue or fence cannot be created.
    pub fn new(device: Arc<dyn GpuDevice>, queue_type: QueueType) -> Result<Self, GpuError> {
        let descriptor = CommandQueueDescriptor::for_queue_type(queue_type);
        let queue = device.create_command_queue(&descriptor)?;

        let fence_label = format!("{} Fence", queue_type.label());
        let fence = device.create_fence(0, Some(&fence_label))?;
        device.signal_fence(fence, queue_type.base_fence_value())?;

        debug!("{}: created (fence baseline {:#x})", queue_type, queue_type.base_fence_value());

        Ok(CommandQueue {
            allocator_pool: CommandAllocatorPool::new(device.clone(), queue_type),
            device,
            queue_type,
            queue,
            fence,
            next_fence_value: Mutex::new(queue_type.base_fence_value() | 1),
            last_completed_fence_value: AtomicU64::new(queue_type.base_fence_value()),
            wait_lock: Mutex::new(()),
        })
    }

    /// The queue family this queue was created on.
    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    /// The native queue handle.
    pub fn id(&self) -> QueueId {
        self.queue
    }

    /// The next fence value this queue will signal.
    pub fn next_fence_value(&self) -> FenceValue {
        FenceValue::from_raw(*self.next_fence_value.lock().unwrap())
    }

    /// This queue's allocator pool.
    pub fn allocator_pool(&self) -> &CommandAllocatorPool {
        &self.allocator_pool
    }

    /// Returns an allocator that is safe to record into, reusing a retired
    /// one when the fence's live completed value allows it.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` / `GpuError::OutOfMemory` - Forwarded from
    ///   the pool.
    pub fn request_allocator(&self) -> Result<CommandAllocatorId, GpuError> {
        let completed_fence_value = self.device.fence_completed_value(self.fence);
        self.allocator_pool.request_allocator(completed_fence_value)
    }

    /// Returns an allocator to the pool, tagged with the ticket of the
    /// submission that last used it.
    pub fn discard_allocator(&self, fence_value: FenceValue, allocator: CommandAllocatorId) {
        self.allocator_pool.discard_allocator(fence_value, allocator);
    }

    /// Closes and submits a command list, then signals the fence.
    ///
    /// Returns the signaled value: the completion ticket for this
    /// submission. Tickets are issued in strictly increasing order matching
    /// submission order.
    ///
    /// ## Errors
    /// * `GpuError::InvalidOperation` - If the list cannot be closed.
    /// * `GpuError::DeviceLost` - If submission or signaling fails.
    pub fn execute_command_list(&self, list: CommandListId) -> Result<FenceValue, GpuError> {
        let mut next_fence_value = self.next_fence_value.lock().unwrap();

        self.device.close_command_list(list)?;
        self.device.submit(self.queue, list)?;
        self.device.queue_signal(self.queue, self.fence, *next_fence_value)?;

        let signaled = *next_fence_value;
        *next_fence_value += 1;
        Ok(FenceValue::from_raw(signaled))
    }

    /// Signals the fence with the next value without submitting any work,
    /// stamping a point in the queue's timeline.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` - If signaling fails.
    pub fn increment_fence(&self) -> Result<FenceValue, GpuError> {
        let mut next_fence_value = self.next_fence_value.lock().unwrap();
        self.device.queue_signal(self.queue, self.fence, *next_fence_value)?;
        let signaled = *next_fence_value;
        *next_fence_value += 1;
        Ok(FenceValue::from_raw(signaled))
    }

    /// Tests whether the GPU has reached `fence_value`.
    ///
    /// Compares against the cached completed value first and only queries
    /// the device when the candidate exceeds the cache. Once this returns
    /// `true` for a value, it returns `true` for that value (and any
    /// smaller one) for the life of the queue.
    pub fn is_fence_complete(&self, fence_value: FenceValue) -> bool {
        let value = fence_value.raw();
        if value > self.last_completed_fence_value.load(Ordering::Acquire) {
            let live = self.device.fence_completed_value(self.fence);
            self.last_completed_fence_value.fetch_max(live, Ordering::AcqRel);
        }
        value <= self.last_completed_fence_value.load(Ordering::Acquire)
    }

    /// Makes this queue's GPU execution wait until `producer` has completed
    /// `fence_value`. Returns immediately on the CPU; if the producer has
    /// already completed the value, the wait is satisfied immediately on
    /// the GPU as well.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` - If the wait cannot be enqueued.
    pub fn stall_for_fence(
        &self,
        producer: &CommandQueue,
        fence_value: FenceValue,
    ) -> Result<(), GpuError> {
        debug_assert_eq!(
            producer.queue_type,
            fence_value.queue_type(),
            "stall routed to a queue that did not produce the fence value"
        );
        self.device.queue_wait(self.queue, producer.fence, fence_value.raw())
    }

    /// Blocks the calling thread until the GPU has reached `fence_value`.
    ///
    /// Fast path: returns immediately if the value is already complete.
    ///
    /// Known limitation: only one wait registration is modeled per queue,
    /// so concurrent waiters serialize through the wait lock, and a thread
    /// waiting for a smaller value can block until a larger one completes.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` - If the device is lost while waiting.
    pub fn wait_for_fence(&self, fence_value: FenceValue) -> Result<(), GpuError> {
        if self.is_fence_complete(fence_value) {
            return Ok(());
        }

        {
            let _guard = self.wait_lock.lock().unwrap();
            self.device.wait_fence(self.fence, fence_value.raw())?;
            self.last_completed_fence_value
                .fetch_max(fence_value.raw(), Ordering::AcqRel);
        }
        Ok(())
    }

    /// Stamps a new fence signal and blocks until the GPU reaches it,
    /// guaranteeing every previously submitted unit of work has retired.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` - From the signal or the wait.
    pub fn wait_for_idle(&self) -> Result<(), GpuError> {
        let fence_value = self.increment_fence()?;
        self.wait_for_fence(fence_value)
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        // The pool releases its allocators first; only legal because the
        // caller drains the queue before teardown.
        self.allocator_pool.shutdown();
        self.device.destroy_fence(self.fence);
        self.device.destroy_command_queue(self.queue);
    }
}
