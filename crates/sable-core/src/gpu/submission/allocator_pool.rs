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
use crate::gpu::handle::CommandAllocatorId;
use crate::gpu::traits::GpuDevice;
use log::{debug, trace, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct PoolState {
    /// Every allocator this pool has ever created.
    allocators: Vec<CommandAllocatorId>,
    /// Discarded allocators in discard order, each tagged with the fence
    /// value that must complete before it may be reset.
    ready: VecDeque<(u64, CommandAllocatorId)>,
}

/// A per-queue-type pool that lends out command allocators and reclaims
/// them only after the GPU has provably finished using them.
///
/// The ready FIFO is ordered by discard time. Fence values are issued in
/// increasing order on the owning queue, so the oldest pending allocator is
/// also the first to become eligible, and checking only the FIFO head is
/// sufficient.
#[derive(Debug)]
pub struct CommandAllocatorPool {
    device: Arc<dyn GpuDevice>,
    queue_type: QueueType,
    state: Mutex<PoolState>,
}

impl CommandAllocatorPool {
    /// Creates an empty pool for one queue family.
    pub fn new(device: Arc<dyn GpuDevice>, queue_type: QueueType) -> Self {
        CommandAllocatorPool {
            device,
            queue_type,
            state: Mutex::new(PoolState::default()),
        }
    }

    /// Returns an allocator that is safe to record into.
    ///
    /// If the oldest discarded allocator's fence value is at or below
    /// `completed_fence_value`, it is reset and reused. Otherwise a fresh
    /// allocator is created from the device.
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` / `GpuError::OutOfMemory` - Allocator
    ///   creation or reset failure; fatal to this pool, never retried.
    pub fn request_allocator(
        &self,
        completed_fence_value: u64,
    ) -> Result<CommandAllocatorId, GpuError> {
        let mut state = self.state.lock().unwrap();

        if let Some(&(fence_value, allocator)) = state.ready.front() {
            if fence_value <= completed_fence_value {
                state.ready.pop_front();
                self.device.reset_command_allocator(allocator)?;
                trace!(
                    "{}: reusing allocator {:?} (retired at {:#x})",
                    self.queue_type,
                    allocator,
                    fence_value
                );
                return Ok(allocator);
            }
        }

        // Nothing is reusable yet; grow the pool instead.
        let label = format!("CommandAllocator {}", state.allocators.len());
        let allocator = self.device.create_command_allocator(self.queue_type, Some(&label))?;
        state.allocators.push(allocator);
        debug!(
            "{}: created {} ({} total)",
            self.queue_type,
            label,
            state.allocators.len()
        );
        Ok(allocator)
    }

    /// Returns an allocator to the pool.
    ///
    /// `fence_value` is the ticket that will be signaled once the GPU
    /// finishes the work recorded through this allocator; the queue
    /// supplies it at submission time. The allocator must not be reset
    /// before that value completes.
    pub fn discard_allocator(&self, fence_value: FenceValue, allocator: CommandAllocatorId) {
        let mut state = self.state.lock().unwrap();
        trace!(
            "{}: discarded allocator {:?} until {}",
            self.queue_type,
            allocator,
            fence_value
        );
        state.ready.push_back((fence_value.raw(), allocator));
    }

    /// Releases every allocator the pool has created.
    ///
    /// Only legal once the owning queue is idle: no pending GPU work may
    /// still reference any allocator. Runs automatically on drop.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.ready.is_empty() {
            warn!(
                "{}: shutting down pool with {} allocators still tagged pending",
                self.queue_type,
                state.ready.len()
            );
        }
        state.ready.clear();
        for allocator in state.allocators.drain(..) {
            self.device.destroy_command_allocator(allocator);
        }
    }

    /// Number of allocators this pool has ever created.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().allocators.len()
    }

    /// Whether the pool has created no allocators yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for CommandAllocatorPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
