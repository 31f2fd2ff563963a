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

//! An in-process [`GpuDevice`] that models hardware queue timelines.
//!
//! Each queue is an ordered op list (`Execute`, `Signal`, `WaitFor`). In
//! immediate mode every op retires as soon as its GPU-side prerequisites
//! allow, so fences complete the instant they are signaled. In manual mode
//! ops accumulate and a test drives progress with [`SoftwareDevice::retire_next`]
//! or [`SoftwareDevice::retire_all`], which is what lets the blocking-wait
//! and allocator-recycling paths be exercised deterministically.
//!
//! CPU-side fence waits block on a condvar that is notified whenever any
//! fence advances or the device is lost.

use log::{debug, trace};
use sable_core::gpu::{
    CommandAllocatorId, CommandListId, CommandQueueDescriptor, DescriptorHeapId,
    DescriptorHeapInfo, DescriptorHeapType, FenceId, GpuDevice, GpuError, QueueId, QueueType,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};

/// Shader-visible addresses live in a distinct half of the address space
/// so a GPU address can never be mistaken for a CPU one.
const GPU_VA_BASE: u64 = 1 << 63;

/// One recorded step on a queue's execution timeline.
#[derive(Debug, Clone, Copy)]
enum TimelineOp {
    /// Run a submitted command list.
    Execute(u64),
    /// Advance a fence to a value once execution reaches this point.
    Signal { fence: u64, value: u64 },
    /// Hold execution until a fence has reached a value.
    WaitFor { fence: u64, value: u64 },
}

#[derive(Debug)]
struct QueueState {
    queue_type: QueueType,
    timeline: VecDeque<TimelineOp>,
}

#[derive(Debug)]
struct FenceState {
    completed: u64,
}

#[derive(Debug)]
struct AllocatorState {
    queue_type: QueueType,
}

#[derive(Debug)]
struct ListState {
    allocator: u64,
    closed: bool,
}

#[derive(Debug)]
struct HeapState {
    cpu_start: u64,
}

#[derive(Debug, Default)]
struct DeviceState {
    lost: Option<String>,
    queues: HashMap<u64, QueueState>,
    fences: HashMap<u64, FenceState>,
    allocators: HashMap<u64, AllocatorState>,
    lists: HashMap<u64, ListState>,
    heaps: HashMap<u64, HeapState>,
    allocators_created: u64,
    lists_created: u64,
    heaps_created: u64,
    next_heap_cpu_base: u64,
}

/// A simulated logical device.
#[derive(Debug)]
pub struct SoftwareDevice {
    state: Mutex<DeviceState>,
    fence_advanced: Condvar,
    auto_retire: bool,
    next_id: AtomicU64,
}

impl SoftwareDevice {
    /// An immediate-mode device: submitted work retires as soon as its
    /// GPU-side prerequisites allow.
    pub fn new() -> Self {
        Self::with_auto_retire(true)
    }

    /// A manual-mode device: submitted work sits on the queue timelines
    /// until [`SoftwareDevice::retire_next`] / [`SoftwareDevice::retire_all`]
    /// advance them.
    pub fn manual() -> Self {
        Self::with_auto_retire(false)
    }

    fn with_auto_retire(auto_retire: bool) -> Self {
        SoftwareDevice {
            state: Mutex::new(DeviceState {
                next_heap_cpu_base: 0x1000,
                ..DeviceState::default()
            }),
            fence_advanced: Condvar::new(),
            auto_retire,
            next_id: AtomicU64::new(0),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn ensure_live(state: &DeviceState) -> Result<(), GpuError> {
        match &state.lost {
            Some(reason) => Err(GpuError::DeviceLost {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Marks the device lost. Every subsequent fallible operation fails
    /// with [`GpuError::DeviceLost`], and blocked fence waiters wake with
    /// the same error.
    pub fn lose_device(&self, reason: &str) {
        let mut state = self.state.lock().unwrap();
        debug!("software device lost: {reason}");
        state.lost = Some(reason.to_string());
        self.fence_advanced.notify_all();
    }

    /// Retires ops on one queue up to and including its next fence signal.
    ///
    /// Returns `false` if the queue made no progress, either because its
    /// timeline is empty or because its head is a `WaitFor` whose fence has
    /// not reached the target yet.
    pub fn retire_next(&self, queue: QueueId) -> bool {
        let mut state = self.state.lock().unwrap();
        let progressed = Self::step_queue(&mut state, queue.0, true);
        self.fence_advanced.notify_all();
        progressed
    }

    /// Pumps every queue until no queue can make progress, resolving
    /// cross-queue waits along the way.
    pub fn retire_all(&self) {
        let mut state = self.state.lock().unwrap();
        Self::pump(&mut state);
        self.fence_advanced.notify_all();
    }

    /// Number of ops still pending on a queue's timeline.
    pub fn pending_op_count(&self, queue: QueueId) -> usize {
        let state = self.state.lock().unwrap();
        state.queues.get(&queue.0).map_or(0, |q| q.timeline.len())
    }

    /// Total command allocators ever created on this device.
    pub fn allocators_created(&self) -> u64 {
        self.state.lock().unwrap().allocators_created
    }

    /// Total command lists ever created on this device.
    pub fn lists_created(&self) -> u64 {
        self.state.lock().unwrap().lists_created
    }

    /// Total descriptor heaps ever created on this device.
    pub fn heaps_created(&self) -> u64 {
        self.state.lock().unwrap().heaps_created
    }

    /// The CPU base address of a live descriptor heap.
    pub fn heap_cpu_start(&self, heap: DescriptorHeapId) -> Option<u64> {
        let state = self.state.lock().unwrap();
        state.heaps.get(&heap.0).map(|h| h.cpu_start)
    }

    /// Processes a queue's timeline from the front.
    ///
    /// `WaitFor` holds the queue (FIFO order is preserved; nothing behind
    /// the wait may run early). `Signal` raises the fence monotonically.
    fn step_queue(state: &mut DeviceState, queue: u64, stop_after_signal: bool) -> bool {
        let mut progressed = false;
        loop {
            let op = match state.queues.get(&queue).and_then(|q| q.timeline.front()) {
                Some(&op) => op,
                None => break,
            };
            match op {
                TimelineOp::WaitFor { fence, value } => {
                    // A wait on a destroyed fence is treated as satisfied.
                    let completed = state.fences.get(&fence).map_or(u64::MAX, |f| f.completed);
                    if completed < value {
                        break;
                    }
                    Self::pop_front(state, queue);
                    progressed = true;
                }
                TimelineOp::Execute(list) => {
                    Self::pop_front(state, queue);
                    trace!("queue {queue}: executed list {list}");
                    progressed = true;
                }
                TimelineOp::Signal { fence, value } => {
                    Self::pop_front(state, queue);
                    if let Some(fence_state) = state.fences.get_mut(&fence) {
                        fence_state.completed = fence_state.completed.max(value);
                        trace!("queue {queue}: fence {fence} -> {value:#x}");
                    }
                    progressed = true;
                    if stop_after_signal {
                        break;
                    }
                }
            }
        }
        progressed
    }

    fn pop_front(state: &mut DeviceState, queue: u64) {
        if let Some(queue_state) = state.queues.get_mut(&queue) {
            queue_state.timeline.pop_front();
        }
    }

    fn pump(state: &mut DeviceState) {
        loop {
            let queues: Vec<u64> = state.queues.keys().copied().collect();
            let mut progressed = false;
            for queue in queues {
                progressed |= Self::step_queue(state, queue, false);
            }
            if !progressed {
                break;
            }
        }
    }

    const fn increment_for(heap_type: DescriptorHeapType) -> u32 {
        match heap_type {
            DescriptorHeapType::CbvSrvUav => 32,
            DescriptorHeapType::Sampler => 16,
            DescriptorHeapType::RenderTarget => 8,
            DescriptorHeapType::DepthStencil => 8,
        }
    }

    /// Runs the pump in immediate mode and wakes CPU waiters.
    fn after_enqueue(&self, state: &mut DeviceState) {
        if self.auto_retire {
            Self::pump(state);
        }
        self.fence_advanced.notify_all();
    }
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuDevice for SoftwareDevice {
    fn create_command_queue(
        &self,
        descriptor: &CommandQueueDescriptor,
    ) -> Result<QueueId, GpuError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_live(&state)?;
        let id = self.next_id();
        debug!(
            "created queue {id} ({:?}, {:?})",
            descriptor.label, descriptor.priority
        );
        state.queues.insert(
            id,
            QueueState {
                queue_type: descriptor.queue_type,
                timeline: VecDeque::new(),
            },
        );
        Ok(QueueId(id))
    }

    fn destroy_command_queue(&self, queue: QueueId) {
        let mut state = self.state.lock().unwrap();
        state.queues.remove(&queue.0);
    }

    fn submit(&self, queue: QueueId, list: CommandListId) -> Result<(), GpuError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_live(&state)?;
        match state.lists.get(&list.0) {
            None => {
                return Err(GpuError::InvalidHandle {
                    kind: "command list",
                    id: list.0,
                })
            }
            Some(list_state) if !list_state.closed => {
                return Err(GpuError::InvalidOperation {
                    what: format!("submitting unclosed command list {}", list.0),
                });
            }
            Some(_) => {}
        }
        let queue_state = state.queues.get_mut(&queue.0).ok_or(GpuError::InvalidHandle {
            kind: "queue",
            id: queue.0,
        })?;
        queue_state.timeline.push_back(TimelineOp::Execute(list.0));
        self.after_enqueue(&mut state);
        Ok(())
    }

    fn queue_signal(&self, queue: QueueId, fence: FenceId, value: u64) -> Result<(), GpuError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_live(&state)?;
        if !state.fences.contains_key(&fence.0) {
            return Err(GpuError::InvalidHandle {
                kind: "fence",
                id: fence.0,
            });
        }
        let queue_state = state.queues.get_mut(&queue.0).ok_or(GpuError::InvalidHandle {
            kind: "queue",
            id: queue.0,
        })?;
        queue_state
            .timeline
            .push_back(TimelineOp::Signal { fence: fence.0, value });
        self.after_enqueue(&mut state);
        Ok(())
    }

    fn queue_wait(&self, queue: QueueId, fence: FenceId, value: u64) -> Result<(), GpuError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_live(&state)?;
        if !state.fences.contains_key(&fence.0) {
            return Err(GpuError::InvalidHandle {
                kind: "fence",
                id: fence.0,
            });
        }
        let queue_state = state.queues.get_mut(&queue.0).ok_or(GpuError::InvalidHandle {
            kind: "queue",
            id: queue.0,
        })?;
        queue_state
            .timeline
            .push_back(TimelineOp::WaitFor { fence: fence.0, value });
        self.after_enqueue(&mut state);
        Ok(())
    }

    fn create_fence(&self, initial_value: u64, label: Option<&str>) -> Result<FenceId, GpuError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_live(&state)?;
        let id = self.next_id();
        debug!("created fence {id} ({label:?}) at {initial_value:#x}");
        state.fences.insert(
            id,
            FenceState {
                completed: initial_value,
            },
        );
        Ok(FenceId(id))
    }

    fn destroy_fence(&self, fence: FenceId) {
        let mut state = self.state.lock().unwrap();
        state.fences.remove(&fence.0);
        // Anyone GPU-waiting on this fence is now satisfied.
        self.fence_advanced.notify_all();
    }

    fn signal_fence(&self, fence: FenceId, value: u64) -> Result<(), GpuError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_live(&state)?;
        let fence_state = state.fences.get_mut(&fence.0).ok_or(GpuError::InvalidHandle {
            kind: "fence",
            id: fence.0,
        })?;
        fence_state.completed = fence_state.completed.max(value);
        self.after_enqueue(&mut state);
        Ok(())
    }

    fn fence_completed_value(&self, fence: FenceId) -> u64 {
        let state = self.state.lock().unwrap();
        match state.fences.get(&fence.0) {
            Some(fence_state) => fence_state.completed,
            None => {
                debug_assert!(false, "queried destroyed fence {}", fence.0);
                0
            }
        }
    }

    fn wait_fence(&self, fence: FenceId, value: u64) -> Result<(), GpuError> {
        let mut state = self.state.lock().unwrap();
        loop {
            Self::ensure_live(&state)?;
            let completed = state
                .fences
                .get(&fence.0)
                .ok_or(GpuError::InvalidHandle {
                    kind: "fence",
                    id: fence.0,
                })?
                .completed;
            if completed >= value {
                return Ok(());
            }
            state = self.fence_advanced.wait(state).unwrap();
        }
    }

    fn create_command_allocator(
        &self,
        queue_type: QueueType,
        label: Option<&str>,
    ) -> Result<CommandAllocatorId, GpuError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_live(&state)?;
        let id = self.next_id();
        state.allocators_created += 1;
        trace!("created allocator {id} ({label:?}) for {queue_type}");
        state.allocators.insert(id, AllocatorState { queue_type });
        Ok(CommandAllocatorId(id))
    }

    fn reset_command_allocator(&self, allocator: CommandAllocatorId) -> Result<(), GpuError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_live(&state)?;
        if !state.allocators.contains_key(&allocator.0) {
            return Err(GpuError::InvalidHandle {
                kind: "command allocator",
                id: allocator.0,
            });
        }
        Ok(())
    }

    fn destroy_command_allocator(&self, allocator: CommandAllocatorId) {
        let mut state = self.state.lock().unwrap();
        state.allocators.remove(&allocator.0);
    }

    fn create_command_list(
        &self,
        queue_type: QueueType,
        allocator: CommandAllocatorId,
        label: Option<&str>,
    ) -> Result<CommandListId, GpuError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_live(&state)?;
        match state.allocators.get(&allocator.0) {
            None => {
                return Err(GpuError::InvalidHandle {
                    kind: "command allocator",
                    id: allocator.0,
                })
            }
            Some(allocator_state) => {
                debug_assert_eq!(
                    allocator_state.queue_type, queue_type,
                    "command list opened on an allocator of another queue family"
                );
            }
        }
        let id = self.next_id();
        state.lists_created += 1;
        trace!("created list {id} ({label:?}) on allocator {}", allocator.0);
        state.lists.insert(
            id,
            ListState {
                allocator: allocator.0,
                closed: false,
            },
        );
        Ok(CommandListId(id))
    }

    fn close_command_list(&self, list: CommandListId) -> Result<(), GpuError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_live(&state)?;
        let list_state = state.lists.get_mut(&list.0).ok_or(GpuError::InvalidHandle {
            kind: "command list",
            id: list.0,
        })?;
        if list_state.closed {
            return Err(GpuError::InvalidOperation {
                what: format!("command list {} closed twice", list.0),
            });
        }
        list_state.closed = true;
        Ok(())
    }

    fn create_descriptor_heap(
        &self,
        heap_type: DescriptorHeapType,
        capacity: u32,
        label: Option<&str>,
    ) -> Result<DescriptorHeapInfo, GpuError> {
        let mut state = self.state.lock().unwrap();
        Self::ensure_live(&state)?;
        let id = self.next_id();
        let increment = u64::from(Self::increment_for(heap_type));
        let cpu_start = state.next_heap_cpu_base;
        state.next_heap_cpu_base += u64::from(capacity) * increment;
        state.heaps_created += 1;
        debug!("created heap {id} ({label:?}), {capacity} slots at {cpu_start:#x}");
        state.heaps.insert(id, HeapState { cpu_start });
        Ok(DescriptorHeapInfo {
            id: DescriptorHeapId(id),
            cpu_start,
            gpu_start: heap_type.is_shader_visible().then_some(GPU_VA_BASE | cpu_start),
        })
    }

    fn descriptor_increment_size(&self, heap_type: DescriptorHeapType) -> u32 {
        Self::increment_for(heap_type)
    }
}
