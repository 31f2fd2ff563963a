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

//! Bump allocation of descriptor ranges over fixed-capacity heaps.
//!
//! The allocator is strictly append-only for the life of the process:
//! heaps are retired wholesale and replaced when exhausted, never
//! compacted or partially freed. Heap count stays small at engine scope,
//! so the memory traded away is cheap relative to the simplicity bought.

use crate::gpu::error::GpuError;
use crate::gpu::handle::DescriptorHeapId;
use crate::gpu::traits::GpuDevice;
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Fixed capacity of every heap the allocator requests.
pub const NUM_DESCRIPTORS_PER_HEAP: u32 = 256;

/// The descriptor heap families exposed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorHeapType {
    /// Constant-buffer, shader-resource and unordered-access views.
    CbvSrvUav,
    /// Sampler descriptors.
    Sampler,
    /// Render-target views.
    RenderTarget,
    /// Depth-stencil views.
    DepthStencil,
}

impl DescriptorHeapType {
    /// Whether heaps of this type carry a GPU-visible address range that
    /// shaders can index, in addition to the CPU-visible one.
    pub const fn is_shader_visible(self) -> bool {
        matches!(self, DescriptorHeapType::CbvSrvUav | DescriptorHeapType::Sampler)
    }

    /// A human-readable name, used to label heaps created for this type.
    pub const fn label(self) -> &'static str {
        match self {
            DescriptorHeapType::CbvSrvUav => "CBV/SRV/UAV Descriptor Heap",
            DescriptorHeapType::Sampler => "Sampler Descriptor Heap",
            DescriptorHeapType::RenderTarget => "RTV Descriptor Heap",
            DescriptorHeapType::DepthStencil => "DSV Descriptor Heap",
        }
    }
}

impl fmt::Display for DescriptorHeapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the device reports back for a freshly created heap.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorHeapInfo {
    /// The heap's opaque handle.
    pub id: DescriptorHeapId,
    /// CPU-visible address of the heap's first descriptor slot.
    pub cpu_start: u64,
    /// GPU-visible address of the first slot, for shader-visible heap types.
    pub gpu_start: Option<u64>,
}

/// A descriptor range handed out by [`DescriptorAllocator::allocate`].
///
/// Bundles the owning heap, the range's base addresses and the
/// per-descriptor stride, so descriptor-write APIs can address any slot in
/// the range without consulting the allocator again.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorHandle {
    heap: DescriptorHeapId,
    cpu: u64,
    gpu: Option<u64>,
    increment: u32,
}

impl DescriptorHandle {
    /// The heap this range lives in.
    pub fn heap(&self) -> DescriptorHeapId {
        self.heap
    }

    /// CPU-visible address of the first descriptor in the range.
    pub fn cpu(&self) -> u64 {
        self.cpu
    }

    /// GPU-visible address of the first descriptor, if the heap type is
    /// shader visible.
    pub fn gpu(&self) -> Option<u64> {
        self.gpu
    }

    /// The per-descriptor address stride.
    pub fn increment(&self) -> u32 {
        self.increment
    }

    /// CPU-visible address of the descriptor at `index` within the range.
    pub fn cpu_at(&self, index: u32) -> u64 {
        self.cpu + u64::from(index) * u64::from(self.increment)
    }

    /// GPU-visible address of the descriptor at `index` within the range.
    pub fn gpu_at(&self, index: u32) -> Option<u64> {
        self.gpu.map(|gpu| gpu + u64::from(index) * u64::from(self.increment))
    }

    /// Whether shaders can index this range directly.
    pub fn is_shader_visible(&self) -> bool {
        self.gpu.is_some()
    }
}

/// Cursor state over the heap currently being carved up.
#[derive(Debug)]
struct CurrentHeap {
    id: DescriptorHeapId,
    cpu_cursor: u64,
    gpu_cursor: Option<u64>,
    remaining: u32,
}

/// Cheap, contention-free bump allocation of descriptor ranges for one
/// heap type.
///
/// Not internally thread-safe: allocation takes `&mut self`, and the
/// intended use is one allocator instance per recording context or thread.
/// There is no free operation; see the module docs.
#[derive(Debug)]
pub struct DescriptorAllocator {
    device: Arc<dyn GpuDevice>,
    heap_type: DescriptorHeapType,
    current: Option<CurrentHeap>,
    increment: u32,
}

impl DescriptorAllocator {
    /// Creates an allocator for one heap type. No heap is requested until
    /// the first [`DescriptorAllocator::allocate`] call.
    pub fn new(device: Arc<dyn GpuDevice>, heap_type: DescriptorHeapType) -> Self {
        DescriptorAllocator {
            device,
            heap_type,
            current: None,
            increment: 0,
        }
    }

    /// The heap type this allocator serves.
    pub fn heap_type(&self) -> DescriptorHeapType {
        self.heap_type
    }

    /// Allocates `count` contiguous descriptor slots.
    ///
    /// If the current heap cannot satisfy the request, it is abandoned and
    /// a fresh heap is requested from the device; a request is never split
    /// across two heaps. `count` larger than a full heap is caller misuse
    /// (debug assertion; unchecked in release builds).
    ///
    /// ## Errors
    /// * `GpuError::DeviceLost` / `GpuError::OutOfMemory` - If a fresh heap
    ///   cannot be created. Fatal to this allocator.
    pub fn allocate(&mut self, count: u32) -> Result<DescriptorHandle, GpuError> {
        debug_assert!(count > 0, "descriptor allocation of zero slots");
        debug_assert!(
            count <= NUM_DESCRIPTORS_PER_HEAP,
            "descriptor allocation of {} slots exceeds heap capacity {}",
            count,
            NUM_DESCRIPTORS_PER_HEAP
        );

        match self.current {
            Some(ref mut heap) if heap.remaining >= count => {
                Ok(Self::bump(heap, count, self.increment))
            }
            _ => {
                let info = self.device.create_descriptor_heap(
                    self.heap_type,
                    NUM_DESCRIPTORS_PER_HEAP,
                    Some(self.heap_type.label()),
                )?;
                if self.increment == 0 {
                    self.increment = self.device.descriptor_increment_size(self.heap_type);
                }
                debug!(
                    "{}: acquired heap {:?} ({} slots)",
                    self.heap_type,
                    info.id,
                    NUM_DESCRIPTORS_PER_HEAP
                );
                let heap = self.current.insert(CurrentHeap {
                    id: info.id,
                    cpu_cursor: info.cpu_start,
                    gpu_cursor: info.gpu_start,
                    remaining: NUM_DESCRIPTORS_PER_HEAP,
                });
                Ok(Self::bump(heap, count, self.increment))
            }
        }
    }

    /// Captures the cursor as the returned range, then advances it.
    fn bump(heap: &mut CurrentHeap, count: u32, increment: u32) -> DescriptorHandle {
        let handle = DescriptorHandle {
            heap: heap.id,
            cpu: heap.cpu_cursor,
            gpu: heap.gpu_cursor,
            increment,
        };
        let stride = u64::from(count) * u64::from(increment);
        heap.cpu_cursor += stride;
        if let Some(gpu_cursor) = heap.gpu_cursor.as_mut() {
            *gpu_cursor += stride;
        }
        heap.remaining -= count;
        handle
    }
}
