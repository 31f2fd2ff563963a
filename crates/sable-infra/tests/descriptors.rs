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

//! Descriptor allocation scenarios against the software device.

use sable_core::gpu::{DescriptorAllocator, DescriptorHeapType, NUM_DESCRIPTORS_PER_HEAP};
use sable_infra::SoftwareDevice;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn allocations_are_contiguous_within_a_heap() {
    init_logging();
    let device = Arc::new(SoftwareDevice::new());
    let mut allocator = DescriptorAllocator::new(device.clone(), DescriptorHeapType::CbvSrvUav);

    let first = allocator.allocate(1).unwrap();
    let second = allocator.allocate(5).unwrap();
    let third = allocator.allocate(10).unwrap();

    let increment = u64::from(first.increment());
    assert_eq!(second.cpu(), first.cpu() + increment);
    assert_eq!(third.cpu(), second.cpu() + 5 * increment);
    assert_eq!(first.heap(), third.heap());
    assert_eq!(device.heaps_created(), 1);

    // Shader-visible handles carry GPU addresses at the same offsets.
    let first_gpu = first.gpu().unwrap();
    assert_eq!(second.gpu().unwrap(), first_gpu + increment);
    assert_eq!(third.gpu().unwrap(), first_gpu + 6 * increment);
}

#[test]
fn indexed_addressing_matches_block_layout() {
    init_logging();
    let device = Arc::new(SoftwareDevice::new());
    let mut allocator = DescriptorAllocator::new(device, DescriptorHeapType::CbvSrvUav);

    let block = allocator.allocate(8).unwrap();
    let increment = u64::from(block.increment());
    assert_eq!(block.cpu_at(0), block.cpu());
    assert_eq!(block.cpu_at(7), block.cpu() + 7 * increment);
    assert_eq!(block.gpu_at(3), Some(block.gpu().unwrap() + 3 * increment));
}

#[test]
fn exhausted_heap_is_abandoned_for_a_fresh_one() {
    init_logging();
    let device = Arc::new(SoftwareDevice::new());
    let mut allocator = DescriptorAllocator::new(device.clone(), DescriptorHeapType::CbvSrvUav);

    let full = allocator.allocate(NUM_DESCRIPTORS_PER_HEAP).unwrap();
    assert_eq!(device.heaps_created(), 1);

    // The next request cannot fit and must come from a brand-new heap,
    // starting at its base.
    let next = allocator.allocate(1).unwrap();
    assert_eq!(device.heaps_created(), 2);
    assert_ne!(next.heap(), full.heap());
    assert_eq!(next.cpu(), device.heap_cpu_start(next.heap()).unwrap());
}

#[test]
fn blocks_never_straddle_heap_boundaries() {
    init_logging();
    let device = Arc::new(SoftwareDevice::new());
    let mut allocator = DescriptorAllocator::new(device.clone(), DescriptorHeapType::CbvSrvUav);

    let head = allocator.allocate(200).unwrap();
    // 56 descriptors remain: an exact fit stays in the same heap.
    let tail = allocator.allocate(56).unwrap();
    assert_eq!(tail.heap(), head.heap());
    assert_eq!(
        tail.cpu(),
        head.cpu() + 200 * u64::from(head.increment())
    );
    assert_eq!(device.heaps_created(), 1);

    // The heap is now full; even a single descriptor opens a new one.
    let overflow = allocator.allocate(1).unwrap();
    assert_ne!(overflow.heap(), head.heap());
    assert_eq!(device.heaps_created(), 2);
}

#[test]
fn heap_types_keep_independent_cursors() {
    init_logging();
    let device = Arc::new(SoftwareDevice::new());
    let mut resources = DescriptorAllocator::new(device.clone(), DescriptorHeapType::CbvSrvUav);
    let mut targets = DescriptorAllocator::new(device.clone(), DescriptorHeapType::RenderTarget);

    let resource = resources.allocate(4).unwrap();
    let target = targets.allocate(4).unwrap();

    assert_ne!(resource.heap(), target.heap());
    assert_eq!(device.heaps_created(), 2);

    // Allocating from one type must not move the other's cursor.
    let next_target = targets.allocate(1).unwrap();
    assert_eq!(
        next_target.cpu(),
        target.cpu() + 4 * u64::from(target.increment())
    );
}

#[test]
fn shader_visibility_follows_heap_type() {
    init_logging();
    let device = Arc::new(SoftwareDevice::new());

    let mut samplers = DescriptorAllocator::new(device.clone(), DescriptorHeapType::Sampler);
    let sampler = samplers.allocate(1).unwrap();
    assert!(sampler.is_shader_visible());
    assert!(sampler.gpu().is_some());
    assert_eq!(sampler.increment(), 16);

    let mut targets = DescriptorAllocator::new(device.clone(), DescriptorHeapType::RenderTarget);
    let target = targets.allocate(1).unwrap();
    assert!(!target.is_shader_visible());
    assert_eq!(target.gpu(), None);
    assert_eq!(target.gpu_at(0), None);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "exceeds heap capacity")]
fn oversized_requests_are_rejected() {
    let device = Arc::new(SoftwareDevice::new());
    let mut allocator = DescriptorAllocator::new(device, DescriptorHeapType::CbvSrvUav);
    let _ = allocator.allocate(NUM_DESCRIPTORS_PER_HEAP + 1);
}
