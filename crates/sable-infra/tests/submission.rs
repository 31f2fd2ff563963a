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

//! End-to-end submission scenarios against the software device.

use sable_core::gpu::{
    CommandAllocatorPool, CommandListManager, CommandListType, FenceValue, GpuError, QueueType,
};
use sable_infra::SoftwareDevice;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn tickets_increase_in_submission_order() {
    init_logging();
    let device = Arc::new(SoftwareDevice::manual());
    let manager = CommandListManager::new(device.clone()).unwrap();
    let graphics = manager.graphics_queue();

    let mut tickets = Vec::new();
    for _ in 0..3 {
        let (list, allocator) = manager
            .create_new_command_list(CommandListType::Direct)
            .unwrap();
        let ticket = graphics.execute_command_list(list).unwrap();
        graphics.discard_allocator(ticket, allocator);
        tickets.push(ticket);
    }

    assert_eq!(
        tickets,
        vec![
            FenceValue::new(QueueType::Graphics, 1),
            FenceValue::new(QueueType::Graphics, 2),
            FenceValue::new(QueueType::Graphics, 3),
        ]
    );
    // Nothing retired yet, and each submission grew the pool.
    assert!(!manager.is_fence_complete(tickets[0]));
    assert_eq!(graphics.allocator_pool().len(), 3);

    device.retire_all();
    for ticket in &tickets {
        assert!(manager.is_fence_complete(*ticket));
    }
}

#[test]
fn wait_blocks_until_the_submission_retires() {
    init_logging();
    let device = Arc::new(SoftwareDevice::manual());
    let manager = CommandListManager::new(device.clone()).unwrap();
    let graphics = manager.graphics_queue();
    let graphics_id = graphics.id();

    let mut tickets = Vec::new();
    for _ in 0..2 {
        let (list, allocator) = manager
            .create_new_command_list(CommandListType::Direct)
            .unwrap();
        let ticket = graphics.execute_command_list(list).unwrap();
        graphics.discard_allocator(ticket, allocator);
        tickets.push(ticket);
    }
    let second = tickets[1];

    let (done_tx, done_rx) = mpsc::channel();
    thread::scope(|scope| {
        scope.spawn(move || {
            manager.wait_for_fence(second).unwrap();
            done_tx.send(()).unwrap();
        });

        // Nothing retired: the waiter must still be blocked.
        assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());

        // First submission retires; the waiter is after the second.
        assert!(device.retire_next(graphics_id));
        assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());

        assert!(device.retire_next(graphics_id));
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    });
}

#[test]
fn fence_completion_is_monotone() {
    init_logging();
    let device = Arc::new(SoftwareDevice::manual());
    let manager = CommandListManager::new(device.clone()).unwrap();
    let graphics = manager.graphics_queue();
    let graphics_id = graphics.id();

    let mut tickets = Vec::new();
    for _ in 0..3 {
        let (list, allocator) = manager
            .create_new_command_list(CommandListType::Direct)
            .unwrap();
        let ticket = graphics.execute_command_list(list).unwrap();
        graphics.discard_allocator(ticket, allocator);
        tickets.push(ticket);
    }

    assert!(device.retire_next(graphics_id));
    assert!(device.retire_next(graphics_id));

    assert!(graphics.is_fence_complete(tickets[1]));
    // Once true for a value, it stays true for it and everything below.
    assert!(graphics.is_fence_complete(tickets[0]));
    assert!(graphics.is_fence_complete(tickets[1]));
    assert!(!graphics.is_fence_complete(tickets[2]));

    assert!(device.retire_next(graphics_id));
    assert!(graphics.is_fence_complete(tickets[2]));
}

#[test]
fn pool_reuses_allocators_in_fifo_order() {
    init_logging();
    let device = Arc::new(SoftwareDevice::new());
    let pool = CommandAllocatorPool::new(device.clone(), QueueType::Graphics);

    let first = pool.request_allocator(0).unwrap();
    pool.discard_allocator(FenceValue::new(QueueType::Graphics, 10), first);

    // Completed value below the discard fence: must not reuse.
    let second = pool.request_allocator(9).unwrap();
    assert_ne!(second, first);
    assert_eq!(pool.len(), 2);

    pool.discard_allocator(FenceValue::new(QueueType::Graphics, 11), second);

    // At the discard fence exactly: the oldest pending allocator comes back.
    let third = pool.request_allocator(10).unwrap();
    assert_eq!(third, first);
    let fourth = pool.request_allocator(11).unwrap();
    assert_eq!(fourth, second);
    assert_eq!(pool.len(), 2);
}

#[test]
fn allocator_recycles_through_queue_after_retire() {
    init_logging();
    let device = Arc::new(SoftwareDevice::manual());
    let manager = CommandListManager::new(device.clone()).unwrap();
    let graphics = manager.graphics_queue();

    let (list, allocator) = manager
        .create_new_command_list(CommandListType::Direct)
        .unwrap();
    let ticket = graphics.execute_command_list(list).unwrap();
    graphics.discard_allocator(ticket, allocator);

    // GPU has not reached the ticket: a second request must not hand the
    // same allocator out again.
    let fresh = graphics.request_allocator().unwrap();
    assert_ne!(fresh, allocator);

    device.retire_all();
    let recycled = graphics.request_allocator().unwrap();
    assert_eq!(recycled, allocator);
    assert_eq!(graphics.allocator_pool().len(), 2);
}

#[test]
fn stall_orders_compute_behind_graphics() {
    init_logging();
    let device = Arc::new(SoftwareDevice::manual());
    let manager = CommandListManager::new(device.clone()).unwrap();
    let graphics = manager.graphics_queue();
    let compute = manager.compute_queue();

    let (list, allocator) = manager
        .create_new_command_list(CommandListType::Direct)
        .unwrap();
    let graphics_ticket = graphics.execute_command_list(list).unwrap();
    graphics.discard_allocator(graphics_ticket, allocator);

    manager
        .stall_for_fence(QueueType::Compute, graphics_ticket)
        .unwrap();
    let (list, allocator) = manager
        .create_new_command_list(CommandListType::Compute)
        .unwrap();
    let compute_ticket = compute.execute_command_list(list).unwrap();
    compute.discard_allocator(compute_ticket, allocator);
    assert_eq!(device.pending_op_count(compute.id()), 3);

    // Compute is held by the stall until graphics retires.
    assert!(!device.retire_next(compute.id()));
    assert!(device.retire_next(graphics.id()));
    assert!(device.retire_next(compute.id()));
    assert!(manager.is_fence_complete(compute_ticket));
}

#[test]
fn stall_on_completed_fence_is_a_noop() {
    init_logging();
    let device = Arc::new(SoftwareDevice::manual());
    let manager = CommandListManager::new(device.clone()).unwrap();
    let graphics = manager.graphics_queue();
    let compute = manager.compute_queue();

    let (list, allocator) = manager
        .create_new_command_list(CommandListType::Direct)
        .unwrap();
    let ticket = graphics.execute_command_list(list).unwrap();
    graphics.discard_allocator(ticket, allocator);
    device.retire_all();
    assert!(manager.is_fence_complete(ticket));

    manager.stall_for_fence(QueueType::Compute, ticket).unwrap();
    // The wait is satisfied immediately; the queue drains without help.
    assert!(device.retire_next(compute.id()));
    assert_eq!(device.pending_op_count(compute.id()), 0);
}

#[test]
fn compute_tickets_route_to_the_compute_queue() {
    init_logging();
    let device = Arc::new(SoftwareDevice::manual());
    let manager = CommandListManager::new(device.clone()).unwrap();
    let graphics = manager.graphics_queue();
    let compute = manager.compute_queue();

    let (list, allocator) = manager
        .create_new_command_list(CommandListType::Direct)
        .unwrap();
    let graphics_ticket = graphics.execute_command_list(list).unwrap();
    graphics.discard_allocator(graphics_ticket, allocator);

    let (list, allocator) = manager
        .create_new_command_list(CommandListType::Compute)
        .unwrap();
    let compute_ticket = compute.execute_command_list(list).unwrap();
    compute.discard_allocator(compute_ticket, allocator);

    assert_eq!(compute_ticket.queue_type(), QueueType::Compute);
    assert_eq!(compute_ticket, FenceValue::new(QueueType::Compute, 1));

    // Retire only compute; routing must not confuse the two queues.
    assert!(device.retire_next(compute.id()));
    assert!(manager.is_fence_complete(compute_ticket));
    assert!(!manager.is_fence_complete(graphics_ticket));
}

#[test]
fn increment_fence_stamps_the_timeline() {
    init_logging();
    let device = Arc::new(SoftwareDevice::manual());
    let manager = CommandListManager::new(device.clone()).unwrap();
    let graphics = manager.graphics_queue();

    let stamp = graphics.increment_fence().unwrap();
    assert_eq!(stamp, FenceValue::new(QueueType::Graphics, 1));
    assert!(!graphics.is_fence_complete(stamp));

    assert!(device.retire_next(graphics.id()));
    assert!(graphics.is_fence_complete(stamp));
    assert_eq!(
        graphics.next_fence_value(),
        FenceValue::new(QueueType::Graphics, 2)
    );
}

#[test]
fn wait_idle_drains_every_queue() {
    init_logging();
    let device = Arc::new(SoftwareDevice::new());
    let manager = CommandListManager::new(device.clone()).unwrap();

    for list_type in [
        CommandListType::Direct,
        CommandListType::Compute,
        CommandListType::Copy,
    ] {
        let queue = manager.queue(list_type.queue_type().unwrap());
        let (list, allocator) = manager.create_new_command_list(list_type).unwrap();
        let ticket = queue.execute_command_list(list).unwrap();
        queue.discard_allocator(ticket, allocator);
    }

    manager.wait_idle().unwrap();

    for queue_type in QueueType::ALL {
        let queue = manager.queue(queue_type);
        let stamped = FenceValue::from_raw(queue.next_fence_value().raw() - 1);
        assert!(queue.is_fence_complete(stamped));
    }
}

#[test]
fn device_loss_propagates_from_creation_and_submission() {
    init_logging();
    let device = Arc::new(SoftwareDevice::new());
    let manager = CommandListManager::new(device.clone()).unwrap();

    let (list, _allocator) = manager
        .create_new_command_list(CommandListType::Direct)
        .unwrap();

    device.lose_device("adapter removed");

    let error = manager
        .create_new_command_list(CommandListType::Direct)
        .unwrap_err();
    assert!(matches!(error, GpuError::DeviceLost { .. }));

    let error = manager
        .graphics_queue()
        .execute_command_list(list)
        .unwrap_err();
    assert!(matches!(error, GpuError::DeviceLost { .. }));
}

#[test]
fn device_loss_wakes_blocked_waiters() {
    init_logging();
    let device = Arc::new(SoftwareDevice::manual());
    let manager = CommandListManager::new(device.clone()).unwrap();
    let graphics = manager.graphics_queue();

    let (list, allocator) = manager
        .create_new_command_list(CommandListType::Direct)
        .unwrap();
    let ticket = graphics.execute_command_list(list).unwrap();
    graphics.discard_allocator(ticket, allocator);

    thread::scope(|scope| {
        let waiter = scope.spawn(|| manager.wait_for_fence(ticket));
        thread::sleep(Duration::from_millis(50));
        device.lose_device("adapter removed");
        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(GpuError::DeviceLost { .. })));
    });
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "bundle command lists are not supported")]
fn bundle_requests_are_rejected() {
    let device = Arc::new(SoftwareDevice::new());
    let manager = CommandListManager::new(device).unwrap();
    let _ = manager.create_new_command_list(CommandListType::Bundle);
}
