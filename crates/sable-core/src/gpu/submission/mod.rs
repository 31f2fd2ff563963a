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

//! Command submission: queues, allocator recycling and fence routing.
//!
//! The flow: a caller asks the [`CommandListManager`] for a new command
//! list → the matching [`CommandQueue`] lends a recycled or fresh
//! allocator from its [`CommandAllocatorPool`] → the caller records and
//! submits → the queue signals its fence and returns the signaled value as
//! a completion ticket → the allocator goes back to the pool tagged with
//! that ticket, and is only reset for reuse once the GPU has reached it.

mod allocator_pool;
mod manager;
mod queue;

pub use self::allocator_pool::CommandAllocatorPool;
pub use self::manager::CommandListManager;
pub use self::queue::CommandQueue;
