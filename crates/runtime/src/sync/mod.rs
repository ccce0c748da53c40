// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! Companion concurrency primitives sharing the runtime's discipline.

mod blocking_queue;
pub mod spsc;

pub use blocking_queue::{BlockingQueue, PushError};
