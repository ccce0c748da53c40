// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! Thread-scoped cooperative message-dispatch runtime.
//!
//! The core is the Looper/Handler/Message trio: each [`Looper`] owns one
//! thread and one time-ordered [`MessageQueue`]; [`Handler`]s submit
//! messages and closures to it from any thread; dispatch is strictly
//! serial on the owning thread. [`WorkerThread`] bundles the bootstrap
//! (spawn, prepare, publish, run) behind a small task-posting surface,
//! and [`Debouncer`] / [`Throttler`] layer call coalescing and rate
//! limiting on top.
//!
//! # Execution model
//!
//! - Native OS threads, no async runtime. One consumer per queue,
//!   arbitrary producers.
//! - Delivery times use the monotonic clock ([`std::time::Instant`]);
//!   wall-clock adjustments do not affect scheduled work.
//! - Shutdown is terminal and two-flavored: graceful (drain what is due)
//!   or immediate (discard what is pending).
//!
//! # Example
//!
//! ```ignore
//! use spindle_runtime::WorkerThread;
//!
//! let mut worker = WorkerThread::new("uploader");
//! worker.start()?;
//! worker.post(|| upload_pending_batches())?;
//! worker.finish()?;
//! worker.join();
//! ```
//!
//! The [`sync`] module carries the companion primitives that share the
//! same discipline: a closable blocking FIFO and a lock-free SPSC sample
//! ring.

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod error;
mod handler;
mod looper;
mod message;
mod queue;
pub mod sync;
pub mod worker;

pub use error::{Error, Result};
pub use handler::{HandleMessage, Handler};
pub use looper::Looper;
pub use message::{Callback, Message};
pub use queue::{MessageQueue, QuitMode};
pub use worker::{Debouncer, Throttler, WorkerThread};
