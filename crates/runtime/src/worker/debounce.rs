// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! Burst coalescing over a worker looper.

use std::{
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration,
};

use parking_lot::Mutex;

use crate::{error::Result, handler::Handler};

struct DebounceState<A> {
	epoch: AtomicU64,
	latest: Mutex<Option<A>>,
}

/// Coalesces a burst of calls into a single delayed invocation.
///
/// Every call replaces the recorded argument and restarts the window; the
/// wrapped function runs once, on the handler's looper thread, with the
/// most recent argument, after the window elapses without another call.
///
/// Each call publishes a new epoch and posts a delayed closure tagged with
/// it; a closure that wakes up under a newer epoch does nothing. Teardown
/// invalidates the current epoch, so no queue traversal is needed to
/// cancel.
pub struct Debouncer<A> {
	handler: Handler,
	func: Arc<dyn Fn(A) + Send + Sync>,
	window: Duration,
	state: Arc<DebounceState<A>>,
}

impl<A: Send + 'static> Debouncer<A> {
	/// Create a debouncer that runs `func` on `handler`'s looper.
	pub fn new(handler: Handler, window: Duration, func: impl Fn(A) + Send + Sync + 'static) -> Self {
		Self {
			handler,
			func: Arc::new(func),
			window,
			state: Arc::new(DebounceState {
				epoch: AtomicU64::new(0),
				latest: Mutex::new(None),
			}),
		}
	}

	/// Record `arg` and restart the debounce window.
	///
	/// Fails when the underlying queue is shutting down; an error means
	/// the pending invocation (if any) has been superseded but no new one
	/// was scheduled.
	pub fn call(&self, arg: A) -> Result<()> {
		// Publish the new epoch and the argument under one lock so a
		// racing call cannot leave a newer epoch paired with an older
		// argument.
		let epoch = {
			let mut latest = self.state.latest.lock();
			let epoch = self.state.epoch.fetch_add(1, Ordering::AcqRel) + 1;
			*latest = Some(arg);
			epoch
		};

		// The superseded closure would no-op anyway; withdrawing it keeps
		// the queue from accumulating stale entries during a long burst.
		if epoch > 1 {
			self.handler.remove_callbacks_token(epoch - 1);
		}

		let state = self.state.clone();
		let func = self.func.clone();
		self.handler.post_token_delayed(
			move || {
				if state.epoch.load(Ordering::Acquire) != epoch {
					return;
				}
				let Some(arg) = state.latest.lock().take() else {
					return;
				};
				func(arg);
			},
			epoch,
			self.window,
		)
	}

	/// Invalidate any pending invocation without touching the queue.
	pub fn cancel(&self) {
		let mut latest = self.state.latest.lock();
		self.state.epoch.fetch_add(1, Ordering::AcqRel);
		latest.take();
	}
}

impl<A> Drop for Debouncer<A> {
	fn drop(&mut self) {
		self.state.epoch.fetch_add(1, Ordering::AcqRel);
	}
}
