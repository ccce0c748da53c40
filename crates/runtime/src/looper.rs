// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! Per-thread looper registry and the dispatch loop.
//!
//! A looper is bound to exactly one OS thread. [`Looper::prepare`] installs
//! one for the calling thread, [`Looper::run`] consumes its queue until the
//! queue signals end-of-stream, and [`Looper::quit`] may be called from any
//! thread to begin shutdown.

use std::{
	any::Any,
	cell::RefCell,
	panic::{AssertUnwindSafe, catch_unwind},
	sync::Arc,
	thread::{self, ThreadId},
};

use tracing::{debug, error, warn};

use crate::{
	error::{Error, Result},
	queue::{MessageQueue, QuitMode},
};

thread_local! {
	static CURRENT: RefCell<Option<Arc<Looper>>> = const { RefCell::new(None) };
}

/// Owner of a message queue and its single-threaded dispatch loop.
pub struct Looper {
	queue: Arc<MessageQueue>,
	thread_id: ThreadId,
}

impl Looper {
	/// Install a looper for the calling thread.
	///
	/// Fails with [`Error::AlreadyPrepared`] when the thread already has
	/// one.
	pub fn prepare() -> Result<()> {
		CURRENT.with(|current| {
			let mut current = current.borrow_mut();
			if current.is_some() {
				return Err(Error::AlreadyPrepared);
			}
			*current = Some(Arc::new(Looper {
				queue: Arc::new(MessageQueue::new()),
				thread_id: thread::current().id(),
			}));
			Ok(())
		})
	}

	/// The calling thread's looper, if one was prepared.
	pub fn current() -> Option<Arc<Looper>> {
		CURRENT.with(|current| current.borrow().clone())
	}

	/// Run the dispatch loop for the calling thread's looper.
	///
	/// Blocks until the queue signals end-of-stream, then clears the
	/// thread-local registration. Panics raised by user dispatch code are
	/// contained and logged; they never terminate the loop.
	pub fn run() -> Result<()> {
		let me = Self::current().ok_or(Error::NoLooper)?;
		me.run_inner()
	}

	fn run_inner(&self) -> Result<()> {
		if self.thread_id != thread::current().id() {
			return Err(Error::WrongThread);
		}

		debug!(thread = ?self.thread_id, "looper entering dispatch loop");

		while let Some(mut msg) = self.queue.next() {
			let target = msg.target.take();
			if let Some(callback) = msg.callback.take() {
				if let Err(panic) = catch_unwind(AssertUnwindSafe(callback)) {
					error!(
						what = msg.what,
						token = msg.token,
						"posted callback panicked: {}",
						panic_reason(&panic)
					);
				}
			} else if let Some(target) = target {
				if let Err(panic) = catch_unwind(AssertUnwindSafe(|| target.dispatch_message(&msg))) {
					error!(what = msg.what, "handle_message panicked: {}", panic_reason(&panic));
				}
			} else {
				warn!(what = msg.what, "dropping message without target handler");
			}
		}

		debug!(thread = ?self.thread_id, "looper exiting dispatch loop");
		CURRENT.with(|current| current.borrow_mut().take());
		Ok(())
	}

	/// Begin shutdown of this looper's queue. Safe from any thread.
	pub fn quit(&self, mode: QuitMode) {
		self.queue.quit(mode);
	}

	/// The queue this looper consumes.
	///
	/// Producers normally go through a [`Handler`](crate::Handler); direct
	/// queue access is for removal and introspection.
	pub fn queue(&self) -> &Arc<MessageQueue> {
		&self.queue
	}

	/// The id of the thread this looper is bound to.
	pub fn thread_id(&self) -> ThreadId {
		self.thread_id
	}
}

fn panic_reason(panic: &(dyn Any + Send)) -> &str {
	if let Some(reason) = panic.downcast_ref::<&str>() {
		reason
	} else if let Some(reason) = panic.downcast_ref::<String>() {
		reason
	} else {
		"opaque panic payload"
	}
}

#[cfg(test)]
mod tests {
	use std::sync::mpsc;

	use super::*;

	#[test]
	fn prepare_twice_fails() {
		thread::spawn(|| {
			Looper::prepare().unwrap();
			assert_eq!(Looper::prepare(), Err(Error::AlreadyPrepared));
		})
		.join()
		.unwrap();
	}

	#[test]
	fn run_without_prepare_fails() {
		thread::spawn(|| {
			assert_eq!(Looper::run(), Err(Error::NoLooper));
		})
		.join()
		.unwrap();
	}

	#[test]
	fn run_on_foreign_thread_fails() {
		let (tx, rx) = mpsc::channel();
		let guest = thread::spawn(move || {
			Looper::prepare().unwrap();
			let looper = Looper::current().unwrap();
			tx.send(looper.clone()).unwrap();
			// Keep the owning thread alive until the test drives the
			// queue to completion.
			assert_eq!(Looper::run(), Ok(()));
		});

		let looper = rx.recv().unwrap();
		assert_eq!(looper.run_inner(), Err(Error::WrongThread));

		looper.quit(QuitMode::Immediate);
		guest.join().unwrap();
	}

	#[test]
	fn current_cleared_after_run() {
		thread::spawn(|| {
			Looper::prepare().unwrap();
			let looper = Looper::current().unwrap();
			looper.quit(QuitMode::Graceful);
			Looper::run().unwrap();
			assert!(Looper::current().is_none());
		})
		.join()
		.unwrap();
	}
}
