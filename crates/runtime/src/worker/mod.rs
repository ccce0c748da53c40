// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! Dedicated worker thread running a private looper.
//!
//! [`WorkerThread`] spawns a named OS thread that prepares a looper,
//! publishes it through a one-shot channel, and runs the dispatch loop
//! until shutdown. Tasks posted from any thread execute serially on the
//! worker in submission order.

mod debounce;
mod throttle;

pub use debounce::Debouncer;
pub use throttle::Throttler;

use std::{
	mem,
	sync::Arc,
	thread::{self, JoinHandle, ThreadId},
	time::Duration,
};

use crossbeam_channel::{Receiver, bounded};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::{
	error::{Error, Result},
	handler::{HandleMessage, Handler},
	looper::Looper,
	message::Message,
	queue::QuitMode,
};

enum LooperSlot {
	Unstarted,
	Pending(Receiver<Result<Arc<Looper>>>),
	Ready(Arc<Looper>),
	Failed(Error),
}

// Work arrives as posted closures, so this hook only ever fires if a
// caller routes a plain message through the task handler.
struct TaskHook;

impl HandleMessage for TaskHook {
	fn handle_message(&self, msg: &Message) {
		error!(what = msg.what, "worker handler received a message without a callback");
	}
}

/// A background thread that serially executes posted tasks.
///
/// Lifecycle: `new` does not start the thread; `start` spawns it;
/// [`WorkerThread::finish`] drains already-queued work before the loop
/// exits, while [`WorkerThread::finish_now`] discards pending work (the
/// in-flight task, if any, still completes). Dropping the worker drives
/// `finish` + `join` if the owner has not.
pub struct WorkerThread {
	name: String,
	thread: Option<JoinHandle<()>>,
	looper: Mutex<LooperSlot>,
	handler: Mutex<Option<Handler>>,
}

impl WorkerThread {
	/// Create a worker with a descriptive thread name. Does not start it.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			thread: None,
			looper: Mutex::new(LooperSlot::Unstarted),
			handler: Mutex::new(None),
		}
	}

	/// Spawn the worker thread. Calling `start` again is a no-op.
	pub fn start(&mut self) -> Result<()> {
		if self.thread.is_some() {
			return Ok(());
		}

		let (tx, rx) = bounded(1);
		let name = self.name.clone();

		let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
			let outcome = Looper::prepare().and_then(|()| Looper::current().ok_or(Error::NoLooper));
			let prepared = outcome.is_ok();
			let _ = tx.send(outcome);

			if prepared {
				if let Err(err) = Looper::run() {
					error!(worker = %name, %err, "worker dispatch loop failed");
				}
			}
		});

		match spawned {
			Ok(handle) => {
				debug!(worker = %self.name, "worker thread started");
				self.thread = Some(handle);
				*self.looper.lock() = LooperSlot::Pending(rx);
				Ok(())
			}
			Err(err) => {
				let err = Error::StartFailed {
					reason: err.to_string(),
				};
				*self.looper.lock() = LooperSlot::Failed(err.clone());
				Err(err)
			}
		}
	}

	/// The worker's looper. Blocks until the worker has published it.
	///
	/// Safe from any thread. When bootstrap failed, the underlying error
	/// is returned instead.
	pub fn get_looper(&self) -> Result<Arc<Looper>> {
		let mut slot = self.looper.lock();
		match mem::replace(&mut *slot, LooperSlot::Unstarted) {
			LooperSlot::Unstarted => Err(Error::NotStarted),
			LooperSlot::Ready(looper) => {
				*slot = LooperSlot::Ready(looper.clone());
				Ok(looper)
			}
			LooperSlot::Failed(err) => {
				*slot = LooperSlot::Failed(err.clone());
				Err(err)
			}
			LooperSlot::Pending(rx) => {
				let outcome = rx.recv().unwrap_or_else(|_| {
					Err(Error::StartFailed {
						reason: "worker exited before publishing its looper".to_string(),
					})
				});
				match outcome {
					Ok(looper) => {
						*slot = LooperSlot::Ready(looper.clone());
						Ok(looper)
					}
					Err(err) => {
						*slot = LooperSlot::Failed(err.clone());
						Err(err)
					}
				}
			}
		}
	}

	/// The task handler bound to this worker's looper.
	///
	/// Blocks like [`WorkerThread::get_looper`] on first use.
	pub fn handler(&self) -> Result<Handler> {
		let mut handler = self.handler.lock();
		if let Some(handler) = handler.as_ref() {
			return Ok(handler.clone());
		}
		let looper = self.get_looper()?;
		let created = Handler::new(&looper, TaskHook);
		*handler = Some(created.clone());
		Ok(created)
	}

	/// Post a task for immediate execution on the worker.
	pub fn post(&self, task: impl FnOnce() + Send + 'static) -> Result<()> {
		self.handler()?.post(task)
	}

	/// Post a task for execution after `delay`.
	pub fn post_delayed(&self, task: impl FnOnce() + Send + 'static, delay: Duration) -> Result<()> {
		self.handler()?.post_delayed(task, delay)
	}

	/// Gracefully stop the worker after all queued work has drained.
	///
	/// The quit request is posted to the tail of the queue, so every task
	/// already submitted runs first. New submissions fail once the quit
	/// executes.
	pub fn finish(&self) -> Result<()> {
		let handler = self.handler()?;
		let looper = handler.looper().clone();
		handler.post(move || looper.quit(QuitMode::Graceful))
	}

	/// Stop the worker, discarding queued tasks.
	///
	/// A task already in flight completes; everything still pending is
	/// dropped.
	pub fn finish_now(&self) -> Result<()> {
		let looper = self.get_looper()?;
		looper.quit(QuitMode::Immediate);
		Ok(())
	}

	/// Wait for the worker thread to terminate.
	pub fn join(&mut self) {
		if let Some(handle) = self.thread.take() {
			if handle.join().is_err() {
				error!(worker = %self.name, "worker thread panicked");
			}
		}
	}

	/// The worker thread's id while it is running.
	pub fn thread_id(&self) -> Option<ThreadId> {
		self.thread.as_ref().map(|handle| handle.thread().id())
	}

	/// The worker's thread name.
	pub fn name(&self) -> &str {
		&self.name
	}
}

impl Default for WorkerThread {
	fn default() -> Self {
		Self::new("spindle-worker")
	}
}

impl Drop for WorkerThread {
	fn drop(&mut self) {
		if self.thread.is_some() {
			let _ = self.finish();
			self.join();
		}
	}
}
