// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! Time-ordered multi-producer / single-consumer message queue.
//!
//! Producers on any thread insert messages sorted by delivery time; the
//! owning looper thread blocks in [`MessageQueue::next`] until the head
//! entry is due. Shutdown is terminal: once quitting, the queue rejects
//! new work and either drains what is already due or discards everything,
//! depending on the [`QuitMode`].

use std::{collections::VecDeque, time::Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::{
	error::{Error, Result},
	handler::Handler,
	message::Message,
};

/// Shutdown policy for a quitting queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitMode {
	/// Stop accepting work, deliver everything already due, then end.
	Graceful,
	/// Stop accepting work and discard all pending messages.
	Immediate,
}

struct Inner {
	messages: VecDeque<Message>,
	quitting: bool,
}

/// Thread-safe priority queue keyed by delivery timestamp.
///
/// Ties on the timestamp preserve insertion order, so messages enqueued
/// with equal delivery times dispatch in FIFO order.
pub struct MessageQueue {
	inner: Mutex<Inner>,
	available: Condvar,
}

impl MessageQueue {
	pub(crate) fn new() -> Self {
		Self {
			inner: Mutex::new(Inner {
				messages: VecDeque::new(),
				quitting: false,
			}),
			available: Condvar::new(),
		}
	}

	/// Insert a message for delivery at `when`.
	///
	/// Safe from any thread. Wakes the consumer when it is waiting. Fails
	/// with [`Error::QueueClosed`] once shutdown has begun.
	pub fn enqueue(&self, mut msg: Message, when: Instant) -> Result<()> {
		let mut inner = self.inner.lock();
		if inner.quitting {
			debug!(what = msg.what, "rejecting enqueue on quitting queue");
			return Err(Error::QueueClosed);
		}

		msg.when = when;
		// Place after existing entries with the same timestamp so equal
		// delivery times keep FIFO order.
		let at = inner.messages.partition_point(|queued| queued.when <= when);
		inner.messages.insert(at, msg);

		self.available.notify_one();
		Ok(())
	}

	/// Block until the earliest-due message is ready and return it.
	///
	/// Returns `None` once the queue has quit and the shutdown policy says
	/// to stop. Must only be called from the owning looper thread; the
	/// looper enforces this.
	pub fn next(&self) -> Option<Message> {
		let mut inner = self.inner.lock();
		loop {
			let now = Instant::now();
			let head_due = inner.messages.front().map(|msg| msg.when);
			match head_due {
				Some(due) if due <= now => return inner.messages.pop_front(),
				Some(due) => {
					// Only future-dated work remains; a quitting
					// queue stops here instead of waiting it out.
					if inner.quitting {
						return None;
					}
					self.available.wait_until(&mut inner, due);
				}
				None => {
					if inner.quitting {
						return None;
					}
					self.available.wait(&mut inner);
				}
			}
		}
	}

	/// Begin terminal shutdown.
	///
	/// Idempotent; an [`QuitMode::Immediate`] quit after a graceful one
	/// still discards whatever is pending. Wakes the consumer.
	pub fn quit(&self, mode: QuitMode) {
		let mut inner = self.inner.lock();
		if !inner.quitting {
			debug!(?mode, pending = inner.messages.len(), "message queue quitting");
			inner.quitting = true;
		}
		if mode == QuitMode::Immediate {
			inner.messages.clear();
		}
		self.available.notify_all();
	}

	/// Whether shutdown has begun.
	pub fn is_quitting(&self) -> bool {
		self.inner.lock().quitting
	}

	/// Number of pending messages.
	pub fn len(&self) -> usize {
		self.inner.lock().messages.len()
	}

	/// Whether no messages are pending.
	pub fn is_empty(&self) -> bool {
		self.inner.lock().messages.is_empty()
	}

	/// Withdraw pending `what`-dispatched messages bound to `target`.
	///
	/// Callback-carrying messages are left alone. Idempotent; safe from
	/// any thread.
	pub fn remove_messages(&self, target: &Handler, what: i32) {
		let mut inner = self.inner.lock();
		if inner.quitting {
			return;
		}
		inner.messages.retain(|msg| {
			!(msg.callback.is_none()
				&& msg.what == what
				&& msg.target.as_ref().is_some_and(|t| t.same_handler(target)))
		});
	}

	/// Withdraw pending callback messages bound to `target`.
	///
	/// With a token, only callbacks posted under that token are removed;
	/// without one, every callback for the handler goes.
	pub fn remove_callbacks(&self, target: &Handler, token: Option<u64>) {
		let mut inner = self.inner.lock();
		if inner.quitting {
			return;
		}
		inner.messages.retain(|msg| {
			!(msg.callback.is_some()
				&& msg.target.as_ref().is_some_and(|t| t.same_handler(target))
				&& token.is_none_or(|token| msg.token == Some(token)))
		});
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[test]
	fn equal_timestamps_keep_fifo_order() {
		let queue = MessageQueue::new();
		let when = Instant::now();
		for what in 1..=3 {
			queue.enqueue(Message::new(what), when).unwrap();
		}

		for expected in 1..=3 {
			assert_eq!(queue.next().unwrap().what, expected);
		}
	}

	#[test]
	fn earlier_deadline_dispatches_first() {
		let queue = MessageQueue::new();
		let now = Instant::now();
		queue.enqueue(Message::new(30), now + Duration::from_millis(30)).unwrap();
		queue.enqueue(Message::new(10), now + Duration::from_millis(10)).unwrap();
		queue.enqueue(Message::new(20), now + Duration::from_millis(20)).unwrap();

		assert_eq!(queue.next().unwrap().what, 10);
		assert_eq!(queue.next().unwrap().what, 20);
		assert_eq!(queue.next().unwrap().what, 30);
	}

	#[test]
	fn next_waits_for_future_deadline() {
		let queue = MessageQueue::new();
		let start = Instant::now();
		queue.enqueue(Message::new(1), start + Duration::from_millis(40)).unwrap();

		let msg = queue.next().unwrap();
		assert_eq!(msg.what, 1);
		assert!(start.elapsed() >= Duration::from_millis(40));
	}

	#[test]
	fn enqueue_rejected_after_quit() {
		let queue = MessageQueue::new();
		queue.quit(QuitMode::Graceful);
		let result = queue.enqueue(Message::new(1), Instant::now());
		assert!(matches!(result, Err(Error::QueueClosed)));
	}

	#[test]
	fn graceful_quit_drains_due_messages() {
		let queue = MessageQueue::new();
		let now = Instant::now();
		queue.enqueue(Message::new(1), now).unwrap();
		queue.enqueue(Message::new(2), now).unwrap();
		// Future-dated work is abandoned by a graceful quit.
		queue.enqueue(Message::new(3), now + Duration::from_secs(3600)).unwrap();
		queue.quit(QuitMode::Graceful);

		assert_eq!(queue.next().unwrap().what, 1);
		assert_eq!(queue.next().unwrap().what, 2);
		assert!(queue.next().is_none());
	}

	#[test]
	fn immediate_quit_discards_pending() {
		let queue = MessageQueue::new();
		let now = Instant::now();
		for what in 1..=5 {
			queue.enqueue(Message::new(what), now).unwrap();
		}
		queue.quit(QuitMode::Immediate);

		assert!(queue.next().is_none());
		assert!(queue.is_empty());
	}

	#[test]
	fn quit_is_monotone() {
		let queue = MessageQueue::new();
		queue.enqueue(Message::new(1), Instant::now()).unwrap();
		queue.quit(QuitMode::Graceful);
		queue.quit(QuitMode::Immediate);

		assert!(queue.next().is_none());
	}
}
