// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! Closable blocking FIFO.

use std::{collections::VecDeque, fmt};

use parking_lot::{Condvar, Mutex};

/// Returned by [`BlockingQueue::push`] after the queue has been closed;
/// carries the rejected item back to the caller.
#[derive(thiserror::Error)]
#[error("blocking queue is closed")]
pub struct PushError<T>(pub T);

impl<T> fmt::Debug for PushError<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("PushError(..)")
	}
}

struct Inner<T> {
	items: VecDeque<T>,
	closed: bool,
}

/// A blocking FIFO with terminal close semantics.
///
/// Safe for many producers and many consumers under one lock. After
/// [`BlockingQueue::close`], pushes are rejected but consumers keep
/// draining whatever is queued; only a closed *and* empty queue signals
/// end-of-stream (`None`).
pub struct BlockingQueue<T> {
	inner: Mutex<Inner<T>>,
	available: Condvar,
}

impl<T> BlockingQueue<T> {
	pub fn new() -> Self {
		Self {
			inner: Mutex::new(Inner {
				items: VecDeque::new(),
				closed: false,
			}),
			available: Condvar::new(),
		}
	}

	/// Append an item. Never blocks; rejects once the queue is closed.
	pub fn push(&self, item: T) -> Result<(), PushError<T>> {
		let mut inner = self.inner.lock();
		if inner.closed {
			return Err(PushError(item));
		}
		inner.items.push_back(item);
		self.available.notify_one();
		Ok(())
	}

	/// Remove and return the head, blocking until an item is available.
	///
	/// Returns `None` only when the queue is closed and fully drained.
	pub fn pop(&self) -> Option<T> {
		let mut inner = self.inner.lock();
		loop {
			if let Some(item) = inner.items.pop_front() {
				return Some(item);
			}
			if inner.closed {
				return None;
			}
			self.available.wait(&mut inner);
		}
	}

	/// Remove the head only when it satisfies `pred`.
	///
	/// Blocks until an item is available or the queue is closed and
	/// empty. Returns `None` both when the head fails the predicate (the
	/// item stays queued) and at end-of-stream.
	pub fn pop_if(&self, pred: impl FnOnce(&T) -> bool) -> Option<T> {
		let mut inner = self.inner.lock();
		loop {
			if let Some(head) = inner.items.front() {
				if pred(head) {
					return inner.items.pop_front();
				}
				return None;
			}
			if inner.closed {
				return None;
			}
			self.available.wait(&mut inner);
		}
	}

	/// Drop items from the front until the head satisfies `pred`.
	///
	/// Never blocks; an empty queue is left as-is.
	pub fn drop_until(&self, pred: impl Fn(&T) -> bool) {
		let mut inner = self.inner.lock();
		while inner.items.front().is_some_and(|head| !pred(head)) {
			inner.items.pop_front();
		}
	}

	/// Mark the queue closed. Idempotent; wakes every blocked consumer.
	pub fn close(&self) {
		let mut inner = self.inner.lock();
		inner.closed = true;
		self.available.notify_all();
	}

	/// Whether the queue has been closed.
	pub fn is_closed(&self) -> bool {
		self.inner.lock().closed
	}

	/// Number of queued items.
	pub fn len(&self) -> usize {
		self.inner.lock().items.len()
	}

	/// Whether no items are queued.
	pub fn is_empty(&self) -> bool {
		self.inner.lock().items.is_empty()
	}
}

impl<T: Clone> BlockingQueue<T> {
	/// Clone the head without removing it, blocking until an item is
	/// available. Returns `None` at end-of-stream.
	pub fn peek(&self) -> Option<T> {
		let mut inner = self.inner.lock();
		loop {
			if let Some(head) = inner.items.front() {
				return Some(head.clone());
			}
			if inner.closed {
				return None;
			}
			self.available.wait(&mut inner);
		}
	}
}

impl<T> Default for BlockingQueue<T> {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fifo_order() {
		let queue = BlockingQueue::new();
		for i in 0..5 {
			queue.push(i).unwrap();
		}
		for i in 0..5 {
			assert_eq!(queue.pop(), Some(i));
		}
	}

	#[test]
	fn push_rejected_after_close() {
		let queue = BlockingQueue::new();
		queue.close();
		let err = queue.push(42).unwrap_err();
		assert_eq!(err.0, 42);
	}

	#[test]
	fn pop_drains_before_end_of_stream() {
		let queue = BlockingQueue::new();
		queue.push(1).unwrap();
		queue.push(2).unwrap();
		queue.close();

		assert_eq!(queue.pop(), Some(1));
		assert_eq!(queue.pop(), Some(2));
		assert_eq!(queue.pop(), None);
	}

	#[test]
	fn pop_if_leaves_rejected_head() {
		let queue = BlockingQueue::new();
		queue.push(10).unwrap();

		assert_eq!(queue.pop_if(|item| *item > 100), None);
		assert_eq!(queue.len(), 1);
		assert_eq!(queue.pop_if(|item| *item == 10), Some(10));
		assert!(queue.is_empty());
	}

	#[test]
	fn drop_until_discards_prefix() {
		let queue = BlockingQueue::new();
		for i in 0..6 {
			queue.push(i).unwrap();
		}
		queue.drop_until(|item| *item >= 4);

		assert_eq!(queue.pop(), Some(4));
		assert_eq!(queue.pop(), Some(5));
	}

	#[test]
	fn peek_does_not_consume() {
		let queue = BlockingQueue::new();
		queue.push(7).unwrap();

		assert_eq!(queue.peek(), Some(7));
		assert_eq!(queue.pop(), Some(7));
	}

	#[test]
	fn close_is_idempotent() {
		let queue: BlockingQueue<i32> = BlockingQueue::new();
		queue.close();
		queue.close();
		assert_eq!(queue.pop(), None);
	}
}
