// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! Lock-free single-producer single-consumer ring of samples.
//!
//! The ring is split into a [`Producer`] and a [`Consumer`] half so the
//! type system enforces one writer and one reader. The backing store is a
//! power-of-two slot array; the writer cursor (`head`) is published with
//! release ordering and observed with acquire ordering, which carries the
//! written samples with it. One slot is sacrificed to distinguish full
//! from empty, so the usable capacity is `N - 1`.

use std::{
	cell::UnsafeCell,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};

struct Ring<T> {
	buffer: Box<[UnsafeCell<T>]>,
	size: usize,
	mask: usize,
	/// Writer cursor, in slots. empty: tail == head.
	head: AtomicUsize,
	/// Reader cursor, in slots. full: (head + 1) & mask == tail.
	tail: AtomicUsize,
}

// The producer and consumer touch disjoint slot ranges, delimited by the
// cursors they publish to each other.
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
	fn occupied(&self, head: usize, tail: usize) -> usize {
		(self.size + head - tail) & self.mask
	}
}

/// Create a ring holding at least `capacity` samples.
///
/// The slot count is `capacity` rounded up to a power of two; the usable
/// capacity reported by [`Producer::capacity`] is one less than that.
pub fn ring<T: Copy + Default>(capacity: usize) -> (Producer<T>, Consumer<T>) {
	let size = capacity.next_power_of_two().max(2);
	let buffer = (0..size).map(|_| UnsafeCell::new(T::default())).collect::<Vec<_>>().into_boxed_slice();
	let ring = Arc::new(Ring {
		buffer,
		size,
		mask: size - 1,
		head: AtomicUsize::new(0),
		tail: AtomicUsize::new(0),
	});
	(
		Producer {
			ring: ring.clone(),
		},
		Consumer {
			ring,
		},
	)
}

/// Writing half of the ring.
pub struct Producer<T> {
	ring: Arc<Ring<T>>,
}

impl<T: Copy> Producer<T> {
	/// Copy samples into the ring; returns how many fit.
	pub fn write(&mut self, data: &[T]) -> usize {
		let ring = &self.ring;
		let head = ring.head.load(Ordering::Relaxed);
		let tail = ring.tail.load(Ordering::Acquire);
		let writable = ring.size - 1 - ring.occupied(head, tail);

		let count = data.len().min(writable);
		for (i, &sample) in data.iter().take(count).enumerate() {
			let slot = &ring.buffer[(head + i) & ring.mask];
			unsafe { *slot.get() = sample };
		}

		ring.head.store((head + count) & ring.mask, Ordering::Release);
		count
	}

	/// Free slots available to the producer.
	pub fn writable(&self) -> usize {
		let head = self.ring.head.load(Ordering::Relaxed);
		let tail = self.ring.tail.load(Ordering::Acquire);
		self.ring.size - 1 - self.ring.occupied(head, tail)
	}

	/// Usable capacity in samples.
	pub fn capacity(&self) -> usize {
		self.ring.size - 1
	}
}

impl<T: Copy + Default> Producer<T> {
	/// Zero-fill up to `samples` slots; returns how many fit.
	pub fn write_silence(&mut self, samples: usize) -> usize {
		let ring = &self.ring;
		let head = ring.head.load(Ordering::Relaxed);
		let tail = ring.tail.load(Ordering::Acquire);
		let writable = ring.size - 1 - ring.occupied(head, tail);

		let count = samples.min(writable);
		for i in 0..count {
			let slot = &ring.buffer[(head + i) & ring.mask];
			unsafe { *slot.get() = T::default() };
		}

		ring.head.store((head + count) & ring.mask, Ordering::Release);
		count
	}
}

/// Reading half of the ring.
pub struct Consumer<T> {
	ring: Arc<Ring<T>>,
}

impl<T: Copy> Consumer<T> {
	/// Copy samples out of the ring; returns how many were available.
	pub fn read(&mut self, out: &mut [T]) -> usize {
		let ring = &self.ring;
		let tail = ring.tail.load(Ordering::Relaxed);
		let head = ring.head.load(Ordering::Acquire);
		let readable = ring.occupied(head, tail);

		let count = out.len().min(readable);
		for (i, slot) in out.iter_mut().take(count).enumerate() {
			*slot = unsafe { *ring.buffer[(tail + i) & ring.mask].get() };
		}

		ring.tail.store((tail + count) & ring.mask, Ordering::Release);
		count
	}

	/// Samples available to the consumer.
	pub fn readable(&self) -> usize {
		let tail = self.ring.tail.load(Ordering::Relaxed);
		let head = self.ring.head.load(Ordering::Acquire);
		self.ring.occupied(head, tail)
	}

	/// Usable capacity in samples.
	pub fn capacity(&self) -> usize {
		self.ring.size - 1
	}
}
