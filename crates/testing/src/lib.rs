// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! Test support for the spindle workspace.

use std::{
	sync::{Arc, Mutex},
	thread,
	time::{Duration, Instant},
};

/// Thread-safe event log for asserting dispatch order in tests.
pub struct Recorder<T> {
	entries: Arc<Mutex<Vec<T>>>,
}

impl<T> Recorder<T> {
	pub fn new() -> Self {
		Self {
			entries: Arc::new(Mutex::new(Vec::new())),
		}
	}

	/// Append an entry.
	pub fn record(&self, entry: T) {
		self.entries.lock().unwrap().push(entry);
	}

	/// Number of recorded entries.
	pub fn len(&self) -> usize {
		self.entries.lock().unwrap().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<T: Clone> Recorder<T> {
	/// A copy of everything recorded so far.
	pub fn snapshot(&self) -> Vec<T> {
		self.entries.lock().unwrap().clone()
	}
}

impl<T> Clone for Recorder<T> {
	fn clone(&self) -> Self {
		Self {
			entries: self.entries.clone(),
		}
	}
}

impl<T> Default for Recorder<T> {
	fn default() -> Self {
		Self::new()
	}
}

/// Poll `pred` until it holds or `timeout` elapses.
///
/// Returns whether the predicate became true in time.
pub fn wait_until(timeout: Duration, pred: impl Fn() -> bool) -> bool {
	let deadline = Instant::now() + timeout;
	loop {
		if pred() {
			return true;
		}
		if Instant::now() >= deadline {
			return false;
		}
		thread::sleep(Duration::from_millis(2));
	}
}
