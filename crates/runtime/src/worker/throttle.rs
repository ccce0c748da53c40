// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! Rate limiting on the caller's thread.

use std::{
	sync::atomic::{AtomicU64, Ordering},
	time::{Duration, Instant},
};

/// Sentinel meaning the throttler has never fired.
const NEVER: u64 = u64::MAX;

/// Executes a function at most once per interval, inline on the caller.
///
/// Calls landing inside the interval are dropped, not deferred. The gate
/// is a compare-and-set on an atomic millisecond timestamp, so concurrent
/// callers race without locking and exactly one of them wins each window.
/// The first call always fires.
pub struct Throttler<A> {
	func: Box<dyn Fn(A) + Send + Sync>,
	interval_ms: u64,
	origin: Instant,
	last_run_ms: AtomicU64,
}

impl<A> Throttler<A> {
	/// Create a throttler around `func` with the given minimum interval.
	pub fn new(interval: Duration, func: impl Fn(A) + Send + Sync + 'static) -> Self {
		Self {
			func: Box::new(func),
			interval_ms: interval.as_millis() as u64,
			origin: Instant::now(),
			last_run_ms: AtomicU64::new(NEVER),
		}
	}

	/// Invoke the wrapped function unless the interval has not elapsed.
	///
	/// Returns whether the function ran.
	pub fn call(&self, arg: A) -> bool {
		let now = self.origin.elapsed().as_millis() as u64;
		loop {
			let last = self.last_run_ms.load(Ordering::Acquire);
			if last != NEVER && now.saturating_sub(last) < self.interval_ms {
				return false;
			}
			if self
				.last_run_ms
				.compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
				.is_ok()
			{
				(self.func)(arg);
				return true;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{
		sync::{
			Arc,
			atomic::{AtomicUsize, Ordering},
		},
		thread,
	};

	use super::*;

	#[test]
	fn first_call_fires() {
		let throttler = Throttler::new(Duration::from_secs(3600), |_: ()| {});
		assert!(throttler.call(()));
	}

	#[test]
	fn calls_inside_interval_are_dropped() {
		let hits = Arc::new(AtomicUsize::new(0));
		let counter = hits.clone();
		let throttler = Throttler::new(Duration::from_secs(3600), move |_: ()| {
			counter.fetch_add(1, Ordering::Relaxed);
		});

		assert!(throttler.call(()));
		assert!(!throttler.call(()));
		assert!(!throttler.call(()));
		assert_eq!(hits.load(Ordering::Relaxed), 1);
	}

	#[test]
	fn fires_again_after_interval() {
		let throttler = Throttler::new(Duration::from_millis(20), |_: ()| {});

		assert!(throttler.call(()));
		assert!(!throttler.call(()));
		thread::sleep(Duration::from_millis(30));
		assert!(throttler.call(()));
	}

	#[test]
	fn zero_interval_never_throttles() {
		let throttler = Throttler::new(Duration::ZERO, |_: ()| {});
		assert!(throttler.call(()));
		assert!(throttler.call(()));
	}
}
