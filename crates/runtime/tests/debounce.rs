// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! Debouncer coalescing and throttler gating over a worker.

use std::{
	sync::Arc,
	thread,
	time::Duration,
};

use spindle_runtime::{Debouncer, Throttler, WorkerThread};
use spindle_testing::{Recorder, wait_until};

fn debouncing_worker(name: &str, window: Duration) -> (WorkerThread, Debouncer<String>, Recorder<String>) {
	let mut worker = WorkerThread::new(name);
	worker.start().unwrap();
	let log = Recorder::new();
	let seen = log.clone();
	let debouncer = Debouncer::new(worker.handler().unwrap(), window, move |text: String| seen.record(text));
	(worker, debouncer, log)
}

#[test]
fn burst_coalesces_to_last_argument() {
	let (worker, debouncer, log) = debouncing_worker("debounce-burst", Duration::from_millis(50));

	for text in ["H", "He", "Hel"] {
		debouncer.call(text.to_string()).unwrap();
		thread::sleep(Duration::from_millis(10));
	}

	assert!(wait_until(Duration::from_secs(2), || log.len() == 1));
	thread::sleep(Duration::from_millis(100));
	assert_eq!(log.snapshot(), vec!["Hel".to_string()]);
	drop(worker);
}

#[test]
fn spaced_calls_fire_individually() {
	let (worker, debouncer, log) = debouncing_worker("debounce-spaced", Duration::from_millis(30));

	debouncer.call("first".to_string()).unwrap();
	assert!(wait_until(Duration::from_secs(2), || log.len() == 1));
	debouncer.call("second".to_string()).unwrap();
	assert!(wait_until(Duration::from_secs(2), || log.len() == 2));

	assert_eq!(log.snapshot(), vec!["first".to_string(), "second".to_string()]);
	drop(worker);
}

#[test]
fn cancel_suppresses_pending_invocation() {
	let (worker, debouncer, log) = debouncing_worker("debounce-cancel", Duration::from_millis(30));

	debouncer.call("doomed".to_string()).unwrap();
	debouncer.cancel();

	thread::sleep(Duration::from_millis(120));
	assert!(log.is_empty());
	drop(worker);
}

#[test]
fn drop_suppresses_pending_invocation() {
	let (worker, debouncer, log) = debouncing_worker("debounce-drop", Duration::from_millis(30));

	debouncer.call("doomed".to_string()).unwrap();
	drop(debouncer);

	thread::sleep(Duration::from_millis(120));
	assert!(log.is_empty());
	drop(worker);
}

#[test]
fn concurrent_throttled_callers_fire_once() {
	let log = Recorder::new();
	let seen = log.clone();
	let throttler = Arc::new(Throttler::new(Duration::from_secs(3600), move |id: usize| seen.record(id)));

	let callers: Vec<_> = (0..8)
		.map(|id| {
			let throttler = throttler.clone();
			thread::spawn(move || throttler.call(id))
		})
		.collect();

	let fired = callers.into_iter().map(|caller| caller.join().unwrap()).filter(|ran| *ran).count();
	assert_eq!(fired, 1);
	assert_eq!(log.len(), 1);
}
