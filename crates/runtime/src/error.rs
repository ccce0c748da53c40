// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! Error types for the dispatch runtime.

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by looper lifecycle and send/post operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("a looper is already prepared for this thread")]
	AlreadyPrepared,

	#[error("no looper has been prepared for this thread")]
	NoLooper,

	#[error("the dispatch loop must run on the thread that prepared its looper")]
	WrongThread,

	#[error("message queue is shutting down")]
	QueueClosed,

	#[error("message has no target handler")]
	NoTarget,

	#[error("worker thread has not been started")]
	NotStarted,

	#[error("worker thread failed to start: {reason}")]
	StartFailed {
		reason: String,
	},
}
