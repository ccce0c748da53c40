// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! User-facing submission facade bound to a looper.
//!
//! A [`Handler`] is a cheap clone handle: every clone refers to the same
//! underlying behavior and counts as the same handler for selective
//! removal. Message-based work is interpreted by the [`HandleMessage`]
//! implementation supplied at construction; posted closures bypass it.

use std::{
	fmt,
	sync::Arc,
	time::{Duration, Instant},
};

use crate::{
	error::{Error, Result},
	looper::Looper,
	message::{Callback, Message},
};

/// Behavior invoked for every dispatched message that lacks a callback.
pub trait HandleMessage: Send + Sync + 'static {
	fn handle_message(&self, msg: &Message);
}

struct HandlerCore {
	looper: Arc<Looper>,
	hook: Box<dyn HandleMessage>,
}

/// Submission interface for a specific looper.
///
/// Handlers are immutable after construction and may be cloned and shared
/// freely across threads; holding one does not keep the looper running.
#[derive(Clone)]
pub struct Handler {
	core: Arc<HandlerCore>,
}

impl Handler {
	/// Create a handler bound to the given looper.
	pub fn new(looper: &Arc<Looper>, hook: impl HandleMessage) -> Self {
		Self {
			core: Arc::new(HandlerCore {
				looper: looper.clone(),
				hook: Box::new(hook),
			}),
		}
	}

	/// Create a handler bound to the calling thread's looper.
	///
	/// Fails with [`Error::NoLooper`] when the thread has not prepared
	/// one.
	pub fn current(hook: impl HandleMessage) -> Result<Self> {
		let looper = Looper::current().ok_or(Error::NoLooper)?;
		Ok(Self::new(&looper, hook))
	}

	/// The looper this handler submits to.
	pub fn looper(&self) -> &Arc<Looper> {
		&self.core.looper
	}

	/// Invoke the handler's behavior for `msg`.
	///
	/// Called by the dispatch loop; exposed so wrappers can interpose.
	pub fn dispatch_message(&self, msg: &Message) {
		self.core.hook.handle_message(msg);
	}

	pub(crate) fn same_handler(&self, other: &Handler) -> bool {
		Arc::ptr_eq(&self.core, &other.core)
	}

	// --- message factory ---

	/// A message with this handler pre-bound as its target.
	pub fn obtain_message(&self, what: i32) -> Message {
		let mut msg = Message::new(what);
		msg.target = Some(self.clone());
		msg
	}

	/// A targeted message carrying both argument slots.
	pub fn obtain_message_with_args(&self, what: i32, arg1: i32, arg2: i32) -> Message {
		let mut msg = Message::with_args(what, arg1, arg2);
		msg.target = Some(self.clone());
		msg
	}

	/// A targeted message carrying an opaque payload.
	pub fn obtain_message_with_obj(&self, what: i32, obj: impl std::any::Any + Send) -> Message {
		let mut msg = Message::with_obj(what, obj);
		msg.target = Some(self.clone());
		msg
	}

	// --- message submission ---

	/// Enqueue `msg` for immediate delivery.
	pub fn send_message(&self, msg: Message) -> Result<()> {
		self.send_message_at(msg, Instant::now())
	}

	/// Enqueue `msg` for delivery after `delay`.
	pub fn send_message_delayed(&self, msg: Message, delay: Duration) -> Result<()> {
		self.send_message_at(msg, Instant::now() + delay)
	}

	/// Enqueue `msg` for delivery at the absolute monotonic time `when`.
	///
	/// The message's target is re-bound to this handler.
	pub fn send_message_at(&self, mut msg: Message, when: Instant) -> Result<()> {
		msg.target = Some(self.clone());
		self.core.looper.queue().enqueue(msg, when)
	}

	// --- closure submission ---

	/// Post a closure for immediate execution on the looper thread.
	pub fn post(&self, f: impl FnOnce() + Send + 'static) -> Result<()> {
		self.post_at(Box::new(f), None, Instant::now())
	}

	/// Post a closure for execution after `delay`.
	pub fn post_delayed(&self, f: impl FnOnce() + Send + 'static, delay: Duration) -> Result<()> {
		self.post_at(Box::new(f), None, Instant::now() + delay)
	}

	/// Post a closure tagged with a removal token.
	pub fn post_token(&self, f: impl FnOnce() + Send + 'static, token: u64) -> Result<()> {
		self.post_at(Box::new(f), Some(token), Instant::now())
	}

	/// Post a token-tagged closure for execution after `delay`.
	pub fn post_token_delayed(&self, f: impl FnOnce() + Send + 'static, token: u64, delay: Duration) -> Result<()> {
		self.post_at(Box::new(f), Some(token), Instant::now() + delay)
	}

	/// Post a closure for execution at the absolute monotonic time `when`.
	pub fn post_at_time(&self, f: impl FnOnce() + Send + 'static, when: Instant) -> Result<()> {
		self.post_at(Box::new(f), None, when)
	}

	fn post_at(&self, callback: Callback, token: Option<u64>, when: Instant) -> Result<()> {
		let mut msg = Message::from_callback(callback, token);
		msg.target = Some(self.clone());
		self.core.looper.queue().enqueue(msg, when)
	}

	// --- selective removal ---

	/// Withdraw pending messages with the given discriminant.
	pub fn remove_messages(&self, what: i32) {
		self.core.looper.queue().remove_messages(self, what);
	}

	/// Withdraw every pending posted closure.
	pub fn remove_callbacks(&self) {
		self.core.looper.queue().remove_callbacks(self, None);
	}

	/// Withdraw pending posted closures carrying `token`.
	pub fn remove_callbacks_token(&self, token: u64) {
		self.core.looper.queue().remove_callbacks(self, Some(token));
	}
}

impl fmt::Debug for Handler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Handler").field("thread", &self.core.looper.thread_id()).finish()
	}
}
