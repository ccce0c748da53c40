// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 Spindle

//! The passive message record consumed by the dispatch loop.

use std::{any::Any, fmt, time::Instant};

use crate::{
	error::{Error, Result},
	handler::Handler,
};

/// A deferred closure carried by a message in place of `what`-based dispatch.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work scheduled on a [`MessageQueue`](crate::MessageQueue).
///
/// A message carries either a user discriminant (`what` plus the free
/// argument slots) that the target handler interprets, or a callback that
/// is invoked directly by the loop. The scheduled delivery time and the
/// target handler are stamped by the enqueue path.
pub struct Message {
	/// User-defined discriminant. Ignored when a callback is present.
	pub what: i32,
	/// Free integer slot.
	pub arg1: i32,
	/// Free integer slot.
	pub arg2: i32,
	/// Opaque payload. Consumers downcast via [`Message::obj_as`].
	pub obj: Option<Box<dyn Any + Send>>,

	pub(crate) when: Instant,
	pub(crate) target: Option<Handler>,
	pub(crate) callback: Option<Callback>,
	pub(crate) token: Option<u64>,
}

impl Message {
	/// Create a message with the given discriminant.
	pub fn new(what: i32) -> Self {
		Self {
			what,
			..Self::default()
		}
	}

	/// Create a message with a discriminant and both argument slots.
	pub fn with_args(what: i32, arg1: i32, arg2: i32) -> Self {
		Self {
			what,
			arg1,
			arg2,
			..Self::default()
		}
	}

	/// Create a message with a discriminant and an opaque payload.
	pub fn with_obj(what: i32, obj: impl Any + Send) -> Self {
		Self {
			what,
			obj: Some(Box::new(obj)),
			..Self::default()
		}
	}

	pub(crate) fn from_callback(callback: Callback, token: Option<u64>) -> Self {
		Self {
			callback: Some(callback),
			token,
			..Self::default()
		}
	}

	/// Downcast the payload to a concrete type.
	pub fn obj_as<T: Any>(&self) -> Option<&T> {
		self.obj.as_deref().and_then(|obj| obj.downcast_ref())
	}

	/// The scheduled delivery time. Assigned when the message is enqueued.
	pub fn when(&self) -> Instant {
		self.when
	}

	/// The handler this message is bound to, if any.
	pub fn target(&self) -> Option<&Handler> {
		self.target.as_ref()
	}

	/// Whether this message carries a callback instead of a discriminant.
	pub fn has_callback(&self) -> bool {
		self.callback.is_some()
	}

	/// The cancellation token attached to a posted callback, if any.
	pub fn token(&self) -> Option<u64> {
		self.token
	}

	/// Enqueue this message on its target handler for immediate delivery.
	///
	/// Fails with [`Error::NoTarget`] when no target is bound and with
	/// [`Error::QueueClosed`] when the target's queue is shutting down.
	pub fn send_to_target(self) -> Result<()> {
		let Some(target) = self.target.clone() else {
			return Err(Error::NoTarget);
		};
		target.send_message(self)
	}
}

impl Default for Message {
	fn default() -> Self {
		Self {
			what: 0,
			arg1: 0,
			arg2: 0,
			obj: None,
			when: Instant::now(),
			target: None,
			callback: None,
			token: None,
		}
	}
}

// The payload and callback slots are not Debug, so render shape only.
impl fmt::Debug for Message {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Message")
			.field("what", &self.what)
			.field("arg1", &self.arg1)
			.field("arg2", &self.arg2)
			.field("has_obj", &self.obj.is_some())
			.field("has_callback", &self.callback.is_some())
			.field("token", &self.token)
			.field("when", &self.when)
			.finish()
	}
}
