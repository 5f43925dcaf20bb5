use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::ready;

use crate::error::BoxError;
use crate::mailbox::BoxHandle;
use crate::mailbox::Mailbox;
use crate::message::Message;
use crate::message::Payload;

/// Delegates every message to exactly one inner box. The common base shape
/// for decorators.
pub struct ProxyBox {
	pub delegate: BoxHandle,
}

impl ProxyBox {
	pub fn new(delegate: BoxHandle) -> Self {
		Self { delegate }
	}
}

impl Mailbox for ProxyBox {
	fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
		self.delegate.send(msg)
	}

	fn to_remote(self: Arc<Self>) -> BoxHandle {
		self
	}
}

/// Emits a tracing event for every message, then forwards. The event is
/// recorded before the delegate sees the message.
pub struct LoggingBox {
	pub name: String,
	pub delegate: BoxHandle,
}

impl LoggingBox {
	pub fn new(name: impl Into<String>, delegate: BoxHandle) -> Self {
		Self {
			name: name.into(),
			delegate,
		}
	}
}

impl Mailbox for LoggingBox {
	fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
		tracing::debug!(name = %self.name, kind = msg.kind(), "message");
		self.delegate.send(msg)
	}

	fn to_remote(self: Arc<Self>) -> BoxHandle {
		self
	}
}

/// Treats the reply address as the next hop: a message with a reply box is
/// forwarded to that box with the address cleared; without one it is
/// dropped.
pub struct ForwardBox;

impl Mailbox for ForwardBox {
	fn send(&self, mut msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
		match msg.reply_box.take() {
			Some(reply) => async move { reply.send(msg).await }.boxed(),
			None => ready(Ok(())).boxed(),
		}
	}

	fn to_remote(self: Arc<Self>) -> BoxHandle {
		self
	}
}

/// Acts only on relay payloads: the wrapped message goes to the box named
/// inside the payload, never to the configured delegate. Anything else is
/// filtered out, not rejected.
pub struct RelayBox {
	pub delegate: BoxHandle,
}

impl RelayBox {
	pub fn new(delegate: BoxHandle) -> Self {
		Self { delegate }
	}
}

impl Mailbox for RelayBox {
	fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
		match msg.payload {
			Payload::Relay { next, msg } => async move { next.send(*msg).await }.boxed(),
			_ => ready(Ok(())).boxed(),
		}
	}

	fn to_remote(self: Arc<Self>) -> BoxHandle {
		self
	}
}

/// Addresses a named entry behind the delegate: every outgoing message is
/// wrapped in a sub payload carrying this box's name. The remote-safe
/// stand-in for boxes that are only locally addressable.
pub struct SubBox {
	pub name: String,
	pub delegate: BoxHandle,
}

impl SubBox {
	pub fn new(name: impl Into<String>, delegate: BoxHandle) -> Self {
		Self {
			name: name.into(),
			delegate,
		}
	}
}

impl Mailbox for SubBox {
	fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
		self.delegate.send(Message::sub(self.name.clone(), msg))
	}

	fn to_remote(self: Arc<Self>) -> BoxHandle {
		self
	}
}
