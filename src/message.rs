use std::fmt;
use std::fmt::Debug;

use crate::mailbox::BoxHandle;
use crate::mailbox::Mailbox;

/// Opaque application payload value. Anything richer than this is the
/// caller's codec concern.
pub type Value = serde_json::Value;

/// The addressed envelope. Carries optional reply and error addressing;
/// the two channels stay disjoint all the way through the RPC layer.
#[derive(Clone)]
pub struct Message {
	pub reply_box: Option<BoxHandle>,
	pub error_box: Option<BoxHandle>,
	pub payload: Payload,
}

#[derive(Clone)]
pub enum Payload {
	Empty,
	Text(String),
	Rpc { name: String, args: Vec<Value> },
	RpcReturn { data: Value },
	RpcError { message: String },
	Sub { name: String, msg: Box<Message> },
	Relay { next: BoxHandle, msg: Box<Message> },
	Register { path: String },
	Unregister { path: String },
}

impl Payload {
	pub fn kind(&self) -> &'static str {
		match self {
			Payload::Empty => "empty",
			Payload::Text(_) => "text",
			Payload::Rpc { .. } => "rpc",
			Payload::RpcReturn { .. } => "rpc_return",
			Payload::RpcError { .. } => "rpc_error",
			Payload::Sub { .. } => "sub",
			Payload::Relay { .. } => "relay",
			Payload::Register { .. } => "register",
			Payload::Unregister { .. } => "unregister",
		}
	}
}

impl Message {
	pub fn new(payload: Payload) -> Self {
		Self {
			reply_box: None,
			error_box: None,
			payload,
		}
	}

	pub fn empty() -> Self {
		Self::new(Payload::Empty)
	}

	pub fn text(data: impl Into<String>) -> Self {
		Self::new(Payload::Text(data.into()))
	}

	pub fn rpc(name: impl Into<String>, args: Vec<Value>) -> Self {
		Self::new(Payload::Rpc {
			name: name.into(),
			args,
		})
	}

	pub fn rpc_return(data: Value) -> Self {
		Self::new(Payload::RpcReturn { data })
	}

	pub fn rpc_error(message: impl Into<String>) -> Self {
		Self::new(Payload::RpcError {
			message: message.into(),
		})
	}

	pub fn sub(name: impl Into<String>, msg: Message) -> Self {
		Self::new(Payload::Sub {
			name: name.into(),
			msg: Box::new(msg),
		})
	}

	pub fn relay(next: BoxHandle, msg: Message) -> Self {
		Self::new(Payload::Relay {
			next,
			msg: Box::new(msg),
		})
	}

	pub fn register(path: impl Into<String>) -> Self {
		Self::new(Payload::Register { path: path.into() })
	}

	pub fn unregister(path: impl Into<String>) -> Self {
		Self::new(Payload::Unregister { path: path.into() })
	}

	pub fn with_reply(mut self, reply: BoxHandle) -> Self {
		self.reply_box = Some(reply);
		self
	}

	pub fn with_error(mut self, error: BoxHandle) -> Self {
		self.error_box = Some(error);
		self
	}

	pub fn kind(&self) -> &'static str {
		self.payload.kind()
	}

	/// Remote-safe copy: every embedded box handle is rewritten into a form
	/// that a peer can address back through a registry. The original is left
	/// untouched; converting an already remote-safe message changes nothing.
	pub fn to_remote(&self) -> Message {
		let payload = match &self.payload {
			Payload::Sub { name, msg } => Payload::Sub {
				name: name.clone(),
				msg: Box::new(msg.to_remote()),
			},
			Payload::Relay { next, msg } => Payload::Relay {
				next: next.clone().to_remote(),
				msg: Box::new(msg.to_remote()),
			},
			other => other.clone(),
		};

		Message {
			reply_box: self.reply_box.clone().map(|b| b.to_remote()),
			error_box: self.error_box.clone().map(|b| b.to_remote()),
			payload,
		}
	}
}

impl Debug for Message {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Message")
			.field("kind", &self.kind())
			.field("reply", &self.reply_box.is_some())
			.field("error", &self.error_box.is_some())
			.finish()
	}
}

impl Debug for Payload {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Payload::Text(data) => f.debug_tuple("Text").field(data).finish(),
			Payload::Rpc { name, args } => f
				.debug_struct("Rpc")
				.field("name", name)
				.field("args", &args.len())
				.finish(),
			Payload::Sub { name, msg } => f
				.debug_struct("Sub")
				.field("name", name)
				.field("msg", msg)
				.finish(),
			other => f.write_str(other.kind()),
		}
	}
}
