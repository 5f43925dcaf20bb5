//! Wire form of the envelope: JSON, one message per line.
//!
//! Only remote-safe messages can be encoded. Box references appear on the
//! wire as bare registry keys; the encoder takes the key out of a sub box,
//! and the decoder rebinds each key to a sub box over the receiving link's
//! return route. A relay payload holds a live handle and never crosses the
//! wire.

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

use crate::mailbox::BoxHandle;
use crate::message::Message;
use crate::message::Payload;
use crate::message::Value;
use crate::route::SubBox;

#[derive(thiserror::Error, Debug)]
pub enum WireError {
	#[error("{kind} is not remote-safe")]
	NotRemoteSafe { kind: &'static str },

	#[error("codec error: {0}")]
	Codec(#[from] serde_json::Error),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WireMessage {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reply_to: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_to: Option<String>,
	pub payload: WirePayload,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WirePayload {
	Empty,
	Text { data: String },
	Rpc { name: String, args: Vec<Value> },
	RpcReturn { data: Value },
	RpcError { message: String },
	Sub { name: String, msg: Box<WireMessage> },
	Register { path: String },
	Unregister { path: String },
}

/// Registry key of a remote-safe box reference.
fn box_key(handle: &BoxHandle) -> Result<String, WireError> {
	match handle.downcast_ref::<SubBox>() {
		Some(sub) => Ok(sub.name.clone()),
		None => Err(WireError::NotRemoteSafe { kind: "box" }),
	}
}

/// Flatten a remote-safe message into its wire form. Callers are expected
/// to convert with `Message::to_remote` first.
pub fn encode(msg: &Message) -> Result<WireMessage, WireError> {
	let payload = match &msg.payload {
		Payload::Empty => WirePayload::Empty,
		Payload::Text(data) => WirePayload::Text { data: data.clone() },
		Payload::Rpc { name, args } => WirePayload::Rpc {
			name: name.clone(),
			args: args.clone(),
		},
		Payload::RpcReturn { data } => WirePayload::RpcReturn { data: data.clone() },
		Payload::RpcError { message } => WirePayload::RpcError {
			message: message.clone(),
		},
		Payload::Sub { name, msg } => WirePayload::Sub {
			name: name.clone(),
			msg: Box::new(encode(msg)?),
		},
		Payload::Relay { .. } => return Err(WireError::NotRemoteSafe { kind: "relay" }),
		Payload::Register { path } => WirePayload::Register { path: path.clone() },
		Payload::Unregister { path } => WirePayload::Unregister { path: path.clone() },
	};

	Ok(WireMessage {
		reply_to: msg.reply_box.as_ref().map(box_key).transpose()?,
		error_to: msg.error_box.as_ref().map(box_key).transpose()?,
		payload,
	})
}

/// Rebuild a message on the receiving side. Every box key is rebound to a
/// sub box over `return_route`, the box that sends back across this link.
pub fn decode(wire: WireMessage, return_route: &BoxHandle) -> Message {
	let rebind =
		|name: String| Arc::new(SubBox::new(name, return_route.clone())) as BoxHandle;

	let payload = match wire.payload {
		WirePayload::Empty => Payload::Empty,
		WirePayload::Text { data } => Payload::Text(data),
		WirePayload::Rpc { name, args } => Payload::Rpc { name, args },
		WirePayload::RpcReturn { data } => Payload::RpcReturn { data },
		WirePayload::RpcError { message } => Payload::RpcError { message },
		WirePayload::Sub { name, msg } => Payload::Sub {
			name,
			msg: Box::new(decode(*msg, return_route)),
		},
		WirePayload::Register { path } => Payload::Register { path },
		WirePayload::Unregister { path } => Payload::Unregister { path },
	};

	Message {
		reply_box: wire.reply_to.map(rebind),
		error_box: wire.error_to.map(rebind),
		payload,
	}
}

pub async fn write_frame<W>(writer: &mut W, wire: &WireMessage) -> Result<(), WireError>
where
	W: AsyncWrite + Unpin,
{
	let mut frame = serde_json::to_vec(wire)?;
	frame.push(b'\n');
	writer.write_all(&frame).await?;
	writer.flush().await?;
	Ok(())
}

pub async fn read_frame<R>(reader: &mut R) -> Result<Option<WireMessage>, WireError>
where
	R: AsyncBufRead + Unpin,
{
	let mut line = String::new();
	if reader.read_line(&mut line).await? == 0 {
		return Ok(None);
	}
	Ok(Some(serde_json::from_str(line.trim_end())?))
}
