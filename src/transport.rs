//! Transport adapter contract, plus an in-process reference adapter.
//!
//! An adapter is a mailbox bound to a real channel. Sending converts the
//! message to remote-safe form, encodes it through [`crate::wire`], and
//! moves the bytes; receiving decodes with the adapter's own return route
//! (the box that sends back across the same link) and delivers to a
//! configured local delegate, normally the endpoint's registry. Adapters
//! differ only in how bytes cross the boundary.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::ready;
use tokio::sync::mpsc;

use crate::error::BoxError;
use crate::mailbox::BoxHandle;
use crate::mailbox::Mailbox;
use crate::message::Message;
use crate::wire;
use crate::wire::WireMessage;

/// One side of an in-process linked pair. Messages still take the full
/// remote path - conversion, encoding, decoding - so two registries wired
/// through a pair behave exactly like two processes on a socket.
pub struct ChannelTransport {
	tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
	/// Link two endpoints. Messages sent to the first handle are delivered
	/// to `delegate_b`, and vice versa. The pumps stop when both handles of
	/// a direction are gone.
	pub fn pair(delegate_a: BoxHandle, delegate_b: BoxHandle) -> (BoxHandle, BoxHandle) {
		let (tx_to_b, rx_at_b) = mpsc::unbounded_channel();
		let (tx_to_a, rx_at_a) = mpsc::unbounded_channel();

		let a: BoxHandle = Arc::new(ChannelTransport { tx: tx_to_b });
		let b: BoxHandle = Arc::new(ChannelTransport { tx: tx_to_a });

		// Replies from B travel over the b handle, so it is the return
		// route for everything arriving at B. Symmetrically for A.
		pump(rx_at_b, delegate_b, b.clone());
		pump(rx_at_a, delegate_a, a.clone());

		(a, b)
	}
}

fn pump(mut rx: mpsc::UnboundedReceiver<String>, delegate: BoxHandle, return_route: BoxHandle) {
	tokio::spawn(async move {
		while let Some(frame) = rx.recv().await {
			metrics::counter!("runy_box_channel_rx_frames").increment(1);
			let parsed = match serde_json::from_str::<WireMessage>(&frame) {
				Ok(parsed) => parsed,
				Err(err) => {
					tracing::warn!(%err, "dropping undecodable frame");
					continue;
				}
			};
			let msg = wire::decode(parsed, &return_route);
			if let Err(err) = delegate.send(msg).await {
				tracing::warn!(%err, "inbound delivery failed");
			}
		}
		tracing::debug!("transport pump stopped");
	});
}

impl Mailbox for ChannelTransport {
	fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
		let frame = wire::encode(&msg.to_remote())
			.and_then(|encoded| serde_json::to_string(&encoded).map_err(Into::into));

		let result = match frame {
			Ok(frame) => {
				metrics::counter!("runy_box_channel_tx_frames").increment(1);
				self.tx.send(frame).map_err(|_| BoxError::Closed)
			}
			Err(err) => Err(err.into()),
		};
		ready(result).boxed()
	}

	fn to_remote(self: Arc<Self>) -> BoxHandle {
		self
	}
}
