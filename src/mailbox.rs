use std::sync::Arc;

use downcast_rs::DowncastSync;
use downcast_rs::impl_downcast;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::BoxError;
use crate::message::Message;

/// The right to receive a message. Everything that can be addressed — a
/// registry, a reply slot, a socket, a logging decorator — implements this.
///
/// `send` never blocks on a reply; it resolves once the message is handed
/// to the next hop. Routing implementations are payload-agnostic and drop
/// shapes they do not understand rather than failing; only receivers with a
/// closed input contract reject with [`BoxError::InvalidMessage`].
pub trait Mailbox: DowncastSync {
	fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>>;

	/// The remotely-addressable stand-in for this box. Boxes that are
	/// already safe to reference from a peer return themselves.
	fn to_remote(self: Arc<Self>) -> BoxHandle;
}

impl_downcast!(sync Mailbox);

pub type BoxHandle = Arc<dyn Mailbox>;

/// Discards everything it receives.
pub struct NullBox;

impl Mailbox for NullBox {
	fn send(&self, _msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
		futures::future::ready(Ok(())).boxed()
	}

	fn to_remote(self: Arc<Self>) -> BoxHandle {
		self
	}
}

pub fn handle<M: Mailbox>(mailbox: M) -> BoxHandle {
	Arc::new(mailbox)
}
