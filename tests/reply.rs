use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use runy_box::AnonymousReplyBox;
use runy_box::BoxError;
use runy_box::BoxHandle;
use runy_box::Mailbox;
use runy_box::Message;
use runy_box::Payload;
use runy_box::Registry;
use runy_box::RpcReturnBox;
use runy_box::SubBox;
use serde_json::json;
use tokio::sync::mpsc;

struct CaptureBox {
	tx: mpsc::UnboundedSender<Message>,
}

impl CaptureBox {
	fn new() -> (BoxHandle, mpsc::UnboundedReceiver<Message>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Arc::new(CaptureBox { tx }), rx)
	}
}

impl Mailbox for CaptureBox {
	fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
		let _ = self.tx.send(msg);
		futures::future::ready(Ok(())).boxed()
	}

	fn to_remote(self: Arc<Self>) -> BoxHandle {
		self
	}
}

#[tokio::test]
async fn anonymous_reply_box_delivers_exactly_once() {
	let registry = Registry::new();
	let (delegate, mut rx) = CaptureBox::new();
	let reply = AnonymousReplyBox::new(registry.clone(), registry.clone(), delegate).unwrap();

	assert!(registry.get(reply.id()).is_ok());

	reply.send(Message::text("first")).await.unwrap();
	let msg = rx.try_recv().unwrap();
	assert!(matches!(msg.payload, Payload::Text(ref data) if data == "first"));

	// Delivery deregisters the box; a second send goes nowhere and the
	// entry does not come back.
	assert!(registry.get(reply.id()).is_err());
	reply.send(Message::text("second")).await.unwrap();
	assert!(rx.try_recv().is_err());
	assert!(registry.get(reply.id()).is_err());
}

#[tokio::test]
async fn cancel_removes_the_registry_entry_without_delivering() {
	let registry = Registry::new();
	let (delegate, mut rx) = CaptureBox::new();
	let reply = AnonymousReplyBox::new(registry.clone(), registry.clone(), delegate).unwrap();

	reply.cancel();

	assert!(registry.get(reply.id()).is_err());
	reply.send(Message::text("late")).await.unwrap();
	assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn remote_form_is_a_sub_box_keyed_by_the_reply_id() {
	let registry = Registry::new();
	let (delegate, _rx) = CaptureBox::new();
	let reply = AnonymousReplyBox::new(registry.clone(), registry.clone(), delegate).unwrap();
	let id = reply.id().to_string();

	let msg = Message::rpc("add", vec![json!(2), json!(3)]).with_reply(reply);
	let remote = msg.to_remote();

	let reply_box = remote.reply_box.clone().unwrap();
	let sub = reply_box.downcast_ref::<SubBox>().expect("sub box");
	assert_eq!(sub.name, id);

	// The original message still addresses the local box.
	assert!(
		msg.reply_box
			.as_ref()
			.unwrap()
			.downcast_ref::<AnonymousReplyBox>()
			.is_some()
	);

	// Converting an already remote-safe message is a no-op for its boxes.
	let twice = remote.to_remote();
	let reply_box_twice = twice.reply_box.unwrap();
	assert!(Arc::ptr_eq(&reply_box, &reply_box_twice));
	let sub_twice = reply_box_twice.downcast_ref::<SubBox>().unwrap();
	assert_eq!(sub_twice.name, id);
}

#[tokio::test]
async fn rpc_return_box_resolves_on_return_payload() {
	let (return_box, receiver) = RpcReturnBox::new();

	// Off-contract messages are ignored by the terminal receiver.
	return_box.send(Message::text("noise")).await.unwrap();

	return_box
		.send(Message::rpc_return(json!(5)))
		.await
		.unwrap();

	assert_eq!(receiver.await.unwrap().unwrap(), json!(5));
}

#[tokio::test]
async fn rpc_return_box_resolves_error_payload_as_failure() {
	let (return_box, receiver) = RpcReturnBox::new();

	return_box
		.send(Message::rpc_error("division by zero"))
		.await
		.unwrap();

	let result = receiver.await.unwrap();
	assert!(result.is_err());
}
