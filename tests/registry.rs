use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use runy_box::BoxError;
use runy_box::BoxHandle;
use runy_box::Mailbox;
use runy_box::Message;
use runy_box::NamedBox;
use runy_box::Payload;
use runy_box::Registry;
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
async fn duplicate_name_is_rejected_and_original_kept() {
	let registry = Registry::new();
	let (box_a, mut rx_a) = CaptureBox::new();
	let (box_b, mut rx_b) = CaptureBox::new();

	registry.register("worker1", box_a).unwrap();
	let err = registry.register("worker1", box_b).unwrap_err();
	assert!(matches!(err, BoxError::NameAlreadyRegistered { ref name } if name == "worker1"));

	registry
		.send(Message::sub("worker1", Message::text("job")))
		.await
		.unwrap();

	assert!(rx_a.try_recv().is_ok());
	assert!(rx_b.try_recv().is_err());
}

#[tokio::test]
async fn unregister_is_idempotent() {
	let registry = Registry::new();
	let (capture, _rx) = CaptureBox::new();

	registry.register("worker1", capture).unwrap();
	registry.unregister("worker1");
	registry.unregister("worker1");
	registry.unregister("never-existed");

	assert!(matches!(
		registry.get("worker1"),
		Err(BoxError::NoSuchName { ref name }) if name == "worker1"
	));
	assert!(registry.is_empty());
}

#[tokio::test]
async fn sub_addressing_delivers_to_registered_box() {
	let registry = Registry::new();
	let (worker, mut rx) = CaptureBox::new();
	registry.register("worker1", worker).unwrap();

	registry
		.send(Message::sub("worker1", Message::text("job")))
		.await
		.unwrap();

	let msg = rx.try_recv().unwrap();
	assert!(matches!(msg.payload, Payload::Text(ref data) if data == "job"));
}

#[tokio::test]
async fn sub_addressing_drops_unknown_names() {
	let registry = Registry::new();
	let (worker, mut rx) = CaptureBox::new();
	registry.register("worker1", worker).unwrap();

	registry
		.send(Message::sub("ghost", Message::text("job")))
		.await
		.unwrap();

	assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn register_message_binds_reply_box() {
	let registry = Registry::new();
	let (worker, mut rx) = CaptureBox::new();

	registry
		.send(Message::register("worker1").with_reply(worker))
		.await
		.unwrap();

	registry
		.send(Message::sub("worker1", Message::text("job")))
		.await
		.unwrap();
	assert!(rx.try_recv().is_ok());
}

#[tokio::test]
async fn duplicate_register_message_reports_to_error_box() {
	let registry = Registry::new();
	let (first, _first_rx) = CaptureBox::new();
	let (second, _second_rx) = CaptureBox::new();
	let (errors, mut errors_rx) = CaptureBox::new();

	registry.register("worker1", first).unwrap();
	registry
		.send(
			Message::register("worker1")
				.with_reply(second)
				.with_error(errors),
		)
		.await
		.unwrap();

	let msg = errors_rx.try_recv().unwrap();
	assert!(matches!(msg.payload, Payload::RpcError { .. }));
}

#[tokio::test]
async fn other_messages_go_to_the_delegate() {
	let (delegate, mut rx) = CaptureBox::new();
	let registry = Registry::with_delegate(delegate);

	registry.send(Message::text("passthrough")).await.unwrap();

	assert!(rx.try_recv().is_ok());
}

#[tokio::test]
async fn other_messages_without_delegate_are_dropped() {
	let registry = Registry::new();
	registry.send(Message::text("nowhere")).await.unwrap();
}

#[tokio::test]
async fn named_box_resolves_at_send_time() {
	let registry = Registry::new();
	let named = NamedBox::new("worker1", registry.clone());

	// Nothing registered yet: the send is dropped, not an error.
	named.send(Message::text("early")).await.unwrap();

	let (worker, mut rx) = CaptureBox::new();
	registry.register("worker1", worker).unwrap();

	named.send(Message::text("late")).await.unwrap();

	let msg = rx.try_recv().unwrap();
	assert!(matches!(msg.payload, Payload::Text(ref data) if data == "late"));
}
