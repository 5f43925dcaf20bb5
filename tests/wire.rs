use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use runy_box::BoxError;
use runy_box::BoxHandle;
use runy_box::Mailbox;
use runy_box::Message;
use runy_box::NullBox;
use runy_box::Payload;
use runy_box::SubBox;
use runy_box::WireError;
use runy_box::wire;
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
async fn reply_keys_survive_the_wire_and_rebind_to_the_return_route() {
	let null: BoxHandle = Arc::new(NullBox);
	let msg = Message::rpc("add", vec![json!(2), json!(3)])
		.with_reply(Arc::new(SubBox::new("r-42", null.clone())));

	let encoded = wire::encode(&msg).unwrap();
	let text = serde_json::to_string(&encoded).unwrap();
	let decoded: runy_box::wire::WireMessage = serde_json::from_str(&text).unwrap();

	let (route, mut route_rx) = CaptureBox::new();
	let rebuilt = wire::decode(decoded, &route);

	assert!(matches!(
		rebuilt.payload,
		Payload::Rpc { ref name, ref args } if name == "add" && args.len() == 2
	));

	let reply = rebuilt.reply_box.unwrap();
	let sub = reply.downcast_ref::<SubBox>().unwrap();
	assert_eq!(sub.name, "r-42");

	// The rebound reply box routes back through the receiving link.
	reply.send(Message::rpc_return(json!(5))).await.unwrap();
	let routed = route_rx.try_recv().unwrap();
	assert!(matches!(routed.payload, Payload::Sub { ref name, .. } if name == "r-42"));
}

#[tokio::test]
async fn sub_payloads_encode_recursively() {
	let msg = Message::sub("calc", Message::rpc("add", vec![json!(1), json!(1)]));

	let encoded = wire::encode(&msg).unwrap();
	let (route, _route_rx) = CaptureBox::new();
	let rebuilt = wire::decode(encoded, &route);

	match rebuilt.payload {
		Payload::Sub { name, msg } => {
			assert_eq!(name, "calc");
			assert!(matches!(msg.payload, Payload::Rpc { .. }));
		}
		other => panic!("expected sub payload, got {}", other.kind()),
	}
}

#[tokio::test]
async fn local_only_boxes_are_not_wire_encodable() {
	let (capture, _rx) = CaptureBox::new();
	let msg = Message::text("hello").with_reply(capture);

	let err = wire::encode(&msg).unwrap_err();
	assert!(matches!(err, WireError::NotRemoteSafe { .. }));
}

#[tokio::test]
async fn relay_payloads_are_not_wire_encodable() {
	let next: BoxHandle = Arc::new(NullBox);
	let msg = Message::relay(next, Message::text("hop"));

	let err = wire::encode(&msg).unwrap_err();
	assert!(matches!(err, WireError::NotRemoteSafe { .. }));
}
