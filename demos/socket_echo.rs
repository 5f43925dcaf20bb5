use runy_box::DispatchTable;
use runy_box::InterfaceDef;
use runy_box::OperationDef;
use runy_box::Registry;
use runy_box::SkeletonBox;
use runy_box::SocketBox;
use runy_box::SocketServer;
use runy_box::Stub;
use runy_box::SubBox;
use runy_box::handle;
use serde_json::json;

// An echo service behind a real TCP boundary, addressed through the
// server's registry.

static ECHO: InterfaceDef = InterfaceDef {
	name: "Echo",
	operations: &[OperationDef {
		name: "echo",
		returns: true,
	}],
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let server_registry = Registry::new();
	let table = DispatchTable::new().operation("echo", |args| async move {
		let text = args[0].as_str().unwrap_or_default();
		Ok(json!(format!("echo: {text}")))
	});
	server_registry.register("echo", handle(SkeletonBox::new(table)))?;

	let server = SocketServer::bind("127.0.0.1:0", server_registry.clone()).await?;
	println!("listening on {}", server.local_addr());

	let client_registry = Registry::new();
	let connection = SocketBox::connect(server.local_addr(), client_registry.clone()).await?;

	let stub = Stub::new(
		&ECHO,
		handle(SubBox::new("echo", connection)),
		client_registry.clone(),
		client_registry.clone(),
	);

	for text in ["one", "two", "three"] {
		let reply = stub
			.call("echo", vec![json!(text)])
			.await?
			.expect("echo returns a value")
			.reply()
			.await?;
		println!("{reply}");
	}

	server.shutdown();
	Ok(())
}
