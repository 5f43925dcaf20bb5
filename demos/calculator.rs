use runy_box::ChannelTransport;
use runy_box::DispatchTable;
use runy_box::InterfaceDef;
use runy_box::OperationDef;
use runy_box::Registry;
use runy_box::SkeletonBox;
use runy_box::Stub;
use runy_box::SubBox;
use runy_box::handle;
use serde_json::json;

// Two endpoints linked in-process. Messages still take the full remote
// path - conversion, encoding, decoding - so this is the same wiring a
// socket deployment would use.

static CALCULATOR: InterfaceDef = InterfaceDef {
	name: "Calculator",
	operations: &[
		OperationDef {
			name: "add",
			returns: true,
		},
		OperationDef {
			name: "mul",
			returns: true,
		},
	],
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let client_registry = Registry::new();
	let server_registry = Registry::new();

	let (client_link, _server_link) = ChannelTransport::pair(
		client_registry.clone() as runy_box::BoxHandle,
		server_registry.clone() as runy_box::BoxHandle,
	);

	let table = DispatchTable::new()
		.operation("add", |args| async move {
			let a = args[0].as_i64().unwrap_or(0);
			let b = args[1].as_i64().unwrap_or(0);
			Ok(json!(a + b))
		})
		.operation("mul", |args| async move {
			let a = args[0].as_i64().unwrap_or(0);
			let b = args[1].as_i64().unwrap_or(0);
			Ok(json!(a * b))
		});
	server_registry.register("calc", handle(SkeletonBox::new(table)))?;

	let stub = Stub::new(
		&CALCULATOR,
		handle(SubBox::new("calc", client_link)),
		client_registry.clone(),
		client_registry.clone(),
	);

	let sum = stub
		.call("add", vec![json!(2), json!(3)])
		.await?
		.expect("add returns a value")
		.reply()
		.await?;
	println!("2 + 3 = {sum}");

	let product = stub
		.call("mul", vec![json!(6), json!(7)])
		.await?
		.expect("mul returns a value")
		.reply()
		.await?;
	println!("6 * 7 = {product}");

	Ok(())
}
