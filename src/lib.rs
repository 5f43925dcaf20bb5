mod error;
mod mailbox;
mod message;
mod registry;
mod reply;
mod route;
mod rpc;
mod shutdown;
mod socket;
mod transport;
pub mod wire;

pub mod prelude {
	pub use super::mailbox::BoxHandle;
	pub use super::mailbox::Mailbox;
	pub use super::message::Message;
	pub use super::message::Payload;
	pub use super::message::Value;
	pub use super::registry::Registry;
	pub use super::rpc::Stub;
}

pub use error::BoxError;
pub use mailbox::BoxHandle;
pub use mailbox::Mailbox;
pub use mailbox::NullBox;
pub use mailbox::handle;
pub use message::Message;
pub use message::Payload;
pub use message::Value;
pub use registry::NamedBox;
pub use registry::Registry;
pub use registry::RegistryEntry;
pub use reply::AnonymousReplyBox;
pub use reply::CallError;
pub use reply::CallHandle;
pub use reply::RpcReturnBox;
pub use route::ForwardBox;
pub use route::LoggingBox;
pub use route::ProxyBox;
pub use route::RelayBox;
pub use route::SubBox;
pub use rpc::DispatchTable;
pub use rpc::InterfaceDef;
pub use rpc::OperationDef;
pub use rpc::RpcTarget;
pub use rpc::SkeletonBox;
pub use rpc::Stub;
pub use shutdown::ShutdownToken;
pub use socket::SocketBox;
pub use socket::SocketServer;
pub use transport::ChannelTransport;
pub use wire::WireError;
