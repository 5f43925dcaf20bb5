use crate::wire::WireError;

#[derive(thiserror::Error, Debug)]
pub enum BoxError {
	#[error("name {name:?} is already registered")]
	NameAlreadyRegistered { name: String },

	#[error("no box is registered under {name:?}")]
	NoSuchName { name: String },

	#[error("unsupported message type: {message_type}")]
	InvalidMessage { message_type: &'static str },

	#[error("interface declares no operation {name:?}")]
	NoSuchOperation { name: String },

	#[error("transport endpoint is closed")]
	Closed,

	#[error(transparent)]
	Wire(#[from] WireError),
}
