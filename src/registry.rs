use std::sync::Arc;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::ready;

use crate::error::BoxError;
use crate::mailbox::BoxHandle;
use crate::mailbox::Mailbox;
use crate::message::Message;
use crate::message::Payload;

/// The name -> box directory of one endpoint. Registration is first-wins;
/// lookups and removals are linearizable through the map's entry API, so
/// concurrent senders never observe a torn entry.
pub struct Registry {
	entries: DashMap<String, Arc<RegistryEntry>>,
	delegate: Option<BoxHandle>,
}

/// Thin addressable proxy stored for each registered name.
pub struct RegistryEntry {
	pub name: String,
	target: BoxHandle,
}

impl std::fmt::Debug for RegistryEntry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RegistryEntry")
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

impl Mailbox for RegistryEntry {
	fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
		self.target.send(msg)
	}

	fn to_remote(self: Arc<Self>) -> BoxHandle {
		self
	}
}

impl Registry {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			entries: DashMap::new(),
			delegate: None,
		})
	}

	/// A registry that hands messages it has no use for to `delegate`
	/// instead of dropping them.
	pub fn with_delegate(delegate: BoxHandle) -> Arc<Self> {
		Arc::new(Self {
			entries: DashMap::new(),
			delegate: Some(delegate),
		})
	}

	pub fn register(
		&self,
		name: impl Into<String>,
		target: BoxHandle,
	) -> Result<Arc<RegistryEntry>, BoxError> {
		let name = name.into();
		match self.entries.entry(name.clone()) {
			Entry::Occupied(_) => Err(BoxError::NameAlreadyRegistered { name }),
			Entry::Vacant(slot) => {
				let entry = Arc::new(RegistryEntry { name, target });
				slot.insert(entry.clone());
				Ok(entry)
			}
		}
	}

	pub fn get(&self, name: &str) -> Result<BoxHandle, BoxError> {
		self.entry(name).map(|e| e as BoxHandle).ok_or_else(|| {
			BoxError::NoSuchName {
				name: name.to_string(),
			}
		})
	}

	pub fn entry(&self, name: &str) -> Option<Arc<RegistryEntry>> {
		self.entries.get(name).map(|e| e.value().clone())
	}

	/// Unconditional and idempotent; unregistering a missing name is not an
	/// error.
	pub fn unregister(&self, name: &str) {
		self.entries.remove(name);
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl Mailbox for Registry {
	fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
		let Message {
			reply_box,
			error_box,
			payload,
		} = msg;

		match payload {
			Payload::Sub { name, msg } => match self.entry(&name) {
				Some(entry) => async move { entry.send(*msg).await }.boxed(),
				None => {
					// Late replies to one-shot boxes land here; harmless.
					tracing::debug!(%name, "dropping message for unregistered name");
					ready(Ok(())).boxed()
				}
			},
			Payload::Register { path } => {
				let Some(target) = reply_box else {
					tracing::warn!(%path, "register request without a reply box");
					return ready(Ok(())).boxed();
				};
				match self.register(path, target) {
					Ok(_) => ready(Ok(())).boxed(),
					Err(err) => match error_box {
						Some(error_box) => async move {
							error_box.send(Message::rpc_error(err.to_string())).await
						}
						.boxed(),
						None => {
							tracing::warn!(%err, "register request rejected");
							ready(Ok(())).boxed()
						}
					},
				}
			}
			Payload::Unregister { path } => {
				self.unregister(&path);
				ready(Ok(())).boxed()
			}
			payload => match &self.delegate {
				Some(delegate) => delegate.send(Message {
					reply_box,
					error_box,
					payload,
				}),
				None => ready(Ok(())).boxed(),
			},
		}
	}

	fn to_remote(self: Arc<Self>) -> BoxHandle {
		self
	}
}

/// Addresses a registry entry by name, resolving at send time. The first
/// successful resolution is cached and reused; sends before the name exists
/// are dropped.
pub struct NamedBox {
	pub path: String,
	registry: Arc<Registry>,
	resolved: ArcSwapOption<RegistryEntry>,
}

impl NamedBox {
	pub fn new(path: impl Into<String>, registry: Arc<Registry>) -> Self {
		Self {
			path: path.into(),
			registry,
			resolved: ArcSwapOption::empty(),
		}
	}

	fn resolve(&self) -> Option<Arc<RegistryEntry>> {
		if let Some(entry) = self.resolved.load_full() {
			return Some(entry);
		}
		let entry = self.registry.entry(&self.path)?;
		self.resolved.store(Some(entry.clone()));
		Some(entry)
	}
}

impl Mailbox for NamedBox {
	fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
		match self.resolve() {
			Some(entry) => async move { entry.send(msg).await }.boxed(),
			None => {
				tracing::debug!(path = %self.path, "dropping message for unresolved name");
				ready(Ok(())).boxed()
			}
		}
	}

	fn to_remote(self: Arc<Self>) -> BoxHandle {
		self
	}
}
