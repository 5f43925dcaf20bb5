use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::OnceLock;

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::ready;

use crate::error::BoxError;
use crate::mailbox::BoxHandle;
use crate::mailbox::Mailbox;
use crate::message::Message;
use crate::message::Payload;
use crate::message::Value;
use crate::registry::Registry;
use crate::reply::AnonymousReplyBox;
use crate::reply::CallHandle;
use crate::reply::RpcReturnBox;

/// One operation of a remote interface. `returns: false` marks a
/// fire-and-forget notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationDef {
    pub name: &'static str,
    pub returns: bool,
}

/// A remote interface known at compile time: its own operations only,
/// nothing inherited.
#[derive(Debug)]
pub struct InterfaceDef {
    pub name: &'static str,
    pub operations: &'static [OperationDef],
}

struct MethodTable {
    operations: HashMap<&'static str, OperationDef>,
}

impl MethodTable {
    fn build(interface: &'static InterfaceDef) -> Self {
        let operations = interface
            .operations
            .iter()
            .map(|op| (op.name, *op))
            .collect();
        Self { operations }
    }

    fn get(&self, name: &str) -> Option<OperationDef> {
        self.operations.get(name).copied()
    }
}

static METHOD_TABLES: OnceLock<DashMap<usize, Arc<MethodTable>>> = OnceLock::new();

// Derived once per descriptor, cached by descriptor identity.
fn method_table(interface: &'static InterfaceDef) -> Arc<MethodTable> {
    let tables = METHOD_TABLES.get_or_init(DashMap::new);
    tables
        .entry(interface as *const InterfaceDef as usize)
        .or_insert_with(|| Arc::new(MethodTable::build(interface)))
        .clone()
}

/// Client-side proxy: turns local calls into addressed invocation messages.
///
/// A value-returning operation allocates a fresh one-shot reply pair and
/// comes back as a [`CallHandle`] without blocking; a notification sends and
/// returns nothing.
pub struct Stub {
    interface: &'static InterfaceDef,
    table: Arc<MethodTable>,
    transport: BoxHandle,
    registry: Arc<Registry>,
    return_route: BoxHandle,
}

impl Stub {
    pub fn new(
        interface: &'static InterfaceDef,
        transport: BoxHandle,
        registry: Arc<Registry>,
        return_route: BoxHandle,
    ) -> Self {
        Self {
            interface,
            table: method_table(interface),
            transport,
            registry,
            return_route,
        }
    }

    pub fn interface(&self) -> &'static InterfaceDef {
        self.interface
    }

    pub async fn call(&self, name: &str, args: Vec<Value>) -> Result<Option<CallHandle>, BoxError> {
        let op = self
            .table
            .get(name)
            .ok_or_else(|| BoxError::NoSuchOperation {
                name: name.to_string(),
            })?;

        let mut msg = Message::rpc(op.name, args);
        let handle = if op.returns {
            let (return_box, receiver) = RpcReturnBox::new();
            let reply_box = AnonymousReplyBox::new(
                self.registry.clone(),
                self.return_route.clone(),
                return_box,
            )?;
            // Success and failure travel on disjoint channels, but both
            // resolve the same pending call.
            msg.reply_box = Some(reply_box.clone());
            msg.error_box = Some(reply_box.clone());
            Some(CallHandle::new(receiver, reply_box))
        } else {
            None
        };

        match self.transport.send(msg).await {
            Ok(()) => Ok(handle),
            Err(err) => {
                if let Some(handle) = handle {
                    handle.cancel();
                }
                Err(err)
            }
        }
    }
}

/// Server-side dispatch: maps an operation name and arguments onto the real
/// object. Object-safe so skeletons can hold any target.
pub trait RpcTarget: Send + Sync + 'static {
    fn invoke(&self, name: &str, args: Vec<Value>) -> BoxFuture<'_, anyhow::Result<Value>>;
}

type OperationFn = Box<dyn Fn(Vec<Value>) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Static dispatch table from operation name to handler closure.
#[derive(Default)]
pub struct DispatchTable {
    operations: HashMap<&'static str, OperationFn>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation<F, Fut>(mut self, name: &'static str, handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.operations
            .insert(name, Box::new(move |args| handler(args).boxed()));
        self
    }
}

impl RpcTarget for DispatchTable {
    fn invoke(&self, name: &str, args: Vec<Value>) -> BoxFuture<'_, anyhow::Result<Value>> {
        match self.operations.get(name) {
            Some(operation) => operation(args),
            None => ready(Err(anyhow::anyhow!("unknown operation {name:?}"))).boxed(),
        }
    }
}

/// Receives invocation messages and runs them against the bound target.
///
/// Only invocation payloads are in contract; anything else fails with
/// [`BoxError::InvalidMessage`] before the target is touched. The
/// invocation itself runs as a spawned task so a slow operation never
/// blocks the sender; a successful result goes to the reply box, a failing
/// one to the error box.
pub struct SkeletonBox {
    target: Arc<dyn RpcTarget>,
}

impl SkeletonBox {
    pub fn new(target: impl RpcTarget) -> Self {
        Self {
            target: Arc::new(target),
        }
    }

    pub fn from_target(target: Arc<dyn RpcTarget>) -> Self {
        Self { target }
    }
}

impl Mailbox for SkeletonBox {
    fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
        let Message {
            reply_box,
            error_box,
            payload,
        } = msg;

        let kind = payload.kind();
        let (name, args) = match payload {
            Payload::Rpc { name, args } => (name, args),
            _ => return ready(Err(BoxError::InvalidMessage { message_type: kind })).boxed(),
        };

        let target = self.target.clone();
        tokio::spawn(async move {
            match target.invoke(&name, args).await {
                Ok(data) => {
                    if let Some(reply_box) = reply_box {
                        if let Err(err) = reply_box.send(Message::rpc_return(data)).await {
                            tracing::warn!(%err, "reply delivery failed");
                        }
                    }
                }
                Err(err) => {
                    tracing::debug!(%name, %err, "operation failed");
                    if let Some(error_box) = error_box {
                        if let Err(err) = error_box.send(Message::rpc_error(err.to_string())).await
                        {
                            tracing::warn!(%err, "error delivery failed");
                        }
                    }
                }
            }
        });
        ready(Ok(())).boxed()
    }

    fn to_remote(self: Arc<Self>) -> BoxHandle {
        self
    }
}
