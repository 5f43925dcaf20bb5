use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::ready;
use take_once::TakeOnce;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::error::BoxError;
use crate::mailbox::BoxHandle;
use crate::mailbox::Mailbox;
use crate::message::Message;
use crate::message::Payload;
use crate::message::Value;
use crate::registry::Registry;
use crate::route::SubBox;

static NEXT_REPLY_ID: AtomicU64 = AtomicU64::new(1);

fn next_reply_id() -> String {
    format!("r-{}", NEXT_REPLY_ID.fetch_add(1, Ordering::Relaxed))
}

/// Errors that can occur while waiting for a correlated reply.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("failed to receive reply: {0}")]
    RecvFailed(#[from] oneshot::error::RecvError),
    #[error("reply timed out after {timeout:?}")]
    Timeout { timeout: Duration },
    #[error("call handle already consumed")]
    AlreadyConsumed,
    #[error("remote call failed: {message}")]
    Remote { message: String },
}

/// A one-shot, self-deregistering reply address.
///
/// Construction registers the box in the given registry under a
/// process-unique id. The first message delivered takes the delegate out of
/// its slot, removes the registry entry, and forwards; any later delivery is
/// a no-op. `return_route` is the box a remote peer can use to reach this
/// endpoint's registry, and becomes the delegate of the remote-safe form.
pub struct AnonymousReplyBox {
    id: String,
    registry: Arc<Registry>,
    return_route: BoxHandle,
    delegate: TakeOnce<BoxHandle>,
}

impl AnonymousReplyBox {
    pub fn new(
        registry: Arc<Registry>,
        return_route: BoxHandle,
        delegate: BoxHandle,
    ) -> Result<Arc<Self>, BoxError> {
        let id = next_reply_id();
        let slot = TakeOnce::new();
        let _ = slot.store(delegate);
        let this = Arc::new(Self {
            id: id.clone(),
            registry: registry.clone(),
            return_route,
            delegate: slot,
        });
        registry.register(id, this.clone())?;
        Ok(this)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Drop the pending delivery without forwarding anything. Removes the
    /// registry entry so an abandoned call does not leak it.
    pub fn cancel(&self) {
        self.delegate.take();
        self.registry.unregister(&self.id);
    }
}

impl Mailbox for AnonymousReplyBox {
    fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
        match self.delegate.take() {
            Some(delegate) => {
                self.registry.unregister(&self.id);
                async move { delegate.send(msg).await }.boxed()
            }
            None => ready(Ok(())).boxed(),
        }
    }

    fn to_remote(self: Arc<Self>) -> BoxHandle {
        Arc::new(SubBox::new(self.id.clone(), self.return_route.clone()))
    }
}

/// Terminal single-use receiver that resolves a pending call. A return
/// payload resolves it with the carried data, an error payload with the
/// carried failure; everything else is ignored.
pub struct RpcReturnBox {
    sender: TakeOnce<oneshot::Sender<Result<Value, CallError>>>,
}

impl RpcReturnBox {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<Result<Value, CallError>>) {
        let (tx, rx) = oneshot::channel();
        let sender = TakeOnce::new();
        let _ = sender.store(tx);
        (Arc::new(Self { sender }), rx)
    }
}

impl Mailbox for RpcReturnBox {
    fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
        match msg.payload {
            Payload::RpcReturn { data } => {
                if let Some(tx) = self.sender.take() {
                    let _ = tx.send(Ok(data));
                }
            }
            Payload::RpcError { message } => {
                if let Some(tx) = self.sender.take() {
                    let _ = tx.send(Err(CallError::Remote { message }));
                }
            }
            _ => {}
        }
        ready(Ok(())).boxed()
    }

    fn to_remote(self: Arc<Self>) -> BoxHandle {
        self
    }
}

/// Handle for a pending call - allows waiting for the reply or ignoring it.
///
/// There is no default deadline: an unanswered call pends forever unless a
/// timeout is set. Both the timeout and `cancel` unregister the pending
/// reply box.
pub struct CallHandle {
    receiver: Option<oneshot::Receiver<Result<Value, CallError>>>,
    reply_box: Arc<AnonymousReplyBox>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for CallHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallHandle")
            .field("reply_id", &self.reply_box.id())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CallHandle {
    pub(crate) fn new(
        receiver: oneshot::Receiver<Result<Value, CallError>>,
        reply_box: Arc<AnonymousReplyBox>,
    ) -> Self {
        Self {
            receiver: Some(receiver),
            reply_box,
            timeout: None,
        }
    }

    /// Set a deadline for the reply (chainable).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait for the correlated reply.
    pub async fn reply(mut self) -> Result<Value, CallError> {
        let receiver = self.receiver.take().ok_or(CallError::AlreadyConsumed)?;

        if let Some(timeout) = self.timeout {
            match tokio::time::timeout(timeout, receiver).await {
                Ok(result) => result.map_err(CallError::RecvFailed)?,
                Err(_) => {
                    self.reply_box.cancel();
                    Err(CallError::Timeout { timeout })
                }
            }
        } else {
            receiver.await.map_err(CallError::RecvFailed)?
        }
    }

    /// Fire and forget - drop the receiver but leave the reply box armed.
    pub fn forget(mut self) {
        self.receiver.take();
    }

    /// Abandon the call and remove its registry entry.
    pub fn cancel(self) {
        self.reply_box.cancel();
    }

    pub fn reply_id(&self) -> &str {
        self.reply_box.id()
    }
}
