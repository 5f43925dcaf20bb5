use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

/// Cooperative stop signal for pump and accept loops. Cancelling a token
/// cancels every child taken from it; children taken after cancellation are
/// born cancelled.
#[derive(Clone)]
pub struct ShutdownToken {
	inner: Arc<Node>,
}

struct Node {
	state: watch::Sender<bool>,
	children: Mutex<Vec<Arc<Node>>>,
}

impl Default for ShutdownToken {
	fn default() -> Self {
		Self::new()
	}
}

impl ShutdownToken {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Node {
				state: watch::Sender::new(false),
				children: Mutex::new(Vec::new()),
			}),
		}
	}

	pub fn cancel(&self) {
		self.inner.cancel();
	}

	pub fn is_cancelled(&self) -> bool {
		*self.inner.state.borrow()
	}

	pub async fn cancelled(&self) {
		let mut recv = self.inner.state.subscribe();
		if recv.wait_for(|stopped| *stopped).await.is_err() {
			std::future::pending::<()>().await;
		}
	}

	pub fn child(&self) -> ShutdownToken {
		// locking to prevent adding children while a cancel is running
		let mut children = self.inner.children.lock();
		if *self.inner.state.borrow() {
			return self.clone();
		}
		let node = Arc::new(Node {
			state: watch::Sender::new(false),
			children: Mutex::new(Vec::new()),
		});
		children.push(node.clone());
		ShutdownToken { inner: node }
	}
}

impl Node {
	fn cancel(&self) {
		let children = self.children.lock();
		let first = self.state.send_if_modified(|stopped| {
			if *stopped {
				false
			} else {
				*stopped = true;
				true
			}
		});
		if first {
			for child in children.iter() {
				child.cancel();
			}
		}
	}
}
