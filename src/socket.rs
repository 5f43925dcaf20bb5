use std::net::SocketAddr;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::ready;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::net::ToSocketAddrs;
use tokio::sync::mpsc;

use crate::error::BoxError;
use crate::mailbox::BoxHandle;
use crate::mailbox::Mailbox;
use crate::message::Message;
use crate::shutdown::ShutdownToken;
use crate::wire;

/// A mailbox bound to one TCP stream. Outbound messages are converted,
/// encoded and queued to a writer task; a reader task decodes inbound
/// frames with this box as their return route and delivers them to the
/// local delegate.
pub struct SocketBox {
	tx: mpsc::UnboundedSender<String>,
}

impl SocketBox {
	pub async fn connect(addr: impl ToSocketAddrs, delegate: BoxHandle) -> std::io::Result<BoxHandle> {
		let stream = TcpStream::connect(addr).await?;
		Ok(Self::bind_stream(stream, delegate, ShutdownToken::new()))
	}

	pub(crate) fn bind_stream(
		stream: TcpStream,
		delegate: BoxHandle,
		shutdown: ShutdownToken,
	) -> BoxHandle {
		let (read_half, mut write_half) = stream.into_split();
		let (tx, mut rx) = mpsc::unbounded_channel::<String>();
		let this: BoxHandle = Arc::new(SocketBox { tx });

		tokio::spawn(async move {
			while let Some(frame) = rx.recv().await {
				if let Err(err) = write_half.write_all(frame.as_bytes()).await {
					tracing::warn!(%err, "socket write failed");
					break;
				}
				metrics::counter!("runy_box_socket_tx_frames").increment(1);
			}
		});

		let return_route = this.clone();
		tokio::spawn(async move {
			let mut reader = BufReader::new(read_half);
			loop {
				tokio::select! {
					_ = shutdown.cancelled() => break,
					frame = wire::read_frame(&mut reader) => match frame {
						Ok(Some(frame)) => {
							metrics::counter!("runy_box_socket_rx_frames").increment(1);
							let msg = wire::decode(frame, &return_route);
							if let Err(err) = delegate.send(msg).await {
								tracing::warn!(%err, "inbound delivery failed");
							}
						}
						Ok(None) => break,
						Err(err) => {
							tracing::warn!(%err, "socket read failed");
							break;
						}
					}
				}
			}
			tracing::debug!("socket reader stopped");
		});

		this
	}
}

impl Mailbox for SocketBox {
	fn send(&self, msg: Message) -> BoxFuture<'_, Result<(), BoxError>> {
		let frame = wire::encode(&msg.to_remote())
			.and_then(|encoded| serde_json::to_string(&encoded).map_err(Into::into));

		let result = match frame {
			Ok(mut frame) => {
				frame.push('\n');
				self.tx.send(frame).map_err(|_| BoxError::Closed)
			}
			Err(err) => Err(err.into()),
		};
		ready(result).boxed()
	}

	fn to_remote(self: Arc<Self>) -> BoxHandle {
		self
	}
}

/// Listens on a TCP address and delivers every inbound message to one
/// delegate, normally a registry. Each accepted connection gets its own
/// reader pump and return route.
pub struct SocketServer {
	local_addr: SocketAddr,
	shutdown: ShutdownToken,
}

impl SocketServer {
	pub async fn bind(addr: impl ToSocketAddrs, delegate: BoxHandle) -> std::io::Result<SocketServer> {
		let listener = TcpListener::bind(addr).await?;
		let local_addr = listener.local_addr()?;
		let shutdown = ShutdownToken::new();

		tokio::spawn({
			let shutdown = shutdown.clone();
			async move {
				loop {
					tokio::select! {
						_ = shutdown.cancelled() => break,
						accepted = listener.accept() => match accepted {
							Ok((stream, peer)) => {
								tracing::debug!(%peer, "connection accepted");
								SocketBox::bind_stream(stream, delegate.clone(), shutdown.child());
							}
							Err(err) => {
								tracing::warn!(%err, "accept failed");
							}
						}
					}
				}
				tracing::debug!("socket server stopped");
			}
		});

		Ok(SocketServer {
			local_addr,
			shutdown,
		})
	}

	pub fn local_addr(&self) -> SocketAddr {
		self.local_addr
	}

	/// Stop accepting and tear down every connection pump.
	pub fn shutdown(&self) {
		self.shutdown.cancel();
	}
}
