//! WebSocket transport for the packager connection, on tokio-tungstenite.
//!
//! Each [`TungsteniteWebSocket`] runs one tokio task that owns the socket.
//! Outgoing frames reach it over an unbounded channel; socket events go back
//! to the [`WebSocketDelegate`] through a [`ScopedExecutor`], so they land on
//! the packager connection's queue and are dropped once the delegate is gone.

use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::error::Error;
use crate::executor::{ScopedExecutor, Task, VoidExecutor};
use crate::packager::{InspectorPackagerConnectionDelegate, WebSocket, WebSocketDelegate};

type DelegateExecutor = ScopedExecutor<dyn WebSocketDelegate>;

/// A client WebSocket driven by a tokio task.
///
/// Dropping it aborts the task; the delegate hears nothing further.
pub struct TungsteniteWebSocket {
	outgoing: mpsc::UnboundedSender<String>,
	task: JoinHandle<()>,
}

impl TungsteniteWebSocket {
	/// Starts connecting to `url` on `handle`. The outcome is reported through
	/// `delegate` as `did_open` or `did_fail_with_error`.
	pub fn connect(handle: &Handle, url: &str, delegate: DelegateExecutor) -> Self {
		let (outgoing, receiver) = mpsc::unbounded_channel();
		let task = handle.spawn(run_socket(url.to_string(), receiver, delegate));
		Self { outgoing, task }
	}
}

impl WebSocket for TungsteniteWebSocket {
	fn send(&self, message: &str) {
		if self.outgoing.send(message.to_string()).is_err() {
			tracing::debug!(target = "jsinspector", "socket task finished, dropping outgoing message");
		}
	}
}

impl Drop for TungsteniteWebSocket {
	fn drop(&mut self) {
		self.task.abort();
	}
}

fn report_failure(delegate: &DelegateExecutor, err: Error) {
	let posix_code = err.raw_os_error();
	let message = err.to_string();
	delegate.execute(move |delegate| delegate.did_fail_with_error(posix_code, &message));
}

async fn run_socket(url: String, mut outgoing: mpsc::UnboundedReceiver<String>, delegate: DelegateExecutor) {
	let stream = match tokio_tungstenite::connect_async(url.as_str()).await {
		Ok((stream, _response)) => stream,
		Err(err) => {
			report_failure(&delegate, err.into());
			return;
		}
	};
	delegate.execute(|delegate| delegate.did_open());

	let (mut sink, mut stream) = stream.split();
	loop {
		tokio::select! {
			message = outgoing.recv() => match message {
				Some(text) => {
					if let Err(err) = sink.send(Message::Text(text)).await {
						report_failure(&delegate, err.into());
						return;
					}
				}
				None => {
					let _ = sink.close().await;
					return;
				}
			},
			incoming = stream.next() => match incoming {
				Some(Ok(Message::Text(text))) => {
					delegate.execute(move |delegate| delegate.did_receive_message(&text));
				}
				Some(Ok(Message::Close(_))) | None => {
					delegate.execute(|delegate| delegate.did_close());
					return;
				}
				Some(Ok(_)) => {}
				Some(Err(err)) => {
					report_failure(&delegate, err.into());
					return;
				}
			},
		}
	}
}

/// [`InspectorPackagerConnectionDelegate`] for hosts running tokio.
///
/// Sockets and timers run on `handle`; every callback is delivered through
/// `executor`, usually a [`TaskQueue`](crate::executor::TaskQueue).
pub struct TokioPackagerDelegate {
	handle: Handle,
	executor: VoidExecutor,
}

impl TokioPackagerDelegate {
	pub fn new(handle: Handle, executor: VoidExecutor) -> Self {
		Self { handle, executor }
	}
}

impl InspectorPackagerConnectionDelegate for TokioPackagerDelegate {
	fn connect_web_socket(&self, url: &str, delegate: Weak<dyn WebSocketDelegate>) -> Box<dyn WebSocket> {
		tracing::debug!(target = "jsinspector", url, "connecting to packager");
		let delegate = ScopedExecutor::new(delegate, Arc::clone(&self.executor));
		Box::new(TungsteniteWebSocket::connect(&self.handle, url, delegate))
	}

	fn schedule_callback(&self, callback: Task, delay: Duration) {
		let executor = Arc::clone(&self.executor);
		self.handle.spawn(async move {
			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}
			executor(callback);
		});
	}
}
