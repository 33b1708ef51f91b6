//! Connection from a device to the packager's inspector proxy.
//!
//! One WebSocket carries every debugger session for every page registered
//! with the [`Inspector`]. The proxy addresses sessions by
//! [`SessionAddress`]; each one maps onto a [`LocalConnection`] opened through
//! the page registry. The socket itself is supplied by the embedder through
//! [`InspectorPackagerConnectionDelegate`], and all delegate callbacks are
//! expected on one queue.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Weak};
use std::time::Duration;

use jsinspector_protocol::{PackagerEvent, PackagerRequest, PageDescriptor, SessionAddress, WrappedEvent};
use parking_lot::Mutex;

use crate::config::PackagerConnectionConfig;
use crate::connection::{LocalConnection, RemoteConnection};
use crate::error::{Error, Result};
use crate::executor::{ScopedExecutor, Task, VoidExecutor};
use crate::inspector::{Inspector, PageStatusListener};

/// Delay between losing the packager and trying to reach it again.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2000);

/// An open WebSocket. Dropping it closes the socket without notifying its
/// delegate.
pub trait WebSocket: Send + Sync {
	fn send(&self, message: &str);
}

/// Socket events, delivered on the packager connection's queue.
pub trait WebSocketDelegate: Send + Sync {
	/// The socket failed; it is closed and will not report `did_close`.
	/// `posix_code` is the OS error, when there is one.
	fn did_fail_with_error(&self, posix_code: Option<i32>, error: &str);

	fn did_receive_message(&self, message: &str);

	fn did_open(&self);

	fn did_close(&self);
}

/// Platform services the packager connection needs.
pub trait InspectorPackagerConnectionDelegate: Send + Sync {
	/// Opens a socket to `url`. Events go to `delegate` if it is still alive.
	fn connect_web_socket(&self, url: &str, delegate: Weak<dyn WebSocketDelegate>) -> Box<dyn WebSocket>;

	/// Runs `callback` on the connection's queue after `delay`.
	fn schedule_callback(&self, callback: Task, delay: Duration);
}

/// Multiplexes debugger sessions over one packager WebSocket.
///
/// Dropping the handle closes the socket. The platform only holds the socket
/// delegate weakly, so events and callbacks that arrive later are dropped.
pub struct InspectorPackagerConnection {
	inner: Arc<Inner>,
}

impl InspectorPackagerConnection {
	pub fn new(
		config: PackagerConnectionConfig,
		inspector: Arc<dyn Inspector>,
		delegate: Arc<dyn InspectorPackagerConnectionDelegate>,
	) -> Self {
		let inner = Arc::new_cyclic(|self_weak: &Weak<Inner>| {
			let scheduler = Arc::clone(&delegate);
			let executor: VoidExecutor =
				Arc::new(move |task: Task| scheduler.schedule_callback(task, Duration::ZERO));
			Inner {
				config,
				inspector,
				delegate,
				self_weak: self_weak.clone(),
				executor: ScopedExecutor::new(self_weak.clone(), executor),
				state: Mutex::new(ConnectionState::default()),
			}
		});
		let listener: Weak<Inner> = Arc::downgrade(&inner);
		let listener: Weak<dyn PageStatusListener> = listener;
		inner.inspector.register_page_status_listener(listener);
		Self { inner }
	}

	/// Opens the WebSocket, replacing any open one. Does nothing after
	/// [`close_quietly`](Self::close_quietly).
	pub fn connect(&self) {
		self.inner.connect();
	}

	pub fn is_connected(&self) -> bool {
		self.inner.state.lock().web_socket.is_some()
	}

	/// Closes the socket and stops reconnecting, for good.
	pub fn close_quietly(&self) {
		self.inner.close_quietly();
	}

	/// Delivers `message` to every session as if the frontend had sent it.
	pub fn send_event_to_all_connections(&self, message: &str) {
		let sessions: Vec<Arc<dyn LocalConnection>> = self
			.inner
			.state
			.lock()
			.sessions
			.values()
			.map(|session| Arc::clone(&session.local))
			.collect();
		for local in sessions {
			local.send_message(message.to_string());
		}
	}
}

struct Session {
	local: Arc<dyn LocalConnection>,
	/// Distinguishes successive occupants of the same address.
	session_id: u64,
}

#[derive(Default)]
struct ConnectionState {
	web_socket: Option<Box<dyn WebSocket>>,
	sessions: HashMap<SessionAddress, Session>,
	next_session_id: u64,
	closed: bool,
	suppress_connection_errors: bool,
	reconnect_pending: bool,
}

struct Inner {
	config: PackagerConnectionConfig,
	inspector: Arc<dyn Inspector>,
	delegate: Arc<dyn InspectorPackagerConnectionDelegate>,
	self_weak: Weak<Inner>,
	executor: ScopedExecutor<Inner>,
	state: Mutex<ConnectionState>,
}

impl Inner {
	fn connect(&self) {
		if self.state.lock().closed {
			tracing::error!(
				target = "jsinspector",
				url = %self.config.url,
				"connect called on a packager connection that was closed"
			);
			return;
		}

		let delegate: Weak<dyn WebSocketDelegate> = self.self_weak.clone();
		// The socket may report events before it is returned.
		let web_socket = self.delegate.connect_web_socket(&self.config.url, delegate);
		let previous = self.state.lock().web_socket.replace(web_socket);
		drop(previous);
	}

	fn close_quietly(&self) {
		let web_socket = {
			let mut state = self.state.lock();
			state.closed = true;
			state.web_socket.take()
		};
		drop(web_socket);
	}

	fn handle_message(&self, message: &str) -> Result<()> {
		match PackagerRequest::parse(message)? {
			PackagerRequest::GetPages => self.send_event(&PackagerEvent::GetPages(self.pages())),
			PackagerRequest::Connect(address) => self.handle_connect(address),
			PackagerRequest::Disconnect(address) => {
				self.handle_disconnect(&address);
				Ok(())
			}
			PackagerRequest::WrappedEvent(event) => {
				self.handle_wrapped_event(event);
				Ok(())
			}
		}
	}

	fn pages(&self) -> Vec<PageDescriptor> {
		self.inspector
			.get_pages()
			.into_iter()
			.map(|page| PageDescriptor {
				id: page.id.to_string(),
				title: format!("{} ({})", self.config.app_name, self.config.device_name),
				description: format!("{} [C++ connection]", page.description),
				app: self.config.app_name.clone(),
				vm: page.vm,
				capabilities: page.capabilities,
			})
			.collect()
	}

	fn handle_connect(&self, address: SessionAddress) -> Result<()> {
		let page_id: i32 = address
			.page_id
			.parse()
			.map_err(|_| Error::InvalidPageId(address.page_id.clone()))?;

		let (existing, displaced, session_id) = {
			let mut state = self.state.lock();
			let existing = state.sessions.remove(&address);
			// Legacy and multi-session clients of one page never coexist.
			let displaced_addresses: Vec<SessionAddress> = if existing.is_some() {
				Vec::new()
			} else {
				state
					.sessions
					.keys()
					.filter(|other| other.page_id == address.page_id && other.is_legacy() != address.is_legacy())
					.cloned()
					.collect()
			};
			let displaced: Vec<Session> = displaced_addresses
				.iter()
				.filter_map(|other| state.sessions.remove(other))
				.collect();
			let session_id = state.next_session_id;
			state.next_session_id += 1;
			(existing, displaced, session_id)
		};

		if let Some(existing) = existing {
			tracing::warn!(
				target = "jsinspector",
				page_id = %address.page_id,
				session_id = %address.session_id,
				"already connected to session, disconnecting it"
			);
			existing.local.disconnect();
			return Ok(());
		}
		for session in displaced {
			tracing::debug!(
				target = "jsinspector",
				page_id = %address.page_id,
				"session displaced by a connect in the other session mode"
			);
			session.local.disconnect();
		}

		let remote = PackagerRemoteConnection {
			executor: self.executor.clone(),
			address: address.clone(),
			session_id,
		};
		match self.inspector.connect(page_id, Box::new(remote)) {
			Some(local) => {
				tracing::debug!(
					target = "jsinspector",
					page_id = %address.page_id,
					session_id = %address.session_id,
					"session connected"
				);
				self.state.lock().sessions.insert(
					address,
					Session {
						local: Arc::from(local),
						session_id,
					},
				);
				Ok(())
			}
			None => {
				tracing::warn!(
					target = "jsinspector",
					page_id = %address.page_id,
					"page rejected the connection or no longer exists"
				);
				self.send_event(&PackagerEvent::Disconnect(address))
			}
		}
	}

	fn handle_disconnect(&self, address: &SessionAddress) {
		let session = self.state.lock().sessions.remove(address);
		if let Some(session) = session {
			session.local.disconnect();
		}
	}

	fn handle_wrapped_event(&self, event: WrappedEvent) {
		let local = self
			.state
			.lock()
			.sessions
			.get(&event.address)
			.map(|session| Arc::clone(&session.local));
		match local {
			Some(local) => local.send_message(event.wrapped_event),
			None => tracing::warn!(
				target = "jsinspector",
				page_id = %event.address.page_id,
				session_id = %event.address.session_id,
				"wrappedEvent for unknown session"
			),
		}
	}

	/// Sends an event on behalf of a session, unless a newer session has
	/// taken its address since.
	fn send_event_if_current(&self, address: &SessionAddress, session_id: u64, event: &PackagerEvent) {
		let current = self
			.state
			.lock()
			.sessions
			.get(address)
			.is_some_and(|session| session.session_id == session_id);
		if !current {
			return;
		}
		if let Err(err) = self.send_event(event) {
			tracing::error!(target = "jsinspector", error = %err, "failed to send packager event");
		}
	}

	/// Frees the address of a session whose page went away and tells the
	/// packager, unless a newer session has taken the address since.
	fn close_session_if_current(&self, address: &SessionAddress, session_id: u64) {
		let session = {
			let mut state = self.state.lock();
			let current = state
				.sessions
				.get(address)
				.is_some_and(|session| session.session_id == session_id);
			if !current {
				return;
			}
			state.sessions.remove(address)
		};
		// Dropped outside the lock, the page side may call back in.
		drop(session);
		tracing::debug!(
			target = "jsinspector",
			page_id = %address.page_id,
			session_id = %address.session_id,
			"page disconnected session"
		);
		if let Err(err) = self.send_event(&PackagerEvent::Disconnect(address.clone())) {
			tracing::error!(target = "jsinspector", error = %err, "failed to send packager event");
		}
	}

	fn send_event(&self, event: &PackagerEvent) -> Result<()> {
		let message = event.to_json()?;
		let state = self.state.lock();
		match &state.web_socket {
			Some(web_socket) => web_socket.send(&message),
			None => tracing::debug!(target = "jsinspector", "dropping packager event while disconnected"),
		}
		Ok(())
	}

	fn disconnect_all_sessions(&self) {
		let sessions: Vec<Session> = self.state.lock().sessions.drain().map(|(_, session)| session).collect();
		for session in sessions {
			session.local.disconnect();
		}
	}

	/// Drops the socket and every session, then schedules one reconnect.
	fn handle_connection_lost(&self) {
		let web_socket = self.state.lock().web_socket.take();
		drop(web_socket);
		self.disconnect_all_sessions();
		self.schedule_reconnect();
	}

	fn schedule_reconnect(&self) {
		{
			let mut state = self.state.lock();
			if state.closed || state.reconnect_pending {
				return;
			}
			state.reconnect_pending = true;
		}

		let inner = self.self_weak.clone();
		self.delegate.schedule_callback(
			Box::new(move || {
				let Some(inner) = inner.upgrade() else {
					return;
				};
				let closed = {
					let mut state = inner.state.lock();
					state.reconnect_pending = false;
					state.closed
				};
				if !closed {
					inner.connect();
				}
			}),
			RECONNECT_DELAY,
		);
	}
}

impl WebSocketDelegate for Inner {
	fn did_fail_with_error(&self, posix_code: Option<i32>, error: &str) {
		let suppressed = std::mem::replace(&mut self.state.lock().suppress_connection_errors, true);
		let refused = posix_code
			.is_some_and(|code| io::Error::from_raw_os_error(code).kind() == io::ErrorKind::ConnectionRefused);

		if suppressed {
			tracing::debug!(target = "jsinspector", ?posix_code, error, "packager connection still failing");
		} else if refused {
			tracing::error!(
				target = "jsinspector",
				url = %self.config.url,
				"packager refused the connection, is it running?"
			);
		} else {
			tracing::error!(target = "jsinspector", ?posix_code, error, "packager connection failed");
		}
		self.handle_connection_lost();
	}

	fn did_receive_message(&self, message: &str) {
		if let Err(err) = self.handle_message(message) {
			tracing::error!(target = "jsinspector", error = %err, "failed to handle packager message");
		}
	}

	fn did_open(&self) {
		self.state.lock().suppress_connection_errors = false;
		tracing::info!(target = "jsinspector", url = %self.config.url, "connected to packager");
	}

	fn did_close(&self) {
		tracing::info!(target = "jsinspector", url = %self.config.url, "packager connection closed");
		self.handle_connection_lost();
	}
}

impl PageStatusListener for Inner {
	fn on_page_removed(&self, page_id: i32) {
		let page_id = page_id.to_string();
		let sessions: Vec<Session> = {
			let mut state = self.state.lock();
			let addresses: Vec<SessionAddress> = state
				.sessions
				.keys()
				.filter(|address| address.page_id == page_id)
				.cloned()
				.collect();
			addresses
				.iter()
				.filter_map(|address| state.sessions.remove(address))
				.collect()
		};
		for session in sessions {
			session.local.disconnect();
		}
	}
}

/// The packager side of one session. Output is forwarded asynchronously and
/// only while the session still owns its address.
struct PackagerRemoteConnection {
	executor: ScopedExecutor<Inner>,
	address: SessionAddress,
	session_id: u64,
}

impl RemoteConnection for PackagerRemoteConnection {
	fn on_message(&self, message: String) {
		let address = self.address.clone();
		let session_id = self.session_id;
		self.executor.execute(move |inner| {
			let event = PackagerEvent::WrappedEvent(WrappedEvent {
				address: address.clone(),
				wrapped_event: message,
			});
			inner.send_event_if_current(&address, session_id, &event);
		});
	}

	fn on_disconnect(&self) {
		let address = self.address.clone();
		let session_id = self.session_id;
		self.executor.execute(move |inner| {
			inner.close_session_if_current(&address, session_id);
		});
	}
}
