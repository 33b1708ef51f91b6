//! Connection endpoints between debugger frontends and targets.
//!
//! A frontend that wants to talk to a page supplies a [`RemoteConnection`]
//! (where the page's output goes) and gets back a [`LocalConnection`] (where the
//! frontend's input goes).

use std::sync::Arc;

use parking_lot::Mutex;

/// Emits one serialized CDP message toward the connected frontend.
pub type FrontendChannel = Arc<dyn Fn(&str) + Send + Sync>;

/// The frontend side of a session, as seen by the page.
pub trait RemoteConnection: Send + Sync {
	/// Delivers a CDP message to the frontend.
	fn on_message(&self, message: String);

	/// The page side of the session has gone away.
	fn on_disconnect(&self);
}

/// The page side of a session, as seen by the frontend.
pub trait LocalConnection: Send + Sync {
	/// Delivers a CDP message to the page.
	fn send_message(&self, message: String);

	/// Tears down the session. Further messages are ignored.
	fn disconnect(&self);
}

/// Owns a [`RemoteConnection`] and calls `on_disconnect` exactly once when
/// dropped.
pub struct RaiiRemoteConnection {
	remote: Box<dyn RemoteConnection>,
}

impl RaiiRemoteConnection {
	pub fn new(remote: Box<dyn RemoteConnection>) -> Self {
		Self { remote }
	}

	pub fn on_message(&self, message: String) {
		self.remote.on_message(message);
	}
}

impl Drop for RaiiRemoteConnection {
	fn drop(&mut self) {
		self.remote.on_disconnect();
	}
}

type MessageCallback = Arc<dyn Fn(String) + Send + Sync>;

/// [`LocalConnection`] backed by a closure.
///
/// `disconnect` drops the closure along with everything it captured.
pub struct CallbackLocalConnection {
	callback: Mutex<Option<MessageCallback>>,
}

impl CallbackLocalConnection {
	pub fn new(callback: impl Fn(String) + Send + Sync + 'static) -> Self {
		Self {
			callback: Mutex::new(Some(Arc::new(callback))),
		}
	}
}

impl LocalConnection for CallbackLocalConnection {
	fn send_message(&self, message: String) {
		let callback = self.callback.lock().clone();
		if let Some(callback) = callback {
			callback(message);
		}
	}

	fn disconnect(&self) {
		let callback = self.callback.lock().take();
		drop(callback);
	}
}
