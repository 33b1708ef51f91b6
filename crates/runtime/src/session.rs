//! A single frontend's session with a [`HostTarget`](crate::target::HostTarget).

use std::sync::Arc;

use jsinspector_protocol::{json_error, preparse};
use parking_lot::Mutex;

use crate::agent::host::HostAgent;
use crate::connection::{FrontendChannel, RaiiRemoteConnection, RemoteConnection};
use crate::executor::VoidExecutor;
use crate::session_state::{SessionState, SharedSessionState};
use crate::target::host::HostTargetController;
use crate::target::instance::InstanceTarget;

pub(crate) struct HostTargetSession {
	// Field order is drop order: agents first, the remote (and its
	// `on_disconnect`) last.
	host_agent: HostAgent,
	state: SharedSessionState,
	frontend_channel: FrontendChannel,
	_remote: Arc<RaiiRemoteConnection>,
}

impl HostTargetSession {
	pub(crate) fn new(
		remote: Box<dyn RemoteConnection>,
		controller: Arc<HostTargetController>,
		executor: VoidExecutor,
		instance: Option<&Arc<InstanceTarget>>,
	) -> Arc<Self> {
		let remote = Arc::new(RaiiRemoteConnection::new(remote));
		let weak_remote = Arc::downgrade(&remote);
		let frontend_channel: FrontendChannel = Arc::new(move |message: &str| {
			if let Some(remote) = weak_remote.upgrade() {
				remote.on_message(message.to_string());
			}
		});
		let state: SharedSessionState = Arc::new(Mutex::new(SessionState::default()));

		let session = Arc::new(Self {
			host_agent: HostAgent::new(Arc::clone(&frontend_channel), controller, Arc::clone(&state), executor),
			state,
			frontend_channel,
			_remote: remote,
		});
		if instance.is_some() {
			session.set_current_instance(instance);
		}
		session
	}

	/// Dispatches one raw CDP message and reports failures to the frontend.
	pub(crate) fn handle_message(&self, message: &str) {
		let request = match preparse(message) {
			Ok(request) => request,
			Err(err) => {
				tracing::debug!(target = "jsinspector", error = %err, "rejecting malformed CDP message");
				(self.frontend_channel)(&json_error(None, err.code(), Some(&err.to_string())));
				return;
			}
		};

		tracing::trace!(target = "jsinspector", id = request.id, method = %request.method, "CDP request");
		if let Err(err) = self.host_agent.handle_request(&request) {
			tracing::debug!(
				target = "jsinspector",
				id = request.id,
				method = %request.method,
				error = %err,
				"CDP request failed"
			);
			(self.frontend_channel)(&json_error(Some(request.id), err.code(), Some(&err.to_string())));
		}
	}

	/// Binds this session's agent chain to `instance`, or detaches it.
	pub(crate) fn set_current_instance(&self, instance: Option<&Arc<InstanceTarget>>) {
		let agent = instance
			.map(|instance| instance.create_agent(Arc::clone(&self.frontend_channel), Arc::clone(&self.state)));
		self.host_agent.set_current_instance_agent(agent);
	}
}

impl Drop for HostTargetSession {
	fn drop(&mut self) {
		tracing::debug!(target = "jsinspector", "host target session closed");
	}
}
