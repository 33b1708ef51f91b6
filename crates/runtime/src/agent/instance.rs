use std::sync::Arc;

use jsinspector_protocol::{CdpError, PreparsedRequest, json_notification};
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::agent::runtime::RuntimeAgent;
use crate::connection::FrontendChannel;
use crate::session_state::SharedSessionState;
use crate::target::runtime::RuntimeTarget;

/// Instance-level agent. Owns the session's runtime agent and keeps the
/// frontend's view of execution contexts in sync with runtime swaps.
pub(crate) struct InstanceAgent {
	frontend_channel: FrontendChannel,
	session_state: SharedSessionState,
	runtime_agent: Mutex<Option<Arc<RuntimeAgent>>>,
}

impl InstanceAgent {
	pub(crate) fn new(frontend_channel: FrontendChannel, session_state: SharedSessionState) -> Self {
		Self {
			frontend_channel,
			session_state,
			runtime_agent: Mutex::new(None),
		}
	}

	pub(crate) fn handle_request(&self, request: &PreparsedRequest) -> Result<bool, CdpError> {
		if request.method == "Runtime.enable" {
			self.maybe_send_execution_context_created();
		}

		let runtime_agent = self.runtime_agent.lock().clone();
		match runtime_agent {
			Some(runtime_agent) => runtime_agent.handle_request(request),
			None => Ok(false),
		}
	}

	/// Replaces the runtime agent with one for `runtime`.
	///
	/// With the Runtime domain enabled, the frontend sees the old context
	/// destroyed before the new one is created. Clearing contexts is left to
	/// the host agent when the instance itself goes away.
	pub(crate) fn set_current_runtime(&self, runtime: Option<&Arc<RuntimeTarget>>) {
		// Drop the old agent first so it can export state for its successor.
		let previous = self.runtime_agent.lock().take();
		let previous_context = previous.as_ref().map(|agent| agent.execution_context().clone());
		drop(previous);

		let next = runtime.map(|runtime| {
			runtime.create_agent(Arc::clone(&self.frontend_channel), Arc::clone(&self.session_state))
		});
		*self.runtime_agent.lock() = next;

		if !self.session_state.lock().is_runtime_domain_enabled {
			return;
		}
		if let Some(context) = previous_context {
			let mut params = json!({ "executionContextId": context.id });
			if let Some(unique_id) = &context.unique_id {
				params["executionContextUniqueId"] = Value::from(unique_id.as_str());
			}
			(self.frontend_channel)(&json_notification("Runtime.executionContextDestroyed", params));
		}
		self.maybe_send_execution_context_created();
	}

	fn maybe_send_execution_context_created(&self) {
		let context = self
			.runtime_agent
			.lock()
			.as_ref()
			.map(|agent| agent.execution_context().clone());
		let Some(context) = context else {
			return;
		};
		if self.session_state.lock().is_runtime_domain_enabled {
			(self.frontend_channel)(&json_notification(
				"Runtime.executionContextCreated",
				json!({ "context": context.to_cdp() }),
			));
		}
	}
}
