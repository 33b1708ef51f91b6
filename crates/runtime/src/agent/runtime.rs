use std::sync::Arc;

use jsinspector_protocol::{CdpError, PreparsedRequest, json_notification, json_result};
use serde_json::json;

use crate::connection::FrontendChannel;
use crate::execution_context::{ExecutionContextDescription, ExecutionContextSelector, matches_any};
use crate::session_state::SharedSessionState;
use crate::target::runtime::{RuntimeAgentDelegate, RuntimeTarget};

/// Runtime-level agent: bindings here, everything else to the engine's
/// [`RuntimeAgentDelegate`].
pub(crate) struct RuntimeAgent {
	frontend_channel: FrontendChannel,
	target: Arc<RuntimeTarget>,
	session_state: SharedSessionState,
	delegate: Option<Box<dyn RuntimeAgentDelegate>>,
}

impl RuntimeAgent {
	pub(crate) fn new(
		frontend_channel: FrontendChannel,
		target: Arc<RuntimeTarget>,
		session_state: SharedSessionState,
		delegate: Option<Box<dyn RuntimeAgentDelegate>>,
	) -> Self {
		Self {
			frontend_channel,
			target,
			session_state,
			delegate,
		}
	}

	pub(crate) fn execution_context(&self) -> &ExecutionContextDescription {
		self.target.execution_context()
	}

	pub(crate) fn handle_request(&self, request: &PreparsedRequest) -> Result<bool, CdpError> {
		if handle_binding_request(
			request,
			&self.session_state,
			&self.frontend_channel,
			Some(self.target.as_ref()),
		)? {
			return Ok(true);
		}
		Ok(self
			.delegate
			.as_ref()
			.is_some_and(|delegate| delegate.handle_request(request)))
	}

	/// Forwards a binding call from JS if this session subscribed to it for
	/// this context.
	pub(crate) fn notify_binding_called(&self, name: &str, payload: &str) {
		let context = self.execution_context();
		let subscribed = self
			.session_state
			.lock()
			.subscribed_bindings
			.get(name)
			.is_some_and(|selectors| matches_any(selectors, context));
		if subscribed {
			(self.frontend_channel)(&json_notification(
				"Runtime.bindingCalled",
				json!({
					"name": name,
					"payload": payload,
					"executionContextId": context.id,
				}),
			));
		}
	}
}

impl Drop for RuntimeAgent {
	fn drop(&mut self) {
		if let Some(delegate) = &self.delegate {
			let exported = delegate.export_state();
			self.session_state.lock().last_runtime_agent_exported_state = exported;
		}
	}
}

/// Handles `Runtime.addBinding` and `Runtime.removeBinding`.
///
/// Subscriptions are recorded in the session state whether or not a runtime
/// exists yet; `runtime` gets the binding installed immediately if the
/// subscription selects its context.
pub(crate) fn handle_binding_request(
	request: &PreparsedRequest,
	session_state: &SharedSessionState,
	frontend_channel: &FrontendChannel,
	runtime: Option<&RuntimeTarget>,
) -> Result<bool, CdpError> {
	match request.method.as_str() {
		"Runtime.addBinding" => {
			let name = request.required_str_param("name")?.to_string();
			let context_id = match request.i64_param("executionContextId")? {
				Some(id) => Some(
					i32::try_from(id)
						.map_err(|_| CdpError::InvalidParams("Invalid execution context id".to_string()))?,
				),
				None => None,
			};
			let context_name = request.str_param("executionContextName")?;

			let selector = match (context_id, context_name) {
				(Some(_), Some(_)) => {
					return Err(CdpError::InvalidParams(
						"executionContextName is mutually exclusive with executionContextId".to_string(),
					));
				}
				(Some(id), None) => ExecutionContextSelector::ById(id),
				(None, Some(name)) => ExecutionContextSelector::ByName(name.to_string()),
				(None, None) => ExecutionContextSelector::All,
			};

			if let Some(runtime) = runtime {
				if selector.matches(runtime.execution_context()) {
					runtime.install_binding_handler(&name);
				}
			}
			session_state
				.lock()
				.subscribed_bindings
				.entry(name)
				.or_default()
				.insert(selector);
			frontend_channel(&json_result(request.id, json!({})));
			Ok(true)
		}
		"Runtime.removeBinding" => {
			let name = request.required_str_param("name")?;
			session_state.lock().subscribed_bindings.remove(name);
			frontend_channel(&json_result(request.id, json!({})));
			Ok(true)
		}
		_ => Ok(false),
	}
}
