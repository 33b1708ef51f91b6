use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use jsinspector_protocol::{CdpError, PreparsedRequest, RequestId, json_notification, json_result};
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::agent::instance::InstanceAgent;
use crate::agent::network_io::NetworkIoAgent;
use crate::agent::runtime::handle_binding_request;
use crate::agent::tracing_agent::TracingAgent;
use crate::connection::FrontendChannel;
use crate::executor::VoidExecutor;
use crate::session_state::SharedSessionState;
use crate::target::host::{HostTargetController, OverlaySetPausedInDebuggerMessageRequest, PageReloadRequest};

const FUSEBOX_WELCOME: &str = "Welcome to React Native DevTools";
const UNSUPPORTED_CLIENT_WARNING: &str = "You are using an unsupported debugging client. \
	Use the Dev Menu in your app (or type `j` in the Metro terminal) to open React Native DevTools.";

/// Head of a session's agent chain.
pub(crate) struct HostAgent {
	frontend_channel: FrontendChannel,
	controller: Arc<HostTargetController>,
	session_state: SharedSessionState,
	network_io_agent: NetworkIoAgent,
	tracing_agent: TracingAgent,
	instance_agent: Mutex<Option<Arc<InstanceAgent>>>,
	is_fusebox_client: AtomicBool,
	is_paused_overlay_visible: AtomicBool,
}

impl HostAgent {
	pub(crate) fn new(
		frontend_channel: FrontendChannel,
		controller: Arc<HostTargetController>,
		session_state: SharedSessionState,
		executor: VoidExecutor,
	) -> Self {
		Self {
			network_io_agent: NetworkIoAgent::new(Arc::clone(&frontend_channel), executor),
			tracing_agent: TracingAgent::new(
				Arc::clone(&frontend_channel),
				Arc::clone(&controller),
				Arc::clone(&session_state),
			),
			frontend_channel,
			controller,
			session_state,
			instance_agent: Mutex::new(None),
			is_fusebox_client: AtomicBool::new(false),
			is_paused_overlay_visible: AtomicBool::new(false),
		}
	}

	pub(crate) fn handle_request(&self, request: &PreparsedRequest) -> Result<(), CdpError> {
		let mut should_send_ok_response = false;
		let mut is_finished_handling_request = false;

		match request.method.as_str() {
			"Debugger.enable" | "Debugger.disable" => {
				self.session_state.lock().is_debugger_domain_enabled = request.method == "Debugger.enable";
				should_send_ok_response = true;
			}
			"Log.enable" => {
				self.session_state.lock().is_log_domain_enabled = true;
				self.send_welcome_log_entry();
				should_send_ok_response = true;
			}
			"Log.disable" => {
				self.session_state.lock().is_log_domain_enabled = false;
				should_send_ok_response = true;
			}
			"Runtime.enable" | "Runtime.disable" => {
				self.session_state.lock().is_runtime_domain_enabled = request.method == "Runtime.enable";
				should_send_ok_response = true;
			}
			"Network.enable" | "Network.disable" if self.controller.flags().network_inspection_enabled => {
				self.session_state.lock().is_network_domain_enabled = request.method == "Network.enable";
				should_send_ok_response = true;
			}
			"Page.reload" => {
				let reload = PageReloadRequest {
					ignore_cache: request.bool_param("ignoreCache")?,
					script_to_evaluate_on_load: request.str_param("scriptToEvaluateOnLoad")?.map(str::to_owned),
				};
				self.controller.delegate().on_reload(&reload);
				self.send_result(request.id, json!({}));
				is_finished_handling_request = true;
			}
			"Overlay.setPausedInDebuggerMessage" => {
				let message = request.str_param("message")?.map(str::to_owned);
				self.set_paused_in_debugger_message(message);
				self.send_result(request.id, json!({}));
				is_finished_handling_request = true;
			}
			"ReactNativeApplication.enable" => {
				self.session_state.lock().is_react_native_application_domain_enabled = true;
				self.is_fusebox_client.store(true, Ordering::SeqCst);
				self.send_metadata_updated();
				self.send_result(request.id, json!({}));
				is_finished_handling_request = true;
			}
			"ReactNativeApplication.disable" => {
				self.session_state.lock().is_react_native_application_domain_enabled = false;
				self.send_result(request.id, json!({}));
				is_finished_handling_request = true;
			}
			"FuseboxClient.setClientMetadata" => {
				self.is_fusebox_client.store(true, Ordering::SeqCst);
				self.send_result(request.id, json!({}));
				is_finished_handling_request = true;
			}
			_ => {}
		}

		if is_finished_handling_request {
			return Ok(());
		}
		if self.network_io_agent.handle_request(request, self.controller.delegate())? {
			return Ok(());
		}
		if self.tracing_agent.handle_request(request)? {
			return Ok(());
		}

		let instance_agent = self.instance_agent.lock().clone();
		if let Some(instance_agent) = instance_agent {
			if instance_agent.handle_request(request)? {
				return Ok(());
			}
		}

		// No runtime to take it; record the subscription for when one appears.
		if handle_binding_request(request, &self.session_state, &self.frontend_channel, None)? {
			return Ok(());
		}

		if should_send_ok_response {
			self.send_result(request.id, json!({}));
			return Ok(());
		}
		Err(CdpError::method_not_found(&request.method))
	}

	/// Rebinds the chain to a new instance agent, or to none.
	pub(crate) fn set_current_instance_agent(&self, agent: Option<Arc<InstanceAgent>>) {
		let previous = std::mem::replace(&mut *self.instance_agent.lock(), agent);
		if previous.is_none() {
			return;
		}
		if self.session_state.lock().is_runtime_domain_enabled {
			(self.frontend_channel)(&json_notification("Runtime.executionContextsCleared", Value::Null));
		}
	}

	fn set_paused_in_debugger_message(&self, message: Option<String>) {
		let visible = message.is_some();
		let was_visible = self.is_paused_overlay_visible.swap(visible, Ordering::SeqCst);

		match (was_visible, visible) {
			(false, true) => self.controller.increment_paused_overlay_counter(),
			(true, false) => {
				// Only hides the overlay once no other session wants it.
				self.controller.decrement_paused_overlay_counter();
				return;
			}
			_ => {}
		}
		self.controller
			.delegate()
			.on_set_paused_in_debugger_message(&OverlaySetPausedInDebuggerMessageRequest { message });
	}

	fn send_welcome_log_entry(&self) {
		if self.is_fusebox_client.load(Ordering::SeqCst) {
			self.send_log_entry("info", FUSEBOX_WELCOME);
		} else {
			self.send_log_entry("warning", UNSUPPORTED_CLIENT_WARNING);
		}
	}

	fn send_log_entry(&self, level: &str, text: &str) {
		let timestamp = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|elapsed| elapsed.as_secs_f64() * 1000.0)
			.unwrap_or_default();
		let entry = json!({
			"timestamp": timestamp,
			"source": "other",
			"level": level,
			"text": text,
			"args": [{"type": "string", "value": text}],
		});
		(self.frontend_channel)(&json_notification("Log.entryAdded", json!({ "entry": entry })));
	}

	fn send_metadata_updated(&self) {
		let flags = self.controller.flags();
		let mut params = match serde_json::to_value(self.controller.delegate().get_metadata()) {
			Ok(Value::Object(map)) => Value::Object(map),
			_ => json!({}),
		};
		params["unstable_isProfilingBuild"] = Value::from(flags.is_profiling_build);
		params["unstable_networkInspectionEnabled"] = Value::from(flags.network_inspection_enabled);
		(self.frontend_channel)(&json_notification("ReactNativeApplication.metadataUpdated", params));
	}

	fn send_result(&self, id: RequestId, result: Value) {
		(self.frontend_channel)(&json_result(id, result));
	}
}

impl Drop for HostAgent {
	fn drop(&mut self) {
		if *self.is_paused_overlay_visible.get_mut() {
			self.controller.decrement_paused_overlay_counter();
		}
	}
}
