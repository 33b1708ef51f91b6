use std::sync::Arc;

use jsinspector_protocol::{CdpError, PreparsedRequest, json_notification, json_result};
use serde_json::json;

use crate::connection::FrontendChannel;
use crate::session_state::SharedSessionState;
use crate::target::host::HostTargetController;

/// Trace events per `Tracing.dataCollected` notification.
const TRACE_EVENT_CHUNK_SIZE: usize = 1000;

/// Handles the `Tracing` domain against the host-wide trace buffer.
pub(crate) struct TracingAgent {
	frontend_channel: FrontendChannel,
	controller: Arc<HostTargetController>,
	session_state: SharedSessionState,
}

impl TracingAgent {
	pub(crate) fn new(
		frontend_channel: FrontendChannel,
		controller: Arc<HostTargetController>,
		session_state: SharedSessionState,
	) -> Self {
		Self {
			frontend_channel,
			controller,
			session_state,
		}
	}

	pub(crate) fn handle_request(&self, request: &PreparsedRequest) -> Result<bool, CdpError> {
		match request.method.as_str() {
			"Tracing.start" => {
				if self.session_state.lock().has_pending_trace_recording {
					return Err(CdpError::Internal("Tracing has already been started".to_string()));
				}
				if !self.controller.start_tracing() {
					return Err(CdpError::Internal(
						"Tracing has already been started by another session".to_string(),
					));
				}
				self.session_state.lock().has_pending_trace_recording = true;
				(self.frontend_channel)(&json_result(request.id, json!({})));
				Ok(true)
			}
			"Tracing.end" => {
				{
					let mut state = self.session_state.lock();
					if !state.has_pending_trace_recording {
						return Err(CdpError::Type("Tracing session not started".to_string()));
					}
					state.has_pending_trace_recording = false;
				}
				let events = self.controller.stop_tracing().unwrap_or_default();
				(self.frontend_channel)(&json_result(request.id, json!({})));

				for chunk in events.chunks(TRACE_EVENT_CHUNK_SIZE) {
					(self.frontend_channel)(&json_notification(
						"Tracing.dataCollected",
						json!({ "value": chunk }),
					));
				}
				(self.frontend_channel)(&json_notification(
					"Tracing.tracingComplete",
					json!({ "dataLossOccurred": false }),
				));
				Ok(true)
			}
			_ => Ok(false),
		}
	}
}

impl Drop for TracingAgent {
	fn drop(&mut self) {
		if self.session_state.lock().has_pending_trace_recording {
			self.controller.stop_tracing();
		}
	}
}
