//! The root target and its embedder-facing delegate.

use std::sync::Arc;
use std::thread;

use jsinspector_protocol::{CdpError, RequestId, json_request};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::agent::network_io::NetworkRequestListener;
use crate::config::InspectorFlags;
use crate::connection::{CallbackLocalConnection, LocalConnection, RemoteConnection};
use crate::execution_context::ExecutionContextManager;
use crate::executor::{EnableExecutorFromThis, ExecutorSlot, ScopedExecutor, VoidExecutor, make_void_executor};
use crate::session::HostTargetSession;
use crate::target::instance::{InstanceTarget, InstanceTargetDelegate};
use crate::weak_list::WeakList;

/// Host description sent in `ReactNativeApplication.metadataUpdated`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostTargetMetadata {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub app_display_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub app_identifier: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub device_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub integration_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub platform: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub react_native_version: Option<String>,
}

/// Params of `Page.reload`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageReloadRequest {
	pub ignore_cache: Option<bool>,
	pub script_to_evaluate_on_load: Option<String>,
}

/// Params of `Overlay.setPausedInDebuggerMessage`. `None` hides the overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlaySetPausedInDebuggerMessageRequest {
	pub message: Option<String>,
}

/// Params of `Network.loadNetworkResource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadNetworkResourceRequest {
	pub url: String,
}

/// Host-side hooks for requests the host agent cannot answer alone.
///
/// Called on the host target's thread.
pub trait HostTargetDelegate: Send + Sync {
	fn get_metadata(&self) -> HostTargetMetadata {
		HostTargetMetadata::default()
	}

	fn on_reload(&self, request: &PageReloadRequest);

	fn on_set_paused_in_debugger_message(&self, request: &OverlaySetPausedInDebuggerMessageRequest);

	/// Starts loading `request.url`, reporting progress through `listener`.
	///
	/// The listener executor is safe to call after the request was closed;
	/// calls against a discarded stream are dropped.
	fn load_network_resource(
		&self,
		_request: &LoadNetworkResourceRequest,
		_listener: ScopedExecutor<dyn NetworkRequestListener>,
	) -> Result<(), CdpError> {
		Err(CdpError::MethodNotFound(
			"Network.loadNetworkResource is not implemented by this host".to_string(),
		))
	}
}

/// Debugger commands the host can issue on the frontend's behalf, e.g. from
/// an in-app "resume" button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
	DebuggerResume,
	DebuggerStepOver,
}

impl HostCommand {
	fn method(self) -> &'static str {
		match self {
			Self::DebuggerResume => "Debugger.resume",
			Self::DebuggerStepOver => "Debugger.stepOver",
		}
	}
}

/// Host-wide state shared with every session's host agent.
pub(crate) struct HostTargetController {
	delegate: Arc<dyn HostTargetDelegate>,
	flags: InspectorFlags,
	paused_overlay_count: Mutex<usize>,
	trace_buffer: Mutex<Option<Vec<Value>>>,
}

impl HostTargetController {
	pub(crate) fn delegate(&self) -> &dyn HostTargetDelegate {
		self.delegate.as_ref()
	}

	pub(crate) fn flags(&self) -> InspectorFlags {
		self.flags
	}

	pub(crate) fn increment_paused_overlay_counter(&self) {
		*self.paused_overlay_count.lock() += 1;
	}

	/// Hides the overlay once no session wants it anymore.
	pub(crate) fn decrement_paused_overlay_counter(&self) {
		let cleared = {
			let mut count = self.paused_overlay_count.lock();
			assert!(*count > 0, "paused overlay counter underflow");
			*count -= 1;
			*count == 0
		};
		if cleared {
			self.delegate
				.on_set_paused_in_debugger_message(&OverlaySetPausedInDebuggerMessageRequest::default());
		}
	}

	/// Returns false if a trace is already being recorded.
	pub(crate) fn start_tracing(&self) -> bool {
		let mut buffer = self.trace_buffer.lock();
		if buffer.is_some() {
			return false;
		}
		*buffer = Some(Vec::new());
		true
	}

	pub(crate) fn stop_tracing(&self) -> Option<Vec<Value>> {
		self.trace_buffer.lock().take()
	}

	fn record_trace_event(&self, event: Value) -> bool {
		match self.trace_buffer.lock().as_mut() {
			Some(buffer) => {
				buffer.push(event);
				true
			}
			None => false,
		}
	}
}

struct HostTargetState {
	current_instance: Option<Arc<InstanceTarget>>,
	sessions: WeakList<HostTargetSession>,
}

/// Root of the target tree, one per debuggable host (e.g. one app window).
///
/// All methods must be called on the thread behind the executor passed to
/// [`HostTarget::create`]. Sessions must be disconnected before the host is
/// dropped.
pub struct HostTarget {
	controller: Arc<HostTargetController>,
	execution_contexts: Arc<ExecutionContextManager>,
	executor: ExecutorSlot<HostTarget>,
	state: Mutex<HostTargetState>,
	command_sender: Mutex<Option<HostCommandSender>>,
}

impl EnableExecutorFromThis for HostTarget {
	fn executor_slot(&self) -> &ExecutorSlot<Self> {
		&self.executor
	}
}

impl HostTarget {
	pub fn create(delegate: Arc<dyn HostTargetDelegate>, executor: VoidExecutor) -> Arc<Self> {
		Self::create_with_flags(delegate, executor, InspectorFlags::default())
	}

	pub fn create_with_flags(
		delegate: Arc<dyn HostTargetDelegate>,
		executor: VoidExecutor,
		flags: InspectorFlags,
	) -> Arc<Self> {
		let host = Arc::new(Self {
			controller: Arc::new(HostTargetController {
				delegate,
				flags,
				paused_overlay_count: Mutex::new(0),
				trace_buffer: Mutex::new(None),
			}),
			execution_contexts: Arc::new(ExecutionContextManager::new()),
			executor: ExecutorSlot::default(),
			state: Mutex::new(HostTargetState {
				current_instance: None,
				sessions: WeakList::new(),
			}),
			command_sender: Mutex::new(None),
		});
		host.set_executor(executor);
		host
	}

	/// Opens a session. The session lives until the returned connection is
	/// disconnected or dropped.
	pub fn connect(&self, remote: Box<dyn RemoteConnection>) -> Box<dyn LocalConnection> {
		let instance = self.state.lock().current_instance.clone();
		let session = HostTargetSession::new(
			remote,
			Arc::clone(&self.controller),
			make_void_executor(self.executor_from_this()),
			instance.as_ref(),
		);
		self.state.lock().sessions.insert(Arc::downgrade(&session));
		tracing::debug!(target = "jsinspector", "session connected to host target");

		Box::new(CallbackLocalConnection::new(move |message| session.handle_message(&message)))
	}

	/// Registers the host's instance and binds every session to it.
	///
	/// Panics if an instance is already registered.
	pub fn register_instance(&self, delegate: Arc<dyn InstanceTargetDelegate>) -> Arc<InstanceTarget> {
		let instance = InstanceTarget::create(delegate, Arc::clone(&self.execution_contexts));
		let sessions = {
			let mut state = self.state.lock();
			assert!(
				state.current_instance.is_none(),
				"Only one instance allowed per host target"
			);
			state.current_instance = Some(Arc::clone(&instance));
			state.sessions.live()
		};

		for session in sessions {
			session.set_current_instance(Some(&instance));
		}
		instance
	}

	/// Unbinds every session from `instance`, then drops it.
	///
	/// Panics if `instance` is not the registered instance.
	pub fn unregister_instance(&self, instance: &Arc<InstanceTarget>) {
		let sessions = {
			let mut state = self.state.lock();
			assert!(
				state
					.current_instance
					.as_ref()
					.is_some_and(|current| Arc::ptr_eq(current, instance)),
				"Invalid unregistration"
			);
			state.sessions.live()
		};

		for session in sessions {
			session.set_current_instance(None);
		}
		if let Some(removed) = self.state.lock().current_instance.take() {
			removed.assert_detached();
		}
	}

	/// Sends `command` through a private session. Output is discarded; with
	/// no runtime registered the command is ignored.
	pub fn send_command(&self, command: HostCommand) {
		self.executor_from_this()
			.execute(move |host| host.dispatch_command(command));
	}

	/// Appends a trace event to the active recording. Returns false when no
	/// session is recording.
	pub fn record_trace_event(&self, event: Value) -> bool {
		self.controller.record_trace_event(event)
	}

	pub fn flags(&self) -> InspectorFlags {
		self.controller.flags()
	}

	fn dispatch_command(&self, command: HostCommand) {
		let mut sender = self.command_sender.lock();
		sender
			.get_or_insert_with(|| HostCommandSender::new(self))
			.send(command);
	}
}

impl Drop for HostTarget {
	fn drop(&mut self) {
		// The command sender owns a session.
		self.command_sender.get_mut().take();
		if !thread::panicking() {
			assert!(
				self.state.get_mut().sessions.is_empty(),
				"HostTargetSession objects must be destroyed before their HostTarget"
			);
		}
	}
}

struct DiscardingRemoteConnection;

impl RemoteConnection for DiscardingRemoteConnection {
	fn on_message(&self, _message: String) {}
	fn on_disconnect(&self) {}
}

struct HostCommandSender {
	connection: Box<dyn LocalConnection>,
	next_request_id: RequestId,
}

impl HostCommandSender {
	fn new(host: &HostTarget) -> Self {
		Self {
			connection: host.connect(Box::new(DiscardingRemoteConnection)),
			next_request_id: 0,
		}
	}

	fn send(&mut self, command: HostCommand) {
		self.next_request_id += 1;
		self.connection
			.send_message(json_request(self.next_request_id, command.method(), Value::Null));
	}
}
