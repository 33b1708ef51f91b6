//! A host with no JS engine behind it.
//!
//! [`DemoApp`] owns the target tree: one [`HostTarget`] and, while a "bundle"
//! is loaded, one instance with one runtime. Reloading swaps both, so
//! connected frontends see execution contexts come and go the way they do in
//! a real app. The runtime answers stepping commands with no-ops and exposes
//! bindings that stdin lines can call.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsinspector::{
	BindingCallback, ExecutionContextDescription, ExportedState, FrontendChannel, Headers, HostTarget,
	HostTargetDelegate, HostTargetMetadata, InstanceTarget, InstanceTargetDelegate, LoadNetworkResourceRequest,
	NetworkRequestListener, OverlaySetPausedInDebuggerMessageRequest, PageReloadRequest, RuntimeAgentDelegate,
	RuntimeTarget, RuntimeTargetDelegate, ScopedExecutor, SharedSessionState, VoidExecutor,
};
use jsinspector_protocol::{CdpError, PreparsedRequest, json_result};
use parking_lot::Mutex;
use serde_json::json;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use url::Url;

type Listener = ScopedExecutor<dyn NetworkRequestListener>;

/// Largest `on_data` chunk reported while streaming a file.
const FILE_CHUNK_SIZE: usize = 64 * 1024;

/// Requests from the host delegate or stdin for the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
	Reload,
	CallBinding { name: String, payload: String },
}

/// Parses a stdin line of the form `<binding> <payload>`.
pub fn parse_binding_call(line: &str) -> Option<HostEvent> {
	let line = line.trim();
	if line.is_empty() {
		return None;
	}
	let (name, payload) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
	Some(HostEvent::CallBinding {
		name: name.to_string(),
		payload: payload.trim_start().to_string(),
	})
}

pub struct DemoHost {
	metadata: HostTargetMetadata,
	handle: Handle,
	events: mpsc::UnboundedSender<HostEvent>,
}

impl DemoHost {
	pub fn new(metadata: HostTargetMetadata, handle: Handle, events: mpsc::UnboundedSender<HostEvent>) -> Self {
		Self {
			metadata,
			handle,
			events,
		}
	}
}

impl HostTargetDelegate for DemoHost {
	fn get_metadata(&self) -> HostTargetMetadata {
		self.metadata.clone()
	}

	fn on_reload(&self, request: &PageReloadRequest) {
		tracing::info!(target = "jsinspector", ignore_cache = ?request.ignore_cache, "reload requested");
		if self.events.send(HostEvent::Reload).is_err() {
			tracing::warn!(target = "jsinspector", "host loop is gone, ignoring reload");
		}
	}

	fn on_set_paused_in_debugger_message(&self, request: &OverlaySetPausedInDebuggerMessageRequest) {
		match &request.message {
			Some(message) => tracing::info!(target = "jsinspector", message = %message, "paused in debugger"),
			None => tracing::info!(target = "jsinspector", "resumed"),
		}
	}

	fn load_network_resource(&self, request: &LoadNetworkResourceRequest, listener: Listener) -> Result<(), CdpError> {
		let url =
			Url::parse(&request.url).map_err(|err| CdpError::InvalidParams(format!("Invalid URL '{}': {err}", request.url)))?;
		if url.scheme() != "file" {
			let message = format!("unsupported URL scheme '{}'", url.scheme());
			listener.execute(move |listener| listener.on_error(&message));
			return Ok(());
		}
		let path = url
			.to_file_path()
			.map_err(|()| CdpError::InvalidParams(format!("Invalid file URL '{}'", request.url)))?;

		// The cancel function must be installed before the first response.
		let (start, started) = oneshot::channel::<()>();
		let task = self.handle.spawn({
			let listener = listener.clone();
			async move {
				if started.await.is_ok() {
					stream_file(path, listener).await;
				}
			}
		});
		let abort = task.abort_handle();
		listener.execute(move |listener| listener.set_cancel_function(Box::new(move || abort.abort())));
		let _ = start.send(());
		Ok(())
	}
}

async fn stream_file(path: PathBuf, listener: Listener) {
	match tokio::fs::read(&path).await {
		Ok(bytes) => {
			tracing::debug!(target = "jsinspector", path = %path.display(), len = bytes.len(), "serving file");
			let headers = Headers::from([
				("Content-Type".to_string(), content_type(&path).to_string()),
				("Content-Length".to_string(), bytes.len().to_string()),
			]);
			listener.execute(move |listener| listener.on_headers(200, &headers));
			for chunk in bytes.chunks(FILE_CHUNK_SIZE) {
				let chunk = chunk.to_vec();
				listener.execute(move |listener| listener.on_data(&chunk));
			}
			listener.execute(|listener| listener.on_completion());
		}
		Err(err) if err.kind() == io::ErrorKind::NotFound => {
			listener.execute(|listener| listener.on_headers(404, &Headers::new()));
		}
		Err(err) => {
			let message = err.to_string();
			listener.execute(move |listener| listener.on_error(&message));
		}
	}
}

fn content_type(path: &Path) -> &'static str {
	match path.extension().and_then(|extension| extension.to_str()) {
		Some("js" | "mjs" | "cjs") => "application/javascript",
		Some("json" | "map") => "application/json",
		Some("html" | "htm") => "text/html",
		Some("css") => "text/css",
		Some("txt") => "text/plain",
		_ => "application/octet-stream",
	}
}

struct DemoInstance;

impl InstanceTargetDelegate for DemoInstance {}

/// The runtime side of the demo. Nothing ever runs, so nothing ever pauses.
#[derive(Default)]
pub struct DemoRuntime {
	bindings: Mutex<HashMap<String, BindingCallback>>,
}

impl DemoRuntime {
	/// Calls binding `name` as JS would. Returns false if no frontend has
	/// installed it.
	pub fn call_binding(&self, name: &str, payload: &str) -> bool {
		let callback = self.bindings.lock().get(name).cloned();
		match callback {
			Some(callback) => {
				callback(payload);
				true
			}
			None => false,
		}
	}
}

impl RuntimeTargetDelegate for DemoRuntime {
	fn create_agent_delegate(
		&self,
		frontend_channel: FrontendChannel,
		_session_state: SharedSessionState,
		_previously_exported_state: Option<ExportedState>,
		execution_context: &ExecutionContextDescription,
		_runtime_executor: VoidExecutor,
	) -> Option<Box<dyn RuntimeAgentDelegate>> {
		tracing::debug!(target = "jsinspector", execution_context_id = execution_context.id, "runtime agent created");
		Some(Box::new(DemoRuntimeAgent { frontend_channel }))
	}

	fn install_binding(&self, name: &str, callback: BindingCallback) {
		tracing::info!(target = "jsinspector", binding = name, "binding installed");
		self.bindings.lock().insert(name.to_string(), callback);
	}
}

struct DemoRuntimeAgent {
	frontend_channel: FrontendChannel,
}

impl RuntimeAgentDelegate for DemoRuntimeAgent {
	fn handle_request(&self, request: &PreparsedRequest) -> bool {
		match request.method.as_str() {
			"Debugger.pause" | "Debugger.resume" | "Debugger.stepInto" | "Debugger.stepOut" | "Debugger.stepOver"
			| "Runtime.runIfWaitingForDebugger" => {
				(self.frontend_channel)(&json_result(request.id, json!({})));
				true
			}
			_ => false,
		}
	}
}

struct LoadedBundle {
	instance: Arc<InstanceTarget>,
	runtime: Arc<RuntimeTarget>,
}

/// The target tree of the demo host.
///
/// All methods must run on the host's queue.
pub struct DemoApp {
	host: Arc<HostTarget>,
	runtime: Arc<DemoRuntime>,
	js_executor: VoidExecutor,
	loaded: Mutex<Option<LoadedBundle>>,
}

impl DemoApp {
	pub fn new(host: Arc<HostTarget>, js_executor: VoidExecutor) -> Self {
		Self {
			host,
			runtime: Arc::new(DemoRuntime::default()),
			js_executor,
			loaded: Mutex::new(None),
		}
	}

	pub fn host(&self) -> &Arc<HostTarget> {
		&self.host
	}

	pub fn runtime(&self) -> &DemoRuntime {
		&self.runtime
	}

	/// Registers an instance and its runtime unless a bundle is loaded.
	pub fn load(&self) {
		if self.loaded.lock().is_some() {
			return;
		}
		let instance = self.host.register_instance(Arc::new(DemoInstance));
		let runtime = instance.register_runtime(self.runtime.clone(), Arc::clone(&self.js_executor));
		tracing::info!(
			target = "jsinspector",
			execution_context_id = runtime.execution_context().id,
			"bundle loaded"
		);
		*self.loaded.lock() = Some(LoadedBundle { instance, runtime });
	}

	/// Unregisters the runtime, then the instance.
	pub fn unload(&self) {
		let Some(LoadedBundle { instance, runtime }) = self.loaded.lock().take() else {
			return;
		};
		instance.unregister_runtime(&runtime);
		self.host.unregister_instance(&instance);
		tracing::info!(target = "jsinspector", "bundle unloaded");
	}

	pub fn reload(&self) {
		self.unload();
		self.load();
	}
}
