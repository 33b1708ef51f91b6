#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use jsinspector::{
	BindingCallback, ConnectFunc, ExecutionContextDescription, ExportedState, FrontendChannel, HostTargetDelegate,
	HostTargetMetadata, InspectorPackagerConnectionDelegate, LoadNetworkResourceRequest, LocalConnection,
	NetworkRequestListener, OverlaySetPausedInDebuggerMessageRequest, PageReloadRequest, RemoteConnection,
	RuntimeAgentDelegate, RuntimeTargetDelegate, ScopedExecutor, SharedSessionState, Task, VoidExecutor, WebSocket,
	WebSocketDelegate,
};
use jsinspector_protocol::{CdpError, PreparsedRequest, json_result};
use parking_lot::Mutex;
use serde_json::{Value, json};

pub fn immediate_executor() -> VoidExecutor {
	Arc::new(|task: Task| task())
}

/// Queues tasks until the test runs them.
#[derive(Clone, Default)]
pub struct ManualExecutor {
	queue: Arc<Mutex<VecDeque<Task>>>,
}

impl ManualExecutor {
	pub fn executor(&self) -> VoidExecutor {
		let queue = Arc::clone(&self.queue);
		Arc::new(move |task: Task| queue.lock().push_back(task))
	}

	/// Runs queued tasks, including ones they queue, and returns how many ran.
	pub fn run(&self) -> usize {
		let mut ran = 0;
		loop {
			let Some(task) = self.queue.lock().pop_front() else {
				return ran;
			};
			task();
			ran += 1;
		}
	}
}

/// A frontend that records everything the page sends it.
#[derive(Clone, Default)]
pub struct Frontend {
	messages: Arc<Mutex<Vec<String>>>,
	disconnected: Arc<AtomicBool>,
}

struct FrontendRemote(Frontend);

impl RemoteConnection for FrontendRemote {
	fn on_message(&self, message: String) {
		self.0.messages.lock().push(message);
	}

	fn on_disconnect(&self) {
		self.0.disconnected.store(true, Ordering::SeqCst);
	}
}

impl Frontend {
	pub fn remote(&self) -> Box<dyn RemoteConnection> {
		Box::new(FrontendRemote(self.clone()))
	}

	/// Drains and parses every message received so far.
	pub fn take(&self) -> Vec<Value> {
		self.messages
			.lock()
			.drain(..)
			.map(|message| serde_json::from_str(&message).unwrap())
			.collect()
	}

	pub fn is_disconnected(&self) -> bool {
		self.disconnected.load(Ordering::SeqCst)
	}
}

pub fn request(id: i64, method: &str, params: Value) -> String {
	let mut message = json!({ "id": id, "method": method });
	if !params.is_null() {
		message["params"] = params;
	}
	message.to_string()
}

pub fn methods(messages: &[Value]) -> Vec<&str> {
	messages
		.iter()
		.map(|message| message["method"].as_str().unwrap_or("<response>"))
		.collect()
}

type Listener = ScopedExecutor<dyn NetworkRequestListener>;

#[derive(Default)]
pub struct MockHostDelegate {
	pub supports_network: bool,
	pub metadata: HostTargetMetadata,
	pub reloads: Mutex<Vec<PageReloadRequest>>,
	pub overlay_messages: Mutex<Vec<Option<String>>>,
	pub network_requests: Mutex<Vec<(String, Listener)>>,
}

impl MockHostDelegate {
	pub fn with_network() -> Self {
		Self {
			supports_network: true,
			..Self::default()
		}
	}

	/// The listener for the `index`th network load.
	pub fn listener(&self, index: usize) -> Listener {
		self.network_requests.lock()[index].1.clone()
	}
}

impl HostTargetDelegate for MockHostDelegate {
	fn get_metadata(&self) -> HostTargetMetadata {
		self.metadata.clone()
	}

	fn on_reload(&self, request: &PageReloadRequest) {
		self.reloads.lock().push(request.clone());
	}

	fn on_set_paused_in_debugger_message(&self, request: &OverlaySetPausedInDebuggerMessageRequest) {
		self.overlay_messages.lock().push(request.message.clone());
	}

	fn load_network_resource(&self, request: &LoadNetworkResourceRequest, listener: Listener) -> Result<(), CdpError> {
		if !self.supports_network {
			return Err(CdpError::method_not_found("Network.loadNetworkResource"));
		}
		self.network_requests.lock().push((request.url.clone(), listener));
		Ok(())
	}
}

pub struct MockInstanceDelegate;

impl jsinspector::InstanceTargetDelegate for MockInstanceDelegate {}

/// Records what the engine side of the runtime sees.
#[derive(Default)]
pub struct MockRuntimeDelegate {
	pub handled_methods: Arc<Mutex<Vec<String>>>,
	pub installed_bindings: Mutex<Vec<(String, BindingCallback)>>,
	pub previously_exported: Mutex<Vec<Option<u32>>>,
	pub agents_created: AtomicU32,
}

impl MockRuntimeDelegate {
	/// Calls the most recently installed binding `name` as if script invoked it.
	pub fn call_binding(&self, name: &str, payload: &str) {
		let callback = self
			.installed_bindings
			.lock()
			.iter()
			.rev()
			.find(|(installed, _)| installed == name)
			.map(|(_, callback)| Arc::clone(callback))
			.unwrap();
		callback(payload);
	}

	pub fn installed_binding_names(&self) -> Vec<String> {
		self.installed_bindings.lock().iter().map(|(name, _)| name.clone()).collect()
	}
}

struct MockRuntimeAgentDelegate {
	frontend_channel: FrontendChannel,
	handled_methods: Arc<Mutex<Vec<String>>>,
	generation: u32,
}

impl RuntimeAgentDelegate for MockRuntimeAgentDelegate {
	fn handle_request(&self, request: &PreparsedRequest) -> bool {
		if !request.method.starts_with("Debugger.") || request.method.ends_with("able") {
			return false;
		}
		self.handled_methods.lock().push(request.method.clone());
		(self.frontend_channel)(&json_result(request.id, json!({})));
		true
	}

	fn export_state(&self) -> Option<ExportedState> {
		Some(Box::new(self.generation))
	}
}

impl RuntimeTargetDelegate for MockRuntimeDelegate {
	fn create_agent_delegate(
		&self,
		frontend_channel: FrontendChannel,
		_session_state: SharedSessionState,
		previously_exported_state: Option<ExportedState>,
		_execution_context: &ExecutionContextDescription,
		_runtime_executor: VoidExecutor,
	) -> Option<Box<dyn RuntimeAgentDelegate>> {
		let previous = previously_exported_state.and_then(|state| state.downcast::<u32>().ok().map(|state| *state));
		self.previously_exported.lock().push(previous);
		let generation = self.agents_created.fetch_add(1, Ordering::SeqCst);
		Some(Box::new(MockRuntimeAgentDelegate {
			frontend_channel,
			handled_methods: Arc::clone(&self.handled_methods),
			generation,
		}))
	}

	fn install_binding(&self, name: &str, callback: BindingCallback) {
		self.installed_bindings.lock().push((name.to_string(), callback));
	}
}

/// A page-side connection that records what the packager delivers.
pub struct LocalRecord {
	pub received: Mutex<Vec<String>>,
	pub disconnect_calls: AtomicU32,
	pub dropped: AtomicBool,
	remote: Mutex<Option<Arc<dyn RemoteConnection>>>,
}

impl LocalRecord {
	pub fn remote(&self) -> Arc<dyn RemoteConnection> {
		self.remote.lock().clone().unwrap()
	}

	pub fn is_live(&self) -> bool {
		self.disconnect_calls.load(Ordering::SeqCst) == 0 && !self.dropped.load(Ordering::SeqCst)
	}

	pub fn received(&self) -> Vec<Value> {
		self.received
			.lock()
			.iter()
			.map(|message| serde_json::from_str(message).unwrap())
			.collect()
	}
}

struct MockLocalConnection(Arc<LocalRecord>);

impl LocalConnection for MockLocalConnection {
	fn send_message(&self, message: String) {
		self.0.received.lock().push(message);
	}

	fn disconnect(&self) {
		self.0.disconnect_calls.fetch_add(1, Ordering::SeqCst);
	}
}

impl Drop for MockLocalConnection {
	fn drop(&mut self) {
		self.0.dropped.store(true, Ordering::SeqCst);
	}
}

/// How the next connection to a [`MockPage`] is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
	Accept,
	RejectSilently,
	RejectWithDisconnect,
}

/// Vends [`MockLocalConnection`]s for a registered page.
pub struct MockPage {
	pub locals: Mutex<Vec<Arc<LocalRecord>>>,
	pub behavior: Mutex<ConnectBehavior>,
}

impl MockPage {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			locals: Mutex::new(Vec::new()),
			behavior: Mutex::new(ConnectBehavior::Accept),
		})
	}

	pub fn connect_func(self: &Arc<Self>) -> ConnectFunc {
		let page = Arc::clone(self);
		Arc::new(move |remote: Box<dyn RemoteConnection>| -> Option<Box<dyn LocalConnection>> {
			let behavior = *page.behavior.lock();
			match behavior {
				ConnectBehavior::Accept => {
					let record = Arc::new(LocalRecord {
						received: Mutex::new(Vec::new()),
						disconnect_calls: AtomicU32::new(0),
						dropped: AtomicBool::new(false),
						remote: Mutex::new(Some(Arc::from(remote))),
					});
					page.locals.lock().push(Arc::clone(&record));
					Some(Box::new(MockLocalConnection(record)))
				}
				ConnectBehavior::RejectSilently => None,
				ConnectBehavior::RejectWithDisconnect => {
					remote.on_disconnect();
					None
				}
			}
		})
	}

	pub fn local(&self, index: usize) -> Arc<LocalRecord> {
		Arc::clone(&self.locals.lock()[index])
	}

	pub fn local_count(&self) -> usize {
		self.locals.lock().len()
	}
}

/// A socket opened through [`MockPackagerDelegate`].
pub struct SocketRecord {
	pub url: String,
	pub delegate: Weak<dyn WebSocketDelegate>,
	pub sent: Mutex<Vec<String>>,
	pub alive: AtomicBool,
}

impl SocketRecord {
	pub fn delegate(&self) -> Arc<dyn WebSocketDelegate> {
		self.delegate.upgrade().unwrap()
	}

	pub fn receive(&self, message: &str) {
		self.delegate().did_receive_message(message);
	}

	pub fn is_alive(&self) -> bool {
		self.alive.load(Ordering::SeqCst)
	}

	/// Drains and parses everything sent on this socket.
	pub fn take_sent(&self) -> Vec<Value> {
		self.sent
			.lock()
			.drain(..)
			.map(|message| serde_json::from_str(&message).unwrap())
			.collect()
	}
}

struct MockWebSocket(Arc<SocketRecord>);

impl WebSocket for MockWebSocket {
	fn send(&self, message: &str) {
		self.0.sent.lock().push(message.to_string());
	}
}

impl Drop for MockWebSocket {
	fn drop(&mut self) {
		self.0.alive.store(false, Ordering::SeqCst);
	}
}

/// Opens sockets that report `did_open` immediately and queues scheduled
/// callbacks for the test to run.
#[derive(Default)]
pub struct MockPackagerDelegate {
	pub sockets: Mutex<Vec<Arc<SocketRecord>>>,
	scheduled: Mutex<VecDeque<(Task, Duration)>>,
}

impl MockPackagerDelegate {
	pub fn socket(&self, index: usize) -> Arc<SocketRecord> {
		Arc::clone(&self.sockets.lock()[index])
	}

	pub fn socket_count(&self) -> usize {
		self.sockets.lock().len()
	}

	/// Number of queued callbacks with a non-zero delay.
	pub fn delayed_count(&self) -> usize {
		self.scheduled.lock().iter().filter(|(_, delay)| !delay.is_zero()).count()
	}

	/// Delays of the queued callbacks that are not due yet.
	pub fn delays(&self) -> Vec<Duration> {
		self.scheduled
			.lock()
			.iter()
			.map(|(_, delay)| *delay)
			.filter(|delay| !delay.is_zero())
			.collect()
	}

	/// Runs queued zero-delay callbacks, including ones they queue.
	pub fn run_ready(&self) -> usize {
		self.run_while(|delay| delay.is_zero())
	}

	/// Runs every queued callback regardless of delay.
	pub fn advance(&self) -> usize {
		self.run_while(|_| true)
	}

	fn run_while(&self, due: impl Fn(Duration) -> bool) -> usize {
		let mut ran = 0;
		loop {
			let next = {
				let mut scheduled = self.scheduled.lock();
				let index = scheduled.iter().position(|(_, delay)| due(*delay));
				index.and_then(|index| scheduled.remove(index))
			};
			let Some((task, _)) = next else {
				return ran;
			};
			task();
			ran += 1;
		}
	}
}

impl InspectorPackagerConnectionDelegate for MockPackagerDelegate {
	fn connect_web_socket(&self, url: &str, delegate: Weak<dyn WebSocketDelegate>) -> Box<dyn WebSocket> {
		let record = Arc::new(SocketRecord {
			url: url.to_string(),
			delegate: delegate.clone(),
			sent: Mutex::new(Vec::new()),
			alive: AtomicBool::new(true),
		});
		self.sockets.lock().push(Arc::clone(&record));
		if let Some(delegate) = delegate.upgrade() {
			delegate.did_open();
		}
		Box::new(MockWebSocket(record))
	}

	fn schedule_callback(&self, callback: Task, delay: Duration) {
		self.scheduled.lock().push_back((callback, delay));
	}
}
