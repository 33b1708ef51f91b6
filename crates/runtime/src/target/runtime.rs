//! The JS runtime target.
//!
//! Unlike the host and instance, a runtime target is driven from the JS
//! engine's own thread. Anything that has to run there (installing bindings,
//! delegate work) goes through [`executor_from_this`](EnableExecutorFromThis::executor_from_this).

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use jsinspector_protocol::PreparsedRequest;
use parking_lot::Mutex;

use crate::agent::runtime::RuntimeAgent;
use crate::connection::FrontendChannel;
use crate::execution_context::{ExecutionContextDescription, matches_any};
use crate::executor::{EnableExecutorFromThis, ExecutorSlot, VoidExecutor, make_void_executor};
use crate::session_state::{ExportedState, SharedSessionState};
use crate::weak_list::WeakList;

/// Called by JS with the binding's payload.
pub type BindingCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Engine-specific CDP handling for one session, e.g. `Debugger.*`.
pub trait RuntimeAgentDelegate: Send + Sync {
	/// Handles `request` and returns true, or returns false to let it fall
	/// through.
	fn handle_request(&self, request: &PreparsedRequest) -> bool;

	/// State to hand to the next delegate of this session after a reload.
	fn export_state(&self) -> Option<ExportedState> {
		None
	}
}

/// Engine hooks for a runtime target.
pub trait RuntimeTargetDelegate: Send + Sync {
	/// Creates the engine side of a session's runtime agent, or `None` if the
	/// engine has no CDP support.
	fn create_agent_delegate(
		&self,
		frontend_channel: FrontendChannel,
		session_state: SharedSessionState,
		previously_exported_state: Option<ExportedState>,
		execution_context: &ExecutionContextDescription,
		runtime_executor: VoidExecutor,
	) -> Option<Box<dyn RuntimeAgentDelegate>>;

	/// Exposes a global function `name` to JS that forwards its string
	/// argument to `callback`. Runs on the JS thread.
	fn install_binding(&self, _name: &str, _callback: BindingCallback) {}
}

struct RuntimeTargetState {
	agents: WeakList<RuntimeAgent>,
	installed_bindings: HashSet<String>,
}

pub struct RuntimeTarget {
	execution_context: ExecutionContextDescription,
	delegate: Arc<dyn RuntimeTargetDelegate>,
	self_weak: Weak<RuntimeTarget>,
	executor: ExecutorSlot<RuntimeTarget>,
	state: Mutex<RuntimeTargetState>,
}

impl EnableExecutorFromThis for RuntimeTarget {
	fn executor_slot(&self) -> &ExecutorSlot<Self> {
		&self.executor
	}
}

impl RuntimeTarget {
	pub(crate) fn create(
		execution_context: ExecutionContextDescription,
		delegate: Arc<dyn RuntimeTargetDelegate>,
		js_executor: VoidExecutor,
	) -> Arc<Self> {
		let target = Arc::new_cyclic(|self_weak| Self {
			execution_context,
			delegate,
			self_weak: self_weak.clone(),
			executor: ExecutorSlot::default(),
			state: Mutex::new(RuntimeTargetState {
				agents: WeakList::new(),
				installed_bindings: HashSet::new(),
			}),
		});
		target.set_executor(js_executor);
		target
	}

	pub fn execution_context(&self) -> &ExecutionContextDescription {
		&self.execution_context
	}

	pub(crate) fn create_agent(
		self: &Arc<Self>,
		frontend_channel: FrontendChannel,
		session_state: SharedSessionState,
	) -> Arc<RuntimeAgent> {
		let exported_state = session_state.lock().last_runtime_agent_exported_state.take();
		let delegate = self.delegate.create_agent_delegate(
			Arc::clone(&frontend_channel),
			Arc::clone(&session_state),
			exported_state,
			&self.execution_context,
			make_void_executor(self.executor_from_this()),
		);
		let agent = Arc::new(RuntimeAgent::new(
			frontend_channel,
			Arc::clone(self),
			Arc::clone(&session_state),
			delegate,
		));
		self.state.lock().agents.insert(Arc::downgrade(&agent));

		// Bindings the session subscribed to before this runtime existed.
		let bindings: Vec<String> = session_state
			.lock()
			.subscribed_bindings
			.iter()
			.filter(|(_, selectors)| matches_any(selectors, &self.execution_context))
			.map(|(name, _)| name.clone())
			.collect();
		for name in bindings {
			self.install_binding_handler(&name);
		}
		agent
	}

	/// Installs binding `name` in JS unless it already is. Installed bindings
	/// stay installed for the life of the runtime.
	pub(crate) fn install_binding_handler(&self, name: &str) {
		if !self.state.lock().installed_bindings.insert(name.to_string()) {
			return;
		}

		let target = self.self_weak.clone();
		let binding_name = name.to_string();
		let callback: BindingCallback = Arc::new(move |payload: &str| {
			if let Some(target) = target.upgrade() {
				target.emit_binding_called(&binding_name, payload);
			}
		});
		let name = name.to_string();
		self.executor_from_this()
			.execute(move |runtime| runtime.delegate.install_binding(&name, callback));
	}

	/// Reports a call to binding `name` from JS to every subscribed session.
	pub fn emit_binding_called(&self, name: &str, payload: &str) {
		let agents = self.state.lock().agents.live();
		for agent in agents {
			agent.notify_binding_called(name, payload);
		}
	}

	pub(crate) fn assert_detached(&self) {
		assert!(
			self.state.lock().agents.is_empty(),
			"RuntimeAgent objects must be destroyed before their RuntimeTarget"
		);
	}
}
