use std::sync::Arc;

use parking_lot::Mutex;

use crate::agent::instance::InstanceAgent;
use crate::connection::FrontendChannel;
use crate::execution_context::{ExecutionContextDescription, ExecutionContextManager};
use crate::executor::VoidExecutor;
use crate::session_state::SharedSessionState;
use crate::target::runtime::{RuntimeTarget, RuntimeTargetDelegate};
use crate::weak_list::WeakList;

/// Embedder hooks for an instance. Nothing is required today.
pub trait InstanceTargetDelegate: Send + Sync {}

struct InstanceTargetState {
	current_runtime: Option<Arc<RuntimeTarget>>,
	agents: WeakList<InstanceAgent>,
}

/// One app instance under a host; survives for as long as the embedder keeps
/// it registered, typically one JS bundle load.
pub struct InstanceTarget {
	delegate: Arc<dyn InstanceTargetDelegate>,
	execution_contexts: Arc<ExecutionContextManager>,
	state: Mutex<InstanceTargetState>,
}

impl InstanceTarget {
	pub(crate) fn create(
		delegate: Arc<dyn InstanceTargetDelegate>,
		execution_contexts: Arc<ExecutionContextManager>,
	) -> Arc<Self> {
		Arc::new(Self {
			delegate,
			execution_contexts,
			state: Mutex::new(InstanceTargetState {
				current_runtime: None,
				agents: WeakList::new(),
			}),
		})
	}

	pub fn delegate(&self) -> &dyn InstanceTargetDelegate {
		self.delegate.as_ref()
	}

	pub(crate) fn create_agent(
		&self,
		frontend_channel: FrontendChannel,
		session_state: SharedSessionState,
	) -> Arc<InstanceAgent> {
		let runtime = self.state.lock().current_runtime.clone();
		let agent = Arc::new(InstanceAgent::new(frontend_channel, session_state));
		agent.set_current_runtime(runtime.as_ref());
		self.state.lock().agents.insert(Arc::downgrade(&agent));
		agent
	}

	/// Registers the instance's JS runtime and binds every agent to it.
	///
	/// `js_executor` runs tasks on the JS thread. Panics if a runtime is
	/// already registered.
	pub fn register_runtime(
		&self,
		delegate: Arc<dyn RuntimeTargetDelegate>,
		js_executor: VoidExecutor,
	) -> Arc<RuntimeTarget> {
		assert!(
			self.state.lock().current_runtime.is_none(),
			"Only one runtime allowed per instance target"
		);
		let context = ExecutionContextDescription {
			id: self.execution_contexts.allocate_execution_context_id(),
			origin: String::new(),
			name: "main".to_string(),
			unique_id: None,
		};
		let runtime = RuntimeTarget::create(context, delegate, js_executor);

		let agents = {
			let mut state = self.state.lock();
			state.current_runtime = Some(Arc::clone(&runtime));
			state.agents.live()
		};
		for agent in agents {
			agent.set_current_runtime(Some(&runtime));
		}
		runtime
	}

	/// Unbinds every agent from `runtime`, then drops it.
	///
	/// Panics if `runtime` is not the registered runtime.
	pub fn unregister_runtime(&self, runtime: &Arc<RuntimeTarget>) {
		let agents = {
			let mut state = self.state.lock();
			assert!(
				state
					.current_runtime
					.as_ref()
					.is_some_and(|current| Arc::ptr_eq(current, runtime)),
				"Invalid unregistration"
			);
			state.agents.live()
		};

		for agent in agents {
			agent.set_current_runtime(None);
		}
		if let Some(removed) = self.state.lock().current_runtime.take() {
			removed.assert_detached();
		}
	}

	pub(crate) fn assert_detached(&self) {
		assert!(
			self.state.lock().agents.is_empty(),
			"InstanceAgent objects must be destroyed before their InstanceTarget"
		);
	}
}
