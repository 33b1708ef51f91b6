//! Per-session state shared by every agent in a session's chain.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::execution_context::ExecutionContextSelectorSet;

/// Opaque state a runtime agent delegate hands to its successor.
pub type ExportedState = Box<dyn Any + Send>;

/// What a frontend has turned on for one session.
#[derive(Default)]
pub struct SessionState {
	pub is_debugger_domain_enabled: bool,
	pub is_log_domain_enabled: bool,
	pub is_network_domain_enabled: bool,
	pub is_react_native_application_domain_enabled: bool,
	pub is_runtime_domain_enabled: bool,
	/// `Tracing.start` was sent and `Tracing.end` has not been.
	pub has_pending_trace_recording: bool,
	/// `Runtime.addBinding` subscriptions by binding name.
	pub subscribed_bindings: HashMap<String, ExecutionContextSelectorSet>,
	/// Left behind by the last runtime agent delegate of this session.
	pub last_runtime_agent_exported_state: Option<ExportedState>,
}

/// Handle agents use to read and update their session's state.
pub type SharedSessionState = Arc<Mutex<SessionState>>;
