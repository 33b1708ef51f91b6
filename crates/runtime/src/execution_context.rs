//! Execution context identity and selection.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};

use serde_json::{Value, json};

/// A JS execution context as announced to the frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContextDescription {
	pub id: i32,
	pub origin: String,
	pub name: String,
	pub unique_id: Option<String>,
}

impl ExecutionContextDescription {
	/// The `context` object of `Runtime.executionContextCreated`.
	pub fn to_cdp(&self) -> Value {
		let mut context = json!({
			"id": self.id,
			"origin": self.origin,
			"name": self.name,
		});
		if let Some(unique_id) = &self.unique_id {
			context["uniqueId"] = Value::from(unique_id.as_str());
		}
		context
	}
}

/// Allocates execution context ids for one host.
///
/// Ids start at 1, only ever increase and are never reused, so a frontend can
/// tell a reloaded runtime apart from its predecessor.
#[derive(Debug)]
pub struct ExecutionContextManager {
	next_id: AtomicI32,
}

impl Default for ExecutionContextManager {
	fn default() -> Self {
		Self {
			next_id: AtomicI32::new(1),
		}
	}
}

impl ExecutionContextManager {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn allocate_execution_context_id(&self) -> i32 {
		match self
			.next_id
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| id.checked_add(1))
		{
			Ok(id) => id,
			Err(_) => panic!("execution context ids exhausted"),
		}
	}
}

/// Which execution contexts a binding subscription applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExecutionContextSelector {
	All,
	ById(i32),
	ByName(String),
}

impl ExecutionContextSelector {
	pub fn matches(&self, context: &ExecutionContextDescription) -> bool {
		match self {
			Self::All => true,
			Self::ById(id) => *id == context.id,
			Self::ByName(name) => *name == context.name,
		}
	}
}

pub type ExecutionContextSelectorSet = HashSet<ExecutionContextSelector>;

pub fn matches_any(selectors: &ExecutionContextSelectorSet, context: &ExecutionContextDescription) -> bool {
	selectors.iter().any(|selector| selector.matches(context))
}
