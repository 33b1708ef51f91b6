//! Page registry consulted by frontends and the packager connection.
//!
//! Pages are registered by hosts with a connect function; frontends look a
//! page up by id and call [`Inspector::connect`] to open a session. Page ids
//! count up from 1 and are never reused for the life of the registry.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, Weak};

use jsinspector_protocol::InspectorTargetCapabilities;
use parking_lot::Mutex;

use crate::connection::{LocalConnection, RemoteConnection};

/// Opens a session on a page. Returning `None` rejects the connection.
pub type ConnectFunc =
	Arc<dyn Fn(Box<dyn RemoteConnection>) -> Option<Box<dyn LocalConnection>> + Send + Sync>;

/// Snapshot of a registered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectorPage {
	pub id: i32,
	pub description: String,
	pub vm: String,
	pub capabilities: InspectorTargetCapabilities,
}

/// Observer notified when pages go away.
pub trait PageStatusListener: Send + Sync {
	fn on_page_removed(&self, page_id: i32);
}

/// The page registry.
pub trait Inspector: Send + Sync {
	/// Registers a page and returns its id.
	fn add_page(
		&self,
		description: &str,
		vm: &str,
		connect_func: ConnectFunc,
		capabilities: InspectorTargetCapabilities,
	) -> i32;

	/// Unregisters a page and notifies page status listeners.
	fn remove_page(&self, page_id: i32);

	/// Pages currently registered, in registration order.
	fn get_pages(&self) -> Vec<InspectorPage>;

	/// Connects to a page, or returns `None` if it does not exist or refused.
	fn connect(&self, page_id: i32, remote: Box<dyn RemoteConnection>) -> Option<Box<dyn LocalConnection>>;

	/// Adds a weakly held page status listener.
	fn register_page_status_listener(&self, listener: Weak<dyn PageStatusListener>);
}

struct Page {
	description: String,
	vm: String,
	capabilities: InspectorTargetCapabilities,
	connect_func: ConnectFunc,
}

struct Registry {
	next_page_id: i32,
	pages: BTreeMap<i32, Page>,
	listeners: Vec<Weak<dyn PageStatusListener>>,
}

/// Mutex-protected [`Inspector`].
pub struct InspectorImpl {
	registry: Mutex<Registry>,
}

impl Default for InspectorImpl {
	fn default() -> Self {
		Self::new()
	}
}

impl InspectorImpl {
	pub fn new() -> Self {
		Self {
			registry: Mutex::new(Registry {
				next_page_id: 1,
				pages: BTreeMap::new(),
				listeners: Vec::new(),
			}),
		}
	}
}

impl Inspector for InspectorImpl {
	fn add_page(
		&self,
		description: &str,
		vm: &str,
		connect_func: ConnectFunc,
		capabilities: InspectorTargetCapabilities,
	) -> i32 {
		let mut registry = self.registry.lock();
		let page_id = registry.next_page_id;
		registry.next_page_id = match page_id.checked_add(1) {
			Some(next) => next,
			None => panic!("page ids exhausted"),
		};
		registry.pages.insert(
			page_id,
			Page {
				description: description.to_string(),
				vm: vm.to_string(),
				capabilities,
				connect_func,
			},
		);
		tracing::debug!(target = "jsinspector", page_id, description, "page added");
		page_id
	}

	fn remove_page(&self, page_id: i32) {
		let listeners: Vec<Arc<dyn PageStatusListener>> = {
			let mut registry = self.registry.lock();
			if registry.pages.remove(&page_id).is_none() {
				return;
			}
			registry.listeners.retain(|listener| listener.strong_count() > 0);
			registry.listeners.iter().filter_map(Weak::upgrade).collect()
		};

		tracing::debug!(target = "jsinspector", page_id, "page removed");
		for listener in listeners {
			listener.on_page_removed(page_id);
		}
	}

	fn get_pages(&self) -> Vec<InspectorPage> {
		self.registry
			.lock()
			.pages
			.iter()
			.map(|(id, page)| InspectorPage {
				id: *id,
				description: page.description.clone(),
				vm: page.vm.clone(),
				capabilities: page.capabilities,
			})
			.collect()
	}

	fn connect(&self, page_id: i32, remote: Box<dyn RemoteConnection>) -> Option<Box<dyn LocalConnection>> {
		// The connect function may call back into the registry.
		let connect_func = self
			.registry
			.lock()
			.pages
			.get(&page_id)
			.map(|page| Arc::clone(&page.connect_func))?;
		connect_func(remote)
	}

	fn register_page_status_listener(&self, listener: Weak<dyn PageStatusListener>) {
		self.registry.lock().listeners.push(listener);
	}
}

/// Process-wide registry for the outermost composition point of a host.
///
/// Library code takes an `Arc<dyn Inspector>` instead of reaching for this.
pub fn default_inspector() -> Arc<dyn Inspector> {
	static DEFAULT: OnceLock<Arc<dyn Inspector>> = OnceLock::new();
	Arc::clone(DEFAULT.get_or_init(|| Arc::new(InspectorImpl::new())))
}
