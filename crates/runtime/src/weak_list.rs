//! Non-owning registry of live objects.

use std::sync::{Arc, Weak};

/// A list of weak references that prunes expired entries as it walks them.
///
/// Targets keep one of these for the agents and sessions attached to them.
/// Not synchronized; the owner wraps it in its own lock.
pub struct WeakList<T: ?Sized> {
	entries: Vec<Weak<T>>,
}

impl<T: ?Sized> Default for WeakList<T> {
	fn default() -> Self {
		Self { entries: Vec::new() }
	}
}

impl<T: ?Sized> WeakList<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, item: Weak<T>) {
		self.entries.push(item);
	}

	/// Calls `f` for every live entry in insertion order, erasing dead ones.
	pub fn for_each(&mut self, mut f: impl FnMut(&Arc<T>)) {
		self.entries.retain(|entry| match entry.upgrade() {
			Some(item) => {
				f(&item);
				true
			}
			None => false,
		});
	}

	/// Strong references to every live entry, in insertion order.
	///
	/// Lets the caller release its lock before calling into the entries.
	pub fn live(&mut self) -> Vec<Arc<T>> {
		let mut items = Vec::with_capacity(self.entries.len());
		self.for_each(|item| items.push(Arc::clone(item)));
		items
	}

	/// Number of live entries.
	pub fn len(&self) -> usize {
		self.entries.iter().filter(|entry| entry.strong_count() > 0).count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
