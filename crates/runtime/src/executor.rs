//! Executors and lifetime-scoped callback dispatch.
//!
//! A [`VoidExecutor`] runs a [`Task`] somewhere: inline, on a queue, on another
//! thread. A [`ScopedExecutor`] pairs one with a weak reference so that a
//! continuation scheduled against an object only runs if the object is still
//! alive when the executor gets to it. Objects that hand out such executors
//! for themselves implement [`EnableExecutorFromThis`].

use std::sync::{Arc, OnceLock, Weak};

use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks. Ordering and thread are up to the implementation.
pub type VoidExecutor = Arc<dyn Fn(Task) + Send + Sync>;

/// Dispatches continuations against a weakly held `T`.
///
/// The continuation receives `&T` iff `T` is alive when the underlying
/// executor runs it; otherwise it is dropped without running.
pub struct ScopedExecutor<T: ?Sized> {
	target: Weak<T>,
	executor: VoidExecutor,
}

impl<T: ?Sized> Clone for ScopedExecutor<T> {
	fn clone(&self) -> Self {
		Self {
			target: self.target.clone(),
			executor: Arc::clone(&self.executor),
		}
	}
}

impl<T: ?Sized + Send + Sync + 'static> ScopedExecutor<T> {
	pub fn new(target: Weak<T>, executor: VoidExecutor) -> Self {
		Self { target, executor }
	}

	/// Schedules `f` to run against the target on the underlying executor.
	pub fn execute<F>(&self, f: F)
	where
		F: FnOnce(&T) + Send + 'static,
	{
		let target = self.target.clone();
		(self.executor)(Box::new(move || {
			if let Some(target) = target.upgrade() {
				f(&target);
			}
		}));
	}
}

/// Wraps a scoped executor into a [`VoidExecutor`] that only runs tasks
/// while the scope's target is alive.
pub fn make_void_executor<T>(scoped: ScopedExecutor<T>) -> VoidExecutor
where
	T: ?Sized + Send + Sync + 'static,
{
	Arc::new(move |task: Task| scoped.execute(move |_| task()))
}

/// Storage for the executor installed by [`EnableExecutorFromThis::set_executor`].
pub struct ExecutorSlot<T> {
	scoped: OnceLock<ScopedExecutor<T>>,
}

impl<T> Default for ExecutorSlot<T> {
	fn default() -> Self {
		Self {
			scoped: OnceLock::new(),
		}
	}
}

/// Gives an `Arc`-owned type a [`ScopedExecutor`] for itself.
///
/// `set_executor` must be called exactly once, right after construction;
/// `executor_from_this` before that is a bug and panics.
pub trait EnableExecutorFromThis: Send + Sync + Sized + 'static {
	fn executor_slot(&self) -> &ExecutorSlot<Self>;

	fn set_executor(self: &Arc<Self>, executor: VoidExecutor) {
		let scoped = ScopedExecutor::new(Arc::downgrade(self), executor);
		assert!(
			self.executor_slot().scoped.set(scoped).is_ok(),
			"set_executor must be called exactly once"
		);
	}

	fn executor_from_this(&self) -> ScopedExecutor<Self> {
		match self.executor_slot().scoped.get() {
			Some(scoped) => scoped.clone(),
			None => panic!("executor_from_this called before set_executor"),
		}
	}
}

/// FIFO executor drained by a single tokio task.
///
/// Every task runs on the same logical queue, which makes a `TaskQueue` a
/// natural home for one target subtree or for WebSocket delegate callbacks.
/// The queue stops once the `TaskQueue` and every executor obtained from it
/// are dropped.
pub struct TaskQueue {
	sender: mpsc::UnboundedSender<Task>,
}

impl TaskQueue {
	pub fn spawn(handle: &Handle) -> Self {
		let (sender, mut receiver) = mpsc::unbounded_channel::<Task>();
		handle.spawn(async move {
			while let Some(task) = receiver.recv().await {
				task();
			}
			tracing::trace!(target = "jsinspector", "task queue drained");
		});
		Self { sender }
	}

	pub fn executor(&self) -> VoidExecutor {
		let sender = self.sender.clone();
		Arc::new(move |task: Task| {
			if sender.send(task).is_err() {
				tracing::debug!(target = "jsinspector", "task queue closed, dropping task");
			}
		})
	}
}
