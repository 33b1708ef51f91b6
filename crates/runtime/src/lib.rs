//! jsinspector - CDP target tree, sessions and packager connection
//!
//! This crate lets a host application expose its JavaScript runtime to Chrome
//! DevTools Protocol frontends:
//!
//! - **Targets**: the Host → Instance → Runtime tree the embedder registers
//!   and unregisters as the app reloads
//! - **Sessions and agents**: one agent chain per connected frontend, rebound
//!   whenever the tree changes underneath it
//! - **Executors**: lifetime-scoped dispatch across threads and queues
//! - **Page registry**: the [`Inspector`] pages are published through
//! - **Packager connection**: many sessions multiplexed over one WebSocket
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ connect ┌─────────────────┐  CDP  ┌────────────────┐
//! │   packager   │────────▶│ InspectorImpl   │──────▶│ HostTarget     │
//! │  connection  │◀────────│ (page registry) │       │  └ Instance    │
//! └──────────────┘ events  └─────────────────┘       │     └ Runtime  │
//!                                                    └───────┬────────┘
//!                                          HostTargetSession │ per frontend
//!                                                    ┌───────▼────────┐
//!                                                    │ HostAgent      │
//!                                                    │  ├ NetworkIO   │
//!                                                    │  ├ Tracing     │
//!                                                    │  └ Instance    │
//!                                                    │     └ Runtime  │
//!                                                    └────────────────┘
//! ```
//!
//! Targets hold their agents weakly and agents hold their targets strongly, so
//! a frontend disconnecting never leaves a dangling agent behind and a target
//! cannot be dropped while an agent still uses it.

pub mod agent;
pub mod config;
pub mod connection;
pub mod error;
pub mod execution_context;
pub mod executor;
pub mod inspector;
pub mod packager;
mod session;
pub mod session_state;
pub mod target;
pub mod transport;
pub mod weak_list;

pub use agent::{CancelFunction, Headers, NetworkRequestListener};
pub use config::{InspectorFlags, PackagerConnectionConfig};
pub use connection::{CallbackLocalConnection, FrontendChannel, LocalConnection, RaiiRemoteConnection, RemoteConnection};
pub use error::{Error, Result};
pub use execution_context::{ExecutionContextDescription, ExecutionContextSelector};
pub use executor::{EnableExecutorFromThis, ScopedExecutor, Task, TaskQueue, VoidExecutor, make_void_executor};
pub use inspector::{ConnectFunc, Inspector, InspectorImpl, InspectorPage, PageStatusListener, default_inspector};
pub use packager::{
	InspectorPackagerConnection, InspectorPackagerConnectionDelegate, RECONNECT_DELAY, WebSocket, WebSocketDelegate,
};
pub use session_state::{ExportedState, SessionState, SharedSessionState};
pub use target::{
	BindingCallback, HostCommand, HostTarget, HostTargetDelegate, HostTargetMetadata, InstanceTarget,
	InstanceTargetDelegate, LoadNetworkResourceRequest, OverlaySetPausedInDebuggerMessageRequest, PageReloadRequest,
	RuntimeAgentDelegate, RuntimeTarget, RuntimeTargetDelegate,
};
pub use transport::{TokioPackagerDelegate, TungsteniteWebSocket};
pub use weak_list::WeakList;
