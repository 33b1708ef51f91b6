//! The debuggable-entity tree: Host, Instance, Runtime.
//!
//! Each level owns at most one child of the next level. Registering or
//! unregistering a child walks every live session or agent attached at that
//! level and rebinds it before the child becomes visible or goes away, so no
//! agent is left pointing at a detached target.

pub mod host;
pub mod instance;
pub mod runtime;

pub use host::{
	HostCommand, HostTarget, HostTargetDelegate, HostTargetMetadata, LoadNetworkResourceRequest,
	OverlaySetPausedInDebuggerMessageRequest, PageReloadRequest,
};
pub use instance::{InstanceTarget, InstanceTargetDelegate};
pub use runtime::{BindingCallback, RuntimeAgentDelegate, RuntimeTarget, RuntimeTargetDelegate};
