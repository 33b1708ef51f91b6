//! Per-session CDP handlers, one chain per session.
//!
//! Requests enter at the [`HostAgent`](host::HostAgent), which handles host
//! domains itself and then offers the request to the network IO agent, the
//! tracing agent and finally the current instance agent, which passes it on to
//! its runtime agent. The first handler that claims a request answers it.

pub(crate) mod host;
pub(crate) mod instance;
pub mod network_io;
pub(crate) mod runtime;
pub(crate) mod tracing_agent;

pub use network_io::{CancelFunction, Headers, NetworkRequestListener};
