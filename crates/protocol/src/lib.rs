//! Wire types shared by the inspector runtime and its hosts.
//!
//! Two protocols meet in this crate:
//!
//! - [`cdp`] - Chrome DevTools Protocol framing: preparsing requests, building
//!   results, errors and notifications, and the [`CdpError`] taxonomy that maps
//!   handler failures onto wire error codes.
//! - [`packager`] - the `{event, payload}` envelopes exchanged with the packager
//!   proxy that multiplexes debugger sessions over one socket.

pub mod cdp;
pub mod packager;

pub use cdp::{
	CdpError, ErrorCode, PreparsedRequest, RequestId, json_error, json_notification, json_request,
	json_result, preparse,
};
pub use packager::{
	InspectorTargetCapabilities, PackagerEvent, PackagerParseError, PackagerRequest,
	PageDescriptor, SessionAddress, WrappedEvent,
};
