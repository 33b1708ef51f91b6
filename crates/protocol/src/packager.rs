//! Envelopes exchanged with the packager proxy.
//!
//! Every message is `{"event": <name>, "payload": <value>}`. The proxy sends
//! [`PackagerRequest`]s; the device answers with [`PackagerEvent`]s. Sessions
//! are addressed by [`SessionAddress`], whose empty `sessionId` denotes the
//! legacy single-session mode.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A logical session slot: the page plus the proxy-assigned session id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAddress {
	/// Decimal string of the page id.
	pub page_id: String,
	/// Empty for legacy single-session mode.
	#[serde(default)]
	pub session_id: String,
}

impl SessionAddress {
	pub fn new(page_id: impl Into<String>, session_id: impl Into<String>) -> Self {
		Self {
			page_id: page_id.into(),
			session_id: session_id.into(),
		}
	}

	/// Returns true if this address uses legacy single-session mode.
	pub fn is_legacy(&self) -> bool {
		self.session_id.is_empty()
	}
}

/// A CDP message routed to or from a logical session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedEvent {
	#[serde(flatten)]
	pub address: SessionAddress,
	/// The serialized CDP message.
	pub wrapped_event: String,
}

/// What a page target can do natively, advertised to the frontend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectorTargetCapabilities {
	#[serde(default)]
	pub native_page_reloads: bool,
	#[serde(default)]
	pub native_source_code_fetching: bool,
	#[serde(default)]
	pub prefers_fusebox_frontend: bool,
}

/// Entry in the `getPages` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDescriptor {
	pub id: String,
	pub title: String,
	pub description: String,
	pub app: String,
	pub vm: String,
	pub capabilities: InspectorTargetCapabilities,
}

/// Message sent from the device to the packager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum PackagerEvent {
	GetPages(Vec<PageDescriptor>),
	WrappedEvent(WrappedEvent),
	Disconnect(SessionAddress),
}

impl PackagerEvent {
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}
}

/// Message received from the packager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackagerRequest {
	GetPages,
	Connect(SessionAddress),
	Disconnect(SessionAddress),
	WrappedEvent(WrappedEvent),
}

/// Failure to decode a [`PackagerRequest`].
#[derive(Debug, Error)]
pub enum PackagerParseError {
	#[error("malformed packager message: {0}")]
	Json(#[from] serde_json::Error),

	#[error("unknown packager event '{0}'")]
	UnknownEvent(String),

	#[error("packager event '{0}' is missing its payload")]
	MissingPayload(String),
}

#[derive(Deserialize)]
struct RawEnvelope {
	event: String,
	#[serde(default)]
	payload: Value,
}

impl PackagerRequest {
	/// Decodes one text frame from the packager.
	pub fn parse(message: &str) -> Result<Self, PackagerParseError> {
		let RawEnvelope { event, payload } = serde_json::from_str(message)?;

		if event == "getPages" {
			return Ok(Self::GetPages);
		}
		if payload.is_null() {
			return match event.as_str() {
				"connect" | "disconnect" | "wrappedEvent" => Err(PackagerParseError::MissingPayload(event)),
				_ => Err(PackagerParseError::UnknownEvent(event)),
			};
		}

		match event.as_str() {
			"connect" => Ok(Self::Connect(serde_json::from_value(payload)?)),
			"disconnect" => Ok(Self::Disconnect(serde_json::from_value(payload)?)),
			"wrappedEvent" => Ok(Self::WrappedEvent(serde_json::from_value(payload)?)),
			_ => Err(PackagerParseError::UnknownEvent(event)),
		}
	}
}
