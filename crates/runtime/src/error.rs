//! Error types for the inspector runtime.
//!
//! CDP handler failures are [`CdpError`](jsinspector_protocol::CdpError) and end
//! up on the wire. This enum covers the packager side, where failures are only
//! logged.

use jsinspector_protocol::PackagerParseError;
use thiserror::Error;

/// Result type alias for inspector runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised outside the CDP request path.
#[derive(Debug, Error)]
pub enum Error {
	/// The packager sent something we could not decode.
	#[error(transparent)]
	Packager(#[from] PackagerParseError),

	/// A packager `pageId` that is not a decimal page id.
	#[error("Invalid page id: {0}")]
	InvalidPageId(String),

	/// JSON serialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// WebSocket transport failure.
	#[error("WebSocket error: {0}")]
	WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl Error {
	/// Returns the OS error code behind a transport failure, if any.
	pub fn raw_os_error(&self) -> Option<i32> {
		match self {
			Self::WebSocket(tokio_tungstenite::tungstenite::Error::Io(err)) => err.raw_os_error(),
			_ => None,
		}
	}
}
