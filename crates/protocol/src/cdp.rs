//! Chrome DevTools Protocol message framing.
//!
//! Incoming messages are preparsed into a [`PreparsedRequest`] which keeps the
//! params as raw JSON; each handler reads the fields it understands through
//! the typed accessors. Outgoing messages are built with [`json_result`],
//! [`json_error`] and [`json_notification`].

use serde_json::{Map, Value, json};
use thiserror::Error;

/// CDP request id. Int64 on the wire.
pub type RequestId = i64;

/// JSON-RPC error codes used by CDP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
	ParseError = -32700,
	InvalidRequest = -32600,
	MethodNotFound = -32601,
	InvalidParams = -32602,
	InternalError = -32603,
}

impl ErrorCode {
	/// Numeric value sent in the `error.code` field.
	pub fn code(self) -> i32 {
		self as i32
	}
}

/// Failure raised while handling a CDP request.
///
/// Every variant maps onto exactly one [`ErrorCode`]; the session turns an
/// `Err` into an error envelope keyed by the request id (or `null` for
/// [`CdpError::Parse`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CdpError {
	/// The message is not valid JSON.
	#[error("{0}")]
	Parse(String),

	/// Valid JSON of the wrong shape.
	#[error("{0}")]
	Type(String),

	/// The method is unknown or not implemented by any agent.
	#[error("{0}")]
	MethodNotFound(String),

	/// Params are well-formed but semantically invalid.
	#[error("{0}")]
	InvalidParams(String),

	/// The request was understood but could not be carried out.
	#[error("{0}")]
	Internal(String),
}

impl CdpError {
	/// Builds the error reported for a method nobody handled.
	pub fn method_not_found(method: &str) -> Self {
		Self::MethodNotFound(format!("Unsupported method '{method}'"))
	}

	/// Wire error code for this failure.
	pub fn code(&self) -> ErrorCode {
		match self {
			Self::Parse(_) => ErrorCode::ParseError,
			Self::Type(_) => ErrorCode::InvalidRequest,
			Self::MethodNotFound(_) => ErrorCode::MethodNotFound,
			Self::InvalidParams(_) => ErrorCode::InvalidParams,
			Self::Internal(_) => ErrorCode::InternalError,
		}
	}
}

/// A request whose envelope has been validated but whose params have not.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparsedRequest {
	pub id: RequestId,
	pub method: String,
	/// Raw params, `Value::Null` when the request carried none.
	pub params: Value,
}

impl PreparsedRequest {
	pub fn new(id: RequestId, method: impl Into<String>, params: Value) -> Self {
		Self {
			id,
			method: method.into(),
			params,
		}
	}

	/// Returns the params object, or `None` if the request had no params.
	pub fn params_object(&self) -> Result<Option<&Map<String, Value>>, CdpError> {
		match &self.params {
			Value::Null => Ok(None),
			Value::Object(map) => Ok(Some(map)),
			_ => Err(CdpError::Type("params must be an object".to_string())),
		}
	}

	/// Looks up a param by key. Absent and `null` are both `None`.
	pub fn param(&self, key: &str) -> Result<Option<&Value>, CdpError> {
		Ok(self
			.params_object()?
			.and_then(|params| params.get(key))
			.filter(|value| !value.is_null()))
	}

	pub fn str_param(&self, key: &str) -> Result<Option<&str>, CdpError> {
		match self.param(key)? {
			None => Ok(None),
			Some(Value::String(s)) => Ok(Some(s)),
			Some(_) => Err(CdpError::Type(format!("'{key}' must be a string"))),
		}
	}

	pub fn bool_param(&self, key: &str) -> Result<Option<bool>, CdpError> {
		match self.param(key)? {
			None => Ok(None),
			Some(Value::Bool(b)) => Ok(Some(*b)),
			Some(_) => Err(CdpError::Type(format!("'{key}' must be a boolean"))),
		}
	}

	pub fn i64_param(&self, key: &str) -> Result<Option<i64>, CdpError> {
		match self.param(key)? {
			None => Ok(None),
			Some(value) => value
				.as_i64()
				.map(Some)
				.ok_or_else(|| CdpError::Type(format!("'{key}' must be an integer"))),
		}
	}

	/// Like [`str_param`](Self::str_param) but absence is a type error.
	pub fn required_str_param(&self, key: &str) -> Result<&str, CdpError> {
		self.str_param(key)?
			.ok_or_else(|| CdpError::Type(format!("missing required param '{key}'")))
	}
}

/// Validates the CDP envelope of `message`.
///
/// Invalid JSON yields [`CdpError::Parse`]; JSON that is not an object with an
/// integer `id` and a string `method` yields [`CdpError::Type`].
pub fn preparse(message: &str) -> Result<PreparsedRequest, CdpError> {
	let parsed: Value = serde_json::from_str(message).map_err(|e| CdpError::Parse(e.to_string()))?;
	let Value::Object(mut object) = parsed else {
		return Err(CdpError::Type("request must be an object".to_string()));
	};

	let id = object
		.get("id")
		.and_then(Value::as_i64)
		.ok_or_else(|| CdpError::Type("request 'id' must be an integer".to_string()))?;
	let method = match object.remove("method") {
		Some(Value::String(method)) => method,
		_ => return Err(CdpError::Type("request 'method' must be a string".to_string())),
	};
	let params = object.remove("params").unwrap_or(Value::Null);

	Ok(PreparsedRequest { id, method, params })
}

/// Serializes a request. `Value::Null` params are omitted.
pub fn json_request(id: RequestId, method: &str, params: Value) -> String {
	let mut message = json!({ "id": id, "method": method });
	if !params.is_null() {
		message["params"] = params;
	}
	message.to_string()
}

/// Serializes a success response. `Value::Null` becomes `{}`.
pub fn json_result(id: RequestId, result: Value) -> String {
	let result = if result.is_null() { json!({}) } else { result };
	json!({ "id": id, "result": result }).to_string()
}

/// Serializes an error response. A `None` id is sent as `null`.
pub fn json_error(id: Option<RequestId>, code: ErrorCode, message: Option<&str>) -> String {
	let mut error = json!({ "code": code.code() });
	if let Some(message) = message {
		error["message"] = Value::from(message);
	}
	json!({ "id": id, "error": error }).to_string()
}

/// Serializes a notification. `Value::Null` params are omitted.
pub fn json_notification(method: &str, params: Value) -> String {
	let mut message = json!({ "method": method });
	if !params.is_null() {
		message["params"] = params;
	}
	message.to_string()
}
