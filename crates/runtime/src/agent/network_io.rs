//! `Network.loadNetworkResource` and the `IO` stream domain.
//!
//! The host delegate does the actual fetching and reports progress through a
//! [`NetworkRequestListener`]. Each request becomes a stream the frontend
//! drains with `IO.read` and releases with `IO.close`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use dashmap::DashMap;
use jsinspector_protocol::{CdpError, ErrorCode, PreparsedRequest, RequestId, json_error, json_result};
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::connection::FrontendChannel;
use crate::executor::{ScopedExecutor, VoidExecutor};
use crate::target::host::{HostTargetDelegate, LoadNetworkResourceRequest};

/// Response headers as reported by the host.
pub type Headers = BTreeMap<String, String>;

/// Aborts an in-flight load.
pub type CancelFunction = Box<dyn FnOnce() + Send>;

/// Bytes returned by one `IO.read` without an explicit `size`.
const DEFAULT_READ_SIZE: usize = 1024 * 1024;

const NET_ERR_FAILED: (&str, i32) = ("net::ERR_FAILED", -2);
const NET_ERR_HTTP_RESPONSE_CODE_FAILURE: (&str, i32) = ("net::ERR_HTTP_RESPONSE_CODE_FAILURE", -379);

/// Receives the progress of a network load started by
/// [`HostTargetDelegate::load_network_resource`].
///
/// Calls must arrive in order: `on_headers` once, then any number of
/// `on_data`, then `on_completion` or `on_error`. An `on_error` before
/// `on_headers` fails the load as a whole.
pub trait NetworkRequestListener: Send + Sync {
	fn on_headers(&self, http_status_code: u16, headers: &Headers);

	fn on_data(&self, data: &[u8]);

	fn on_error(&self, message: &str);

	fn on_completion(&self);

	/// Installs the function `IO.close` calls to abort the load.
	fn set_cancel_function(&self, cancel: CancelFunction);
}

type Streams = DashMap<String, Arc<Stream>>;

struct PendingRead {
	request_id: RequestId,
	size: usize,
}

struct StreamState {
	/// The `Network.loadNetworkResource` request awaiting its response.
	initial_request: Option<RequestId>,
	buffer: Vec<u8>,
	completed: bool,
	error: Option<String>,
	is_text: bool,
	pending_reads: VecDeque<PendingRead>,
	cancel: Option<CancelFunction>,
}

struct Stream {
	id: String,
	frontend_channel: FrontendChannel,
	streams: Weak<Streams>,
	state: Mutex<StreamState>,
}

impl Stream {
	fn new(id: String, initial_request: RequestId, frontend_channel: FrontendChannel, streams: Weak<Streams>) -> Self {
		Self {
			id,
			frontend_channel,
			streams,
			state: Mutex::new(StreamState {
				initial_request: Some(initial_request),
				buffer: Vec::new(),
				completed: false,
				error: None,
				is_text: false,
				pending_reads: VecDeque::new(),
				cancel: None,
			}),
		}
	}

	fn read(&self, request_id: RequestId, size: usize) {
		self.state.lock().pending_reads.push_back(PendingRead { request_id, size });
		self.fulfill_pending_reads();
	}

	fn cancel(&self) {
		let cancel = self.state.lock().cancel.take();
		if let Some(cancel) = cancel {
			cancel();
		}
	}

	/// Forgets the stream and aborts the load.
	fn discard(&self) {
		if let Some(streams) = self.streams.upgrade() {
			streams.remove(&self.id);
		}
		self.cancel();
	}

	fn send_load_failure(&self, request_id: RequestId, (name, code): (&str, i32), response: Option<(u16, &Headers)>) {
		let mut resource = json!({
			"success": false,
			"netErrorName": name,
			"netError": code,
		});
		if let Some((status, headers)) = response {
			resource["httpStatusCode"] = Value::from(status);
			resource["headers"] = json!(headers);
		}
		(self.frontend_channel)(&json_result(request_id, json!({ "resource": resource })));
	}

	/// Answers every queued read that can be answered now, in order.
	fn fulfill_pending_reads(&self) {
		let mut responses = Vec::new();
		{
			let mut state = self.state.lock();
			while let Some(read) = state.pending_reads.front() {
				let ready = state.error.is_some() || state.completed || state.buffer.len() >= read.size;
				if !ready {
					break;
				}
				let Some(read) = state.pending_reads.pop_front() else {
					break;
				};
				if let Some(error) = &state.error {
					responses.push(json_error(Some(read.request_id), ErrorCode::InternalError, Some(error)));
					continue;
				}

				let len = read.size.min(state.buffer.len());
				let chunk: Vec<u8> = state.buffer.drain(..len).collect();
				let eof = state.completed && state.buffer.is_empty();
				let (data, base64_encoded) = encode_chunk(chunk, state.is_text);
				responses.push(json_result(
					read.request_id,
					json!({ "data": data, "eof": eof, "base64Encoded": base64_encoded }),
				));
			}
		}
		for response in responses {
			(self.frontend_channel)(&response);
		}
	}
}

impl NetworkRequestListener for Stream {
	fn on_headers(&self, http_status_code: u16, headers: &Headers) {
		let initial_request = {
			let mut state = self.state.lock();
			state.is_text = headers
				.iter()
				.find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
				.is_some_and(|(_, value)| is_text_mime_type(value));
			state.initial_request.take()
		};
		let Some(request_id) = initial_request else {
			tracing::warn!(target = "jsinspector", stream = %self.id, "duplicate headers for network stream");
			return;
		};

		if (200..400).contains(&http_status_code) {
			(self.frontend_channel)(&json_result(
				request_id,
				json!({
					"resource": {
						"success": true,
						"stream": self.id,
						"httpStatusCode": http_status_code,
						"headers": headers,
					}
				}),
			));
		} else {
			self.send_load_failure(
				request_id,
				NET_ERR_HTTP_RESPONSE_CODE_FAILURE,
				Some((http_status_code, headers)),
			);
			self.discard();
		}
	}

	fn on_data(&self, data: &[u8]) {
		self.state.lock().buffer.extend_from_slice(data);
		self.fulfill_pending_reads();
	}

	fn on_error(&self, message: &str) {
		let initial_request = {
			let mut state = self.state.lock();
			state.error = Some(message.to_string());
			state.initial_request.take()
		};
		tracing::debug!(target = "jsinspector", stream = %self.id, error = %message, "network stream failed");

		match initial_request {
			Some(request_id) => {
				self.send_load_failure(request_id, NET_ERR_FAILED, None);
				self.discard();
			}
			None => self.fulfill_pending_reads(),
		}
	}

	fn on_completion(&self) {
		self.state.lock().completed = true;
		self.fulfill_pending_reads();
	}

	fn set_cancel_function(&self, cancel: CancelFunction) {
		self.state.lock().cancel = Some(cancel);
	}
}

/// Returns true for content types that can be sent to the frontend verbatim.
fn is_text_mime_type(content_type: &str) -> bool {
	let mime = content_type
		.split(';')
		.next()
		.unwrap_or_default()
		.trim()
		.to_ascii_lowercase();
	mime.starts_with("text/")
		|| ["json", "javascript", "xml"]
			.iter()
			.any(|kind| mime.starts_with("application/") && mime.contains(kind))
}

/// Text chunks go out as-is if they are valid UTF-8, everything else as base64.
fn encode_chunk(chunk: Vec<u8>, is_text: bool) -> (String, bool) {
	if is_text {
		match String::from_utf8(chunk) {
			Ok(text) => (text, false),
			Err(err) => (BASE64.encode(err.into_bytes()), true),
		}
	} else {
		(BASE64.encode(chunk), true)
	}
}

/// Per-session owner of network streams.
pub(crate) struct NetworkIoAgent {
	frontend_channel: FrontendChannel,
	executor: VoidExecutor,
	streams: Arc<Streams>,
	next_stream_id: AtomicU64,
}

impl NetworkIoAgent {
	/// `executor` is the host executor; listener calls are delivered there.
	pub(crate) fn new(frontend_channel: FrontendChannel, executor: VoidExecutor) -> Self {
		Self {
			frontend_channel,
			executor,
			streams: Arc::new(DashMap::new()),
			next_stream_id: AtomicU64::new(0),
		}
	}

	pub(crate) fn handle_request(
		&self,
		request: &PreparsedRequest,
		delegate: &dyn HostTargetDelegate,
	) -> Result<bool, CdpError> {
		match request.method.as_str() {
			"Network.loadNetworkResource" => {
				let url = request.required_str_param("url")?.to_string();
				self.load_network_resource(request.id, url, delegate)?;
				Ok(true)
			}
			"IO.read" => {
				let handle = request.required_str_param("handle")?;
				let size = match request.i64_param("size")? {
					None => DEFAULT_READ_SIZE,
					Some(size) => usize::try_from(size)
						.ok()
						.filter(|size| *size > 0)
						.ok_or_else(|| CdpError::InvalidParams("Invalid read size".to_string()))?,
				};
				let stream = self.stream(handle)?;
				stream.read(request.id, size);
				Ok(true)
			}
			"IO.close" => {
				let handle = request.required_str_param("handle")?;
				let Some((_, stream)) = self.streams.remove(handle) else {
					return Err(stream_not_found(handle));
				};
				stream.cancel();
				(self.frontend_channel)(&json_result(request.id, json!({})));
				Ok(true)
			}
			_ => Ok(false),
		}
	}

	fn load_network_resource(
		&self,
		request_id: RequestId,
		url: String,
		delegate: &dyn HostTargetDelegate,
	) -> Result<(), CdpError> {
		let id = self.next_stream_id.fetch_add(1, Ordering::Relaxed).to_string();
		let stream = Arc::new(Stream::new(
			id.clone(),
			request_id,
			Arc::clone(&self.frontend_channel),
			Arc::downgrade(&self.streams),
		));
		// The delegate may answer synchronously, so the stream must be findable first.
		self.streams.insert(id.clone(), Arc::clone(&stream));

		let listener: Weak<Stream> = Arc::downgrade(&stream);
		let listener: Weak<dyn NetworkRequestListener> = listener;
		drop(stream);
		tracing::debug!(target = "jsinspector", stream = %id, url = %url, "loading network resource");
		let result = delegate.load_network_resource(
			&LoadNetworkResourceRequest { url },
			ScopedExecutor::new(listener, Arc::clone(&self.executor)),
		);
		if result.is_err() {
			self.streams.remove(&id);
		}
		result
	}

	fn stream(&self, handle: &str) -> Result<Arc<Stream>, CdpError> {
		self.streams
			.get(handle)
			.map(|entry| Arc::clone(entry.value()))
			.ok_or_else(|| stream_not_found(handle))
	}
}

impl Drop for NetworkIoAgent {
	fn drop(&mut self) {
		let streams: Vec<Arc<Stream>> = self.streams.iter().map(|entry| Arc::clone(entry.value())).collect();
		self.streams.clear();
		for stream in streams {
			stream.cancel();
		}
	}
}

fn stream_not_found(handle: &str) -> CdpError {
	CdpError::InvalidParams(format!("Stream not found: {handle}"))
}
