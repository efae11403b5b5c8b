//! The response sink capability and a buffered implementation.
//!
//! The routing core never constructs transport responses itself; it writes
//! through this trait. Only the default 404 fallback and redirect routes
//! write from inside the core; everything else is a handler's concern.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use hyper::{HeaderMap, StatusCode};
use parking_lot::Mutex;

use crate::response::Response;

/// Where a dispatched request's response is written.
///
/// Implementations take `&self`; a sink is shared between the router and the
/// handler it invokes, so interior mutability is the implementor's job.
pub trait ResponseSink: Send + Sync {
	/// Begin the response with a status line and headers.
	fn begin(&self, status: StatusCode, headers: HeaderMap);

	/// Append a body chunk.
	fn write_body(&self, chunk: Bytes);

	/// Finish the response. No further writes should follow.
	fn end(&self);

	/// Write a complete buffered [`Response`] in one call.
	fn send(&self, response: Response) {
		let Response {
			status,
			headers,
			body,
		} = response;
		self.begin(status, headers);
		if !body.is_empty() {
			self.write_body(body);
		}
		self.end();
	}
}

/// Shared handle to a response sink.
pub type SharedSink = Arc<dyn ResponseSink>;

#[derive(Debug, Default)]
struct BufferState {
	status: Option<StatusCode>,
	headers: HeaderMap,
	body: BytesMut,
	ended: bool,
}

/// An in-memory [`ResponseSink`] that records everything written to it.
///
/// Used by tests and by embedders that want to adapt the recorded response
/// to their own transport.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trellis_http::{Response, ResponseBuffer, ResponseSink};
///
/// let buffer = Arc::new(ResponseBuffer::new());
/// buffer.send(Response::ok().with_body("hi"));
/// assert_eq!(buffer.status(), Some(hyper::StatusCode::OK));
/// assert_eq!(buffer.body_text(), "hi");
/// assert!(buffer.ended());
/// ```
#[derive(Debug, Default)]
pub struct ResponseBuffer {
	state: Mutex<BufferState>,
}

impl ResponseBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	/// The recorded status, if `begin` has been called.
	pub fn status(&self) -> Option<StatusCode> {
		self.state.lock().status
	}

	/// A recorded header value, decoded lossily for inspection.
	pub fn header(&self, name: &str) -> Option<String> {
		self.state
			.lock()
			.headers
			.get(name)
			.map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
	}

	/// The body written so far.
	pub fn body(&self) -> Bytes {
		Bytes::from(self.state.lock().body.clone())
	}

	/// The body written so far, decoded as UTF-8 lossily.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.state.lock().body).into_owned()
	}

	/// True once `end` has been called.
	pub fn ended(&self) -> bool {
		self.state.lock().ended
	}

	/// True once `begin` has been called.
	pub fn has_begun(&self) -> bool {
		self.state.lock().status.is_some()
	}

	/// Snapshot the recorded response, if one has begun.
	pub fn to_response(&self) -> Option<Response> {
		let state = self.state.lock();
		state.status.map(|status| Response {
			status,
			headers: state.headers.clone(),
			body: Bytes::from(state.body.clone()),
		})
	}
}

impl ResponseSink for ResponseBuffer {
	fn begin(&self, status: StatusCode, headers: HeaderMap) {
		let mut state = self.state.lock();
		state.status = Some(status);
		state.headers = headers;
	}

	fn write_body(&self, chunk: Bytes) {
		self.state.lock().body.extend_from_slice(&chunk);
	}

	fn end(&self) {
		self.state.lock().ended = true;
	}
}
