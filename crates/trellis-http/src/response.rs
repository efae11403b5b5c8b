use bytes::Bytes;
use hyper::header::{self, HeaderName, HeaderValue};
use hyper::{HeaderMap, StatusCode};
use serde::Serialize;

use crate::error::Result;

/// A buffered HTTP response value.
///
/// This is the snapshot form of what a [`crate::ResponseSink`] records:
/// status, headers and a fully materialized body. Handlers typically build
/// one with the constructor helpers and hand it to
/// [`crate::ResponseSink::send`].
#[derive(Debug, Clone)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	/// Create a new Response with the given status code.
	///
	/// # Examples
	///
	/// ```
	/// use trellis_http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::new(StatusCode::OK);
	/// assert_eq!(response.status, StatusCode::OK);
	/// assert!(response.body.is_empty());
	/// ```
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	/// Create a Response with HTTP 200 OK status.
	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	/// Create a Response with HTTP 404 Not Found status.
	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	/// Create a redirect Response with the given status and `Location` header.
	///
	/// # Examples
	///
	/// ```
	/// use trellis_http::Response;
	/// use hyper::StatusCode;
	///
	/// let response = Response::redirect(StatusCode::MOVED_PERMANENTLY, "/new".parse().unwrap());
	/// assert_eq!(response.status, StatusCode::MOVED_PERMANENTLY);
	/// assert_eq!(response.headers.get("location").unwrap(), &"/new");
	/// ```
	pub fn redirect(status: StatusCode, location: HeaderValue) -> Self {
		Self::new(status).with_header(header::LOCATION, location)
	}

	/// Create a 200 Response with a JSON body and content type.
	///
	/// # Errors
	///
	/// Returns [`crate::Error::Json`] if the value cannot be serialized.
	pub fn json<T: Serialize>(value: &T) -> Result<Self> {
		let body = serde_json::to_vec(value)?;
		Ok(Self::ok()
			.with_header(
				header::CONTENT_TYPE,
				HeaderValue::from_static("application/json"),
			)
			.with_body(body))
	}

	/// Replace the body.
	///
	/// # Examples
	///
	/// ```
	/// use trellis_http::Response;
	///
	/// let response = Response::ok().with_body("hello");
	/// assert_eq!(&response.body[..], b"hello");
	/// ```
	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	/// Insert a header, replacing any previous value for the same name.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);
		self
	}

	/// The body decoded as UTF-8, lossily. Intended for tests and logging.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}
