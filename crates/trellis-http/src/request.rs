use bytes::Bytes;
use hyper::{HeaderMap, Method};

/// An incoming HTTP request as the router sees it.
///
/// Only `method` and `path` participate in routing; headers and body are
/// carried through to handlers and predicates untouched. Cloning is cheap
/// (`Bytes` body, reference-counted internally), which is how handlers and
/// hooks receive their own copy while dispatch keeps the original.
#[derive(Debug, Clone)]
pub struct Request {
	pub method: Method,
	path: String,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Request {
	/// Creates a request with the given method and path and no headers or body.
	///
	/// # Examples
	///
	/// ```
	/// use trellis_http::Request;
	/// use hyper::Method;
	///
	/// let request = Request::new(Method::GET, "/users/42");
	/// assert_eq!(request.path(), "/users/42");
	/// assert_eq!(request.method, Method::GET);
	/// ```
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	/// Returns a builder for assembling a request piece by piece.
	///
	/// # Examples
	///
	/// ```
	/// use trellis_http::Request;
	/// use hyper::Method;
	///
	/// let request = Request::builder()
	/// 	.method(Method::POST)
	/// 	.path("/items")
	/// 	.body("payload")
	/// 	.build();
	/// assert_eq!(request.path(), "/items");
	/// assert_eq!(&request.body[..], b"payload");
	/// ```
	pub fn builder() -> RequestBuilder {
		RequestBuilder::default()
	}

	/// The request path, exactly as the transport supplied it.
	pub fn path(&self) -> &str {
		&self.path
	}
}

/// Builder for [`Request`].
#[derive(Debug)]
pub struct RequestBuilder {
	method: Method,
	path: String,
	headers: HeaderMap,
	body: Bytes,
}

impl Default for RequestBuilder {
	fn default() -> Self {
		Self {
			method: Method::GET,
			path: String::from("/"),
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}
}

impl RequestBuilder {
	pub fn method(mut self, method: Method) -> Self {
		self.method = method;
		self
	}

	pub fn path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();
		self
	}

	pub fn headers(mut self, headers: HeaderMap) -> Self {
		self.headers = headers;
		self
	}

	pub fn header(
		mut self,
		name: hyper::header::HeaderName,
		value: hyper::header::HeaderValue,
	) -> Self {
		self.headers.insert(name, value);
		self
	}

	pub fn body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn build(self) -> Request {
		Request {
			method: self.method,
			path: self.path,
			headers: self.headers,
			body: self.body,
		}
	}
}
