//! HTTP types consumed by the trellis router.
//!
//! This crate holds the narrow interfaces the routing core depends on:
//!
//! - [`Request`]: an incoming request exposing method, path, headers and body
//! - [`Response`]: a buffered status/headers/body value with constructor helpers
//! - [`ResponseSink`]: the capability a router and its handlers write through
//! - [`ResponseBuffer`]: an in-memory sink for tests and embedding
//! - [`Error`]/[`Result`]: the error vocabulary shared across the workspace
//!
//! The transport that produces [`Request`]s and consumes what a
//! [`ResponseSink`] records is an external collaborator; nothing in this
//! crate listens on sockets.

pub mod error;
pub mod request;
pub mod response;
pub mod sink;

pub use error::{Error, Result};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use sink::{ResponseBuffer, ResponseSink, SharedSink};
