//! Error types shared across the trellis workspace.

use thiserror::Error;

/// Result type used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by route registration and dispatch.
///
/// Configuration problems ([`Error::UnsupportedMethod`], [`Error::Pattern`])
/// are raised at registration time, never deferred to request time. Handler
/// failures pass through dispatch unchanged; the router does not catch them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
	/// A route spec named an HTTP method the router does not support.
	#[error("unsupported HTTP method: {0}")]
	UnsupportedMethod(String),

	/// A route pattern failed to compile.
	#[error("invalid route pattern: {0}")]
	Pattern(String),

	/// JSON serialization failed while building a response body.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// A failure raised by a route handler or hook, passed through unchanged.
	#[error(transparent)]
	Handler(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
	/// Wraps an arbitrary failure for propagation out of a handler.
	pub fn handler<E>(err: E) -> Self
	where
		E: Into<Box<dyn std::error::Error + Send + Sync>>,
	{
		Self::Handler(err.into())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unsupported_method_display() {
		let err = Error::UnsupportedMethod("TRACE".to_string());
		assert_eq!(err.to_string(), "unsupported HTTP method: TRACE");
	}

	#[test]
	fn test_handler_error_preserves_message() {
		let err = Error::handler("boom");
		assert_eq!(err.to_string(), "boom");
	}
}
