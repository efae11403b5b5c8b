//! Handler and hook traits, plus function adapters for closures.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use trellis_http::{Request, Result, SharedSink};

use crate::route::RouteOutcome;

/// Captured path parameters, bound the way the route was registered.
///
/// The two binding strategies are modeled explicitly rather than through
/// variadic argument splicing: a route registered with positional binding
/// hands its handler the decoded values in capture order; one registered
/// with named binding hands it a name-to-value map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathArgs {
	/// Decoded capture values in pattern declaration order.
	Positional(Vec<String>),
	/// Decoded capture values keyed by declared parameter name.
	Named(HashMap<String, String>),
}

impl PathArgs {
	/// An empty positional argument list, used for routes that carry no
	/// path parameters (predicate routes).
	pub fn none() -> Self {
		Self::Positional(Vec::new())
	}

	/// The positional values, if bound positionally.
	pub fn positional(&self) -> Option<&[String]> {
		match self {
			Self::Positional(values) => Some(values),
			Self::Named(_) => None,
		}
	}

	/// The named map, if bound by name.
	pub fn named(&self) -> Option<&HashMap<String, String>> {
		match self {
			Self::Named(map) => Some(map),
			Self::Positional(_) => None,
		}
	}
}

impl Default for PathArgs {
	fn default() -> Self {
		Self::none()
	}
}

/// Handler trait for processing matched requests.
///
/// Handlers receive their own clone of the request, a shared handle to the
/// response sink, and the bound path arguments. A handler that returns an
/// error propagates it out of dispatch unchanged; the router never catches
/// handler failures.
#[async_trait]
pub trait Handler: Send + Sync {
	async fn handle(&self, request: Request, sink: SharedSink, args: PathArgs) -> Result<()>;
}

/// Blanket implementation so `Arc<dyn Handler>` is itself a Handler,
/// enabling shared ownership of handlers across routes.
#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
	async fn handle(&self, request: Request, sink: SharedSink, args: PathArgs) -> Result<()> {
		(**self).handle(request, sink, args).await
	}
}

/// Function handler adapter.
///
/// # Examples
///
/// ```
/// use trellis_router::{FunctionHandler, PathArgs};
/// use trellis_http::{Request, Response, ResponseSink, SharedSink};
///
/// let handler = FunctionHandler::new(|_req: Request, sink: SharedSink, _args: PathArgs| async move {
/// 	sink.send(Response::ok().with_body("hello"));
/// 	Ok::<(), trellis_http::Error>(())
/// });
/// # let _ = handler;
/// ```
pub struct FunctionHandler<F> {
	func: F,
}

impl<F> FunctionHandler<F> {
	pub fn new(func: F) -> Self {
		Self { func }
	}
}

#[async_trait]
impl<F, Fut> Handler for FunctionHandler<F>
where
	F: Fn(Request, SharedSink, PathArgs) -> Fut + Send + Sync,
	Fut: Future<Output = Result<()>> + Send,
{
	async fn handle(&self, request: Request, sink: SharedSink, args: PathArgs) -> Result<()> {
		(self.func)(request, sink, args).await
	}
}

/// A hook run before route resolution on every dispatch.
#[async_trait]
pub trait BeforeHook: Send + Sync {
	async fn call(&self, request: &Request) -> Result<()>;
}

/// A hook run after dispatch completes, with the accumulated per-route
/// outcomes for inspection.
#[async_trait]
pub trait AfterHook: Send + Sync {
	async fn call(&self, request: &Request, outcomes: &[RouteOutcome]) -> Result<()>;
}

/// Function adapter for before-hooks.
pub struct BeforeFn<F> {
	func: F,
}

impl<F> BeforeFn<F> {
	pub fn new(func: F) -> Self {
		Self { func }
	}
}

#[async_trait]
impl<F, Fut> BeforeHook for BeforeFn<F>
where
	F: Fn(Request) -> Fut + Send + Sync,
	Fut: Future<Output = Result<()>> + Send,
{
	async fn call(&self, request: &Request) -> Result<()> {
		(self.func)(request.clone()).await
	}
}

/// Function adapter for after-hooks.
pub struct AfterFn<F> {
	func: F,
}

impl<F> AfterFn<F> {
	pub fn new(func: F) -> Self {
		Self { func }
	}
}

#[async_trait]
impl<F, Fut> AfterHook for AfterFn<F>
where
	F: Fn(Request, Vec<RouteOutcome>) -> Fut + Send + Sync,
	Fut: Future<Output = Result<()>> + Send,
{
	async fn call(&self, request: &Request, outcomes: &[RouteOutcome]) -> Result<()> {
		(self.func)(request.clone(), outcomes.to_vec()).await
	}
}
