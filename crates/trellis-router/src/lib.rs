//! Ordered, first-match-wins HTTP request routing.
//!
//! A [`Router`] holds an ordered table of routes, a set of mounted child
//! routers and lifecycle hooks. Dispatching a request runs the before-hooks,
//! delegates to the first mount whose prefix covers the path (with the
//! prefix stripped), otherwise scans the route table in registration order
//! until a route handles the request, falls back to a plain-text 404 when
//! nothing does, and finally runs the after-hooks with the accumulated
//! per-route outcomes.
//!
//! Three route variants exist:
//!
//! - method routes, matching an HTTP method plus a path pattern such as
//!   `/users/:id` (see [`PathPattern`] for the pattern language);
//! - predicate routes, matching an arbitrary condition over the request;
//! - redirect routes, answering matching paths with a `Location` header.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use trellis_http::{Request, Response, ResponseBuffer, ResponseSink, SharedSink};
//! use trellis_router::{FunctionHandler, PathArgs, Router};
//!
//! # async fn run() -> trellis_http::Result<()> {
//! let mut router = Router::new();
//! router.get(
//! 	"/users/:id",
//! 	FunctionHandler::new(|_req: Request, sink: SharedSink, args: PathArgs| async move {
//! 		let id = args.positional().and_then(|a| a.first()).cloned().unwrap_or_default();
//! 		sink.send(Response::ok().with_body(format!("user {id}")));
//! 		Ok(())
//! 	}),
//! )?;
//!
//! let sink: SharedSink = Arc::new(ResponseBuffer::new());
//! router.dispatch(&Request::new(hyper::Method::GET, "/users/7"), sink).await?;
//! # Ok(())
//! # }
//! ```

pub mod handler;
pub mod pattern;
pub mod route;
pub mod router;

pub use handler::{AfterFn, AfterHook, BeforeFn, BeforeHook, FunctionHandler, Handler, PathArgs};
pub use pattern::{PathPattern, decode_capture};
pub use route::{
	MethodRoute, ParamBinding, Predicate, PredicateRoute, RedirectRoute, Route, RouteOptions,
	RouteOutcome, RouteSpec,
};
pub use router::{Mount, Router};
