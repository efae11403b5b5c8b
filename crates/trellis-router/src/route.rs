//! Route variants and their per-route `handle` contracts.
//!
//! There are exactly three closed variants (method routes, predicate
//! routes and redirect routes), represented as a tagged enum with an
//! exhaustive dispatch in the router's scan loop.

use std::collections::HashMap;
use std::sync::Arc;

use hyper::header::{self, HeaderValue};
use hyper::{HeaderMap, Method, StatusCode};
use tracing::debug;

use trellis_http::{Error, Request, Result, SharedSink};

use crate::handler::{Handler, PathArgs};
use crate::pattern::{PathPattern, decode_capture};

/// A synchronous match condition over the request.
pub type Predicate = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// How captured parameters are handed to a handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParamBinding {
	/// Decoded values in capture order.
	#[default]
	Positional,
	/// A single map from declared parameter name to decoded value.
	Named,
}

/// Per-route registration options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteOptions {
	pub binding: ParamBinding,
}

/// The result of offering one request to one route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOutcome {
	/// Whether the route handled the request and ended the scan.
	pub handled: bool,
	/// Declared parameter names, for method routes that matched.
	pub param_names: Vec<String>,
	/// Decoded capture values, for method routes that matched.
	pub args: Vec<String>,
}

impl RouteOutcome {
	pub(crate) fn unmatched() -> Self {
		Self::default()
	}

	pub(crate) fn handled() -> Self {
		Self {
			handled: true,
			..Self::default()
		}
	}

	pub(crate) fn handled_with_args(param_names: Vec<String>, args: Vec<String>) -> Self {
		Self {
			handled: true,
			param_names,
			args,
		}
	}
}

/// One registered routing rule.
pub enum Route {
	Method(MethodRoute),
	Predicate(PredicateRoute),
	Redirect(RedirectRoute),
}

impl Route {
	/// Offers the request to this route. `path` is the effective path for
	/// matching, which differs from `request.path()` below a mount.
	pub(crate) async fn handle(
		&self,
		request: &Request,
		path: &str,
		sink: &SharedSink,
	) -> Result<RouteOutcome> {
		match self {
			Route::Method(route) => route.handle(request, path, sink).await,
			Route::Predicate(route) => route.handle(request, sink).await,
			Route::Redirect(route) => route.handle(path, sink),
		}
	}
}

/// A route matching on HTTP method and path pattern.
pub struct MethodRoute {
	method: Option<Method>,
	pattern: PathPattern,
	handler: Arc<dyn Handler>,
	binding: ParamBinding,
}

impl MethodRoute {
	pub(crate) fn new(
		method: Option<Method>,
		pattern: PathPattern,
		handler: Arc<dyn Handler>,
		binding: ParamBinding,
	) -> Self {
		Self {
			method,
			pattern,
			handler,
			binding,
		}
	}

	/// The method this route is constrained to; `None` matches any method.
	pub fn method(&self) -> Option<&Method> {
		self.method.as_ref()
	}

	/// The normalized source pattern.
	pub fn pattern(&self) -> &str {
		self.pattern.pattern()
	}

	/// Declared parameter names in capture order.
	pub fn param_names(&self) -> &[String] {
		self.pattern.param_names()
	}

	/// The binding mode selected at registration.
	pub fn binding(&self) -> ParamBinding {
		self.binding
	}

	async fn handle(
		&self,
		request: &Request,
		path: &str,
		sink: &SharedSink,
	) -> Result<RouteOutcome> {
		if let Some(method) = &self.method
			&& *method != request.method
		{
			return Ok(RouteOutcome::unmatched());
		}
		let Some(captures) = self.pattern.matches(path) else {
			return Ok(RouteOutcome::unmatched());
		};

		let args: Vec<String> = captures
			.iter()
			.map(|raw| decode_capture(raw.as_deref()))
			.collect();
		let path_args = match self.binding {
			ParamBinding::Positional => PathArgs::Positional(args.clone()),
			ParamBinding::Named => PathArgs::Named(
				self.pattern
					.param_names()
					.iter()
					.cloned()
					.zip(args.iter().cloned())
					.collect::<HashMap<_, _>>(),
			),
		};

		debug!(pattern = self.pattern.pattern(), path, "route matched");
		self.handler
			.handle(request.clone(), sink.clone(), path_args)
			.await?;
		Ok(RouteOutcome::handled_with_args(
			self.pattern.param_names().to_vec(),
			args,
		))
	}
}

/// A route matching on an arbitrary request condition instead of a path.
pub struct PredicateRoute {
	predicate: Predicate,
	handler: Arc<dyn Handler>,
}

impl PredicateRoute {
	pub(crate) fn new(predicate: Predicate, handler: Arc<dyn Handler>) -> Self {
		Self { predicate, handler }
	}

	async fn handle(&self, request: &Request, sink: &SharedSink) -> Result<RouteOutcome> {
		if !(self.predicate)(request) {
			return Ok(RouteOutcome::unmatched());
		}
		// Predicates never see or produce path parameters.
		self.handler
			.handle(request.clone(), sink.clone(), PathArgs::none())
			.await?;
		Ok(RouteOutcome::handled())
	}
}

/// A route that answers matching paths with a redirect.
pub struct RedirectRoute {
	from: PathPattern,
	to: String,
	location: HeaderValue,
	status: StatusCode,
}

impl RedirectRoute {
	pub(crate) fn new(from: PathPattern, to: String, status: StatusCode) -> Result<Self> {
		let location = HeaderValue::from_str(&to)
			.map_err(|e| Error::Pattern(format!("invalid redirect target {to:?}: {e}")))?;
		Ok(Self {
			from,
			to,
			location,
			status,
		})
	}

	/// The source pattern being redirected away from.
	pub fn from(&self) -> &str {
		self.from.pattern()
	}

	/// The redirect target.
	pub fn to(&self) -> &str {
		&self.to
	}

	/// The redirect status code.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	fn handle(&self, path: &str, sink: &SharedSink) -> Result<RouteOutcome> {
		// No method constraint: a non-matching path just lets the scan
		// continue to later routes.
		if !self.from.is_match(path) {
			return Ok(RouteOutcome::unmatched());
		}
		debug!(from = self.from.pattern(), to = %self.to, status = %self.status, "redirecting");
		let mut headers = HeaderMap::new();
		headers.insert(header::LOCATION, self.location.clone());
		sink.begin(self.status, headers);
		sink.end();
		Ok(RouteOutcome::handled())
	}
}

/// A declarative route specification consumed by [`crate::Router::add`].
pub enum RouteSpec {
	/// A method + pattern route. The method string is validated at
	/// registration time; anything but GET/POST/PUT/PATCH/DELETE
	/// (case-insensitive) is a configuration error.
	Pattern {
		method: String,
		url: String,
		handler: Arc<dyn Handler>,
		options: RouteOptions,
	},
	/// A predicate route.
	Predicate {
		predicate: Predicate,
		handler: Arc<dyn Handler>,
	},
	/// A redirect; `status` defaults to 301 Moved Permanently.
	Redirect {
		from: String,
		to: String,
		status: Option<StatusCode>,
	},
}
