//! The router: an ordered route table, lifecycle hooks and mount points,
//! with a first-match-wins dispatch loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures::future::BoxFuture;
use hyper::header::{self, HeaderValue};
use hyper::{HeaderMap, Method, StatusCode};
use tracing::{debug, trace};

use trellis_http::{Error, Request, Result, SharedSink};

use crate::handler::{AfterHook, BeforeHook, Handler};
use crate::pattern::{PathPattern, normalize_path};
use crate::route::{
	MethodRoute, PredicateRoute, RedirectRoute, Route, RouteOptions, RouteOutcome, RouteSpec,
};

/// A child router delegated to under a path prefix.
pub struct Mount {
	prefix: String,
	child: Router,
}

impl Mount {
	/// The normalized prefix (leading `/`, no trailing `/`).
	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	/// The mounted child router.
	pub fn child(&self) -> &Router {
		&self.child
	}
}

/// An ordered, first-match-wins request router.
///
/// Registration happens in a setup phase (`&mut self`); dispatch takes
/// `&self` so a finished router can be shared behind an `Arc` across
/// concurrent in-flight requests. The table seals itself on first dispatch
/// and any registration after that point panics; the single-writer
/// discipline is explicit, not a convention.
#[derive(Default)]
pub struct Router {
	routes: Vec<Route>,
	mounts: Vec<Mount>,
	before_hooks: Vec<Arc<dyn BeforeHook>>,
	after_hooks: Vec<Arc<dyn AfterHook>>,
	sealed: AtomicBool,
}

impl Router {
	pub fn new() -> Self {
		Self::default()
	}

	// ========================================================================
	// Registration
	// ========================================================================

	/// Registers a GET route. Returns the created route so callers can
	/// inspect its compiled parameter names.
	///
	/// # Errors
	///
	/// Returns [`Error::Pattern`] if the pattern does not compile.
	///
	/// # Panics
	///
	/// Panics if called after the router has started dispatching.
	pub fn get(
		&mut self,
		pattern: &str,
		handler: impl Handler + 'static,
	) -> Result<&MethodRoute> {
		self.get_with(pattern, handler, RouteOptions::default())
	}

	/// Registers a GET route with explicit options (binding mode).
	pub fn get_with(
		&mut self,
		pattern: &str,
		handler: impl Handler + 'static,
		options: RouteOptions,
	) -> Result<&MethodRoute> {
		self.add_pattern(Some(Method::GET), pattern, Arc::new(handler), options)
	}

	/// Registers a POST route.
	pub fn post(
		&mut self,
		pattern: &str,
		handler: impl Handler + 'static,
	) -> Result<&MethodRoute> {
		self.post_with(pattern, handler, RouteOptions::default())
	}

	/// Registers a POST route with explicit options.
	pub fn post_with(
		&mut self,
		pattern: &str,
		handler: impl Handler + 'static,
		options: RouteOptions,
	) -> Result<&MethodRoute> {
		self.add_pattern(Some(Method::POST), pattern, Arc::new(handler), options)
	}

	/// Registers a PUT route.
	pub fn put(
		&mut self,
		pattern: &str,
		handler: impl Handler + 'static,
	) -> Result<&MethodRoute> {
		self.put_with(pattern, handler, RouteOptions::default())
	}

	/// Registers a PUT route with explicit options.
	pub fn put_with(
		&mut self,
		pattern: &str,
		handler: impl Handler + 'static,
		options: RouteOptions,
	) -> Result<&MethodRoute> {
		self.add_pattern(Some(Method::PUT), pattern, Arc::new(handler), options)
	}

	/// Registers a PATCH route.
	pub fn patch(
		&mut self,
		pattern: &str,
		handler: impl Handler + 'static,
	) -> Result<&MethodRoute> {
		self.patch_with(pattern, handler, RouteOptions::default())
	}

	/// Registers a PATCH route with explicit options.
	pub fn patch_with(
		&mut self,
		pattern: &str,
		handler: impl Handler + 'static,
		options: RouteOptions,
	) -> Result<&MethodRoute> {
		self.add_pattern(Some(Method::PATCH), pattern, Arc::new(handler), options)
	}

	/// Registers a DELETE route.
	pub fn delete(
		&mut self,
		pattern: &str,
		handler: impl Handler + 'static,
	) -> Result<&MethodRoute> {
		self.delete_with(pattern, handler, RouteOptions::default())
	}

	/// Registers a DELETE route with explicit options.
	pub fn delete_with(
		&mut self,
		pattern: &str,
		handler: impl Handler + 'static,
		options: RouteOptions,
	) -> Result<&MethodRoute> {
		self.add_pattern(Some(Method::DELETE), pattern, Arc::new(handler), options)
	}

	/// Registers a route matching any HTTP method.
	pub fn any(
		&mut self,
		pattern: &str,
		handler: impl Handler + 'static,
	) -> Result<&MethodRoute> {
		self.any_with(pattern, handler, RouteOptions::default())
	}

	/// Registers an any-method route with explicit options.
	pub fn any_with(
		&mut self,
		pattern: &str,
		handler: impl Handler + 'static,
		options: RouteOptions,
	) -> Result<&MethodRoute> {
		self.add_pattern(None, pattern, Arc::new(handler), options)
	}

	/// Registers a 301 redirect from one path pattern to a target location.
	pub fn redirect(&mut self, from: &str, to: &str) -> Result<&RedirectRoute> {
		self.redirect_with_status(from, to, StatusCode::MOVED_PERMANENTLY)
	}

	/// Registers a redirect with an explicit status code.
	pub fn redirect_with_status(
		&mut self,
		from: &str,
		to: &str,
		status: StatusCode,
	) -> Result<&RedirectRoute> {
		self.assert_open();
		let pattern = PathPattern::compile(from)?;
		let route = RedirectRoute::new(pattern, normalize_path(to), status)?;
		self.routes.push(Route::Redirect(route));
		match self.routes.last() {
			Some(Route::Redirect(route)) => Ok(route),
			_ => unreachable!("a redirect route was just pushed"),
		}
	}

	/// Registers a predicate route: the handler runs when the predicate
	/// holds, regardless of path.
	pub fn when(
		&mut self,
		predicate: impl Fn(&Request) -> bool + Send + Sync + 'static,
		handler: impl Handler + 'static,
	) -> &PredicateRoute {
		self.assert_open();
		self.routes.push(Route::Predicate(PredicateRoute::new(
			Arc::new(predicate),
			Arc::new(handler),
		)));
		match self.routes.last() {
			Some(Route::Predicate(route)) => route,
			_ => unreachable!("a predicate route was just pushed"),
		}
	}

	/// Registers a batch of declarative route specs.
	///
	/// # Errors
	///
	/// An unsupported method string fails the whole call immediately with
	/// [`Error::UnsupportedMethod`]; nothing after the offending spec is
	/// registered.
	pub fn add(&mut self, specs: impl IntoIterator<Item = RouteSpec>) -> Result<()> {
		for spec in specs {
			match spec {
				RouteSpec::Pattern {
					method,
					url,
					handler,
					options,
				} => {
					let method = parse_method(&method)?;
					self.add_pattern(Some(method), &url, handler, options)?;
				}
				RouteSpec::Predicate { predicate, handler } => {
					self.assert_open();
					self.routes
						.push(Route::Predicate(PredicateRoute::new(predicate, handler)));
				}
				RouteSpec::Redirect { from, to, status } => {
					self.redirect_with_status(
						&from,
						&to,
						status.unwrap_or(StatusCode::MOVED_PERMANENTLY),
					)?;
				}
			}
		}
		Ok(())
	}

	/// Mounts a child router under a path prefix. All requests whose path
	/// falls under the prefix are delegated to the child with the prefix
	/// stripped; delegation is exclusive.
	pub fn mount(&mut self, prefix: &str, child: Router) {
		self.assert_open();
		let mut prefix = normalize_path(prefix);
		while prefix.ends_with('/') {
			prefix.pop();
		}
		self.mounts.push(Mount { prefix, child });
	}

	/// Appends a hook run before route resolution on every dispatch.
	pub fn before_routing(&mut self, hook: impl BeforeHook + 'static) {
		self.assert_open();
		self.before_hooks.push(Arc::new(hook));
	}

	/// Appends a hook run after dispatch with the accumulated outcomes.
	pub fn after_routing(&mut self, hook: impl AfterHook + 'static) {
		self.assert_open();
		self.after_hooks.push(Arc::new(hook));
	}

	// ========================================================================
	// Introspection
	// ========================================================================

	/// The registered routes, in match-priority order.
	pub fn routes(&self) -> &[Route] {
		&self.routes
	}

	/// Number of registered routes.
	pub fn route_count(&self) -> usize {
		self.routes.len()
	}

	/// The registered mounts, in precedence order.
	pub fn mounts(&self) -> &[Mount] {
		&self.mounts
	}

	/// True once dispatch has started and the table is frozen.
	pub fn is_sealed(&self) -> bool {
		self.sealed.load(Ordering::Acquire)
	}

	// ========================================================================
	// Dispatch
	// ========================================================================

	/// Routes one request: the sole wire-facing operation.
	///
	/// Before-hooks run first, strictly in order. Mounts are checked before
	/// the router's own routes; the first matching mount wins and receives
	/// the request with its prefix stripped from the matching path. Own
	/// routes are scanned in registration order until one handles the
	/// request. If nothing handled it and no mount matched, a plain-text
	/// 404 is written to the sink. After-hooks then run with the
	/// accumulated per-route outcomes, which are also returned.
	///
	/// # Errors
	///
	/// A failure raised by a hook or handler propagates unchanged; the
	/// router never swallows it.
	pub async fn dispatch(
		&self,
		request: &Request,
		sink: SharedSink,
	) -> Result<Vec<RouteOutcome>> {
		self.dispatch_path(request, request.path(), &sink).await
	}

	/// Dispatch against an effective path. Mount delegation recurses here
	/// with the prefix-stripped path; the request itself is never rewritten,
	/// so hooks and sibling mounts always observe the original path.
	fn dispatch_path<'a>(
		&'a self,
		request: &'a Request,
		path: &'a str,
		sink: &'a SharedSink,
	) -> BoxFuture<'a, Result<Vec<RouteOutcome>>> {
		Box::pin(async move {
			self.sealed.store(true, Ordering::Release);

			for hook in &self.before_hooks {
				hook.call(request).await?;
			}

			let outcomes = if let Some(mount) = self.matching_mount(path) {
				let remainder = strip_prefix(path, &mount.prefix);
				debug!(prefix = %mount.prefix, remainder, "delegating to mounted router");
				// The child runs its full dispatch, including its own
				// hooks and 404 fallback; a matched mount counts as
				// handled at this level.
				mount.child.dispatch_path(request, remainder, sink).await?
			} else {
				let mut outcomes = Vec::new();
				let mut handled = false;
				for route in &self.routes {
					trace!(path, "offering request to route");
					let outcome = route.handle(request, path, sink).await?;
					handled = outcome.handled;
					outcomes.push(outcome);
					if handled {
						break;
					}
				}
				if !handled {
					debug!(path, "no route matched, writing 404");
					write_not_found(sink);
				}
				outcomes
			};

			for hook in &self.after_hooks {
				hook.call(request, &outcomes).await?;
			}

			Ok(outcomes)
		})
	}

	/// First registered mount whose prefix covers the path, if any.
	fn matching_mount(&self, path: &str) -> Option<&Mount> {
		self.mounts
			.iter()
			.find(|mount| prefix_matches(&mount.prefix, path))
	}

	fn add_pattern(
		&mut self,
		method: Option<Method>,
		pattern: &str,
		handler: Arc<dyn Handler>,
		options: RouteOptions,
	) -> Result<&MethodRoute> {
		self.assert_open();
		let compiled = PathPattern::compile(pattern)?;
		self.routes.push(Route::Method(MethodRoute::new(
			method,
			compiled,
			handler,
			options.binding,
		)));
		match self.routes.last() {
			Some(Route::Method(route)) => Ok(route),
			_ => unreachable!("a method route was just pushed"),
		}
	}

	fn assert_open(&self) {
		assert!(
			!self.is_sealed(),
			"cannot modify a router after dispatch has started"
		);
	}
}

/// Maps a method string from a route spec onto the supported set.
fn parse_method(method: &str) -> Result<Method> {
	match method.to_ascii_uppercase().as_str() {
		"GET" => Ok(Method::GET),
		"POST" => Ok(Method::POST),
		"PUT" => Ok(Method::PUT),
		"PATCH" => Ok(Method::PATCH),
		"DELETE" => Ok(Method::DELETE),
		// Report the caller's spelling, not the uppercased form.
		_ => Err(Error::UnsupportedMethod(method.to_string())),
	}
}

/// Prefix comparison for mounts: case-insensitive, with `"<prefix>/"`
/// compared against `"<path>/"` so `/api` covers `/api`, `/api/` and
/// `/api/x` but not `/apix`.
fn prefix_matches(prefix: &str, path: &str) -> bool {
	let path = path.strip_suffix('/').unwrap_or(path);
	// The prefix boundary may fall inside a multibyte character of the
	// path; such a path cannot match, it must not panic.
	let Some((head, tail)) = path.split_at_checked(prefix.len()) else {
		return false;
	};
	head.eq_ignore_ascii_case(prefix) && (tail.is_empty() || tail.starts_with('/'))
}

/// The path seen by a mounted child: the original path minus the prefix,
/// with a bare prefix hit mapping to `/`.
fn strip_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
	let rest = &path[prefix.len()..];
	if rest.is_empty() { "/" } else { rest }
}

fn write_not_found(sink: &SharedSink) {
	let mut headers = HeaderMap::new();
	headers.insert(
		header::CONTENT_TYPE,
		HeaderValue::from_static("text/plain; charset=utf-8"),
	);
	sink.begin(StatusCode::NOT_FOUND, headers);
	sink.write_body(Bytes::from_static(b"Not Found"));
	sink.end();
}
