//! End-to-end dispatch tests: route resolution order, parameter binding,
//! mounts, hooks, redirects and the 404 fallback.

use std::sync::Arc;
use std::sync::Mutex;

use hyper::{Method, StatusCode};

use trellis_http::{Error, Request, Response, ResponseBuffer, ResponseSink, SharedSink};
use trellis_router::{
	AfterFn, BeforeFn, FunctionHandler, ParamBinding, PathArgs, RouteOptions, RouteOutcome,
	RouteSpec, Router,
};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
	Arc::new(Mutex::new(Vec::new()))
}

/// A handler that appends a tag to the log and writes the tag as the body.
fn tagged(log: &Log, tag: &'static str) -> FunctionHandler<impl Fn(Request, SharedSink, PathArgs) -> futures::future::BoxFuture<'static, trellis_http::Result<()>> + Send + Sync + use<>>
{
	let log = log.clone();
	FunctionHandler::new(move |_req: Request, sink: SharedSink, _args: PathArgs| -> futures::future::BoxFuture<'static, trellis_http::Result<()>> {
		let log = log.clone();
		Box::pin(async move {
			log.lock().unwrap().push(tag.to_string());
			sink.send(Response::ok().with_body(tag));
			Ok(())
		})
	})
}

/// A handler that echoes its bound arguments as the response body.
fn echo_args() -> FunctionHandler<impl Fn(Request, SharedSink, PathArgs) -> futures::future::BoxFuture<'static, trellis_http::Result<()>> + Send + Sync>
{
	FunctionHandler::new(|_req: Request, sink: SharedSink, args: PathArgs| -> futures::future::BoxFuture<'static, trellis_http::Result<()>> {
		Box::pin(async move {
			let body = match &args {
				PathArgs::Positional(values) => values.join(","),
				PathArgs::Named(map) => {
					let mut pairs: Vec<String> =
						map.iter().map(|(k, v)| format!("{k}={v}")).collect();
					pairs.sort();
					pairs.join(",")
				}
			};
			sink.send(Response::ok().with_body(body));
			Ok(())
		})
	})
}

fn buffer() -> (Arc<ResponseBuffer>, SharedSink) {
	let buffer = Arc::new(ResponseBuffer::new());
	let sink: SharedSink = buffer.clone();
	(buffer, sink)
}

// ============================================================================
// Resolution order
// ============================================================================

/// Test Intent: a route whose method does not match is skipped and the scan
/// continues to later routes.
#[tokio::test]
async fn test_method_mismatch_skips_route() {
	let log = new_log();
	let mut router = Router::new();
	router.post("/a", tagged(&log, "post")).unwrap();
	router.get("/a", tagged(&log, "get")).unwrap();

	let (buffer, sink) = buffer();
	router
		.dispatch(&Request::new(Method::GET, "/a"), sink)
		.await
		.unwrap();

	assert_eq!(*log.lock().unwrap(), vec!["get"]);
	assert_eq!(buffer.body_text(), "get");
}

/// Test Intent: when two routes match the same request, only the one
/// registered first runs.
#[tokio::test]
async fn test_first_registered_route_wins() {
	let log = new_log();
	let mut router = Router::new();
	router.get("/a", tagged(&log, "first")).unwrap();
	router.get("/a", tagged(&log, "second")).unwrap();

	let (buffer, sink) = buffer();
	let outcomes = router
		.dispatch(&Request::new(Method::GET, "/a"), sink)
		.await
		.unwrap();

	assert_eq!(*log.lock().unwrap(), vec!["first"]);
	assert_eq!(buffer.body_text(), "first");
	// The scan stops at the handling route, so only one outcome is recorded.
	assert_eq!(outcomes.len(), 1);
	assert!(outcomes[0].handled);
}

/// Test Intent: matching is insensitive to a trailing slash in either the
/// pattern or the request path.
#[tokio::test]
async fn test_trailing_slash_insensitive_dispatch() {
	let log = new_log();
	let mut router = Router::new();
	router.get("/a/b/c/", tagged(&log, "slashed")).unwrap();
	router.get("/x/y", tagged(&log, "bare")).unwrap();

	let (_, sink) = buffer();
	router
		.dispatch(&Request::new(Method::GET, "/a/b/c"), sink)
		.await
		.unwrap();
	let (_, sink) = buffer();
	router
		.dispatch(&Request::new(Method::GET, "/x/y/"), sink)
		.await
		.unwrap();

	assert_eq!(*log.lock().unwrap(), vec!["slashed", "bare"]);
}

// ============================================================================
// Parameter binding
// ============================================================================

/// Test Intent: positional binding hands the handler decoded capture values
/// in declaration order.
#[tokio::test]
async fn test_positional_binding() {
	let mut router = Router::new();
	router.get("/a/:id/:subid", echo_args()).unwrap();

	let (buffer, sink) = buffer();
	let outcomes = router
		.dispatch(&Request::new(Method::GET, "/a/100/300"), sink)
		.await
		.unwrap();

	assert_eq!(buffer.body_text(), "100,300");
	assert_eq!(outcomes[0].param_names, vec!["id", "subid"]);
	assert_eq!(outcomes[0].args, vec!["100", "300"]);
}

/// Test Intent: named binding hands the handler a single map keyed by the
/// declared parameter names.
#[tokio::test]
async fn test_named_binding() {
	let mut router = Router::new();
	router
		.get_with(
			"/a/:id/:subid",
			echo_args(),
			RouteOptions {
				binding: ParamBinding::Named,
			},
		)
		.unwrap();

	let (buffer, sink) = buffer();
	router
		.dispatch(&Request::new(Method::GET, "/a/100/300"), sink)
		.await
		.unwrap();

	assert_eq!(buffer.body_text(), "id=100,subid=300");
}

/// Test Intent: percent-encoded capture values reach the handler decoded.
#[tokio::test]
async fn test_captures_are_percent_decoded() {
	let mut router = Router::new();
	router.get("/search/:term", echo_args()).unwrap();

	let (buffer, sink) = buffer();
	router
		.dispatch(&Request::new(Method::GET, "/search/hello%20world"), sink)
		.await
		.unwrap();

	assert_eq!(buffer.body_text(), "hello world");
}

// ============================================================================
// Mounts
// ============================================================================

/// Test Intent: a mount whose prefix covers the path takes precedence over
/// the parent's own routes, even when a parent route matches the same path.
#[tokio::test]
async fn test_mount_beats_own_route() {
	let log = new_log();
	let mut child = Router::new();
	child.get("/users", tagged(&log, "child")).unwrap();

	let mut parent = Router::new();
	parent.get("/api/users", tagged(&log, "parent")).unwrap();
	parent.mount("/api", child);

	let (buffer, sink) = buffer();
	parent
		.dispatch(&Request::new(Method::GET, "/api/users"), sink)
		.await
		.unwrap();

	assert_eq!(*log.lock().unwrap(), vec!["child"]);
	assert_eq!(buffer.body_text(), "child");
}

/// Test Intent: nested mounts strip one prefix per level; a grandchild's
/// routes match against the doubly-stripped path.
#[tokio::test]
async fn test_nested_mounts_strip_each_prefix() {
	let log = new_log();
	let mut grandchild = Router::new();
	grandchild.get("/leaf", tagged(&log, "leaf")).unwrap();

	let mut child = Router::new();
	child.mount("/v1", grandchild);

	let mut parent = Router::new();
	parent.mount("/api", child);

	let (buffer, sink) = buffer();
	parent
		.dispatch(&Request::new(Method::GET, "/api/v1/leaf"), sink)
		.await
		.unwrap();

	assert_eq!(*log.lock().unwrap(), vec!["leaf"]);
	assert_eq!(buffer.body_text(), "leaf");
}

/// Test Intent: a request for exactly the mount prefix reaches the child as
/// the root path.
#[tokio::test]
async fn test_bare_prefix_dispatches_child_root() {
	let log = new_log();
	let mut child = Router::new();
	child.get("/", tagged(&log, "root")).unwrap();

	let mut parent = Router::new();
	parent.mount("/api", child);

	let (_, sink) = buffer();
	parent
		.dispatch(&Request::new(Method::GET, "/api"), sink)
		.await
		.unwrap();

	assert_eq!(*log.lock().unwrap(), vec!["root"]);
}

/// Test Intent: mount delegation is exclusive; when the child has no match,
/// the child's 404 fires and the parent's routes are never consulted.
#[tokio::test]
async fn test_mount_delegation_is_exclusive() {
	let log = new_log();
	let child = Router::new();

	let mut parent = Router::new();
	parent.get("/api/orphan", tagged(&log, "parent")).unwrap();
	parent.mount("/api", child);

	let (buffer, sink) = buffer();
	parent
		.dispatch(&Request::new(Method::GET, "/api/orphan"), sink)
		.await
		.unwrap();

	assert!(log.lock().unwrap().is_empty());
	assert_eq!(buffer.status(), Some(StatusCode::NOT_FOUND));
}

/// Test Intent: a prefix that only matches part of a segment does not cover
/// the path.
#[tokio::test]
async fn test_partial_segment_is_not_a_prefix_match() {
	let log = new_log();
	let mut child = Router::new();
	child.any("/:rest?", tagged(&log, "child")).unwrap();

	let mut parent = Router::new();
	parent.get("/apix", tagged(&log, "parent")).unwrap();
	parent.mount("/api", child);

	let (_, sink) = buffer();
	parent
		.dispatch(&Request::new(Method::GET, "/apix"), sink)
		.await
		.unwrap();

	assert_eq!(*log.lock().unwrap(), vec!["parent"]);
}

/// Test Intent: a request path with a multibyte character at the prefix
/// boundary is routed normally instead of panicking in mount resolution.
#[tokio::test]
async fn test_multibyte_path_with_mount() {
	let log = new_log();
	let mut child = Router::new();
	child.get("/users", tagged(&log, "child")).unwrap();

	let mut parent = Router::new();
	parent.get("/:name", echo_args()).unwrap();
	parent.mount("/ab", child);

	// "/aé5" splits inside 'é' at the prefix length of "/ab".
	let (buffer, sink) = buffer();
	parent
		.dispatch(&Request::new(Method::GET, "/aé5"), sink)
		.await
		.unwrap();

	assert_eq!(buffer.body_text(), "aé5");
	assert!(log.lock().unwrap().is_empty());
}

// ============================================================================
// Fallback and errors
// ============================================================================

/// Test Intent: an unmatched request yields a plain-text 404 and invokes no
/// handler.
#[tokio::test]
async fn test_unmatched_request_writes_404() {
	let log = new_log();
	let mut router = Router::new();
	router.get("/a", tagged(&log, "a")).unwrap();

	let (buffer, sink) = buffer();
	let outcomes = router
		.dispatch(&Request::new(Method::GET, "/missing"), sink)
		.await
		.unwrap();

	assert!(log.lock().unwrap().is_empty());
	assert_eq!(buffer.status(), Some(StatusCode::NOT_FOUND));
	assert_eq!(
		buffer.header("content-type").as_deref(),
		Some("text/plain; charset=utf-8")
	);
	assert_eq!(buffer.body_text(), "Not Found");
	assert!(outcomes.iter().all(|o| !o.handled));
}

/// Test Intent: a handler error propagates out of dispatch unchanged; the
/// router never converts it into a response.
#[tokio::test]
async fn test_handler_error_propagates() {
	let mut router = Router::new();
	router
		.get(
			"/boom",
			FunctionHandler::new(|_req: Request, _sink: SharedSink, _args: PathArgs| async move {
				Err::<(), Error>(Error::handler(std::io::Error::other("backend down")))
			}),
		)
		.unwrap();

	let (buffer, sink) = buffer();
	let err = router
		.dispatch(&Request::new(Method::GET, "/boom"), sink)
		.await
		.unwrap_err();

	assert!(err.to_string().contains("backend down"));
	assert!(!buffer.ended());
}

// ============================================================================
// Redirects and predicates
// ============================================================================

/// Test Intent: a matching redirect writes the status and Location header
/// and ends the response without a body.
#[tokio::test]
async fn test_redirect_writes_location() {
	let mut router = Router::new();
	router.redirect("/old", "/new").unwrap();

	let (buffer, sink) = buffer();
	router
		.dispatch(&Request::new(Method::GET, "/old"), sink)
		.await
		.unwrap();

	assert_eq!(buffer.status(), Some(StatusCode::MOVED_PERMANENTLY));
	assert_eq!(buffer.header("location").as_deref(), Some("/new"));
	assert!(buffer.ended());
	assert!(buffer.body().is_empty());
}

/// Test Intent: a redirect whose pattern does not match lets the scan
/// continue to later routes.
#[tokio::test]
async fn test_non_matching_redirect_continues_scan() {
	let log = new_log();
	let mut router = Router::new();
	router.redirect("/old", "/new").unwrap();
	router.get("/a", tagged(&log, "a")).unwrap();

	let (buffer, sink) = buffer();
	router
		.dispatch(&Request::new(Method::GET, "/a"), sink)
		.await
		.unwrap();

	assert_eq!(*log.lock().unwrap(), vec!["a"]);
	assert_eq!(buffer.status(), Some(StatusCode::OK));
}

/// Test Intent: an explicit redirect status is honored.
#[tokio::test]
async fn test_redirect_with_explicit_status() {
	let mut router = Router::new();
	router
		.redirect_with_status("/old", "/new", StatusCode::TEMPORARY_REDIRECT)
		.unwrap();

	let (buffer, sink) = buffer();
	router
		.dispatch(&Request::new(Method::GET, "/old"), sink)
		.await
		.unwrap();

	assert_eq!(buffer.status(), Some(StatusCode::TEMPORARY_REDIRECT));
}

/// Test Intent: a predicate route runs its handler whenever the predicate
/// holds, regardless of the path, and hands it no path arguments.
#[tokio::test]
async fn test_predicate_route_matches_on_condition() {
	let mut router = Router::new();
	router.when(
		|req| req.headers.contains_key("x-debug"),
		FunctionHandler::new(|_req: Request, sink: SharedSink, args: PathArgs| async move {
			assert_eq!(args, PathArgs::none());
			sink.send(Response::ok().with_body("debug"));
			Ok(())
		}),
	);

	let request = Request::builder()
		.method(Method::GET)
		.path("/anything/at/all")
		.header(
			hyper::header::HeaderName::from_static("x-debug"),
			hyper::header::HeaderValue::from_static("1"),
		)
		.build();
	let (buffer, sink) = buffer();
	router.dispatch(&request, sink).await.unwrap();
	assert_eq!(buffer.body_text(), "debug");

	// Without the header the predicate is false and nothing matches.
	let (buffer, sink) = self::buffer();
	router
		.dispatch(&Request::new(Method::GET, "/anything/at/all"), sink)
		.await
		.unwrap();
	assert_eq!(buffer.status(), Some(StatusCode::NOT_FOUND));
}

// ============================================================================
// Declarative registration
// ============================================================================

/// Test Intent: `add` registers specs in order and an unsupported method
/// string fails the whole call without registering later specs.
#[tokio::test]
async fn test_add_is_fail_fast() {
	let log = new_log();
	let mut router = Router::new();
	let err = router
		.add(vec![
			RouteSpec::Pattern {
				method: "GET".to_string(),
				url: "/a".to_string(),
				handler: Arc::new(tagged(&log, "a")),
				options: RouteOptions::default(),
			},
			RouteSpec::Pattern {
				method: "OPTIONS".to_string(),
				url: "/b".to_string(),
				handler: Arc::new(tagged(&log, "b")),
				options: RouteOptions::default(),
			},
			RouteSpec::Pattern {
				method: "GET".to_string(),
				url: "/c".to_string(),
				handler: Arc::new(tagged(&log, "c")),
				options: RouteOptions::default(),
			},
		])
		.unwrap_err();

	assert!(matches!(err, Error::UnsupportedMethod(m) if m == "OPTIONS"));
	// Only the spec before the offending one was registered.
	assert_eq!(router.route_count(), 1);
}

// ============================================================================
// Hooks
// ============================================================================

/// Test Intent: before-hooks run in registration order before any route is
/// consulted; after-hooks run last and observe the outcome sequence.
#[tokio::test]
async fn test_hook_ordering_and_outcomes() {
	let log = new_log();
	let mut router = Router::new();

	let before_log = log.clone();
	router.before_routing(BeforeFn::new(move |_req: Request| {
		let log = before_log.clone();
		async move {
			log.lock().unwrap().push("before1".to_string());
			Ok(())
		}
	}));
	let before_log = log.clone();
	router.before_routing(BeforeFn::new(move |_req: Request| {
		let log = before_log.clone();
		async move {
			log.lock().unwrap().push("before2".to_string());
			Ok(())
		}
	}));

	router.post("/a", tagged(&log, "post")).unwrap();
	router.get("/a", tagged(&log, "handler")).unwrap();

	let after_log = log.clone();
	router.after_routing(AfterFn::new(
		move |_req: Request, outcomes: Vec<RouteOutcome>| {
			let log = after_log.clone();
			async move {
				// The method-mismatched route left an unmatched outcome
				// before the handling one.
				assert_eq!(outcomes.len(), 2);
				assert!(!outcomes[0].handled);
				assert!(outcomes[1].handled);
				log.lock().unwrap().push("after".to_string());
				Ok(())
			}
		},
	));

	let (_, sink) = buffer();
	router
		.dispatch(&Request::new(Method::GET, "/a"), sink)
		.await
		.unwrap();

	assert_eq!(
		*log.lock().unwrap(),
		vec!["before1", "before2", "handler", "after"]
	);
}

/// Test Intent: a before-hook failure aborts dispatch before any route runs.
#[tokio::test]
async fn test_before_hook_error_short_circuits() {
	let log = new_log();
	let mut router = Router::new();
	router.before_routing(BeforeFn::new(|_req: Request| async move {
		Err::<(), Error>(Error::handler(std::io::Error::other("rejected")))
	}));
	router.get("/a", tagged(&log, "a")).unwrap();

	let (buffer, sink) = buffer();
	let err = router
		.dispatch(&Request::new(Method::GET, "/a"), sink)
		.await
		.unwrap_err();

	assert!(err.to_string().contains("rejected"));
	assert!(log.lock().unwrap().is_empty());
	assert!(!buffer.has_begun());
}

/// Test Intent: hooks observe the original request path even when dispatch
/// was delegated through a mount.
#[tokio::test]
async fn test_hooks_see_original_path_under_mount() {
	let log = new_log();
	let mut child = Router::new();
	let hook_log = log.clone();
	child.before_routing(BeforeFn::new(move |req: Request| {
		let log = hook_log.clone();
		async move {
			log.lock().unwrap().push(req.path().to_string());
			Ok(())
		}
	}));
	child.get("/users", tagged(&log, "users")).unwrap();

	let mut parent = Router::new();
	parent.mount("/api", child);

	let (_, sink) = buffer();
	parent
		.dispatch(&Request::new(Method::GET, "/api/users"), sink)
		.await
		.unwrap();

	assert_eq!(*log.lock().unwrap(), vec!["/api/users", "users"]);
}
