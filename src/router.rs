//! Ordered, composable request router.
//!
//! A router is a list of routes tried in declaration order. A route either
//! leads to a handler (matched against the whole remaining path) or mounts
//! another router (matched against a prefix, the rest handed down). The first
//! route that matches wins; there is no specificity ranking, so register the
//! narrow routes before the broad ones.
//!
//! ```text
//! GET /api/v1/users/7
//!   root     "/api/v1"    mount   consumed "/api/v1"   → "/users/7"
//!   nested   "/users/{id}" route  consumed "/users/7"  params {id: "7"}
//! ```
//!
//! If a mounted router has nothing for the remainder, the scan resumes with
//! the next route of the outer router.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, debug_span, trace};

use crate::context::{Context, Options, Params};
use crate::error::Error;
use crate::handler::Handler;
use crate::method::MethodSet;
use crate::middleware::{self, BoxedMiddleware, Middleware};
use crate::pattern::{Match, PathPattern};
use crate::route::{Callback, Route, RouteKind};

/// The application router.
///
/// Build it once at startup and hand it to a [`Dispatcher`](crate::Dispatcher).
/// The chaining methods ([`Router::get`], [`Router::nest`], …) panic on a
/// malformed template, which is a startup bug. [`Router::register`] and
/// [`Router::mount`] return the error instead.
///
/// ```rust
/// use serde_json::json;
/// use waymark::{handler_fn, Invocation, Router};
///
/// let users = Router::new()
///     .get("/", handler_fn(|_: &mut Invocation<'_>| json!([])))
///     .get("/{id}", handler_fn(|inv: &mut Invocation<'_>| json!({ "id": inv.context().param("id") })));
///
/// let app = Router::new().nest("/users", users);
/// assert!(app.resolve("/users/7", "GET").is_some());
/// ```
pub struct Router {
    prefix: Option<String>,
    routes: Vec<Route>,
    middleware: Vec<BoxedMiddleware>,
}

/// A successful resolution.
pub struct Resolved<'r> {
    pub route: &'r Route,
    pub context: Context,
    /// The middleware to run, outermost first, overrides applied.
    pub middleware: Vec<BoxedMiddleware>,
}

/// What an outer level hands down to a mounted router.
#[derive(Default)]
struct Scope {
    consumed: String,
    params: Params,
    options: Options,
    middleware: Vec<BoxedMiddleware>,
    parent: Option<Context>,
}

impl Router {
    pub fn new() -> Self {
        Self { prefix: None, routes: Vec::new(), middleware: Vec::new() }
    }

    /// Adds a handler route.
    pub fn register(
        &mut self,
        methods: impl Into<MethodSet>,
        pattern: &str,
        handler: impl Handler,
        options: Options,
    ) -> Result<&mut Route, Error> {
        let pattern = PathPattern::compile(pattern)?;
        let kind = RouteKind::Callback(Callback::new(Arc::new(handler)));
        Ok(self.push(Route::new(methods.into(), pattern, options, kind)))
    }

    /// Mounts `router` under `prefix`. It sees every method and only the part
    /// of the path after the prefix.
    pub fn mount(&mut self, prefix: &str, mut router: Router, options: Options) -> Result<&mut Route, Error> {
        let pattern = PathPattern::compile(prefix)?;
        router.prefix = Some(pattern.template().to_owned());
        Ok(self.push(Route::new(MethodSet::any(), pattern, options, RouteKind::Mount(router))))
    }

    /// Adds middleware for every route of this router, mounted ones included.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    fn push(&mut self, route: Route) -> &mut Route {
        let index = self.routes.len();
        self.routes.push(route);
        &mut self.routes[index]
    }

    // ── chaining sugar ────────────────────────────────────────────────────────

    /// Registers `handler` for `methods` and returns `self`.
    ///
    /// # Panics
    /// If `pattern` is not a valid template.
    pub fn on(mut self, methods: impl Into<MethodSet>, pattern: &str, handler: impl Handler) -> Self {
        if let Err(e) = self.register(methods, pattern, handler, Options::new()) {
            panic!("{e}");
        }
        self
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.on("GET", pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.on("POST", pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.on("PUT", pattern, handler)
    }

    pub fn patch(self, pattern: &str, handler: impl Handler) -> Self {
        self.on("PATCH", pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.on("DELETE", pattern, handler)
    }

    pub fn any(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(MethodSet::any(), pattern, handler)
    }

    /// Mounts `router` under `prefix` and returns `self`.
    ///
    /// # Panics
    /// If `prefix` is not a valid template.
    pub fn nest(mut self, prefix: &str, router: Router) -> Self {
        if let Err(e) = self.mount(prefix, router, Options::new()) {
            panic!("{e}");
        }
        self
    }

    /// Chaining form of [`Router::use_middleware`].
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.use_middleware(middleware);
        self
    }

    // ── accessors ─────────────────────────────────────────────────────────────

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn middleware(&self) -> &[BoxedMiddleware] {
        &self.middleware
    }

    /// The template this router was mounted under, if it was mounted.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    // ── resolution ────────────────────────────────────────────────────────────

    /// Finds the route for `path` and `method`.
    ///
    /// A query string is ignored and a missing leading `/` is implied.
    pub fn resolve(&self, path: &str, method: &str) -> Option<Resolved<'_>> {
        let path = path.split_once('?').map_or(path, |(path, _)| path);
        let path = if path.starts_with('/') {
            Cow::Borrowed(path)
        } else {
            Cow::Owned(format!("/{path}"))
        };

        let span = debug_span!("resolve", method, path = %path);
        let _enter = span.enter();

        let resolved = self.resolve_in(&path, method, &Scope::default());
        match &resolved {
            Some(r) => debug!(route = %r.route.pattern(), depth = r.context.depth(), "route resolved"),
            None => debug!("no route matched"),
        }
        resolved
    }

    fn resolve_in(&self, path: &str, method: &str, scope: &Scope) -> Option<Resolved<'_>> {
        let mut chain = scope.middleware.clone();
        middleware::extend_level(&mut chain, &self.middleware);

        for route in &self.routes {
            if !route.methods().contains(method) {
                trace!(route = %route.pattern(), "method not allowed");
                continue;
            }

            match route.kind() {
                RouteKind::Callback(_) => {
                    let Some(m) = route.pattern().match_exact(path) else {
                        trace!(route = %route.pattern(), "no match");
                        continue;
                    };
                    return Some(finish(route, m, scope, chain));
                }
                RouteKind::Mount(router) => {
                    let Some(m) = route.pattern().match_prefix(path) else {
                        trace!(mount = %route.pattern(), "no match");
                        continue;
                    };
                    let relative = remainder(path, m.consumed);
                    let inner = descend(route, m, scope, &chain);
                    if let Some(found) = router.resolve_in(&relative, method, &inner) {
                        return Some(found);
                    }
                    trace!(mount = %route.pattern(), "nothing under mount, backtracking");
                }
            }
        }
        None
    }
}

/// The path a mounted router sees: what follows the matched prefix, always
/// starting with `/`.
fn remainder<'p>(path: &'p str, consumed: &str) -> Cow<'p, str> {
    match &path[consumed.len()..] {
        "" => Cow::Borrowed("/"),
        rest if rest.starts_with('/') => Cow::Borrowed(rest),
        rest => Cow::Owned(format!("/{rest}")),
    }
}

fn merged(scope: &Scope, route: &Route, m: Match<'_>) -> (String, Params, Options) {
    let consumed = format!("{}{}", scope.consumed, m.consumed);
    let mut params = scope.params.clone();
    params.extend(m.params);
    let mut options = scope.options.clone();
    options.extend(route.options().iter().map(|(k, v)| (k.clone(), v.clone())));
    (consumed, params, options)
}

fn descend(route: &Route, m: Match<'_>, scope: &Scope, chain: &[BoxedMiddleware]) -> Scope {
    let (consumed, params, options) = merged(scope, route, m);
    let mut chain = chain.to_vec();
    middleware::extend_level(&mut chain, route.middleware());
    let parent = Context::new(consumed.clone(), params.clone(), options.clone(), scope.parent.clone());
    Scope { consumed, params, options, middleware: chain, parent: Some(parent) }
}

fn finish<'r>(route: &'r Route, m: Match<'_>, scope: &Scope, mut chain: Vec<BoxedMiddleware>) -> Resolved<'r> {
    middleware::extend_level(&mut chain, route.middleware());
    let (consumed, params, options) = merged(scope, route, m);
    let context = Context::new(consumed, params, options, scope.parent.clone());
    Resolved { route, context, middleware: chain }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("prefix", &self.prefix)
            .field("routes", &self.routes)
            .field("middleware", &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>())
            .finish()
    }
}
