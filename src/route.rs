//! A single routing rule.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::debug;

use crate::context::{Context, Options};
use crate::encoder::Format;
use crate::error::Error;
use crate::handler::{BoxedHandler, HandlerDescriptor, Invocation};
use crate::method::MethodSet;
use crate::middleware::BoxedMiddleware;
use crate::pattern::PathPattern;
use crate::request::Request;
use crate::response::Reply;
use crate::router::Router;

/// What a route leads to.
pub enum RouteKind {
    /// A handler, reached on an exact match.
    Callback(Callback),
    /// A nested router, reached on a prefix match.
    Mount(Router),
}

/// A handler plus its lazily built descriptor.
pub struct Callback {
    handler: BoxedHandler,
    descriptor: OnceLock<Arc<HandlerDescriptor>>,
}

impl Callback {
    pub(crate) fn new(handler: BoxedHandler) -> Self {
        Self { handler, descriptor: OnceLock::new() }
    }

    /// Built on first call, then shared by every request.
    pub fn descriptor(&self) -> &Arc<HandlerDescriptor> {
        self.descriptor.get_or_init(|| Arc::new(self.handler.describe()))
    }
}

/// Methods, a pattern, options, middleware and a target.
///
/// Routes are created through [`Router::register`] and [`Router::mount`].
/// The returned `&mut Route` is the only chance to attach middleware or an
/// encoder override; once the router is handed to a
/// [`Dispatcher`](crate::Dispatcher) it is read-only.
pub struct Route {
    methods: MethodSet,
    pattern: PathPattern,
    options: Options,
    middleware: Vec<BoxedMiddleware>,
    format: Option<Format>,
    kind: RouteKind,
}

impl Route {
    pub(crate) fn new(methods: MethodSet, pattern: PathPattern, options: Options, kind: RouteKind) -> Self {
        Self { methods, pattern, options, middleware: Vec::new(), format: None, kind }
    }

    pub fn methods(&self) -> &MethodSet { &self.methods }
    pub fn pattern(&self) -> &PathPattern { &self.pattern }
    pub fn options(&self) -> &Options { &self.options }
    pub fn middleware(&self) -> &[BoxedMiddleware] { &self.middleware }
    pub fn kind(&self) -> &RouteKind { &self.kind }

    /// This route's own option, ignoring what enclosing mounts declare.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// The encoder override, if any. Falls back to the configured default.
    pub fn format(&self) -> Option<Format> {
        self.format
    }

    pub fn is_mount(&self) -> bool {
        matches!(self.kind, RouteKind::Mount(_))
    }

    /// Attaches middleware that runs after every enclosing router's.
    pub fn with(&mut self, middleware: impl crate::middleware::Middleware) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Renders this route's replies with `format` instead of the default.
    pub fn render_as(&mut self, format: Format) -> &mut Self {
        self.format = Some(format);
        self
    }

    /// Binds the context's params and calls the handler.
    ///
    /// Mount routes are never executed; they only delegate during resolution.
    pub fn execute(&self, context: &mut Context, request: &Request) -> Result<Reply, Error> {
        let RouteKind::Callback(callback) = &self.kind else {
            return Err(Error::illegal_state(format!(
                "route `{}` is a mount and cannot be executed",
                self.pattern
            )));
        };

        let descriptor = Arc::clone(callback.descriptor());
        let args = descriptor.bind(context.params())?;
        debug!(route = %self.pattern, args = args.len(), "invoking handler");

        context.set_descriptor(descriptor);
        let mut invocation = Invocation::new(args, request, context);
        Ok(callback.handler.call(&mut invocation))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Route");
        s.field("methods", &format_args!("{}", self.methods))
            .field("pattern", &self.pattern.template())
            .field("options", &self.options)
            .field("middleware", &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("format", &self.format);
        match &self.kind {
            RouteKind::Callback(_) => s.field("kind", &"callback"),
            RouteKind::Mount(router) => s.field("kind", router),
        };
        s.finish()
    }
}
