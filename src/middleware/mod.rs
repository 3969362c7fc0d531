//! Middleware layer.
//!
//! Middleware runs after a route has been resolved and before its handler.
//! It is the right place for cross-cutting concerns: authentication, scope
//! checks, request tracing. Each middleware looks at the matched route, the
//! context and the request, then either lets the request through
//! ([`Decision::Continue`]) or answers it ([`Decision::Halt`]). A halt skips
//! every later middleware and the handler.
//!
//! # Order
//!
//! Outermost first. For a route reached through mounts:
//!
//! ```text
//! root router .with(…)        ← runs first
//! mount route .with(…)
//! nested router .with(…)
//! leaf route .with(…)         ← runs last
//! ```
//!
//! A middleware declared further in with the same [`Middleware::name`] as an
//! outer one replaces it. Same-named middleware on a single router or route
//! all run.
//!
//! # Built-in middleware
//! - [`RequireScope`]: bearer-token scope check driven by the `required_scope` option
//! - [`Trace`]: one `tracing` event per dispatched route

mod scope;
mod trace;

use std::sync::Arc;

use tracing::debug;

use crate::context::Context;
use crate::request::Request;
use crate::response::Response;
use crate::route::Route;

pub use scope::{REQUIRED_SCOPE, RequireScope, ScopeResolver};
pub use trace::Trace;

/// The outcome of one middleware.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    Continue,
    Halt(Response),
}

/// A hook run between resolution and the handler.
pub trait Middleware: Send + Sync + 'static {
    /// Used in logs and to let an inner declaration override an outer one.
    fn name(&self) -> &str;

    fn apply(&self, route: &Route, context: &Context, request: &Request) -> Decision;
}

/// A middleware shared by every route it applies to.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A middleware built from a closure.
///
/// ```rust
/// use http::StatusCode;
/// use waymark::middleware::{Decision, fn_middleware};
/// use waymark::Response;
///
/// let maintenance = fn_middleware("maintenance", |_route, _ctx, _req| {
///     Decision::Halt(Response::status(StatusCode::SERVICE_UNAVAILABLE))
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

pub fn fn_middleware<F>(name: &'static str, func: F) -> FnMiddleware<F>
where
    F: Fn(&Route, &Context, &Request) -> Decision + Send + Sync + 'static,
{
    FnMiddleware { name, func }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&Route, &Context, &Request) -> Decision + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn apply(&self, route: &Route, context: &Context, request: &Request) -> Decision {
        (self.func)(route, context, request)
    }
}

/// Runs `chain` in order. The first halt ends the run.
pub fn run(chain: &[BoxedMiddleware], route: &Route, context: &Context, request: &Request) -> Decision {
    for middleware in chain {
        if let Decision::Halt(response) = middleware.apply(route, context, request) {
            debug!(
                middleware = middleware.name(),
                status = %response.status_code(),
                "middleware halted the request"
            );
            return Decision::Halt(response);
        }
    }
    Decision::Continue
}

/// Appends one level's middleware. Inherited entries sharing a name with
/// anything in `level` are dropped first; entries within `level` all stay.
pub(crate) fn extend_level(chain: &mut Vec<BoxedMiddleware>, level: &[BoxedMiddleware]) {
    chain.retain(|outer| level.iter().all(|m| m.name() != outer.name()));
    chain.extend(level.iter().cloned());
}
