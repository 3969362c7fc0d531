//! Per-route tracing.

use tracing::info;

use super::{Decision, Middleware};
use crate::context::Context;
use crate::request::Request;
use crate::route::Route;

/// Emits one `info` event per dispatched route. Never halts.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn name(&self) -> &str {
        "trace"
    }

    fn apply(&self, route: &Route, context: &Context, request: &Request) -> Decision {
        info!(
            method = request.method(),
            path = request.path(),
            route = %route.pattern(),
            depth = context.depth(),
            "dispatching"
        );
        Decision::Continue
    }
}
