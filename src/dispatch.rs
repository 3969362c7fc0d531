//! Request execution.
//!
//! ```text
//! Request
//!   └─ Router::resolve            → route + Context + middleware chain
//!        └─ middleware::run       → Halt: the halt response, done
//!             └─ Route::execute   → bind params, call handler
//!                  └─ Encoder     → Value replies rendered into the Context
//! ```

use http::StatusCode;
use tracing::debug;

use crate::config::Config;
use crate::context::Context;
use crate::encoder::Encoder;
use crate::error::Error;
use crate::middleware::{self, Decision};
use crate::request::Request;
use crate::response::{Reply, Response};
use crate::router::Router;

/// What [`Dispatcher::execute`] produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Responded(Response),
    NoRouteMatched,
}

impl Outcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Responded(_))
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Responded(response) => Some(response),
            Self::NoRouteMatched => None,
        }
    }

    /// The response, or an empty `404 Not Found`.
    pub fn or_not_found(self) -> Response {
        match self {
            Self::Responded(response) => response,
            Self::NoRouteMatched => Response::status(StatusCode::NOT_FOUND),
        }
    }
}

/// A router plus the settings used to render its replies.
///
/// Shared across threads as is; every call works on its own [`Context`].
#[derive(Debug)]
pub struct Dispatcher {
    router: Router,
    config: Config,
}

impl Dispatcher {
    pub fn new(router: Router) -> Self {
        Self { router, config: Config::default() }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the request and leaves the result on the returned [`Context`]
    /// instead of building a final response. `Ok(None)` when no route matched.
    pub fn handle(&self, request: &Request) -> Result<Option<Context>, Error> {
        let Some(resolved) = self.router.resolve(request.path(), request.method()) else {
            return Ok(None);
        };
        let route = resolved.route;
        let mut context = resolved.context;

        if let Decision::Halt(response) = middleware::run(&resolved.middleware, route, &context, request) {
            context.set_response(response);
            return Ok(Some(context));
        }

        let reply = route.execute(&mut context, request)?;
        let void = context.descriptor().is_some_and(|d| d.is_void());

        match reply {
            Reply::Void => {}
            _ if void => debug!(route = %route.pattern(), "void handler, reply discarded"),
            Reply::Response(response) => context.set_response(response),
            Reply::Value(value) => {
                let format = route.format().unwrap_or(self.config.default_format);
                let response = Encoder::from_config(format, &self.config.json).encode(&value, context.status())?;
                context.set_reply(value);
                context.set_response(response);
            }
        }
        Ok(Some(context))
    }

    /// Runs the request through to a final response.
    pub fn execute(&self, request: &Request) -> Result<Outcome, Error> {
        Ok(match self.handle(request)? {
            Some(context) => Outcome::Responded(context.into_response()),
            None => Outcome::NoRouteMatched,
        })
    }
}
