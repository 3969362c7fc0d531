//! Bearer-token scope check.
//!
//! Routes opt in through the `required_scope` option, either a single scope
//! or a list of scopes that must all be granted. Options set on a mount apply
//! to every route below it. Looking the token up is left to a
//! [`ScopeResolver`], typically backed by the OAuth2 token store.

use http::StatusCode;
use http::header::WWW_AUTHENTICATE;
use serde_json::{Value, json};

use super::{Decision, Middleware};
use crate::context::Context;
use crate::request::Request;
use crate::response::Response;
use crate::route::Route;

/// Option key read by [`RequireScope`].
pub const REQUIRED_SCOPE: &str = "required_scope";

/// Maps a bearer token to the scopes it grants, or `None` if the token is
/// unknown or expired.
pub trait ScopeResolver: Send + Sync + 'static {
    fn scopes(&self, token: &str) -> Option<Vec<String>>;
}

impl<F> ScopeResolver for F
where
    F: Fn(&str) -> Option<Vec<String>> + Send + Sync + 'static,
{
    fn scopes(&self, token: &str) -> Option<Vec<String>> {
        self(token)
    }
}

/// Halts with `401` when the token is missing or unknown and with `403` when
/// it lacks a required scope. Routes without the option pass through.
pub struct RequireScope<R> {
    resolver: R,
}

impl<R: ScopeResolver> RequireScope<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

impl<R: ScopeResolver> Middleware for RequireScope<R> {
    fn name(&self) -> &str {
        "require_scope"
    }

    fn apply(&self, _route: &Route, context: &Context, request: &Request) -> Decision {
        let required = match context.option(REQUIRED_SCOPE) {
            Some(Value::String(scope)) => vec![scope.as_str()],
            Some(Value::Array(scopes)) => scopes.iter().filter_map(Value::as_str).collect(),
            _ => return Decision::Continue,
        };

        let Some(token) = request.bearer_token() else {
            return Decision::Halt(refuse(StatusCode::UNAUTHORIZED, "unauthorized", "Bearer"));
        };
        let Some(granted) = self.resolver.scopes(token) else {
            return Decision::Halt(refuse(
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                r#"Bearer error="invalid_token""#,
            ));
        };

        if required.iter().all(|scope| granted.iter().any(|g| g == scope)) {
            Decision::Continue
        } else {
            Decision::Halt(refuse(
                StatusCode::FORBIDDEN,
                "insufficient_scope",
                r#"Bearer error="insufficient_scope""#,
            ))
        }
    }
}

fn refuse(status: StatusCode, error: &str, challenge: &str) -> Response {
    Response::builder()
        .status(status)
        .header(WWW_AUTHENTICATE.as_str(), challenge)
        .json(json!({ "error": error }).to_string())
}
