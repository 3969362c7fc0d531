//! # waymark
//!
//! An embeddable request-dispatch engine. You hand it a parsed request; it
//! finds the handler through a tree of routers, runs the middleware in front
//! of it, binds path parameters into arguments, and renders what the handler
//! returns. Sockets, TLS and keep-alive belong to whatever server embeds it.
//!
//! ## Pieces
//!
//! - [`Router`]: ordered routes, mounted sub-routers, first match wins
//! - [`PathPattern`]: `/users/{id}`, `/files/*`, `/{page?}`
//! - [`middleware`]: `Continue` or `Halt(response)`, outermost first
//! - [`Handler`]: a function plus the parameters it declares
//! - [`Encoder`]: JSON envelope, HTML, script or debug text
//!
//! ## Quick start
//!
//! ```rust
//! use http::StatusCode;
//! use serde_json::{json, Value};
//! use waymark::{handler_fn, Dispatcher, Invocation, ParamSpec, ParamType, Request, Router};
//!
//! fn show_user(inv: &mut Invocation<'_>) -> Value {
//!     json!({ "id": inv.args().i64("id") })
//! }
//!
//! let users = Router::new()
//!     .get("/{id}", handler_fn(show_user).param(ParamSpec::required("id", ParamType::Int)));
//! let app = Dispatcher::new(Router::new().nest("/users", users));
//!
//! let response = app.execute(&Request::get("/users/42")).unwrap().or_not_found();
//! assert_eq!(response.status_code(), StatusCode::OK);
//! assert_eq!(
//!     response.body().as_ref(),
//!     br#"{"header":{"response_code":200},"data":{"id":42},"success":true}"#,
//! );
//! ```

mod config;
mod context;
mod dispatch;
mod encoder;
mod error;
mod handler;
mod method;
mod pattern;
mod request;
mod response;
mod route;
mod router;

pub mod middleware;

pub use config::{Config, JsonConfig};
pub use context::{Context, Options, Params};
pub use dispatch::{Dispatcher, Outcome};
pub use encoder::{Encoder, Format};
pub use error::Error;
pub use handler::{
    Args, FieldRule, FnHandler, Handler, HandlerDescriptor, Invocation, ParamSpec, ParamType,
    ValidationDescriptor, handler_fn,
};
pub use method::MethodSet;
pub use pattern::{Match, PathPattern, PatternError, Segment};
pub use request::Request;
pub use response::{IntoReply, Reply, Response, ResponseBuilder};
pub use route::{Callback, Route, RouteKind};
pub use router::{Resolved, Router};
