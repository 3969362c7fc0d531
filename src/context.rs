//! Per-request state.
//!
//! A [`Context`] is built once a route has been resolved. It records how much
//! of the path each router level consumed, the parameters bound along the
//! way, and, as the request proceeds, the response. When the route was found
//! through one or more mounts, each mount level leaves a parent context
//! behind, reachable through [`Context::parent`].

use std::sync::Arc;

use http::StatusCode;
use indexmap::IndexMap;
use serde_json::Value;

use crate::handler::HandlerDescriptor;
use crate::response::Response;

/// Bound path parameters, in declaration order.
pub type Params = IndexMap<String, Value>;

/// Opaque per-route metadata. The engine never interprets it; middleware
/// define and read their own keys.
pub type Options = IndexMap<String, Value>;

/// Per-request mutable state.
#[derive(Clone, Debug)]
pub struct Context {
    consumed: String,
    params: Params,
    options: Options,
    parent: Option<Box<Context>>,
    status: StatusCode,
    response: Option<Response>,
    reply: Option<Value>,
    descriptor: Option<Arc<HandlerDescriptor>>,
}

impl Context {
    pub(crate) fn new(consumed: String, params: Params, options: Options, parent: Option<Context>) -> Self {
        Self {
            consumed,
            params,
            options,
            parent: parent.map(Box::new),
            status: StatusCode::OK,
            response: None,
            reply: None,
            descriptor: None,
        }
    }

    /// The part of the request path matched so far, across all router levels.
    pub fn consumed(&self) -> &str {
        &self.consumed
    }

    /// Bound parameters, merged with every ancestor level's bindings.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// A bound parameter as a string, if it is one.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    /// Route options merged from every mount down to the matched route, the
    /// innermost value winning.
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// The context of the enclosing mount, if the route was reached through one.
    pub fn parent(&self) -> Option<&Context> {
        self.parent.as_deref()
    }

    /// Number of mounts between the root router and the matched route.
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent(), |c| c.parent()).count()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status used when the reply is rendered.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
        if let Some(response) = &mut self.response {
            response.set_status(status);
        }
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Stores a finished response. Its status becomes the context's status.
    pub fn set_response(&mut self, response: Response) {
        self.status = response.status_code();
        self.response = Some(response);
    }

    /// Writes a `302 Found` redirect as the response.
    pub fn redirect(&mut self, location: &str) {
        self.set_response(Response::redirect(location));
    }

    /// The value the handler returned, before rendering.
    pub fn reply(&self) -> Option<&Value> {
        self.reply.as_ref()
    }

    /// The descriptor of the handler that ran (or is about to).
    pub fn descriptor(&self) -> Option<&Arc<HandlerDescriptor>> {
        self.descriptor.as_ref()
    }

    /// Takes the response out, or an empty one with the current status if
    /// nothing was written.
    pub fn into_response(self) -> Response {
        let status = self.status;
        self.response.unwrap_or_else(|| Response::status(status))
    }

    pub(crate) fn set_reply(&mut self, reply: Value) {
        self.reply = Some(reply);
    }

    pub(crate) fn set_descriptor(&mut self, descriptor: Arc<HandlerDescriptor>) {
        self.descriptor = Some(descriptor);
    }
}
