//! Outgoing response type and the [`IntoReply`] conversion trait.
//!
//! A handler either returns a value for the route's [encoder](crate::Encoder)
//! to render, returns a finished [`Response`], or returns `()` after writing
//! the response onto the [`Context`](crate::Context) itself.

use bytes::Bytes;
use http::StatusCode;
use http::header::{CONTENT_TYPE, LOCATION};
use http_body_util::Full;
use serde_json::Value;

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response: status, ordered headers, body.
///
/// ```rust
/// use http::StatusCode;
/// use waymark::Response;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
}

impl Response {
    /// `200 OK` with `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` with `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// `200 OK` with `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::builder().html(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, headers: Vec::new(), body: Bytes::new() }
    }

    /// `302 Found` pointing at `location`.
    pub fn redirect(location: &str) -> Self {
        Self::builder()
            .status(StatusCode::FOUND)
            .header(LOCATION.as_str(), location)
            .no_body()
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Case-insensitive header lookup; the first occurrence wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Converts into an `http` response for a hyper-based embedding server.
    ///
    /// Fails only if a header name or value is not valid on the wire.
    pub fn into_http(self) -> Result<http::Response<Full<Bytes>>, http::Error> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.body(Full::new(self.body))
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`]. Defaults to `200 OK`.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.bytes("application/json", body)
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.bytes("text/plain; charset=utf-8", body.into())
    }

    pub fn html(self, body: impl Into<String>) -> Response {
        self.bytes("text/html; charset=utf-8", body.into())
    }

    /// Terminate with an arbitrary content type.
    pub fn bytes(self, content_type: &str, body: impl Into<Bytes>) -> Response {
        let mut headers = vec![(CONTENT_TYPE.as_str().to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { status: self.status, headers, body: body.into() }
    }

    /// Terminate with no body (e.g. `204 No Content`, redirects).
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Bytes::new() }
    }

    /// Terminate with pre-built headers, keeping any added on the builder.
    pub(crate) fn with_headers(self, base: Vec<(String, String)>, body: Bytes) -> Response {
        let mut headers = base;
        headers.extend(self.headers);
        Response { status: self.status, headers, body }
    }
}

// ── Reply / IntoReply ─────────────────────────────────────────────────────────

/// What a handler produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// A value for the route's encoder to render.
    Value(Value),
    /// A finished response; no encoder runs.
    Response(Response),
    /// Nothing. The handler wrote to the context directly.
    Void,
}

/// Conversion of handler return values into a [`Reply`].
///
/// `Result<T, E>` works whenever both sides convert, so a handler can bail
/// out with an error response:
///
/// ```rust
/// use http::StatusCode;
/// use serde_json::{json, Value};
/// use waymark::{Invocation, Response};
///
/// fn show(inv: &mut Invocation<'_>) -> Result<Value, Response> {
///     let id = inv.args().i64("id").ok_or_else(|| Response::status(StatusCode::BAD_REQUEST))?;
///     Ok(json!({ "id": id }))
/// }
/// ```
pub trait IntoReply {
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply { self }
}

impl IntoReply for Value {
    fn into_reply(self) -> Reply { Reply::Value(self) }
}

impl IntoReply for Response {
    fn into_reply(self) -> Reply { Reply::Response(self) }
}

impl IntoReply for () {
    fn into_reply(self) -> Reply { Reply::Void }
}

impl IntoReply for String {
    fn into_reply(self) -> Reply { Reply::Value(Value::String(self)) }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Reply { Reply::Value(Value::from(self)) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`.
impl IntoReply for StatusCode {
    fn into_reply(self) -> Reply { Reply::Response(Response::status(self)) }
}

impl<T: IntoReply, E: IntoReply> IntoReply for Result<T, E> {
    fn into_reply(self) -> Reply {
        match self {
            Ok(v) => v.into_reply(),
            Err(e) => e.into_reply(),
        }
    }
}
