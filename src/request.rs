//! Incoming request type.
//!
//! waymark never touches a socket. Whatever accepted the connection hands
//! over an already-parsed request: method, path, headers and body.

use bytes::Bytes;

/// An incoming HTTP request.
#[derive(Clone, Debug, Default)]
pub struct Request {
    method: String,
    path: String,
    query: Option<String>,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Request {
    /// Builds a request. `uri` may carry a query string; it is split off and
    /// kept apart from the routed path.
    ///
    /// ```rust
    /// use waymark::Request;
    ///
    /// let req = Request::new("get", "/search?q=rust")
    ///     .with_header("Accept", "application/json");
    ///
    /// assert_eq!(req.method(), "GET");
    /// assert_eq!(req.path(), "/search");
    /// assert_eq!(req.query(), Some("q=rust"));
    /// assert_eq!(req.header("accept"), Some("application/json"));
    /// ```
    pub fn new(method: impl AsRef<str>, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query.to_owned())),
            None => (uri, None),
        };
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            path: path.to_owned(),
            query,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new("GET", uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new("POST", uri)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &str { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The token of an `Authorization: Bearer <token>` header.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.header("authorization")?;
        let (scheme, token) = value.split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
    }
}

/// Adapts a request parsed by an `http`-based server (hyper, axum, …).
/// Headers that are not valid UTF-8 are dropped.
impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        let headers = parts.headers.iter()
            .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
            .collect();
        Self {
            method: parts.method.as_str().to_owned(),
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            headers,
            body,
        }
    }
}
