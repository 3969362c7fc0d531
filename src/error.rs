//! Unified error type.

use thiserror::Error;

use crate::encoder::Format;
use crate::pattern::PatternError;

/// The error type returned by waymark's fallible operations.
///
/// A request that matches no route is *not* an error; it comes back as
/// [`Outcome::NoRouteMatched`](crate::Outcome::NoRouteMatched). Middleware
/// refusals are not errors either: they halt with a [`Response`](crate::Response).
/// What lands here is either fatal at startup (a bad pattern, bad config) or
/// fatal for one request (binding or rendering failed).
#[derive(Debug, Error)]
pub enum Error {
    /// A route template could not be compiled. Raised at registration.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// A required, non-nullable handler parameter without a default had no
    /// bound value.
    #[error("missing required parameter `{name}`")]
    MissingParameter { name: String },

    /// A bound path value could not be coerced to the declared parameter type.
    #[error("parameter `{name}` expects {expected}, got `{value}`")]
    InvalidParameter {
        name: String,
        expected: &'static str,
        value: String,
    },

    /// An encoder received a value it cannot render.
    #[error("{format} encoder cannot render a {kind} value")]
    InvalidResponseValue { format: Format, kind: &'static str },

    /// An internal invariant was violated. A programming error.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The configuration document was malformed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }
}
