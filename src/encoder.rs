//! Response encoders.
//!
//! An [`Encoder`] turns a handler's return value into a body plus a fixed set
//! of headers. The value is only ever borrowed: envelopes are built on a copy,
//! so the handler's value is left untouched.
//!
//! | Format       | Content type                      | Accepts           |
//! |--------------|-----------------------------------|-------------------|
//! | `Html`       | `text/html; charset=utf-8`        | scalars only      |
//! | `Json`       | `application/json; charset=utf-8` | anything          |
//! | `Script`     | `text/javascript; charset=utf-8`  | anything          |
//! | `Serialized` | `application/yaml; charset=utf-8` | anything          |

use std::fmt;
use std::io;

use bytes::Bytes;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::ser::{CharEscape, CompactFormatter, Formatter};
use serde_json::{Value, json};

use crate::config::JsonConfig;
use crate::error::Error;
use crate::response::Response;

/// The content variants a route can render as.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Html,
    #[default]
    Json,
    Script,
    Serialized,
}

impl Format {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Html       => "text/html; charset=utf-8",
            Self::Json       => "application/json; charset=utf-8",
            Self::Script     => "text/javascript; charset=utf-8",
            Self::Serialized => "application/yaml; charset=utf-8",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html       => "html",
            Self::Json       => "json",
            Self::Script     => "script",
            Self::Serialized => "serialized",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CORS_HEADERS: [(&str, &str); 3] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, POST, PUT, PATCH, DELETE, OPTIONS"),
    ("access-control-allow-headers", "Content-Type, Authorization, X-Requested-With"),
];

/// Renders values in one [`Format`].
///
/// ```rust
/// use http::StatusCode;
/// use serde_json::json;
/// use waymark::{Encoder, Format};
///
/// let body = Encoder::new(Format::Json)
///     .with_defaults(true)
///     .render(&json!({ "x": 1 }), StatusCode::OK)
///     .unwrap();
///
/// assert_eq!(
///     &body[..],
///     br#"{"header":{"response_code":200},"data":{"x":1},"success":true}"#
/// );
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Encoder {
    format: Format,
    with_defaults: bool,
    cors: bool,
}

impl Encoder {
    /// A bare encoder: no JSON envelope, no CORS headers.
    pub fn new(format: Format) -> Self {
        Self { format, with_defaults: false, cors: false }
    }

    pub fn from_config(format: Format, json: &JsonConfig) -> Self {
        Self { format, with_defaults: json.with_defaults, cors: json.cors }
    }

    /// Wrap JSON output in the `{header, data, success}` envelope.
    pub fn with_defaults(mut self, on: bool) -> Self {
        self.with_defaults = on;
        self
    }

    /// Add permissive CORS headers to JSON output.
    pub fn cors(mut self, on: bool) -> Self {
        self.cors = on;
        self
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The fixed header set for this format.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("content-type".to_owned(), self.format.content_type().to_owned())];
        if self.format == Format::Json && self.cors {
            headers.extend(CORS_HEADERS.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())));
        }
        headers
    }

    /// Renders `value` into a body. `status` feeds the JSON envelope header.
    pub fn render(&self, value: &Value, status: StatusCode) -> Result<Bytes, Error> {
        let body = match self.format {
            Format::Html => match value {
                Value::String(s) => s.clone().into_bytes(),
                Value::Number(n) => n.to_string().into_bytes(),
                Value::Bool(b) => b.to_string().into_bytes(),
                other => {
                    return Err(Error::InvalidResponseValue {
                        format: self.format,
                        kind: kind_of(other),
                    });
                }
            },
            Format::Json if self.with_defaults => html_safe_json(&envelope(value, status))?,
            Format::Json => html_safe_json(value)?,
            Format::Script => match value {
                Value::String(s) => s.clone().into_bytes(),
                other => serde_json::to_vec(other).map_err(|e| Error::illegal_state(e.to_string()))?,
            },
            Format::Serialized => serde_yaml::to_string(value)
                .map_err(|e| Error::illegal_state(e.to_string()))?
                .into_bytes(),
        };
        Ok(Bytes::from(body))
    }

    /// Renders `value` into a full response with this format's headers.
    pub fn encode(&self, value: &Value, status: StatusCode) -> Result<Response, Error> {
        let body = self.render(value, status)?;
        Ok(Response::builder().status(status).with_headers(self.headers(), body))
    }
}

/// `{header, data, success}`, or `{header, error, success}` when the value is
/// an object carrying an `error` key.
fn envelope(value: &Value, status: StatusCode) -> Value {
    let header = json!({ "response_code": status.as_u16() });
    match value.as_object().and_then(|o| o.get("error")) {
        Some(error) => json!({ "header": header, "error": error, "success": status.is_success() }),
        None => json!({ "header": header, "data": value, "success": true }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn html_safe_json(value: &Value) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, HtmlSafe);
    value.serialize(&mut ser).map_err(|e| Error::illegal_state(e.to_string()))?;
    Ok(out)
}

/// Compact JSON with `<`, `>`, `&`, `'` and `"` written as `\u00XX`, so the
/// output can sit inside an HTML `<script>` block or attribute.
struct HtmlSafe;

impl Formatter for HtmlSafe {
    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let bytes = fragment.as_bytes();
        let mut start = 0;
        for (i, b) in bytes.iter().enumerate() {
            let escaped: &[u8] = match b {
                b'<' => b"\\u003C",
                b'>' => b"\\u003E",
                b'&' => b"\\u0026",
                b'\'' => b"\\u0027",
                _ => continue,
            };
            writer.write_all(&bytes[start..i])?;
            writer.write_all(escaped)?;
            start = i + 1;
        }
        writer.write_all(&bytes[start..])
    }

    fn write_char_escape<W: ?Sized + io::Write>(&mut self, writer: &mut W, escape: CharEscape) -> io::Result<()> {
        match escape {
            CharEscape::Quote => writer.write_all(b"\\u0022"),
            other => CompactFormatter.write_char_escape(writer, other),
        }
    }
}
