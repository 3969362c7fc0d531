//! Handler trait, parameter descriptors and argument binding.
//!
//! # How handlers are described
//!
//! Rust has no runtime view of a function's parameter names, so a handler
//! states its parameters up front as a list of [`ParamSpec`]s:
//!
//! ```text
//! handler_fn(show_user)                         ← user writes this
//!     .param(ParamSpec::required("id", Int))
//!     .param(ParamSpec::with_default("fmt", String, "full"))
//!        ↓ router.register(…, "/users/{id}", …)
//! Route { kind: Callback(…) }                   ← descriptor built on first use, then cached
//!        ↓ request for /users/7
//! descriptor.bind(ctx.params())                 ← Args ["id" = 7, "fmt" = "full"]
//!        ↓
//! handler.call(&mut Invocation)                 ← one vtable dispatch
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::warn;

use crate::context::{Context, Params};
use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoReply, Reply};

// ── ParamType / ParamSpec ─────────────────────────────────────────────────────

/// Declared type of a handler parameter.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Int,
    Float,
    Bool,
    Array,
    Object,
    /// No coercion; the bound value is passed as is.
    Any,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int    => "int",
            Self::Float  => "float",
            Self::Bool   => "bool",
            Self::Array  => "array",
            Self::Object => "object",
            Self::Any    => "any",
        }
    }

    /// Coerces a bound value (path values arrive as strings) to this type.
    fn coerce(self, name: &str, value: &Value) -> Result<Value, Error> {
        let Value::String(text) = value else {
            return Ok(value.clone());
        };
        let invalid = || Error::InvalidParameter {
            name: name.to_owned(),
            expected: self.as_str(),
            value: text.clone(),
        };
        match self {
            Self::String | Self::Any => Ok(value.clone()),
            Self::Int => text.parse::<i64>().map(Value::from).map_err(|_| invalid()),
            Self::Float => text.parse::<f64>().ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(invalid),
            Self::Bool => match text.as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            Self::Array => match serde_json::from_str::<Value>(text) {
                Ok(v @ Value::Array(_)) => Ok(v),
                _ => Err(invalid()),
            },
            Self::Object => match serde_json::from_str::<Value>(text) {
                Ok(v @ Value::Object(_)) => Ok(v),
                _ => Err(invalid()),
            },
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared handler parameter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    pub nullable: bool,
    /// `Some` when the parameter has a default (which may itself be `null`).
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self { name: name.into(), ty, nullable: false, default: None }
    }

    pub fn nullable(name: impl Into<String>, ty: ParamType) -> Self {
        Self { name: name.into(), ty, nullable: true, default: None }
    }

    pub fn with_default(name: impl Into<String>, ty: ParamType, default: impl Into<Value>) -> Self {
        Self { name: name.into(), ty, nullable: false, default: Some(default.into()) }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

// ── HandlerDescriptor ─────────────────────────────────────────────────────────

/// The static shape of a handler: its parameters and whether it renders.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandlerDescriptor {
    params: Vec<ParamSpec>,
    void: bool,
}

impl HandlerDescriptor {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params, void: false }
    }

    /// Marks the handler as writing its own response: nothing is rendered.
    pub fn void(mut self) -> Self {
        self.void = true;
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn is_void(&self) -> bool {
        self.void
    }

    /// Binds arguments from `bound`, one per declared parameter, in order.
    ///
    /// A bound value is used if present (a `null` binding counts as absent);
    /// otherwise `null` if the parameter is nullable; otherwise its default;
    /// otherwise binding fails with [`Error::MissingParameter`].
    pub fn bind(&self, bound: &Params) -> Result<Args, Error> {
        let mut args = Args::with_capacity(self.params.len());
        for spec in &self.params {
            let value = match bound.get(&spec.name).filter(|v| !v.is_null()) {
                Some(value) => spec.ty.coerce(&spec.name, value)?,
                None if spec.nullable => Value::Null,
                None => match &spec.default {
                    Some(default) => default.clone(),
                    None => {
                        warn!(param = %spec.name, "no value bound for required parameter");
                        return Err(Error::MissingParameter { name: spec.name.clone() });
                    }
                },
            };
            args.push(spec.name.clone(), value);
        }
        Ok(args)
    }

    /// Describes the parameters that the path does not supply, i.e. the ones
    /// an external validator should look for in the query or body.
    pub fn validation_descriptor<'a, I>(&self, bound_by_path: I) -> ValidationDescriptor
    where
        I: IntoIterator<Item = &'a str>,
    {
        let bound: Vec<&str> = bound_by_path.into_iter().collect();
        let fields = self.params.iter()
            .filter(|spec| !bound.contains(&spec.name.as_str()))
            .map(|spec| FieldRule {
                name: spec.name.clone(),
                ty: spec.ty,
                nullable: spec.nullable,
                required: !spec.nullable && !spec.has_default(),
            })
            .collect();
        ValidationDescriptor { fields }
    }
}

/// Input fields a handler expects outside the path.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationDescriptor {
    pub fields: Vec<FieldRule>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldRule {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub nullable: bool,
    pub required: bool,
}

// ── Args / Invocation ─────────────────────────────────────────────────────────

/// Bound handler arguments: positional, and addressable by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    entries: Vec<(String, Value)>,
}

impl Args {
    fn with_capacity(n: usize) -> Self {
        Self { entries: Vec::with_capacity(n) }
    }

    fn push(&mut self, name: String, value: Value) {
        self.entries.push((name, value));
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Positional access.
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.entries.get(index).map(|(_, v)| v)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// The positional argument list.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

/// Everything a handler gets to see for one call.
pub struct Invocation<'a> {
    args: Args,
    request: &'a Request,
    context: &'a mut Context,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(args: Args, request: &'a Request, context: &'a mut Context) -> Self {
        Self { args, request, context }
    }

    pub fn args(&self) -> &Args { &self.args }
    pub fn request(&self) -> &Request { self.request }
    pub fn context(&self) -> &Context { &*self.context }
    pub fn context_mut(&mut self) -> &mut Context { &mut *self.context }
}

// ── Handler trait ─────────────────────────────────────────────────────────────

/// A route handler.
///
/// Most handlers are plain functions wrapped with [`handler_fn`]. Implement
/// the trait directly when the descriptor is easier to compute than to spell
/// out with the builder.
pub trait Handler: Send + Sync + 'static {
    /// The handler's parameters. Called once per route; the result is cached.
    fn describe(&self) -> HandlerDescriptor;

    fn call(&self, invocation: &mut Invocation<'_>) -> Reply;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
pub(crate) type BoxedHandler = Arc<dyn Handler>;

/// Wraps a function as a [`Handler`]. Add parameters with
/// [`FnHandler::param`].
///
/// ```rust
/// use serde_json::{json, Value};
/// use waymark::{handler_fn, Invocation, ParamSpec, ParamType};
///
/// fn greet(inv: &mut Invocation<'_>) -> Value {
///     json!({ "hello": inv.args().str("name") })
/// }
///
/// let handler = handler_fn(greet).param(ParamSpec::with_default("name", ParamType::String, "world"));
/// ```
pub fn handler_fn<F, R>(f: F) -> FnHandler<F>
where
    F: Fn(&mut Invocation<'_>) -> R + Send + Sync + 'static,
    R: IntoReply,
{
    FnHandler { f, descriptor: HandlerDescriptor::default() }
}

/// A function handler plus its declared parameters.
pub struct FnHandler<F> {
    f: F,
    descriptor: HandlerDescriptor,
}

impl<F> FnHandler<F> {
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.descriptor.params.push(spec);
        self
    }

    /// The function writes its own response onto the context.
    pub fn void(mut self) -> Self {
        self.descriptor.void = true;
        self
    }
}

impl<F, R> Handler for FnHandler<F>
where
    F: Fn(&mut Invocation<'_>) -> R + Send + Sync + 'static,
    R: IntoReply,
{
    fn describe(&self) -> HandlerDescriptor {
        self.descriptor.clone()
    }

    fn call(&self, invocation: &mut Invocation<'_>) -> Reply {
        (self.f)(invocation).into_reply()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(pairs: &[(&str, Value)]) -> Params {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
    }

    #[test]
    fn test_bind_in_declaration_order() {
        let d = HandlerDescriptor::new(vec![
            ParamSpec::required("b", ParamType::String),
            ParamSpec::required("a", ParamType::String),
        ]);
        let args = d.bind(&bound(&[("a", "1".into()), ("b", "2".into())])).unwrap();
        assert_eq!(args.values().cloned().collect::<Vec<_>>(), vec![Value::from("2"), Value::from("1")]);
    }

    #[test]
    fn test_bind_falls_back_to_null_then_default() {
        let d = HandlerDescriptor::new(vec![
            ParamSpec::nullable("n", ParamType::Int),
            ParamSpec::with_default("d", ParamType::String, "dflt"),
        ]);
        let args = d.bind(&Params::new()).unwrap();
        assert_eq!(args.get("n"), Some(&Value::Null));
        assert_eq!(args.str("d"), Some("dflt"));
    }

    #[test]
    fn test_null_binding_counts_as_absent() {
        let d = HandlerDescriptor::new(vec![ParamSpec::with_default("name", ParamType::String, "world")]);
        let args = d.bind(&bound(&[("name", Value::Null)])).unwrap();
        assert_eq!(args.str("name"), Some("world"));
    }

    #[test]
    fn test_missing_required_is_an_error() {
        let d = HandlerDescriptor::new(vec![ParamSpec::required("id", ParamType::Int)]);
        assert!(matches!(
            d.bind(&Params::new()),
            Err(Error::MissingParameter { name }) if name == "id"
        ));
    }

    #[test]
    fn test_coercion() {
        let d = HandlerDescriptor::new(vec![
            ParamSpec::required("i", ParamType::Int),
            ParamSpec::required("f", ParamType::Float),
            ParamSpec::required("b", ParamType::Bool),
            ParamSpec::required("s", ParamType::String),
        ]);
        let args = d.bind(&bound(&[
            ("i", "42".into()),
            ("f", "1.5".into()),
            ("b", "true".into()),
            ("s", "007".into()),
        ])).unwrap();
        assert_eq!(args.i64("i"), Some(42));
        assert_eq!(args.f64("f"), Some(1.5));
        assert_eq!(args.bool("b"), Some(true));
        assert_eq!(args.str("s"), Some("007"));
    }

    #[test]
    fn test_coercion_failure() {
        let d = HandlerDescriptor::new(vec![ParamSpec::required("id", ParamType::Int)]);
        assert!(matches!(
            d.bind(&bound(&[("id", "abc".into())])),
            Err(Error::InvalidParameter { expected: "int", .. })
        ));
    }

    #[test]
    fn test_validation_descriptor_skips_path_params() {
        let d = HandlerDescriptor::new(vec![
            ParamSpec::required("id", ParamType::Int),
            ParamSpec::required("title", ParamType::String),
            ParamSpec::nullable("note", ParamType::String),
            ParamSpec::with_default("limit", ParamType::Int, 10),
        ]);
        let v = d.validation_descriptor(["id"]);
        let names: Vec<_> = v.fields.iter().map(|f| (f.name.as_str(), f.required)).collect();
        assert_eq!(names, vec![("title", true), ("note", false), ("limit", false)]);

        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["fields"][0]["type"], "string");
    }

    #[test]
    fn test_fn_handler_describe() {
        let h = handler_fn(|_: &mut Invocation<'_>| ())
            .param(ParamSpec::required("id", ParamType::Int))
            .void();
        let d = h.describe();
        assert!(d.is_void());
        assert_eq!(d.params().len(), 1);
    }
}
