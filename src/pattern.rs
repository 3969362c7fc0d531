//! Route template compiler and segment matcher.
//!
//! A template is a `/`-delimited list of segments:
//!
//! | Segment    | Matches                                        |
//! |------------|------------------------------------------------|
//! | `users`    | exactly `users` (case-sensitive)               |
//! | `{id}`     | one non-empty segment, bound as `id`           |
//! | `{name?}`  | like `{name}`, or nothing at the very end      |
//! | `*`        | the rest of the path verbatim, bound as `*`    |
//! | `*rest`    | the rest of the path verbatim, bound as `rest` |
//!
//! A trailing slash is significant: `/users/{id?}` matches `/users` but not
//! `/users/`. The bare path `/` is the one exception and counts as empty, so
//! it matches both `/` and `/{page?}`. A mounted router whose prefix consumed
//! the whole path sees exactly that `/`.
//!
//! Templates are compiled once at registration and never change afterwards.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::context::Params;

/// A malformed route template. Fatal at startup.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum PatternError {
    #[error("route `{template}`: more than one wildcard")]
    MultipleWildcards { template: String },

    #[error("route `{template}`: wildcard must be the last segment")]
    WildcardNotLast { template: String },

    #[error("route `{template}`: empty parameter name")]
    EmptyParamName { template: String },

    #[error("route `{template}`: unbalanced braces in `{segment}`")]
    UnbalancedBraces { template: String, segment: String },

    #[error("route `{template}`: parameter `{name}` declared twice")]
    DuplicateParam { template: String, name: String },
}

/// One compiled template segment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Segment {
    Literal(String),
    Param { name: String, optional: bool },
    Wildcard { name: String },
}

/// A compiled route template.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathPattern {
    template: String,
    segments: Vec<Segment>,
}

/// A successful match: the exact prefix of the input that was matched and the
/// parameters bound along the way, in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct Match<'p> {
    pub consumed: &'p str,
    pub params: Params,
}

impl PathPattern {
    /// Compiles `template`.
    ///
    /// ```rust
    /// use waymark::PathPattern;
    ///
    /// let pattern = PathPattern::compile("/users/{id}/files/*").unwrap();
    /// let m = pattern.match_exact("/users/7/files/a/b.txt").unwrap();
    /// assert_eq!(m.params["id"], "7");
    /// assert_eq!(m.params["*"], "a/b.txt");
    ///
    /// assert!(PathPattern::compile("/*/x/*").is_err());
    /// ```
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let raw: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();

        let wildcards = raw.iter().filter(|s| s.starts_with('*')).count();
        if wildcards > 1 {
            return Err(PatternError::MultipleWildcards { template: template.to_owned() });
        }
        if wildcards == 1 && !raw.last().is_some_and(|s| s.starts_with('*')) {
            return Err(PatternError::WildcardNotLast { template: template.to_owned() });
        }

        let mut segments: Vec<Segment> = Vec::with_capacity(raw.len());
        for text in raw {
            let segment = parse_segment(template, text)?;
            if let Segment::Param { name, .. } | Segment::Wildcard { name } = &segment {
                if segments.iter().any(|s| s.binding() == Some(name.as_str())) {
                    return Err(PatternError::DuplicateParam {
                        template: template.to_owned(),
                        name: name.clone(),
                    });
                }
            }
            segments.push(segment);
        }

        Ok(Self { template: template.to_owned(), segments })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names this pattern binds, in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::binding)
    }

    /// Matches the pattern against the start of `path`.
    ///
    /// Comparison happens segment by segment, so `/api` matches `/api/users`
    /// (consuming `/api`) but never `/apix`.
    pub fn match_prefix<'p>(&self, path: &'p str) -> Option<Match<'p>> {
        let mut params = Params::new();
        let mut pos = 0;
        let last = self.segments.len().saturating_sub(1);

        for (i, segment) in self.segments.iter().enumerate() {
            let rest = &path[pos..];
            match segment {
                Segment::Wildcard { name } => {
                    let captured = rest.strip_prefix('/').unwrap_or(rest);
                    params.insert(name.clone(), Value::String(captured.to_owned()));
                    pos = path.len();
                    break;
                }
                Segment::Literal(literal) => {
                    let text = next_segment(rest)?;
                    if text != literal {
                        return None;
                    }
                    pos += 1 + text.len();
                }
                Segment::Param { name, optional } => match next_segment(rest) {
                    Some(text) if !text.is_empty() => {
                        params.insert(name.clone(), Value::String(text.to_owned()));
                        pos += 1 + text.len();
                    }
                    // Absent: input exhausted at the last segment.
                    _ if *optional && i == last && (rest.is_empty() || path == "/") => {
                        params.insert(name.clone(), Value::Null);
                        pos = path.len();
                    }
                    _ => return None,
                },
            }
        }

        Some(Match { consumed: &path[..pos], params })
    }

    /// Matches the pattern against the whole of `path`.
    pub fn match_exact<'p>(&self, path: &'p str) -> Option<Match<'p>> {
        let m = self.match_prefix(path)?;
        let rest = &path[m.consumed.len()..];
        (rest.is_empty() || (rest == "/" && self.segments.is_empty())).then_some(m)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

impl Segment {
    fn binding(&self) -> Option<&str> {
        match self {
            Self::Literal(_) => None,
            Self::Param { name, .. } | Self::Wildcard { name } => Some(name),
        }
    }
}

fn parse_segment(template: &str, text: &str) -> Result<Segment, PatternError> {
    if let Some(name) = text.strip_prefix('*') {
        let name = if name.is_empty() { "*" } else { name };
        return Ok(Segment::Wildcard { name: name.to_owned() });
    }

    let unbalanced = || PatternError::UnbalancedBraces {
        template: template.to_owned(),
        segment: text.to_owned(),
    };

    match text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        Some(inner) => {
            let (name, optional) = match inner.strip_suffix('?') {
                Some(name) => (name, true),
                None => (inner, false),
            };
            if name.contains(['{', '}']) {
                return Err(unbalanced());
            }
            if name.is_empty() {
                return Err(PatternError::EmptyParamName { template: template.to_owned() });
            }
            Ok(Segment::Param { name: name.to_owned(), optional })
        }
        None if text.contains(['{', '}']) => Err(unbalanced()),
        None => Ok(Segment::Literal(text.to_owned())),
    }
}

/// The segment right after a leading `/`, or `None` when `rest` is exhausted.
fn next_segment(rest: &str) -> Option<&str> {
    let after = rest.strip_prefix('/')?;
    Some(&after[..after.find('/').unwrap_or(after.len())])
}
