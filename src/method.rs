//! The set of HTTP methods a route answers to.
//!
//! Methods are plain strings. They are uppercased on the way in and compared
//! case-insensitively on the way out, so `get`, `Get` and `GET` all match a
//! route registered for `GET`. Non-standard verbs (`PURGE`, `PROPFIND`, …)
//! work like any other.

use std::fmt;

/// Allowed methods for a [`Route`](crate::Route).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MethodSet {
    /// Matches every method. Mounts use this.
    Any,
    /// Matches only the listed methods (uppercased, no duplicates).
    Only(Vec<String>),
}

impl MethodSet {
    pub fn any() -> Self {
        Self::Any
    }

    /// Builds a set from method names. `ANY` or `*` anywhere in the list
    /// yields [`MethodSet::Any`].
    pub fn only<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set: Vec<String> = Vec::new();
        for method in methods {
            let method = method.as_ref().trim().to_ascii_uppercase();
            if method == "ANY" || method == "*" {
                return Self::Any;
            }
            if !method.is_empty() && !set.contains(&method) {
                set.push(method);
            }
        }
        Self::Only(set)
    }

    pub fn contains(&self, method: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(set) => set.iter().any(|m| m.eq_ignore_ascii_case(method)),
        }
    }
}

impl From<&str> for MethodSet {
    fn from(method: &str) -> Self {
        Self::only([method])
    }
}

impl<const N: usize> From<[&str; N]> for MethodSet {
    fn from(methods: [&str; N]) -> Self {
        Self::only(methods)
    }
}

impl From<&[&str]> for MethodSet {
    fn from(methods: &[&str]) -> Self {
        Self::only(methods)
    }
}

impl From<Vec<String>> for MethodSet {
    fn from(methods: Vec<String>) -> Self {
        Self::only(methods)
    }
}

impl From<http::Method> for MethodSet {
    fn from(method: http::Method) -> Self {
        Self::only([method.as_str()])
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Only(set) => f.write_str(&set.join("|")),
        }
    }
}
