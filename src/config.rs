//! Engine configuration.
//!
//! Every field has a default, so an empty document is a valid configuration.
//! Unknown keys are rejected rather than ignored.
//!
//! ```json
//! {
//!   "default_format": "json",
//!   "json": { "with_defaults": true, "cors": true }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::encoder::Format;
use crate::error::Error;

/// Top-level configuration for a [`Dispatcher`](crate::Dispatcher).
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Format for routes that do not pick one themselves.
    pub default_format: Format,
    pub json: JsonConfig,
}

/// JSON encoder settings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct JsonConfig {
    /// Wrap output in `{header, data, success}`.
    pub with_defaults: bool,
    /// Emit permissive `access-control-*` headers.
    pub cors: bool,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self { with_defaults: true, cors: true }
    }
}

impl Config {
    pub fn from_json_str(document: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(document)?)
    }
}
