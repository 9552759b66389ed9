//! Parameters: one named field of a compilable type

use crate::{CategoryLookup, Loader};
use kiln_core::{CompileError, Raw, Value};
use serde_json::Map;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Describes one field of a compilable type: how to load it, whether it is
/// required, and its default.
///
/// A parameter is required exactly when it has no default. Defaults are
/// already typed and are handed to the builder without going through the
/// loader.
#[derive(Clone)]
pub struct Parameter {
    name: String,
    loader: Arc<dyn Loader>,
    default: Option<Value>,
    json_type: Option<Raw>,
    description: Option<String>,
}

impl Parameter {
    pub fn required(name: impl Into<String>, loader: impl Loader + 'static) -> Self {
        Self {
            name: name.into(),
            loader: Arc::new(loader),
            default: None,
            json_type: None,
            description: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        loader: impl Loader + 'static,
        default: impl Into<Value>,
    ) -> Self {
        Self {
            default: Some(default.into()),
            ..Self::required(name, loader)
        }
    }

    /// Builder: explicit JSON schema type (string or schema fragment)
    pub fn with_json_type(mut self, json_type: impl Into<Raw>) -> Self {
        self.json_type = Some(json_type.into());
        self
    }

    /// Builder: explicit description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn loader(&self) -> &Arc<dyn Loader> {
        &self.loader
    }

    /// Explicit json type, else whatever the loader reports
    pub fn json_type(&self) -> Option<Raw> {
        self.json_type
            .clone()
            .or_else(|| self.loader.describe().and_then(|d| d.json_type()))
    }

    /// Explicit description, else whatever the loader reports
    pub fn description(&self) -> Option<String> {
        self.description
            .clone()
            .or_else(|| self.loader.describe().and_then(|d| d.description()))
    }

    /// Load a raw value through this parameter's loader
    pub fn resolve(&self, raw: &Raw, lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        trace!(parameter = %self.name, "resolving parameter");
        self.loader
            .load(raw, lookup)
            .map_err(|e| e.for_parameter(&self.name))
    }

    /// Property fragment for this parameter in a JSON schema
    pub fn to_json_schema(&self) -> Raw {
        let mut schema = match self.json_type() {
            Some(Raw::Object(fragment)) => fragment,
            Some(Raw::String(ty)) => {
                let mut fragment = Map::new();
                fragment.insert("type".to_string(), Raw::String(ty));
                fragment
            }
            _ => Map::new(),
        };
        if let Some(description) = self.description() {
            schema.insert("description".to_string(), Raw::String(description));
        }
        if let Some(default) = &self.default {
            if let Ok(default) = serde_json::to_value(default) {
                schema.insert("default".to_string(), default);
            }
        }
        Raw::Object(schema)
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("required", &self.is_required())
            .field("default", &self.default)
            .field("json_type", &self.json_type())
            .finish()
    }
}
