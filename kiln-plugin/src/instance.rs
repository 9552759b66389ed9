//! Instance compiler plugins and category descriptors

use crate::{Builder, CategoryLookup, Parameter};
use kiln_core::{CompileError, Kwargs, Object, Raw, Value};
use serde_json::{Map, json};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Keys consumed by the category compiler before a plugin sees the input
const RESERVED_KEYS: [&str; 2] = ["name", "type"];

/// One compilable type within a category: a type tag, its parameters and
/// the builder that constructs it.
#[derive(Debug)]
pub struct InstanceCompilerPlugin {
    type_tag: String,
    aliases: Vec<String>,
    category: String,
    parameters: Vec<Parameter>,
    builder: Builder,
    description: Option<String>,
}

impl InstanceCompilerPlugin {
    /// Create a plugin; parameter names must be unique and must not shadow
    /// the reserved `name`/`type` keys.
    pub fn new(
        type_tag: impl Into<String>,
        category: impl Into<String>,
        parameters: Vec<Parameter>,
        builder: Builder,
    ) -> Result<Self, CompileError> {
        let type_tag = type_tag.into();
        let mut seen = HashSet::new();
        for param in &parameters {
            if RESERVED_KEYS.contains(&param.name()) {
                return Err(CompileError::invalid_plugin(
                    &type_tag,
                    format!("parameter name '{}' is reserved", param.name()),
                ));
            }
            if !seen.insert(param.name()) {
                return Err(CompileError::invalid_plugin(
                    &type_tag,
                    format!("parameter '{}' is declared twice", param.name()),
                ));
            }
        }
        Ok(Self {
            type_tag,
            aliases: Vec::new(),
            category: category.into(),
            parameters,
            builder,
            description: None,
        })
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.type_tag
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn builder(&self) -> &Builder {
        &self.builder
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.is_required())
    }

    pub fn optional_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| !p.is_required())
    }

    /// Type tag followed by aliases, in order, without repeats
    pub fn registration_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(1 + self.aliases.len());
        for name in std::iter::once(&self.type_tag).chain(&self.aliases) {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    /// Turn the input mapping into constructor kwargs.
    ///
    /// Optional parameters missing from the input keep their default as is;
    /// the loader only ever sees values the user wrote.
    pub fn compile_attrs(
        &self,
        input: &Map<String, Raw>,
        lookup: &dyn CategoryLookup,
    ) -> Result<Kwargs, CompileError> {
        if let Some(missing) = self.required_parameters().find(|p| !input.contains_key(p.name())) {
            return Err(CompileError::missing_required_parameter(&self.type_tag, missing.name()));
        }

        let mut kwargs = Kwargs::new();
        for param in self.optional_parameters() {
            if let Some(default) = param.default() {
                kwargs.insert(param.name(), default.clone());
            }
        }

        for param in self.required_parameters().chain(self.optional_parameters()) {
            if let Some(raw) = input.get(param.name()) {
                let value = param
                    .resolve(raw, lookup)
                    .map_err(|e| e.in_plugin(&self.type_tag))?;
                kwargs.insert(param.name(), value);
            }
        }

        for (key, raw) in input {
            if self.parameter(key).is_none() {
                debug!(plugin = %self.type_tag, key = %key, "passing through undeclared key");
                kwargs.insert(key.clone(), Value::from_raw(raw));
            }
        }
        Ok(kwargs)
    }

    pub fn compile(
        &self,
        input: &Map<String, Raw>,
        lookup: &dyn CategoryLookup,
    ) -> Result<Object, CompileError> {
        let kwargs = self.compile_attrs(input, lookup)?;
        self.builder
            .build(kwargs)
            .map_err(|e| CompileError::build(&self.type_tag, e))
    }

    /// `(type tag, schema)` for documentation and validation tooling
    pub fn to_json_schema(&self) -> (String, Raw) {
        let mut properties = Map::new();
        properties.insert("name".to_string(), json!({"type": "string"}));
        properties.insert("type".to_string(), json!({"type": "string", "enum": [self.type_tag]}));
        for param in &self.parameters {
            properties.insert(param.name().to_string(), param.to_json_schema());
        }
        let mut required = vec![Raw::from("type")];
        required.extend(self.required_parameters().map(|p| Raw::from(p.name())));

        let mut schema = Map::new();
        schema.insert("type".to_string(), Raw::from("object"));
        if let Some(description) = &self.description {
            schema.insert("description".to_string(), Raw::from(description.as_str()));
        }
        schema.insert("properties".to_string(), Raw::Object(properties));
        schema.insert("required".to_string(), Raw::Array(required));
        (self.type_tag.clone(), Raw::Object(schema))
    }
}

/// Declares a category: its canonical name and the aliases users may key it by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPlugin {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
}

impl CategoryPlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Anything a plugin module hands to the registry
#[derive(Debug, Clone)]
pub enum Plugin {
    Category(CategoryPlugin),
    Instance(Arc<InstanceCompilerPlugin>),
}

impl From<CategoryPlugin> for Plugin {
    fn from(plugin: CategoryPlugin) -> Self {
        Plugin::Category(plugin)
    }
}

impl From<InstanceCompilerPlugin> for Plugin {
    fn from(plugin: InstanceCompilerPlugin) -> Self {
        Plugin::Instance(Arc::new(plugin))
    }
}

impl From<Arc<InstanceCompilerPlugin>> for Plugin {
    fn from(plugin: Arc<InstanceCompilerPlugin>) -> Self {
        Plugin::Instance(plugin)
    }
}
