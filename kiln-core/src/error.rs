//! Structured compile errors
//!
//! Every error is an input error: bad user configuration or bad plugin
//! registration. Errors carry a machine-readable code plus enough context
//! (category, plugin, parameter, name) to locate the root cause in the
//! original input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error codes (machine-readable)
pub mod codes {
    pub const MISSING_REQUIRED_PARAMETER: &str = "MISSING_REQUIRED_PARAMETER";
    pub const UNKNOWN_NAME: &str = "UNKNOWN_NAME";
    pub const UNKNOWN_TYPE: &str = "UNKNOWN_TYPE";
    pub const DUPLICATE_NAME: &str = "DUPLICATE_NAME";
    pub const DUPLICATE_REGISTRATION: &str = "DUPLICATE_REGISTRATION";
    pub const UNRESOLVED_COMPILER: &str = "UNRESOLVED_COMPILER";
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const INVALID_PLUGIN: &str = "INVALID_PLUGIN";
    pub const LOAD_ERROR: &str = "LOAD_ERROR";
    pub const BUILD_ERROR: &str = "BUILD_ERROR";
    pub const UNKNOWN_CONSTRUCTOR: &str = "UNKNOWN_CONSTRUCTOR";
    pub const UNKNOWN_CATEGORY: &str = "UNKNOWN_CATEGORY";
}

/// Error raised by a loader while turning a raw value into a typed one
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("expected {expected}, got {got}")]
    TypeMismatch { expected: &'static str, got: &'static str },

    #[error("cannot evaluate '{0}'")]
    Expression(String),

    #[error("expected an integer, got {0}")]
    NotAnInteger(f64),

    #[error("expected a strictly positive value, got {0}")]
    NotPositive(String),

    #[error("'{got}' is not one of: {}", choices.join(", "))]
    InvalidChoice { got: String, choices: Vec<String> },

    #[error("{0}")]
    Invalid(String),
}

/// Error raised by a raw constructor
#[derive(Debug, Clone, Error)]
pub enum BuildError {
    #[error("missing argument '{0}'")]
    MissingArgument(String),

    #[error("argument '{arg}': expected {expected}, got {got}")]
    WrongType { arg: String, expected: &'static str, got: &'static str },

    #[error("{0}")]
    Invalid(String),
}

/// Where an error occurred
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Category being compiled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Plugin (type tag) being compiled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,

    /// Parameter being resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,

    /// Object name involved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Propagation notes, innermost first
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

/// Structured compile error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Where the error occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

impl CompileError {
    /// Create a new error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            context: None,
        }
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    // The location builders keep the innermost value: an error raised deep
    // inside a nested compile keeps pointing at the place it was raised.

    /// Builder: set category context
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.category.get_or_insert_with(|| category.into());
        self
    }

    /// Builder: set plugin context
    pub fn in_plugin(mut self, plugin: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.plugin.get_or_insert_with(|| plugin.into());
        self
    }

    /// Builder: set parameter context
    pub fn for_parameter(mut self, parameter: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.parameter.get_or_insert_with(|| parameter.into());
        self
    }

    /// Builder: set object name context
    pub fn for_name(mut self, name: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.name.get_or_insert_with(|| name.into());
        self
    }

    /// Builder: add propagation note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.notes.push(note.into());
        self
    }

    pub fn category(&self) -> Option<&str> {
        self.context.as_ref()?.category.as_deref()
    }

    pub fn plugin(&self) -> Option<&str> {
        self.context.as_ref()?.plugin.as_deref()
    }

    pub fn parameter(&self) -> Option<&str> {
        self.context.as_ref()?.parameter.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.context.as_ref()?.name.as_deref()
    }

    // ========== Common Error Constructors ==========

    pub fn missing_required_parameter(plugin: &str, parameter: &str) -> Self {
        Self::new(
            codes::MISSING_REQUIRED_PARAMETER,
            format!("'{}' requires parameter '{}'", plugin, parameter),
        )
        .with_suggestion(format!("Add '{}' to the '{}' description", parameter, plugin))
        .in_plugin(plugin)
        .for_parameter(parameter)
    }

    pub fn unknown_name(category: &str, name: &str, known: &[String]) -> Self {
        let err = Self::new(
            codes::UNKNOWN_NAME,
            format!("No object named '{}' in category '{}'", name, category),
        )
        .in_category(category)
        .for_name(name);
        match known {
            [] => err.with_suggestion(format!(
                "Nothing has been named in '{}' yet; check the compile order",
                category
            )),
            _ => err.with_suggestion(format!("Known names: {}", preview(known))),
        }
    }

    pub fn unknown_type(category: &str, type_tag: &str, known: &[String]) -> Self {
        Self::new(
            codes::UNKNOWN_TYPE,
            format!("Unknown type '{}' in category '{}'", type_tag, category),
        )
        .with_suggestion(format!("Known types: {}", preview(known)))
        .in_category(category)
        .in_plugin(type_tag)
    }

    pub fn duplicate_name(category: &str, name: &str) -> Self {
        Self::new(
            codes::DUPLICATE_NAME,
            format!("Name '{}' is already used in category '{}'", name, category),
        )
        .with_suggestion("Names must be unique within a category")
        .in_category(category)
        .for_name(name)
    }

    pub fn duplicate_registration(what: &str, name: &str) -> Self {
        Self::new(
            codes::DUPLICATE_REGISTRATION,
            format!("The {} '{}' has been reserved by another plugin", what, name),
        )
    }

    pub fn unresolved_compiler(category: &str) -> Self {
        Self::new(
            codes::UNRESOLVED_COMPILER,
            format!("No {} compiler registered", category),
        )
        .with_suggestion("Load the plugin that provides this category")
        .in_category(category)
    }

    pub fn invalid_input(details: impl Into<String>) -> Self {
        Self::new(codes::INVALID_INPUT, format!("Invalid input: {}", details.into()))
    }

    pub fn invalid_plugin(plugin: &str, details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_PLUGIN,
            format!("Invalid plugin '{}': {}", plugin, details.into()),
        )
        .in_plugin(plugin)
    }

    pub fn unknown_constructor(path: &str) -> Self {
        Self::new(
            codes::UNKNOWN_CONSTRUCTOR,
            format!("No constructor registered as '{}'", path),
        )
        .with_suggestion("Register the constructor before creating builders that use it")
    }

    pub fn unknown_category(category: &str, order: &[String]) -> Self {
        Self::new(
            codes::UNKNOWN_CATEGORY,
            format!("Category '{}' is not in the compile order", category),
        )
        .with_suggestion(format!("Compile order: {}", order.join(", ")))
        .in_category(category)
    }

    pub fn build(plugin: &str, err: BuildError) -> Self {
        Self::new(codes::BUILD_ERROR, format!("Cannot build '{}': {}", plugin, err)).in_plugin(plugin)
    }
}

/// Comma-separated preview of at most five entries
fn preview(items: &[String]) -> String {
    let mut shown: Vec<&str> = items.iter().take(5).map(String::as_str).collect();
    if items.len() > 5 {
        shown.push("...");
    }
    shown.join(", ")
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

impl From<LoadError> for CompileError {
    fn from(err: LoadError) -> Self {
        Self::new(codes::LOAD_ERROR, err.to_string())
    }
}
