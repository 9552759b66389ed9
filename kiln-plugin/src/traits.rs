//! Loader traits

use crate::CategoryCompiler;
use kiln_core::{CompileError, LoadError, Raw, Value};
use std::sync::Arc;

/// Optional self-description a loader may expose.
///
/// A `Parameter` without an explicit json type or description borrows them
/// from its loader through this trait.
pub trait Describable {
    fn json_type(&self) -> Option<Raw>;
    fn description(&self) -> Option<String>;
}

/// Resolution of category names to live compilers, at call time
pub trait CategoryLookup {
    /// Canonical key for a category name or alias
    fn canonical_name(&self, name: &str) -> String;

    /// The compiler for `name`, if that category has ever been created
    fn resolve(&self, name: &str) -> Option<Arc<CategoryCompiler>>;
}

/// Turns one raw input value into a typed value
pub trait Loader: Send + Sync {
    fn load(&self, raw: &Raw, lookup: &dyn CategoryLookup) -> Result<Value, CompileError>;

    fn describe(&self) -> Option<&dyn Describable> {
        None
    }
}

impl<L: Loader + ?Sized> Loader for Arc<L> {
    fn load(&self, raw: &Raw, lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        (**self).load(raw, lookup)
    }

    fn describe(&self) -> Option<&dyn Describable> {
        (**self).describe()
    }
}

/// Loader backed by a plain function of the raw value
pub struct FnLoader<F> {
    f: F,
    json_type: Option<Raw>,
    description: Option<String>,
}

/// Wrap a function as a loader
pub fn loader_fn<F>(f: F) -> FnLoader<F>
where
    F: Fn(&Raw) -> Result<Value, LoadError> + Send + Sync,
{
    FnLoader { f, json_type: None, description: None }
}

impl<F> FnLoader<F> {
    pub fn with_json_type(mut self, json_type: Raw) -> Self {
        self.json_type = Some(json_type);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl<F> Loader for FnLoader<F>
where
    F: Fn(&Raw) -> Result<Value, LoadError> + Send + Sync,
{
    fn load(&self, raw: &Raw, _lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        (self.f)(raw).map_err(CompileError::from)
    }

    fn describe(&self) -> Option<&dyn Describable> {
        if self.json_type.is_none() && self.description.is_none() {
            return None;
        }
        Some(self)
    }
}

impl<F> Describable for FnLoader<F> {
    fn json_type(&self) -> Option<Raw> {
        self.json_type.clone()
    }

    fn description(&self) -> Option<String> {
        self.description.clone()
    }
}
