//! Builders: uniform adapters around raw constructors

use kiln_core::{BuildError, CompileError, Kwargs, Object};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A raw constructor: keyword arguments in, object out
pub type Constructor = Arc<dyn Fn(Kwargs) -> Result<Object, BuildError> + Send + Sync>;

/// Pre-processing applied to the kwargs before the raw constructor runs
pub type Remap = Arc<dyn Fn(Kwargs) -> Kwargs + Send + Sync>;

/// Post-processing receiving the built object and the kwargs as they were
/// before remapping
pub type AfterBuild = Arc<dyn Fn(Object, &Kwargs) -> Result<Object, BuildError> + Send + Sync>;

/// Adapts a raw constructor into a uniform callable with optional remap and
/// after-build hooks
#[derive(Clone)]
pub struct Builder {
    constructor: Constructor,
    path: Option<String>,
    remap: Option<Remap>,
    after_build: Option<AfterBuild>,
}

impl Builder {
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn(Kwargs) -> Result<Object, BuildError> + Send + Sync + 'static,
    {
        Self {
            constructor: Arc::new(constructor),
            path: None,
            remap: None,
            after_build: None,
        }
    }

    /// Builder for a constructor registered under a fully-qualified name.
    ///
    /// The name is resolved here, once, so a typo fails at plugin creation
    /// rather than in the middle of a compile.
    pub fn from_registry(constructors: &ConstructorRegistry, path: &str) -> Result<Self, CompileError> {
        let constructor = constructors
            .get(path)
            .ok_or_else(|| CompileError::unknown_constructor(path))?;
        Ok(Self {
            constructor,
            path: Some(path.to_string()),
            remap: None,
            after_build: None,
        })
    }

    pub fn with_remap<F>(mut self, remap: F) -> Self
    where
        F: Fn(Kwargs) -> Kwargs + Send + Sync + 'static,
    {
        self.remap = Some(Arc::new(remap));
        self
    }

    pub fn with_after_build<F>(mut self, after_build: F) -> Self
    where
        F: Fn(Object, &Kwargs) -> Result<Object, BuildError> + Send + Sync + 'static,
    {
        self.after_build = Some(Arc::new(after_build));
        self
    }

    /// Name the constructor was resolved from, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn build(&self, kwargs: Kwargs) -> Result<Object, BuildError> {
        let original = self.after_build.as_ref().map(|_| kwargs.clone());
        let kwargs = match &self.remap {
            Some(remap) => remap(kwargs),
            None => kwargs,
        };
        let object = (self.constructor)(kwargs)?;
        match (&self.after_build, original) {
            (Some(after_build), Some(original)) => after_build(object, &original),
            _ => Ok(object),
        }
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("path", &self.path)
            .field("remap", &self.remap.is_some())
            .field("after_build", &self.after_build.is_some())
            .finish()
    }
}

/// Name-to-constructor table.
///
/// Lets plugin definitions refer to constructors by a fully-qualified name
/// that is looked up when the builder is created.
#[derive(Clone, Default)]
pub struct ConstructorRegistry {
    constructors: HashMap<String, Constructor>,
}

impl ConstructorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constructor<F>(mut self, path: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(Kwargs) -> Result<Object, BuildError> + Send + Sync + 'static,
    {
        let path = path.into();
        debug!(%path, "registering constructor");
        self.constructors.insert(path, Arc::new(constructor));
        self
    }

    pub fn get(&self, path: &str) -> Option<Constructor> {
        self.constructors.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.constructors.contains_key(path)
    }

    /// Registered names, sorted
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}
