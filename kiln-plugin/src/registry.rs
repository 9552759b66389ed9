//! Plugin Registry
//!
//! The registry is an explicit value, not a global: each compile session
//! owns one (usually behind an `Arc`) and can `reset` it or clear its
//! objects without affecting any other session.

use crate::{CategoryCompiler, CategoryLookup, CategoryPlugin, Describable, InstanceCompilerPlugin, Loader, Plugin};
use kiln_core::{CompileError, Raw, Value};
use parking_lot::RwLock;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Normalize a user-supplied key: trimmed, lowercase, with hyphens and
/// whitespace runs turned into underscores
pub fn clean_input_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace('-', "_")
        .to_lowercase()
}

/// Central registry of category compilers
pub struct Registry {
    compilers: RwLock<HashMap<String, Arc<CategoryCompiler>>>,
    aliases: RwLock<HashMap<String, String>>,
    categories: RwLock<BTreeMap<String, CategoryPlugin>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            compilers: RwLock::new(HashMap::new()),
            aliases: RwLock::new(HashMap::new()),
            categories: RwLock::new(BTreeMap::new()),
        }
    }

    /// Builder: register plugins, failing on the first conflict
    pub fn with_plugins<I, P>(self, plugins: I) -> Result<Self, CompileError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Plugin>,
    {
        self.register_plugins(plugins)?;
        Ok(self)
    }

    /// Drop every compiler, alias and category declaration
    pub fn reset(&self) {
        debug!("resetting registry");
        self.compilers.write().clear();
        self.aliases.write().clear();
        self.categories.write().clear();
    }

    /// Forget compiled objects in every category; registrations stay
    pub fn clear_objects(&self) {
        for compiler in self.compilers.read().values() {
            compiler.clear_objects();
        }
    }

    // ========== Names ==========

    /// Canonical key for a category name or alias; unknown names come back
    /// cleaned but otherwise unchanged
    pub fn canonical_name(&self, name: &str) -> String {
        let key = clean_input_key(name);
        match self.aliases.read().get(&key) {
            Some(canonical) => canonical.clone(),
            None => key,
        }
    }

    /// Aliases registered for a category, sorted
    pub fn aliases_for(&self, category: &str) -> Vec<String> {
        let canonical = self.canonical_name(category);
        let mut aliases: Vec<String> = self
            .aliases
            .read()
            .iter()
            .filter(|(_, target)| **target == canonical)
            .map(|(alias, _)| alias.clone())
            .collect();
        aliases.sort_unstable();
        aliases
    }

    // ========== Compilers ==========

    /// The compiler for `name`, created empty if it does not exist yet
    pub fn get_or_create_compiler(&self, name: &str) -> Arc<CategoryCompiler> {
        let canonical = self.canonical_name(name);
        if let Some(compiler) = self.compilers.read().get(&canonical) {
            return compiler.clone();
        }
        self.compilers
            .write()
            .entry(canonical.clone())
            .or_insert_with(|| {
                debug!(category = %canonical, "creating category compiler");
                Arc::new(CategoryCompiler::new(canonical.clone()))
            })
            .clone()
    }

    /// The compiler for `name`, if one exists
    pub fn compiler(&self, name: &str) -> Option<Arc<CategoryCompiler>> {
        let canonical = self.canonical_name(name);
        self.compilers.read().get(&canonical).cloned()
    }

    /// Late-bound handle to a category; nothing is looked up until it is called
    pub fn compiler_for(&self, name: &str) -> CategoryProxy {
        CategoryProxy::new(name)
    }

    /// Canonical names of every category with a compiler, sorted
    pub fn categories(&self) -> Vec<String> {
        let mut names: Vec<String> = self.compilers.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn category_plugin(&self, name: &str) -> Option<CategoryPlugin> {
        let canonical = self.canonical_name(name);
        self.categories.read().get(&canonical).cloned()
    }

    // ========== Registration ==========

    /// Declare a category and its aliases
    pub fn register_category(&self, plugin: &CategoryPlugin) -> Result<(), CompileError> {
        let canonical = self.canonical_name(&plugin.name);
        let raw_key = clean_input_key(&plugin.name);
        if self.categories.read().contains_key(&canonical) || self.aliases.read().contains_key(&raw_key) {
            return Err(CompileError::duplicate_registration("category", &plugin.name));
        }

        let mut aliases: Vec<String> = Vec::new();
        for alias in &plugin.aliases {
            let alias_key = clean_input_key(alias);
            if alias_key == canonical || aliases.contains(&alias_key) {
                continue;
            }
            let taken = self.aliases.read().contains_key(&alias_key)
                || self.compilers.read().contains_key(&alias_key)
                || self.categories.read().contains_key(&alias_key);
            if taken {
                return Err(CompileError::duplicate_registration("category", alias)
                    .with_suggestion(format!("Alias '{}' of '{}' collides with an existing category", alias, plugin.name)));
            }
            aliases.push(alias_key);
        }

        debug!(category = %canonical, aliases = ?aliases, "registering category");
        self.categories.write().insert(canonical.clone(), plugin.clone());
        self.get_or_create_compiler(&canonical);
        let mut table = self.aliases.write();
        for alias in aliases {
            table.insert(alias, canonical.clone());
        }
        Ok(())
    }

    /// Register an instance plugin under its type tag and every alias in
    /// its category, creating the category compiler if needed
    pub fn register_builder(&self, plugin: Arc<InstanceCompilerPlugin>) -> Result<(), CompileError> {
        let compiler = self.get_or_create_compiler(plugin.category());
        let names = plugin.registration_names();
        compiler.register_builders(plugin.clone(), &names)
    }

    /// Register a batch of plugins: category declarations first, then
    /// instance plugins in the order given
    pub fn register_plugins<I, P>(&self, plugins: I) -> Result<(), CompileError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Plugin>,
    {
        let (categories, instances): (Vec<Plugin>, Vec<Plugin>) = plugins
            .into_iter()
            .map(Into::<Plugin>::into)
            .partition(|p| matches!(p, Plugin::Category(_)));
        for plugin in categories.into_iter().chain(instances) {
            match plugin {
                Plugin::Category(category) => self.register_category(&category)?,
                Plugin::Instance(instance) => self.register_builder(instance)?,
            }
        }
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryLookup for Registry {
    fn canonical_name(&self, name: &str) -> String {
        Registry::canonical_name(self, name)
    }

    fn resolve(&self, name: &str) -> Option<Arc<CategoryCompiler>> {
        self.compiler(name)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("categories", &self.categories())
            .field("aliases", &*self.aliases.read())
            .finish()
    }
}

/// Deferred handle to a category compiler.
///
/// Plugins reference other categories through proxies so that the order in
/// which plugin modules are loaded does not matter: the category is looked
/// up when the proxy is called, not when it is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryProxy {
    category: String,
}

impl CategoryProxy {
    pub fn new(category: impl Into<String>) -> Self {
        Self { category: category.into() }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn call(&self, raw: &Raw, lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        let compiler = lookup
            .resolve(&self.category)
            .ok_or_else(|| CompileError::unresolved_compiler(&self.category))?;
        compiler.call(raw, lookup)
    }
}

impl Loader for CategoryProxy {
    fn load(&self, raw: &Raw, lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        self.call(raw, lookup)
    }

    fn describe(&self) -> Option<&dyn Describable> {
        Some(self)
    }
}

impl Describable for CategoryProxy {
    fn json_type(&self) -> Option<Raw> {
        Some(json!({ "$ref": format!("#/definitions/{}_type", clean_input_key(&self.category)) }))
    }

    fn description(&self) -> Option<String> {
        Some(format!(
            "A {} object: either the name of one defined earlier or an inline description",
            clean_input_key(&self.category)
        ))
    }
}
