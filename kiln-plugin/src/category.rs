//! Category compilers
//!
//! A category compiler owns one category: the dispatch table from type tag
//! to plugin, the objects named so far and every object built in the
//! category. Locks are only ever held for a lookup or an insert, never while
//! a plugin runs, so a plugin may compile nested descriptions of its own
//! category.

use crate::{CategoryLookup, InstanceCompilerPlugin};
use kiln_core::{CompileError, Object, ObjectRef, Raw, Value, codes};
use parking_lot::RwLock;
use serde_json::Map;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

pub struct CategoryCompiler {
    label: String,
    type_dispatch: RwLock<HashMap<String, Arc<InstanceCompilerPlugin>>>,
    named_objects: RwLock<HashMap<String, ObjectRef>>,
    all_objects: RwLock<Vec<ObjectRef>>,
}

impl CategoryCompiler {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            type_dispatch: RwLock::new(HashMap::new()),
            named_objects: RwLock::new(HashMap::new()),
            all_objects: RwLock::new(Vec::new()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    // ========== Registration ==========

    /// Bind `tag` to `plugin`.
    ///
    /// Re-registering the same plugin under the same tag is a no-op; a
    /// different plugin under an occupied tag is an error.
    pub fn register_builder(&self, plugin: Arc<InstanceCompilerPlugin>, tag: &str) -> Result<(), CompileError> {
        self.register_builders(plugin, &[tag])
    }

    /// Bind every tag to `plugin`, or none of them if any tag is taken
    pub fn register_builders(&self, plugin: Arc<InstanceCompilerPlugin>, tags: &[&str]) -> Result<(), CompileError> {
        let mut dispatch = self.type_dispatch.write();
        for tag in tags {
            if let Some(existing) = dispatch.get(*tag) {
                if !Arc::ptr_eq(existing, &plugin) {
                    return Err(CompileError::duplicate_registration("type", tag)
                        .with_suggestion(format!(
                            "'{}' is already provided by plugin '{}'",
                            tag,
                            existing.name()
                        ))
                        .in_category(&self.label)
                        .in_plugin(plugin.name()));
                }
            }
        }
        for tag in tags {
            if !dispatch.contains_key(*tag) {
                debug!(category = %self.label, tag = %tag, plugin = %plugin.name(), "registering builder");
                dispatch.insert(tag.to_string(), plugin.clone());
            }
        }
        Ok(())
    }

    /// Register a compiled object, binding it to `name` if one is given
    pub fn register_object(&self, mut object: Object, name: Option<&str>) -> Result<ObjectRef, CompileError> {
        object.set_category(self.label.clone());
        let object = match name {
            Some(name) => {
                let mut named = self.named_objects.write();
                if named.contains_key(name) {
                    return Err(CompileError::duplicate_name(&self.label, name));
                }
                object.set_name(name);
                let object = object.into_ref();
                named.insert(name.to_string(), object.clone());
                object
            }
            None => object.into_ref(),
        };
        self.all_objects.write().push(object.clone());
        Ok(object)
    }

    // ========== Compilation ==========

    /// Compile one description: a name of an existing object, or a mapping
    /// with a `type` (and optionally a `name`)
    pub fn compile(&self, raw: &Raw, lookup: &dyn CategoryLookup) -> Result<ObjectRef, CompileError> {
        match raw {
            Raw::String(name) => self.get_named(name).ok_or_else(|| {
                CompileError::unknown_name(&self.label, name, &self.names())
            }),
            Raw::Object(map) => self.compile_map(map, lookup),
            other => Err(CompileError::invalid_input(format!(
                "a {} description must be a name or a mapping, got {}",
                self.label,
                Value::raw_type_name(other)
            ))
            .in_category(&self.label)),
        }
    }

    /// Compile a description or a list of them, keeping the shape
    pub fn call(&self, raw: &Raw, lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        match raw {
            Raw::Array(items) => items
                .iter()
                .map(|item| self.compile(item, lookup).map(Value::Object))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            single => self.compile(single, lookup).map(Value::Object),
        }
    }

    fn compile_map(&self, map: &Map<String, Raw>, lookup: &dyn CategoryLookup) -> Result<ObjectRef, CompileError> {
        let mut input = map.clone();
        let name = match input.remove("name") {
            None | Some(Raw::Null) => None,
            Some(Raw::String(name)) => Some(name),
            Some(other) => {
                return Err(CompileError::invalid_input(format!(
                    "'name' must be text, got {}",
                    Value::raw_type_name(&other)
                ))
                .in_category(&self.label));
            }
        };
        let type_tag = match input.remove("type") {
            Some(Raw::String(tag)) => tag,
            None => {
                return Err(CompileError::new(
                    codes::MISSING_REQUIRED_PARAMETER,
                    format!("{} description is missing 'type'", self.label),
                )
                .with_suggestion(format!("Known types: {}", self.type_tags().join(", ")))
                .in_category(&self.label)
                .for_parameter("type"));
            }
            Some(other) => {
                return Err(CompileError::invalid_input(format!(
                    "'type' must be text, got {}",
                    Value::raw_type_name(&other)
                ))
                .in_category(&self.label));
            }
        };

        let plugin = self
            .plugin_for(&type_tag)
            .ok_or_else(|| CompileError::unknown_type(&self.label, &type_tag, &self.type_tags()))?;

        debug!(category = %self.label, type_tag = %type_tag, name = ?name, "compiling description");
        let object = plugin.compile(&input, lookup).map_err(|e| {
            let e = e.in_category(&self.label);
            match &name {
                Some(name) => e.with_note(format!("while compiling {} '{}'", self.label, name)),
                None => e.with_note(format!("while compiling a {} of type '{}'", self.label, type_tag)),
            }
        })?;
        self.register_object(object, name.as_deref())
    }

    // ========== Lookup ==========

    pub fn get_named(&self, name: &str) -> Option<ObjectRef> {
        self.named_objects.read().get(name).cloned()
    }

    /// Names bound so far, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.named_objects.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn named_objects(&self) -> BTreeMap<String, ObjectRef> {
        self.named_objects
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Every object compiled in this category, in compile order
    pub fn all_objects(&self) -> Vec<ObjectRef> {
        self.all_objects.read().clone()
    }

    pub fn plugin_for(&self, tag: &str) -> Option<Arc<InstanceCompilerPlugin>> {
        self.type_dispatch.read().get(tag).cloned()
    }

    /// Registered tags (type tags and aliases), sorted
    pub fn type_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.type_dispatch.read().keys().cloned().collect();
        tags.sort_unstable();
        tags
    }

    /// Distinct plugins, ordered by type tag
    pub fn plugins(&self) -> Vec<Arc<InstanceCompilerPlugin>> {
        let mut plugins: Vec<Arc<InstanceCompilerPlugin>> = Vec::new();
        for plugin in self.type_dispatch.read().values() {
            if !plugins.iter().any(|p| Arc::ptr_eq(p, plugin)) {
                plugins.push(plugin.clone());
            }
        }
        plugins.sort_by(|a, b| a.name().cmp(b.name()));
        plugins
    }

    /// Forget every compiled object; plugin registrations stay
    pub fn clear_objects(&self) {
        self.named_objects.write().clear();
        self.all_objects.write().clear();
    }

    /// `{type tag -> schema}` for every distinct plugin
    pub fn to_json_schema(&self) -> Raw {
        let schemas: Map<String, Raw> = self
            .plugins()
            .iter()
            .map(|plugin| plugin.to_json_schema())
            .collect();
        Raw::Object(schemas)
    }
}

impl std::fmt::Debug for CategoryCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryCompiler")
            .field("label", &self.label)
            .field("type_tags", &self.type_tags())
            .field("names", &self.names())
            .field("objects", &self.all_objects.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Builder, CategoryProxy, Parameter, Registry, loader_fn};
    use kiln_core::{Kwargs, LoadError};
    use serde_json::json;

    fn number(raw: &Raw) -> Result<Value, LoadError> {
        raw.as_f64()
            .map(Value::Float)
            .ok_or(LoadError::TypeMismatch { expected: "Float", got: Value::raw_type_name(raw) })
    }

    fn coordinate() -> Arc<InstanceCompilerPlugin> {
        Arc::new(
            InstanceCompilerPlugin::new(
                "coordinate",
                "cv",
                vec![Parameter::optional("atom", loader_fn(number), 0i64)],
                Builder::new(|kwargs: Kwargs| Ok(Object::new("coordinate", kwargs))),
            )
            .unwrap(),
        )
    }

    fn union() -> Arc<InstanceCompilerPlugin> {
        Arc::new(
            InstanceCompilerPlugin::new(
                "union",
                "volume",
                vec![Parameter::required("subvolumes", CategoryProxy::new("volume"))],
                Builder::new(|kwargs: Kwargs| {
                    let parts = kwargs.objects("subvolumes")?;
                    Ok(Object::new("union", parts))
                }),
            )
            .unwrap(),
        )
    }

    fn cv_compiler() -> CategoryCompiler {
        let compiler = CategoryCompiler::new("cv");
        compiler.register_builder(coordinate(), "coordinate").unwrap();
        compiler
    }

    #[test]
    fn test_named_object_by_reference() {
        let registry = Registry::new();
        let compiler = cv_compiler();
        let built = compiler.compile(&json!({"type": "coordinate", "name": "x"}), &registry).unwrap();
        let found = compiler.compile(&json!("x"), &registry).unwrap();
        assert!(ObjectRef::ptr_eq(&built, &found));
        assert_eq!(built.name(), Some("x"));
        assert_eq!(built.category(), Some("cv"));
    }

    #[test]
    fn test_unknown_name() {
        let registry = Registry::new();
        let err = cv_compiler().compile(&json!("x"), &registry).unwrap_err();
        assert!(err.is(codes::UNKNOWN_NAME));
        assert_eq!(err.category(), Some("cv"));
        assert_eq!(err.name(), Some("x"));
    }

    #[test]
    fn test_unknown_and_missing_type() {
        let registry = Registry::new();
        let compiler = cv_compiler();
        let err = compiler.compile(&json!({"type": "distance"}), &registry).unwrap_err();
        assert!(err.is(codes::UNKNOWN_TYPE));
        assert!(err.suggestion.unwrap().contains("coordinate"));

        let err = compiler.compile(&json!({"name": "x"}), &registry).unwrap_err();
        assert!(err.is(codes::MISSING_REQUIRED_PARAMETER));
        assert_eq!(err.parameter(), Some("type"));
        // nothing was registered
        assert!(compiler.get_named("x").is_none());
    }

    #[test]
    fn test_invalid_description_shape() {
        let registry = Registry::new();
        let err = cv_compiler().compile(&json!(3), &registry).unwrap_err();
        assert!(err.is(codes::INVALID_INPUT));
    }

    #[test]
    fn test_duplicate_name_not_registered_anywhere() {
        let registry = Registry::new();
        let compiler = cv_compiler();
        let first = compiler.compile(&json!({"type": "coordinate", "name": "x"}), &registry).unwrap();
        let err = compiler
            .compile(&json!({"type": "coordinate", "name": "x", "atom": 3}), &registry)
            .unwrap_err();
        assert!(err.is(codes::DUPLICATE_NAME));
        assert_eq!(compiler.all_objects().len(), 1);
        assert!(ObjectRef::ptr_eq(&compiler.get_named("x").unwrap(), &first));
    }

    #[test]
    fn test_all_objects_in_compile_order() {
        let registry = Registry::new();
        let compiler = cv_compiler();
        compiler.compile(&json!({"type": "coordinate", "atom": 1}), &registry).unwrap();
        compiler.compile(&json!({"type": "coordinate", "name": "y"}), &registry).unwrap();
        compiler.compile(&json!("y"), &registry).unwrap();
        let all = compiler.all_objects();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name(), None);
        assert_eq!(all[1].name(), Some("y"));
        assert_eq!(compiler.names(), vec!["y".to_string()]);
    }

    #[test]
    fn test_call_preserves_list_shape() {
        let registry = Registry::new();
        let compiler = cv_compiler();
        compiler.compile(&json!({"type": "coordinate", "name": "x"}), &registry).unwrap();

        let single = compiler.call(&json!("x"), &registry).unwrap();
        assert!(single.as_object().is_some());

        let many = compiler
            .call(&json!(["x", {"type": "coordinate", "atom": 2}]), &registry)
            .unwrap();
        assert_eq!(many.as_list().map(|l| l.len()), Some(2));
    }

    #[test]
    fn test_idempotent_registration() {
        let compiler = CategoryCompiler::new("cv");
        let plugin = coordinate();
        compiler.register_builder(plugin.clone(), "coordinate").unwrap();
        compiler.register_builder(plugin.clone(), "coordinate").unwrap();
        assert_eq!(compiler.type_tags(), vec!["coordinate".to_string()]);
        assert!(Arc::ptr_eq(&compiler.plugin_for("coordinate").unwrap(), &plugin));

        let err = compiler.register_builder(coordinate(), "coordinate").unwrap_err();
        assert!(err.is(codes::DUPLICATE_REGISTRATION));
        assert!(Arc::ptr_eq(&compiler.plugin_for("coordinate").unwrap(), &plugin));
    }

    #[test]
    fn test_register_builders_all_or_nothing() {
        let compiler = cv_compiler();
        let other = coordinate();
        let err = compiler.register_builders(other, &["position", "coordinate"]).unwrap_err();
        assert!(err.is(codes::DUPLICATE_REGISTRATION));
        assert!(compiler.plugin_for("position").is_none());
    }

    #[test]
    fn test_nested_same_category_compile() {
        let registry = Registry::new();
        let volume = registry.get_or_create_compiler("volume");
        volume.register_builder(union(), "union").unwrap();
        let inner = json!({"type": "union", "name": "empty", "subvolumes": []});
        let outer = json!({"type": "union", "name": "outer", "subvolumes": [inner, "empty"]});
        let built = volume.compile(&outer, &registry).unwrap();
        let parts = built.payload::<Vec<ObjectRef>>().unwrap();
        assert_eq!(parts.len(), 2);
        assert!(ObjectRef::ptr_eq(&parts[0], &parts[1]));
        // inner object registered before the outer one
        let names: Vec<_> = volume.all_objects().iter().map(|o| o.name().map(String::from)).collect();
        assert_eq!(names, vec![Some("empty".to_string()), Some("outer".to_string())]);
    }

    #[test]
    fn test_clear_objects_keeps_plugins() {
        let registry = Registry::new();
        let compiler = cv_compiler();
        compiler.compile(&json!({"type": "coordinate", "name": "x"}), &registry).unwrap();
        compiler.clear_objects();
        assert!(compiler.all_objects().is_empty());
        assert!(compiler.get_named("x").is_none());
        assert!(compiler.plugin_for("coordinate").is_some());
    }

    #[test]
    fn test_schema_per_distinct_plugin() {
        let compiler = CategoryCompiler::new("cv");
        let plugin = coordinate();
        compiler.register_builders(plugin, &["coordinate", "position"]).unwrap();
        let schema = compiler.to_json_schema();
        let map = schema.as_object().unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("coordinate"));
    }
}
