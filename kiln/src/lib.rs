//! Kiln - declarative configuration compiler
//!
//! Compiles a document mapping category names to object descriptions into
//! constructed objects, one category at a time in a configured order so
//! that later categories can refer to objects named in earlier ones.

pub mod config;
pub mod docs;
pub mod schema;

pub use config::{CompileConfig, ConfigError, UnknownCategoryPolicy, DEFAULT_COMPILE_ORDER};
pub use docs::Renderer;

use kiln_core::{CompileError, ObjectRef, Raw, Value};
use kiln_plugin::Registry;
use serde_json::Map;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Main Kiln compile driver
pub struct Kiln {
    registry: Arc<Registry>,
    config: CompileConfig,
}

impl Kiln {
    pub fn new(registry: Registry) -> Self {
        Self::from_shared(Arc::new(registry))
    }

    /// Driver over a registry shared with other owners
    pub fn from_shared(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            config: CompileConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CompileConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Compile every description in `input`.
    ///
    /// Returns the constructed objects in compile order. The first error
    /// aborts the whole session; objects registered before it stay in the
    /// registry until `reset_session`.
    pub fn compile_all(&self, input: &Raw) -> Result<Vec<ObjectRef>, CompileError> {
        let sections = input.as_object().ok_or_else(|| {
            CompileError::invalid_input(format!(
                "Expected a mapping of category names to descriptions, got {}",
                Value::raw_type_name(input)
            ))
        })?;
        info!(categories = sections.len(), "compile session started");

        let mut objects = Vec::new();
        for key in self.sorted_categories(sections)? {
            let compiler = self.registry.get_or_create_compiler(key);
            let descriptions = match &sections[key] {
                Raw::Array(items) => items.as_slice(),
                single => std::slice::from_ref(single),
            };
            debug!(category = %compiler.label(), count = descriptions.len(), "compiling category");
            for description in descriptions {
                let object = compiler
                    .compile(description, &*self.registry)
                    .map_err(|e| e.in_category(compiler.label()))?;
                objects.push(object);
            }
        }

        info!(objects = objects.len(), "compile session finished");
        Ok(objects)
    }

    /// Input keys in the order their categories compile.
    ///
    /// Keys are ranked by the position of their canonical name in the
    /// compile order; the sort is stable so keys of the same category, and
    /// keys missing from the order, keep their input order.
    pub fn sorted_categories<'a>(&self, sections: &'a Map<String, Raw>) -> Result<Vec<&'a str>, CompileError> {
        let order: Vec<String> = self
            .config
            .compile_order
            .iter()
            .map(|c| self.registry.canonical_name(c))
            .collect();

        let mut ranked = Vec::with_capacity(sections.len());
        for key in sections.keys() {
            let canonical = self.registry.canonical_name(key);
            let rank = match order.iter().position(|c| *c == canonical) {
                Some(rank) => rank,
                None => match self.config.unknown_categories {
                    UnknownCategoryPolicy::Reject => {
                        return Err(CompileError::unknown_category(&canonical, &order));
                    }
                    UnknownCategoryPolicy::Last => {
                        warn!(category = %canonical, "category not in compile order, compiling it last");
                        order.len()
                    }
                },
            };
            ranked.push((rank, key.as_str()));
        }
        ranked.sort_by_key(|(rank, _)| *rank);
        Ok(ranked.into_iter().map(|(_, key)| key).collect())
    }

    /// Forget compiled objects so the next document starts clean; plugin
    /// registrations stay
    pub fn reset_session(&self) {
        debug!("resetting compile session");
        self.registry.clear_objects();
    }

    pub fn json_schema(&self) -> Raw {
        schema::document_schema(&self.registry)
    }

    pub fn docs(&self, category: Option<&str>) -> Result<String, CompileError> {
        Renderer::new().render(&self.registry, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{Kwargs, Object, codes};
    use kiln_plugin::{Builder, CategoryProxy, InstanceCompilerPlugin, Parameter, Plugin};
    use kiln_sampling::{Interval, ToyEngine, Tps};
    use kiln_std::{EvalFloat, Passthrough, Text};
    use serde_json::json;

    fn sampling() -> Kiln {
        Kiln::new(kiln_sampling::standard_registry().unwrap())
    }

    fn record(tag: &str, category: &str, parameters: Vec<Parameter>) -> Plugin {
        InstanceCompilerPlugin::new(
            tag,
            category,
            parameters,
            Builder::new(|kwargs: Kwargs| Ok(Object::new("record", kwargs))),
        )
        .unwrap()
        .into()
    }

    fn kinds(objects: &[ObjectRef]) -> Vec<String> {
        objects
            .iter()
            .map(|o| format!("{}:{}", o.category().unwrap_or("?"), o.name().unwrap_or("-")))
            .collect()
    }

    #[test]
    fn test_example_scenario() {
        let kiln = sampling().with_config(CompileConfig::new().with_compile_order(["cv", "volume"]));
        let input = json!({
            "cv": [{"type": "coordinate", "name": "x"}],
            "volume": [{"type": "interval", "name": "A", "cv": "x", "min": 0, "max": 1}]
        });
        let objects = kiln.compile_all(&input).unwrap();
        assert_eq!(objects.len(), 2);

        let x = kiln.registry().compiler("cv").unwrap().get_named("x").unwrap();
        assert!(ObjectRef::ptr_eq(&objects[0], &x));
        let interval = objects[1].payload::<Interval>().unwrap();
        assert!(ObjectRef::ptr_eq(&interval.cv, &x));
    }

    #[test]
    fn test_reversed_order_is_unknown_name() {
        let kiln = sampling().with_config(CompileConfig::new().with_compile_order(["volume", "cv"]));
        let input = json!({
            "cv": [{"type": "coordinate", "name": "x"}],
            "volume": [{"type": "interval", "name": "A", "cv": "x", "min": 0, "max": 1}]
        });
        let err = kiln.compile_all(&input).unwrap_err();
        assert!(err.is(codes::UNKNOWN_NAME));
        assert_eq!(err.name(), Some("x"));
        assert_eq!(err.category(), Some("cv"));
        assert_eq!(err.parameter(), Some("cv"));
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let registry = Registry::new()
            .with_plugins(vec![
                record("sim", "engine", vec![Parameter::required("dt", EvalFloat)]),
                record("coord", "cv", vec![Parameter::required("engine", CategoryProxy::new("engine"))]),
                record("box", "volume", vec![Parameter::required("cv", CategoryProxy::new("cv"))]),
            ])
            .unwrap();
        let kiln = Kiln::new(registry).with_config(CompileConfig::new().with_compile_order(["engine", "cv", "volume"]));
        let input = json!({
            "volume": [{"type": "box", "name": "A", "cv": "x"}],
            "cv": [{"type": "coord", "name": "x", "engine": "md"}],
            "engine": [{"type": "sim", "name": "md", "dt": 0.5}]
        });

        let objects = kiln.compile_all(&input).unwrap();
        assert_eq!(kinds(&objects), vec!["engine:md", "cv:x", "volume:A"]);
        let cv = objects[1].payload::<Kwargs>().unwrap().object("engine").unwrap().clone();
        assert!(ObjectRef::ptr_eq(&cv, &objects[0]));
    }

    #[test]
    fn test_alias_keys_compile_like_canonical() {
        let input = |key: &str| {
            json!({
                "cv": [{"type": "coordinate", "name": "x"}],
                key: [{"type": "interval", "name": "A", "cv": "x", "min": 0, "max": 1}]
            })
        };
        for key in ["volume", "Volumes", "States"] {
            let kiln = sampling();
            let objects = kiln.compile_all(&input(key)).unwrap();
            assert_eq!(kinds(&objects), vec!["cv:x", "volume:A"]);
            assert!(kiln.registry().compiler(key).unwrap().get_named("A").is_some());
            assert_eq!(kiln.registry().categories(), vec!["cv", "engine", "network", "volume"]);
        }
    }

    #[test]
    fn test_single_description_is_a_list_of_one() {
        let kiln = sampling();
        let objects = kiln
            .compile_all(&json!({"engine": {"type": "toy", "name": "md", "timestep": "0.002 * 2"}}))
            .unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].payload::<ToyEngine>().unwrap().timestep, 0.004);
    }

    #[test]
    fn test_input_must_be_a_mapping() {
        let err = sampling().compile_all(&json!([{"type": "toy"}])).unwrap_err();
        assert!(err.is(codes::INVALID_INPUT));
        assert!(err.message.contains("got List"));
    }

    #[test]
    fn test_unknown_categories_last_in_input_order() {
        let registry = Registry::new()
            .with_plugins(vec![
                record("a", "zeta", vec![]),
                record("a", "alpha", vec![]),
                record("a", "cv", vec![Parameter::optional("note", Text, "")]),
            ])
            .unwrap();
        let kiln = Kiln::new(registry);
        let input = json!({
            "zeta": {"type": "a", "name": "z"},
            "alpha": {"type": "a", "name": "a"},
            "cv": {"type": "a", "name": "c"}
        });
        assert_eq!(kiln.sorted_categories(input.as_object().unwrap()).unwrap(), vec!["cv", "zeta", "alpha"]);
        let objects = kiln.compile_all(&input).unwrap();
        assert_eq!(kinds(&objects), vec!["cv:c", "zeta:z", "alpha:a"]);
    }

    #[test]
    fn test_unknown_categories_rejected() {
        let kiln = sampling().with_config(
            CompileConfig::new().with_unknown_categories(UnknownCategoryPolicy::Reject),
        );
        let err = kiln
            .compile_all(&json!({"cv": [{"type": "coordinate"}], "Move-Paths": []}))
            .unwrap_err();
        assert!(err.is(codes::UNKNOWN_CATEGORY));
        assert_eq!(err.category(), Some("move_paths"));
        // rejected before anything was compiled
        assert!(kiln.registry().compiler("cv").unwrap().all_objects().is_empty());
    }

    #[test]
    fn test_unknown_category_without_plugins_has_no_types() {
        let kiln = sampling();
        let err = kiln.compile_all(&json!({"movescheme": [{"type": "shooting"}]})).unwrap_err();
        assert!(err.is(codes::UNKNOWN_TYPE));
        assert_eq!(err.category(), Some("movescheme"));
        // the compiler was created on demand
        assert!(kiln.registry().compiler("movescheme").is_some());
    }

    #[test]
    fn test_missing_required_parameter_aborts() {
        let kiln = sampling();
        let err = kiln
            .compile_all(&json!({
                "cv": [{"type": "coordinate", "name": "x"}],
                "volume": [{"type": "interval", "cv": "x", "min": 0}]
            }))
            .unwrap_err();
        assert!(err.is(codes::MISSING_REQUIRED_PARAMETER));
        assert_eq!(err.parameter(), Some("max"));
        assert_eq!(err.plugin(), Some("interval"));
    }

    #[test]
    fn test_duplicate_names_across_documents_need_reset() {
        let kiln = sampling();
        let input = json!({"cv": [{"type": "coordinate", "name": "x"}]});
        kiln.compile_all(&input).unwrap();

        let err = kiln.compile_all(&input).unwrap_err();
        assert!(err.is(codes::DUPLICATE_NAME));
        assert_eq!(kiln.registry().compiler("cv").unwrap().all_objects().len(), 1);

        kiln.reset_session();
        assert_eq!(kiln.compile_all(&input).unwrap().len(), 1);
    }

    #[test]
    fn test_full_document() {
        let kiln = sampling();
        let input = json!({
            "networks": [{
                "type": "tps",
                "name": "tps",
                "initial_states": "A",
                "final_states": [{"type": "interval", "name": "B", "cv": "x", "min": 1, "max": "2 * pi"}]
            }],
            "states": [
                {"type": "interval", "name": "A", "cv": "x", "min": "-1", "max": 0}
            ],
            "collective variable": [{"type": "position", "name": "x", "axis": "z"}],
            "engines": [{"type": "toy", "name": "md", "timestep": 0.002, "label": "production"}]
        });
        let objects = kiln.compile_all(&input).unwrap();
        assert_eq!(kinds(&objects), vec!["engine:md", "cv:x", "volume:A", "network:tps"]);
        assert_eq!(objects[0].attr("label"), Some(&Value::from("production")));
        assert_eq!(objects[3].payload::<Tps>().unwrap().n_transitions(), 1);
        // B was compiled inline by the network and registered in its own category
        let volumes = kiln.registry().compiler("volume").unwrap();
        assert_eq!(volumes.names(), vec!["A", "B"]);
    }

    #[test]
    fn test_undeclared_keys_reach_constructor() {
        let registry = Registry::new()
            .with_plugins(vec![record("raw", "cv", vec![Parameter::optional("extra", Passthrough, Value::Null)])])
            .unwrap();
        let kiln = Kiln::new(registry);
        let objects = kiln
            .compile_all(&json!({"cv": [{"type": "raw", "comment": "kept", "extra": [1, 2]}]}))
            .unwrap();
        let kwargs = objects[0].payload::<Kwargs>().unwrap();
        assert_eq!(kwargs.text("comment").unwrap(), "kept");
        assert_eq!(kwargs.list("extra").unwrap().len(), 2);
    }

    #[test]
    fn test_json_schema_and_docs() {
        let kiln = sampling();
        assert!(kiln.json_schema()["definitions"]["cv.coordinate"].is_object());
        assert!(kiln.docs(Some("engine")).unwrap().contains("### toy"));
    }
}
