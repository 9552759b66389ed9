//! JSON schema for whole input documents

use kiln_core::Raw;
use kiln_plugin::Registry;
use serde_json::{Map, json};

pub const SCHEMA_DRAFT: &str = "http://json-schema.org/draft-07/schema#";

const DEFINITIONS: &str = "#/definitions/";

fn type_ref(category: &str) -> Raw {
    json!({ "$ref": format!("{}{}_type", DEFINITIONS, category) })
}

fn name_choice(category: &str) -> Raw {
    json!({
        "type": "string",
        "description": format!("Name of a {} defined earlier", category),
    })
}

/// Every `#/definitions/...` target referenced below `schema`
fn collect_refs(schema: &Raw, refs: &mut Vec<String>) {
    match schema {
        Raw::Object(fields) => {
            for (key, value) in fields {
                match (key.as_str(), value) {
                    ("$ref", Raw::String(target)) => {
                        if let Some(name) = target.strip_prefix(DEFINITIONS) {
                            refs.push(name.to_string());
                        }
                    }
                    _ => collect_refs(value, refs),
                }
            }
        }
        Raw::Array(items) => items.iter().for_each(|item| collect_refs(item, refs)),
        _ => {}
    }
}

/// Schema for an input document accepted by the registry's categories.
///
/// Every category gets a `<category>_type` definition: either the name of
/// an object defined earlier or an inline description matching one of its
/// plugins (`<category>.<tag>`). Aliases point at the canonical definition,
/// so parameters referencing a category through an alias validate too.
/// Categories referenced by a parameter but not registered yet only accept
/// names.
pub fn document_schema(registry: &Registry) -> Raw {
    let mut properties = Map::new();
    let mut definitions = Map::new();

    for category in registry.categories() {
        let Some(compiler) = registry.compiler(&category) else {
            continue;
        };

        let mut choices = vec![name_choice(&category)];
        for plugin in compiler.plugins() {
            let (tag, schema) = plugin.to_json_schema();
            let key = format!("{}.{}", category, tag);
            choices.push(json!({ "$ref": format!("{}{}", DEFINITIONS, key) }));
            definitions.insert(key, schema);
        }

        let mut type_def = Map::new();
        if let Some(description) = registry.category_plugin(&category).and_then(|p| p.description) {
            type_def.insert("description".to_string(), Raw::String(description));
        }
        type_def.insert("oneOf".to_string(), Raw::Array(choices));
        definitions.insert(format!("{}_type", category), Raw::Object(type_def));

        let entry = json!({"type": "array", "items": type_ref(&category)});
        for alias in registry.aliases_for(&category) {
            definitions.insert(format!("{}_type", alias), type_ref(&category));
            properties.insert(alias, entry.clone());
        }
        properties.insert(category, entry);
    }

    let mut refs = Vec::new();
    collect_refs(&Raw::Object(definitions.clone()), &mut refs);
    for target in refs {
        let Some(category) = target.strip_suffix("_type") else {
            continue;
        };
        if !definitions.contains_key(&target) {
            let placeholder = json!({
                "description": format!("No {} types are registered", category),
                "oneOf": [name_choice(category)],
            });
            definitions.insert(target.clone(), placeholder);
        }
    }

    json!({
        "$schema": SCHEMA_DRAFT,
        "type": "object",
        "properties": properties,
        "definitions": definitions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_schema_shape() {
        let registry = kiln_sampling::standard_registry().unwrap();
        let schema = document_schema(&registry);

        assert_eq!(schema["$schema"], SCHEMA_DRAFT);
        assert_eq!(schema["properties"]["volume"]["items"], json!({"$ref": "#/definitions/volume_type"}));
        assert_eq!(schema["properties"]["states"], schema["properties"]["volume"]);

        let volume = &schema["definitions"]["volume_type"]["oneOf"];
        let refs: Vec<&str> = volume.as_array().unwrap()[1..]
            .iter()
            .map(|r| r["$ref"].as_str().unwrap())
            .collect();
        assert_eq!(
            refs,
            vec![
                "#/definitions/volume.intersection",
                "#/definitions/volume.interval",
                "#/definitions/volume.union",
            ]
        );
        assert_eq!(volume[0]["type"], "string");
        assert_eq!(schema["definitions"]["states_type"], json!({"$ref": "#/definitions/volume_type"}));
    }

    #[test]
    fn test_plugin_definitions() {
        let registry = kiln_sampling::standard_registry().unwrap();
        let schema = document_schema(&registry);

        let interval = &schema["definitions"]["volume.interval"];
        assert_eq!(interval["required"], json!(["type", "cv", "min", "max"]));
        assert_eq!(interval["properties"]["type"]["enum"], json!(["interval"]));
        assert_eq!(interval["properties"]["cv"]["$ref"], "#/definitions/cv_type");

        let toy = &schema["definitions"]["engine.toy"];
        assert_eq!(toy["properties"]["n_steps_per_frame"]["default"], 10);
        assert_eq!(toy["required"], json!(["type", "timestep"]));
    }

    #[test]
    fn test_reference_to_unregistered_category() {
        use kiln_core::{Kwargs, Object};
        use kiln_plugin::{Builder, CategoryProxy, InstanceCompilerPlugin, Parameter};
        use kiln_std::ListOf;

        let registry = Registry::new()
            .with_plugins(vec![InstanceCompilerPlugin::new(
                "box",
                "volume",
                vec![
                    Parameter::required("cv", CategoryProxy::new("cv")),
                    Parameter::required("edges", ListOf::new(CategoryProxy::new("Edge Set"))),
                ],
                Builder::new(|kwargs: Kwargs| Ok(Object::new("box", kwargs))),
            )
            .unwrap()])
            .unwrap();
        let schema = document_schema(&registry);

        let definitions = &schema["definitions"];
        assert_eq!(definitions["volume.box"]["properties"]["cv"]["$ref"], "#/definitions/cv_type");
        assert_eq!(definitions["cv_type"]["oneOf"][0]["type"], "string");
        assert_eq!(definitions["cv_type"]["oneOf"].as_array().unwrap().len(), 1);
        assert!(definitions["edge_set_type"].is_object());
        assert!(schema["properties"].get("cv").is_none());
    }

    #[test]
    fn test_every_reference_is_defined() {
        let registry = kiln_sampling::standard_registry().unwrap();
        let schema = document_schema(&registry);
        let mut refs = Vec::new();
        collect_refs(&schema, &mut refs);
        assert!(!refs.is_empty());
        for target in refs {
            assert!(schema["definitions"].get(&target).is_some(), "{} is not defined", target);
        }
    }

    #[test]
    fn test_empty_registry() {
        let schema = document_schema(&Registry::new());
        assert_eq!(schema["properties"], json!({}));
        assert_eq!(schema["definitions"], json!({}));
    }
}
