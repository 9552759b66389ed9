//! Markdown reference documentation
//!
//! Renders what a registry accepts: one section per category and one
//! parameter table per plugin.

use kiln_core::{CompileError, Raw};
use kiln_plugin::{InstanceCompilerPlugin, Parameter, Registry};

/// Reference documentation renderer
pub struct Renderer {
    title: String,
}

impl Renderer {
    pub fn new() -> Self {
        Self { title: "Kiln Reference".to_string() }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Render every category, or just `category` (by name or alias)
    pub fn render(&self, registry: &Registry, category: Option<&str>) -> Result<String, CompileError> {
        let categories = match category {
            Some(name) => {
                let compiler = registry
                    .compiler(name)
                    .ok_or_else(|| CompileError::unresolved_compiler(name))?;
                vec![compiler.label().to_string()]
            }
            None => registry.categories(),
        };

        let mut output = format!("# {}\n\n", self.title);
        for category in &categories {
            self.render_category(registry, category, &mut output);
        }
        Ok(output)
    }

    fn render_category(&self, registry: &Registry, category: &str, output: &mut String) {
        output.push_str(&format!("## {}\n\n", category));
        if let Some(description) = registry.category_plugin(category).and_then(|p| p.description) {
            output.push_str(&format!("{}\n\n", description));
        }
        let aliases = registry.aliases_for(category);
        if !aliases.is_empty() {
            output.push_str(&format!("Aliases: {}\n\n", code_list(&aliases)));
        }

        let plugins = registry.compiler(category).map(|c| c.plugins()).unwrap_or_default();
        if plugins.is_empty() {
            output.push_str("_No types registered._\n\n");
        }
        for plugin in &plugins {
            self.render_plugin(plugin, output);
        }
    }

    fn render_plugin(&self, plugin: &InstanceCompilerPlugin, output: &mut String) {
        output.push_str(&format!("### {}\n\n", plugin.name()));
        if let Some(description) = plugin.description() {
            output.push_str(&format!("{}\n\n", description));
        }
        if !plugin.aliases().is_empty() {
            output.push_str(&format!("Aliases: {}\n\n", code_list(plugin.aliases())));
        }
        if plugin.parameters().is_empty() {
            output.push_str("_No parameters._\n\n");
            return;
        }

        output.push_str("| parameter | type | required | default | description |\n");
        output.push_str("|-----------|------|----------|---------|-------------|\n");
        for param in plugin.parameters() {
            output.push_str(&self.render_parameter(param));
        }
        output.push('\n');
    }

    fn render_parameter(&self, param: &Parameter) -> String {
        let default = param
            .default()
            .and_then(|d| serde_json::to_string(d).ok())
            .map(|d| format!("`{}`", d))
            .unwrap_or_default();
        format!(
            "| {} | {} | {} | {} | {} |\n",
            param.name(),
            type_label(param.json_type().as_ref()),
            if param.is_required() { "yes" } else { "no" },
            default,
            escape(&param.description().unwrap_or_default()),
        )
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn code_list(items: &[String]) -> String {
    items.iter().map(|a| format!("`{}`", a)).collect::<Vec<_>>().join(", ")
}

fn escape(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Short human-readable form of a JSON schema type fragment
fn type_label(json_type: Option<&Raw>) -> String {
    let Some(json_type) = json_type else {
        return "any".to_string();
    };
    match json_type {
        Raw::String(ty) => ty.clone(),
        Raw::Object(fragment) => {
            if let Some(target) = fragment.get("$ref").and_then(Raw::as_str) {
                let category = target
                    .trim_start_matches("#/definitions/")
                    .trim_end_matches("_type");
                return format!("{} (name or inline)", category);
            }
            if let Some(choices) = fragment.get("enum").and_then(Raw::as_array) {
                let choices: Vec<String> = choices.iter().map(|c| c.to_string()).collect();
                return format!("one of {}", choices.join(", "));
            }
            match fragment.get("type") {
                Some(Raw::String(ty)) if ty == "array" => {
                    format!("list of {}", type_label(fragment.get("items")))
                }
                Some(Raw::String(ty)) => ty.clone(),
                Some(Raw::Array(types)) => types
                    .iter()
                    .filter_map(Raw::as_str)
                    .collect::<Vec<_>>()
                    .join(" or "),
                _ => "any".to_string(),
            }
        }
        _ => "any".to_string(),
    }
}
