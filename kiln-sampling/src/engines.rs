//! Engines

use kiln_plugin::prelude::*;
use kiln_std::{Choice, EvalFloat, EvalPositiveInt, Text};

pub const TOY_ENGINE: &str = "sampling.engines.ToyEngine";

/// Settings of the toy dynamics engine
#[derive(Debug, Clone, PartialEq)]
pub struct ToyEngine {
    pub timestep: f64,
    pub n_steps_per_frame: i64,
    pub integrator: String,
    pub temperature: f64,
}

pub fn toy_engine(kwargs: Kwargs) -> Result<Object, BuildError> {
    let engine = ToyEngine {
        timestep: kwargs.float("timestep")?,
        n_steps_per_frame: kwargs.int("n_steps_per_frame")?,
        integrator: kwargs.text("integrator")?.to_string(),
        temperature: kwargs.float("temperature")?,
    };
    if engine.timestep <= 0.0 {
        return Err(BuildError::Invalid(format!("timestep must be positive, got {}", engine.timestep)));
    }
    Ok(Object::new("toy", engine))
}

/// The constructor knows nothing about labels; the label is attached
/// afterwards from the original input
pub fn toy_plugin(constructors: &ConstructorRegistry) -> Result<InstanceCompilerPlugin, CompileError> {
    let builder = Builder::from_registry(constructors, TOY_ENGINE)?
        .with_remap(|mut kwargs| {
            kwargs.remove("label");
            kwargs
        })
        .with_after_build(|mut engine, original| {
            if let Some(label) = original.get("label").and_then(Value::as_text) {
                engine.set_attr("label", label);
            }
            Ok(engine)
        });
    let plugin = InstanceCompilerPlugin::new(
        "toy",
        "engine",
        vec![
            Parameter::required("timestep", EvalFloat).with_description("Integration timestep"),
            Parameter::optional("n_steps_per_frame", EvalPositiveInt, 10i64)
                .with_description("Integration steps between saved frames"),
            Parameter::optional("integrator", Choice::new(["langevin", "verlet"]), "langevin"),
            Parameter::optional("temperature", EvalFloat, 300.0).with_description("Bath temperature"),
            Parameter::optional("label", Text, Value::Null).with_description("Free-form label kept on the engine"),
        ],
        builder,
    )?;
    Ok(plugin.with_description("Toy engine for small model systems"))
}
