//! Transition networks

use kiln_plugin::prelude::*;
use kiln_std::ListOf;

/// Transitions from any initial state to any final state
#[derive(Debug, Clone)]
pub struct Tps {
    pub initial_states: Vec<ObjectRef>,
    pub final_states: Vec<ObjectRef>,
}

impl Tps {
    pub fn n_transitions(&self) -> usize {
        self.initial_states.len() * self.final_states.len()
    }
}

pub fn tps_plugin() -> Result<InstanceCompilerPlugin, CompileError> {
    // `states` is an alias of `volume`; the proxy resolves it lazily
    let plugin = InstanceCompilerPlugin::new(
        "tps",
        "network",
        vec![
            Parameter::required("initial_states", ListOf::new(CategoryProxy::new("states"))),
            Parameter::required("final_states", ListOf::new(CategoryProxy::new("states"))),
        ],
        Builder::new(|kwargs: Kwargs| {
            let tps = Tps {
                initial_states: kwargs.objects("initial_states")?,
                final_states: kwargs.objects("final_states")?,
            };
            let overlap = tps
                .initial_states
                .iter()
                .find(|a| tps.final_states.iter().any(|b| ObjectRef::ptr_eq(a, b)));
            if let Some(state) = overlap {
                return Err(BuildError::Invalid(format!("state {} is both initial and final", state)));
            }
            Ok(Object::new("tps", tps))
        }),
    )?;
    Ok(plugin.with_description("Transition path sampling between initial and final states"))
}
