//! Kiln Sampling Plugins
//!
//! A small plugin set for path-sampling setups: engines, collective
//! variables, volumes (states) and networks. It exercises every extension
//! point of the plugin system and serves as the reference for plugin
//! authors.

pub mod cvs;
pub mod engines;
pub mod networks;
pub mod volumes;

use kiln_plugin::prelude::*;

pub use cvs::{Coordinate, Distance};
pub use engines::ToyEngine;
pub use networks::Tps;
pub use volumes::{Combination, Combine, Interval};

/// Constructors referenced by fully-qualified path
pub fn constructors() -> ConstructorRegistry {
    ConstructorRegistry::new().with_constructor(engines::TOY_ENGINE, engines::toy_engine)
}

/// Category descriptors followed by every instance plugin
pub fn plugins() -> Result<Vec<Plugin>, CompileError> {
    let constructors = constructors();
    Ok(vec![
        CategoryPlugin::new("engine")
            .with_aliases(["engines"])
            .with_description("Dynamics engines")
            .into(),
        CategoryPlugin::new("cv")
            .with_aliases(["cvs", "collective-variable"])
            .with_description("Collective variables")
            .into(),
        CategoryPlugin::new("volume")
            .with_aliases(["volumes", "state", "states"])
            .with_description("Regions of collective-variable space")
            .into(),
        CategoryPlugin::new("network")
            .with_aliases(["networks"])
            .with_description("Transition networks between states")
            .into(),
        engines::toy_plugin(&constructors)?.into(),
        cvs::coordinate_plugin()?.into(),
        cvs::distance_plugin()?.into(),
        volumes::interval_plugin()?.into(),
        volumes::union_plugin()?.into(),
        volumes::intersection_plugin()?.into(),
        networks::tps_plugin()?.into(),
    ])
}

/// A fresh registry with every sampling plugin registered
pub fn standard_registry() -> Result<Registry, CompileError> {
    Registry::new().with_plugins(plugins()?)
}
