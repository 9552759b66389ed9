//! Kiln Plugin System
//!
//! Provides the pieces a plugin author combines to make a type compilable:
//! - Loaders (raw input to typed value) and `Parameter`s describing fields
//! - `Builder`s adapting raw constructors
//! - `InstanceCompilerPlugin`s binding a type tag to parameters and a builder
//!
//! and the machinery that dispatches descriptions to them:
//! - `CategoryCompiler`: one category's dispatch table and named objects
//! - `Registry`: all categories, aliases and late-bound `CategoryProxy`s

mod traits;
mod parameter;
mod builder;
mod instance;
mod category;
mod registry;

pub use traits::{CategoryLookup, Describable, FnLoader, Loader, loader_fn};
pub use parameter::Parameter;
pub use builder::{AfterBuild, Builder, Constructor, ConstructorRegistry, Remap};
pub use instance::{CategoryPlugin, InstanceCompilerPlugin, Plugin};
pub use category::CategoryCompiler;
pub use registry::{CategoryProxy, Registry, clean_input_key};

/// Re-export core types for plugin authors
pub mod prelude {
    pub use crate::{
        Builder, CategoryLookup, CategoryPlugin, CategoryProxy, ConstructorRegistry, Describable,
        InstanceCompilerPlugin, Loader, Parameter, Plugin, Registry, loader_fn,
    };
    pub use kiln_core::prelude::*;
}
