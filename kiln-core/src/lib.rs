//! Kiln Core - Fundamental types
//!
//! This crate provides the core types used throughout Kiln:
//! - `Value`: Typed constructor arguments (scalars, lists, maps, objects)
//! - `Kwargs`: Keyword arguments handed to raw constructors
//! - `Object`: Name-aware constructed entities
//! - `CompileError`: Structured errors locating bad configuration

mod value;
mod kwargs;
mod object;
mod error;

pub use value::{Raw, Value};
pub use kwargs::Kwargs;
pub use object::{Object, ObjectRef};
pub use error::{BuildError, CompileError, ErrorContext, LoadError, codes};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{BuildError, CompileError, Kwargs, LoadError, Object, ObjectRef, Raw, Value};
    pub use crate::error::codes;
}
