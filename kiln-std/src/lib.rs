//! Kiln Standard Library
//!
//! Loaders for the value shapes most plugins need: numbers written as
//! arithmetic expressions, integers, text, flags, fixed choices and lists.
//! Category references are not here; use `kiln_plugin::CategoryProxy`.

pub mod expr;
pub mod loaders;

pub use expr::evaluate;
pub use loaders::{Choice, EvalFloat, EvalInt, EvalPositiveInt, Flag, ListOf, Passthrough, Text};
