//! Collective variables

use kiln_plugin::prelude::*;
use kiln_std::{Choice, EvalInt, ListOf};

#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub atom: i64,
    pub axis: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Distance {
    pub atoms: (i64, i64),
}

pub fn coordinate_plugin() -> Result<InstanceCompilerPlugin, CompileError> {
    let plugin = InstanceCompilerPlugin::new(
        "coordinate",
        "cv",
        vec![
            Parameter::optional("atom", EvalInt, 0i64).with_description("Atom index"),
            Parameter::optional("axis", Choice::new(["x", "y", "z"]), "x"),
        ],
        Builder::new(|kwargs: Kwargs| {
            Ok(Object::new(
                "coordinate",
                Coordinate {
                    atom: kwargs.int("atom")?,
                    axis: kwargs.text("axis")?.to_string(),
                },
            ))
        }),
    )?;
    Ok(plugin
        .with_aliases(["position"])
        .with_description("One Cartesian coordinate of one atom"))
}

pub fn distance_plugin() -> Result<InstanceCompilerPlugin, CompileError> {
    let plugin = InstanceCompilerPlugin::new(
        "distance",
        "cv",
        vec![Parameter::required("atoms", ListOf::new(EvalInt)).with_description("The two atom indices")],
        Builder::new(|kwargs: Kwargs| {
            let atoms: Vec<i64> = kwargs.list("atoms")?.iter().filter_map(Value::as_int).collect();
            match atoms.as_slice() {
                [a, b] => Ok(Object::new("distance", Distance { atoms: (*a, *b) })),
                _ => Err(BuildError::Invalid(format!("distance needs two atoms, got {}", atoms.len()))),
            }
        }),
    )?;
    Ok(plugin.with_description("Distance between two atoms"))
}
