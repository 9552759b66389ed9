//! Volumes: regions of collective-variable space
//!
//! Volumes are where cross-category references show up. An interval
//! refers to a `cv`; unions and intersections refer back into the
//! `volume` category itself, so a volume may be described inline inside
//! another one.

use kiln_plugin::prelude::*;
use kiln_std::{EvalFloat, ListOf};

/// `lambda_min <= cv < lambda_max`
#[derive(Debug, Clone)]
pub struct Interval {
    pub cv: ObjectRef,
    pub lambda_min: f64,
    pub lambda_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    Union,
    Intersection,
}

impl Combine {
    fn tag(self) -> &'static str {
        match self {
            Combine::Union => "union",
            Combine::Intersection => "intersection",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Combination {
    pub op: Combine,
    pub volumes: Vec<ObjectRef>,
}

pub fn interval_plugin() -> Result<InstanceCompilerPlugin, CompileError> {
    let builder = Builder::new(|kwargs: Kwargs| {
        let interval = Interval {
            cv: kwargs.object("cv")?.clone(),
            lambda_min: kwargs.float("lambda_min")?,
            lambda_max: kwargs.float("lambda_max")?,
        };
        if interval.lambda_min > interval.lambda_max {
            return Err(BuildError::Invalid(format!(
                "interval bounds are reversed: min {} > max {}",
                interval.lambda_min, interval.lambda_max
            )));
        }
        Ok(Object::new("interval", interval))
    })
    .with_remap(|mut kwargs| {
        kwargs.rename("min", "lambda_min");
        kwargs.rename("max", "lambda_max");
        kwargs
    });

    let plugin = InstanceCompilerPlugin::new(
        "interval",
        "volume",
        vec![
            Parameter::required("cv", CategoryProxy::new("cv")),
            Parameter::required("min", EvalFloat).with_description("Lower bound (inclusive)"),
            Parameter::required("max", EvalFloat).with_description("Upper bound (exclusive)"),
        ],
        builder,
    )?;
    Ok(plugin
        .with_aliases(["range"])
        .with_description("Values of one collective variable between two bounds"))
}

fn combination_plugin(op: Combine) -> Result<InstanceCompilerPlugin, CompileError> {
    let plugin = InstanceCompilerPlugin::new(
        op.tag(),
        "volume",
        vec![Parameter::required("volumes", ListOf::new(CategoryProxy::new("volume")))
            .with_description("Volumes to combine")],
        Builder::new(move |kwargs: Kwargs| {
            let volumes = kwargs.objects("volumes")?;
            if volumes.is_empty() {
                return Err(BuildError::Invalid(format!("{} of no volumes", op.tag())));
            }
            Ok(Object::new(op.tag(), Combination { op, volumes }))
        }),
    )?;
    Ok(plugin)
}

pub fn union_plugin() -> Result<InstanceCompilerPlugin, CompileError> {
    Ok(combination_plugin(Combine::Union)?.with_description("Points in any of the given volumes"))
}

pub fn intersection_plugin() -> Result<InstanceCompilerPlugin, CompileError> {
    Ok(combination_plugin(Combine::Intersection)?.with_description("Points in all of the given volumes"))
}
