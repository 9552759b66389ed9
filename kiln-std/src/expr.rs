//! Arithmetic expression evaluation
//!
//! Numeric parameters accept either a JSON number or a string such as
//! `"1.0 / 3"` or `"2 * pi"`. Operators follow the usual precedence with
//! exponentiation binding tighter than unary minus (`-2 ** 2 == -4`).

use kiln_core::LoadError;
use pest::Parser;
use pest::iterators::Pairs;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "expr.pest"]
struct ExprParser;

fn pratt() -> PrattParser<Rule> {
    PrattParser::new()
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left) | Op::infix(Rule::div, Assoc::Left))
        .op(Op::prefix(Rule::neg))
        .op(Op::infix(Rule::pow, Assoc::Right))
}

/// Evaluate an arithmetic expression to a float
pub fn evaluate(input: &str) -> Result<f64, LoadError> {
    let expression = ExprParser::parse(Rule::expression, input)
        .map_err(|_| LoadError::Expression(input.to_string()))?
        .next()
        .ok_or_else(|| LoadError::Expression(input.to_string()))?;
    let expr = expression
        .into_inner()
        .next()
        .ok_or_else(|| LoadError::Expression(input.to_string()))?;
    let value = eval(expr.into_inner(), &pratt())?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LoadError::Invalid(format!("'{}' does not evaluate to a finite number", input)))
    }
}

fn eval(pairs: Pairs<Rule>, pratt: &PrattParser<Rule>) -> Result<f64, LoadError> {
    pratt
        .map_primary(|primary| match primary.as_rule() {
            Rule::number => primary
                .as_str()
                .parse::<f64>()
                .map_err(|_| LoadError::Expression(primary.as_str().to_string())),
            Rule::constant => constant(primary.as_str()),
            Rule::call => {
                let mut inner = primary.into_inner();
                let (Some(function), Some(arg)) = (inner.next(), inner.next()) else {
                    return Err(LoadError::Expression("malformed function call".to_string()));
                };
                let arg = eval(arg.into_inner(), pratt)?;
                apply(function.as_str(), arg)
            }
            Rule::expr => eval(primary.into_inner(), pratt),
            _ => Err(LoadError::Expression(primary.as_str().to_string())),
        })
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::neg => Ok(-rhs?),
            _ => Err(LoadError::Expression(op.as_str().to_string())),
        })
        .map_infix(|lhs, op, rhs| {
            let (lhs, rhs) = (lhs?, rhs?);
            match op.as_rule() {
                Rule::add => Ok(lhs + rhs),
                Rule::sub => Ok(lhs - rhs),
                Rule::mul => Ok(lhs * rhs),
                Rule::div if rhs == 0.0 => Err(LoadError::Invalid("division by zero".to_string())),
                Rule::div => Ok(lhs / rhs),
                Rule::pow => Ok(lhs.powf(rhs)),
                _ => Err(LoadError::Expression(op.as_str().to_string())),
            }
        })
        .parse(pairs)
}

fn constant(name: &str) -> Result<f64, LoadError> {
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        "inf" => Ok(f64::INFINITY),
        _ => Err(LoadError::Invalid(format!("unknown constant '{}'", name))),
    }
}

fn apply(function: &str, x: f64) -> Result<f64, LoadError> {
    match function {
        "sqrt" if x < 0.0 => Err(LoadError::Invalid(format!("sqrt of negative value {}", x))),
        "sqrt" => Ok(x.sqrt()),
        "exp" => Ok(x.exp()),
        "ln" | "log" if x <= 0.0 => Err(LoadError::Invalid(format!("log of non-positive value {}", x))),
        "ln" | "log" => Ok(x.ln()),
        "log10" if x <= 0.0 => Err(LoadError::Invalid(format!("log of non-positive value {}", x))),
        "log10" => Ok(x.log10()),
        "sin" => Ok(x.sin()),
        "cos" => Ok(x.cos()),
        "tan" => Ok(x.tan()),
        "abs" => Ok(x.abs()),
        _ => Err(LoadError::Invalid(format!("unknown function '{}'", function))),
    }
}
