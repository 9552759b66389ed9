//! Standard loaders

use crate::expr;
use kiln_core::{CompileError, LoadError, Raw, Value};
use kiln_plugin::{CategoryLookup, Describable, Loader};
use serde_json::json;

fn mismatch(expected: &'static str, raw: &Raw) -> LoadError {
    LoadError::TypeMismatch { expected, got: Value::raw_type_name(raw) }
}

/// A number, or a string holding an arithmetic expression
fn eval_number(raw: &Raw) -> Result<f64, LoadError> {
    match raw {
        Raw::Number(n) => n.as_f64().ok_or_else(|| mismatch("Float", raw)),
        Raw::String(s) => expr::evaluate(s),
        _ => Err(mismatch("Float", raw)),
    }
}

fn eval_integer(raw: &Raw) -> Result<i64, LoadError> {
    if let Some(i) = raw.as_i64() {
        return Ok(i);
    }
    let value = eval_number(raw)?;
    // i64::MIN is exactly -2^63; i64::MAX rounds up to 2^63, which is out of range
    if value.fract() != 0.0 || value >= i64::MAX as f64 || value < i64::MIN as f64 {
        return Err(LoadError::NotAnInteger(value));
    }
    Ok(value as i64)
}

// ============================================================================
// Numbers
// ============================================================================

/// Float from a number or an expression
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalFloat;

impl Loader for EvalFloat {
    fn load(&self, raw: &Raw, _lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        Ok(Value::Float(eval_number(raw)?))
    }

    fn describe(&self) -> Option<&dyn Describable> {
        Some(self)
    }
}

impl Describable for EvalFloat {
    fn json_type(&self) -> Option<Raw> {
        Some(json!({"type": ["number", "string"]}))
    }

    fn description(&self) -> Option<String> {
        Some("A number or an arithmetic expression such as \"2 * pi\"".to_string())
    }
}

/// Integer from a number or an expression; fractional results are rejected
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalInt;

impl Loader for EvalInt {
    fn load(&self, raw: &Raw, _lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        Ok(Value::Int(eval_integer(raw)?))
    }

    fn describe(&self) -> Option<&dyn Describable> {
        Some(self)
    }
}

impl Describable for EvalInt {
    fn json_type(&self) -> Option<Raw> {
        Some(json!({"type": ["integer", "string"]}))
    }

    fn description(&self) -> Option<String> {
        Some("An integer or an expression evaluating to one".to_string())
    }
}

/// Strictly positive integer
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalPositiveInt;

impl Loader for EvalPositiveInt {
    fn load(&self, raw: &Raw, _lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        let value = eval_integer(raw)?;
        if value <= 0 {
            return Err(LoadError::NotPositive(value.to_string()).into());
        }
        Ok(Value::Int(value))
    }

    fn describe(&self) -> Option<&dyn Describable> {
        Some(self)
    }
}

impl Describable for EvalPositiveInt {
    fn json_type(&self) -> Option<Raw> {
        Some(json!({"type": ["integer", "string"], "exclusiveMinimum": 0}))
    }

    fn description(&self) -> Option<String> {
        Some("A strictly positive integer or an expression evaluating to one".to_string())
    }
}

// ============================================================================
// Text and flags
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl Loader for Text {
    fn load(&self, raw: &Raw, _lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        match raw {
            Raw::String(s) => Ok(Value::Text(s.clone())),
            other => Err(mismatch("Text", other).into()),
        }
    }

    fn describe(&self) -> Option<&dyn Describable> {
        Some(self)
    }
}

impl Describable for Text {
    fn json_type(&self) -> Option<Raw> {
        Some(json!("string"))
    }

    fn description(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Flag;

impl Loader for Flag {
    fn load(&self, raw: &Raw, _lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        match raw {
            Raw::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(mismatch("Bool", other).into()),
        }
    }

    fn describe(&self) -> Option<&dyn Describable> {
        Some(self)
    }
}

impl Describable for Flag {
    fn json_type(&self) -> Option<Raw> {
        Some(json!("boolean"))
    }

    fn description(&self) -> Option<String> {
        None
    }
}

/// One of a fixed set of strings
#[derive(Debug, Clone)]
pub struct Choice {
    choices: Vec<String>,
}

impl Choice {
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { choices: choices.into_iter().map(Into::into).collect() }
    }
}

impl Loader for Choice {
    fn load(&self, raw: &Raw, _lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        let text = raw.as_str().ok_or_else(|| mismatch("Text", raw))?;
        if !self.choices.iter().any(|c| c == text) {
            return Err(LoadError::InvalidChoice {
                got: text.to_string(),
                choices: self.choices.clone(),
            }
            .into());
        }
        Ok(Value::Text(text.to_string()))
    }

    fn describe(&self) -> Option<&dyn Describable> {
        Some(self)
    }
}

impl Describable for Choice {
    fn json_type(&self) -> Option<Raw> {
        Some(json!({"type": "string", "enum": self.choices}))
    }

    fn description(&self) -> Option<String> {
        Some(format!("One of: {}", self.choices.join(", ")))
    }
}

// ============================================================================
// Containers
// ============================================================================

/// A list of values each loaded by `inner`; a single value is accepted as a
/// one-element list
#[derive(Debug, Clone)]
pub struct ListOf<L> {
    inner: L,
}

impl<L: Loader> ListOf<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

impl<L: Loader> Loader for ListOf<L> {
    fn load(&self, raw: &Raw, lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        let items = match raw {
            Raw::Array(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                self.inner
                    .load(item, lookup)
                    .map_err(|e| e.with_note(format!("in list item {}", i)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }

    fn describe(&self) -> Option<&dyn Describable> {
        Some(self)
    }
}

impl<L: Loader> Describable for ListOf<L> {
    fn json_type(&self) -> Option<Raw> {
        let items = self
            .inner
            .describe()
            .and_then(|d| d.json_type())
            .unwrap_or_else(|| json!({}));
        let items = match items {
            Raw::String(ty) => json!({ "type": ty }),
            other => other,
        };
        Some(json!({"type": "array", "items": items}))
    }

    fn description(&self) -> Option<String> {
        self.inner
            .describe()
            .and_then(|d| d.description())
            .map(|d| format!("List of: {}", d))
    }
}

/// Accepts anything, converting it without interpretation
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Loader for Passthrough {
    fn load(&self, raw: &Raw, _lookup: &dyn CategoryLookup) -> Result<Value, CompileError> {
        Ok(Value::from_raw(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::codes;
    use kiln_plugin::{CategoryProxy, Registry};

    fn load(loader: &dyn Loader, raw: Raw) -> Result<Value, CompileError> {
        loader.load(&raw, &Registry::new())
    }

    #[test]
    fn test_eval_float() {
        assert_eq!(load(&EvalFloat, json!(1)).unwrap(), Value::Float(1.0));
        assert_eq!(load(&EvalFloat, json!("1 / 4")).unwrap(), Value::Float(0.25));
        let err = load(&EvalFloat, json!(true)).unwrap_err();
        assert!(err.is(codes::LOAD_ERROR));
    }

    #[test]
    fn test_eval_int() {
        assert_eq!(load(&EvalInt, json!(7)).unwrap(), Value::Int(7));
        assert_eq!(load(&EvalInt, json!("10 ** 3")).unwrap(), Value::Int(1000));
        assert_eq!(load(&EvalInt, json!(4.0)).unwrap(), Value::Int(4));
        assert!(load(&EvalInt, json!("1 / 3")).is_err());
    }

    #[test]
    fn test_eval_int_range() {
        assert!(load(&EvalInt, json!("2 ** 63")).is_err());
        assert!(load(&EvalInt, json!(9223372036854775808u64)).is_err());
        assert!(load(&EvalInt, json!("-(2 ** 63) - 2 ** 11")).is_err());
        assert_eq!(load(&EvalInt, json!("-(2 ** 63)")).unwrap(), Value::Int(i64::MIN));
        assert_eq!(load(&EvalInt, json!(i64::MAX)).unwrap(), Value::Int(i64::MAX));
    }

    #[test]
    fn test_eval_positive_int() {
        assert_eq!(load(&EvalPositiveInt, json!("2 * 5")).unwrap(), Value::Int(10));
        assert!(load(&EvalPositiveInt, json!(0)).is_err());
        assert!(load(&EvalPositiveInt, json!("-3")).is_err());
    }

    #[test]
    fn test_text_and_flag() {
        assert_eq!(load(&Text, json!("x")).unwrap(), Value::from("x"));
        assert!(load(&Text, json!(1)).is_err());
        assert_eq!(load(&Flag, json!(false)).unwrap(), Value::Bool(false));
        assert!(load(&Flag, json!("yes")).is_err());
    }

    #[test]
    fn test_choice() {
        let axis = Choice::new(["x", "y", "z"]);
        assert_eq!(load(&axis, json!("y")).unwrap(), Value::from("y"));
        let err = load(&axis, json!("w")).unwrap_err();
        assert!(err.message.contains("x, y, z"));
        assert_eq!(axis.json_type(), Some(json!({"type": "string", "enum": ["x", "y", "z"]})));
    }

    #[test]
    fn test_list_of_promotes_single() {
        let loader = ListOf::new(EvalFloat);
        assert_eq!(
            load(&loader, json!([1, "2 + 1"])).unwrap(),
            Value::List(vec![Value::Float(1.0), Value::Float(3.0)])
        );
        assert_eq!(load(&loader, json!(5)).unwrap(), Value::List(vec![Value::Float(5.0)]));
        let err = load(&loader, json!([1, "oops"])).unwrap_err();
        assert_eq!(err.context.unwrap().notes, vec!["in list item 1".to_string()]);
    }

    #[test]
    fn test_list_of_describes_items() {
        let loader = ListOf::new(Text);
        assert_eq!(loader.json_type(), Some(json!({"type": "array", "items": {"type": "string"}})));
        let refs = ListOf::new(CategoryProxy::new("volume"));
        assert_eq!(
            refs.json_type(),
            Some(json!({"type": "array", "items": {"$ref": "#/definitions/volume_type"}}))
        );
        assert!(refs.description().unwrap().starts_with("List of: A volume object"));
    }

    #[test]
    fn test_passthrough() {
        assert_eq!(load(&Passthrough, json!(null)).unwrap(), Value::Null);
        assert!(Passthrough.describe().is_none());
    }
}
