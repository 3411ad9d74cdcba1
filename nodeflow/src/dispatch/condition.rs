//! Condition node handler.
//!
//! Expressions are interpreted, never evaluated as code:
//!
//! - `true` / `false` (any case) are literals.
//! - `input.<field>` is the truthiness of `<field>` in the first predecessor
//!   output object that has it, or `false` when none does.
//! - A predecessor id is the truthiness of that predecessor's output.
//! - Anything else is true when non-empty.

use super::NodeInputs;
use crate::definition::{ConditionConfig, Node};
use crate::errors::NodeError;
use serde_json::{json, Value};

/// Returns the truthiness of a JSON value: `null`, `false`, zero, and empty
/// strings, arrays and objects are false.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Evaluates a condition expression against predecessor outputs.
#[must_use]
pub fn evaluate(expression: &str, inputs: &NodeInputs) -> bool {
    if expression.eq_ignore_ascii_case("true") {
        return true;
    }
    if expression.eq_ignore_ascii_case("false") {
        return false;
    }

    if let Some(field) = expression.strip_prefix("input.") {
        return inputs
            .values()
            .filter_map(Value::as_object)
            .find_map(|output| output.get(field))
            .is_some_and(is_truthy);
    }

    if let Some(output) = inputs.get(expression) {
        return is_truthy(output);
    }

    !expression.is_empty()
}

pub(super) fn run(node: &Node, inputs: &NodeInputs) -> Result<Value, NodeError> {
    let ConditionConfig { condition } = ConditionConfig::from_node(node)?;
    Ok(json!({ "result": evaluate(&condition, inputs) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(pairs: &[(&str, Value)]) -> NodeInputs {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_literals_case_insensitive() {
        assert!(evaluate("TRUE", &NodeInputs::new()));
        assert!(!evaluate("False", &NodeInputs::new()));
    }

    #[test]
    fn test_input_field_lookup() {
        let inputs = inputs(&[("a", json!({"approved": true})), ("b", json!({"score": 0}))]);
        assert!(evaluate("input.approved", &inputs));
        assert!(!evaluate("input.score", &inputs));
        assert!(!evaluate("input.missing", &inputs));
    }

    #[test]
    fn test_input_field_skips_non_objects() {
        let inputs = inputs(&[("a", json!("text")), ("b", json!({"ok": "yes"}))]);
        assert!(evaluate("input.ok", &inputs));
    }

    #[test]
    fn test_predecessor_id_lookup() {
        let inputs = inputs(&[("t1", json!({})), ("t2", json!([1]))]);
        assert!(!evaluate("t1", &inputs));
        assert!(evaluate("t2", &inputs));
    }

    #[test]
    fn test_fallback_is_non_empty() {
        assert!(evaluate("anything", &NodeInputs::new()));
        assert!(!evaluate("", &NodeInputs::new()));
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(0.0)));
        assert!(is_truthy(&json!(-1)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!({"k": null})));
    }

    #[test]
    fn test_run_wraps_result() {
        let node = Node::condition("c1", "false");
        assert_eq!(run(&node, &NodeInputs::new()).unwrap(), json!({"result": false}));

        let node = Node::new("c2", crate::definition::NodeType::Condition);
        assert_eq!(run(&node, &NodeInputs::new()).unwrap(), json!({"result": true}));
    }
}
