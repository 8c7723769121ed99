//! Error accumulator — full validation pass.

use serde_json::Value;

use crate::error_tree::{ErrorMap, ErrorNode};
use crate::schema::{NodeValidation, Rule, Schema};

/// Validate `value` against `schema`, producing a sparse error tree.
///
/// Leaves report the message of their first failing rule (later rules are not
/// evaluated). Array and object nodes run their own validation first, storing
/// its messages under `$internal`, then recurse into elements (keyed by
/// element key) and declared fields. Returns `None` when nothing failed.
pub fn accumulate_errors(value: &Value, schema: &Schema) -> Option<ErrorNode> {
    match schema {
        Schema::Leaf(rules) => validate_leaf(value, rules),
        Schema::Array(array) => {
            let mut errors = node_errors(value, array.validation.as_ref());
            for (index, element) in value.as_array().into_iter().flatten().enumerate() {
                let Some(member) = array.member.resolve(element) else {
                    continue;
                };
                errors.insert(
                    array.key_of(element, index),
                    accumulate_errors(element, member),
                );
            }
            errors.into_node()
        }
        Schema::Object(object) => {
            let mut errors = node_errors(value, object.validation.as_ref());
            if let Some(fields) = object.fields.resolve(value) {
                for (name, field_schema) in fields {
                    let field_value = value.get(name).unwrap_or(&Value::Null);
                    errors.insert(name.clone(), accumulate_errors(field_value, field_schema));
                }
            }
            errors.into_node()
        }
    }
}

/// First failing rule wins.
pub(super) fn validate_leaf(value: &Value, rules: &[Rule]) -> Option<ErrorNode> {
    rules
        .iter()
        .find(|rule| !rule.check(value))
        .map(|rule| ErrorNode::message(rule.message()))
}

/// Error map seeded with the node's own validation messages.
pub(super) fn node_errors(value: &Value, validation: Option<&NodeValidation>) -> ErrorMap {
    ErrorMap {
        internal: validation.map(|v| v.validate(value)).unwrap_or_default(),
        ..ErrorMap::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules;
    use crate::schema::{KeySelector, ObjectSchema};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn to_json(errors: Option<ErrorNode>) -> Value {
        serde_json::to_value(errors).unwrap()
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let evaluated = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evaluated);
        let schema = Schema::leaf([
            Rule::new("first", |_| false),
            Rule::new("second", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                false
            }),
        ]);

        let errors = accumulate_errors(&json!("x"), &schema);
        assert_eq!(errors, Some(ErrorNode::message("first")));
        assert_eq!(evaluated.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_object_field_errors() {
        let schema = Schema::object([
            ("id", Schema::leaf([rules::required(), rules::integer()])),
            ("name", Schema::leaf([rules::required()])),
        ]);
        let errors = accumulate_errors(&json!({ "id": 12 }), &schema);
        assert_eq!(to_json(errors), json!({ "name": "Field must not be empty" }));

        let errors = accumulate_errors(&json!({ "id": "x", "name": "n" }), &schema);
        assert_eq!(to_json(errors), json!({ "id": "Value must be an integer" }));

        let errors = accumulate_errors(&json!({ "id": 1, "name": "n" }), &schema);
        assert_eq!(errors, None);
    }

    #[test]
    fn test_node_validation_goes_to_internal() {
        let schema: Schema = ObjectSchema::new([("a", Schema::leaf([]))])
            .validation(|v| {
                if v.get("a").is_some() {
                    vec!["a is not allowed".to_string()]
                } else {
                    Vec::new()
                }
            })
            .into();

        let errors = accumulate_errors(&json!({ "a": 1 }), &schema);
        assert_eq!(to_json(errors), json!({ "$internal": ["a is not allowed"] }));
        assert_eq!(accumulate_errors(&json!({}), &schema), None);
    }

    #[test]
    fn test_array_errors_keyed_by_element_key() {
        let schema = Schema::array(
            Schema::object([
                ("key", Schema::leaf([])),
                ("v", Schema::leaf([rules::required()])),
            ]),
            KeySelector::field("key"),
        );
        let value = json!([
            { "key": 10, "v": "ok" },
            { "key": 20, "v": "" },
            { "v": "" }
        ]);
        let errors = accumulate_errors(&value, &schema);
        assert_eq!(
            to_json(errors),
            json!({
                "20": { "v": "Field must not be empty" },
                "2": { "v": "Field must not be empty" }
            })
        );
    }

    #[test]
    fn test_missing_values_are_validated_as_null() {
        let schema = Schema::object([(
            "inner",
            Schema::object([("x", Schema::leaf([rules::required()]))]),
        )]);
        let errors = accumulate_errors(&Value::Null, &schema);
        assert_eq!(
            to_json(errors),
            json!({ "inner": { "x": "Field must not be empty" } })
        );
    }
}
