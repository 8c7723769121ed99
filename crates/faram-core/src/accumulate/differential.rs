//! Differential error accumulator — re-validate only what changed.
//!
//! Structural equality of `serde_json::Value`s stands in for reference
//! identity: an unchanged subtree (`old == new`) keeps its cached error
//! without evaluating a single rule.
//!
//! Array elements are paired across the transition by element key:
//!
//! | old key | new key | old == new | result                                   |
//! |---------|---------|------------|------------------------------------------|
//! | yes     | yes     | yes        | cached error copied                      |
//! | yes     | yes     | no         | re-validated (cache dropped on variant change) |
//! | yes     | no      | -          | dropped                                  |
//! | no      | yes     | -          | **no error** until the next full pass    |
//!
//! Node-level validation always re-runs against the new value.

use std::collections::HashMap;

use serde_json::Value;

use super::errors::{accumulate_errors, node_errors, validate_leaf};
use crate::error_tree::ErrorNode;
use crate::schema::{ArraySchema, ObjectSchema, Schema};

/// Compute the error tree for `new` given the error tree `old_error` that was
/// computed for `old`.
///
/// Equivalent to [`accumulate_errors`] on `new`, except that array elements
/// whose key did not exist in `old` get no error.
pub fn accumulate_differential_errors(
    old: &Value,
    new: &Value,
    old_error: Option<&ErrorNode>,
    schema: &Schema,
) -> Option<ErrorNode> {
    if old == new {
        return old_error.cloned();
    }

    match schema {
        Schema::Leaf(rules) => validate_leaf(new, rules),
        Schema::Array(array) => diff_array(old, new, old_error, array),
        Schema::Object(object) => diff_object(old, new, old_error, object, schema),
    }
}

fn diff_array(
    old: &Value,
    new: &Value,
    old_error: Option<&ErrorNode>,
    array: &ArraySchema,
) -> Option<ErrorNode> {
    let mut errors = node_errors(new, array.validation.as_ref());
    let Some(new_items) = new.as_array() else {
        return errors.into_node();
    };

    // First occurrence wins on duplicate keys.
    let mut old_by_key: HashMap<String, &Value> = HashMap::new();
    for (index, element) in old.as_array().into_iter().flatten().enumerate() {
        old_by_key
            .entry(array.key_of(element, index))
            .or_insert(element);
    }

    for (index, new_element) in new_items.iter().enumerate() {
        let key = array.key_of(new_element, index);
        let Some(old_element) = old_by_key.get(&key).copied() else {
            tracing::trace!(key = %key, "element added, skipping validation");
            continue;
        };

        let cached = old_error.and_then(|e| e.child(&key));
        if old_element == new_element {
            errors.insert(key, cached.cloned());
            continue;
        }

        let Some(member) = array.member.resolve(new_element) else {
            continue;
        };
        let error = if array.member.variant_name(old_element)
            != array.member.variant_name(new_element)
        {
            tracing::debug!(key = %key, "element changed variant, discarding cached error");
            accumulate_errors(new_element, member)
        } else {
            accumulate_differential_errors(old_element, new_element, cached, member)
        };
        errors.insert(key, error);
    }

    errors.into_node()
}

fn diff_object(
    old: &Value,
    new: &Value,
    old_error: Option<&ErrorNode>,
    object: &ObjectSchema,
    schema: &Schema,
) -> Option<ErrorNode> {
    if object.fields.variant_name(old) != object.fields.variant_name(new) {
        tracing::debug!("object changed variant, re-validating");
        return accumulate_errors(new, schema);
    }

    let mut errors = node_errors(new, object.validation.as_ref());
    let Some(fields) = object.fields.resolve(new) else {
        return errors.into_node();
    };

    for (name, field_schema) in fields {
        let old_field = old.get(name).unwrap_or(&Value::Null);
        let new_field = new.get(name).unwrap_or(&Value::Null);
        let cached = old_error.and_then(|e| e.child(name));

        let error = match cached {
            Some(cached) if old_field == new_field => Some(cached.clone()),
            _ => accumulate_differential_errors(old_field, new_field, cached, field_schema),
        };
        errors.insert(name.clone(), error);
    }

    errors.into_node()
}
