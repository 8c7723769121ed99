//! Value accumulator — sanitized output values per schema.

use serde_json::{Map, Value};

use crate::config::AccumulateOptions;
use crate::rules::is_falsy;
use crate::schema::{ArraySchema, ObjectSchema, Schema};

/// Walk `value` alongside `schema`, producing the sanitized value tree.
///
/// `None` stands for an absent value, both on input and output. Falsy leaves
/// are replaced by `options.falsy_value` unless `options.no_falsy_values`
/// keeps them verbatim; containers whose every entry came out falsy collapse
/// the same way (to `[]`/`{}` when keeping falsy values). Object fields not
/// declared by the schema are dropped.
pub fn accumulate_values(
    value: Option<&Value>,
    schema: &Schema,
    options: &AccumulateOptions,
) -> Option<Value> {
    match schema {
        Schema::Leaf(_) => accumulate_leaf(value, options),
        Schema::Array(array) => accumulate_array(value, array, options),
        Schema::Object(object) => accumulate_object(value, object, options),
    }
}

fn is_absent_or_falsy(value: Option<&Value>) -> bool {
    value.map_or(true, is_falsy)
}

fn accumulate_leaf(value: Option<&Value>, options: &AccumulateOptions) -> Option<Value> {
    if options.no_falsy_values || !is_absent_or_falsy(value) {
        return value.cloned();
    }
    options.falsy_value.clone()
}

/// Result for a container with nothing worth keeping.
fn empty_container(empty: Value, options: &AccumulateOptions) -> Option<Value> {
    if options.no_falsy_values {
        Some(empty)
    } else {
        options.falsy_value.clone()
    }
}

fn accumulate_array(
    value: Option<&Value>,
    array: &ArraySchema,
    options: &AccumulateOptions,
) -> Option<Value> {
    let items = value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let values: Vec<Option<Value>> = items
        .iter()
        .map(|element| {
            array
                .member
                .resolve(element)
                .and_then(|member| accumulate_values(Some(element), member, options))
        })
        .collect();

    if values.iter().all(|v| is_absent_or_falsy(v.as_ref())) {
        tracing::trace!(len = values.len(), "array accumulated to nothing");
        return empty_container(Value::Array(Vec::new()), options);
    }

    Some(Value::Array(
        values
            .into_iter()
            .map(|v| v.unwrap_or(Value::Null))
            .collect(),
    ))
}

fn accumulate_object(
    value: Option<&Value>,
    object: &ObjectSchema,
    options: &AccumulateOptions,
) -> Option<Value> {
    let current = value.unwrap_or(&Value::Null);
    let fields = object.fields.resolve(current)?;

    let mut result = Map::new();
    for (name, field_schema) in fields {
        if let Some(field_value) = accumulate_values(current.get(name), field_schema, options) {
            result.insert(name.clone(), field_value);
        }
    }

    if result.is_empty() {
        return empty_container(Value::Object(Map::new()), options);
    }
    Some(Value::Object(result))
}
