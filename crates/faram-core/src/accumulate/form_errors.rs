//! Node-level error accumulator for the form facade.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error_tree::FormErrors;
use crate::schema::{NodeValidation, Schema};

/// Collect the messages of every array/object `validation` in the tree.
///
/// Children are keyed like [`accumulate_errors`](crate::accumulate_errors):
/// field name for objects, element key for arrays. Leaves contribute nothing.
pub fn accumulate_form_errors(value: &Value, schema: &Schema) -> Option<FormErrors> {
    match schema {
        Schema::Leaf(_) => None,
        Schema::Array(array) => {
            let mut node = own_errors(value, array.validation.as_ref());
            for (index, element) in value.as_array().into_iter().flatten().enumerate() {
                let child = array
                    .member
                    .resolve(element)
                    .and_then(|member| accumulate_form_errors(element, member));
                if let Some(child) = child {
                    node.fields.insert(array.key_of(element, index), child);
                }
            }
            node.into_option()
        }
        Schema::Object(object) => {
            let mut node = own_errors(value, object.validation.as_ref());
            for (name, field_schema) in object.fields.resolve(value).into_iter().flatten() {
                let field_value = value.get(name).unwrap_or(&Value::Null);
                if let Some(child) = accumulate_form_errors(field_value, field_schema) {
                    node.fields.insert(name.clone(), child);
                }
            }
            node.into_option()
        }
    }
}

fn own_errors(value: &Value, validation: Option<&NodeValidation>) -> FormErrors {
    FormErrors {
        errors: validation.map(|v| v.validate(value)).unwrap_or_default(),
        fields: BTreeMap::new(),
    }
}
